//! JSON-lines adapter so a browser bridge or desktop shell can drive the sequencer.

mod event_sink;
pub mod protocol;
mod session;

pub use event_sink::JsonEventWriter;
pub use protocol::{IpcCommand, IpcEvent};
pub use session::{run_ipc_loop, run_ipc_mode, IpcSession};
