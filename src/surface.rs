//! Form UI collaborator contract: values, focus, and per-field indicators.

use serde::Serialize;

use crate::form::FormField;

/// Visual validity marker next to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FieldIndicator {
    Hidden,
    Valid(String),
    Error(String),
}

/// The visual form the sequencer drives.
///
/// The sequencer only writes through this trait; typed edits flow back in
/// through `Sequencer::edit_field`.
pub trait FormSurface {
    /// Show `value` in the field's input.
    fn set_value(&mut self, field: FormField, value: &str);

    /// Give `field` input focus and the single active highlight.
    fn focus(&mut self, field: FormField);

    fn set_indicator(&mut self, field: FormField, indicator: FieldIndicator);

    /// Show a blocking message to the user (submission results).
    fn notify(&mut self, message: &str);
}
