//! Submission endpoint client: posts the completed record and relays the server message.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::form::FormRecord;

pub const DEFAULT_SUBMIT_PATH: &str = "/submit";

/// Successful submission reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Human-readable message from the endpoint, shown verbatim.
    pub message: String,
}

/// Backend that stores submitted forms.
pub trait SubmissionEndpoint {
    /// Send `record` once. Implementations must not retry.
    fn submit(&self, record: &FormRecord) -> Result<SubmissionReceipt, CaptureError>;
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    #[serde(default)]
    message: Option<String>,
}

/// Blocking JSON-over-HTTP submitter.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    agent: ureq::Agent,
    url: String,
}

impl HttpSubmitter {
    #[must_use]
    pub fn new(endpoint: &str, submit_path: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: join_url(endpoint, submit_path),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SubmissionEndpoint for HttpSubmitter {
    fn submit(&self, record: &FormRecord) -> Result<SubmissionReceipt, CaptureError> {
        debug!(url = %self.url, "posting form record");
        match self.agent.post(&self.url).send_json(record) {
            Ok(response) => {
                let reply: SubmitReply =
                    response
                        .into_json()
                        .map_err(|err| CaptureError::SubmissionRejected {
                            message: format!("Unreadable reply from server: {err}"),
                        })?;
                Ok(SubmissionReceipt {
                    message: reply
                        .message
                        .unwrap_or_else(|| "Form submitted.".to_string()),
                })
            }
            Err(ureq::Error::Status(code, response)) => {
                let message = response
                    .into_json::<SubmitReply>()
                    .ok()
                    .and_then(|reply| reply.message)
                    .unwrap_or_else(|| format!("Server returned HTTP {code}"));
                warn!(code, "submission rejected");
                Err(CaptureError::SubmissionRejected { message })
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!(error = %transport, "submission transport failure");
                Err(CaptureError::SubmissionRejected {
                    message: format!("Could not reach the server: {transport}"),
                })
            }
        }
    }
}

fn join_url(endpoint: &str, path: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    let path = path.trim();
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn record() -> FormRecord {
        FormRecord {
            name: "John Smith".to_string(),
            email: "john@example.com".to_string(),
            country_code: "+91".to_string(),
            phone: "9876543210".to_string(),
        }
    }

    /// Serve one HTTP request with a canned reply; hands the request body back.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    break;
                }
                if let Some((name, value)) = trimmed.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).expect("read body");
            let _ = tx.send(String::from_utf8_lossy(&request_body).into_owned());
            let reply = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let mut stream = stream;
            stream.write_all(reply.as_bytes()).expect("write reply");
            stream.flush().expect("flush reply");
        });
        (format!("http://{addr}"), rx)
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://host:5000/", "/submit"), "http://host:5000/submit");
        assert_eq!(join_url("http://host:5000", "submit"), "http://host:5000/submit");
        assert_eq!(join_url("http://host:5000", ""), "http://host:5000");
    }

    #[test]
    fn submit_posts_record_and_returns_server_message() {
        let (base, body_rx) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"message": "Form submitted successfully!"}"#,
        );
        let submitter = HttpSubmitter::new(&base, DEFAULT_SUBMIT_PATH, Duration::from_secs(5));
        let receipt = submitter.submit(&record()).expect("submission accepted");
        assert_eq!(receipt.message, "Form submitted successfully!");

        let sent: serde_json::Value =
            serde_json::from_str(&body_rx.recv().expect("request body")).expect("json body");
        assert_eq!(sent["countryCode"], "+91");
        assert_eq!(sent["phone"], "9876543210");
    }

    #[test]
    fn non_success_status_surfaces_message_verbatim() {
        let (base, _body_rx) = serve_once(
            "HTTP/1.1 409 Conflict",
            r#"{"message": "Phone number already registered"}"#,
        );
        let submitter = HttpSubmitter::new(&base, DEFAULT_SUBMIT_PATH, Duration::from_secs(5));
        let err = submitter.submit(&record()).expect_err("submission rejected");
        assert_eq!(
            err,
            CaptureError::SubmissionRejected {
                message: "Phone number already registered".to_string()
            }
        );
    }

    #[test]
    fn unreachable_server_is_a_rejection() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let submitter = HttpSubmitter::new(
            &format!("http://{addr}"),
            DEFAULT_SUBMIT_PATH,
            Duration::from_secs(2),
        );
        let err = submitter.submit(&record()).expect_err("no server");
        assert_eq!(err.kind(), "submission_rejected");
    }
}
