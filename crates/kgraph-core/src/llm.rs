//! Optional LLM fallback for inputs the rule-based classifier rejects.
//!
//! The dispatcher calls the handler with the raw input and expects back
//! either a structured command or `None` when the model punts. Handler
//! failures never surface to the user; the dispatcher falls back to its
//! "did you mean" flow.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Structured command as produced by an external interpreter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCommand {
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub trait LlmHandler: Send {
    fn interpret(&self, input: &str) -> anyhow::Result<Option<LlmCommand>>;
}

/// Calls an HTTP endpoint that maps free text to a command. The endpoint
/// receives `{"input": "..."}` and replies with an `LlmCommand` JSON
/// object, or `null` when it cannot interpret the input.
pub struct HttpLlmHandler {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpLlmHandler {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl LlmHandler for HttpLlmHandler {
    fn interpret(&self, input: &str) -> anyhow::Result<Option<LlmCommand>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "input": input }))
            .send()
            .context("LLM interpreter request failed")?
            .error_for_status()
            .context("LLM interpreter returned an error status")?;

        let command: Option<LlmCommand> = response
            .json()
            .context("LLM interpreter returned malformed JSON")?;
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                // Drain the request (headers plus content-length body)
                // before responding, so the client never sees a reset
                // mid-send.
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&request);
                    if let Some(header_end) = text.find("\r\n\r\n") {
                        let content_length = text
                            .lines()
                            .find_map(|l| {
                                let lower = l.to_lowercase();
                                lower
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().to_string())
                            })
                            .and_then(|v| v.parse::<usize>().ok())
                            .unwrap_or(0);
                        if request.len() >= header_end + 4 + content_length {
                            break;
                        }
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_interpret_parses_command() {
        let endpoint = serve_once(r#"{"type":"add_entity","params":{"name":"Unity","entityType":"Technology"}}"#);
        let handler = HttpLlmHandler::new(endpoint);
        let command = handler.interpret("please record unity").unwrap().unwrap();
        assert_eq!(command.command_type, "add_entity");
        assert_eq!(command.params["name"], "Unity");
    }

    #[test]
    fn test_interpret_accepts_null() {
        let endpoint = serve_once("null");
        let handler = HttpLlmHandler::new(endpoint);
        assert!(handler.interpret("gibberish").unwrap().is_none());
    }

    #[test]
    fn test_interpret_surfaces_connection_errors() {
        // Nothing listens on this port once the listener is dropped.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let handler = HttpLlmHandler::new(endpoint);
        assert!(handler.interpret("anything").is_err());
    }
}
