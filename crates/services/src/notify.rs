use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::NotifyError;

/// Delivers the finished-exam message to whoever is watching.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    /// Send `message` once. Callers do not retry.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the relay cannot be reached or rejects the
    /// message.
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// POSTs `{"message": ...}` as JSON to a relay endpoint.
#[derive(Clone, Debug)]
pub struct HttpRelay {
    client: Client,
    endpoint: Url,
}

impl HttpRelay {
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationRelay for HttpRelay {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RelayRequest { message })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // The relay reports failures as `{"error": "..."}`; anything else is
        // reduced to the status code.
        let message = response
            .json::<RelayFailure>()
            .await
            .ok()
            .and_then(|body| body.error);
        Err(NotifyError::HttpStatus { status, message })
    }
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct RelayFailure {
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request.
    async fn one_shot_server(status_line: &str, body: &str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        let url = Url::parse(&format!("http://{addr}/api/send-telegram")).unwrap();
        (url, handle)
    }

    #[tokio::test]
    async fn posts_message_as_json() {
        let (url, server) = one_shot_server("200 OK", r#"{"success":true}"#).await;
        let relay = HttpRelay::new(url);

        relay.notify("*IELTS Results*").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/send-telegram"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"message":"*IELTS Results*"}"#));
    }

    #[tokio::test]
    async fn non_success_status_carries_error_field() {
        let (url, server) =
            one_shot_server("500 Internal Server Error", r#"{"error":"bot token missing"}"#).await;
        let relay = HttpRelay::new(url);

        let err = relay.notify("hello").await.unwrap_err();
        server.await.unwrap();
        match err {
            NotifyError::HttpStatus { status, message } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(message.as_deref(), Some("bot token missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
