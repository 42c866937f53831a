//! Adapter bridging `pcs_client::Client` to the `UploadTransport` trait
//! required by `pcs-upload`.

use std::sync::Arc;

use pcs_client::{Client, Error as ClientError, RequestOptions};
use pcs_protocol::{OnDuplicate, PartHash, RemoteFile};
use pcs_transfer::UploadDescriptor;
use pcs_upload::{RapidOutcome, TransportError, TransportFuture, UploadTransport};

/// Implements `UploadTransport` by delegating to the HTTP client.
pub struct ClientTransport {
    client: Arc<Client>,
    opts: RequestOptions,
}

impl ClientTransport {
    pub fn new(client: Arc<Client>, opts: RequestOptions) -> Self {
        Self { client, opts }
    }
}

impl UploadTransport for ClientTransport {
    fn upload_part<'a>(&'a self, data: &'a [u8]) -> TransportFuture<'a, PartHash> {
        Box::pin(async move {
            self.client
                .upload_tmpfile(data.to_vec(), &self.opts)
                .await
                .map_err(classify)
        })
    }

    fn commit_parts<'a>(
        &'a self,
        remote_path: &'a str,
        parts: &'a [PartHash],
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RemoteFile> {
        Box::pin(async move {
            self.client
                .create_superfile(remote_path, parts, on_duplicate, &self.opts)
                .await
                .map_err(classify)
        })
    }

    fn rapid_register<'a>(
        &'a self,
        remote_path: &'a str,
        descriptor: &'a UploadDescriptor,
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RapidOutcome> {
        Box::pin(async move {
            match self
                .client
                .rapid_upload(remote_path, descriptor, on_duplicate, &self.opts)
                .await
            {
                Ok(Some(file)) => Ok(RapidOutcome::Registered(file)),
                Ok(None) => Ok(RapidOutcome::Miss),
                Err(e) => Err(classify(e)),
            }
        })
    }

    fn upload_file<'a>(
        &'a self,
        remote_path: &'a str,
        data: &'a [u8],
        on_duplicate: OnDuplicate,
    ) -> TransportFuture<'a, RemoteFile> {
        Box::pin(async move {
            self.client
                .upload(remote_path, data.to_vec(), on_duplicate, &self.opts)
                .await
                .map_err(classify)
        })
    }
}

/// Sorts client failures into retryable and final ones.
///
/// Network errors, 5xx and 429 are transient; any other server answer is a
/// rejection carrying the PCS error code (or the HTTP status without one).
pub fn classify(err: ClientError) -> TransportError {
    match err {
        ClientError::Unauthorized | ClientError::InvalidToken => TransportError::Unauthorized,
        ClientError::Http(e) => TransportError::Transient(e.to_string()),
        ClientError::Api {
            status, message, ..
        } if status >= 500 || status == 429 => {
            TransportError::Transient(format!("HTTP {status}: {message}"))
        }
        ClientError::Api {
            status,
            code,
            message,
        } => TransportError::Rejected {
            code: code.unwrap_or(i64::from(status)),
            message,
        },
        ClientError::Json(e) => TransportError::Rejected {
            code: 0,
            message: format!("malformed response: {e}"),
        },
        ClientError::InvalidPath(message) | ClientError::InvalidRequest(message) => {
            TransportError::Rejected { code: 0, message }
        }
        ClientError::OAuth { error, description } => TransportError::Rejected {
            code: 0,
            message: format!("{error}: {description}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_transfer::{MemorySource, md5_hex};
    use pcs_upload::{UploadConfig, UploadCoordinator, UploadError, UploadMethod, UploadRequest};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn api(status: u16, code: Option<i64>) -> ClientError {
        ClientError::Api {
            status,
            code,
            message: "boom".into(),
        }
    }

    #[test]
    fn server_faults_are_transient() {
        assert!(classify(api(500, None)).is_transient());
        assert!(classify(api(503, Some(31023))).is_transient());
        assert!(classify(api(429, None)).is_transient());
    }

    #[test]
    fn client_faults_are_rejections() {
        assert_eq!(
            classify(api(400, Some(31061))),
            TransportError::Rejected {
                code: 31061,
                message: "boom".into()
            }
        );
        assert_eq!(
            classify(api(403, None)),
            TransportError::Rejected {
                code: 403,
                message: "boom".into()
            }
        );
        assert!(matches!(
            classify(ClientError::InvalidPath("x".into())),
            TransportError::Rejected { .. }
        ));
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        assert_eq!(classify(ClientError::Unauthorized), TransportError::Unauthorized);
        assert_eq!(classify(ClientError::InvalidToken), TransportError::Unauthorized);
    }

    /// Serves canned JSON responses, one per connection, in order.
    async fn mock_server(responses: Vec<String>) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");

        let handle = tokio::spawn(async move {
            for body in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                drain_request(&mut stream).await;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    /// Reads one request: headers, then a `Content-Length` or chunked body.
    async fn drain_request(stream: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body = &buf[end + 4..];
            let done = match head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
            {
                Some(len) => body.len() >= len,
                None if head.contains("transfer-encoding: chunked") => {
                    body.windows(5).any(|w| w == b"0\r\n\r\n")
                }
                None => true,
            };
            if done {
                return;
            }
        }
    }

    #[tokio::test]
    async fn chunked_upload_over_http() {
        let (url, handle) = mock_server(vec![
            format!(r#"{{"md5":"{}","request_id":1}}"#, md5_hex(b"abc")),
            format!(r#"{{"md5":"{}","request_id":2}}"#, md5_hex(b"def")),
            r#"{"path":"/apps/t/abcdef.txt","size":6,"fs_id":42,"md5":"e80b5017098950fc58aad83c8c14978e"}"#.to_string(),
        ])
        .await;
        let client = Client::new("test-token").unwrap().with_base_urls(&url, &url, &url);
        let transport = Arc::new(ClientTransport::new(Arc::new(client), RequestOptions::default()));
        let config = UploadConfig {
            chunk_size: 3,
            concurrency: 1,
            rapid_upload: false,
            ..Default::default()
        };
        let coord = UploadCoordinator::new(transport, config);
        let mut src = MemorySource::new(b"abcdef".to_vec());

        let outcome = coord
            .upload(&UploadRequest::new("/apps/t/abcdef.txt", OnDuplicate::Fail), &mut src)
            .await
            .unwrap();

        assert_eq!(outcome.method, UploadMethod::Chunked { parts: 2 });
        assert_eq!(outcome.file.fs_id, 42);
        handle.abort();
    }

    #[tokio::test]
    async fn invalid_path_is_rejected_by_client() {
        let client = Client::new("test-token")
            .unwrap()
            .with_base_urls("http://127.0.0.1:1", "http://127.0.0.1:1", "http://127.0.0.1:1");
        let transport = Arc::new(ClientTransport::new(Arc::new(client), RequestOptions::default()));
        let coord = UploadCoordinator::new(transport, UploadConfig::default());
        let mut src = MemorySource::new(b"tiny".to_vec());

        let err = coord
            .upload(&UploadRequest::new("/apps/t/bad:name", OnDuplicate::Fail), &mut src)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rejected { .. }), "{err}");
    }
}
