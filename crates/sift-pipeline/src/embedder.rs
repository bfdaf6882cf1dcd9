//! Embedder construction from configuration.
//!
//! Besides the offline [`HashingEmbedder`], sift can call any embeddings API
//! that speaks the OpenAI wire format:
//!
//! ```text
//! POST {url}  {"model": "...", "input": ["text", ...]}
//!   ->        {"data": [{"index": 0, "embedding": [0.1, ...]}, ...]}
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sift_index::{EmbedError, Embedder, HashingEmbedder};

use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::{PipelineError, PipelineResult};

/// Client for an OpenAI-compatible embeddings endpoint.
///
/// Every request is bounded by the configured timeout and fails fast; there
/// are no retries.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new embeddings client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sift/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
            model: model.into(),
            api_key,
            timeout,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, e: &reqwest::Error) -> EmbedError {
        if e.is_timeout() {
            EmbedError::Timeout(self.timeout)
        } else {
            EmbedError::Request(format!("{}: {e}", self.url))
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.encode_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Malformed("empty response".to_string()))
    }

    async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        log::debug!("Requesting {} embeddings from {}", texts.len(), self.url);
        let response = request.send().await.map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedError::Request(format!(
                "{} returned HTTP {status}",
                self.url
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                EmbedError::Timeout(self.timeout)
            } else {
                EmbedError::Malformed(e.to_string())
            }
        })?;

        order_embeddings(parsed.data, texts.len())
    }
}

/// Put response vectors back in input order and check there is one per text.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if data.len() != expected {
        return Err(EmbedError::Malformed(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }

    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
        let in_sequence = data
            .iter()
            .enumerate()
            .all(|(i, d)| d.index == Some(i));
        if !in_sequence {
            return Err(EmbedError::Malformed(
                "embedding indices do not match inputs".to_string(),
            ));
        }
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

/// Build the embedder named by `config`.
///
/// # Errors
/// Returns an error if an HTTP embedder is configured without a URL or
/// model, or its client cannot be created.
pub fn embedder_from_config(config: &EmbedderConfig) -> PipelineResult<Arc<dyn Embedder>> {
    match config.kind {
        EmbedderKind::Hashing => {
            log::debug!("Using hashing embedder ({} dimensions)", config.dimension);
            Ok(Arc::new(HashingEmbedder::new(config.dimension)))
        }
        EmbedderKind::Http => {
            let url = config.url.clone().ok_or_else(|| {
                PipelineError::EmbedderConfig("embedder.url is required for kind = \"http\"".into())
            })?;
            let model = config.model.clone().ok_or_else(|| {
                PipelineError::EmbedderConfig(
                    "embedder.model is required for kind = \"http\"".into(),
                )
            })?;
            log::debug!("Using HTTP embedder {model} at {url}");
            let embedder = HttpEmbedder::new(
                url,
                model,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs.max(1)),
            )?;
            Ok(Arc::new(embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one connection with a canned JSON body; returns the base URL and
    /// a handle yielding the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/v1/embeddings"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    fn embedder(url: &str) -> HttpEmbedder {
        HttpEmbedder::new(url, "mini", Some("secret".into()), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_encode_batch_sends_openai_request() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .await;

        let vectors = embedder(&url)
            .encode_batch(&["email automation", "file backup"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/embeddings"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""model":"mini""#));
        assert!(request.contains(r#""input":["email automation","file backup"]"#));
    }

    #[tokio::test]
    async fn test_encode_single_text() {
        let (url, _server) = serve_once("200 OK", r#"{"data":[{"embedding":[0.6,0.8]}]}"#).await;
        let vector = embedder(&url).encode("payment processing").await.unwrap();
        assert_eq!(vector, vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;
        let result = embedder(&url).encode("anything").await;
        assert!(matches!(result, Err(EmbedError::Request(_))));
    }

    #[tokio::test]
    async fn test_wrong_vector_count_is_malformed() {
        let (url, _server) = serve_once("200 OK", r#"{"data":[{"embedding":[1.0]}]}"#).await;
        let result = embedder(&url).encode_batch(&["a", "b"]).await;
        assert!(matches!(result, Err(EmbedError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_malformed() {
        let (url, _server) = serve_once("200 OK", r#"{"unexpected":true}"#).await;
        let result = embedder(&url).encode("anything").await;
        assert!(matches!(result, Err(EmbedError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let slow = HttpEmbedder::new(url, "mini", None, Duration::from_millis(200)).unwrap();
        let result = slow.encode("anything").await;
        assert!(matches!(result, Err(EmbedError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let vectors = embedder("http://127.0.0.1:9/unused")
            .encode_batch(&[])
            .await
            .unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_embedder_from_config_defaults_to_hashing() {
        let embedder = embedder_from_config(&EmbedderConfig::default()).unwrap();
        assert!(format!("{embedder:?}").contains("HashingEmbedder"));
    }

    #[test]
    fn test_http_embedder_requires_url_and_model() {
        let mut config = EmbedderConfig {
            kind: EmbedderKind::Http,
            ..EmbedderConfig::default()
        };
        assert!(matches!(
            embedder_from_config(&config),
            Err(PipelineError::EmbedderConfig(_))
        ));

        config.url = Some("http://localhost:8080/v1/embeddings".into());
        assert!(embedder_from_config(&config).is_err());

        config.model = Some("mini".into());
        assert!(embedder_from_config(&config).is_ok());
    }
}
