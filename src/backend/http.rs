//! HTTP implementation of [`KnowledgeBackend`]
//!
//! Talks to the knowledge service over plain HTTP using multipart forms.
//! Uploads stream the file body in fixed-size chunks so every chunk handed
//! to the connection produces one [`TransferProgress`] tick.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;

use crate::backend::{
    BackendResult, ChatResponse, IngestRequest, IngestResponse, KnowledgeBackend,
    ProgressSender, SubjectsResponse, TransferProgress,
};
use crate::config::{ApiConfig, UploadConfig};
use crate::error::{NotemindError, Result};

/// Multipart HTTP client for the knowledge service
///
/// # Examples
///
/// ```
/// use notemind::backend::HttpBackend;
/// use notemind::config::{ApiConfig, UploadConfig};
///
/// let backend = HttpBackend::new(&ApiConfig::default(), &UploadConfig::default());
/// assert!(backend.is_ok());
/// assert_eq!(backend.unwrap().base_url(), "http://localhost:5000");
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    chunk_size: usize,
}

impl HttpBackend {
    /// Create a backend from configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(api: &ApiConfig, upload: &UploadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(api.timeout())
            .user_agent(api.user_agent.clone())
            .build()
            .map_err(|e| NotemindError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized knowledge backend: base_url={}", api.base_url);

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            chunk_size: upload.chunk_size_bytes.max(1),
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::warn!("Failed to read response body: {}", e);
            NotemindError::Transport(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let detail = error_detail(&text);
            tracing::error!(
                "Knowledge service returned error {}: {}",
                status,
                detail.as_deref().unwrap_or(&text)
            );
            return Err(NotemindError::Application {
                detail,
                http_status: Some(status.as_u16()),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to parse knowledge service response: {}", e);
            NotemindError::Application {
                detail: Some(format!("Unexpected response from server: {}", e)),
                http_status: None,
            }
        })
    }
}

/// Convert a failed send into a transport error
fn transport_error(error: reqwest::Error) -> NotemindError {
    tracing::warn!("Request to knowledge service failed: {}", error);
    if error.is_timeout() {
        NotemindError::Transport("Request timed out".to_string())
    } else if error.is_connect() {
        NotemindError::Transport(format!("Could not connect to server: {}", error))
    } else {
        NotemindError::Transport(format!("Request failed: {}", error))
    }
}

/// Extract `detail` from an error body such as `{"detail": "..."}`
///
/// Non-string details (validation error lists) are kept as compact JSON.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

/// Split `content` into chunks, reporting cumulative progress as each is polled
fn chunk_stream(
    content: Bytes,
    chunk_size: usize,
    progress: ProgressSender,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static {
    let total = content.len() as u64;
    let chunks: Vec<Bytes> = (0..content.len())
        .step_by(chunk_size)
        .map(|start| content.slice(start..(start + chunk_size).min(content.len())))
        .collect();

    let mut loaded = 0u64;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        // Receiver gone means nobody is watching; the upload still proceeds.
        let _ = progress.send(TransferProgress { loaded, total });
        Ok(chunk)
    }))
}

#[async_trait]
impl KnowledgeBackend for HttpBackend {
    async fn list_subjects(&self) -> BackendResult<SubjectsResponse> {
        let url = self.endpoint("subjects");
        tracing::debug!("Fetching subjects: {}", url);

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        Self::decode(response).await
    }

    async fn ingest(
        &self,
        request: IngestRequest,
        progress: ProgressSender,
    ) -> BackendResult<IngestResponse> {
        let url = self.endpoint("ingest");
        let name = request.file.name().to_string();

        let content = tokio::fs::read(request.file.path()).await?;
        let total = content.len() as u64;
        tracing::debug!(
            "Uploading {} ({} bytes) to subject '{}' (handwritten={})",
            name,
            total,
            request.subject,
            request.handwritten
        );

        let chunks = chunk_stream(Bytes::from(content), self.chunk_size, progress);
        let body = Body::wrap_stream(chunks);
        let part = Part::stream_with_length(body, total)
            .file_name(name)
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .part("file", part)
            .text("subject", request.subject)
            .text("handwritten", request.handwritten.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode(response).await
    }

    async fn chat(&self, subject: &str, query: &str) -> BackendResult<ChatResponse> {
        let url = self.endpoint("chat");
        tracing::debug!("Sending chat query to subject '{}'", subject);

        let form = Form::new()
            .text("subject", subject.to_string())
            .text("query", query.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;

    #[test]
    fn test_endpoint_joins_paths() {
        let api = ApiConfig {
            base_url: "http://localhost:5000/".to_string(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&api, &UploadConfig::default()).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.endpoint("ingest"), "http://localhost:5000/ingest");
        assert_eq!(backend.endpoint("/chat"), "http://localhost:5000/chat");
    }

    #[test]
    fn test_error_detail_variants() {
        assert_eq!(
            error_detail(r#"{"detail":"too large"}"#).as_deref(),
            Some("too large")
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","subject"]}]}"#).as_deref(),
            Some(r#"[{"loc":["body","subject"]}]"#)
        );
        assert_eq!(error_detail(r#"{"detail":null}"#), None);
        assert_eq!(error_detail(r#"{"status":"error"}"#), None);
        assert_eq!(error_detail("Internal Server Error"), None);
    }

    #[tokio::test]
    async fn test_chunk_stream_reports_each_chunk() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks: Vec<Bytes> = chunk_stream(Bytes::from(vec![7u8; 10]), 4, tx)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(
            chunks.iter().map(Bytes::len).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );

        let mut ticks = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            assert_eq!(tick.total, 10);
            ticks.push(tick.loaded);
        }
        assert_eq!(ticks, vec![4, 8, 10]);
    }

    #[tokio::test]
    async fn test_chunk_stream_empty_file_reports_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let chunks: Vec<_> = chunk_stream(Bytes::new(), 4, tx).collect().await;
        assert!(chunks.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chunk_stream_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let chunks: Vec<_> = chunk_stream(Bytes::from_static(b"hello"), 2, tx)
            .collect()
            .await;
        assert_eq!(chunks.len(), 3);
    }
}
