//! Outbound analysis request: one multipart POST per user-triggered submit.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::capture::CroppedImage;

pub const DEFAULT_FIELD_NAME: &str = "image";
pub const DEFAULT_FILE_NAME: &str = "capture.jpg";

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Pending,
    /// Raw response body, passed through untouched.
    Success(String),
    Failure(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Network,
    Server { status: u16 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("the analysis service did not respond in time"),
            Self::Network => f.write_str("could not reach the analysis service"),
            Self::Server { status } => write!(f, "the analysis service returned status {status}"),
        }
    }
}

/// Named file part of the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub field_name: String,
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {message}")]
    Network { message: String },
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no analysis endpoint configured")]
    MissingEndpoint,
    #[error("invalid analysis endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

pub trait AnalysisTransport: Send + Sync + 'static {
    fn post(
        &self,
        part: UploadPart,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport posting to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SubmissionError> {
        let endpoint =
            reqwest::Url::parse(endpoint).map_err(|err| SubmissionError::InvalidEndpoint {
                url: endpoint.to_string(),
                message: err.to_string(),
            })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SubmissionError::Client)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

impl AnalysisTransport for HttpTransport {
    async fn post(&self, part: UploadPart) -> Result<TransportResponse, TransportError> {
        let file = reqwest::multipart::Part::bytes(part.bytes)
            .file_name(part.file_name)
            .mime_str(part.mime)
            .map_err(classify_reqwest_error)?;
        let form = reqwest::multipart::Form::new().part(part.field_name, file);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(TransportResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network {
            message: err.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct SubmissionPipeline<T> {
    transport: T,
    field_name: String,
    file_name: String,
}

impl<T: AnalysisTransport> SubmissionPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self::with_part_names(transport, DEFAULT_FIELD_NAME, DEFAULT_FILE_NAME)
    }

    pub fn with_part_names(
        transport: T,
        field_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            field_name: field_name.into(),
            file_name: file_name.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn upload_part(&self, image: &CroppedImage) -> UploadPart {
        UploadPart {
            field_name: self.field_name.clone(),
            file_name: self.file_name.clone(),
            mime: CroppedImage::MIME,
            bytes: image.bytes().to_vec(),
        }
    }

    /// Single attempt, no retry. Never returns `Pending`.
    pub async fn submit(&self, image: &CroppedImage) -> SubmissionResult {
        let part = self.upload_part(image);
        tracing::info!(
            field = %part.field_name,
            file = %part.file_name,
            size = part.bytes.len(),
            "submitting crop for analysis"
        );

        match self.transport.post(part).await {
            Ok(response) => classify_response(response),
            Err(err) => {
                tracing::warn!(%err, "analysis request failed");
                SubmissionResult::Failure(match err {
                    TransportError::Timeout => FailureReason::Timeout,
                    TransportError::Network { .. } => FailureReason::Network,
                })
            }
        }
    }
}

fn classify_response(response: TransportResponse) -> SubmissionResult {
    if response.is_success() {
        tracing::info!(status = response.status, "analysis succeeded");
        SubmissionResult::Success(response.body)
    } else {
        tracing::warn!(status = response.status, "analysis service rejected request");
        SubmissionResult::Failure(FailureReason::Server {
            status: response.status,
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Transport returning scripted responses and recording every part it saw.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        seen: Mutex<Vec<UploadPart>>,
    }

    impl ScriptedTransport {
        pub(crate) fn respond(self, status: u16, body: &str) -> Self {
            self.responses
                .lock()
                .expect("responses lock")
                .push_back(Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }));
            self
        }

        pub(crate) fn fail(self, error: TransportError) -> Self {
            self.responses
                .lock()
                .expect("responses lock")
                .push_back(Err(error));
            self
        }

        pub(crate) fn seen(&self) -> Vec<UploadPart> {
            self.seen.lock().expect("seen lock").clone()
        }
    }

    impl AnalysisTransport for ScriptedTransport {
        async fn post(&self, part: UploadPart) -> Result<TransportResponse, TransportError> {
            self.seen.lock().expect("seen lock").push(part);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or(Err(TransportError::Network {
                    message: "no scripted response".to_string(),
                }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::ScriptedTransport;
    use super::*;

    fn image() -> CroppedImage {
        CroppedImage::new(vec![0xFF_u8, 0xD8, 0xFF, 0xD9], 2, 2)
    }

    #[tokio::test]
    async fn success_status_passes_body_through() {
        let pipeline = SubmissionPipeline::new(ScriptedTransport::default().respond(200, "42 apples"));

        let result = pipeline.submit(&image()).await;
        assert_eq!(result, SubmissionResult::Success("42 apples".to_string()));
    }

    #[tokio::test]
    async fn any_2xx_status_counts_as_success() {
        let pipeline = SubmissionPipeline::new(ScriptedTransport::default().respond(204, ""));

        assert_eq!(
            pipeline.submit(&image()).await,
            SubmissionResult::Success(String::new())
        );
    }

    #[tokio::test]
    async fn non_success_status_is_server_failure() {
        let pipeline =
            SubmissionPipeline::new(ScriptedTransport::default().respond(500, "internal error"));

        assert_eq!(
            pipeline.submit(&image()).await,
            SubmissionResult::Failure(FailureReason::Server { status: 500 })
        );
    }

    #[tokio::test]
    async fn transport_errors_are_classified_without_raw_details() {
        let pipeline = SubmissionPipeline::new(
            ScriptedTransport::default()
                .fail(TransportError::Timeout)
                .fail(TransportError::Network {
                    message: "connection refused (os error 111)".to_string(),
                }),
        );

        let first = pipeline.submit(&image()).await;
        let second = pipeline.submit(&image()).await;
        assert_eq!(first, SubmissionResult::Failure(FailureReason::Timeout));
        assert_eq!(second, SubmissionResult::Failure(FailureReason::Network));
        assert!(!FailureReason::Network.to_string().contains("os error"));
    }

    #[tokio::test]
    async fn submit_makes_exactly_one_attempt_with_named_jpeg_part() {
        let pipeline = SubmissionPipeline::new(ScriptedTransport::default().respond(503, ""));

        let _ = pipeline.submit(&image()).await;
        let seen = pipeline.transport().seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].field_name, "image");
        assert_eq!(seen[0].file_name, "capture.jpg");
        assert_eq!(seen[0].mime, "image/jpeg");
        assert_eq!(seen[0].bytes, image().bytes());
    }

    #[test]
    fn http_transport_rejects_malformed_endpoint() {
        let err = HttpTransport::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn http_transport_posts_multipart_body() {
        let image = CroppedImage::new(b"jpeg payload".to_vec(), 2, 2);
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex(r#"name="image"; filename="capture.jpg""#.to_string()),
                mockito::Matcher::Regex("jpeg payload".to_string()),
            ]))
            .with_status(200)
            .with_body("42 apples")
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/webhook", server.url()), Duration::from_secs(5))
            .expect("transport should build");
        let result = SubmissionPipeline::new(transport).submit(&image).await;

        mock.assert_async().await;
        assert_eq!(result, SubmissionResult::Success("42 apples".to_string()));
    }

    #[tokio::test]
    async fn http_transport_reports_server_error_status() {
        let image = CroppedImage::new(b"jpeg payload".to_vec(), 2, 2);
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url(), Duration::from_secs(5))
            .expect("transport should build");
        let result = SubmissionPipeline::new(transport).submit(&image).await;

        assert_eq!(
            result,
            SubmissionResult::Failure(FailureReason::Server { status: 500 })
        );
    }

    #[tokio::test]
    async fn http_transport_reports_unreachable_endpoint_as_network_failure() {
        let transport = HttpTransport::new("http://127.0.0.1:9/", Duration::from_secs(5))
            .expect("transport should build");
        let result = SubmissionPipeline::new(transport).submit(&image()).await;

        assert!(matches!(
            result,
            SubmissionResult::Failure(FailureReason::Network | FailureReason::Timeout)
        ));
    }
}
