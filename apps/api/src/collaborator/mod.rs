/// Collaborator client — the single point of contact with the external
/// structuring/suggestion service.
///
/// Nothing the collaborator returns is trusted: resumes are canonicalized and
/// validated, patch envelopes are shape-checked, before anything else sees
/// them. No other module talks to the service directly.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::flags::Flag;
use crate::models::resume::Resume;
use crate::models::suggestion::{check_batch, PatchEnvelope, ShapeError};
use crate::normalize::normalize;
use crate::schema::{validate_resume, Violation};

const STRUCT_PATH: &str = "/ai/struct";
const PATCH_PATH: &str = "/ai/patch";
const RESPONSE_ID_FIELD: &str = "responseId";

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collaborator returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("collaborator returned an invalid patch: {0}")]
    InvalidEnvelope(#[from] ShapeError),

    #[error("collaborator returned a resume failing validation ({} violations)", .0.len())]
    InvalidResume(Vec<Violation>),

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<CollaboratorError>,
    },
}

impl CollaboratorError {
    /// Rate limiting, server errors and transport failures are worth another
    /// attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CollaboratorError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            _ => false,
        }
    }
}

// ─── Backoff ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the random extra delay per retry.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(2000),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// `min(max_delay, base_delay * 2^attempt)`, before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        self.backoff(attempt) + Duration::from_millis(extra)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= policy.max_retries => {
                return Err(CollaboratorError::RetriesExhausted {
                    attempts: attempt + 1,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                let delay = policy.delay(attempt);
                warn!(
                    "Collaborator attempt {} failed ({e}), retrying after {}ms...",
                    attempt + 1,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestMode {
    Edit,
    Jd,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub mode: SuggestMode,
    pub resume: Resume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jd_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructRequest<'a> {
    raw_text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructResponse {
    resume: Resume,
    #[serde(default)]
    #[allow(dead_code)]
    response_id: Option<String>,
}

/// Parses a patch envelope, tolerating the optional `responseId` tag the
/// service attaches to either variant.
pub fn parse_envelope(mut body: Value) -> Result<PatchEnvelope, CollaboratorError> {
    if let Value::Object(map) = &mut body {
        map.remove(RESPONSE_ID_FIELD);
    }
    Ok(serde_json::from_value(body)?)
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Raw structuring output, not yet canonicalized.
    async fn structure(&self, raw_text: &str) -> Result<Resume, CollaboratorError>;

    /// Raw suggestion envelope, not yet shape-checked.
    async fn suggest(&self, request: &SuggestRequest) -> Result<PatchEnvelope, CollaboratorError>;
}

#[derive(Clone)]
pub struct CollaboratorClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CollaboratorClient {
    pub fn new(
        base_url: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, CollaboratorError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        with_backoff(&self.retry, move || async move {
            let response = self.client.post(url).json(body).send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(CollaboratorError::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            debug!("Collaborator {path} returned {status}");
            // A body that arrived but does not parse is final, not transient.
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice::<T>(&bytes)?)
        })
        .await
    }
}

#[async_trait]
impl Collaborator for CollaboratorClient {
    async fn structure(&self, raw_text: &str) -> Result<Resume, CollaboratorError> {
        let response: StructResponse = self
            .post_json(STRUCT_PATH, &StructRequest { raw_text })
            .await?;
        Ok(response.resume)
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<PatchEnvelope, CollaboratorError> {
        let body: Value = self.post_json(PATCH_PATH, request).await?;
        parse_envelope(body)
    }
}

// ─── Trusted entry points ────────────────────────────────────────────────────

/// Structures `raw_text` remotely, then canonicalizes and validates the result.
pub async fn structure_remote(
    collaborator: &dyn Collaborator,
    raw_text: &str,
) -> Result<(Resume, Vec<Flag>), CollaboratorError> {
    let raw = collaborator.structure(raw_text).await?;
    let normalized = normalize(&raw);
    validate_resume(&normalized.resume).map_err(CollaboratorError::InvalidResume)?;
    Ok((normalized.resume, normalized.flags))
}

/// Requests suggestions and rejects envelopes whose operations break the
/// structural contract.
pub async fn suggest_checked(
    collaborator: &dyn Collaborator,
    request: &SuggestRequest,
) -> Result<PatchEnvelope, CollaboratorError> {
    let envelope = collaborator.suggest(request).await?;
    if let Some(ops) = envelope.patch() {
        check_batch(ops)?;
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::suggestion::{PatchBatch, QuestionSet, Suggestion};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: Duration::ZERO,
            ..Default::default()
        }
    }

    fn status(code: u16) -> CollaboratorError {
        CollaboratorError::Status {
            status: code,
            message: String::new(),
        }
    }

    #[test]
    fn test_backoff_schedule_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(300));
        assert_eq!(policy.backoff(1), Duration::from_millis(600));
        assert_eq!(policy.backoff(2), Duration::from_millis(1200));
        assert_eq!(policy.backoff(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff(40), Duration::from_millis(2000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let d = policy.delay(0);
            assert!(d >= Duration::from_millis(300) && d < Duration::from_millis(400));
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(status(429).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_exhausts_retries() {
        let calls = &AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result: Result<(), _> = with_backoff(&no_jitter(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status(503))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(matches!(
            result,
            Err(CollaboratorError::RetriesExhausted { attempts: 4, .. })
        ));
        // 300 + 600 + 1200
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2100) && elapsed < Duration::from_millis(2200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_stops_on_client_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&no_jitter(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(status(400))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CollaboratorError::Status { status: 400, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_recovers() {
        let calls = &AtomicU32::new(0);
        let result = with_backoff(&no_jitter(), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(status(429))
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_parse_envelope_strips_response_id() {
        let envelope = parse_envelope(json!({
            "questions": ["Which role?"],
            "responseId": "r_1"
        }))
        .unwrap();
        assert_eq!(
            envelope,
            PatchEnvelope::Questions(QuestionSet {
                questions: vec!["Which role?".into()]
            })
        );
    }

    #[test]
    fn test_parse_envelope_rejects_mixed() {
        assert!(parse_envelope(json!({ "patch": [], "questions": [] })).is_err());
    }

    struct Canned {
        resume: Resume,
        envelope: PatchEnvelope,
    }

    #[async_trait]
    impl Collaborator for Canned {
        async fn structure(&self, _raw_text: &str) -> Result<Resume, CollaboratorError> {
            Ok(self.resume.clone())
        }

        async fn suggest(&self, _request: &SuggestRequest) -> Result<PatchEnvelope, CollaboratorError> {
            Ok(self.envelope.clone())
        }
    }

    #[tokio::test]
    async fn test_structure_remote_rejects_invalid_resume() {
        let canned = Canned {
            resume: Resume::default(),
            envelope: PatchEnvelope::Patch(PatchBatch { patch: vec![] }),
        };
        let result = structure_remote(&canned, "text").await;
        assert!(matches!(result, Err(CollaboratorError::InvalidResume(_))));
    }

    #[tokio::test]
    async fn test_suggest_checked_rejects_duplicate_ids() {
        let op = Suggestion::insert("dup", "/skills/0", json!("Rust"));
        let canned = Canned {
            resume: Resume::default(),
            envelope: PatchEnvelope::Patch(PatchBatch {
                patch: vec![op.clone(), op],
            }),
        };
        let request = SuggestRequest {
            mode: SuggestMode::Edit,
            resume: Resume::default(),
            instruction: None,
            jd_text: None,
        };
        let result = suggest_checked(&canned, &request).await;
        assert!(matches!(
            result,
            Err(CollaboratorError::InvalidEnvelope(ShapeError::DuplicateId(_)))
        ));
    }

    /// Reads one HTTP request (headers plus a content-length body).
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serves `body` with a 200 to every connection, counting requests.
    async fn serve_ok(body: &'static str) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (format!("http://{addr}"), hits)
    }

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_not_retried() {
        let (url, hits) = serve_ok("not json").await;
        let client = CollaboratorClient::new(url, fast_retries(), Duration::from_secs(5)).unwrap();
        let result = client.structure("Jane Doe").await;
        assert!(matches!(result, Err(CollaboratorError::Parse(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_structure_round_trip_over_http() {
        let (url, hits) = serve_ok(r#"{"resume":{"summary":"Hi"},"responseId":"r_9"}"#).await;
        let client = CollaboratorClient::new(url, fast_retries(), Duration::from_secs(5)).unwrap();
        let resume = client.structure("Jane Doe").await.unwrap();
        assert_eq!(resume.summary, "Hi");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
