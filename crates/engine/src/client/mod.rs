//! Client for the external job-based paper-search service
//!
//! The service accepts a job submission and answers it asynchronously:
//! `POST /job/{jobType}?limit=N` returns a job id, and
//! `GET /job/{jobId}` reports `queued`, `success`, or `error` until the
//! job settles. This module hides that protocol behind one call and
//! repairs the service's rigid input constraints before submission
//! (exactly 3 phrases for combined search, query length in [50, 5000]).
//!
//! A job that reports `error` or never settles within the polling
//! budget is a "no answer" outcome and surfaces as `Ok(None)`; only
//! transport failures and rejected submissions return `Err`. Callers
//! distinguish "could not even ask" from "asked and got nothing".

use async_trait::async_trait;
use citegraph_common::config::SearchServiceConfig;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::models::PaperRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Phrases required by the combined-search job type
pub const REQUIRED_PHRASE_COUNT: usize = 3;

/// Phrase used when the caller supplies none at all
const FALLBACK_PHRASE: &str = "research";

/// Minimum accepted query length
pub const MIN_QUERY_LEN: usize = 50;

/// Maximum accepted query length
pub const MAX_QUERY_LEN: usize = 5000;

/// Generic filler appended until a query reaches the minimum length
const QUERY_PAD: &str = "research paper academic study scientific investigation";

/// Job types offered by the search service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    /// Exactly 3 phrases plus a 50..5000 character query
    CombinedSearch,
    /// At least 3 phrases, no query body
    KeywordSearch,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CombinedSearch => "combinedSearch",
            JobType::KeywordSearch => "keywordSearch",
        }
    }
}

/// Submission body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub phrases: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Submission response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmitted {
    pub job_id: String,
}

/// Terminal and non-terminal job states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Success,
    Error,
}

/// Poll response
#[derive(Debug, Clone, Deserialize)]
pub struct JobPoll {
    pub status: JobStatus,

    #[serde(default)]
    pub results: Vec<PaperRecord>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Transport seam over the search service, mockable in tests
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Submit a job; non-2xx responses are transport errors
    async fn submit(
        &self,
        job_type: JobType,
        limit: usize,
        request: &SubmitJobRequest,
    ) -> Result<JobSubmitted>;

    /// Fetch the current state of a job
    async fn poll(&self, job_id: &str) -> Result<JobPoll>;
}

/// reqwest-backed transport
pub struct HttpSearchTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchTransport {
    pub fn new(config: &SearchServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchTransport for HttpSearchTransport {
    async fn submit(
        &self,
        job_type: JobType,
        limit: usize,
        request: &SubmitJobRequest,
    ) -> Result<JobSubmitted> {
        let url = format!("{}/job/{}", self.base_url, job_type.as_str());
        let response = self
            .client
            .post(&url)
            .query(&[("limit", limit)])
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                message: format!("search service unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::JobSubmission {
                message: format!("submission failed ({}): {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::Upstream {
            message: format!("invalid submission response: {}", e),
        })
    }

    async fn poll(&self, job_id: &str) -> Result<JobPoll> {
        let url = format!("{}/job/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                message: format!("search service unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Upstream {
                message: format!("poll failed with status {}", response.status()),
            });
        }

        response.json().await.map_err(|e| AppError::Upstream {
            message: format!("invalid poll response: {}", e),
        })
    }
}

/// Client wrapping submission, input repair, and the poll loop
pub struct JobSearchClient {
    transport: Arc<dyn SearchTransport>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl JobSearchClient {
    pub fn new(config: &SearchServiceConfig) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(HttpSearchTransport::new(config)?),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    /// Construct over a custom transport (tests, alternate backends)
    pub fn with_transport(
        transport: Arc<dyn SearchTransport>,
        poll_interval: Duration,
        max_poll_attempts: u32,
    ) -> Self {
        Self {
            transport,
            poll_interval,
            max_poll_attempts,
        }
    }

    /// Combined search: submit and wait for the best single result.
    ///
    /// Returns `Ok(None)` when the job fails, times out, or settles
    /// with no results.
    pub async fn search(
        &self,
        phrases: &[String],
        query_text: &str,
        limit: usize,
    ) -> Result<Option<PaperRecord>> {
        self.search_with_cancellation(phrases, query_text, limit, &CancellationToken::new())
            .await
    }

    /// Combined search with early cancellation; a cancelled wait
    /// surfaces as `Ok(None)` just like a timeout
    pub async fn search_with_cancellation(
        &self,
        phrases: &[String],
        query_text: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<PaperRecord>> {
        let request = SubmitJobRequest {
            phrases: pad_phrases(phrases),
            query: Some(pad_query(query_text)),
        };

        let submitted = self
            .transport
            .submit(JobType::CombinedSearch, limit, &request)
            .await?;
        debug!(job_id = %submitted.job_id, "combined search job submitted");

        let results = self.poll_until_settled(&submitted.job_id, cancel).await?;
        Ok(results.and_then(select_best))
    }

    /// Keyword search: all settled results rather than the single best.
    /// Phrases are padded to the minimum of 3 but not truncated.
    pub async fn search_keywords(
        &self,
        phrases: &[String],
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<PaperRecord>> {
        let mut padded = pad_phrases(phrases);
        // keywordSearch accepts more than 3 phrases; keep the extras
        if phrases.len() > REQUIRED_PHRASE_COUNT {
            padded = phrases.to_vec();
        }

        let request = SubmitJobRequest {
            phrases: padded,
            query: None,
        };

        let submitted = self
            .transport
            .submit(JobType::KeywordSearch, limit, &request)
            .await?;
        debug!(job_id = %submitted.job_id, "keyword search job submitted");

        Ok(self
            .poll_until_settled(&submitted.job_id, cancel)
            .await?
            .unwrap_or_default())
    }

    /// Poll until the job settles, the attempt budget runs out, or the
    /// caller cancels. `Ok(None)` covers job error, timeout, and
    /// cancellation; `Err` covers only submission-grade transport
    /// failures (a transient poll failure spends an attempt instead).
    async fn poll_until_settled(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<PaperRecord>>> {
        for attempt in 1..=self.max_poll_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(job_id = %job_id, attempt, "poll loop cancelled by caller");
                    return Ok(None);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let poll = match self.transport.poll(job_id).await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!(job_id = %job_id, attempt, error = %e, "poll attempt failed");
                    continue;
                }
            };

            match poll.status {
                JobStatus::Queued => {
                    debug!(job_id = %job_id, attempt, "job still queued");
                }
                JobStatus::Success => {
                    debug!(job_id = %job_id, attempt, results = poll.results.len(), "job succeeded");
                    return Ok(Some(poll.results));
                }
                JobStatus::Error => {
                    warn!(
                        job_id = %job_id,
                        attempt,
                        error = poll.error.as_deref().unwrap_or("unknown"),
                        "job reported failure"
                    );
                    return Ok(None);
                }
            }
        }

        warn!(
            job_id = %job_id,
            attempts = self.max_poll_attempts,
            "job did not settle within the polling budget"
        );
        Ok(None)
    }
}

/// First result with a non-empty trimmed TLDR, else the first result
fn select_best(results: Vec<PaperRecord>) -> Option<PaperRecord> {
    if results.is_empty() {
        return None;
    }
    match results.iter().position(PaperRecord::has_tldr) {
        Some(index) => results.into_iter().nth(index),
        None => results.into_iter().next(),
    }
}

/// Repair a phrase list to exactly 3 entries: truncate extras,
/// duplicate the first phrase to fill, or fall back to a literal when
/// the list started empty
fn pad_phrases(phrases: &[String]) -> Vec<String> {
    let mut padded: Vec<String> = phrases
        .iter()
        .take(REQUIRED_PHRASE_COUNT)
        .cloned()
        .collect();

    while padded.len() < REQUIRED_PHRASE_COUNT {
        let filler = padded
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_PHRASE.to_string());
        padded.push(filler);
    }
    padded
}

/// Repair a query into the accepted [50, 5000] character window
fn pad_query(query_text: &str) -> String {
    let mut query = query_text.to_string();

    while query.chars().count() < MIN_QUERY_LEN {
        if !query.is_empty() {
            query.push(' ');
        }
        query.push_str(QUERY_PAD);
    }

    if query.chars().count() > MAX_QUERY_LEN {
        query = query.chars().take(MAX_QUERY_LEN).collect();
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn paper(id: &str, tldr: Option<&str>) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: String::new(),
            year: None,
            fields_of_study: vec![],
            citation_count: 0,
            reference_count: 0,
            relevance_score: 0.0,
            tldr: tldr.map(str::to_string),
            journal_name: None,
            publication_type: None,
        }
    }

    /// Transport scripted with a fixed sequence of poll responses
    struct ScriptedTransport {
        polls: Mutex<VecDeque<JobPoll>>,
        submissions: Mutex<Vec<SubmitJobRequest>>,
    }

    impl ScriptedTransport {
        fn new(polls: Vec<JobPoll>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn last_submission(&self) -> SubmitJobRequest {
            self.submissions.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl SearchTransport for ScriptedTransport {
        async fn submit(
            &self,
            _job_type: JobType,
            _limit: usize,
            request: &SubmitJobRequest,
        ) -> Result<JobSubmitted> {
            self.submissions.lock().unwrap().push(request.clone());
            Ok(JobSubmitted {
                job_id: "job-1".to_string(),
            })
        }

        async fn poll(&self, _job_id: &str) -> Result<JobPoll> {
            Ok(self
                .polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(JobPoll {
                    status: JobStatus::Queued,
                    results: vec![],
                    error: None,
                }))
        }
    }

    fn client(transport: Arc<ScriptedTransport>, attempts: u32) -> JobSearchClient {
        JobSearchClient::with_transport(transport, Duration::from_millis(1), attempts)
    }

    fn queued() -> JobPoll {
        JobPoll {
            status: JobStatus::Queued,
            results: vec![],
            error: None,
        }
    }

    fn success(results: Vec<PaperRecord>) -> JobPoll {
        JobPoll {
            status: JobStatus::Success,
            results,
            error: None,
        }
    }

    #[test]
    fn test_pad_phrases_always_three() {
        for n in 0..10 {
            let phrases: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
            assert_eq!(pad_phrases(&phrases).len(), REQUIRED_PHRASE_COUNT);
        }
    }

    #[test]
    fn test_pad_phrases_duplicates_first() {
        let padded = pad_phrases(&["ml".to_string()]);
        assert_eq!(padded, vec!["ml", "ml", "ml"]);
    }

    #[test]
    fn test_pad_phrases_empty_uses_fallback() {
        let padded = pad_phrases(&[]);
        assert_eq!(padded, vec![FALLBACK_PHRASE; 3]);
    }

    #[test]
    fn test_pad_phrases_truncates_extras() {
        let phrases: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        assert_eq!(pad_phrases(&phrases), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pad_query_bounds() {
        let inputs = vec![
            String::new(),
            "short".to_string(),
            "x".repeat(49),
            "y".repeat(50),
            "z".repeat(9000),
        ];
        for input in &inputs {
            let padded = pad_query(input);
            let len = padded.chars().count();
            assert!(
                (MIN_QUERY_LEN..=MAX_QUERY_LEN).contains(&len),
                "padded length {} out of range for input length {}",
                len,
                input.len()
            );
        }
    }

    #[test]
    fn test_pad_query_keeps_original_prefix() {
        let padded = pad_query("short");
        assert!(padded.starts_with("short "));
    }

    #[test]
    fn test_select_best_prefers_tldr() {
        let results = vec![
            paper("no-tldr", None),
            paper("blank-tldr", Some("   ")),
            paper("with-tldr", Some("a summary")),
        ];
        assert_eq!(select_best(results).unwrap().id, "with-tldr");
    }

    #[test]
    fn test_select_best_falls_back_to_first() {
        let results = vec![paper("first", None), paper("second", None)];
        assert_eq!(select_best(results).unwrap().id, "first");
    }

    #[tokio::test]
    async fn test_search_repairs_inputs_before_submission() {
        let transport = Arc::new(ScriptedTransport::new(vec![success(vec![paper(
            "hit",
            Some("summary"),
        )])]));
        let client = client(transport.clone(), 5);

        let found = client
            .search(&["ml".to_string()], "short", 10)
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "hit");

        let submitted = transport.last_submission();
        assert_eq!(submitted.phrases, vec!["ml", "ml", "ml"]);
        let query = submitted.query.unwrap();
        assert!(query.chars().count() >= MIN_QUERY_LEN);
    }

    #[tokio::test]
    async fn test_search_waits_through_queued_polls() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            queued(),
            queued(),
            success(vec![paper("late", None)]),
        ]));
        let client = client(transport, 10);

        let found = client.search(&[], "", 5).await.unwrap();
        assert_eq!(found.unwrap().id, "late");
    }

    #[tokio::test]
    async fn test_job_error_is_none_not_exception() {
        let transport = Arc::new(ScriptedTransport::new(vec![JobPoll {
            status: JobStatus::Error,
            results: vec![],
            error: Some("backend exploded".to_string()),
        }]));
        let client = client(transport, 10);

        assert!(client.search(&[], "", 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_none_not_exception() {
        // Every poll stays queued; the budget runs out
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = client(transport, 30);

        assert!(client.search(&[], "", 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_success_with_empty_results_is_none() {
        let transport = Arc::new(ScriptedTransport::new(vec![success(vec![])]));
        let client = client(transport, 5);
        assert!(client.search(&[], "", 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancellation_ends_wait_early() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = JobSearchClient::with_transport(transport, Duration::from_secs(60), 30);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let found = client
            .search_with_cancellation(&[], "", 5, &cancel)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_keyword_search_keeps_extra_phrases() {
        let transport = Arc::new(ScriptedTransport::new(vec![success(vec![
            paper("a", None),
            paper("b", None),
        ])]));
        let client = client(transport.clone(), 5);

        let phrases: Vec<String> = ["w", "x", "y", "z"].iter().map(|s| s.to_string()).collect();
        let results = client
            .search_keywords(&phrases, 10, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);

        let submitted = transport.last_submission();
        assert_eq!(submitted.phrases.len(), 4);
        assert!(submitted.query.is_none());
    }

    #[tokio::test]
    async fn test_keyword_search_pads_to_minimum() {
        let transport = Arc::new(ScriptedTransport::new(vec![success(vec![])]));
        let client = client(transport.clone(), 5);

        client
            .search_keywords(&["solo".to_string()], 10, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(transport.last_submission().phrases, vec!["solo", "solo", "solo"]);
    }
}
