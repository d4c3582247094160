use crate::aggregator::ResultAggregator;
use crate::candidates::CandidateGenerator;
use crate::config::ScanConfig;
use crate::error::ConfigError;
use crate::queue::JobQueue;
use crate::recursion::RecursionController;
use crate::types::{RequestOutcome, ScanJob, ScanReport, ScanResult};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use ::time::{format_description::well_known, OffsetDateTime};

/// Fuzz the configured target with every candidate derived from `words`.
///
/// - Runs `config.threads` workers pulling from one shared job queue.
/// - Each request is bounded by `config.timeout`; failures are counted, never retried.
/// - Accepted directory hits are re-expanded up to the recursion depth cap.
/// - Ctrl-C cancels the scan; whatever was collected so far is still returned.
pub async fn run_scan(config: ScanConfig, words: Vec<String>) -> Result<ScanReport, ConfigError> {
    let cancel = CancellationToken::new();

    let cancel_ctrlc = cancel.clone();
    let ctrlc = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight requests");
            cancel_ctrlc.cancel();
        }
    });

    let report = run_scan_internal(config, words, cancel).await;
    ctrlc.abort();
    report
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
pub async fn run_scan_with_cancel(
    config: ScanConfig,
    words: Vec<String>,
    cancel: CancellationToken,
) -> Result<ScanReport, ConfigError> {
    run_scan_internal(config, words, cancel).await
}

/// State shared read-only by every worker.
struct WorkerContext {
    config: Arc<ScanConfig>,
    client: Client,
    queue: Arc<JobQueue>,
    aggregator: ResultAggregator,
    recursion: RecursionController,
    cancel: CancellationToken,
}

async fn run_scan_internal(
    config: ScanConfig,
    words: Vec<String>,
    cancel: CancellationToken,
) -> Result<ScanReport, ConfigError> {
    let started = Instant::now();
    let client = build_client(&config)?;
    let generator = CandidateGenerator::new(words)
        .with_extensions(&config.extensions)
        .with_cases(config.cases.clone())
        .with_ignored_extensions(&config.ignored_extensions);

    info!(
        target_url = %config.target,
        words = generator.word_count(),
        candidates = generator.len_hint(),
        threads = config.threads,
        "starting scan"
    );

    let queue = JobQueue::new(config.queue_capacity);
    let ctx = Arc::new(WorkerContext {
        recursion: RecursionController::new(config.recursion.clone(), generator.clone()),
        config: Arc::new(config),
        client,
        queue: Arc::clone(&queue),
        aggregator: ResultAggregator::new(),
        cancel: cancel.clone(),
    });

    queue.spawn_producer(generator.iter(), ctx.config.target.clone(), 0, cancel.clone());

    let mut set = JoinSet::new();
    for id in 0..ctx.config.threads {
        set.spawn(worker(Arc::clone(&ctx), id));
    }
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            warn!("worker task failed: {e}");
        }
    }

    let (results, summary) = ctx.aggregator.finish().await;
    let report = ScanReport {
        results,
        summary,
        elapsed: started.elapsed(),
        cancelled: cancel.is_cancelled(),
    };
    info!(
        total = report.summary.total,
        failed = report.summary.failed,
        found = report.results.len(),
        cancelled = report.cancelled,
        "scan finished"
    );
    Ok(report)
}

async fn worker(ctx: Arc<WorkerContext>, id: usize) {
    while let Some(job) = ctx.queue.pop(&ctx.cancel).await {
        let outcome = dispatch(&ctx.client, &ctx.config, job).await;
        handle_outcome(&ctx, outcome).await;
        ctx.queue.complete();
    }
    trace!(worker = id, "worker stopped");
}

/// Filter, aggregate and possibly recurse on one outcome.
async fn handle_outcome(ctx: &WorkerContext, outcome: RequestOutcome) {
    if let Some(err) = &outcome.error {
        debug!(url = %outcome.url, error = %err, "request failed");
    }

    let verdict = ctx.config.filters.evaluate(&outcome);
    let accepted = if verdict.is_accepted() {
        let result = ScanResult::from_outcome(&outcome, ctx.config.method.as_str(), now_iso_like());
        info!(
            status = result.status_code,
            length = result.content_length,
            depth = result.depth,
            "found {}",
            result.url
        );
        Some(result)
    } else {
        trace!(url = %outcome.url, ?verdict, "filtered");
        None
    };

    let recurse = accepted.is_some();
    ctx.aggregator
        .record(outcome.elapsed, outcome.is_response(), accepted)
        .await;

    if recurse {
        if let Some((base, depth)) = ctx.recursion.next_base(&outcome) {
            debug!(base = %base, depth, "recursing into directory");
            let job = &outcome.job;
            if !job.candidate.ends_with('/') {
                let dir = ScanJob::directory(job.base_url.clone(), &job.candidate, depth);
                ctx.queue.spawn_jobs(std::iter::once(dir), ctx.cancel.clone());
            }
            ctx.queue.spawn_producer(
                ctx.recursion.generator().iter(),
                base,
                depth,
                ctx.cancel.clone(),
            );
        }
    }
}

/// Issue the request for one job. Always yields exactly one outcome.
pub async fn dispatch(client: &Client, config: &ScanConfig, job: ScanJob) -> RequestOutcome {
    let start = Instant::now();
    let Some(url) = job.target_url() else {
        let url = format!("{}{}", job.base_url, job.candidate);
        return RequestOutcome::failure(job, url, start.elapsed(), "candidate does not resolve under the target URL");
    };

    let mut request = client
        .request(config.method.clone(), url.clone())
        .headers(config.headers.clone());
    if let Some(body) = &config.body {
        request = request.body(body.clone());
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return RequestOutcome::failure(job, url.into(), start.elapsed(), describe_error(&e)),
    };

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    match read_body(response, config.max_body_bytes).await {
        Ok(body) => {
            let length = declared_length(&headers).unwrap_or(body.len() as u64);
            RequestOutcome::response(job, url.into(), status, length, headers, body, start.elapsed())
        }
        Err(e) => RequestOutcome::failure(job, url.into(), start.elapsed(), describe_error(&e)),
    }
}

/// `Content-Length` as sent by the server. Unlike the body size hint this is
/// kept for `HEAD` responses.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

fn build_client(config: &ScanConfig) -> Result<Client, ConfigError> {
    let redirect = if config.follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };
    let client = Client::builder()
        .timeout(config.timeout)
        .redirect(redirect)
        .user_agent(config.user_agent.as_str())
        .danger_accept_invalid_certs(config.insecure)
        .pool_max_idle_per_host(config.threads)
        .build()?;
    Ok(client)
}

/// Read the body, keeping at most `limit` bytes. Reading stops at the limit.
async fn read_body(mut response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let take = (limit - body.len()).min(chunk.len());
        body.extend_from_slice(&chunk[..take]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(body)
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

fn now_iso_like() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn declared_length_reads_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("20"));
        assert_eq!(declared_length(&headers), Some(20));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);
    }
}
