use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::types::{ScanResult, Summary};

#[derive(Debug, Default)]
struct AggregateState {
    results: Vec<ScanResult>,
    summary: Summary,
}

/// Collects accepted results and request statistics from all workers.
///
/// Both live behind one lock so that a job's summary update and its result
/// become visible together.
#[derive(Clone, Debug, Default)]
pub struct ResultAggregator {
    inner: Arc<Mutex<AggregateState>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed job. Called exactly once per dispatched job.
    pub async fn record(&self, elapsed: Duration, success: bool, accepted: Option<ScanResult>) {
        let mut state = self.inner.lock().await;
        state.summary.record(elapsed, success);
        if let Some(result) = accepted {
            state.results.push(result);
        }
    }

    pub async fn summary(&self) -> Summary {
        self.inner.lock().await.summary.clone()
    }

    /// Take everything collected so far, leaving the aggregator empty.
    pub async fn finish(&self) -> (Vec<ScanResult>, Summary) {
        let mut state = self.inner.lock().await;
        let state = std::mem::take(&mut *state);
        (state.results, state.summary)
    }
}
