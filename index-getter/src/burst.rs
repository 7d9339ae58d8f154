use crate::error::{Error, Result};
use crate::metric::{HttpAggregate, HttpMetric, HttpReport};
use crate::session::HttpSession;
use crate::task::{Swarm, User};
use karga::Aggregate;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use typed_builder::TypedBuilder;

/// Fires a fixed number of requests as fast as possible and measures throughput.
#[derive(Clone, Debug, TypedBuilder)]
pub struct BurstConfig {
    #[builder(default = 1)]
    pub workers: usize,

    /// Split evenly between workers, the remainder is dropped.
    #[builder(default = 1000)]
    pub requests: usize,
}

impl BurstConfig {
    pub fn per_worker(&self) -> usize {
        self.requests / self.workers
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidArgument("at least one worker is required".into()));
        }
        if self.requests < self.workers {
            return Err(Error::InvalidArgument(format!(
                "{} requests cannot be split between {} workers",
                self.requests, self.workers
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BurstReport {
    pub workers: usize,
    pub requests_planned: usize,
    pub requests_completed: u64,
    /// Wall time of the slowest worker.
    pub duration: Duration,
    pub requests_per_second: f64,
    pub stopped_early: bool,
    pub http: HttpReport,
}

struct WorkerOutcome {
    aggregate: HttpAggregate,
    elapsed: Duration,
    stopped_early: bool,
}

async fn drive<U: User>(worker: usize, swarm: Swarm<U>, requests: usize) -> WorkerOutcome {
    let mut aggregate = HttpAggregate::new();
    let mut stopped_early = false;
    let start = Instant::now();
    for _ in 0..requests {
        let metric = swarm.run_once().await;
        aggregate.consume(&metric);
        match &metric {
            HttpMetric::Success(res) if res.status_code == 200 => {}
            HttpMetric::Success(res) => {
                tracing::warn!(worker, status = res.status_code, "Bad status code");
                stopped_early = true;
                break;
            }
            HttpMetric::Failure { reason, .. } => {
                tracing::warn!(worker, "Request failed: {reason}");
                stopped_early = true;
                break;
            }
        }
    }
    WorkerOutcome {
        aggregate,
        elapsed: start.elapsed(),
        stopped_early,
    }
}

/// Runs `config.workers` concurrent users of kind `U`, each issuing its share
/// of `config.requests` back to back. A worker stops at its first response
/// that is not `200 OK`.
pub async fn run<U: User>(session: HttpSession, config: &BurstConfig) -> Result<BurstReport> {
    config.validate()?;
    tracing::info!(
        user = U::NAME,
        host = %session.host(),
        workers = config.workers,
        requests = config.requests,
        "Starting burst"
    );
    let swarm: Swarm<U> = Swarm::new(session)?;
    let per_worker = config.per_worker();

    let mut set = JoinSet::new();
    for worker in 0..config.workers {
        set.spawn(drive(worker, swarm.clone(), per_worker));
    }

    let mut aggregate = HttpAggregate::new();
    let mut duration = Duration::ZERO;
    let mut stopped_early = false;
    while let Some(outcome) = set.join_next().await {
        let outcome = outcome?;
        aggregate.merge(outcome.aggregate);
        duration = duration.max(outcome.elapsed);
        stopped_early |= outcome.stopped_early;
    }

    let requests_completed = aggregate.count;
    let requests_per_second = if duration.is_zero() {
        0.0
    } else {
        requests_completed as f64 / duration.as_secs_f64()
    };
    tracing::info!(requests_completed, requests_per_second, "Burst finished");

    Ok(BurstReport {
        workers: config.workers,
        requests_planned: per_worker * config.workers,
        requests_completed,
        duration,
        requests_per_second,
        stopped_early,
        http: HttpReport::from(aggregate),
    })
}
