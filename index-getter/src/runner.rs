use crate::error::{Error, Result};
use crate::metric::{HttpAggregate, HttpReport};
use crate::session::HttpSession;
use crate::task::{Swarm, User};
use karga::{Executor, Scenario, Stage, StageExecutor};
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Wraps a [`Swarm`] into an action karga can call repeatedly.
#[macro_export]
macro_rules! make_swarm_action {
    ($swarm:expr) => {{
        let swarm = $swarm;
        move || {
            let swarm = swarm.clone();
            async move { swarm.run_once().await }
        }
    }};
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct RunConfig {
    /// Number of concurrent simulated users.
    #[builder(default = 1)]
    pub users: usize,

    #[builder(default = Duration::from_secs(10))]
    pub run_time: Duration,

    #[builder(default = Duration::ZERO)]
    pub ramp_up: Duration,

    /// Target requests per second across all users. Must be bounded for
    /// `ramp_up` to have any effect.
    #[builder(default = f64::MAX)]
    pub rate: f64,
}

impl RunConfig {
    /// Ramp to `rate` over `ramp_up`, then hold it for `run_time`.
    pub fn stages(&self) -> Vec<Stage> {
        vec![
            Stage::new(self.ramp_up, self.rate),
            Stage::new(self.run_time, self.rate),
        ]
    }

    fn validate(&self) -> Result<()> {
        if self.users == 0 {
            return Err(Error::InvalidArgument("at least one user is required".into()));
        }
        if self.rate.is_nan() || self.rate <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "rate must be positive, got {}",
                self.rate
            )));
        }
        // karga ramps linearly from zero, an unbounded target saturates on the first tick
        if !self.ramp_up.is_zero() && self.rate == f64::MAX {
            return Err(Error::InvalidArgument(
                "ramp-up needs a bounded target rate".into(),
            ));
        }
        Ok(())
    }
}

/// Runs users of kind `U` against the session's host and reports what karga recorded.
pub async fn run<U: User>(session: HttpSession, config: &RunConfig) -> Result<HttpReport> {
    config.validate()?;
    tracing::info!(
        user = U::NAME,
        host = %session.host(),
        users = config.users,
        run_time = ?config.run_time,
        ramp_up = ?config.ramp_up,
        "Starting load test"
    );
    let swarm: Swarm<U> = Swarm::new(session)?;

    let scenario: Scenario<HttpAggregate, _, _> = Scenario::builder()
        .name(U::NAME)
        .action(make_swarm_action!(swarm))
        .build();

    let results: HttpAggregate = StageExecutor::builder()
        .stages(config.stages())
        .workers(config.users)
        .build()
        .exec(&scenario)
        .await
        .map_err(|err| Error::Executor(format!("{err:?}")))?;

    tracing::info!(
        requests = results.count,
        failures = results.failure_count,
        "Load test finished"
    );
    Ok(HttpReport::from(results))
}
