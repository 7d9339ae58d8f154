//! Load test for the index page of an HTTP server, built on karga.
//!
//! [`IndexGetterUser`] is the only simulated user: its single task issues
//! `GET /` against the host it is bound to. Scheduling and statistics are
//! left to karga's [`StageExecutor`](karga::StageExecutor) and the
//! [`HttpAggregate`] it fills.

pub mod burst;
pub mod cli;
pub mod error;
pub mod metric;
pub mod runner;
pub mod session;
pub mod task;
pub mod user;

pub use error::{Error, Result};
pub use metric::{HttpAggregate, HttpMetric, HttpReport, HttpResponseMetric};
pub use session::HttpSession;
pub use task::{Swarm, Task, TaskSet, User};
pub use user::IndexGetterUser;

pub use reqwest::Method;
pub use reqwest::Url;
