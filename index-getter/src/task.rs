use crate::error::{Error, Result};
use crate::metric::HttpMetric;
use crate::session::HttpSession;
use parking_lot::Mutex;
use rand::distr::{weighted::WeightedIndex, Distribution};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{fmt, future::Future, pin::Pin, sync::Arc};

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = HttpMetric> + Send + 'a>>;

/// A unit of work a simulated user keeps executing.
pub struct Task<U> {
    pub name: &'static str,
    pub weight: u32,
    run: for<'a> fn(&'a U) -> TaskFuture<'a>,
}

impl<U> Task<U> {
    /// Registers `run` under `name` with a relative weight of 1.
    pub fn new(name: &'static str, run: for<'a> fn(&'a U) -> TaskFuture<'a>) -> Self {
        Self {
            name,
            weight: 1,
            run,
        }
    }

    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

impl<U> fmt::Debug for Task<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Tasks of one user kind, picked at random proportionally to their weight.
pub struct TaskSet<U> {
    tasks: Vec<Task<U>>,
    index: WeightedIndex<u32>,
}

impl<U> TaskSet<U> {
    pub fn new(tasks: Vec<Task<U>>) -> Result<Self> {
        if tasks.iter().all(|task| task.weight == 0) {
            return Err(Error::NoTasks);
        }
        let index = WeightedIndex::new(tasks.iter().map(|task| task.weight))
            .map_err(|err| Error::InvalidArgument(format!("task weights: {err}")))?;
        Ok(Self { tasks, index })
    }

    pub fn pick(&self) -> &Task<U> {
        &self.tasks[self.index.sample(&mut rand::rng())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task<U>> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<U> fmt::Debug for TaskSet<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.tasks).finish()
    }
}

/// A kind of simulated user: state built around a session plus its tasks.
pub trait User: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    fn new(session: HttpSession) -> Self;

    fn tasks() -> Result<TaskSet<Self>>;
}

/// Simulated users of kind `U` for every worker driving the swarm.
///
/// Each concurrent [`Swarm::run_once`] checks out a user of its own, built on a
/// forked session, so no two in-flight tasks share a user or a connection
/// pool. Users are created on demand and reused once idle, which keeps their
/// number at the peak concurrency.
pub struct Swarm<U> {
    session: HttpSession,
    tasks: Arc<TaskSet<U>>,
    idle: Arc<Mutex<Vec<U>>>,
    spawned: Arc<AtomicUsize>,
}

impl<U> Clone for Swarm<U> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            tasks: self.tasks.clone(),
            idle: self.idle.clone(),
            spawned: self.spawned.clone(),
        }
    }
}

impl<U: User> Swarm<U> {
    pub fn new(session: HttpSession) -> Result<Self> {
        Ok(Self {
            session,
            tasks: Arc::new(U::tasks()?),
            idle: Arc::new(Mutex::new(Vec::new())),
            spawned: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    pub fn tasks(&self) -> &TaskSet<U> {
        &self.tasks
    }

    /// Number of users created so far.
    pub fn users_spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }

    fn checkout(&self) -> U {
        let idle = self.idle.lock().pop();
        match idle {
            Some(user) => user,
            None => {
                let id = self.spawned.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(user = U::NAME, id, "Spawning user");
                U::new(self.session.fork())
            }
        }
    }

    /// Picks one task and runs it to completion on a user nobody else is using.
    pub async fn run_once(&self) -> HttpMetric {
        let user = self.checkout();
        let task = self.tasks.pick();
        tracing::trace!(user = U::NAME, task = task.name, "Running task");
        let metric = (task.run)(&user).await;
        self.idle.lock().push(user);
        metric
    }
}
