use crate::error::Result;
use crate::metric::HttpMetric;
use crate::session::HttpSession;
use crate::task::{Task, TaskFuture, TaskSet, User};

/// Simulated user that keeps fetching the index page.
#[derive(Clone, Debug)]
pub struct IndexGetterUser {
    session: HttpSession,
}

impl IndexGetterUser {
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    pub async fn get_index(&self) -> HttpMetric {
        self.session.get("/").await
    }
}

fn get_index(user: &IndexGetterUser) -> TaskFuture<'_> {
    Box::pin(user.get_index())
}

impl User for IndexGetterUser {
    const NAME: &'static str = "IndexGetterUser";

    fn new(session: HttpSession) -> Self {
        Self { session }
    }

    fn tasks() -> Result<TaskSet<Self>> {
        TaskSet::new(vec![Task::new("get_index", get_index)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_a_single_task_with_default_weight() {
        let tasks = IndexGetterUser::tasks().unwrap();

        let registered: Vec<(&str, u32)> = tasks.iter().map(|t| (t.name, t.weight)).collect();
        assert_eq!(registered, vec![("get_index", 1)]);
        assert_eq!(tasks.pick().name, "get_index");
    }
}
