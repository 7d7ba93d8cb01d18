//! Task data model for the release pipeline.
//!
//! Tasks are the named build steps of the pipeline. Each task declares the
//! prerequisites that must run before it and carries a body with the actual
//! side effects (fetching, stamping, invoking external tools).

use crate::config::Config;
use crate::Result;

/// The side-effecting body of a task.
///
/// Bodies receive the per-run context by reference and run synchronously
/// to completion. The first error aborts the whole run.
pub type TaskBody = Box<dyn Fn(&RunContext) -> Result<()>>;

/// Per-run state threaded into every task body.
///
/// Constructed once per `run` invocation; configuration is resolved up
/// front (file plus command-line overrides) and shared by reference.
pub struct RunContext<'a> {
    pub config: &'a Config,
    /// Re-fetch archives and re-download snapshots even when present.
    pub force: bool,
}

/// A single named build step.
pub struct Task {
    /// Unique name used to invoke the task and declare prerequisites.
    pub name: String,
    /// One-line description shown in the task listing.
    pub description: String,
    /// Prerequisite task names, in declaration order.
    pub deps: Vec<String>,
    /// The work itself.
    pub body: TaskBody,
}

impl Task {
    /// Create a task with no prerequisites and a no-op body.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            deps: Vec::new(),
            body: Box::new(|_| Ok(())),
        }
    }

    /// Declare the prerequisites of this task, in order.
    pub fn with_deps(mut self, deps: &[&str]) -> Self {
        self.deps = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Attach the body run after all prerequisites have completed.
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&RunContext) -> Result<()> + 'static,
    {
        self.body = Box::new(body);
        self
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish()
    }
}
