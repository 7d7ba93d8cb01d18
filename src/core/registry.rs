//! Task registry and dependency-order executor.
//!
//! The registry holds every task registered at process start and validates
//! the full prerequisite graph (unknown names, cycles) before any body runs.
//! Execution is a depth-first, prerequisite-first traversal with memoized
//! completion: each reachable task runs exactly once per invocation, at its
//! first encounter in declaration order. There is no parallelism and no
//! rollback; the first body error aborts the run.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::task::{RunContext, Task};
use crate::{shiplog, Error, Result};

pub struct TaskRegistry {
    /// Tasks in registration order.
    tasks: Vec<Task>,
    /// Index from task name into `tasks`.
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a task definition.
    ///
    /// Prerequisite names are not checked here; `validate` resolves the full
    /// graph once all tasks are registered.
    ///
    /// # Errors
    /// Returns a `TaskGraph` error if the name is already registered.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(Error::TaskGraph(format!(
                "task '{}' is already registered",
                task.name
            )));
        }
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Get a registered task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// All registered tasks, in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Validate the prerequisite graph: every declared prerequisite must be
    /// registered and the dependency relation must be acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: Vec<NodeIndex> = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            nodes.push(graph.add_node(task.name.as_str()));
        }
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in &task.deps {
                let dep_idx = self.index.get(dep).ok_or_else(|| {
                    Error::TaskGraph(format!(
                        "unknown prerequisite '{}' declared by task '{}'",
                        dep, task.name
                    ))
                })?;
                graph.add_edge(nodes[*dep_idx], nodes[i], ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            let task_name = graph
                .node_weight(cycle.node_id())
                .copied()
                .unwrap_or("unknown");
            Error::TaskGraph(format!("dependency cycle involving task '{}'", task_name))
        })?;

        Ok(())
    }

    /// Run the named task and, transitively, every prerequisite.
    ///
    /// The graph is validated first, so bodies never start on a broken
    /// registry. Completed tasks are not rolled back on failure; cleanup
    /// around a failing step is the responsibility of the task body (see
    /// the marked-region stamping bracket).
    pub fn run(&self, name: &str, ctx: &RunContext) -> Result<()> {
        self.validate()?;
        let root = *self
            .index
            .get(name)
            .ok_or_else(|| Error::TaskGraph(format!("unknown task '{}'", name)))?;

        let mut done: HashSet<usize> = HashSet::new();
        self.run_inner(root, ctx, &mut done)
    }

    fn run_inner(&self, idx: usize, ctx: &RunContext, done: &mut HashSet<usize>) -> Result<()> {
        if done.contains(&idx) {
            return Ok(());
        }
        let task = &self.tasks[idx];
        for dep in &task.deps {
            // validate() guarantees the name resolves
            let dep_idx = self.index[dep];
            self.run_inner(dep_idx, ctx, done)?;
        }

        shiplog!("task '{}' starting", task.name);
        (task.body)(ctx)?;
        done.insert(idx);
        shiplog!("task '{}' finished", task.name);
        Ok(())
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.task_count())
            .finish()
    }
}
