//! End-to-end runs of the task executor against filesystem side effects.

use std::fs;

use tempfile::TempDir;

use shipwright::config::Config;
use shipwright::core::{RunContext, Task, TaskRegistry};
use shipwright::{Error, Result};

fn run(registry: &TaskRegistry, name: &str) -> Result<()> {
    let config = Config::default();
    let ctx = RunContext {
        config: &config,
        force: false,
    };
    registry.run(name, &ctx)
}

/// A task whose body appends its name to a log file, so ordering is
/// observable across process boundaries rather than through shared state.
fn appending_task(name: &str, deps: &[&str], log: &std::path::Path) -> Task {
    let log = log.to_path_buf();
    let line = format!("{}\n", name);
    Task::new(name, "").with_deps(deps).with_body(move |_| {
        let mut content = fs::read_to_string(&log).unwrap_or_default();
        content.push_str(&line);
        fs::write(&log, content)?;
        Ok(())
    })
}

#[test]
fn test_chain_runs_prerequisites_first() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("trace");

    let mut registry = TaskRegistry::new();
    registry
        .register(appending_task("fetch", &[], &log))
        .unwrap();
    registry
        .register(appending_task("build", &["fetch"], &log))
        .unwrap();
    registry
        .register(appending_task("package", &["build"], &log))
        .unwrap();

    run(&registry, "package").unwrap();
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "fetch\nbuild\npackage\n"
    );
}

#[test]
fn test_shared_prerequisite_runs_once() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("trace");

    let mut registry = TaskRegistry::new();
    registry
        .register(appending_task("docs", &[], &log))
        .unwrap();
    registry
        .register(appending_task("embed", &["docs"], &log))
        .unwrap();
    registry
        .register(appending_task("server", &["docs"], &log))
        .unwrap();
    registry
        .register(appending_task("dist", &["embed", "server"], &log))
        .unwrap();

    run(&registry, "dist").unwrap();
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "docs\nembed\nserver\ndist\n"
    );
}

#[test]
fn test_failure_stops_the_run_without_rollback() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("trace");
    let artifact = dir.path().join("artifact");

    let mut registry = TaskRegistry::new();
    let artifact_path = artifact.clone();
    registry
        .register(Task::new("produce", "").with_body(move |_| {
            fs::write(&artifact_path, "built")?;
            Ok(())
        }))
        .unwrap();
    registry
        .register(
            Task::new("explode", "")
                .with_deps(&["produce"])
                .with_body(|_| {
                    Err(Error::ExternalTool {
                        command: "make production".to_string(),
                        status: "exit status: 2".to_string(),
                    })
                }),
        )
        .unwrap();
    registry
        .register(appending_task("ship", &["explode"], &log))
        .unwrap();

    let err = run(&registry, "ship").unwrap_err();
    assert!(matches!(err, Error::ExternalTool { .. }));
    // The prerequisite's artifact stays; the dependent never ran.
    assert_eq!(fs::read_to_string(&artifact).unwrap(), "built");
    assert!(!log.exists());
}

#[test]
fn test_broken_graph_rejected_before_any_body_runs() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("trace");

    let mut registry = TaskRegistry::new();
    registry
        .register(appending_task("reachable", &[], &log))
        .unwrap();
    registry
        .register(Task::new("orphaned", "").with_deps(&["no_such_task"]))
        .unwrap();

    let err = run(&registry, "reachable").unwrap_err();
    assert!(matches!(err, Error::TaskGraph(_)));
    assert!(!log.exists());
}

#[test]
fn test_context_force_flag_reaches_bodies() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("forced");

    let mut registry = TaskRegistry::new();
    let marker_path = marker.clone();
    registry
        .register(Task::new("probe", "").with_body(move |ctx| {
            if ctx.force {
                fs::write(&marker_path, "1")?;
            }
            Ok(())
        }))
        .unwrap();

    let config = Config::default();
    let ctx = RunContext {
        config: &config,
        force: true,
    };
    registry.run("probe", &ctx).unwrap();
    assert!(marker.exists());
}
