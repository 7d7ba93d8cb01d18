//! shipwright: a release pipeline runner for the editor project.
//!
//! Named build tasks form a prerequisite graph; running one runs its
//! transitive prerequisites first, each exactly once. Supporting modules
//! cover version stamping of marked source regions, idempotent fetching of
//! external archives, and the build configuration.

pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod log;
pub mod patch;
pub mod pipeline;
pub mod util;

pub use error::{Error, Result};
