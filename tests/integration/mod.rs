//! Integration tests for the release pipeline pieces.
//!
//! Each module exercises one subsystem end to end against real files in
//! temporary directories: the task executor, version stamping, and archive
//! fetching.

mod executor;
mod fetching;
mod stamping;
