//! Reversible version stamping inside marked regions.
//!
//! Release builds need the real version number baked into a couple of source
//! files that normally carry development placeholders. Each file contains a
//! delimited block:
//!
//! ```text
//! # BEGIN VERSION BLOCK
//! VERSION = 'tip'
//! VERSION_NAME = "DEVELOPMENT MODE"
//! API_VERSION = 'dev'
//! # END VERSION BLOCK
//! ```
//!
//! `apply` rewrites the interior lines from the configured version values and
//! returns a [`Capture`] of the original text; `restore` puts the capture
//! back verbatim, so an apply/restore pair is byte-identical. The [`stamped`]
//! bracket guarantees restoration even when the build step in between fails,
//! so an aborted release never leaves the tree half-stamped.
//!
//! [`stamped`]: MarkedRegion::stamped

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::VersionConfig;
use crate::{shiplog_debug, Error, Result};

pub const BEGIN_MARKER: &str = "BEGIN VERSION BLOCK";
pub const END_MARKER: &str = "END VERSION BLOCK";

/// The version values substituted into stamp lines.
#[derive(Debug, Clone)]
pub struct VersionStamp {
    pub number: String,
    pub name: String,
    pub api: String,
}

impl From<&VersionConfig> for VersionStamp {
    fn from(v: &VersionConfig) -> Self {
        Self {
            number: v.number.clone(),
            name: v.name.clone(),
            api: v.api.clone(),
        }
    }
}

enum RuleAction {
    /// Rewrite the line from the stamp values.
    Replace(fn(&VersionStamp) -> String),
    /// Recognized but left untouched (comments, blank lines).
    Keep,
}

/// One recognized stamp line: a pattern plus its replacement.
pub struct StampRule {
    pattern: Regex,
    action: RuleAction,
}

impl StampRule {
    pub fn replace(pattern: &str, render: fn(&VersionStamp) -> String) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            action: RuleAction::Replace(render),
        })
    }

    pub fn keep(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            action: RuleAction::Keep,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("bad stamp pattern '{}': {}", pattern, e)))
}

/// The original interior lines of a region, in order, with line endings.
///
/// Owned by the caller for the duration of one stamp/build/restore cycle;
/// feeding it back to [`MarkedRegion::restore`] reproduces the pre-apply
/// bytes exactly.
#[derive(Debug, Clone)]
pub struct Capture {
    lines: Vec<String>,
}

impl Capture {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A delimited, fully structured span of a text artifact.
pub struct MarkedRegion {
    path: PathBuf,
    begin: String,
    end: String,
    rules: Vec<StampRule>,
}

impl MarkedRegion {
    pub fn new(path: &Path, rules: Vec<StampRule>) -> Self {
        Self {
            path: path.to_path_buf(),
            begin: BEGIN_MARKER.to_string(),
            end: END_MARKER.to_string(),
            rules,
        }
    }

    /// Region over a Python version module (`VERSION = '...'` assignments).
    pub fn python(path: &Path) -> Result<Self> {
        Ok(Self::new(
            path,
            vec![
                StampRule::replace(r"^VERSION =", |v| format!("VERSION = '{}'", v.number))?,
                StampRule::replace(r"^VERSION_NAME =", |v| {
                    format!("VERSION_NAME = \"{}\"", v.name)
                })?,
                StampRule::replace(r"^API_VERSION", |v| format!("API_VERSION = '{}'", v.api))?,
            ],
        ))
    }

    /// Region over a JavaScript version module (`exports.versionNumber = ...`).
    ///
    /// Doc-comment and blank lines inside the block are recognized and kept.
    pub fn javascript(path: &Path) -> Result<Self> {
        Ok(Self::new(
            path,
            vec![
                StampRule::keep(r"/\*\*|\*/|^\s*\*")?,
                StampRule::keep(r"^\s*$")?,
                StampRule::replace(r"versionNumber = ", |v| {
                    format!("exports.versionNumber = '{}';", v.number)
                })?,
                StampRule::replace(r"versionCodename = ", |v| {
                    format!("exports.versionCodename = '{}';", v.name)
                })?,
                StampRule::replace(r"apiVersion = ", |v| {
                    format!("exports.apiVersion = '{}';", v.api)
                })?,
            ],
        ))
    }

    /// Rewrite every line strictly between the markers from `values`.
    ///
    /// Lines outside the markers are neither touched nor recorded. Every
    /// interior line must match one of the region's rules; anything else is a
    /// fatal `Config` error, since the block's content is fully structured.
    /// Returns the pre-rewrite interior lines as a [`Capture`].
    pub fn apply(&self, values: &VersionStamp) -> Result<Capture> {
        shiplog_debug!("stamping version block in {}", self.path.display());
        let content = fs::read_to_string(&self.path)?;
        let mut segments: Vec<String> =
            content.split_inclusive('\n').map(str::to_string).collect();
        let (begin, end) = self.locate(&segments)?;

        let mut captured = Vec::with_capacity(end - begin - 1);
        for segment in segments.iter_mut().take(end).skip(begin + 1) {
            let (line, terminator) = split_line_ending(segment);
            let rule = self
                .rules
                .iter()
                .find(|r| r.pattern.is_match(line))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "unrecognized line inside version block of {}: {}",
                        self.path.display(),
                        line
                    ))
                })?;
            captured.push(segment.clone());
            if let RuleAction::Replace(render) = rule.action {
                *segment = format!("{}{}", render(values), terminator);
            }
        }

        fs::write(&self.path, segments.concat())?;
        Ok(Capture { lines: captured })
    }

    /// Replace the current interior of the region with `capture`.
    ///
    /// The markers are located again; their absence means the file was
    /// mutated incompatibly during the build and is a fatal `Config` error.
    /// Marker lines and everything outside them are left as they are now,
    /// whatever an intervening step may have written there.
    pub fn restore(&self, capture: &Capture) -> Result<()> {
        shiplog_debug!("restoring version block in {}", self.path.display());
        let content = fs::read_to_string(&self.path)?;
        let segments: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
        let (begin, end) = self.locate(&segments)?;

        let mut restored: Vec<String> = Vec::with_capacity(segments.len());
        restored.extend_from_slice(&segments[..=begin]);
        restored.extend_from_slice(&capture.lines);
        restored.extend_from_slice(&segments[end..]);

        fs::write(&self.path, restored.concat())?;
        Ok(())
    }

    /// Stamp the region, run `step`, and always restore afterwards.
    ///
    /// The restore runs whether `step` succeeds or fails; the step's error
    /// takes precedence when both fail.
    pub fn stamped<T, F>(&self, values: &VersionStamp, step: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let capture = self.apply(values)?;
        let result = step();
        let restored = self.restore(&capture);
        match (result, restored) {
            (Err(step_err), _) => Err(step_err),
            (Ok(_), Err(restore_err)) => Err(restore_err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    fn locate(&self, segments: &[String]) -> Result<(usize, usize)> {
        let begin = segments
            .iter()
            .position(|s| s.contains(&self.begin))
            .ok_or_else(|| {
                Error::Config(format!(
                    "begin marker '{}' not found in {}",
                    self.begin,
                    self.path.display()
                ))
            })?;
        let end = segments
            .iter()
            .skip(begin + 1)
            .position(|s| s.contains(&self.end))
            .map(|offset| begin + 1 + offset)
            .ok_or_else(|| {
                Error::Config(format!(
                    "end marker '{}' not found in {}",
                    self.end,
                    self.path.display()
                ))
            })?;
        Ok((begin, end))
    }
}

fn split_line_ending(segment: &str) -> (&str, &str) {
    if let Some(line) = segment.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = segment.strip_suffix('\n') {
        (line, "\n")
    } else {
        (segment, "")
    }
}
