//! Shared helpers: external tool invocation and directory copying.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::{shiplog_debug, Error, Result};

/// Render a command as it would appear on a shell line, for error messages.
fn render_command(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().to_string();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Run an external tool to completion, inheriting stdio.
///
/// A non-zero exit is a fatal `ExternalTool` error.
pub fn run_tool(mut cmd: Command) -> Result<()> {
    let rendered = render_command(&cmd);
    shiplog_debug!("running: {}", rendered);
    let status = cmd.status()?;
    if !status.success() {
        return Err(Error::ExternalTool {
            command: rendered,
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Run an external tool and capture its stdout.
pub fn run_tool_capture(mut cmd: Command) -> Result<String> {
    let rendered = render_command(&cmd);
    shiplog_debug!("running (captured): {}", rendered);
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(Error::ExternalTool {
            command: rendered,
            status: output.status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Recursively copy a directory tree.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    if !dest.exists() {
        fs::create_dir_all(dest)?;
    }
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if src_path.is_dir() {
            copy_tree(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)?;
        }
    }
    Ok(())
}
