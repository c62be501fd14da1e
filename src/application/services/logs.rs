//! Worker log access.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::LocalFs;
use crate::domain::InstanceLayout;

/// The last `lines` lines of the worker log, or `None` if nothing has been
/// logged yet.
///
/// # Errors
///
/// Returns an error if the log exists but cannot be read.
pub fn tail(fs: &impl LocalFs, layout: &InstanceLayout, lines: usize) -> Result<Option<Vec<String>>> {
    let path = layout.log_file();
    if !fs.exists(&path) {
        return Ok(None);
    }
    let content = fs
        .read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(last_lines(&content, lines)))
}

fn last_lines(content: &str, lines: usize) -> Vec<String> {
    let all: Vec<&str> = content.lines().collect();
    let skip = all.len().saturating_sub(lines);
    all[skip..].iter().map(|l| (*l).to_string()).collect()
}
