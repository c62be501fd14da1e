//! JSON output helpers.
//!
//! `JsonRenderer` prints every result as one pretty-printed JSON document on
//! stdout. `format_error` builds the error object used by all `--json` code
//! paths when a command fails.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Renders results as machine-readable JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }
}
