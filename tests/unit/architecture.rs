//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra/output → commands) are maintained.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src(parts: &[&str]) -> PathBuf {
    parts
        .iter()
        .fold(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), |p, part| p.join(part))
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Lines in `dir` (comments and `#[cfg(test)]` blocks excluded) that contain
/// any of `needles`.
fn find_forbidden(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            if in_test || line.trim().starts_with("//") {
                continue;
            }
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{}:{}: `{needle}`: {line}", relative(&file), i + 1));
                }
            }
        }
    }
    violations
}

// ── No inline JSON branching ──────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src(&["commands"])) {
        let lines = read_non_comment_lines(&file);
        let rel = relative(&file);

        for (i, line) in lines.iter().enumerate() {
            let lineno = i + 1;
            if line.contains("json: bool") {
                violations.push(format!(
                    "{rel}:{lineno}: found `json: bool` parameter: {line}"
                ));
            }
            let trimmed = line.trim();
            if trimmed.starts_with("if json") || trimmed.starts_with("if !json") {
                violations.push(format!("{rel}:{lineno}: found inline JSON branch: {line}"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found inline JSON branching in commands/, use app.renderer() instead:\n{}",
        violations.join("\n")
    );
}

// ── Layer imports ─────────────────────────────────────────────────────────────

#[test]
fn domain_is_pure() {
    let violations = find_forbidden(
        &src(&["domain"]),
        &[
            "crate::application",
            "crate::infra",
            "crate::commands",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_does_not_reach_outward() {
    let violations = find_forbidden(
        &src(&["application"]),
        &[
            "crate::infra",
            "crate::commands",
            "crate::output",
            "std::fs",
            "std::process::Command",
            "tokio::process",
            "tokio::fs",
        ],
    );
    assert!(
        violations.is_empty(),
        "application/ must go through ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let violations = find_forbidden(&src(&["infra"]), &["crate::commands", "crate::output"]);
    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find_forbidden(&src(&["infra"]), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

// ── Trait bounds over concrete types ──────────────────────────────────────────

#[test]
fn services_take_ports_not_concrete_adapters() {
    let violations = find_forbidden(
        &src(&["application", "services"]),
        &["SystemHost", "TokioCommandRunner", "YamlConfigStore"],
    );
    assert!(
        violations.is_empty(),
        "Found concrete adapter types in services, use trait bounds instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_runner_is_only_built_in_infra() {
    let mut violations: Vec<String> = Vec::new();
    for dir in ["application", "commands", "domain", "output"] {
        violations.extend(find_forbidden(&src(&[dir]), &["TokioCommandRunner::new"]));
    }
    assert!(
        violations.is_empty(),
        "Found TokioCommandRunner::new outside infra/:\n{}",
        violations.join("\n")
    );
}

// ── Command handlers accept unified AppContext ────────────────────────────────

#[test]
fn command_handlers_accept_app_context() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src(&["commands"])) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        if !content.contains("fn run(") {
            continue;
        }
        if !content.contains("app: &AppContext") {
            violations.push(relative(&file));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handlers must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}
