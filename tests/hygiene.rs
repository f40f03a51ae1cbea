//! Hygiene: scans the library source for patterns that can crash a caller's
//! rendering loop or silently drop an error.
//!
//! Every pattern has a budget of zero. Test files (`*_test.rs`) are exempt.

use std::fs;
use std::path::{Path, PathBuf};

/// `(pattern, budget, reason)`.
const BUDGETS: &[(&str, usize, &str)] = &[
    (".unwrap()", 0, "panics on None/Err; propagate with `?`"),
    (".expect(", 0, "panics on None/Err; propagate with `?`"),
    ("panic!(", 0, "aborts the host's render loop"),
    ("unreachable!(", 0, "aborts the host's render loop"),
    ("todo!(", 0, "unfinished code path"),
    ("unimplemented!(", 0, "unfinished code path"),
    ("let _ =", 0, "discards a value without inspecting it"),
    (".ok()", 0, "turns an error into None without reporting it"),
    ("#[allow(dead_code)]", 0, "hides unused code instead of removing it"),
];

fn library_sources() -> Vec<(PathBuf, String)> {
    let mut out = Vec::new();
    walk(&Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), &mut out);
    out
}

fn walk(dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            walk(&path, out);
            continue;
        }
        let is_rust = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rust && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push((path, content));
            }
        }
    }
}

#[test]
fn sources_are_found() {
    let files = library_sources();
    assert!(files.iter().any(|(p, _)| p.ends_with("lib.rs")), "src/lib.rs not scanned");
}

#[test]
fn pattern_budgets() {
    let files = library_sources();
    let mut failures = Vec::new();
    for &(pattern, budget, reason) in BUDGETS {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|(path, content)| {
                content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(pattern))
                    .map(move |(n, _)| format!("  {}:{}", path.display(), n + 1))
            })
            .collect();
        if hits.len() > budget {
            failures.push(format!("`{pattern}` ({reason}): found {}, max {budget}\n{}", hits.len(), hits.join("\n")));
        }
    }
    assert!(failures.is_empty(), "hygiene budgets exceeded:\n{}", failures.join("\n"));
}
