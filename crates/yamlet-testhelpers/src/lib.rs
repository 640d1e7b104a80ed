//! Test utilities shared by the yamlet crates.
//!
//! Error expectations are written inline, under the offending line:
//!
//! ```text
//! key: value
//! other: [1, 2
//!             ^ end-of-seq-flow
//! ```
//!
//! The caret column is the expected error column on the nearest source line
//! above it, and the word after the carets is the expected reason code.

use std::fmt;
use std::sync::Once;

use similar::TextDiff;

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An error reported by the code under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActualError {
    /// 0-based line.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
    /// Stable reason code.
    pub code: String,
}

impl fmt::Display for ActualError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.column, self.code)
    }
}

fn annotation(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('^') {
        return None;
    }
    let column = line.len() - trimmed.len();
    let rest = trimmed.trim_start_matches('^');
    let code = rest.trim();
    if !rest.starts_with(' ') || code.is_empty() || code.contains(char::is_whitespace) {
        return None;
    }
    Some((column, code))
}

/// Strip annotation lines, returning the source the test actually feeds in.
pub fn source_without_annotations(annotated: &str) -> String {
    let mut out = String::with_capacity(annotated.len());
    for line in annotated.split_inclusive('\n') {
        if annotation(line.trim_end_matches(['\r', '\n'])).is_some() {
            continue;
        }
        out.push_str(line);
    }
    // An annotation on the last line leaves a dangling break from the line above.
    if !annotated.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Expected errors encoded in an annotated source.
pub fn expected_errors(annotated: &str) -> Vec<ActualError> {
    let mut expected = Vec::new();
    let mut source_line = 0usize;
    let mut seen_source = false;
    for line in annotated.lines() {
        match annotation(line) {
            Some((column, code)) => expected.push(ActualError {
                line: source_line.saturating_sub(usize::from(seen_source)),
                column,
                code: code.to_string(),
            }),
            None => {
                source_line += 1;
                seen_source = true;
            }
        }
    }
    expected
}

/// Compare reported errors against the annotations, panicking with a diff.
pub fn assert_annotated_errors(annotated: &str, actual: Vec<ActualError>) {
    let expected = expected_errors(annotated);
    if expected == actual {
        return;
    }
    let render = |errors: &[ActualError]| {
        errors
            .iter()
            .map(|e| format!("{e}\n"))
            .collect::<String>()
    };
    let (expected_text, actual_text) = (render(&expected), render(&actual));
    let diff = TextDiff::from_lines(&expected_text, &actual_text);
    panic!(
        "error annotations do not match\n{}\nsource:\n{}",
        diff.unified_diff().header("expected", "actual"),
        source_without_annotations(annotated)
    );
}

/// Make whitespace visible in snapshot output.
pub fn visible(s: &str) -> String {
    s.replace(' ', "·").replace('\t', "→").replace('\n', "↵\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_annotation_lines() {
        let annotated = "a: [1\n     ^ eof\nb: 2\n";
        assert_eq!(source_without_annotations(annotated), "a: [1\nb: 2\n");
    }

    #[test]
    fn strips_trailing_annotation() {
        let annotated = "a: [1\n  ^ eof";
        assert_eq!(source_without_annotations(annotated), "a: [1");
    }

    #[test]
    fn collects_expected_positions() {
        let annotated = "ok: 1\nbad: |0\n      ^ zero-indent-in-block\n";
        assert_eq!(
            expected_errors(annotated),
            vec![ActualError {
                line: 1,
                column: 6,
                code: "zero-indent-in-block".to_string(),
            }]
        );
    }

    #[test]
    fn visible_whitespace() {
        assert_eq!(visible("a b\n"), "a·b↵\n");
    }
}
