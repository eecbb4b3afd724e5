//! CPI extraction from simulator output.
//!
//! The simulator emits human-readable text; the contract is lines of
//! the form `<label>: CPI=<float>`. This module is the only place
//! that knows the textual format — everything downstream works on
//! `(identifier, cpi)` pairs.

use tracing::warn;

/// All well-formed `(label, cpi)` pairs found in `text`.
///
/// The label is the token immediately before the colon preceding the
/// `CPI=` marker, which strips test-framework prefixes — including
/// `file.go:NN` prefixes that themselves contain colons. Lines with a
/// CPI marker but a malformed value are skipped with a warning;
/// callers looking for a specific identifier treat the absence as a
/// parse failure for that attempt.
#[must_use]
pub fn scan_cpi_lines(text: &str) -> Vec<(String, f64)> {
    let mut pairs = Vec::new();

    for line in text.lines() {
        let Some((head, _)) = line.split_once("CPI=") else {
            continue;
        };
        let Some(labelled) = head.trim_end().strip_suffix(':') else {
            continue;
        };
        let Some(label) = labelled.split_whitespace().last() else {
            continue;
        };

        match parse_cpi_value(line) {
            Some(cpi) => pairs.push((label.to_string(), cpi)),
            None => {
                warn!(line, "malformed CPI value on matching line");
            }
        }
    }

    pairs
}

/// First well-formed CPI for `test_id`, if the output contains one.
///
/// A line matches when its label equals the test identifier; the
/// first match wins.
#[must_use]
pub fn cpi_for_test(text: &str, test_id: &str) -> Option<f64> {
    scan_cpi_lines(text)
        .into_iter()
        .find(|(label, _)| label == test_id)
        .map(|(_, cpi)| cpi)
}

/// The numeric value after the first `CPI=` marker, when it parses as
/// a positive finite float.
fn parse_cpi_value(line: &str) -> Option<f64> {
    let after = line.split("CPI=").nth(1)?;
    let token = after.split_whitespace().next()?;
    let cpi: f64 = token.parse().ok()?;
    (cpi > 0.0 && cpi.is_finite()).then_some(cpi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_test_log_format() {
        let text = "\
=== RUN   TestAccuracyCPI_WithDCache
    arithmetic_sequential: CPI=1.200
    dependency_chain: CPI=2.195
--- PASS: TestAccuracyCPI_WithDCache (3.21s)
";
        let pairs = scan_cpi_lines(text);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "arithmetic_sequential");
        assert!((pairs[0].1 - 1.2).abs() < 1e-9);
        assert!((pairs[1].1 - 2.195).abs() < 1e-9);
    }

    #[test]
    fn first_match_wins_for_a_test_id() {
        let text = "a: CPI=1.5\nb: CPI=2.0\na: CPI=9.9\n";
        assert_eq!(cpi_for_test(text, "a"), Some(1.5));
        assert_eq!(cpi_for_test(text, "b"), Some(2.0));
    }

    #[test]
    fn label_strips_framework_prefix() {
        let text = "ok   harness.go:72   branch_heavy: CPI=2.043 extra=1\n";
        assert_eq!(cpi_for_test(text, "branch_heavy"), Some(2.043));
    }

    #[test]
    fn colon_bearing_prefix_is_not_mistaken_for_the_label() {
        // Go test logs prefix the line with file:line; the label is
        // still the token right before the marker's colon.
        let text = "\
=== RUN   TestAccuracyCPI
accuracy_test.go:102:     branch_heavy: CPI=2.043
";
        assert_eq!(cpi_for_test(text, "branch_heavy"), Some(2.043));
        assert_eq!(cpi_for_test(text, "accuracy_test.go"), None);
    }

    #[test]
    fn marker_without_adjacent_label_colon_is_skipped() {
        assert!(scan_cpi_lines("harness.go:72 CPI=2.0\n").is_empty());
    }

    #[test]
    fn malformed_values_are_skipped_not_fatal() {
        let text = "a: CPI=not-a-number\nb: CPI=\nc: CPI=-3.0\nd: CPI=1.1\n";
        let pairs = scan_cpi_lines(text);
        assert_eq!(pairs, vec![("d".to_string(), 1.1)]);
        assert_eq!(cpi_for_test(text, "a"), None);
    }

    #[test]
    fn missing_identifier_is_none() {
        assert_eq!(cpi_for_test("a: CPI=1.0\n", "zzz"), None);
        assert_eq!(cpi_for_test("", "a"), None);
    }
}
