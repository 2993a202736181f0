//! Test-runner output interpretation.
//!
//! Converts the raw, semi-structured text of a test-runner invocation into
//! a [`TestRunSummary`] with per-failure [`FixInstruction`]s. Parsing an
//! external tool's free-form output is inherently fragile, so the parser
//! sits behind the [`TestOutputInterpreter`] trait and the controller never
//! sees the underlying format.
//!
//! The cardinal rule: silence is never success. Output that yields no
//! parseable counts is classified as one errored unit.

use std::collections::HashSet;

use regex::Regex;

use crate::domain::instruction::{ErrorKind, FixInstruction, IssueCategory, Severity};
use crate::domain::test_report::{ExecutionSignal, TestRunSummary};

/// Stable interface from raw runner text to a structured summary.
///
/// Implementations must be pure functions of `(raw, signal)` so that
/// interpreting the same output twice yields identical summaries.
pub trait TestOutputInterpreter: Send + Sync {
    fn interpret(&self, raw: &str, signal: ExecutionSignal) -> TestRunSummary;
}

/// Interpreter for pytest's `-v --tb=short` output format.
pub struct PytestInterpreter {
    summary_passed: Regex,
    summary_failed: Regex,
    summary_errored: Regex,
    collected: Regex,
    section_header: Regex,
    short_summary: Regex,
    assertion_detail: Regex,
    comparison: Regex,
    attribution: Regex,
    test_code_line: Regex,
    /// Longest quoted evidence snippet, in characters.
    max_evidence: usize,
    /// Longest expected/actual snippet, in characters.
    max_snippet: usize,
    /// Raw-output window used for fallback diagnostics, in lines.
    tail_lines: usize,
}

impl Default for PytestInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl PytestInterpreter {
    pub fn new() -> Self {
        Self {
            summary_passed: pattern(r"(\d+)\s+passed"),
            summary_failed: pattern(r"(\d+)\s+failed"),
            summary_errored: pattern(r"(\d+)\s+error"),
            collected: pattern(r"collected\s+(\d+)\s+item"),
            section_header: pattern(r"_{3,}\s*(test_\w+)\s*_{3,}"),
            short_summary: pattern(
                r"FAILED\s+[\w./:\\-]+::(test_\w+)\s*[-\u{2013}]\s*(\w+(?:Error|Exception)?):?\s*(.*)",
            ),
            assertion_detail: pattern(r"(?:AssertionError:|E\s+assert)\s*(.+)"),
            comparison: pattern(r"assert\s+(.+?)\s*==\s*(.+?)(?:\n|$)"),
            attribution: pattern(r"where\s+.+?=\s*(\w+)\(([^)]*)\)"),
            test_code_line: pattern(r">\s+(.+)"),
            max_evidence: 500,
            max_snippet: 200,
            tail_lines: 30,
        }
    }

    /// Detect a collection failure: the runner could not even load the
    /// test module (import error, syntax error, zero items collected).
    fn is_collection_failure(&self, raw: &str) -> bool {
        let lower = raw.to_lowercase();
        (raw.contains("ERROR") && lower.contains("collecting"))
            || lower.contains("no tests ran")
            || lower.contains("0 items collected")
    }

    /// Extract pass/fail/error counts from the terminal summary line.
    /// Categories absent from the line are zero.
    fn parse_counts(&self, raw: &str) -> (u32, u32, u32) {
        let mut passed = 0;
        let mut failed = 0;
        let mut errored = 0;

        for line in raw.lines() {
            if !line.contains("=====") || !(line.contains("passed") || line.contains("failed")) {
                continue;
            }
            if let Some(caps) = self.summary_passed.captures(line) {
                passed = caps[1].parse().unwrap_or(0);
            }
            if let Some(caps) = self.summary_failed.captures(line) {
                failed = caps[1].parse().unwrap_or(0);
            }
            if let Some(caps) = self.summary_errored.captures(line) {
                errored = caps[1].parse().unwrap_or(0);
            }
        }

        (passed, failed, errored)
    }

    /// The window of output quoted by fallback diagnostics: the FAILURES /
    /// ERRORS block when present, otherwise the last `tail_lines` lines.
    fn error_window(&self, raw: &str) -> String {
        let mut window = Vec::new();
        let mut capture = false;

        for line in raw.lines() {
            if line.contains("FAILURES") || line.contains("ERRORS") || line.contains("ERROR") {
                capture = true;
            }
            if line.to_lowercase().contains("short test summary") {
                capture = false;
            }
            if capture {
                window.push(line);
            }
        }

        if window.is_empty() {
            let lines: Vec<&str> = raw.lines().collect();
            let start = lines.len().saturating_sub(self.tail_lines);
            return lines[start..].join("\n");
        }

        window.join("\n")
    }

    /// Split the output into `(test_name, section_text)` failure sections.
    /// A section runs from its header to the next header or the next
    /// `=`-separator block (e.g. the short-summary banner), whichever
    /// comes first.
    fn failure_sections<'a>(&self, raw: &'a str) -> Vec<(String, &'a str)> {
        let headers: Vec<(usize, usize, String)> = self
            .section_header
            .captures_iter(raw)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                Some((whole.start(), whole.end(), name.as_str().to_string()))
            })
            .collect();

        headers
            .iter()
            .enumerate()
            .map(|(i, (_, end, name))| {
                let next_header = headers
                    .get(i + 1)
                    .map(|(next_start, _, _)| *next_start)
                    .unwrap_or(raw.len());
                let next_banner = raw[*end..next_header]
                    .find("\n=")
                    .map(|offset| *end + offset)
                    .unwrap_or(next_header);
                (name.clone(), &raw[*end..next_banner])
            })
            .collect()
    }

    /// Parse one failure section into an instruction. A section with no
    /// extractable structure still yields a generic instruction quoting
    /// the section text.
    fn parse_section(&self, test_name: &str, section: &str) -> FixInstruction {
        let kind = ErrorKind::detect(section);

        let error_detail = self
            .assertion_detail
            .captures(section)
            .map(|caps| truncate(caps[1].trim(), self.max_evidence));

        let comparison = self.comparison.captures(section).map(|caps| {
            (
                truncate(caps[1].trim(), self.max_snippet),
                truncate(caps[2].trim(), self.max_snippet),
            )
        });

        let called_function = self
            .attribution
            .captures(section)
            .map(|caps| caps[1].to_string());

        let test_code: Vec<String> = self
            .test_code_line
            .captures_iter(section)
            .map(|caps| caps[1].trim().to_string())
            .collect();

        let mut description_parts = vec![format!("Test '{test_name}' failed")];
        if !test_code.is_empty() {
            description_parts.push(format!(
                "Test code: {}",
                truncate(&test_code.join("\n"), self.max_snippet)
            ));
        }
        if let Some((actual, expected)) = &comparison {
            description_parts.push(format!("Expected: {expected}"));
            description_parts.push(format!("Actual: {actual}"));
        }
        if let Some(detail) = &error_detail {
            description_parts.push(format!("Error: {detail}"));
        }
        if description_parts.len() == 1 {
            // Nothing structured was extracted; quote the raw section.
            description_parts.push(truncate(section.trim(), self.max_evidence));
        }

        let mut suggestion_parts = Vec::new();
        if let Some(function) = &called_function {
            suggestion_parts.push(format!("Check the function '{function}'"));
        }
        if let Some((actual, expected)) = &comparison {
            suggestion_parts.push(format!(
                "The call returned {actual} but should return {expected}"
            ));
        }
        suggestion_parts.push(kind_suggestion(kind, error_detail.as_deref()));

        let mut instruction = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            description_parts.join("\n"),
            suggestion_parts.join("\n"),
        )
        .with_test_name(test_name)
        .with_error_kind(kind);

        if let Some((actual, expected)) = comparison {
            instruction = instruction.with_comparison(actual, expected);
        }

        instruction
    }

    /// Secondary scan of `FAILED <locator> - <ErrorType>: <message>` lines,
    /// adding instructions for failures section parsing missed. A safety
    /// net for runs whose section markers are absent or malformed.
    fn scan_short_summary(&self, raw: &str, seen: &HashSet<String>) -> Vec<FixInstruction> {
        self.short_summary
            .captures_iter(raw)
            .filter(|caps| !seen.contains(&caps[1]))
            .map(|caps| {
                let test_name = caps[1].to_string();
                let kind = ErrorKind::from_name(&caps[2]);
                let message = truncate(caps[3].trim(), self.max_evidence);
                FixInstruction::new(
                    Severity::High,
                    IssueCategory::Bug,
                    format!("Test '{}' failed with {}", test_name, &caps[2]),
                    kind_suggestion(kind, Some(&message)),
                )
                .with_test_name(test_name)
                .with_error_kind(kind)
            })
            .collect()
    }

    fn collection_failure_summary(&self, raw: &str) -> TestRunSummary {
        let diagnostic = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            format!(
                "The test runner could not load the test module:\n{}",
                truncate(&self.error_window(raw), self.max_evidence)
            ),
            "Make sure the source file is syntactically valid and all of its imports resolve.",
        )
        .with_error_kind(ErrorKind::detect(raw));

        TestRunSummary::failing(0, 0, 1, raw, vec![diagnostic])
    }

    fn timeout_summary(&self, raw: &str) -> TestRunSummary {
        let diagnostic = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            "The test run exceeded its wall-clock budget and was killed.",
            "Check for infinite loops, unbounded recursion, and blocking I/O in the source under test.",
        );

        TestRunSummary::failing(0, 0, 1, raw, vec![diagnostic])
    }

    /// All three counts parsed to zero: a parsing failure, not zero tests.
    fn ambiguous_summary(&self, raw: &str) -> TestRunSummary {
        let collected = self
            .collected
            .captures(raw)
            .and_then(|caps| caps[1].parse::<u32>().ok());

        let description = match collected {
            Some(n) if n > 0 => format!(
                "The runner collected {n} test item(s) but no outcome counts could be read from its output."
            ),
            _ => "No outcome counts and no collection marker could be read from the runner output."
                .to_string(),
        };

        let diagnostic = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            description,
            format!(
                "Inspect the raw runner output:\n{}",
                truncate(&self.error_window(raw), self.max_evidence)
            ),
        );

        TestRunSummary::failing(0, 0, 1, raw, vec![diagnostic])
    }
}

impl TestOutputInterpreter for PytestInterpreter {
    fn interpret(&self, raw: &str, signal: ExecutionSignal) -> TestRunSummary {
        if self.is_collection_failure(raw) {
            return self.collection_failure_summary(raw);
        }

        if signal == ExecutionSignal::TimedOut {
            return self.timeout_summary(raw);
        }

        let (passed, failed, errored) = self.parse_counts(raw);

        if passed == 0 && failed == 0 && errored == 0 {
            return self.ambiguous_summary(raw);
        }

        if failed == 0 && errored == 0 {
            return TestRunSummary::passing(passed, raw);
        }

        let mut diagnostics: Vec<FixInstruction> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (test_name, section) in self.failure_sections(raw) {
            diagnostics.push(self.parse_section(&test_name, section));
            seen.insert(test_name);
        }

        diagnostics.extend(self.scan_short_summary(raw, &seen));

        if diagnostics.is_empty() {
            // The fixer must always receive at least one actionable item.
            diagnostics.push(
                FixInstruction::new(
                    Severity::High,
                    IssueCategory::Bug,
                    format!(
                        "Tests failed but no per-test detail could be extracted:\n{}",
                        truncate(&self.error_window(raw), self.max_evidence)
                    ),
                    "Analyse the quoted output and correct the source accordingly.",
                )
                .with_test_name("unknown"),
            );
        }

        TestRunSummary::failing(passed, failed, errored, raw, diagnostics)
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("hard-coded pattern is valid")
}

/// Character-safe truncation.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Remediation text for a recognised exception kind.
fn kind_suggestion(kind: ErrorKind, detail: Option<&str>) -> String {
    let base = match kind {
        ErrorKind::Assertion => {
            "The returned value does not match the expectation. Review the logic under test."
        }
        ErrorKind::Type => "Incorrect type detected. Check parameter and return types.",
        ErrorKind::Value => "Invalid value. Check input validation and edge cases.",
        ErrorKind::Attribute => {
            "Missing attribute. Make sure the object exposes the attribute or method being called."
        }
        ErrorKind::Key => "Missing dictionary key. Check the keys being accessed.",
        ErrorKind::Index => "Index out of bounds. Check list and array accesses.",
        ErrorKind::ZeroDivision => "Division by zero. Guard the denominator before dividing.",
        ErrorKind::Import => "Import failed. Make sure the module exists and is importable.",
        ErrorKind::Name => "Undefined name. Check spelling and variable scope.",
        ErrorKind::Unknown => "Correct the failure observed in the test.",
    };

    match detail {
        Some(detail) if !detail.is_empty() => format!("{base}\nDetail: {}", truncate(detail, 300)),
        _ => base.to_string(),
    }
}
