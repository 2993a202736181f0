//! Structured fix instructions handed to the fixer collaborator.

use serde::{Deserialize, Serialize};

/// Severity of a diagnosed issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Coarse category of a diagnosed issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    Bug,
    Quality,
    Style,
    Tests,
}

/// Catalog of exception kinds recognised in test failure output.
///
/// Serialized with the runner's literal exception names so downstream
/// consumers (and the fixer prompt) see the familiar spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ErrorKind {
    #[serde(rename = "AssertionError")]
    Assertion,
    #[serde(rename = "TypeError")]
    Type,
    #[serde(rename = "ValueError")]
    Value,
    #[serde(rename = "AttributeError")]
    Attribute,
    #[serde(rename = "KeyError")]
    Key,
    #[serde(rename = "IndexError")]
    Index,
    #[serde(rename = "ZeroDivisionError")]
    ZeroDivision,
    #[serde(rename = "ImportError")]
    Import,
    #[serde(rename = "NameError")]
    Name,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl ErrorKind {
    /// All kinds with a literal exception-name spelling, in scan order.
    const CATALOG: [(ErrorKind, &'static str); 9] = [
        (ErrorKind::Assertion, "AssertionError"),
        (ErrorKind::Type, "TypeError"),
        (ErrorKind::Value, "ValueError"),
        (ErrorKind::Attribute, "AttributeError"),
        (ErrorKind::Key, "KeyError"),
        (ErrorKind::Index, "IndexError"),
        (ErrorKind::ZeroDivision, "ZeroDivisionError"),
        (ErrorKind::Import, "ImportError"),
        (ErrorKind::Name, "NameError"),
    ];

    /// Literal name as emitted by the test runner ("unknown" for the default).
    pub fn as_str(self) -> &'static str {
        Self::CATALOG
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Scan a failure section for the first recognised exception name.
    pub fn detect(section: &str) -> Self {
        Self::CATALOG
            .iter()
            .find(|(_, name)| section.contains(name))
            .map(|(kind, _)| *kind)
            .unwrap_or(ErrorKind::Unknown)
    }

    /// Resolve a literal exception name, e.g. from a short-summary line.
    pub fn from_name(name: &str) -> Self {
        Self::CATALOG
            .iter()
            .find(|(_, catalog_name)| *catalog_name == name)
            .map(|(kind, _)| *kind)
            .unwrap_or(ErrorKind::Unknown)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One actionable diagnostic: a problem and its suggested remedy.
///
/// Produced by the auditor (from static analysis) and by the test-result
/// interpreter (from failure output). Never emitted for a passing test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixInstruction {
    /// Severity level.
    pub severity: Severity,

    /// Issue category.
    pub category: IssueCategory,

    /// Line number (1-indexed; 0 = not applicable).
    pub line: u32,

    /// Human-readable description of the problem. Always non-empty.
    pub description: String,

    /// Actionable remediation text. Always non-empty.
    pub suggestion: String,

    /// Failing test identifier, when the instruction came from a test run.
    pub test_name: Option<String>,

    /// Exception kind observed in the failure, if any.
    #[serde(default)]
    pub error_kind: ErrorKind,

    /// Literal expected-value snippet from a binary comparison.
    pub expected: Option<String>,

    /// Literal actual-value snippet from a binary comparison.
    pub actual: Option<String>,
}

impl FixInstruction {
    /// Create a new instruction. `description` and `suggestion` must be
    /// non-empty; empty inputs are replaced with a generic marker so the
    /// invariant holds even for degenerate callers.
    pub fn new(
        severity: Severity,
        category: IssueCategory,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        let mut description = description.into();
        if description.trim().is_empty() {
            description = "unspecified issue".to_string();
        }
        let mut suggestion = suggestion.into();
        if suggestion.trim().is_empty() {
            suggestion = "inspect the raw output and correct the source".to_string();
        }

        Self {
            severity,
            category,
            line: 0,
            description,
            suggestion,
            test_name: None,
            error_kind: ErrorKind::Unknown,
            expected: None,
            actual: None,
        }
    }

    /// Set the source line.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Set the failing test name.
    pub fn with_test_name(mut self, test_name: impl Into<String>) -> Self {
        self.test_name = Some(test_name.into());
        self
    }

    /// Set the observed exception kind.
    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = kind;
        self
    }

    /// Set the expected/actual snippets from a binary comparison.
    pub fn with_comparison(
        mut self,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        self.actual = Some(actual.into());
        self.expected = Some(expected.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_serde_uses_screaming_case() {
        let json = serde_json::to_string(&Severity::High).expect("serialize");
        assert_eq!(json, "\"HIGH\"");
        let back: Severity = serde_json::from_str("\"MEDIUM\"").expect("deserialize");
        assert_eq!(back, Severity::Medium);
    }

    #[test]
    fn test_error_kind_detect() {
        assert_eq!(
            ErrorKind::detect("E  ZeroDivisionError: division by zero"),
            ErrorKind::ZeroDivision
        );
        assert_eq!(
            ErrorKind::detect("KeyError: 'missing'"),
            ErrorKind::Key
        );
        assert_eq!(ErrorKind::detect("something odd happened"), ErrorKind::Unknown);
    }

    #[test]
    fn test_error_kind_from_name() {
        assert_eq!(ErrorKind::from_name("TypeError"), ErrorKind::Type);
        assert_eq!(ErrorKind::from_name("RuntimeError"), ErrorKind::Unknown);
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        let json = serde_json::to_string(&ErrorKind::Assertion).expect("serialize");
        assert_eq!(json, format!("\"{}\"", ErrorKind::Assertion));
        assert_eq!(ErrorKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_instruction_builder() {
        let instruction = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            "divide(1, 0) raised ZeroDivisionError",
            "guard the denominator before dividing",
        )
        .with_line(42)
        .with_test_name("test_divide_by_zero")
        .with_error_kind(ErrorKind::ZeroDivision)
        .with_comparison("None", "0.5");

        assert_eq!(instruction.line, 42);
        assert_eq!(instruction.test_name.as_deref(), Some("test_divide_by_zero"));
        assert_eq!(instruction.error_kind, ErrorKind::ZeroDivision);
        assert_eq!(instruction.actual.as_deref(), Some("None"));
        assert_eq!(instruction.expected.as_deref(), Some("0.5"));
    }

    #[test]
    fn test_instruction_never_empty() {
        let instruction = FixInstruction::new(Severity::Low, IssueCategory::Style, "  ", "");
        assert!(!instruction.description.trim().is_empty());
        assert!(!instruction.suggestion.trim().is_empty());
    }

    #[test]
    fn test_instruction_serde_roundtrip() {
        let instruction = FixInstruction::new(
            Severity::Medium,
            IssueCategory::Quality,
            "function `load` has no docstring",
            "add a short docstring describing inputs and outputs",
        )
        .with_line(7);

        let json = serde_json::to_string(&instruction).expect("serialize");
        let back: FixInstruction = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(instruction, back);
    }
}
