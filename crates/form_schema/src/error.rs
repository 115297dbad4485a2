use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    InvalidType,
    InvalidLiteral,
    InvalidEnumValue,
    InvalidDate,
    UnrecognizedKeys,
    InvalidUnion,
    InvalidUnionDiscriminator,
    InvalidIntersectionTypes,
    TooSmall,
    TooBig,
    Custom,
}

/// A single validation failure located by its path inside the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub code: IssueCode,
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn new(code: IssueCode, path: &[PathSegment], message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// Dotted rendering of the path, empty for the root.
    #[must_use]
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Returns `true` when any issue was reported at exactly `path`.
    #[must_use]
    pub fn has_issue_at(&self, path: &[&str]) -> bool {
        self.issues.iter().any(|issue| {
            issue.path.len() == path.len()
                && issue
                    .path
                    .iter()
                    .zip(path)
                    .all(|(segment, expected)| segment.to_string() == *expected)
        })
    }
}

fn render_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            let path = issue.dotted_path();
            if path.is_empty() {
                issue.message.clone()
            } else {
                format!("{path}: {}", issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
