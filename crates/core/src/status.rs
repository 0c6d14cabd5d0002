//! Project status values and free-text status normalization.
//!
//! Developers post timeline updates with a human-typed status ("Testing &
//! QA", "inprogress", ...). [`normalize_status`] maps that input onto one of
//! the five canonical [`ProjectStatus`] values, or rejects it.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The five canonical stored statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "testing")]
    Testing,
    #[serde(rename = "qa")]
    Qa,
    #[serde(rename = "completed")]
    Completed,
}

/// All canonical statuses in lifecycle order.
pub const CANONICAL_STATUSES: &[ProjectStatus] = &[
    ProjectStatus::Open,
    ProjectStatus::InProgress,
    ProjectStatus::Testing,
    ProjectStatus::Qa,
    ProjectStatus::Completed,
];

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in progress",
            ProjectStatus::Testing => "testing",
            ProjectStatus::Qa => "qa",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of a stored status value.
impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CANONICAL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown project status '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Exact-match aliases consulted after keyword detection fails.
///
/// `review` is accepted as input but is not a stored status; it is recorded
/// as `qa`.
const STATUS_ALIASES: &[(&str, ProjectStatus)] = &[
    ("inprogress", ProjectStatus::InProgress),
    ("in-progress", ProjectStatus::InProgress),
    ("in progress", ProjectStatus::InProgress),
    ("testing", ProjectStatus::Testing),
    ("test", ProjectStatus::Testing),
    ("qa", ProjectStatus::Qa),
    ("review", ProjectStatus::Qa),
    ("completed", ProjectStatus::Completed),
    ("open", ProjectStatus::Open),
];

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[&,+]").expect("valid regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static TEST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btest").expect("valid regex"));
static QA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bqa\b|\bq a\b|\bq and a\b").expect("valid regex"));
static IN_PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin[- ]?progress\b|inprogress|in-progress").expect("valid regex")
});
static COMPLETE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcomplete").expect("valid regex"));
static OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bopen\b").expect("valid regex"));

/// Lowercase, turn `&`, `,` and `+` into spaces, drop punctuation other than
/// `-`, and collapse whitespace.
fn clean_status_text(lower: &str) -> String {
    let spaced = SEPARATOR_RE.replace_all(lower, " ");
    let stripped = NON_WORD_RE.replace_all(&spaced, " ");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Map free-text status input onto a canonical status.
///
/// Keyword rules are evaluated in order and the first match wins:
///
/// | Input contains           | Result        |
/// |--------------------------|---------------|
/// | both `qa` and `test`     | `qa`          |
/// | `qa` (or `q&a`, `q a`)   | `qa`          |
/// | `test` / `testing`       | `testing`     |
/// | `in progress` variants   | `in progress` |
/// | `complete` / `completed` | `completed`   |
/// | `open`                   | `open`        |
///
/// Otherwise the cleaned text must exactly match an entry in the alias
/// table. Returns a validation message listing the canonical set on failure.
pub fn normalize_status(input: &str) -> Result<ProjectStatus, String> {
    let lower = input.trim().to_lowercase();
    let cleaned = clean_status_text(&lower);

    let has_test = TEST_RE.is_match(&cleaned);
    let has_qa = QA_RE.is_match(&cleaned) || lower.contains("q&a");

    let keyword_match = if has_qa {
        Some(ProjectStatus::Qa)
    } else if has_test {
        Some(ProjectStatus::Testing)
    } else if IN_PROGRESS_RE.is_match(&cleaned) {
        Some(ProjectStatus::InProgress)
    } else if COMPLETE_RE.is_match(&cleaned) {
        Some(ProjectStatus::Completed)
    } else if OPEN_RE.is_match(&cleaned) {
        Some(ProjectStatus::Open)
    } else {
        None
    };

    keyword_match
        .or_else(|| {
            STATUS_ALIASES
                .iter()
                .find(|(alias, _)| *alias == cleaned)
                .map(|(_, status)| *status)
        })
        .ok_or_else(invalid_status_message)
}

fn invalid_status_message() -> String {
    let allowed: Vec<&str> = CANONICAL_STATUSES.iter().map(|s| s.as_str()).collect();
    format!(
        "Invalid or unsupported status. Allowed values: {} (alias: review)",
        allowed.join(", ")
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values_normalize_to_themselves() {
        for status in CANONICAL_STATUSES {
            assert_eq!(normalize_status(status.as_str()), Ok(*status));
        }
    }

    #[test]
    fn qa_wins_when_both_keywords_present() {
        assert_eq!(normalize_status("Testing & QA"), Ok(ProjectStatus::Qa));
        assert_eq!(normalize_status("qa + test run"), Ok(ProjectStatus::Qa));
    }

    #[test]
    fn q_and_a_spellings_map_to_qa() {
        assert_eq!(normalize_status("Q&A"), Ok(ProjectStatus::Qa));
        assert_eq!(normalize_status("q and a pass"), Ok(ProjectStatus::Qa));
    }

    #[test]
    fn test_keyword_maps_to_testing() {
        assert_eq!(normalize_status("Testing"), Ok(ProjectStatus::Testing));
        assert_eq!(normalize_status("in testing now"), Ok(ProjectStatus::Testing));
        assert_eq!(normalize_status("test"), Ok(ProjectStatus::Testing));
    }

    #[test]
    fn in_progress_variants() {
        assert_eq!(normalize_status("inprogress"), Ok(ProjectStatus::InProgress));
        assert_eq!(normalize_status("In-Progress"), Ok(ProjectStatus::InProgress));
        assert_eq!(normalize_status("  in   progress "), Ok(ProjectStatus::InProgress));
    }

    #[test]
    fn completion_and_open() {
        assert_eq!(normalize_status("Completed!"), Ok(ProjectStatus::Completed));
        assert_eq!(normalize_status("complete"), Ok(ProjectStatus::Completed));
        assert_eq!(normalize_status("re-open"), Ok(ProjectStatus::Open));
    }

    #[test]
    fn review_alias_is_recorded_as_qa() {
        assert_eq!(normalize_status("Review"), Ok(ProjectStatus::Qa));
    }

    #[test]
    fn unrecognized_text_is_rejected_with_canonical_list() {
        let err = normalize_status("archived").unwrap_err();
        assert!(err.contains("open, in progress, testing, qa, completed"));
        assert!(normalize_status("").is_err());
        assert!(normalize_status("contest").is_err());
    }

    #[test]
    fn strict_parse_only_accepts_canonical_values() {
        assert_eq!("in progress".parse::<ProjectStatus>(), Ok(ProjectStatus::InProgress));
        assert!("review".parse::<ProjectStatus>().is_err());
        assert!("In Progress".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn serde_uses_canonical_labels() {
        let json = serde_json::to_string(&ProjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
    }
}
