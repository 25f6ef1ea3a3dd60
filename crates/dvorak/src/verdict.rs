//! Verdicts and published result records

use serde::{Deserialize, Serialize};

/// Final classification of a judged submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum Verdict {
    /// All test cases passed
    #[serde(rename = "AC")]
    Accepted,

    /// Output mismatch on a test case
    #[serde(rename = "WA")]
    WrongAnswer {
        /// 1-based index of the failing case
        case: usize,
        /// Preview of the actual output
        got: String,
        /// Preview of the expected output
        exp: String,
    },

    /// Nonzero exit status, deadline, or sandbox failure
    #[serde(rename = "RE")]
    RuntimeError {
        /// 1-based index of the failing case (None before any case ran)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        case: Option<usize>,
        msg: String,
        #[serde(default, skip_serializing_if = "is_false")]
        timed_out: bool,
    },

    /// Compilation failed
    #[serde(rename = "CE")]
    CompileError { msg: String },

    /// Language ID not in the registry
    #[serde(rename = "UNSUPPORTED")]
    UnsupportedLanguage { language: String, msg: String },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Verdict {
    /// Short verdict code (`AC`, `WA`, `RE`, `CE`, `UNSUPPORTED`)
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer { .. } => "WA",
            Verdict::RuntimeError { .. } => "RE",
            Verdict::CompileError { .. } => "CE",
            Verdict::UnsupportedLanguage { .. } => "UNSUPPORTED",
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// 1-based index of the failing case, if any
    pub fn case(&self) -> Option<usize> {
        match self {
            Verdict::WrongAnswer { case, .. } => Some(*case),
            Verdict::RuntimeError { case, .. } => *case,
            _ => None,
        }
    }

    pub fn unsupported_language(language: &str) -> Self {
        Verdict::UnsupportedLanguage {
            language: language.to_string(),
            msg: format!("unsupported language {language}"),
        }
    }

    /// RE for an infrastructure failure outside of any test case
    pub fn internal(msg: impl Into<String>) -> Self {
        Verdict::RuntimeError {
            case: None,
            msg: msg.into(),
            timed_out: false,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.case() {
            Some(case) => write!(f, "{} (case {case})", self.code()),
            None => write!(f, "{}", self.code()),
        }
    }
}

/// A verdict published to the result store under its job ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: String,

    #[serde(flatten)]
    pub verdict: Verdict,
}

impl ResultRecord {
    pub fn new(job_id: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            job_id: job_id.into(),
            verdict,
        }
    }

    /// Result store key for a job ID
    pub fn key(prefix: &str, job_id: &str) -> String {
        format!("{prefix}{job_id}")
    }
}

/// Keep at most the last `max_chars` characters of `text`
pub fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// Keep at most the first `max_chars` characters of `text`
pub fn head(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
