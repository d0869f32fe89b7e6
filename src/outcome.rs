//! Validation outcomes and batch aggregation
//!
//! One `ValidationOutcome` per code block (or sub-check), reduced into a
//! single `BatchResult` plus a human-readable report. Aggregation is a
//! pure fold; formatting never alters the underlying data.

use serde::{Deserialize, Serialize};

/// Three-valued verdict of one validation unit.
///
/// `Skipped` means "nothing to judge", not "pass" - a batch of only
/// skipped outcomes is not valid overall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failed,
    Skipped,
}

impl Verdict {
    /// Report glyph for this verdict.
    pub fn glyph(&self) -> &'static str {
        match self {
            Verdict::Success => "\u{2705}",
            Verdict::Failed => "\u{274c}",
            Verdict::Skipped => "\u{23ed}\u{fe0f}",
        }
    }
}

/// Result of one validation unit: a verdict plus human-readable prose.
///
/// `detail` is never empty - every verdict carries an explanation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    pub detail: String,
}

impl ValidationOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Success,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Failed,
            detail: detail.into(),
        }
    }

    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Skipped,
            detail: detail.into(),
        }
    }

    /// Input-shape failure, with the stable prefix the error taxonomy
    /// promises callers.
    pub fn invalid_input(detail: impl AsRef<str>) -> Self {
        Self::failed(format!("Invalid input: {}", detail.as_ref()))
    }

    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

/// Combined result of validating N independent code blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub overall_valid: bool,
    pub outcomes: Vec<ValidationOutcome>,
}

impl BatchResult {
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }
}

/// Reduce per-block outcomes into one overall verdict.
///
/// Valid iff there is at least one outcome and every outcome succeeded.
/// An empty batch or a skipped-only batch is not valid.
pub fn aggregate(outcomes: Vec<ValidationOutcome>) -> BatchResult {
    let overall_valid = !outcomes.is_empty() && outcomes.iter().all(|o| o.is_success());
    BatchResult {
        overall_valid,
        outcomes,
    }
}

/// Render a numbered, glyph-prefixed section per outcome, in original order.
pub fn render_report(result: &BatchResult) -> String {
    let mut out = String::new();
    for (i, outcome) in result.outcomes.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} {}\n",
            i + 1,
            outcome.verdict.glyph(),
            outcome.detail
        ));
    }
    out.push_str(if result.overall_valid {
        "Overall: valid\n"
    } else {
        "Overall: invalid\n"
    });
    out
}
