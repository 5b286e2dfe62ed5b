//! Quality gate: maps the top rerank score into a confidence tier.
//!
//! Pure and total — no I/O, no state. The caller decides what each tier
//! means (answer, hedge, escalate); keeping policy out of the gate lets
//! channels with different escalation rules share it.

use serde::Serialize;

/// Confidence tier for the retrieved evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Answer confidently from the evidence.
    Good,
    /// Answer, but flag for review / hedge the wording.
    Medium,
    /// Evidence is not trustworthy; escalate or disclaim.
    Poor,
}

/// Verdict produced by [`gate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVerdict {
    pub tier: QualityTier,
    pub top_score: f32,
}

/// Evaluate retrieval confidence against the two configured thresholds.
///
/// `threshold_good` must be greater than `threshold_medium`; scores are in
/// whatever range the configured reranker produces (not probabilities).
pub fn gate(top_score: f32, threshold_good: f32, threshold_medium: f32) -> QualityVerdict {
    let tier = if top_score >= threshold_good {
        QualityTier::Good
    } else if top_score >= threshold_medium {
        QualityTier::Medium
    } else {
        QualityTier::Poor
    };
    QualityVerdict { tier, top_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::NO_EVIDENCE_SCORE;

    const GOOD: f32 = 0.5;
    const MEDIUM: f32 = 0.0;

    #[test]
    fn tiers_at_and_around_boundaries() {
        assert_eq!(gate(0.9, GOOD, MEDIUM).tier, QualityTier::Good);
        assert_eq!(gate(GOOD, GOOD, MEDIUM).tier, QualityTier::Good);
        assert_eq!(gate(0.49, GOOD, MEDIUM).tier, QualityTier::Medium);
        assert_eq!(gate(MEDIUM, GOOD, MEDIUM).tier, QualityTier::Medium);
        assert_eq!(gate(-0.01, GOOD, MEDIUM).tier, QualityTier::Poor);
    }

    #[test]
    fn sentinel_is_always_poor() {
        assert_eq!(gate(NO_EVIDENCE_SCORE, GOOD, MEDIUM).tier, QualityTier::Poor);
    }

    #[test]
    fn deterministic_and_stateless() {
        let a = gate(0.42, GOOD, MEDIUM);
        let b = gate(0.42, GOOD, MEDIUM);
        assert_eq!(a, b);
        assert_eq!(a.top_score, 0.42);
    }
}
