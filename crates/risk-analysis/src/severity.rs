use std::collections::BTreeMap;

use analysis_core::{CategorySummary, RiskCategory, RiskRecord, Severity};
use serde::{Deserialize, Serialize};

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

/// Indicator vocabularies for the severity tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityIndicators {
    pub high: Vec<String>,
    pub medium: Vec<String>,
}

impl Default for SeverityIndicators {
    fn default() -> Self {
        Self {
            high: phrases(&[
                "significant",
                "material",
                "substantial",
                "major",
                "critical",
                "severe",
                "adversely affect",
                "inability",
                "failure",
                "default",
                "litigation",
                "regulatory action",
            ]),
            medium: phrases(&[
                "may affect",
                "could impact",
                "potential",
                "possible",
                "risk of",
                "uncertainty",
                "dependent",
                "reliant",
            ]),
        }
    }
}

/// Assigns severity tiers and aggregates them into a 0-100 risk score.
pub struct RiskSeverityScorer {
    indicators: SeverityIndicators,
}

impl RiskSeverityScorer {
    pub fn new() -> Self {
        Self {
            indicators: SeverityIndicators::default(),
        }
    }

    pub fn with_indicators(indicators: SeverityIndicators) -> Self {
        Self { indicators }
    }

    /// Three-tier ordinal call over indicator counts, highest tier checked
    /// first: two high hits make High, one high hit or two medium hits make
    /// Medium, anything else is Low. Writes the tier into the record and
    /// returns it.
    pub fn assess(&self, risk: &mut RiskRecord) -> Severity {
        let text = risk.combined_text();
        let high_count = self
            .indicators
            .high
            .iter()
            .filter(|phrase| text.contains(phrase.as_str()))
            .count();
        let medium_count = self
            .indicators
            .medium
            .iter()
            .filter(|phrase| text.contains(phrase.as_str()))
            .count();

        let severity = if high_count >= 2 {
            Severity::High
        } else if high_count >= 1 || medium_count >= 2 {
            Severity::Medium
        } else {
            Severity::Low
        };
        risk.severity = Some(severity);
        severity
    }

    /// 0-100 aggregate over all records, regardless of category: severity
    /// weights 3/2/1 are averaged and scaled by `min((avg / 3) * 100, 100)`.
    /// Records never assessed count at Low's weight. Empty input scores 0.
    pub fn aggregate_score(&self, risks: &[RiskRecord]) -> f64 {
        if risks.is_empty() {
            return 0.0;
        }

        let weighted_sum: f64 = risks
            .iter()
            .map(|risk| risk.severity.map_or(Severity::Low.weight(), |s| s.weight()))
            .sum();
        let average_weight = weighted_sum / risks.len() as f64;
        ((average_weight / 3.0) * 100.0).min(100.0)
    }

    /// Per-category counts and severity tallies for reporting.
    pub fn breakdown_by_category(
        &self,
        risks: &[RiskRecord],
    ) -> BTreeMap<RiskCategory, CategorySummary> {
        let mut categories: BTreeMap<RiskCategory, CategorySummary> = BTreeMap::new();

        for risk in risks {
            let category = risk.category.unwrap_or(RiskCategory::Other);
            let summary = categories.entry(category).or_default();
            summary.count += 1;
            match risk.severity {
                Some(Severity::High) => summary.severity_breakdown.high += 1,
                Some(Severity::Medium) => summary.severity_breakdown.medium += 1,
                _ => summary.severity_breakdown.low += 1,
            }
        }

        categories
    }
}

impl Default for RiskSeverityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessed(title: &str, description: &str) -> (RiskRecord, Severity) {
        let scorer = RiskSeverityScorer::new();
        let mut risk = RiskRecord::new(title, description);
        let severity = scorer.assess(&mut risk);
        (risk, severity)
    }

    #[test]
    fn two_high_indicators_make_high() {
        let (risk, severity) = assessed(
            "Litigation",
            "Material litigation could adversely affect results",
        );
        assert_eq!(severity, Severity::High);
        assert_eq!(risk.severity, Some(Severity::High));
    }

    #[test]
    fn one_high_indicator_makes_medium() {
        let (_, severity) = assessed("Key personnel", "Departures create significant churn");
        assert_eq!(severity, Severity::Medium);
    }

    #[test]
    fn two_medium_indicators_make_medium() {
        let (_, severity) = assessed("Suppliers", "Dependent on imports, with potential delays");
        assert_eq!(severity, Severity::Medium);
    }

    #[test]
    fn no_indicators_make_low() {
        let (_, severity) = assessed("Seasonality", "Sales vary by quarter");
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn aggregate_score_edges() {
        let scorer = RiskSeverityScorer::new();
        assert_eq!(scorer.aggregate_score(&[]), 0.0);

        let mut high = RiskRecord::new("a", "");
        high.severity = Some(Severity::High);
        let all_high = vec![high.clone(), high.clone(), high];
        assert!((scorer.aggregate_score(&all_high) - 100.0).abs() < f64::EPSILON);

        let mut low = RiskRecord::new("b", "");
        low.severity = Some(Severity::Low);
        let score = scorer.aggregate_score(&[low]);
        assert!((score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unassessed_records_count_as_low() {
        let scorer = RiskSeverityScorer::new();
        let unset = RiskRecord::new("c", "");
        let score = scorer.aggregate_score(&[unset]);
        assert!((score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_groups_by_category() {
        let scorer = RiskSeverityScorer::new();
        let mut a = RiskRecord::new("a", "");
        a.category = Some(RiskCategory::Regulatory);
        a.severity = Some(Severity::High);
        let mut b = a.clone();
        b.severity = Some(Severity::Medium);
        let mut c = RiskRecord::new("c", "");
        c.category = Some(RiskCategory::Financial);
        c.severity = Some(Severity::Low);

        let breakdown = scorer.breakdown_by_category(&[a, b, c]);
        let regulatory = &breakdown[&RiskCategory::Regulatory];
        assert_eq!(regulatory.count, 2);
        assert_eq!(regulatory.severity_breakdown.high, 1);
        assert_eq!(regulatory.severity_breakdown.medium, 1);
        assert_eq!(breakdown[&RiskCategory::Financial].severity_breakdown.low, 1);
    }
}
