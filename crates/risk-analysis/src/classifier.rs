use analysis_core::{RiskCategory, RiskRecord};
use serde::{Deserialize, Serialize};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Trigger vocabulary per category. Pair order is the classifier's
/// tie-break: when two categories hit the same number of triggers, the
/// earlier pair wins. Keep the order fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeywords {
    categories: Vec<(RiskCategory, Vec<String>)>,
}

impl CategoryKeywords {
    pub fn new(categories: Vec<(RiskCategory, Vec<String>)>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[(RiskCategory, Vec<String>)] {
        &self.categories
    }
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self {
            categories: vec![
                (RiskCategory::Business, words(&["business model", "operations", "product"])),
                (
                    RiskCategory::Financial,
                    words(&["debt", "cash flow", "profitability", "liquidity"]),
                ),
                (
                    RiskCategory::Operational,
                    words(&["supply chain", "manufacturing", "capacity"]),
                ),
                (
                    RiskCategory::Regulatory,
                    words(&["government", "regulation", "compliance", "policy"]),
                ),
                (
                    RiskCategory::Legal,
                    words(&["litigation", "legal proceedings", "lawsuit"]),
                ),
                (
                    RiskCategory::Market,
                    words(&["competition", "market share", "pricing"]),
                ),
                (
                    RiskCategory::Promoter,
                    words(&["promoter", "management", "related party"]),
                ),
                (
                    RiskCategory::CustomerConcentration,
                    words(&["customer concentration", "major customers"]),
                ),
            ],
        }
    }
}

/// Assigns each risk record to a category by keyword scoring.
pub struct RiskClassifier {
    keywords: CategoryKeywords,
}

impl RiskClassifier {
    pub fn new() -> Self {
        Self {
            keywords: CategoryKeywords::default(),
        }
    }

    pub fn with_keywords(keywords: CategoryKeywords) -> Self {
        Self { keywords }
    }

    /// Picks the category whose triggers appear most often in the risk text,
    /// writes it into the record, and returns it.
    ///
    /// Categories with zero hits are out of consideration; a tie on the
    /// highest count goes to the category declared first; no hits anywhere
    /// falls back to Other. Reclassifying an already-classified record
    /// yields the same category.
    pub fn classify(&self, risk: &mut RiskRecord) -> RiskCategory {
        let text = risk.combined_text();

        let mut best = RiskCategory::Other;
        let mut best_score = 0usize;
        for (category, triggers) in self.keywords.categories() {
            let score = triggers
                .iter()
                .filter(|trigger| text.contains(trigger.as_str()))
                .count();
            if score > best_score {
                best = *category;
                best_score = score;
            }
        }

        risk.category = Some(best);
        best
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}
