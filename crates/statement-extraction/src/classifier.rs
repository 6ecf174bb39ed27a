use analysis_core::{RawTable, StatementType};
use serde::{Deserialize, Serialize};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Keyword vocabulary for statement typing. The three sets are checked in a
/// fixed order (profit & loss, then balance sheet, then cash flow); the
/// first set with any hit decides the type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub profit_loss: Vec<String>,
    pub balance_sheet: Vec<String>,
    pub cash_flow: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            profit_loss: words(&["revenue", "income statement", "profit", "expenditure"]),
            balance_sheet: words(&["balance sheet", "assets", "liabilities", "equity"]),
            cash_flow: words(&["cash flow", "operating activities", "investing activities"]),
        }
    }
}

/// Assigns a semantic statement type to a raw extracted table.
pub struct TableClassifier {
    config: ClassifierConfig,
}

impl TableClassifier {
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Types a table from its column headers plus every label-column value.
    ///
    /// The check order is load-bearing: a table mentioning both "revenue"
    /// and "equity" types as profit & loss because that set is checked
    /// first. Do not reorder the sets.
    pub fn classify(&self, table: &RawTable) -> StatementType {
        let mut haystack = table.headers.join(" ");
        for label in table.label_column() {
            haystack.push(' ');
            haystack.push_str(label);
        }
        let haystack = haystack.to_lowercase();

        let hit = |set: &[String]| set.iter().any(|word| haystack.contains(word.as_str()));

        if hit(&self.config.profit_loss) {
            StatementType::ProfitAndLoss
        } else if hit(&self.config.balance_sheet) {
            StatementType::BalanceSheet
        } else if hit(&self.config.cash_flow) {
            StatementType::CashFlow
        } else {
            StatementType::Unknown
        }
    }
}

impl Default for TableClassifier {
    fn default() -> Self {
        Self::new()
    }
}
