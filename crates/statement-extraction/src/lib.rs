pub mod classifier;
pub mod timeseries;

pub use classifier::{ClassifierConfig, TableClassifier};
pub use timeseries::{extract_year, preprocess, MetricAliases, TimeSeriesExtractor};

use std::collections::BTreeMap;

use analysis_core::{FinancialStatements, MetricSeries, RawTable, StatementType};

/// Metrics pulled from the profit & loss statement.
pub const PROFIT_LOSS_METRICS: &[&str] = &["revenue", "ebitda", "ebit", "pat"];

/// Metrics pulled from the balance sheet.
pub const BALANCE_SHEET_METRICS: &[&str] = &[
    "total_assets",
    "total_liabilities",
    "equity",
    "total_debt",
    "cash",
    "current_assets",
    "current_liabilities",
];

/// Turns raw extracted tables into typed statements and metric series.
pub struct StatementExtractor {
    classifier: TableClassifier,
    extractor: TimeSeriesExtractor,
}

impl StatementExtractor {
    pub fn new() -> Self {
        Self {
            classifier: TableClassifier::new(),
            extractor: TimeSeriesExtractor::new(),
        }
    }

    /// Picks out the profit & loss, balance sheet, and cash flow statements.
    ///
    /// The first table classified into each slot wins; later tables of the
    /// same type are dropped. That can lose data when a document carries two
    /// tables of one kind, and is the documented behavior.
    pub fn extract_financial_statements(&self, tables: &[RawTable]) -> FinancialStatements {
        let mut statements = FinancialStatements::default();

        for table in tables {
            let statement_type = self.classifier.classify(table);
            let slot = match statement_type {
                StatementType::ProfitAndLoss => &mut statements.profit_loss,
                StatementType::BalanceSheet => &mut statements.balance_sheet,
                StatementType::CashFlow => &mut statements.cash_flow,
                StatementType::Unknown => continue,
            };
            if slot.is_none() {
                *slot = Some(timeseries::preprocess(table, statement_type));
            }
        }

        tracing::info!(
            profit_loss = statements.profit_loss.is_some(),
            balance_sheet = statements.balance_sheet.is_some(),
            cash_flow = statements.cash_flow.is_some(),
            "Recognized financial statements"
        );
        statements
    }

    /// Builds the full metric-name → series map across recognized statements.
    ///
    /// Metrics whose statement is missing are absent from the map; metrics
    /// whose row is missing map to an empty series.
    pub fn build_financial_data(
        &self,
        statements: &FinancialStatements,
    ) -> BTreeMap<String, MetricSeries> {
        let mut data = BTreeMap::new();

        if let Some(profit_loss) = &statements.profit_loss {
            for metric in PROFIT_LOSS_METRICS {
                data.insert(
                    metric.to_string(),
                    self.extractor.extract_metric(profit_loss, metric),
                );
            }
        }

        if let Some(balance_sheet) = &statements.balance_sheet {
            for metric in BALANCE_SHEET_METRICS {
                data.insert(
                    metric.to_string(),
                    self.extractor.extract_metric(balance_sheet, metric),
                );
            }
        }

        if statements.cash_flow.is_some() {
            // Cash-flow line items vary too much across prospectuses for
            // alias extraction; the slots are present but empty.
            for metric in ["operating_cash_flow", "investing_cash_flow", "financing_cash_flow"] {
                data.insert(metric.to_string(), MetricSeries::new());
            }
        }

        data
    }
}

impl Default for StatementExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profit_loss_table() -> RawTable {
        RawTable::new(
            vec!["Particulars".into(), "FY 2021".into(), "FY 2022".into(), "FY 2023".into()],
            vec![
                vec!["Revenue".into(), "800".into(), "900".into(), "1000".into()],
                vec!["EBITDA".into(), "150".into(), "180".into(), "200".into()],
                vec!["PAT".into(), "80".into(), "100".into(), "120".into()],
            ],
        )
        .unwrap()
    }

    fn balance_sheet_table() -> RawTable {
        RawTable::new(
            vec!["Balance Sheet".into(), "FY 2022".into(), "FY 2023".into()],
            vec![
                vec!["Total Assets".into(), "1100".into(), "1200".into()],
                vec!["Total Debt".into(), "250".into(), "200".into()],
                vec!["Equity".into(), "480".into(), "580".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn first_statement_of_a_type_wins() {
        let extractor = StatementExtractor::new();
        let second_pl = RawTable::new(
            vec!["Particulars".into(), "FY 2023".into()],
            vec![vec!["Revenue".into(), "9999".into()]],
        )
        .unwrap();

        let statements = extractor
            .extract_financial_statements(&[profit_loss_table(), second_pl, balance_sheet_table()]);

        let pl = statements.profit_loss.expect("profit & loss present");
        assert_eq!(pl.rows.len(), 3);
        assert!(statements.balance_sheet.is_some());
        assert!(statements.cash_flow.is_none());
    }

    #[test]
    fn financial_data_spans_both_statements() {
        let extractor = StatementExtractor::new();
        let statements = extractor
            .extract_financial_statements(&[profit_loss_table(), balance_sheet_table()]);
        let data = extractor.build_financial_data(&statements);

        assert_eq!(data["revenue"].get(&2023), Some(&1000.0));
        assert_eq!(data["total_debt"].get(&2023), Some(&200.0));
        assert_eq!(data["equity"].get(&2022), Some(&480.0));
        // No matching row: present but empty, never an error.
        assert!(data["total_liabilities"].is_empty());
        // No cash-flow statement: its metrics are absent entirely.
        assert!(!data.contains_key("operating_cash_flow"));
    }

    #[test]
    fn unknown_tables_are_ignored() {
        let extractor = StatementExtractor::new();
        let unrelated = RawTable::new(
            vec!["Office".into(), "Headcount".into()],
            vec![vec!["Mumbai".into(), "120".into()]],
        )
        .unwrap();
        let statements = extractor.extract_financial_statements(&[unrelated]);
        assert!(statements.profit_loss.is_none());
        assert!(statements.balance_sheet.is_none());
        assert!(statements.cash_flow.is_none());
    }
}
