use std::collections::BTreeMap;

use analysis_core::{MetricSeries, RawTable, Statement, StatementRow, StatementType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20\d{2}|FY\s*\d{2})\b").unwrap());

/// Pulls a fiscal year out of a column header.
///
/// Recognizes a four-digit token beginning "20" and a two-digit token after
/// an "FY" marker (normalized by adding 2000). Anything else yields None and
/// the column is simply excluded from extraction.
pub fn extract_year(column_label: &str) -> Option<i32> {
    let token = YEAR_PATTERN.captures(column_label)?.get(1)?.as_str();
    if token.starts_with("FY") {
        let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse::<i32>().ok().map(|year| 2000 + year)
    } else {
        token.parse().ok()
    }
}

/// Coerces one table cell to a number. Thousands separators and surrounding
/// whitespace are tolerated; anything else is missing, never zero.
fn parse_numeric(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Reduces a raw table to its label column plus year-keyed numeric columns.
///
/// Non-year columns are discarded, retained cells are coerced to numbers
/// (unparsable cells become missing), rows with no values left are dropped,
/// and labels are whitespace-trimmed.
pub fn preprocess(table: &RawTable, statement_type: StatementType) -> Statement {
    let mut years = Vec::new();
    let mut column_indices = Vec::new();
    for (idx, header) in table.headers.iter().enumerate().skip(1) {
        if let Some(year) = extract_year(header) {
            years.push(year);
            column_indices.push(idx);
        }
    }

    let mut rows = Vec::new();
    for raw_row in &table.rows {
        let label = raw_row
            .first()
            .map(|l| l.trim().to_string())
            .unwrap_or_default();
        let values: Vec<Option<f64>> = column_indices
            .iter()
            .map(|&idx| raw_row.get(idx).and_then(|cell| parse_numeric(cell)))
            .collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        rows.push(StatementRow { label, values });
    }

    Statement {
        statement_type,
        years,
        rows,
    }
}

/// Ordered label aliases per metric name, most specific first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricAliases {
    aliases: BTreeMap<String, Vec<String>>,
}

impl MetricAliases {
    pub fn new(aliases: BTreeMap<String, Vec<String>>) -> Self {
        Self { aliases }
    }
}

impl Default for MetricAliases {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        let mut insert = |metric: &str, patterns: &[&str]| {
            aliases.insert(
                metric.to_string(),
                patterns.iter().map(|p| p.to_string()).collect(),
            );
        };

        insert(
            "revenue",
            &["revenue", "total revenue", "net revenue", "sales", "total income"],
        );
        insert("ebitda", &["ebitda", "earnings before interest"]);
        insert("ebit", &["ebit", "operating profit"]);
        insert("pat", &["pat", "profit after tax", "net profit"]);
        insert("total_assets", &["total assets"]);
        insert("total_liabilities", &["total liabilities"]);
        insert("equity", &["equity", "shareholders equity", "total equity"]);
        insert("total_debt", &["total debt", "borrowings"]);
        insert("cash", &["cash", "cash and cash equivalents"]);
        insert("current_assets", &["current assets"]);
        insert("current_liabilities", &["current liabilities"]);

        Self { aliases }
    }
}

/// Extracts year→value series for named metrics from typed statements.
pub struct TimeSeriesExtractor {
    aliases: MetricAliases,
}

impl TimeSeriesExtractor {
    pub fn new() -> Self {
        Self {
            aliases: MetricAliases::default(),
        }
    }

    pub fn with_aliases(aliases: MetricAliases) -> Self {
        Self { aliases }
    }

    /// Builds the time series for one named metric.
    ///
    /// The label column is scanned top to bottom and the first row whose
    /// lowercase label contains any alias wins; later matching rows are
    /// ignored even when their label is more specific. Cells missing after
    /// preprocessing are skipped, never zero-filled. Unknown metric names
    /// fall back to the name itself as the only alias.
    pub fn extract_metric(&self, statement: &Statement, metric_name: &str) -> MetricSeries {
        let fallback = vec![metric_name.to_lowercase()];
        let patterns = self
            .aliases
            .aliases
            .get(metric_name)
            .unwrap_or(&fallback);

        for row in &statement.rows {
            let label = row.label.to_lowercase();
            if !patterns.iter().any(|p| label.contains(p.as_str())) {
                continue;
            }

            let mut series = MetricSeries::new();
            for (year, value) in statement.years.iter().zip(&row.values) {
                if let Some(v) = value {
                    series.insert(*year, *v);
                }
            }
            return series;
        }

        MetricSeries::new()
    }
}

impl Default for TimeSeriesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RawTable {
        RawTable::new(
            vec![
                "Particulars".to_string(),
                "FY 2021".to_string(),
                "FY 2022".to_string(),
                "FY 2023".to_string(),
                "Notes".to_string(),
            ],
            vec![
                vec!["  Revenue ".into(), "800".into(), "900".into(), "1000".into(), "a".into()],
                vec!["EBITDA".into(), "150".into(), "180".into(), "200".into(), "b".into()],
                vec!["PAT".into(), "80".into(), "n/a".into(), "120".into(), "c".into()],
                vec!["Footnote".into(), "".into(), "".into(), "".into(), "d".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn year_formats() {
        assert_eq!(extract_year("FY 22"), Some(2022));
        assert_eq!(extract_year("FY22"), Some(2022));
        assert_eq!(extract_year("2023"), Some(2023));
        assert_eq!(extract_year("FY 2023"), Some(2023));
        assert_eq!(extract_year("Q1"), None);
        assert_eq!(extract_year("Nine months ended"), None);
    }

    #[test]
    fn preprocess_keeps_year_columns_and_drops_empty_rows() {
        let statement = preprocess(&sample_table(), StatementType::ProfitAndLoss);
        assert_eq!(statement.years, vec![2021, 2022, 2023]);
        // The all-empty footnote row is gone, labels are trimmed.
        assert_eq!(statement.rows.len(), 3);
        assert_eq!(statement.rows[0].label, "Revenue");
        // "n/a" coerces to missing, not zero.
        assert_eq!(statement.rows[2].values, vec![Some(80.0), None, Some(120.0)]);
    }

    #[test]
    fn revenue_series_extracted() {
        let statement = preprocess(&sample_table(), StatementType::ProfitAndLoss);
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "revenue");
        let expected: MetricSeries =
            [(2021, 800.0), (2022, 900.0), (2023, 1000.0)].into_iter().collect();
        assert_eq!(series, expected);
    }

    #[test]
    fn non_numeric_cell_is_excluded_not_zeroed() {
        let statement = preprocess(&sample_table(), StatementType::ProfitAndLoss);
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "pat");
        assert_eq!(series.get(&2021), Some(&80.0));
        assert_eq!(series.get(&2022), None);
        assert_eq!(series.get(&2023), Some(&120.0));
    }

    #[test]
    fn first_matching_row_wins() {
        let table = RawTable::new(
            vec!["Particulars".into(), "2023".into()],
            vec![
                vec!["Profit before tax".into(), "150".into()],
                vec!["Profit after tax".into(), "120".into()],
            ],
        )
        .unwrap();
        let statement = preprocess(&table, StatementType::ProfitAndLoss);
        // "pat" aliases match "Profit after tax", but "pat" itself is not a
        // substring of either label; "profit after tax" only matches row 2.
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "pat");
        assert_eq!(series.get(&2023), Some(&120.0));

        // A generic alias hits the earlier row and stops there.
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "profit");
        assert_eq!(series.get(&2023), Some(&150.0));
    }

    #[test]
    fn unmatched_metric_is_empty() {
        let statement = preprocess(&sample_table(), StatementType::ProfitAndLoss);
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "total_debt");
        assert!(series.is_empty());
    }

    #[test]
    fn thousands_separators_parse() {
        let table = RawTable::new(
            vec!["Particulars".into(), "2023".into()],
            vec![vec!["Revenue".into(), "1,234.5".into()]],
        )
        .unwrap();
        let statement = preprocess(&table, StatementType::ProfitAndLoss);
        let series = TimeSeriesExtractor::new().extract_metric(&statement, "revenue");
        assert_eq!(series.get(&2023), Some(&1234.5));
    }
}
