use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::AnalysisError;

/// Year-indexed values for one financial line item.
pub type MetricSeries = BTreeMap<i32, f64>;

/// Latest-year value of a series (the maximum year key), if any.
pub fn latest_value(series: &MetricSeries) -> Option<f64> {
    series.values().next_back().copied()
}

/// Raw two-dimensional grid handed over by the document-processing
/// collaborator. The first column holds row labels; the remaining columns
/// hold period values as unparsed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table, rejecting grids that cannot carry a label column plus
    /// at least one value column.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, AnalysisError> {
        if headers.len() < 2 {
            return Err(AnalysisError::InvalidData(format!(
                "table needs a label column and at least one value column, got {} column(s)",
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Values of the label column, top to bottom.
    pub fn label_column(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(|row| row.first().map(String::as_str))
    }
}

/// Semantic type of a financial-statement table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementType {
    #[serde(rename = "profit_loss")]
    ProfitAndLoss,
    #[serde(rename = "balance_sheet")]
    BalanceSheet,
    #[serde(rename = "cash_flow")]
    CashFlow,
    #[serde(rename = "unknown")]
    Unknown,
}

/// One label row of a preprocessed statement; `values` is aligned with the
/// statement's `years`. Missing means the cell was absent or non-numeric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// A financial table after typing and preprocessing: only the label column
/// and year-keyed numeric columns survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub statement_type: StatementType,
    pub years: Vec<i32>,
    pub rows: Vec<StatementRow>,
}

impl Statement {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.years.is_empty()
    }
}

/// The up-to-three statements recognized in one document. Only the first
/// table classified into each slot is kept; later same-type tables are
/// dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub profit_loss: Option<Statement>,
    pub balance_sheet: Option<Statement>,
    pub cash_flow: Option<Statement>,
}

/// Ordinal risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Aggregation weight: High 3, Medium 2, Low 1.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::High => 3.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Closed set of risk categories. Declaration order doubles as the
/// classifier's tie-break order and must stay fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Business,
    Financial,
    Operational,
    Regulatory,
    Legal,
    Market,
    Promoter,
    CustomerConcentration,
    Other,
}

impl RiskCategory {
    /// Every category, in declaration order, the fallback last.
    pub const ALL: [RiskCategory; 9] = [
        RiskCategory::Business,
        RiskCategory::Financial,
        RiskCategory::Operational,
        RiskCategory::Regulatory,
        RiskCategory::Legal,
        RiskCategory::Market,
        RiskCategory::Promoter,
        RiskCategory::CustomerConcentration,
        RiskCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Business => "business",
            RiskCategory::Financial => "financial",
            RiskCategory::Operational => "operational",
            RiskCategory::Regulatory => "regulatory",
            RiskCategory::Legal => "legal",
            RiskCategory::Market => "market",
            RiskCategory::Promoter => "promoter",
            RiskCategory::CustomerConcentration => "customer_concentration",
            RiskCategory::Other => "other",
        }
    }
}

/// One risk item parsed out of generated free text. Created with category
/// and severity unset; the classifier and severity scorer fill them in on
/// the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<RiskCategory>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl RiskRecord {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category: None,
            severity: None,
        }
    }

    /// Lowercased title + description, the haystack for keyword scans.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}

/// Severity tallies within one category.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Per-category rollup for reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub severity_breakdown: SeverityBreakdown,
}

/// Output of the risk-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risks: Vec<RiskRecord>,
    pub categories: BTreeMap<RiskCategory, CategorySummary>,
    /// 0-100; higher means more risk.
    pub risk_score: f64,
    pub summary: String,
    pub total_risks: usize,
}

/// The five independently computed [0,100] inputs to the overall
/// recommendation. Higher is better on every axis, including risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScores {
    pub business: f64,
    pub financial: f64,
    pub industry: f64,
    pub risk: f64,
    pub valuation: f64,
}

/// Discrete investment posture derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    #[serde(rename = "Conservative - Positive")]
    ConservativePositive,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Aggressive - Speculative")]
    AggressiveSpeculative,
    #[serde(rename = "Avoid")]
    Avoid,
}

impl Stance {
    pub fn label(&self) -> &'static str {
        match self {
            Stance::ConservativePositive => "Conservative - Positive",
            Stance::Neutral => "Neutral",
            Stance::AggressiveSpeculative => "Aggressive - Speculative",
            Stance::Avoid => "Avoid",
        }
    }
}

/// Final recommendation artifact. Read-only once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub scores: DomainScores,
    pub overall_score: f64,
    pub stance: Stance,
    pub suitability: String,
    pub key_strengths: Vec<String>,
    pub key_concerns: Vec<String>,
    pub explanation: String,
    pub generated_at: DateTime<Utc>,
}

/// One similarity-search hit from the retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    #[serde(default)]
    pub section_type: Option<String>,
    pub global_chunk_id: i64,
    #[serde(default)]
    pub similarity_score: Option<f32>,
}

/// Extracted document content from the processing collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub text: Vec<String>,
    pub tables: Vec<RawTable>,
}

/// Derived metric groups returned by the external metrics engine. Scalar
/// figures (e.g. a 3-year CAGR) are single-entry series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub basic_metrics: BTreeMap<String, MetricSeries>,
    pub growth_metrics: BTreeMap<String, MetricSeries>,
    pub ratios: BTreeMap<String, MetricSeries>,
}

/// Output of the financial-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialAnalysis {
    pub raw_data: BTreeMap<String, MetricSeries>,
    pub metrics: FinancialMetrics,
    pub statements: FinancialStatements,
}

/// One generated sub-analysis plus its evidence count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionAnalysis {
    pub analysis: String,
    pub num_sources: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// Output of the business-analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessAnalysis {
    pub business_model: SectionAnalysis,
    pub market_position: SectionAnalysis,
    pub operations: SectionAnalysis,
    pub customers: SectionAnalysis,
    pub summary: String,
}

/// Output of the IPO-detail extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpoDetails {
    pub extracted_details: String,
    pub num_sources: usize,
}

/// Outcome of one guarded pipeline stage. Serialized untagged so a failed
/// stage appears as `{"error": "..."}` in the persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageResult<T> {
    Completed(T),
    Failed { error: String },
}

impl<T> StageResult<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            StageResult::Completed(value) => Some(value),
            StageResult::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageResult::Failed { .. })
    }
}

/// Complete per-company analysis artifact, persisted once per run. Failed
/// stages are explicitly marked, never silently omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub company: String,
    pub generated_at: DateTime<Utc>,
    pub business: StageResult<BusinessAnalysis>,
    pub financials: StageResult<FinancialAnalysis>,
    pub risks: StageResult<RiskAssessment>,
    pub ipo_details: StageResult<IpoDetails>,
    pub recommendation: StageResult<Recommendation>,
}
