use std::path::{Path, PathBuf};
use std::sync::Arc;

use analysis_core::{
    AnalysisError, AnalysisReport, DocumentProcessor, Embedder, FinancialAnalysis, IndexBuilder,
    IpoDetails, MetricsEngine, ProcessedDocument, Retriever, StageResult, TextGenerator,
};
use business_analysis::BusinessAnalyzer;
use chrono::Utc;
use recommendation_engine::{RecommendationEngine, RecommendationInputs};
use risk_analysis::RiskAnalyzer;
use statement_extraction::StatementExtractor;


const IPO_DETAILS_QUERY: &str =
    "What is the IPO size, fresh issue, offer for sale, and use of proceeds?";

/// Converts a stage outcome into its reportable form. Failures are logged
/// and recorded; the pipeline moves on.
fn guard<T>(result: Result<T, AnalysisError>, stage: &str) -> StageResult<T> {
    match result {
        Ok(value) => StageResult::Completed(value),
        Err(error) => {
            tracing::error!(stage, %error, "Stage failed; continuing");
            StageResult::Failed {
                error: error.to_string(),
            }
        }
    }
}

/// Sequences the full analysis: document processing, index build, business,
/// financial, and risk analysis, IPO-detail extraction, and the final
/// recommendation. The first two stages are fatal on failure since every
/// later stage depends on their output; each later stage is guarded
/// individually and a failure there marks only that stage.
pub struct AnalysisOrchestrator {
    company_name: String,
    output_dir: PathBuf,
    document_processor: Arc<dyn DocumentProcessor>,
    index_builder: Arc<dyn IndexBuilder>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    metrics_engine: Arc<dyn MetricsEngine>,
    statement_extractor: StatementExtractor,
}

impl AnalysisOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        company_name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        document_processor: Arc<dyn DocumentProcessor>,
        index_builder: Arc<dyn IndexBuilder>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
        metrics_engine: Arc<dyn MetricsEngine>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            output_dir: output_dir.into(),
            document_processor,
            index_builder,
            embedder,
            generator,
            metrics_engine,
            statement_extractor: StatementExtractor::new(),
        }
    }

    /// Runs the complete pipeline over one prospectus and persists the
    /// report. Stages run strictly in order, one at a time.
    pub async fn run_complete_analysis(
        &self,
        document_path: &Path,
    ) -> Result<AnalysisReport, AnalysisError> {
        tracing::info!(company = %self.company_name, "Starting complete analysis");

        tracing::info!("Step 1/7: Processing document");
        let document = self
            .document_processor
            .extract_all(document_path)
            .await
            .map_err(|error| {
                tracing::error!(%error, "Document processing failed; aborting");
                error
            })?;

        tracing::info!("Step 2/7: Building vector index");
        let retriever = self.index_builder.build(&document).await.map_err(|error| {
            tracing::error!(%error, "Index build failed; aborting");
            error
        })?;

        tracing::info!("Step 3/7: Analyzing business");
        let business_analyzer = BusinessAnalyzer::new(
            retriever.clone(),
            self.embedder.clone(),
            self.generator.clone(),
        );
        let business = guard(
            business_analyzer.comprehensive_business_analysis().await,
            "business",
        );

        tracing::info!("Step 4/7: Analyzing financials");
        let financials = guard(self.analyze_financials(&document), "financials");

        tracing::info!("Step 5/7: Analyzing risks");
        let risk_analyzer = RiskAnalyzer::new(
            retriever.clone(),
            self.embedder.clone(),
            self.generator.clone(),
        );
        let risks = guard(risk_analyzer.analyze_all_risks().await, "risks");

        tracing::info!("Step 6/7: Extracting IPO details");
        let ipo_details = guard(
            self.extract_ipo_details(retriever.as_ref()).await,
            "ipo_details",
        );

        tracing::info!("Step 7/7: Generating recommendation");
        let inputs = RecommendationInputs {
            business: business.ok().cloned(),
            financial_metrics: financials.ok().map(|f| f.metrics.clone()),
            risks: risks.ok().cloned(),
        };
        let engine = RecommendationEngine::new().with_generator(self.generator.clone());
        let recommendation = guard(
            engine.generate_recommendation(&inputs).await,
            "recommendation",
        );

        let report = AnalysisReport {
            company: self.company_name.clone(),
            generated_at: Utc::now(),
            business,
            financials,
            risks,
            ipo_details,
            recommendation,
        };

        self.save_results(&report)?;
        tracing::info!(company = %self.company_name, "Analysis complete");
        Ok(report)
    }

    /// Deterministic financial stage: statements from the extracted tables,
    /// metric series from the statements, derived metrics from the series.
    /// No language model is involved.
    fn analyze_financials(
        &self,
        document: &ProcessedDocument,
    ) -> Result<FinancialAnalysis, AnalysisError> {
        let statements = self
            .statement_extractor
            .extract_financial_statements(&document.tables);
        let raw_data = self.statement_extractor.build_financial_data(&statements);
        let metrics = self.metrics_engine.calculate_all_metrics(&raw_data)?;

        Ok(FinancialAnalysis {
            raw_data,
            metrics,
            statements,
        })
    }

    /// Pulls issue size, structure, and use of proceeds from the indexed
    /// document via the language-model collaborator.
    async fn extract_ipo_details(
        &self,
        retriever: &dyn Retriever,
    ) -> Result<IpoDetails, AnalysisError> {
        let query_embedding = self.embedder.embed(IPO_DETAILS_QUERY).await?;
        let mut chunks = retriever
            .search(&query_embedding, Some("ipo_details"), 10)
            .await?;
        if chunks.is_empty() {
            chunks = retriever.search(&query_embedding, None, 10).await?;
        }

        let context: Vec<&str> = chunks.iter().take(5).map(|c| c.text.as_str()).collect();
        let prompt = format!(
            "Extract IPO details from this prospectus text:\n\n{}\n\n\
             Provide:\n\
             1. Total issue size\n\
             2. Fresh issue amount\n\
             3. Offer for sale amount\n\
             4. Use of proceeds (breakdown)\n\
             5. Price band (if mentioned)\n\n\
             Format clearly. State if information not available.\n\n\
             IPO Details:",
            context.join("\n\n")
        );

        let response = self
            .generator
            .generate(
                &prompt,
                Some("Extract IPO details from prospectus text."),
                0.1,
                None,
            )
            .await?;

        Ok(IpoDetails {
            extracted_details: response.trim().to_string(),
            num_sources: chunks.len(),
        })
    }

    fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_analysis.json", self.company_name))
    }

    /// Persists the report as `<company>_analysis.json`, written once at the
    /// end of a successful or partially-successful run.
    pub fn save_results(&self, report: &AnalysisReport) -> Result<PathBuf, AnalysisError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.report_path();
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "Results saved");
        Ok(path)
    }

    /// Loads a previously persisted report, if one exists.
    pub fn load_existing_analysis(&self) -> Result<Option<AnalysisReport>, AnalysisError> {
        let path = self.report_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}
