use std::sync::Arc;

use analysis_core::{
    AnalysisError, Embedder, Retriever, RiskAssessment, RiskCategory, RiskRecord, Severity,
    TextGenerator,
};

use crate::{parse_risk_items, RiskClassifier, RiskSeverityScorer};

const RISK_QUERY: &str = "What are all the risk factors mentioned in the prospectus?";

/// End-to-end risk stage: retrieval, list generation, classification,
/// severity tiers, aggregate score, and an executive summary.
pub struct RiskAnalyzer {
    retriever: Arc<dyn Retriever>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    classifier: RiskClassifier,
    scorer: RiskSeverityScorer,
}

impl RiskAnalyzer {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            retriever,
            embedder,
            generator,
            classifier: RiskClassifier::new(),
            scorer: RiskSeverityScorer::new(),
        }
    }

    /// Runs the complete risk analysis over the indexed document.
    pub async fn analyze_all_risks(&self) -> Result<RiskAssessment, AnalysisError> {
        tracing::info!("Analyzing all risk factors");

        let mut risks = self.extract_risk_factors(20).await?;

        for risk in risks.iter_mut() {
            self.classifier.classify(risk);
            self.scorer.assess(risk);
        }

        let risk_score = self.scorer.aggregate_score(&risks);
        let categories = self.scorer.breakdown_by_category(&risks);
        let summary = self.generate_risk_summary(&risks).await?;
        tracing::info!(total = risks.len(), risk_score, "Risk analysis finished");

        Ok(RiskAssessment {
            total_risks: risks.len(),
            risks,
            categories,
            risk_score,
            summary,
        })
    }

    /// Retrieves risk-section chunks and parses the generated numbered list
    /// into discrete records. Falls back to an unfiltered search when the
    /// risk section yields nothing.
    pub async fn extract_risk_factors(
        &self,
        top_k: usize,
    ) -> Result<Vec<RiskRecord>, AnalysisError> {
        let query_embedding = self.embedder.embed(RISK_QUERY).await?;
        let mut chunks = self
            .retriever
            .search(&query_embedding, Some("risks"), top_k)
            .await?;
        if chunks.is_empty() {
            chunks = self.retriever.search(&query_embedding, None, top_k).await?;
        }

        let context: Vec<&str> = chunks.iter().take(10).map(|c| c.text.as_str()).collect();
        let prompt = format!(
            "From the following risk factors section of an IPO prospectus, extract individual risks.\n\n\
             Risk Factors Text:\n{}\n\n\
             For each risk, provide:\n\
             1. Risk title (brief)\n\
             2. Risk description (one sentence)\n\n\
             Format your response as a numbered list.\n\n\
             Extracted Risks:",
            context.join("\n\n")
        );

        let response = self
            .generator
            .generate(
                &prompt,
                Some("Extract risks from prospectus. Be factual and concise."),
                0.1,
                Some(2048),
            )
            .await?;

        Ok(parse_risk_items(&response))
    }

    /// Executive summary over the highest-severity risks: up to two High
    /// risks per category, at most ten overall. Without any High risk the
    /// summary is a fixed all-clear line and no generation happens.
    async fn generate_risk_summary(&self, risks: &[RiskRecord]) -> Result<String, AnalysisError> {
        let mut key_risks: Vec<&RiskRecord> = Vec::new();
        for category in RiskCategory::ALL {
            key_risks.extend(
                risks
                    .iter()
                    .filter(|r| {
                        r.category == Some(category) && r.severity == Some(Severity::High)
                    })
                    .take(2),
            );
        }

        if key_risks.is_empty() {
            return Ok("No major risks identified in prospectus.".to_string());
        }

        let risk_list = key_risks
            .iter()
            .take(10)
            .map(|r| {
                format!(
                    "- {}: {} [Category: {}, Severity: {}]",
                    r.title,
                    r.description,
                    r.category.unwrap_or(RiskCategory::Other).as_str(),
                    r.severity.map_or("Low", |s| s.label()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Summarize the key risks for this IPO based on the following risk factors:\n\n{risk_list}\n\n\
             Provide a concise executive summary of the major risks an investor should be aware of.\n\
             Focus on the most material risks.\n\n\
             Summary:"
        );

        let response = self
            .generator
            .generate(
                &prompt,
                Some("Summarize IPO risks clearly and objectively."),
                0.2,
                Some(512),
            )
            .await?;

        Ok(response.trim().to_string())
    }
}
