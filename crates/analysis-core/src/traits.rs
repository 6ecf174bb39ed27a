use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::{
    AnalysisError, FinancialMetrics, MetricSeries, ProcessedDocument, RetrievedChunk,
};

/// Extracts text and tables from a prospectus document.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn extract_all(&self, path: &Path) -> Result<ProcessedDocument, AnalysisError>;
}

/// Builds a similarity index over a processed document and hands back the
/// retriever serving it.
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(
        &self,
        document: &ProcessedDocument,
    ) -> Result<Arc<dyn Retriever>, AnalysisError>;
}

/// Nearest-neighbor search over indexed chunks.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        query_embedding: &[f32],
        section_filter: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AnalysisError>;
}

/// Sentence embedding computation. Vectors are opaque to the analysis
/// engines; they only flow into `Retriever::search`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AnalysisError>;
}

/// Language-model text generation. Output is untrusted free text; callers
/// parse it structurally and never retry or validate beyond that.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, AnalysisError>;
}

/// Deterministic derived-metric computation over extracted series. No
/// language model is involved anywhere behind this seam.
pub trait MetricsEngine: Send + Sync {
    fn calculate_all_metrics(
        &self,
        financial_data: &BTreeMap<String, MetricSeries>,
    ) -> Result<FinancialMetrics, AnalysisError>;
}
