use std::collections::HashSet;
use std::sync::Arc;

use analysis_core::{
    AnalysisError, BusinessAnalysis, Embedder, RetrievedChunk, Retriever, SectionAnalysis,
    TextGenerator,
};

/// Drops repeated chunks, keeping the first occurrence of each id. Order is
/// otherwise preserved.
pub fn dedup_chunks(chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.global_chunk_id))
        .collect()
}

fn build_context(chunks: &[RetrievedChunk], cap: usize) -> String {
    chunks
        .iter()
        .take(cap)
        .enumerate()
        .map(|(i, chunk)| format!("[Excerpt {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Qualitative analysis of the issuer: business model, market position,
/// operations, and customer base, each grounded in retrieved prospectus
/// excerpts and written up by the language-model collaborator.
pub struct BusinessAnalyzer {
    retriever: Arc<dyn Retriever>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
}

impl BusinessAnalyzer {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            retriever,
            embedder,
            generator,
        }
    }

    async fn retrieve_unique(
        &self,
        queries: &[&str],
        section: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, AnalysisError> {
        let mut chunks = Vec::new();
        for query in queries {
            let embedding = self.embedder.embed(query).await?;
            chunks.extend(self.retriever.search(&embedding, section, top_k).await?);
        }
        Ok(dedup_chunks(chunks))
    }

    /// How the company makes money, per the prospectus.
    pub async fn analyze_business_model(
        &self,
        top_k: usize,
    ) -> Result<SectionAnalysis, AnalysisError> {
        tracing::info!("Analyzing business model");
        let queries = [
            "What is the company's business model and how does it generate revenue?",
            "What products or services does the company offer?",
            "What is the company's value proposition?",
        ];
        let chunks = self.retrieve_unique(&queries, Some("business"), top_k).await?;

        let prompt = format!(
            "Based on the following excerpts from an IPO prospectus, analyze the company's business model.\n\n\
             Context:\n{}\n\n\
             Provide a structured analysis covering:\n\
             1. Core Business Model (how the company makes money)\n\
             2. Key Products/Services\n\
             3. Value Proposition\n\
             4. Revenue Streams\n\n\
             CRITICAL: Base your analysis ONLY on the provided context. Do not make up information.\n\
             If certain details are not available, state that clearly.\n\n\
             Analysis:",
            build_context(&chunks, 15)
        );
        let system_prompt = "You are a business analyst specializing in IPO prospectus analysis.\n\
             Your role is to extract and synthesize information about business models.\n\
             NEVER invent facts or numbers. Only use information from the provided context.";

        let analysis = self
            .generator
            .generate(&prompt, Some(system_prompt), 0.1, Some(1024))
            .await?;

        Ok(SectionAnalysis {
            analysis: analysis.trim().to_string(),
            num_sources: chunks.len(),
            confidence: Some(if chunks.len() >= 5 { "high" } else { "medium" }.to_string()),
        })
    }

    /// Market position, competitors, and competitive advantages.
    pub async fn analyze_market_position(
        &self,
        top_k: usize,
    ) -> Result<SectionAnalysis, AnalysisError> {
        tracing::info!("Analyzing market position");
        let queries = [
            "What is the company's market position and market share?",
            "Who are the main competitors?",
            "What are the competitive advantages?",
        ];
        let chunks = self.retrieve_unique(&queries, Some("business"), top_k).await?;

        let prompt = format!(
            "Analyze the company's market position based on this prospectus information:\n\n{}\n\n\
             Cover:\n\
             1. Market Position & Share\n\
             2. Competitive Landscape\n\
             3. Key Competitors (if mentioned)\n\
             4. Competitive Advantages\n\
             5. Market Trends\n\n\
             Only use information from the context. State if information is unavailable.\n\n\
             Analysis:",
            build_context(&chunks, 15)
        );

        let analysis = self
            .generator
            .generate(
                &prompt,
                Some("You are a market analyst. Extract facts from context only."),
                0.1,
                None,
            )
            .await?;

        Ok(SectionAnalysis {
            analysis: analysis.trim().to_string(),
            num_sources: chunks.len(),
            confidence: None,
        })
    }

    /// Capacity, supply chain, and other operational dependencies.
    pub async fn analyze_operations(
        &self,
        top_k: usize,
    ) -> Result<SectionAnalysis, AnalysisError> {
        tracing::info!("Analyzing operations");
        let queries = [
            "What is the manufacturing capacity and utilization?",
            "What is the supply chain structure?",
            "What are the operational dependencies?",
        ];
        let chunks = self.retrieve_unique(&queries, Some("business"), top_k).await?;

        let prompt = format!(
            "Analyze operational aspects from this prospectus:\n\n{}\n\n\
             Focus on:\n\
             1. Manufacturing/Operations Capacity\n\
             2. Capacity Utilization\n\
             3. Supply Chain Dependencies\n\
             4. Key Operational Risks\n\
             5. Expansion Plans\n\n\
             Base analysis strictly on provided context.\n\n\
             Analysis:",
            build_context(&chunks, 15)
        );

        let analysis = self.generator.generate(&prompt, None, 0.1, None).await?;

        Ok(SectionAnalysis {
            analysis: analysis.trim().to_string(),
            num_sources: chunks.len(),
            confidence: None,
        })
    }

    /// Customer base and concentration. Searches the whole index since
    /// customer disclosures appear outside the business section too.
    pub async fn analyze_customers(&self, top_k: usize) -> Result<SectionAnalysis, AnalysisError> {
        tracing::info!("Analyzing customer base");
        let queries = [
            "Who are the major customers?",
            "What is the customer concentration?",
            "Is there customer dependency risk?",
        ];
        let chunks = self.retrieve_unique(&queries, None, top_k).await?;

        let prompt = format!(
            "Analyze the customer base from prospectus:\n\n{}\n\n\
             Address:\n\
             1. Major Customers (if disclosed)\n\
             2. Customer Concentration Risk\n\
             3. Geographic Distribution\n\
             4. Customer Dependencies\n\n\
             Extract only what is stated in the context.\n\n\
             Analysis:",
            build_context(&chunks, 10)
        );

        let analysis = self.generator.generate(&prompt, None, 0.1, None).await?;

        Ok(SectionAnalysis {
            analysis: analysis.trim().to_string(),
            num_sources: chunks.len(),
            confidence: None,
        })
    }

    /// Runs all four sub-analyses and distills an executive summary.
    pub async fn comprehensive_business_analysis(
        &self,
    ) -> Result<BusinessAnalysis, AnalysisError> {
        tracing::info!("Running comprehensive business analysis");

        let business_model = self.analyze_business_model(10).await?;
        let market_position = self.analyze_market_position(10).await?;
        let operations = self.analyze_operations(10).await?;
        let customers = self.analyze_customers(10).await?;

        let prompt = format!(
            "Combine the following analyses of an IPO issuer into a brief executive summary:\n\n\
             Business Model:\n{}\n\n\
             Market Position:\n{}\n\n\
             Operations:\n{}\n\n\
             Customers:\n{}\n\n\
             Summary:",
            business_model.analysis, market_position.analysis, operations.analysis,
            customers.analysis
        );
        let summary = self
            .generator
            .generate(
                &prompt,
                Some("Summarize business analyses clearly and objectively."),
                0.2,
                Some(512),
            )
            .await?;

        Ok(BusinessAnalysis {
            business_model,
            market_position,
            operations,
            customers,
            summary: summary.trim().to_string(),
        })
    }
}
