use std::sync::Arc;

use analysis_core::{
    latest_value, AnalysisError, BusinessAnalysis, DomainScores, FinancialMetrics,
    Recommendation, RiskAssessment, Stance, TextGenerator,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Relative weights of the five domain scores. They sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub business: f64,
    pub financial: f64,
    pub industry: f64,
    pub risk: f64,
    pub valuation: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            business: 0.25,
            financial: 0.30,
            industry: 0.20,
            risk: 0.15,
            valuation: 0.10,
        }
    }
}

/// Overall-score cutoffs for the stance tiers, inclusive on the higher tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StanceThresholds {
    pub conservative: f64,
    pub neutral: f64,
    pub aggressive: f64,
}

impl Default for StanceThresholds {
    fn default() -> Self {
        Self {
            conservative: 75.0,
            neutral: 60.0,
            aggressive: 50.0,
        }
    }
}

/// Inputs assembled from the completed pipeline stages. Any of them may be
/// missing when an earlier stage failed; scoring degrades to documented
/// defaults instead of erroring.
#[derive(Debug, Clone, Default)]
pub struct RecommendationInputs {
    pub business: Option<BusinessAnalysis>,
    pub financial_metrics: Option<FinancialMetrics>,
    pub risks: Option<RiskAssessment>,
}

/// Multi-factor scoring engine producing the final investment
/// recommendation. Works with or without a text-generation collaborator;
/// without one, explanations come from fixed per-stance templates.
pub struct RecommendationEngine {
    generator: Option<Arc<dyn TextGenerator>>,
    weights: ScoringWeights,
    thresholds: StanceThresholds,
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            generator: None,
            weights: ScoringWeights::default(),
            thresholds: StanceThresholds::default(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Scores every domain, derives stance and suitability, and assembles
    /// the final recommendation.
    pub async fn generate_recommendation(
        &self,
        inputs: &RecommendationInputs,
    ) -> Result<Recommendation, AnalysisError> {
        tracing::info!("Generating investment recommendation");

        let scores = self.calculate_scores(inputs);
        let overall_score = self.calculate_overall_score(&scores);
        let stance = self.determine_stance(overall_score);
        let explanation = self
            .generate_explanation(&scores, overall_score, stance, inputs)
            .await?;

        Ok(Recommendation {
            suitability: self.determine_suitability(&scores, overall_score),
            key_strengths: self.extract_key_strengths(&scores),
            key_concerns: self.extract_key_concerns(&scores, inputs),
            scores,
            overall_score,
            stance,
            explanation,
            generated_at: Utc::now(),
        })
    }

    /// The five component scores, each 0-100 with higher meaning better.
    pub fn calculate_scores(&self, inputs: &RecommendationInputs) -> DomainScores {
        let scores = DomainScores {
            business: self.score_business(),
            financial: self.score_financials(inputs.financial_metrics.as_ref()),
            industry: self.score_industry(),
            risk: self.score_risk(inputs.risks.as_ref()),
            valuation: self.score_valuation(),
        };
        tracing::info!(?scores, "Component scores");
        scores
    }

    fn score_business(&self) -> f64 {
        // TODO: grade the business-analysis sections against a structured
        // rubric instead of this flat moderate score.
        70.0
    }

    /// Financial health: base 50 plus additive bonuses from three
    /// independent signal groups, clamped to [0,100]. A missing signal
    /// group leaves the base untouched.
    fn score_financials(&self, metrics: Option<&FinancialMetrics>) -> f64 {
        let mut score = 50.0;
        let Some(metrics) = metrics else {
            return score;
        };

        if let Some(cagr) = metrics
            .growth_metrics
            .get("revenue_cagr_3y")
            .and_then(latest_value)
        {
            if cagr > 20.0 {
                score += 15.0;
            } else if cagr > 10.0 {
                score += 10.0;
            } else if cagr > 5.0 {
                score += 5.0;
            }
        }

        if let Some(margin) = metrics
            .basic_metrics
            .get("ebitda_margin")
            .and_then(latest_value)
        {
            if margin > 20.0 {
                score += 15.0;
            } else if margin > 10.0 {
                score += 10.0;
            } else if margin > 5.0 {
                score += 5.0;
            }
        }

        if let Some(debt_to_equity) = metrics
            .ratios
            .get("debt_to_equity")
            .and_then(latest_value)
        {
            if debt_to_equity < 0.5 {
                score += 10.0;
            } else if debt_to_equity < 1.0 {
                score += 5.0;
            } else if debt_to_equity > 2.0 {
                score -= 10.0;
            }
        }

        score.clamp(0.0, 100.0)
    }

    fn score_industry(&self) -> f64 {
        // Sector attractiveness has no structured input yet; moderate tilt.
        65.0
    }

    /// Risk profile, inverted so that higher means better on every axis.
    /// Without a risk analysis the score sits at the neutral midpoint.
    fn score_risk(&self, risks: Option<&RiskAssessment>) -> f64 {
        match risks {
            Some(assessment) => 100.0 - assessment.risk_score,
            None => 50.0,
        }
    }

    fn score_valuation(&self) -> f64 {
        // Pricing data arrives after the prospectus; moderate default.
        60.0
    }

    /// Weighted sum of the five domain scores, rounded to one decimal.
    pub fn calculate_overall_score(&self, scores: &DomainScores) -> f64 {
        let overall = scores.business * self.weights.business
            + scores.financial * self.weights.financial
            + scores.industry * self.weights.industry
            + scores.risk * self.weights.risk
            + scores.valuation * self.weights.valuation;
        (overall * 10.0).round() / 10.0
    }

    /// Stance tiers checked highest first; boundaries belong to the higher
    /// tier.
    pub fn determine_stance(&self, overall_score: f64) -> Stance {
        if overall_score >= self.thresholds.conservative {
            Stance::ConservativePositive
        } else if overall_score >= self.thresholds.neutral {
            Stance::Neutral
        } else if overall_score >= self.thresholds.aggressive {
            Stance::AggressiveSpeculative
        } else {
            Stance::Avoid
        }
    }

    /// Investor suitability, derived jointly from the overall score and the
    /// risk sub-score — a high overall with a weak risk profile does not
    /// qualify for the conservative label.
    pub fn determine_suitability(&self, scores: &DomainScores, overall_score: f64) -> String {
        if overall_score >= 75.0 && scores.risk >= 70.0 {
            "Conservative investors seeking quality with lower risk"
        } else if overall_score >= 60.0 {
            "Moderate investors comfortable with balanced risk-reward"
        } else if overall_score >= 50.0 {
            "Aggressive investors with high risk tolerance"
        } else {
            "Not suitable for most retail investors"
        }
        .to_string()
    }

    /// Up to four strengths from per-domain threshold checks, with a single
    /// placeholder when nothing qualifies.
    pub fn extract_key_strengths(&self, scores: &DomainScores) -> Vec<String> {
        let mut strengths = Vec::new();

        if scores.financial >= 75.0 {
            strengths.push("Strong financial performance and growth".to_string());
        }
        if scores.business >= 75.0 {
            strengths.push("Robust business model and market position".to_string());
        }
        if scores.risk >= 75.0 {
            strengths.push("Manageable risk profile".to_string());
        }

        if strengths.is_empty() {
            strengths.push("Moderate fundamentals across parameters".to_string());
        }
        strengths.truncate(4);
        strengths
    }

    /// Up to four concerns from per-domain threshold checks plus the risk
    /// narrative, with a single placeholder when nothing qualifies.
    pub fn extract_key_concerns(
        &self,
        scores: &DomainScores,
        inputs: &RecommendationInputs,
    ) -> Vec<String> {
        let mut concerns = Vec::new();

        if scores.financial < 50.0 {
            concerns.push("Weak financial performance or declining trends".to_string());
        }
        if scores.risk < 50.0 {
            concerns.push("Elevated risk factors".to_string());
        }
        if scores.valuation < 40.0 {
            concerns.push("Potentially expensive valuation".to_string());
        }
        if let Some(risks) = &inputs.risks {
            if risks.summary.len() > 50 {
                concerns.push("Multiple material risks identified".to_string());
            }
        }

        if concerns.is_empty() {
            concerns.push("Standard IPO investment risks apply".to_string());
        }
        concerns.truncate(4);
        concerns
    }

    async fn generate_explanation(
        &self,
        scores: &DomainScores,
        overall_score: f64,
        stance: Stance,
        inputs: &RecommendationInputs,
    ) -> Result<String, AnalysisError> {
        let Some(generator) = &self.generator else {
            return Ok(self.template_explanation(scores, overall_score, stance));
        };

        let mut summary_parts = Vec::new();
        if inputs.financial_metrics.is_some() {
            summary_parts.push("Financial metrics provided".to_string());
        }
        if let Some(risks) = &inputs.risks {
            summary_parts.push(format!("{} risks identified", risks.total_risks));
        }
        let inputs_summary = if summary_parts.is_empty() {
            "Analysis available".to_string()
        } else {
            summary_parts.join("; ")
        };

        let prompt = format!(
            "Investment Recommendation Analysis:\n\n\
             Overall Score: {overall_score}/100\n\
             Stance: {}\n\n\
             Component Scores:\n\
             - Business Quality: {}/100\n\
             - Financial Health: {}/100\n\
             - Industry Attractiveness: {}/100\n\
             - Risk Profile: {}/100\n\
             - Valuation: {}/100\n\n\
             Analysis Inputs:\n{inputs_summary}\n\n\
             Based on this analysis, provide a clear investment recommendation explanation that:\n\n\
             1. Explains the overall stance and what it means for investors\n\
             2. Highlights key factors supporting the recommendation\n\
             3. Notes important considerations or concerns\n\
             4. Describes which type of investor this IPO suits\n\n\
             Keep it concise and educational. This is NOT investment advice but analysis.\n\n\
             Explanation:",
            stance.label(),
            scores.business,
            scores.financial,
            scores.industry,
            scores.risk,
            scores.valuation,
        );

        let response = generator
            .generate(
                &prompt,
                Some("You are an investment analyst providing educational analysis. Be balanced and clear."),
                0.2,
                Some(1024),
            )
            .await?;

        Ok(response.trim().to_string())
    }

    /// Deterministic explanation used when no generator is configured.
    fn template_explanation(
        &self,
        scores: &DomainScores,
        overall_score: f64,
        stance: Stance,
    ) -> String {
        let mut explanation = format!(
            "Based on multi-factor analysis, this IPO scores {overall_score}/100, \
             indicating a '{}' outlook.\n\n\
             Scoring Breakdown:\n\
             - Business: {}/100\n\
             - Financials: {}/100\n\
             - Industry: {}/100\n\
             - Risk: {}/100\n\
             - Valuation: {}/100\n\n",
            stance.label(),
            scores.business,
            scores.financial,
            scores.industry,
            scores.risk,
            scores.valuation,
        );

        explanation.push_str(match stance {
            Stance::ConservativePositive => {
                "This IPO shows strong fundamentals across most parameters, suitable for \
                 conservative investors seeking quality."
            }
            Stance::Neutral => {
                "This IPO has a balanced risk-reward profile. Suitable for moderate investors \
                 willing to accept some uncertainty."
            }
            Stance::AggressiveSpeculative => {
                "This IPO carries elevated risks but may offer growth potential. Suitable only \
                 for aggressive investors."
            }
            Stance::Avoid => {
                "This IPO has significant concerns. Investors should carefully evaluate before \
                 participating."
            }
        });

        explanation
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::MetricSeries;
    use std::collections::BTreeMap;

    fn series(entries: &[(i32, f64)]) -> MetricSeries {
        entries.iter().copied().collect()
    }

    fn metrics(cagr: Option<f64>, margin: Option<f64>, de: Option<f64>) -> FinancialMetrics {
        let mut m = FinancialMetrics::default();
        if let Some(c) = cagr {
            m.growth_metrics
                .insert("revenue_cagr_3y".to_string(), series(&[(2023, c)]));
        }
        if let Some(em) = margin {
            m.basic_metrics.insert(
                "ebitda_margin".to_string(),
                series(&[(2021, em - 2.0), (2023, em)]),
            );
        }
        if let Some(d) = de {
            m.ratios
                .insert("debt_to_equity".to_string(), series(&[(2023, d)]));
        }
        m
    }

    fn scores(business: f64, financial: f64, industry: f64, risk: f64, valuation: f64) -> DomainScores {
        DomainScores {
            business,
            financial,
            industry,
            risk,
            valuation,
        }
    }

    #[test]
    fn stance_boundaries() {
        let engine = RecommendationEngine::new();
        assert_eq!(engine.determine_stance(80.0), Stance::ConservativePositive);
        assert_eq!(engine.determine_stance(75.0), Stance::ConservativePositive);
        assert_eq!(engine.determine_stance(65.0), Stance::Neutral);
        assert_eq!(engine.determine_stance(60.0), Stance::Neutral);
        assert_eq!(engine.determine_stance(55.0), Stance::AggressiveSpeculative);
        assert_eq!(engine.determine_stance(50.0), Stance::AggressiveSpeculative);
        assert_eq!(engine.determine_stance(45.0), Stance::Avoid);
    }

    #[test]
    fn financial_score_tiers_add_up() {
        let engine = RecommendationEngine::new();

        // Strong on all three signal groups: 50 + 15 + 15 + 10.
        let strong = metrics(Some(25.0), Some(22.0), Some(0.4));
        assert_eq!(engine.score_financials(Some(&strong)), 90.0);

        // Middling growth and margin, moderate leverage: 50 + 10 + 10 + 5.
        let middling = metrics(Some(15.0), Some(15.0), Some(0.8));
        assert_eq!(engine.score_financials(Some(&middling)), 75.0);

        // Heavy leverage subtracts: 50 - 10.
        let leveraged = metrics(None, None, Some(2.5));
        assert_eq!(engine.score_financials(Some(&leveraged)), 40.0);

        // Missing groups leave the base untouched.
        assert_eq!(engine.score_financials(None), 50.0);
        assert_eq!(engine.score_financials(Some(&FinancialMetrics::default())), 50.0);
    }

    #[test]
    fn latest_year_drives_margin_tier() {
        let engine = RecommendationEngine::new();
        // 2021 margin is 8 but the latest (2023) is 21: bonus is +15.
        let mut m = FinancialMetrics::default();
        m.basic_metrics.insert(
            "ebitda_margin".to_string(),
            series(&[(2021, 8.0), (2023, 21.0)]),
        );
        assert_eq!(engine.score_financials(Some(&m)), 65.0);
    }

    #[test]
    fn risk_score_is_inverted() {
        let engine = RecommendationEngine::new();
        let assessment = RiskAssessment {
            risks: Vec::new(),
            categories: BTreeMap::new(),
            risk_score: 40.0,
            summary: String::new(),
            total_risks: 0,
        };
        assert_eq!(engine.score_risk(Some(&assessment)), 60.0);
        assert_eq!(engine.score_risk(None), 50.0);
    }

    #[test]
    fn overall_score_weights_and_rounds() {
        let engine = RecommendationEngine::new();
        let s = scores(70.0, 66.0, 65.0, 56.0, 60.0);
        // 17.5 + 19.8 + 13 + 8.4 + 6 = 64.7.
        assert_eq!(engine.calculate_overall_score(&s), 64.7);

        // Uniform scores recover themselves regardless of weighting.
        let uniform = scores(80.0, 80.0, 80.0, 80.0, 80.0);
        assert_eq!(engine.calculate_overall_score(&uniform), 80.0);
    }

    #[test]
    fn suitability_requires_low_risk_for_conservative_label() {
        let engine = RecommendationEngine::new();

        let strong = scores(80.0, 80.0, 80.0, 80.0, 80.0);
        assert_eq!(
            engine.determine_suitability(&strong, 80.0),
            "Conservative investors seeking quality with lower risk"
        );

        // Same overall, weak risk profile: drops to the moderate label.
        let risky = scores(90.0, 90.0, 90.0, 40.0, 90.0);
        assert_eq!(
            engine.determine_suitability(&risky, 80.0),
            "Moderate investors comfortable with balanced risk-reward"
        );

        let weak = scores(40.0, 40.0, 40.0, 40.0, 40.0);
        assert_eq!(
            engine.determine_suitability(&weak, 40.0),
            "Not suitable for most retail investors"
        );
    }

    #[test]
    fn strengths_and_concerns_have_defaults_and_caps() {
        let engine = RecommendationEngine::new();

        let neutral = scores(60.0, 60.0, 60.0, 60.0, 60.0);
        assert_eq!(
            engine.extract_key_strengths(&neutral),
            vec!["Moderate fundamentals across parameters"]
        );
        assert_eq!(
            engine.extract_key_concerns(&neutral, &RecommendationInputs::default()),
            vec!["Standard IPO investment risks apply"]
        );

        let strong = scores(80.0, 80.0, 60.0, 80.0, 60.0);
        let strengths = engine.extract_key_strengths(&strong);
        assert_eq!(strengths.len(), 3);
        assert_eq!(strengths[0], "Strong financial performance and growth");

        let weak = scores(40.0, 40.0, 60.0, 40.0, 30.0);
        let long_summary = "x".repeat(60);
        let inputs = RecommendationInputs {
            risks: Some(RiskAssessment {
                risks: Vec::new(),
                categories: BTreeMap::new(),
                risk_score: 60.0,
                summary: long_summary,
                total_risks: 12,
            }),
            ..Default::default()
        };
        let concerns = engine.extract_key_concerns(&weak, &inputs);
        assert_eq!(concerns.len(), 4);
        assert_eq!(concerns[3], "Multiple material risks identified");
    }

    #[tokio::test]
    async fn recommendation_works_without_generator() {
        let engine = RecommendationEngine::new();
        let inputs = RecommendationInputs {
            financial_metrics: Some(metrics(Some(15.0), Some(20.0), Some(0.6))),
            risks: Some(RiskAssessment {
                risks: Vec::new(),
                categories: BTreeMap::new(),
                risk_score: 44.0,
                summary: "short".to_string(),
                total_risks: 15,
            }),
            ..Default::default()
        };

        let recommendation = engine.generate_recommendation(&inputs).await.unwrap();

        // financial: 50 + 10 + 10 + 5 = 75; risk: 100 - 44 = 56.
        assert_eq!(recommendation.scores.financial, 75.0);
        assert_eq!(recommendation.scores.risk, 56.0);
        // 70*.25 + 75*.30 + 65*.20 + 56*.15 + 60*.10 = 67.4.
        assert_eq!(recommendation.overall_score, 67.4);
        assert_eq!(recommendation.stance, Stance::Neutral);
        assert!(recommendation
            .explanation
            .contains("balanced risk-reward profile"));
        assert_eq!(
            recommendation.suitability,
            "Moderate investors comfortable with balanced risk-reward"
        );
    }
}
