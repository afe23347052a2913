//! Field mapping for the external planner.
//!
//! The web client speaks camelCase field names; the planner expects its own
//! snake_case vocabulary. The mapping is fixed and must be exact.

use serde::{Deserialize, Serialize};

/// Plan request as received from the web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Survey topic.
    pub topic: String,
    /// Target respondent persona.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Questionnaire draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<String>,
    /// Requested report dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dimensions: Option<String>,
    /// Background knowledge supplied by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_knowledge: Option<String>,
}

/// Plan request as sent to `{BACKEND_ENDPOINT}/report/plan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpstreamRequest {
    /// Mapped from `topic`.
    pub topic_and_objective: String,
    /// Mapped from `persona`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_population: Option<String>,
    /// Mapped from `questions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<String>,
    /// Mapped from `reportDimensions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dimensions: Option<String>,
    /// Mapped from `basicKnowledge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_info: Option<String>,
}

impl From<PlanRequest> for PlanUpstreamRequest {
    fn from(req: PlanRequest) -> Self {
        Self {
            topic_and_objective: req.topic,
            target_population: req.persona,
            questionnaire: req.questions,
            report_dimensions: req.report_dimensions,
            background_info: req.basic_knowledge,
        }
    }
}
