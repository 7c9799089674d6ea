use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassLabel {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RankedClass {
    pub code: String,
    pub name: String,
    pub probability: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub top_results: Vec<RankedClass>,
    pub condition: String,
    pub probability_raw: f32,
    pub message: String,
}

impl PredictionResponse {
    /// Builds the success payload; `None` when the ranking is empty.
    pub fn from_ranking(top_results: Vec<RankedClass>) -> Option<Self> {
        let top = top_results.first()?.clone();
        Some(Self {
            success: true,
            top_results,
            condition: top.name,
            probability_raw: top.probability,
            message: "Analysis complete.".to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub classes: usize,
    pub message: String,
}
