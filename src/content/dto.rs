use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /content/generate`. Required fields are optional here so a
/// missing one is reported next to every other bad field instead of as a
/// single deserialisation failure.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub tone: Option<String>,
    pub word_count: Option<i64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub preferred_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub content_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub content: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_length")]
    pub length: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    pub preferred_model: Option<String>,
}

fn default_style() -> String {
    "casual".into()
}
fn default_length() -> String {
    "medium".into()
}
fn default_audience() -> String {
    "general".into()
}

#[derive(Debug, Serialize)]
pub struct RefineResponse {
    pub refined_content: String,
    pub changes_made: Vec<String>,
    /// Flesch reading ease of `refined_content`.
    pub readability_score: f64,
    pub word_count: i32,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct SeoRequest {
    pub content: String,
    pub keywords: Vec<String>,
    pub target_url: Option<String>,
    pub preferred_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordDensity {
    pub count: usize,
    /// Occurrences per hundred words, two decimals.
    pub density: f64,
    pub optimal: bool,
}

#[derive(Debug, Serialize)]
pub struct SeoResponse {
    pub optimized_content: String,
    pub keyword_density: BTreeMap<String, KeywordDensity>,
    /// 0-100, computed on `optimized_content`.
    pub seo_score: f64,
    pub suggestions: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct PlagiarismRequest {
    pub content: String,
    #[serde(default = "default_true")]
    pub check_facts: bool,
    pub preferred_model: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub claim: String,
    pub verdict: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlagiarismResponse {
    pub plagiarism_score: f64,
    pub originality_score: f64,
    pub fact_check_results: Vec<FactCheck>,
    pub recommendations: Vec<String>,
    pub provider: String,
    pub model: String,
}
