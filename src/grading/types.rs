//! Grading oracle wire types

use crate::writing::WritingSection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Body of `POST /api/submit-writing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub text: String,
    pub task_type: String,
    pub question_number: u32,
    pub section: WritingSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_requirements: Option<String>,
}

/// Scale the oracle reports `grade` on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeScale {
    /// 0-100, the canonical scale
    #[default]
    Percent,
    /// 0-9 IELTS band
    Band,
}

impl GradeScale {
    pub fn to_percent(self, grade: f64) -> f64 {
        match self {
            GradeScale::Percent => grade,
            GradeScale::Band => grade / 9.0 * 100.0,
        }
    }
}

impl FromStr for GradeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "percentage" => Ok(GradeScale::Percent),
            "band" | "ielts" => Ok(GradeScale::Band),
            other => Err(format!("unknown grade scale: {other}")),
        }
    }
}

/// Feedback the improvement summary draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TaskAchievement,
    Grammar,
    Lexical,
    Coherence,
}

/// Criterion feedback: grammar reports one sentence, the others a structured list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionFeedback {
    Summary(String),
    Structured(StructuredFeedback),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredFeedback {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CriterionFeedback {
    /// The single most important thing to work on
    pub fn first_improvement(&self) -> Option<&str> {
        let text = match self {
            CriterionFeedback::Summary(text) => Some(text.as_str()),
            CriterionFeedback::Structured(s) => s.improvements.first().map(String::as_str),
        }?;
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// One criterion's analysis; only `feedback` is interpreted here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<CriterionFeedback>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Oracle response for one graded section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ielts_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_analysis: Option<CriterionAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexical_analysis: Option<CriterionAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_achievement_analysis: Option<CriterionAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence_analysis: Option<CriterionAnalysis>,
}

impl FeedbackPayload {
    pub fn analysis(&self, criterion: Criterion) -> Option<&CriterionAnalysis> {
        match criterion {
            Criterion::TaskAchievement => self.task_achievement_analysis.as_ref(),
            Criterion::Grammar => self.grammar_analysis.as_ref(),
            Criterion::Lexical => self.lexical_analysis.as_ref(),
            Criterion::Coherence => self.coherence_analysis.as_ref(),
        }
    }

    pub fn first_improvement(&self, criterion: Criterion) -> Option<&str> {
        self.analysis(criterion)?
            .feedback
            .as_ref()?
            .first_improvement()
    }

    /// Convert `grade` to the canonical 0-100 scale; non-finite grades are dropped
    pub fn normalized(mut self, scale: GradeScale) -> Self {
        self.grade = self
            .grade
            .filter(|g| g.is_finite())
            .map(|g| scale.to_percent(g));
        self
    }
}
