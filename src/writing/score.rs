//! Weighted overall score and the exit feedback summary

use super::WritingSection;
use crate::grading::{Criterion, FeedbackPayload};
use serde::Serialize;
use std::collections::BTreeMap;

pub const MAX_SCORE: f64 = 100.0;

/// Categories the summary draws improvements from, one each at most
const IMPROVEMENT_CRITERIA: [Criterion; 3] = [
    Criterion::TaskAchievement,
    Criterion::Grammar,
    Criterion::Coherence,
];

const NOTHING_GRADED: &str =
    "No sections have been graded yet. Submit a section to receive feedback.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Basic,
    NeedsWork,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 85.0 {
            ScoreBand::Excellent
        } else if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 55.0 {
            ScoreBand::Basic
        } else {
            ScoreBand::NeedsWork
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ScoreBand::Excellent => {
                "Excellent work, your essay demonstrates a strong command of English writing skills."
            }
            ScoreBand::Good => {
                "Good job, your essay shows competent English writing skills with some areas for improvement."
            }
            ScoreBand::Basic => {
                "You've shown basic competency in your writing. With some focused practice, you can improve significantly."
            }
            ScoreBand::NeedsWork => {
                "You've made a good start. Let's work on developing your writing skills further."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallScore {
    /// 0-100, one decimal
    pub score: f64,
    /// `None` when nothing was graded
    pub band: Option<ScoreBand>,
    pub feedback_text: String,
    /// Clamped grade of every graded section
    pub sections: BTreeMap<WritingSection, f64>,
}

/// Combine per-section grades into one score.
///
/// Pure: weights are renormalized over the sections that carry a grade, the
/// result is clamped to 0-100 and rounded to one decimal. The band is picked
/// before rounding.
pub fn compute_overall<'a, I>(graded: I) -> OverallScore
where
    I: IntoIterator<Item = (WritingSection, &'a FeedbackPayload)>,
{
    let mut present: BTreeMap<WritingSection, &FeedbackPayload> = BTreeMap::new();
    for (section, payload) in graded {
        if payload.grade.is_some_and(f64::is_finite) {
            present.insert(section, payload);
        }
    }

    let sections: BTreeMap<WritingSection, f64> = present
        .iter()
        .filter_map(|(section, payload)| Some((*section, clamp(payload.grade?))))
        .collect();

    if sections.is_empty() {
        return OverallScore {
            score: 0.0,
            band: None,
            feedback_text: NOTHING_GRADED.to_string(),
            sections,
        };
    }

    let (weighted, total_weight) = sections
        .iter()
        .fold((0.0, 0.0), |(sum, weight), (section, grade)| {
            (sum + grade * section.weight(), weight + section.weight())
        });
    // Band from the exact score; 84.96 reports 85.0 but stays Good
    let exact = clamp(weighted / total_weight);
    let band = ScoreBand::for_score(exact);
    let score = round_one(exact);

    let improvements = key_improvements(present.values().copied());
    let feedback_text = if improvements.is_empty() {
        band.message().to_string()
    } else {
        format!(
            "{} Key areas to focus on: {}.",
            band.message(),
            improvements.join("; ")
        )
    };

    OverallScore {
        score,
        band: Some(band),
        feedback_text,
        sections,
    }
}

/// At most one improvement per category, taken in section order
fn key_improvements<'a>(payloads: impl Iterator<Item = &'a FeedbackPayload>) -> Vec<String> {
    let mut used = Vec::with_capacity(IMPROVEMENT_CRITERIA.len());
    let mut picked = Vec::with_capacity(IMPROVEMENT_CRITERIA.len());
    for payload in payloads {
        for criterion in IMPROVEMENT_CRITERIA {
            if used.contains(&criterion) {
                continue;
            }
            if let Some(text) = payload.first_improvement(criterion) {
                used.push(criterion);
                picked.push(text.trim_end_matches('.').to_string());
            }
        }
    }
    picked
}

fn clamp(grade: f64) -> f64 {
    grade.clamp(0.0, MAX_SCORE)
}

fn round_one(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}
