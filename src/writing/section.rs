//! The three graded sections of a writing exercise

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingSection {
    Introduction,
    Analysis,
    Conclusion,
}

impl WritingSection {
    /// Fixed section order
    pub const ALL: [WritingSection; 3] = [
        WritingSection::Introduction,
        WritingSection::Analysis,
        WritingSection::Conclusion,
    ];

    /// Wire and storage key
    pub fn key(self) -> &'static str {
        match self {
            WritingSection::Introduction => "introduction",
            WritingSection::Analysis => "analysis",
            WritingSection::Conclusion => "conclusion",
        }
    }

    /// User-facing name
    pub fn label(self) -> &'static str {
        match self {
            WritingSection::Introduction => "Introduction",
            WritingSection::Analysis => "Analysis",
            WritingSection::Conclusion => "Conclusion",
        }
    }

    /// Share of the overall score
    pub fn weight(self) -> f64 {
        match self {
            WritingSection::Introduction | WritingSection::Conclusion => 0.2,
            WritingSection::Analysis => 0.6,
        }
    }

    fn index(self) -> usize {
        match self {
            WritingSection::Introduction => 0,
            WritingSection::Analysis => 1,
            WritingSection::Conclusion => 2,
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// What the bot tells the user before asking for the section
    pub fn guidance(self) -> &'static str {
        match self {
            WritingSection::Introduction => {
                "In your introduction, you should:\n- Paraphrase the question\n- Give an overview of what the graph shows"
            }
            WritingSection::Analysis => {
                "In your analysis, you should:\n- Describe the main trends\n- Include specific data points\n- Make relevant comparisons"
            }
            WritingSection::Conclusion => {
                "In your conclusion, you should:\n- Summarize the main points\n- Do not introduce new information"
            }
        }
    }

    /// Checklist shown next to the editor
    pub fn guidelines(self) -> &'static [&'static str] {
        match self {
            WritingSection::Introduction => &[
                "Paraphrase the main question",
                "Provide an overview of the graph",
                "Use appropriate academic language",
            ],
            WritingSection::Analysis => &[
                "Describe trends and patterns",
                "Include specific data from the graph",
                "Compare different regions where relevant",
                "Use a range of language to describe changes",
            ],
            WritingSection::Conclusion => &[
                "Summarize main points",
                "Avoid introducing new information",
                "End with a concise final statement",
            ],
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            WritingSection::Introduction => "Start writing your introduction here...",
            WritingSection::Analysis => {
                "Describe the key features of the data, making relevant comparisons..."
            }
            WritingSection::Conclusion => {
                "Summarize the main patterns and significant features observed..."
            }
        }
    }

    /// The prompt that opens the writing editor for this section
    pub fn writing_prompt(self) -> String {
        format!("Please write your {}:", self.label())
    }
}

impl fmt::Display for WritingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown section: {0}")]
pub struct UnknownSection(pub String);

impl FromStr for WritingSection {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|section| section.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}
