//! Adaptive Card payloads
//!
//! Cards are opaque to the conversation engine; it only forwards the JSON.

use crate::writing::WritingSection;
use serde_json::{json, Value};

const SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";

/// A bare card whose submit buttons post the option text back as the reply
pub fn choice_card(options: &[&str]) -> Value {
    let actions: Vec<Value> = options
        .iter()
        .map(|option| {
            json!({
                "type": "Action.Submit",
                "title": option,
                "data": option,
            })
        })
        .collect();

    json!({
        "type": "AdaptiveCard",
        "$schema": SCHEMA,
        "version": "1.0",
        "body": [],
        "actions": actions,
    })
}

fn key_value(label: &str, value: &str) -> Value {
    json!({
        "type": "ColumnSet",
        "spacing": "Small",
        "columns": [
            {
                "type": "Column",
                "width": "auto",
                "items": [{ "type": "TextBlock", "text": label, "weight": "Bolder", "color": "Accent" }],
            },
            {
                "type": "Column",
                "width": "stretch",
                "items": [{ "type": "TextBlock", "text": value, "color": "Good" }],
            },
        ],
    })
}

/// Line shown for a section in the task card's guideline list
pub fn guideline_line(section: WritingSection) -> &'static str {
    match section {
        WritingSection::Introduction => {
            "• Introduction: Paraphrase the question and provide an overview"
        }
        WritingSection::Analysis => "• Analysis: Describe trends and include specific data",
        WritingSection::Conclusion => "• Conclusion: Summarize main points",
    }
}

/// The IELTS Task 1 exercise brief
pub fn task_card() -> Value {
    let guidelines: Vec<Value> = WritingSection::ALL
        .into_iter()
        .map(|section| {
            json!({
                "type": "TextBlock",
                "text": guideline_line(section),
                "wrap": true,
                "spacing": "Small",
            })
        })
        .collect();

    json!({
        "type": "AdaptiveCard",
        "$schema": SCHEMA,
        "version": "1.3",
        "body": [
            {
                "type": "Container",
                "style": "attention",
                "bleed": true,
                "items": [{
                    "type": "TextBlock",
                    "text": "IELTS Writing Task 1",
                    "size": "Large",
                    "weight": "Bolder",
                    "color": "Light",
                    "horizontalAlignment": "Center",
                }],
            },
            {
                "type": "Container",
                "style": "emphasis",
                "spacing": "Medium",
                "items": [
                    { "type": "TextBlock", "text": "📝 Task Instructions", "weight": "Bolder", "size": "Medium", "color": "Accent" },
                    {
                        "type": "TextBlock",
                        "text": "The graph above shows population growth in different regions. Write a report describing the key features and make comparisons where relevant. You should write at least 150 words.",
                        "wrap": true,
                    },
                ],
            },
            {
                "type": "Container",
                "spacing": "Medium",
                "items": [
                    key_value("⏱️ Time Allowed:", "20 minutes"),
                    key_value("📝 Minimum Words:", "150"),
                ],
            },
            {
                "type": "Container",
                "spacing": "Medium",
                "items": std::iter::once(json!({
                    "type": "TextBlock",
                    "text": "📋 Writing Guidelines",
                    "weight": "Bolder",
                    "color": "Accent",
                }))
                .chain(guidelines)
                .collect::<Vec<_>>(),
            },
        ],
    })
}
