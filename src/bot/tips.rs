//! Writing tips

use super::{cards, WRITING_TIPS};
use crate::dialog::{DialogDefinition, StepResult};
use crate::writing::WritingSection;
use serde_json::Value;

pub(super) fn writing_tips_dialog() -> DialogDefinition {
    DialogDefinition::new(WRITING_TIPS).step("tips", |ctx, _| {
        let lines: Vec<&str> = WritingSection::ALL
            .into_iter()
            .map(cards::guideline_line)
            .collect();
        ctx.send(format!("📋 Writing Guidelines\n{}", lines.join("\n")));
        for section in WritingSection::ALL {
            ctx.send(section.guidance());
        }
        StepResult::End(Value::Null)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::TestFlow;

    #[test]
    fn test_tips_sent_then_dialog_ends() {
        let mut flow = TestFlow::new(crate::bot::registry().unwrap(), WRITING_TIPS);
        flow.send("start")
            .assert_reply_contains("• Analysis: Describe trends and include specific data")
            .assert_reply(WritingSection::Introduction.guidance())
            .assert_reply(WritingSection::Analysis.guidance())
            .assert_reply(WritingSection::Conclusion.guidance())
            .assert_no_reply();
        assert!(flow.state().is_idle());
    }
}
