//! Property-based tests for writing mode
//!
//! Attempt budgets never grow and never go negative under arbitrary
//! submission sequences, and the overall score stays in range for any grades.

use super::controller::{SectionWritingController, MAX_ATTEMPTS};
use super::score::compute_overall;
use super::*;
use crate::grading::{FeedbackPayload, GradingError};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit(WritingSection, String, bool),
    Draft(WritingSection, String),
    Select(WritingSection),
    RequestExit,
    CancelExit,
}

fn arb_section() -> impl Strategy<Value = WritingSection> {
    prop_oneof![
        Just(WritingSection::Introduction),
        Just(WritingSection::Analysis),
        Just(WritingSection::Conclusion),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        1 => Just("   \n\t".to_string()),
        4 => "[a-z]{1,8}( [a-z]{1,8}){0,10}",
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (arb_section(), arb_text(), any::<bool>()).prop_map(|(s, t, ok)| Op::Submit(s, t, ok)),
        2 => (arb_section(), arb_text()).prop_map(|(s, t)| Op::Draft(s, t)),
        2 => arb_section().prop_map(Op::Select),
        1 => Just(Op::RequestExit),
        1 => Just(Op::CancelExit),
    ]
}

fn arb_policy() -> impl Strategy<Value = AttemptPolicy> {
    prop_oneof![
        Just(AttemptPolicy::ConsumeBeforeGrading),
        Just(AttemptPolicy::ConsumeOnSuccess),
    ]
}

fn payload(grade: f64) -> FeedbackPayload {
    FeedbackPayload {
        grade: Some(grade),
        ..FeedbackPayload::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_attempts_never_increase(
        policy in arb_policy(),
        ops in proptest::collection::vec(arb_op(), 0..40),
    ) {
        let mut controller = SectionWritingController::new(policy);
        let mut before = controller.attempts();

        for op in ops {
            match op {
                Op::Submit(section, text, ok) => {
                    if let Ok(ticket) = controller.begin_submission(section, &text) {
                        let result = if ok {
                            Ok(payload(70.0))
                        } else {
                            Err(GradingError::server_error("boom"))
                        };
                        controller.complete_submission(&ticket, result);
                    }
                }
                Op::Draft(section, text) => {
                    let _ = controller.save_draft(section, &text);
                }
                Op::Select(section) => controller.select_section(section),
                Op::RequestExit => {
                    let _ = controller.request_exit();
                }
                Op::CancelExit => {
                    let _ = controller.cancel_exit();
                }
            }

            let after = controller.attempts();
            for section in WritingSection::ALL {
                let (b, a) = (before[&section].remaining(), after[&section].remaining());
                prop_assert!(a <= b, "{section} went from {b} to {a}");
                prop_assert!(b - a <= 1, "{section} charged twice in one op");
                prop_assert!(a <= MAX_ATTEMPTS);
            }
            before = after;
        }
    }

    #[test]
    fn prop_rejected_submissions_change_nothing(
        section in arb_section(),
        text in "[ \t\n]{0,6}",
    ) {
        let mut controller = SectionWritingController::default();
        let before = controller.attempts();
        prop_assert_eq!(controller.begin_submission(section, &text), Err(SubmitRejection::EmptyText));
        prop_assert_eq!(controller.attempts(), before);
        prop_assert!(controller.record(section).is_none_or(|r| r.essay_text.is_empty()));
    }

    #[test]
    fn prop_overall_score_in_range(
        grades in proptest::collection::vec(proptest::option::of(-50.0f64..200.0), 3),
    ) {
        let payloads: Vec<FeedbackPayload> = grades
            .iter()
            .map(|g| FeedbackPayload { grade: *g, ..FeedbackPayload::default() })
            .collect();
        let overall = compute_overall(WritingSection::ALL.into_iter().zip(payloads.iter()));

        prop_assert!((0.0..=100.0).contains(&overall.score));
        prop_assert!((overall.score * 10.0 - (overall.score * 10.0).round()).abs() < 1e-6);
        prop_assert_eq!(overall.band.is_some(), grades.iter().any(Option::is_some));
        prop_assert_eq!(overall.sections.len(), grades.iter().filter(|g| g.is_some()).count());
    }

    #[test]
    fn prop_single_section_score_is_its_grade(
        section in arb_section(),
        grade in 0.0f64..=100.0,
    ) {
        let p = payload(grade);
        let overall = compute_overall([(section, &p)]);
        prop_assert!((overall.score - (grade * 10.0).round() / 10.0).abs() < 1e-9);
    }
}
