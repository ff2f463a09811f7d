use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use dazi::session::{CharStatus, Session, Transition};
use dazi::timer::ManualClock;

#[derive(Debug, Clone, Copy)]
enum Op {
    Submit(char),
    Delete,
    Tick(u64),
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => prop::sample::select(vec!['a', 'b', 'c', '好', '\n', ' ']).prop_map(Op::Submit),
        2 => Just(Op::Delete),
        2 => (0u64..5_000).prop_map(Op::Tick),
        1 => Just(Op::Restart),
    ]
}

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c', '好', '\n', ' ']), 0..12)
        .prop_map(|chars| chars.into_iter().collect())
}

fn check_invariants(session: &Session) -> Result<(), TestCaseError> {
    let chars = session.characters();
    let cursor = session.cursor();
    let stats = session.stats();

    prop_assert!(cursor <= chars.len());
    prop_assert!(stats.accuracy_pct <= 100);
    prop_assert!(stats.progress_pct <= 100);
    prop_assert_eq!(stats.total_typed, cursor);
    prop_assert_eq!(stats.correct_count + stats.incorrect_count, cursor);

    let current = chars.iter().filter(|c| c.status == CharStatus::Current).count();
    if session.is_completed() {
        prop_assert_eq!(current, 0);
        prop_assert_eq!(stats.progress_pct, 100);
        prop_assert!(!session.is_timer_running());
    } else {
        prop_assert_eq!(current, 1);
        prop_assert_eq!(chars[cursor].status, CharStatus::Current);
        prop_assert!(stats.progress_pct < 100);
    }

    for (i, c) in chars.iter().enumerate() {
        prop_assert_eq!(c.position, i);
        if i < cursor {
            prop_assert!(c.is_typed());
            prop_assert!(c.last_input.is_some());
        } else {
            prop_assert!(c.last_input.is_none());
        }
        if i > cursor {
            prop_assert_eq!(c.status, CharStatus::Pending);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn invariants_hold_for_any_event_sequence(
        text in text(),
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let clock = ManualClock::new();
        let mut session = Session::new("prop", &text).with_clock(Arc::new(clock.clone()));
        check_invariants(&session)?;

        for op in ops {
            let cursor_before = session.cursor();
            let completed_before = session.is_completed();
            let elapsed_before = session.elapsed_ms();

            let transition = match op {
                Op::Submit(c) => session.submit_character(c),
                Op::Delete => session.delete_last(),
                Op::Tick(ms) => {
                    clock.advance(Duration::from_millis(ms));
                    session.on_tick();
                    Transition::Ignored
                }
                Op::Restart => session.restart(),
            };

            match &transition {
                Transition::Advanced | Transition::Completed(_) => {
                    prop_assert_eq!(session.cursor(), cursor_before + 1);
                }
                Transition::Reverted => {
                    prop_assert_eq!(session.cursor() + 1, cursor_before);
                }
                Transition::Restarted => {
                    prop_assert_eq!(session.cursor(), 0);
                }
                Transition::Ignored => {
                    prop_assert_eq!(session.cursor(), cursor_before);
                }
            }

            // a finished session stays finished until restarted
            if completed_before && !matches!(op, Op::Restart) {
                prop_assert!(session.is_completed());
                prop_assert_eq!(session.elapsed_ms(), elapsed_before);
            }
            if !matches!(op, Op::Restart) {
                prop_assert!(session.elapsed_ms() >= elapsed_before);
            }

            check_invariants(&session)?;
        }
    }

    #[test]
    fn typing_the_text_exactly_is_fully_accurate(text in text()) {
        let mut session = Session::new("exact", &text);
        let mut last = Transition::Ignored;
        for c in text.chars() {
            last = session.submit_character(c);
        }

        prop_assert!(session.is_completed());
        prop_assert_eq!(session.stats().accuracy_pct, 100);
        if !text.is_empty() {
            prop_assert!(matches!(last, Transition::Completed(_)));
        }
    }
}
