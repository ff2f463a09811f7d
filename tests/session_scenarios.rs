use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use dazi::keystrokes::{KeystrokeEstimator, TableEstimator};
use dazi::session::{CharStatus, Session, Snapshot, Transition};
use dazi::stats::{compute_stats, RealtimeStats};
use dazi::timer::ManualClock;

fn statuses(session: &Session) -> Vec<CharStatus> {
    session.characters().iter().map(|c| c.status).collect()
}

#[test]
fn one_right_one_wrong_completes_at_half_accuracy() {
    let mut session = Session::new("ab", "AB");

    assert_eq!(session.submit_character('A'), Transition::Advanced);
    let last = session.submit_character('X');

    let record = assert_matches!(last, Transition::Completed(record) => record);
    assert_eq!(session.cursor(), 2);
    assert!(session.is_completed());

    let stats = session.stats();
    assert_eq!(stats.correct_count, 1);
    assert_eq!(stats.incorrect_count, 1);
    assert_eq!(stats.accuracy_pct, 50);
    assert_eq!(stats.progress_pct, 100);
    assert_eq!(record.accuracy_pct, 50);
    assert_eq!(
        statuses(&session),
        vec![CharStatus::Correct, CharStatus::Incorrect]
    );
}

#[test]
fn one_dense_glyph_in_one_minute() {
    let mut table = TableEstimator::default();
    table.insert('好', "hao");
    let estimator: Arc<dyn KeystrokeEstimator> = Arc::new(table);

    let mut session = Session::new("hao", "好")
        .with_estimator(estimator.clone())
        .with_clock(Arc::new(ManualClock::new()));
    let record = assert_matches!(session.submit_character('好'), Transition::Completed(r) => r);

    // The timer starts on this same submit, so a one-glyph lesson always
    // finishes at 0 ms and reports no speed of its own.
    assert_eq!(record.duration_sec, 0);
    assert_eq!(record.keystroke_speed, 0);
    assert_eq!(record.content_speed, 0);

    // The same buffer one minute in.
    let snapshot = Snapshot {
        elapsed_ms: 60_000,
        ..session.snapshot()
    };
    let stats = compute_stats(&snapshot, estimator.as_ref());

    assert_eq!(stats.keystroke_speed, 3);
    assert_eq!(stats.content_speed, 1);
    assert_eq!(stats.duration_sec, 60);
}

#[test]
fn empty_lesson_is_complete_from_the_start() {
    let mut session = Session::new("empty", "");

    assert!(session.is_completed());
    let stats = session.stats();
    assert_eq!(stats.progress_pct, 100);
    assert_eq!(stats.accuracy_pct, 100);
    assert_eq!(stats.duration_sec, 0);

    assert_eq!(session.submit_character('a'), Transition::Ignored);
    assert_eq!(session.delete_last(), Transition::Ignored);
    assert!(!session.is_timer_running());
}

#[test]
fn restart_after_partial_progress_resets_and_stops_time() {
    let clock = ManualClock::new();
    let mut session = Session::new("abc", "abc").with_clock(Arc::new(clock.clone()));

    session.submit_character('a');
    session.submit_character('x');
    clock.advance(Duration::from_secs(3));
    assert!(session.on_tick());

    assert_eq!(session.restart(), Transition::Restarted);

    assert_eq!(session.cursor(), 0);
    assert_eq!(
        statuses(&session),
        vec![CharStatus::Current, CharStatus::Pending, CharStatus::Pending]
    );
    assert!(session.characters().iter().all(|c| c.last_input.is_none()));
    assert_eq!(*session.stats(), RealtimeStats::baseline());
    assert!(!session.is_timer_running());

    clock.advance(Duration::from_secs(10));
    assert!(!session.on_tick());
    assert_eq!(session.elapsed_ms(), 0);

    // the next keystroke starts a fresh timer
    session.submit_character('a');
    assert_eq!(session.started_at_ms(), Some(13_000));
}

#[test]
fn mixed_script_lesson_with_line_break() {
    let clock = ManualClock::new();
    let mut session = Session::new("mixed", "你好\nhi").with_clock(Arc::new(clock.clone()));

    for c in ['你', '好', '\n', 'h'] {
        assert_eq!(session.submit_character(c), Transition::Advanced);
        clock.advance(Duration::from_secs(15));
    }
    let record = assert_matches!(session.submit_character('i'), Transition::Completed(r) => r);

    // two dense glyphs in one minute; the latin tail does not count
    assert_eq!(record.duration_sec, 60);
    assert_eq!(record.content_speed, 2);
    // ni + hao + three single keys
    assert_eq!(record.keystroke_speed, 8);
    assert_eq!(record.accuracy_pct, 100);
}
