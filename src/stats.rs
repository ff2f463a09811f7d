//! Live and final performance metrics derived from a session snapshot.

use serde::{Deserialize, Serialize};

use crate::keystrokes::KeystrokeEstimator;
use crate::script::is_dense_script;
use crate::session::{CharStatus, Snapshot};

/// Characters per "word" for segmented scripts.
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeStats {
    pub duration_sec: u64,
    /// Estimated keystrokes per minute.
    pub keystroke_speed: u32,
    /// Correct ideographs per minute, or words per minute for segmented text.
    pub content_speed: u32,
    pub accuracy_pct: u8,
    pub total_typed: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub progress_pct: u8,
}

impl RealtimeStats {
    /// Stats of a session nobody has typed into yet.
    pub const fn baseline() -> Self {
        Self {
            duration_sec: 0,
            keystroke_speed: 0,
            content_speed: 0,
            accuracy_pct: 100,
            total_typed: 0,
            correct_count: 0,
            incorrect_count: 0,
            progress_pct: 0,
        }
    }
}

impl Default for RealtimeStats {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Rounds a non-negative value to the nearest integer, ties away from zero.
///
/// For the non-negative inputs used here this matches `Math.round`, so
/// results stay identical to stats recorded by other clients.
pub fn round_nearest(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    // saturating float-to-int cast
    value.round() as u64
}

fn per_minute(units: f64, duration_min: f64) -> u32 {
    if duration_min > 0.0 {
        u32::try_from(round_nearest(units / duration_min)).unwrap_or(u32::MAX)
    } else {
        0
    }
}

fn percent(part: usize, whole: usize) -> u8 {
    let pct = round_nearest(100.0 * part as f64 / whole as f64).min(100);
    u8::try_from(pct).unwrap_or(100)
}

/// Derives stats from a snapshot. Pure; safe to call before any input.
pub fn compute_stats(snapshot: &Snapshot<'_>, estimator: &dyn KeystrokeEstimator) -> RealtimeStats {
    let length = snapshot.buffer.len();
    let cursor = snapshot.cursor.min(length);
    let typed = &snapshot.buffer[..cursor];

    let total_typed = cursor;
    let correct_count = typed
        .iter()
        .filter(|c| c.status == CharStatus::Correct)
        .count();
    let incorrect_count = typed
        .iter()
        .filter(|c| c.status == CharStatus::Incorrect)
        .count();

    let duration_min = snapshot.elapsed_ms as f64 / 60_000.0;

    let keystroke_units: usize = typed
        .iter()
        .map(|c| estimator.estimate_keystrokes(c.last_input.unwrap_or(c.glyph)))
        .sum();
    let keystroke_speed = per_minute(keystroke_units as f64, duration_min);

    let content_is_dense = snapshot.buffer.iter().any(|c| is_dense_script(c.glyph));
    let content_speed = if content_is_dense {
        let dense_correct = typed
            .iter()
            .filter(|c| is_dense_script(c.glyph) && c.status == CharStatus::Correct)
            .count();
        per_minute(dense_correct as f64, duration_min)
    } else {
        per_minute(correct_count as f64 / CHARS_PER_WORD, duration_min)
    };

    let accuracy_pct = if total_typed > 0 {
        percent(correct_count, total_typed)
    } else {
        100
    };

    let progress_pct = if length == 0 || snapshot.completed {
        100
    } else {
        // 100 is reserved for a completed session
        percent(cursor, length).min(99)
    };

    RealtimeStats {
        duration_sec: round_nearest(snapshot.elapsed_ms as f64 / 1000.0),
        keystroke_speed,
        content_speed,
        accuracy_pct,
        total_typed,
        correct_count,
        incorrect_count,
        progress_pct,
    }
}

/// Formats whole seconds as `m:ss`.
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
