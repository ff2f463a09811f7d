use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::history::PracticeRecord;
use crate::keystrokes::{KeystrokeEstimator, PinyinEstimator};
use crate::stats::{compute_stats, RealtimeStats};
use crate::script::is_dense_script;
use crate::timer::{Clock, SystemClock, TimerHandle};

/// Glyph of an explicit line break in lesson text.
pub const LINE_BREAK: char = '\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum CharStatus {
    Pending,
    Current,
    Correct,
    Incorrect,
}

/// One position of the lesson text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub glyph: char,
    pub status: CharStatus,
    /// What was actually typed at this position, kept to show mistakes.
    pub last_input: Option<char>,
    pub position: usize,
}

impl Character {
    pub fn is_line_break(&self) -> bool {
        self.glyph == LINE_BREAK
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.status, CharStatus::Correct | CharStatus::Incorrect)
    }
}

/// One character per scalar value, the first one marked current.
pub fn text_to_characters(text: &str) -> Vec<Character> {
    text.chars()
        .enumerate()
        .map(|(position, glyph)| Character {
            glyph,
            status: if position == 0 {
                CharStatus::Current
            } else {
                CharStatus::Pending
            },
            last_input: None,
            position,
        })
        .collect()
}

/// Read-only view of a session handed to the stats engine and observers.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub buffer: &'a [Character],
    pub cursor: usize,
    pub elapsed_ms: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    NotStarted,
    Running,
    Completed,
}

/// Outcome of feeding one event to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The event was not valid in the current phase; nothing changed.
    Ignored,
    Advanced,
    Reverted,
    Restarted,
    Completed(PracticeRecord),
}

/// Receives a fresh snapshot after every mutation.
pub trait SessionObserver {
    fn on_update(&mut self, _snapshot: &Snapshot<'_>, _stats: &RealtimeStats) {}

    fn on_complete(&mut self, _record: &PracticeRecord) {}
}

/// One practice attempt over one lesson's text.
pub struct Session {
    lesson_id: String,
    lesson_title: String,
    buffer: Vec<Character>,
    cursor: usize,
    started_at_ms: Option<u64>,
    elapsed_ms: u64,
    completed: bool,
    timer: Option<TimerHandle>,
    stats: RealtimeStats,
    clock: Arc<dyn Clock>,
    estimator: Arc<dyn KeystrokeEstimator>,
    observers: Vec<Box<dyn SessionObserver>>,
    /// Dense glyphs already reported as missing a romanization.
    unromanized: HashSet<char>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("lesson_id", &self.lesson_id)
            .field("len", &self.buffer.len())
            .field("cursor", &self.cursor)
            .field("started_at_ms", &self.started_at_ms)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("completed", &self.completed)
            .field("timer", &self.timer)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(lesson_id: impl Into<String>, text: &str) -> Self {
        let buffer = text_to_characters(text);
        let completed = buffer.is_empty();
        let mut session = Self {
            lesson_id: lesson_id.into(),
            lesson_title: String::new(),
            buffer,
            cursor: 0,
            started_at_ms: None,
            elapsed_ms: 0,
            completed,
            timer: None,
            stats: RealtimeStats::baseline(),
            clock: Arc::new(SystemClock::new()),
            estimator: Arc::new(PinyinEstimator),
            observers: Vec::new(),
            unromanized: HashSet::new(),
        };
        session.recompute();
        session
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.lesson_title = title.into();
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<dyn KeystrokeEstimator>) -> Self {
        self.estimator = estimator;
        self.recompute();
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn lesson_title(&self) -> &str {
        &self.lesson_title
    }

    pub fn characters(&self) -> &[Character] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Character> {
        self.buffer.get(self.cursor)
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn stats(&self) -> &RealtimeStats {
        &self.stats
    }

    pub fn estimator(&self) -> &dyn KeystrokeEstimator {
        self.estimator.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.completed {
            Phase::Completed
        } else if self.started_at_ms.is_some() {
            Phase::Running
        } else {
            Phase::NotStarted
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            buffer: &self.buffer,
            cursor: self.cursor,
            elapsed_ms: self.elapsed_ms,
            completed: self.completed,
        }
    }

    /// Commits one typed character against the glyph under the cursor.
    pub fn submit_character(&mut self, input: char) -> Transition {
        if self.completed || self.cursor >= self.buffer.len() {
            debug!(lesson = %self.lesson_id, %input, "input ignored, session complete");
            return Transition::Ignored;
        }

        if self.started_at_ms.is_none() {
            let timer = TimerHandle::start(self.clock.as_ref());
            self.started_at_ms = Some(timer.started_at_ms());
            self.timer = Some(timer);
            info!(lesson = %self.lesson_id, len = self.buffer.len(), "session started");
        }

        let position = self.cursor;
        let character = &mut self.buffer[position];
        character.status = if input == character.glyph {
            CharStatus::Correct
        } else {
            CharStatus::Incorrect
        };
        character.last_input = Some(input);
        if is_dense_script(input)
            && self.estimator.romanize(input).is_none()
            && self.unromanized.insert(input)
        {
            warn!(lesson = %self.lesson_id, glyph = %input, "no romanization for glyph, counting 0 keystrokes");
        }
        debug!(position, expected = %character.glyph, %input, status = %character.status, "character submitted");

        self.cursor += 1;
        if let Some(next) = self.buffer.get_mut(self.cursor) {
            next.status = CharStatus::Current;
        }
        self.refresh_elapsed();

        if self.cursor == self.buffer.len() {
            return self.complete();
        }

        self.recompute();
        self.notify();
        Transition::Advanced
    }

    /// Steps the cursor back one position and forgets what was typed there.
    pub fn delete_last(&mut self) -> Transition {
        if self.cursor == 0 || self.completed {
            return Transition::Ignored;
        }

        let old = self.cursor;
        self.cursor -= 1;
        let character = &mut self.buffer[self.cursor];
        character.status = CharStatus::Current;
        character.last_input = None;
        if let Some(next) = self.buffer.get_mut(old) {
            next.status = CharStatus::Pending;
        }
        debug!(position = self.cursor, "character reverted");

        self.refresh_elapsed();
        self.recompute();
        self.notify();
        Transition::Reverted
    }

    /// Back to a fresh, untimed session over the same text.
    pub fn restart(&mut self) -> Transition {
        self.timer = None;
        for character in &mut self.buffer {
            character.status = if character.position == 0 {
                CharStatus::Current
            } else {
                CharStatus::Pending
            };
            character.last_input = None;
        }
        self.cursor = 0;
        self.started_at_ms = None;
        self.elapsed_ms = 0;
        self.completed = self.buffer.is_empty();
        info!(lesson = %self.lesson_id, "session restarted");

        self.recompute();
        self.notify();
        Transition::Restarted
    }

    /// Periodic refresh of the elapsed time. Returns whether anything changed;
    /// a session without a running timer ignores ticks.
    pub fn on_tick(&mut self) -> bool {
        if self.completed || self.timer.is_none() {
            return false;
        }
        let before = self.elapsed_ms;
        self.refresh_elapsed();
        if self.elapsed_ms == before {
            return false;
        }
        self.recompute();
        self.notify();
        true
    }

    fn complete(&mut self) -> Transition {
        self.completed = true;
        self.timer = None;
        self.recompute();

        let record = PracticeRecord::from_stats(
            &self.lesson_id,
            &self.lesson_title,
            &self.stats,
            Local::now(),
        );
        info!(
            lesson = %self.lesson_id,
            duration_sec = record.duration_sec,
            keystroke_speed = record.keystroke_speed,
            content_speed = record.content_speed,
            accuracy = record.accuracy_pct,
            "session completed"
        );

        self.notify();
        for observer in &mut self.observers {
            observer.on_complete(&record);
        }
        Transition::Completed(record)
    }

    fn refresh_elapsed(&mut self) {
        if let Some(timer) = &self.timer {
            self.elapsed_ms = timer.elapsed_ms(self.clock.as_ref());
        }
    }

    fn recompute(&mut self) {
        let snapshot = Snapshot {
            buffer: &self.buffer,
            cursor: self.cursor,
            elapsed_ms: self.elapsed_ms,
            completed: self.completed,
        };
        self.stats = compute_stats(&snapshot, self.estimator.as_ref());
    }

    fn notify(&mut self) {
        let snapshot = Snapshot {
            buffer: &self.buffer,
            cursor: self.cursor,
            elapsed_ms: self.elapsed_ms,
            completed: self.completed,
        };
        for observer in &mut self.observers {
            observer.on_update(&snapshot, &self.stats);
        }
    }
}
