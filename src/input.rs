//! Turns raw text-input events, including input-method composition, into the
//! two primitive session operations: submit one character, delete one.

use tracing::trace;

use crate::session::{Session, Transition, LINE_BREAK};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    CompositionStart,
    /// Provisional text while composing; shown, never typed.
    CompositionUpdate(String),
    /// Composition finished with this committed text.
    CompositionEnd(String),
    /// Text inserted outside composition (a key press or a paste).
    Insert(String),
    Backspace,
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Submit(char),
    Delete,
}

#[derive(Debug, Clone)]
pub struct InputAdapter {
    composing: bool,
    preview: String,
    enabled: bool,
}

impl Default for InputAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputAdapter {
    pub fn new() -> Self {
        Self {
            composing: false,
            preview: String::new(),
            enabled: true,
        }
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled adapter still tracks composition but emits nothing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Translates one event. A single event yields either deletes or submits,
    /// never both.
    pub fn translate(&mut self, event: InputEvent) -> Vec<Signal> {
        let signals = match event {
            InputEvent::CompositionStart => {
                self.composing = true;
                self.preview.clear();
                Vec::new()
            }
            InputEvent::CompositionUpdate(text) => {
                if self.composing {
                    self.preview = text;
                }
                Vec::new()
            }
            InputEvent::CompositionEnd(text) => {
                self.composing = false;
                self.preview.clear();
                self.submits(&text)
            }
            InputEvent::Insert(text) if !self.composing => self.submits(&text),
            InputEvent::Backspace if !self.composing && self.enabled => vec![Signal::Delete],
            InputEvent::LineBreak if !self.composing && self.enabled => {
                vec![Signal::Submit(LINE_BREAK)]
            }
            InputEvent::Insert(_) | InputEvent::Backspace | InputEvent::LineBreak => Vec::new(),
        };
        trace!(?signals, composing = self.composing, "input translated");
        signals
    }

    /// Translates an event and applies the resulting signals to `session`.
    pub fn dispatch(&mut self, event: InputEvent, session: &mut Session) -> Vec<Transition> {
        self.translate(event)
            .into_iter()
            .map(|signal| match signal {
                Signal::Submit(c) => session.submit_character(c),
                Signal::Delete => session.delete_last(),
            })
            .collect()
    }

    fn submits(&self, text: &str) -> Vec<Signal> {
        if !self.enabled {
            return Vec::new();
        }
        text.chars().map(Signal::Submit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_insert_submits_each_scalar_in_order() {
        let mut adapter = InputAdapter::new();
        assert_eq!(
            adapter.translate(InputEvent::Insert("ab".into())),
            vec![Signal::Submit('a'), Signal::Submit('b')]
        );
    }

    #[test]
    fn test_composition_only_commits_at_end() {
        let mut adapter = InputAdapter::new();
        assert!(adapter.translate(InputEvent::CompositionStart).is_empty());
        assert!(adapter.is_composing());
        assert!(adapter
            .translate(InputEvent::CompositionUpdate("ni'h".into()))
            .is_empty());
        assert_eq!(adapter.preview(), "ni'h");

        // keys reaching us mid-composition belong to the input method
        assert!(adapter.translate(InputEvent::Insert("n".into())).is_empty());
        assert!(adapter.translate(InputEvent::Backspace).is_empty());
        assert!(adapter.translate(InputEvent::LineBreak).is_empty());

        let signals = adapter.translate(InputEvent::CompositionEnd("你好".into()));
        assert_eq!(signals, vec![Signal::Submit('你'), Signal::Submit('好')]);
        assert!(!adapter.is_composing());
        assert_eq!(adapter.preview(), "");
    }

    #[test]
    fn test_backspace_and_line_break() {
        let mut adapter = InputAdapter::new();
        assert_eq!(adapter.translate(InputEvent::Backspace), vec![Signal::Delete]);
        assert_eq!(
            adapter.translate(InputEvent::LineBreak),
            vec![Signal::Submit(LINE_BREAK)]
        );
    }

    #[test]
    fn test_disabled_adapter_emits_nothing() {
        let mut adapter = InputAdapter::new();
        adapter.set_enabled(false);
        assert!(adapter.translate(InputEvent::Insert("a".into())).is_empty());
        assert!(adapter.translate(InputEvent::Backspace).is_empty());
        adapter.translate(InputEvent::CompositionStart);
        assert!(adapter
            .translate(InputEvent::CompositionEnd("好".into()))
            .is_empty());
        assert!(!adapter.is_composing());
    }

    #[test]
    fn test_update_without_start_is_ignored() {
        let mut adapter = InputAdapter::new();
        adapter.translate(InputEvent::CompositionUpdate("zh".into()));
        assert_eq!(adapter.preview(), "");
    }

    #[test]
    fn test_dispatch_drives_session() {
        let mut adapter = InputAdapter::new();
        let mut session = Session::new("l", "你好\n");

        adapter.translate(InputEvent::CompositionStart);
        adapter.translate(InputEvent::CompositionUpdate("nihao".into()));
        let transitions = adapter.dispatch(InputEvent::CompositionEnd("你号".into()), &mut session);
        assert_eq!(transitions, vec![Transition::Advanced, Transition::Advanced]);
        assert_eq!(session.cursor(), 2);

        adapter.dispatch(InputEvent::Backspace, &mut session);
        adapter.dispatch(InputEvent::Insert("好".into()), &mut session);
        let transitions = adapter.dispatch(InputEvent::LineBreak, &mut session);
        assert_matches!(transitions.as_slice(), [Transition::Completed(_)]);
        assert_eq!(session.stats().accuracy_pct, 100);
    }
}
