/// First code point of the CJK Unified Ideographs block counted as dense script.
pub const DENSE_SCRIPT_START: char = '\u{4E00}';
/// Last code point counted as dense script.
pub const DENSE_SCRIPT_END: char = '\u{9FA5}';

/// How a glyph is typed: one input-method unit per character (dense) or one
/// key per character with whitespace between words (segmented).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ScriptKind {
    Dense,
    Segmented,
}

impl ScriptKind {
    pub fn of(glyph: char) -> Self {
        if is_dense_script(glyph) {
            ScriptKind::Dense
        } else {
            ScriptKind::Segmented
        }
    }
}

pub fn is_dense_script(glyph: char) -> bool {
    (DENSE_SCRIPT_START..=DENSE_SCRIPT_END).contains(&glyph)
}
