use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DaziError, Result};
use crate::script::is_dense_script;
use crate::session::Session;
use crate::util::normalize_line_endings;

static LESSON_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lessons");

/// Name of the index file at the root of every lesson source.
pub const INDEX_FILE: &str = "index.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub grade: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub difficulty: u8,
    pub order: i64,
    pub content: String,
    #[serde(default)]
    pub character_count: usize,
    #[serde(default)]
    pub chinese_char_count: usize,
}

impl Lesson {
    /// Lesson content with line endings normalized to single `\n` glyphs.
    pub fn text(&self) -> String {
        normalize_line_endings(&self.content)
    }

    /// Declared counts, or counts of the content when the file leaves them out.
    pub fn counts(&self) -> CharacterCounts {
        if self.character_count > 0 {
            CharacterCounts {
                total: self.character_count,
                dense: self.chinese_char_count,
            }
        } else {
            count_lesson_characters(&self.text())
        }
    }

    pub fn start_session(&self) -> Session {
        Session::new(&self.id, &self.text()).with_title(&self.title)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GradeLessons {
    pub grade: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LessonIndex {
    pub languages: Vec<LanguageConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LanguageConfig {
    pub id: String,
    pub name: String,
    pub grades: Vec<GradeConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GradeConfig {
    pub id: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterCounts {
    pub total: usize,
    pub dense: usize,
}

pub fn count_lesson_characters(text: &str) -> CharacterCounts {
    text.chars().fold(CharacterCounts { total: 0, dense: 0 }, |acc, c| CharacterCounts {
        total: acc.total + 1,
        dense: acc.dense + usize::from(is_dense_script(c)),
    })
}

/// Where lesson files come from. Paths are relative to the source root.
pub trait LessonSource {
    fn read(&self, path: &str) -> Result<String>;
}

/// Lessons compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledLessons;

impl LessonSource for BundledLessons {
    fn read(&self, path: &str) -> Result<String> {
        LESSON_DIR
            .get_file(path)
            .and_then(|f| f.contents_utf8())
            .map(str::to_string)
            .ok_or_else(|| DaziError::Lesson(format!("bundled lesson file not found: {path}")))
    }
}

/// Lessons read from a directory laid out like the bundled set.
#[derive(Debug, Clone)]
pub struct DirLessons {
    root: PathBuf,
}

impl DirLessons {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl LessonSource for DirLessons {
    fn read(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.root.join(path))?)
    }
}

impl<S: LessonSource + ?Sized> LessonSource for Box<S> {
    fn read(&self, path: &str) -> Result<String> {
        (**self).read(path)
    }
}

/// Loads lessons from a source and caches the index and each grade file for
/// the catalog's lifetime.
#[derive(Debug)]
pub struct LessonCatalog<S> {
    source: S,
    index: Option<LessonIndex>,
    grades: HashMap<String, GradeLessons>,
}

impl<S: LessonSource> LessonCatalog<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            index: None,
            grades: HashMap::new(),
        }
    }

    pub fn index(&mut self) -> Result<&LessonIndex> {
        let index = match self.index.take() {
            Some(index) => index,
            None => {
                let index: LessonIndex = serde_json::from_str(&self.source.read(INDEX_FILE)?)?;
                debug!(languages = index.languages.len(), "lesson index loaded");
                index
            }
        };
        Ok(&*self.index.insert(index))
    }

    pub fn grade(&mut self, path: &str) -> Result<&GradeLessons> {
        match self.grades.entry(path.to_string()) {
            Entry::Occupied(e) => Ok(&*e.into_mut()),
            Entry::Vacant(e) => {
                let grade: GradeLessons = serde_json::from_str(&self.source.read(path)?)?;
                debug!(path, lessons = grade.lessons.len(), "grade lessons loaded");
                Ok(&*e.insert(grade))
            }
        }
    }

    /// Every lesson of every grade, sorted by `order`.
    pub fn all_lessons(&mut self) -> Result<Vec<Lesson>> {
        let paths: Vec<String> = self
            .index()?
            .languages
            .iter()
            .flat_map(|l| l.grades.iter().map(|g| g.path.clone()))
            .collect();

        let mut lessons = Vec::new();
        for path in paths {
            lessons.extend(self.grade(&path)?.lessons.iter().cloned());
        }
        lessons.sort_by_key(|l| l.order);
        Ok(lessons)
    }

    pub fn find(&mut self, id: &str) -> Result<Lesson> {
        self.all_lessons()?
            .into_iter()
            .find(|l| l.id == id)
            .ok_or_else(|| DaziError::LessonNotFound(id.to_string()))
    }

    /// The lesson following `id` in catalog order, wrapping around.
    pub fn next_after(&mut self, id: &str) -> Result<Lesson> {
        let lessons = self.all_lessons()?;
        let pos = lessons
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| DaziError::LessonNotFound(id.to_string()))?;
        Ok(lessons[(pos + 1) % lessons.len()].clone())
    }

    pub fn random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Lesson> {
        self.all_lessons()?
            .choose(rng)
            .cloned()
            .ok_or_else(|| DaziError::Lesson("lesson catalog is empty".to_string()))
    }

    /// Drops every cached file; the next lookup reads from the source again.
    pub fn clear(&mut self) {
        self.index = None;
        self.grades.clear();
    }
}
