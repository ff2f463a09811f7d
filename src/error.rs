use thiserror::Error;

/// Failures raised by the collaborators around a typing session (lessons,
/// history, configuration). The session itself never fails.
#[derive(Error, Debug)]
pub enum DaziError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database Error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Lesson not found: {0}")]
    LessonNotFound(String),

    #[error("Lesson Error: {0}")]
    Lesson(String),
}

pub type Result<T> = std::result::Result<T, DaziError>;
