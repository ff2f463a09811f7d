// Library surface for the terminal front end, headless drivers and tests.
// The display layer lives in the binary; nothing here renders.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod grade;
pub mod history;
pub mod input;
pub mod keystrokes;
pub mod lesson;
pub mod logging;
pub mod runtime;
pub mod script;
pub mod session;
pub mod stats;
pub mod timer;
pub mod util;

pub use error::{DaziError, Result};
pub use session::{CharStatus, Character, Session, Transition};
pub use stats::{compute_stats, RealtimeStats};
