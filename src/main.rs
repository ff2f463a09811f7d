mod ui;

use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use dazi::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    grade::GradeThresholds,
    history::{export_csv, HistoryStore, LessonStats, MemoryHistoryStore, PracticeRecord, SqliteHistoryStore},
    input::{InputAdapter, InputEvent},
    lesson::{BundledLessons, DirLessons, Lesson, LessonCatalog, LessonSource},
    logging::init_file_logging,
    runtime::{key_to_input, CrosstermEventSource, EventSource, Runner, SessionEvent},
    session::{Session, Transition},
    stats::format_time,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use tracing::{error, info, warn};

/// Lesson id given to sessions over `--text`.
const CUSTOM_LESSON_ID: &str = "custom";

type Catalog = LessonCatalog<Box<dyn LessonSource>>;

/// typing practice for lesson texts, with pinyin-aware speed and practice history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing trainer for lesson texts. Chinese lessons are scored in characters per minute and estimated pinyin keystrokes; other text in words per minute. Completed practices are kept in a local history."
)]
pub struct Cli {
    /// id of the lesson to practice
    #[clap(short = 'l', long)]
    lesson: Option<String>,

    /// custom text to practice instead of a lesson
    #[clap(short = 't', long, conflicts_with_all = ["lesson", "random"])]
    text: Option<String>,

    /// practice a random lesson
    #[clap(short = 'r', long)]
    random: bool,

    /// list available lessons and exit
    #[clap(long)]
    list: bool,

    /// print recent practice history, optionally for one lesson id, and exit
    #[clap(long, num_args = 0..=1, default_missing_value = "")]
    history: Option<String>,

    /// write the practice history as CSV to this path and exit
    #[clap(long)]
    export_history: Option<PathBuf>,

    /// delete all practice history and exit
    #[clap(long)]
    clear_history: bool,

    /// read lessons from this directory instead of the bundled set
    #[clap(long)]
    lessons_dir: Option<PathBuf>,

    /// log level written to the log file (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
}

pub struct App {
    pub session: Session,
    pub adapter: InputAdapter,
    pub state: AppState,
    /// `None` while practicing custom text.
    pub lesson: Option<Lesson>,
    pub last_record: Option<PracticeRecord>,
    pub lesson_stats: Option<LessonStats>,
    pub grades: GradeThresholds,
    /// Last collaborator failure, shown in the footer.
    pub notice: Option<String>,
    /// Runner cadence; sessions only read the clock when ticked.
    tick: Duration,
}

impl AppState {
    /// A session with nothing to type (empty text) goes straight to results.
    fn entered_with(session: &Session) -> Self {
        if session.is_completed() {
            AppState::Results
        } else {
            AppState::Typing
        }
    }
}

impl App {
    fn new(session: Session, lesson: Option<Lesson>, config: &Config) -> Self {
        Self {
            state: AppState::entered_with(&session),
            session,
            adapter: InputAdapter::new(),
            lesson,
            last_record: None,
            lesson_stats: None,
            grades: config.grades.clone(),
            notice: None,
            tick: Duration::from_millis(config.tick_ms),
        }
    }

    fn handle_input(&mut self, event: InputEvent, history: &mut dyn HistoryStore) {
        for transition in self.adapter.dispatch(event, &mut self.session) {
            if let Transition::Completed(record) = transition {
                self.finish(record, history);
            }
        }
    }

    fn finish(&mut self, record: PracticeRecord, history: &mut dyn HistoryStore) {
        self.adapter.set_enabled(false);
        self.state = AppState::Results;

        if record.lesson_id != CUSTOM_LESSON_ID {
            if let Err(e) = history.add(&record) {
                warn!(error = %e, "failed to save practice record");
                self.notice = Some(format!("history not saved: {e}"));
            }
            self.lesson_stats = history
                .lesson_stats(&record.lesson_id)
                .map_err(|e| warn!(error = %e, "failed to read lesson stats"))
                .ok();
        }
        self.last_record = Some(record);
    }

    fn restart(&mut self) {
        self.session.restart();
        self.adapter = InputAdapter::new();
        self.state = AppState::entered_with(&self.session);
        self.last_record = None;
        self.lesson_stats = None;
    }

    /// Replaces the session with the next lesson; the old session and its
    /// timer are dropped here.
    fn next_lesson(&mut self, catalog: &mut Catalog) {
        let Some(current) = &self.lesson else {
            self.restart();
            return;
        };
        match catalog.next_after(&current.id) {
            Ok(lesson) => {
                info!(from = %current.id, to = %lesson.id, "switching lesson");
                self.session = lesson.start_session();
                self.lesson = Some(lesson);
                self.adapter = InputAdapter::new();
                self.state = AppState::entered_with(&self.session);
                self.last_record = None;
                self.lesson_stats = None;
            }
            Err(e) => {
                warn!(error = %e, "failed to load next lesson");
                self.notice = Some(e.to_string());
            }
        }
    }
}

fn open_catalog(cli: &Cli, config: &Config) -> Catalog {
    let source: Box<dyn LessonSource> = match cli.lessons_dir.as_ref().or(config.lessons_dir.as_ref()) {
        Some(dir) => Box::new(DirLessons::new(dir)),
        None => Box::new(BundledLessons),
    };
    LessonCatalog::new(source)
}

fn open_history(config: &Config) -> Box<dyn HistoryStore> {
    let path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("dazi_history.db"));
    match SqliteHistoryStore::open(&path, config.history_capacity) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "history database unavailable, keeping history in memory");
            Box::new(MemoryHistoryStore::new(config.history_capacity))
        }
    }
}

fn choose_lesson(
    cli: &Cli,
    config: &Config,
    catalog: &mut Catalog,
) -> dazi::Result<(Session, Option<Lesson>)> {
    if let Some(text) = &cli.text {
        let session = Session::new(CUSTOM_LESSON_ID, &dazi::util::normalize_line_endings(text))
            .with_title("Custom text");
        return Ok((session, None));
    }

    let lesson = if cli.random {
        catalog.random(&mut rand::thread_rng())?
    } else if let Some(id) = cli.lesson.as_ref().or(config.default_lesson.as_ref()) {
        catalog.find(id)?
    } else {
        catalog
            .all_lessons()?
            .into_iter()
            .next()
            .ok_or_else(|| dazi::DaziError::Lesson("no lessons available".to_string()))?
    };
    Ok((lesson.start_session(), Some(lesson)))
}

/// One `--list` row: id, title, size, and practice totals once there are any.
fn lesson_row(lesson: &Lesson, stats: &LessonStats) -> String {
    let counts = lesson.counts();
    let size = if counts.dense > 0 {
        format!("{} 字", counts.dense)
    } else {
        format!("{} chars", counts.total)
    };
    let mut row = format!("    {:<10} {:<12} {:>10}", lesson.id, lesson.title, size);
    if stats.total_practices > 0 {
        row.push_str(&format!(
            "   best {}   {} practices",
            stats.best_speed, stats.total_practices
        ));
    }
    row
}

fn print_lessons(catalog: &mut Catalog, history: &dyn HistoryStore) -> dazi::Result<()> {
    let index = catalog.index()?.clone();
    for language in &index.languages {
        println!("{} ({})", language.name, language.id);
        for grade in &language.grades {
            println!("  {}", grade.name);
            for lesson in &catalog.grade(&grade.path)?.lessons {
                let stats = history.lesson_stats(&lesson.id)?;
                println!("{}", lesson_row(lesson, &stats));
            }
        }
    }
    Ok(())
}

fn print_history(history: &dyn HistoryStore, lesson_id: &str) -> dazi::Result<()> {
    let records = if lesson_id.is_empty() {
        history.recent(20)?
    } else {
        history
            .all()?
            .into_iter()
            .filter(|r| r.lesson_id == lesson_id)
            .collect()
    };

    for r in &records {
        println!(
            "{}  {:<10} {:<12} {:>4}/min {:>4} keys/min {:>3}%  {}",
            r.completed_at.format("%Y-%m-%d %H:%M"),
            r.lesson_id,
            r.lesson_title,
            r.content_speed,
            r.keystroke_speed,
            r.accuracy_pct,
            format_time(r.duration_sec),
        );
    }

    if !lesson_id.is_empty() {
        let stats = history.lesson_stats(lesson_id)?;
        println!(
            "{} practices, best {}/min, average accuracy {:.1}%",
            stats.total_practices, stats.best_speed, stats.average_accuracy
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = FileConfigStore::new().load();

    if let Some(log_path) = AppDirs::log_path() {
        let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
        if let Err(e) = init_file_logging(&log_path, level) {
            eprintln!("logging disabled: {e}");
        }
    }

    let mut catalog = open_catalog(&cli, &config);
    let mut history = open_history(&config);

    if cli.list {
        print_lessons(&mut catalog, history.as_ref())?;
        return Ok(());
    }
    if cli.clear_history {
        history.clear_all()?;
        println!("practice history cleared");
        return Ok(());
    }
    if let Some(path) = &cli.export_history {
        export_csv(&history.all()?, File::create(path)?)?;
        println!("practice history written to {}", path.display());
        return Ok(());
    }
    if let Some(lesson_id) = &cli.history {
        print_history(history.as_ref(), lesson_id)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let (session, lesson) = choose_lesson(&cli, &config, &mut catalog).map_err(|e| {
        error!(error = %e, "could not start a session");
        e
    })?;
    let mut app = App::new(session, lesson, &config);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), app.tick);
    let res = start_tui(&mut terminal, &mut app, &runner, &mut catalog, history.as_mut());

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen,
    )?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
    catalog: &mut Catalog,
    history: &mut dyn HistoryStore,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            SessionEvent::Tick => {
                if !app.session.on_tick() {
                    continue;
                }
            }
            SessionEvent::Resize => {}
            SessionEvent::Paste(text) => app.handle_input(InputEvent::Insert(text), history),
            SessionEvent::Key(key) => {
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Esc => break,
                    KeyCode::Char('c') if ctrl => break,
                    KeyCode::Char('r') if ctrl => app.restart(),
                    KeyCode::Left => app.restart(),
                    KeyCode::Right => app.next_lesson(catalog),
                    code if app.state == AppState::Results => match code {
                        KeyCode::Char('r') => app.restart(),
                        KeyCode::Char('n') => app.next_lesson(catalog),
                        _ => {}
                    },
                    _ => {
                        if let Some(event) = key_to_input(key) {
                            app.handle_input(event, history);
                        }
                    }
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use dazi::stats::RealtimeStats;

    fn lesson(id: &str, content: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            title: "Title".to_string(),
            grade: "g".to_string(),
            language: None,
            category: None,
            difficulty: 1,
            order: 1,
            content: content.to_string(),
            character_count: 0,
            chinese_char_count: 0,
        }
    }

    #[test]
    fn empty_text_opens_on_results() {
        let app = App::new(Session::new(CUSTOM_LESSON_ID, ""), None, &Config::default());
        assert_eq!(app.state, AppState::Results);

        let app = App::new(Session::new(CUSTOM_LESSON_ID, "hi"), None, &Config::default());
        assert_eq!(app.state, AppState::Typing);
    }

    #[test]
    fn restarting_an_empty_session_stays_on_results() {
        let mut app = App::new(Session::new(CUSTOM_LESSON_ID, ""), None, &Config::default());
        app.restart();
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn lesson_row_shows_size_and_practice_totals() {
        let dense = lesson("g1-01", "鹅鹅鹅，曲项向天歌");
        let fresh = lesson_row(&dense, &LessonStats::default());
        assert!(fresh.contains("8 字"));
        assert!(!fresh.contains("practices"));

        let mut history = MemoryHistoryStore::new(10);
        let stats = RealtimeStats {
            content_speed: 42,
            ..RealtimeStats::baseline()
        };
        let record = PracticeRecord::from_stats("g1-01", "Title", &stats, Local::now());
        history.add(&record).unwrap();
        history.add(&record).unwrap();
        let practiced = lesson_row(&dense, &history.lesson_stats("g1-01").unwrap());
        assert!(practiced.contains("best 42"));
        assert!(practiced.contains("2 practices"));

        let latin = lesson_row(&lesson("en-01", "hello world"), &LessonStats::default());
        assert!(latin.contains("11 chars"));
    }
}
