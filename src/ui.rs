use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use dazi::{
    grade::{rank, Tier},
    script::is_dense_script,
    session::{CharStatus, Character, LINE_BREAK},
    stats::{format_time, RealtimeStats},
    util::truncate_to_width,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const LINE_BREAK_MARK: &str = "↵";

struct Palette {
    bold: Style,
    correct: Style,
    incorrect: Style,
    current: Style,
    pending: Style,
    italic: Style,
}

impl Palette {
    fn new() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let pending = Style::default().patch(bold).add_modifier(Modifier::DIM);
        Self {
            bold,
            correct: Style::default().patch(bold).fg(Color::Green),
            incorrect: Style::default().patch(bold).fg(Color::Red),
            current: Style::default().patch(pending).add_modifier(Modifier::UNDERLINED),
            pending,
            italic: Style::default().add_modifier(Modifier::ITALIC),
        }
    }

    fn for_status(&self, status: CharStatus) -> Style {
        match status {
            CharStatus::Correct => self.correct,
            CharStatus::Incorrect => self.incorrect,
            CharStatus::Current => self.current,
            CharStatus::Pending => self.pending,
        }
    }
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::S => Color::Magenta,
        Tier::A => Color::Green,
        Tier::B => Color::Cyan,
        Tier::C => Color::Yellow,
        Tier::D => Color::Red,
    }
}

fn glyph_text(c: &Character) -> String {
    if c.status == CharStatus::Incorrect {
        // show what was typed; a wrong space would be invisible
        match c.last_input {
            Some(' ') => "·".to_owned(),
            Some(LINE_BREAK) => LINE_BREAK_MARK.to_owned(),
            Some(typed) => typed.to_string(),
            None => c.glyph.to_string(),
        }
    } else {
        c.glyph.to_string()
    }
}

/// Splits the buffer into display lines, one per line break.
fn text_lines<'a>(characters: &[Character], palette: &Palette) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let mut spans = Vec::new();

    for c in characters {
        let style = palette.for_status(c.status);
        if c.is_line_break() {
            spans.push(Span::styled(LINE_BREAK_MARK, style));
            lines.push(Line::from(std::mem::take(&mut spans)));
        } else {
            spans.push(Span::styled(glyph_text(c), style));
        }
    }
    if !spans.is_empty() || lines.is_empty() {
        lines.push(Line::from(spans));
    }
    lines
}

fn speed_unit(characters: &[Character]) -> &'static str {
    if characters.iter().any(|c| is_dense_script(c.glyph)) {
        "字/min"
    } else {
        "wpm"
    }
}

fn stats_line(stats: &RealtimeStats, unit: &str) -> String {
    format!(
        "{}   {} {}   {} keys/min   {}% acc   {}%",
        format_time(stats.duration_sec),
        stats.content_speed,
        unit,
        stats.keystroke_speed,
        stats.accuracy_pct,
        stats.progress_pct,
    )
}

impl App {
    fn render_typing(&self, area: Rect, buf: &mut Buffer, palette: &Palette) {
        let session = &self.session;
        let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);

        let lines = text_lines(session.characters(), palette);
        let single_line = lines.len() == 1 && lines[0].width() <= max_width as usize;
        let text_height = lines
            .iter()
            .map(|l| (l.width() as f64 / max_width as f64).ceil().max(1.0) as u16)
            .sum::<u16>();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // title
                Constraint::Length(1), // live stats
                Constraint::Length(1), // padding
                Constraint::Min(text_height),
                Constraint::Length(1), // composition preview
                Constraint::Length(1), // legend
            ])
            .split(area);

        let title = truncate_to_width(session.lesson_title(), max_width as usize);
        Paragraph::new(Span::styled(title, palette.bold))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(
            stats_line(session.stats(), speed_unit(session.characters())),
            palette.pending,
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(lines)
            .alignment(if single_line {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[3], buf);

        if self.adapter.is_composing() {
            Paragraph::new(Span::styled(
                format!("[{}]", self.adapter.preview()),
                Style::default().fg(Color::Yellow),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
        }

        let legend = match &self.notice {
            Some(notice) => Span::styled(notice.clone(), Style::default().fg(Color::Red)),
            None => Span::styled("(←) restart / (→) next lesson / (esc)ape", palette.italic),
        };
        Paragraph::new(legend).render(chunks[5], buf);
    }

    fn render_results(&self, area: Rect, buf: &mut Buffer, palette: &Palette) {
        let session = &self.session;
        let stats = self
            .last_record
            .as_ref()
            .map(|r| RealtimeStats {
                duration_sec: r.duration_sec,
                keystroke_speed: r.keystroke_speed,
                content_speed: r.content_speed,
                accuracy_pct: r.accuracy_pct,
                total_typed: r.total_typed,
                correct_count: r.correct_count,
                incorrect_count: r.incorrect_count,
                progress_pct: 100,
            })
            .unwrap_or(*session.stats());
        let grade = rank(stats.accuracy_pct, stats.content_speed, &self.grades);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1), // title
                Constraint::Length(1), // grade
                Constraint::Length(1), // stats
                Constraint::Length(1), // counts
                Constraint::Length(1), // lesson history
                Constraint::Min(1),
                Constraint::Length(1), // legend
            ])
            .split(area);

        let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2) as usize;
        Paragraph::new(Span::styled(
            truncate_to_width(session.lesson_title(), max_width),
            palette.bold,
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(Span::styled(
            grade.label,
            Style::default()
                .patch(palette.bold)
                .fg(tier_color(grade.tier)),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            format!(
                "{} {}   {} keys/min   {}% acc   {}",
                stats.content_speed,
                speed_unit(session.characters()),
                stats.keystroke_speed,
                stats.accuracy_pct,
                format_time(stats.duration_sec),
            ),
            palette.bold,
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        Paragraph::new(Span::styled(
            format!(
                "{} typed   {} correct   {} wrong",
                stats.total_typed, stats.correct_count, stats.incorrect_count
            ),
            palette.pending,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

        if let Some(history) = &self.lesson_stats {
            let summary = format!(
                "{} practices   best {}   avg {:.1}% acc",
                history.total_practices, history.best_speed, history.average_accuracy
            );
            Paragraph::new(Span::styled(
                summary,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
        }

        let legend = match &self.notice {
            Some(notice) => Span::styled(notice.clone(), Style::default().fg(Color::Red)),
            None => Span::styled("(r)etry / (n)ext / (esc)ape", palette.italic),
        };
        let legend_width = legend.content.as_ref().width();
        Paragraph::new(legend)
            .alignment(if legend_width < max_width {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .render(chunks[7], buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = Palette::new();
        match self.state {
            AppState::Typing => self.render_typing(area, buf, &palette),
            AppState::Results => self.render_results(area, buf, &palette),
        }
    }
}
