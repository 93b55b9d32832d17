use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pairwise_core::{KvStore, Session, Stage, Step};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PickLeft,
    PickRight,
    Skip,
    Cancel,
    Quit,
    ToggleHelp,
}

/// How the comparison screen was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Finished,
    Cancelled,
    Paused,
}

pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('1') | KeyCode::Left | KeyCode::Char('h') => Some(Action::PickLeft),
        KeyCode::Char('2') | KeyCode::Right | KeyCode::Char('l') => Some(Action::PickRight),
        KeyCode::Char('s') | KeyCode::Char(' ') => Some(Action::Skip),
        KeyCode::Char('c') => Some(Action::Cancel),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

/// Apply one decision. Returns `Some(exit)` when the screen should close.
pub fn apply(session: &mut Session, action: Action) -> Option<Exit> {
    let step = match action {
        Action::PickLeft | Action::PickRight => {
            let Some((left, right)) = session.current_pair() else {
                warn!("no resolvable pair at cursor; skipping");
                return finished(session.skip());
            };
            let id = if action == Action::PickLeft { left.id } else { right.id };
            session.choose(id)
        }
        Action::Skip => session.skip(),
        Action::Cancel => {
            session.cancel();
            return Some(Exit::Cancelled);
        }
        Action::Quit => return Some(Exit::Paused),
        Action::ToggleHelp => return None,
    };
    finished(step)
}

/// Skip past pairs whose tasks cannot be resolved.
pub fn skip_unresolvable(session: &mut Session) -> Option<Exit> {
    while session.stage() == Stage::Comparing && session.current_pair().is_none() {
        warn!(cursor = session.engine().cursor(), "unresolvable pair; skipping");
        if session.skip() == Step::Finished {
            return Some(Exit::Finished);
        }
    }
    None
}

fn finished(step: Step) -> Option<Exit> {
    (step == Step::Finished).then_some(Exit::Finished)
}

pub fn run_compare<S: KvStore + ?Sized>(session: &mut Session, store: &mut S) -> Result<Exit> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = compare_loop(&mut terminal, session, store);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn compare_loop<S: KvStore + ?Sized>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut Session,
    store: &mut S,
) -> Result<Exit> {
    let mut show_help = true;

    loop {
        if let Some(exit) = skip_unresolvable(session) {
            session.save(store)?;
            return Ok(exit);
        }

        terminal.draw(|f| draw(f, session, show_help))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = action_for(key.code) else { continue };
        if action == Action::ToggleHelp {
            show_help = !show_help;
            continue;
        }

        let exit = apply(session, action);
        // Persist every decision so a crash loses nothing.
        session.save(store)?;
        if let Some(exit) = exit {
            return Ok(exit);
        }
    }
}

fn draw(f: &mut Frame, session: &Session, show_help: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(if show_help { 4 } else { 0 }),
        ])
        .split(f.area());

    let title = Paragraph::new(Line::from(Span::styled(
        "Which task should be done first?",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("pairwise"));
    f.render_widget(title, chunks[0]);

    let engine = session.engine();
    let label = format!(
        "{} of {} comparisons",
        (engine.cursor() + 1).min(engine.total()),
        engine.total()
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("progress"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(session.percent_done() as u16)
        .label(label);
    f.render_widget(gauge, chunks[1]);

    let sides = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    if let Some((left, right)) = session.current_pair() {
        for (area, key, task) in [(sides[0], "1", left), (sides[1], "2", right)] {
            let card = Paragraph::new(Text::from(vec![
                Line::raw(""),
                Line::from(Span::styled(
                    task.text.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
            ]))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Magenta))
                    .title(format!("[{key}]")),
            );
            f.render_widget(card, area);
        }
    }

    if show_help {
        let help = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "1/← pick left   2/→ pick right   s/space can't decide",
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                "c cancel run   q pause (progress is saved)   ? toggle help",
                Style::default().fg(Color::Gray),
            )),
        ]))
        .block(Block::default().borders(Borders::ALL).title("keys"));
        f.render_widget(help, chunks[3]);
    }
}
