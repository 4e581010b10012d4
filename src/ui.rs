use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use golden_hour::{
    AppConfig, Assessment, GuidanceBuilder, IntakeSession, SeverityClassifier, Transcriber,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::fs;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Checklist,
    Text,
    Voice,
}

impl InputMode {
    pub fn title(&self) -> &str {
        match self {
            InputMode::Checklist => " Checklist ",
            InputMode::Text => " Describe symptoms (Enter to add, Esc to cancel) ",
            InputMode::Voice => " Path to WAV recording (Enter to transcribe, Esc to cancel) ",
        }
    }
}

pub struct App {
    pub session: IntakeSession,
    pub checklist: Vec<String>,
    pub checked: Vec<bool>,
    pub state: TableState,
    pub mode: InputMode,
    pub input: String,
    pub status: Option<String>,
    classifier: SeverityClassifier,
    guidance: GuidanceBuilder,
    transcriber: Box<dyn Transcriber>,
}

impl App {
    pub fn new(config: AppConfig, transcriber: Box<dyn Transcriber>) -> Self {
        let checklist = config.checklist_labels();

        let mut state = TableState::default();
        if !checklist.is_empty() {
            state.select(Some(0));
        }

        Self {
            session: IntakeSession::new(),
            checked: vec![false; checklist.len()],
            checklist,
            state,
            mode: InputMode::Checklist,
            input: String::new(),
            status: None,
            classifier: config.classifier(),
            guidance: config.guidance(),
            transcriber,
        }
    }

    pub fn assessment(&self) -> Option<Assessment> {
        self.session.assess(&self.classifier, &self.guidance)
    }

    pub fn next(&mut self) {
        let len = self.checklist.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.checklist.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Flip the highlighted checkbox and push the new selection to the session
    pub fn toggle_selected(&mut self) {
        let Some(i) = self.state.selected() else {
            return;
        };
        if let Some(flag) = self.checked.get_mut(i) {
            *flag = !*flag;
        }

        let selection: Vec<&String> = self
            .checklist
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(label, _)| label)
            .collect();
        self.session.select_checklist(selection);
    }

    pub fn start_input(&mut self, mode: InputMode) {
        self.mode = mode;
        self.input.clear();
        self.status = None;
    }

    pub fn cancel_input(&mut self) {
        self.mode = InputMode::Checklist;
        self.input.clear();
    }

    pub fn submit_input(&mut self) {
        let input = std::mem::take(&mut self.input);

        self.status = match self.mode {
            InputMode::Checklist => None,
            InputMode::Text => {
                let added = self.session.add_text(&input);
                Some(added_message(&added))
            }
            InputMode::Voice => match fs::read(input.trim()) {
                Ok(wav) => match self.session.add_voice(self.transcriber.as_ref(), wav) {
                    Ok(added) => Some(added_message(&added)),
                    Err(warning) => Some(format!("⚠ {}", warning)),
                },
                Err(e) => Some(format!("⚠ Could not open {}: {}", input.trim(), e)),
            },
        };

        self.mode = InputMode::Checklist;
    }

    pub fn trigger_panic(&mut self) {
        self.session.trigger_panic();
    }
}

fn added_message(added: &[String]) -> String {
    if added.is_empty() {
        "No new symptoms".to_string()
    } else {
        format!("Added: {}", added.join(", "))
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.mode {
            InputMode::Checklist => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char(' ') | KeyCode::Enter => app.toggle_selected(),
                KeyCode::Char('t') => app.start_input(InputMode::Text),
                KeyCode::Char('v') => app.start_input(InputMode::Voice),
                KeyCode::Char('p') => app.trigger_panic(),
                _ => {}
            },
            InputMode::Text | InputMode::Voice => match key.code {
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Enter => app.submit_input(),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Checklist + report
            Constraint::Length(3), // Input / status bar
        ])
        .split(f.size());

    let assessment = app.assessment();

    render_header(f, chunks[0], assessment.as_ref());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40), // Checklist
            Constraint::Percentage(60), // Report panel
        ])
        .split(chunks[1]);

    render_checklist(f, content_chunks[0], app);
    render_report(f, content_chunks[1], app, assessment.as_ref());
    render_status_bar(f, chunks[2], app);
}

fn tier_color(assessment: Option<&Assessment>) -> Color {
    match assessment {
        Some(a) if a.severity.is_severe() => Color::Red,
        Some(_) => Color::Yellow,
        None => Color::DarkGray,
    }
}

fn render_header(f: &mut Frame, area: Rect, assessment: Option<&Assessment>) {
    let mut spans = vec![
        Span::styled(
            "🚨 Golden Hour",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
    ];

    match assessment {
        Some(a) => spans.push(Span::styled(
            a.guidance.headline.clone(),
            Style::default()
                .fg(tier_color(assessment))
                .add_modifier(Modifier::BOLD),
        )),
        None => spans.push(Span::styled(
            "What is the emergency?",
            Style::default().fg(Color::White),
        )),
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_checklist(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.checklist.iter().zip(&app.checked).map(|(label, checked)| {
        let mark = if *checked { "[x]" } else { "[ ]" };
        Row::new(vec![Cell::from(mark), Cell::from(label.clone())]).height(1)
    });

    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(10)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(InputMode::Checklist.title()),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_report(f: &mut Frame, area: Rect, app: &App, assessment: Option<&Assessment>) {
    let mut lines: Vec<Line> = Vec::new();

    match assessment {
        Some(a) => {
            lines.push(Line::from(Span::styled(
                a.guidance.headline.clone(),
                Style::default()
                    .fg(tier_color(assessment))
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            for action in &a.guidance.actions {
                lines.push(Line::from(format!("• {}", action)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Reported symptoms",
                Style::default().fg(Color::Yellow),
            )));
            for symptom in &a.symptoms {
                let style = if a.severe_symptoms.contains(symptom) {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default().fg(Color::White)
                };
                lines.push(Line::from(Span::styled(format!("  {}", symptom), style)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("🧭 ", Style::default()),
                Span::styled(
                    a.guidance.maps_link.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
                ),
            ]));

            if let Some(panic) = &a.panic_instructions {
                lines.push(Line::from(""));
                for instruction in panic {
                    lines.push(Line::from(Span::styled(
                        instruction.clone(),
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Red)
                            .add_modifier(Modifier::BOLD),
                    )));
                }
            }
        }
        None => {
            lines.push(Line::from("No symptoms reported yet."));
            lines.push(Line::from(""));
            lines.push(Line::from("Tick the checklist, press 't' to type, or 'v' for a recording."));
            if app.session.panic_active() {
                lines.push(Line::from(""));
                for instruction in app.guidance.panic_instructions() {
                    lines.push(Line::from(Span::styled(
                        instruction,
                        Style::default().fg(Color::White).bg(Color::Red),
                    )));
                }
            }
        }
    }

    let report = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(tier_color(assessment)))
                .title(" Guidance "),
        );

    f.render_widget(report, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (title, text) = match app.mode {
        InputMode::Checklist => (
            " Keys ",
            app.status.clone().unwrap_or_else(|| {
                "↑↓ move | Space toggle | t type | v voice | p PANIC | q quit".to_string()
            }),
        ),
        InputMode::Text | InputMode::Voice => (app.mode.title(), format!("{}█", app.input)),
    };

    let bar = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(bar, area);
}
