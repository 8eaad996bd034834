//! Ratatui-based terminal UI.
//!
//! The TUI provides a vehicle specification form on the left and the latest
//! estimate on the right. Inference only runs when the user submits the form.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use tracing::info;

use crate::app::pipeline::{InferencePipeline, PipelineError, Stage};
use crate::classify::HIGH_THRESHOLD;
use crate::domain::{EmissionTier, PredictionResult, VehicleSpec};
use crate::error::{AppError, EXIT_RUNTIME};

pub mod form;

use form::{FormField, FormState};

/// Upper end of the result gauge (g/km).
const GAUGE_MAX: f64 = HIGH_THRESHOLD + 100.0;

/// Start the TUI.
pub fn run(pipeline: InferencePipeline) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(pipeline);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode()
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(
                EXIT_RUNTIME,
                format!("Failed to enter alternate screen: {e}"),
            ));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Result of the last submission.
struct Submission {
    spec: VehicleSpec,
    outcome: Result<PredictionResult, PipelineError>,
}

struct App {
    pipeline: InferencePipeline,
    form: FormState,
    /// Text buffer while a numeric row is being typed into.
    editing: Option<String>,
    status: String,
    last: Option<Submission>,
    /// Form changed since the last submission.
    stale: bool,
}

impl App {
    fn new(pipeline: InferencePipeline) -> Self {
        let form = FormState::new(pipeline.registry());
        Self {
            pipeline,
            form,
            editing: None,
            status: "Fill in the form and press p to estimate.".to_string(),
            last: None,
            stale: false,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_RUNTIME, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns true when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing.is_some() {
            self.handle_numeric_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.form.select_prev(),
            KeyCode::Down | KeyCode::Tab => self.form.select_next(),
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::PageDown => self.adjust(-10),
            KeyCode::PageUp => self.adjust(10),
            KeyCode::Enter => {
                if self.form.field().numeric().is_some() {
                    self.editing = Some(String::new());
                    self.status = format!(
                        "Editing {}. Enter to apply, Esc to cancel.",
                        self.form.field().label()
                    );
                } else {
                    self.submit();
                }
            }
            KeyCode::Char('p') => self.submit(),
            KeyCode::Char('d') => self.write_debug_bundle(),
            // Lowercase p/d/q are commands; Shift+letter always jumps.
            KeyCode::Char(c) if c.is_ascii_alphanumeric() => {
                if self.form.jump_to_prefix(c) {
                    self.stale = self.last.is_some();
                }
            }
            _ => {}
        }

        false
    }

    fn handle_numeric_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.editing = None;
                let field = self.form.field();
                match self.form.set_numeric(field, &text) {
                    Ok(()) => {
                        self.stale = self.last.is_some();
                        self.status = format!("{}: {}", field.label(), self.form.value_text(field));
                    }
                    Err(message) => self.status = message,
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => buffer.push(c),
            _ => {}
        }
    }

    fn adjust(&mut self, delta: i32) {
        self.form.adjust(delta);
        self.stale = self.last.is_some();
        let field = self.form.field();
        self.status = format!("{}: {}", field.label(), self.form.value_text(field));
    }

    fn submit(&mut self) {
        let spec = self.form.to_spec();
        let outcome = self.pipeline.run_inference(&spec);
        self.status = match &outcome {
            Ok(result) => format!("Estimated {:.2} g/km.", result.value_grams_per_km),
            Err(err) => match err.stage() {
                Stage::Encoding => format!("Input rejected: {err}"),
                Stage::Inference => format!("Inference failed: {err}"),
            },
        };
        self.last = Some(Submission { spec, outcome });
        self.stale = false;
    }

    fn write_debug_bundle(&mut self) {
        let spec = self.form.to_spec();
        match crate::debug::write_debug_bundle(&self.pipeline, &spec) {
            Ok(path) => {
                info!(path = %path.display(), "wrote debug bundle");
                self.status = format!("Wrote debug bundle: {}", path.display());
            }
            Err(err) => self.status = format!("Debug write failed: {err}"),
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(vec![
                Span::styled("co2", Style::default().fg(Color::Cyan)),
                Span::raw(" - Vehicle carbon footprint estimator"),
            ]),
            Line::from(Span::styled(
                "Estimates tailpipe CO2 (g/km) from vehicle specifications. SDG 13: Climate Action.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        self.draw_form(frame, chunks[0]);
        self.draw_result(frame, chunks[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = FormField::ALL
            .iter()
            .enumerate()
            .map(|(idx, &field)| {
                let value = match &self.editing {
                    Some(buffer) if idx == self.form.selected() => format!("{buffer}_"),
                    _ => self.form.value_text(field),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<28}", field.label()),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::raw(value),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Vehicle specification").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.form.selected()));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_result(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = if self.stale {
            "Estimate (inputs changed, press p)"
        } else {
            "Estimate"
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(last) = &self.last else {
            let msg = Paragraph::new("No estimate yet.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let result = match &last.outcome {
            Ok(result) => result,
            Err(err) => {
                let heading = match err.stage() {
                    Stage::Encoding => "Input rejected",
                    Stage::Inference => "Inference failed",
                };
                let mut lines = vec![
                    Line::from(Span::styled(
                        heading,
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(err.to_string()),
                ];
                if !err.is_recoverable() {
                    lines.push(Line::from(Span::styled(
                        "The model and encoder artifacts do not match; every request will fail.",
                        Style::default().fg(Color::Red),
                    )));
                }
                let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
                frame.render_widget(p, inner);
                return;
            }
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner);

        let color = tier_color(result.tier);
        let mut lines = vec![
            Line::from(Span::styled(
                format!("{:.2} g/km", result.value_grams_per_km),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                result.tier.display_name(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(crate::report::tier_message(result.tier)),
        ];
        if let Some(advice) = crate::report::tier_advice(result.tier) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                advice,
                Style::default().add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "{} {} | {} | fuel {}",
                last.spec.make, last.spec.vehicle_class, last.spec.transmission, last.spec.fuel_type_code
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
        frame.render_widget(p, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::TOP))
            .gauge_style(Style::default().fg(color))
            .ratio(gauge_ratio(result.value_grams_per_km))
            .label(format!("{:.0} / {:.0} g/km", result.value_grams_per_km, GAUGE_MAX));
        frame.render_widget(gauge, chunks[1]);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ field  ←/→ adjust  PgUp/PgDn x10  Enter edit/submit  A-Z jump  p predict  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn tier_color(tier: EmissionTier) -> Color {
    match tier {
        EmissionTier::Low => Color::Green,
        EmissionTier::Medium => Color::Yellow,
        EmissionTier::High => Color::Red,
    }
}

fn gauge_ratio(value: f64) -> f64 {
    (value / GAUGE_MAX).clamp(0.0, 1.0)
}
