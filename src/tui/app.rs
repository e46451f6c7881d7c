use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use log::{debug, warn};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::AppConfig;
use crate::models::{CompletionRecord, Frequency, Habit, RankedHabit, StreakSummary};
use crate::session::Session;
use crate::store::{
    ChangeEvent, Collection, CompletionStore, HabitStore, NewHabit, SqliteStore, Subscription,
};
use crate::streaks::{RankOrder, compute_streaks, rank_habits, same_period};
use crate::tui::events::{Event, EventHandler};
use crate::tui::theme;
use crate::tui::widgets::habits::HabitLine;
use crate::tui::widgets::header::Progress;
use crate::tui::widgets::statusbar::Notice;
use crate::tui::widgets::{habits, header, ranking, statusbar, streak};

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Dashboard,
    Ranking,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    NewHabit,
    ConfirmDelete,
}

pub struct App {
    pub view: View,
    pub config: AppConfig,
    pub session: Session,
    pub focus_idx: usize,
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub input_frequency: Frequency,
    pub notice: Option<Notice>,
    pub rank_order: RankOrder,

    // Cached state, reloaded when the change feed reports something
    pub habits: Vec<Habit>,
    pub completions: Vec<CompletionRecord>,
    pub ranked: Vec<RankedHabit>,

    dirty: Arc<AtomicBool>,
    subscriptions: Vec<Subscription>,
}

impl App {
    pub fn new(store: &SqliteStore, session: Session, config: AppConfig) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let subscriptions = [Collection::Habits, Collection::Completions]
            .into_iter()
            .map(|collection| {
                let flag = Arc::clone(&dirty);
                store.subscribe(
                    collection,
                    Box::new(move |event: &ChangeEvent| {
                        debug!(
                            "{:?} {:?} on {}, reloading",
                            event.kind,
                            event.collection,
                            event.document_id.as_deref().unwrap_or("several documents")
                        );
                        flag.store(true, Ordering::SeqCst);
                    }),
                )
            })
            .collect();

        App {
            view: View::Dashboard,
            rank_order: config.display.rank_order,
            config,
            session,
            focus_idx: 0,
            should_quit: false,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            input_frequency: Frequency::Daily,
            notice: None,
            habits: Vec::new(),
            completions: Vec::new(),
            ranked: Vec::new(),
            dirty,
            subscriptions,
        }
    }

    pub fn load(&mut self, store: &SqliteStore) -> Result<()> {
        self.habits = store.list_habits(&self.session.user_id)?;
        self.completions = store.list_completions(&self.session.user_id)?;
        self.rerank();
        self.focus_idx = self.focus_idx.min(self.habits.len().saturating_sub(1));
        Ok(())
    }

    fn rerank(&mut self) {
        let streak = &self.config.streak;
        self.ranked = rank_habits(
            &self.habits,
            &self.completions,
            |f| streak.policy_for(f),
            self.rank_order,
        );
    }

    /// Reload if a subscribed change arrived since the last load.
    pub fn refresh_if_dirty(&mut self, store: &SqliteStore) {
        if self.dirty.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.load(store) {
                warn!("reload failed: {:#}", e);
                self.notice = Some(Notice::Error(format!("{:#}", e)));
            }
        }
    }

    pub fn tick(&mut self, store: &SqliteStore) {
        if let Err(e) = store.poll_external() {
            warn!("checking for external changes failed: {:#}", e);
        }
        self.refresh_if_dirty(store);
    }

    pub fn summary_for(&self, habit: &Habit) -> StreakSummary {
        let policy = self.config.streak.policy_for(habit.frequency);
        compute_streaks(&self.completions, &habit.id, &policy)
    }

    pub fn is_done_now(&self, habit: &Habit) -> bool {
        let offset = self.config.streak.offset();
        let now = Utc::now();
        self.completions
            .iter()
            .any(|c| c.habit_id == habit.id && same_period(c.completed_at, now, offset, habit.frequency))
    }

    /// Stop listening to the store. Later changes no longer mark the app dirty.
    pub fn detach(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.cancel();
        }
    }

    pub fn focused_habit(&self) -> Option<&Habit> {
        self.habits.get(self.focus_idx)
    }

    pub fn handle_key(&mut self, key: KeyEvent, store: &SqliteStore) {
        // Some terminals also report release and repeat events
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.input_mode {
            InputMode::NewHabit => self.handle_new_habit_input(key, store),
            InputMode::ConfirmDelete => self.handle_confirm_delete(key, store),
            InputMode::Normal => {
                self.notice = None;
                match self.view {
                    View::Dashboard => self.handle_dashboard_key(key, store),
                    View::Ranking => self.handle_ranking_key(key),
                    View::Help => self.handle_help_key(key),
                }
            }
        }
        self.refresh_if_dirty(store);
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent, store: &SqliteStore) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.view = View::Help;
            }
            KeyCode::Char('s') => {
                self.view = View::Ranking;
            }
            KeyCode::Char('o') => {
                self.toggle_order();
            }
            KeyCode::Char('a') => {
                self.input_mode = InputMode::NewHabit;
                self.input_buffer.clear();
                self.input_frequency = Frequency::Daily;
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if self.focused_habit().is_some() {
                    self.input_mode = InputMode::ConfirmDelete;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.focus_idx = self.focus_idx.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.focus_idx + 1 < self.habits.len() {
                    self.focus_idx += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('m') | KeyCode::Char(' ') => {
                self.complete_focused(store);
            }
            _ => {}
        }
    }

    fn handle_ranking_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('s') => {
                self.view = View::Dashboard;
            }
            KeyCode::Char('o') => {
                self.toggle_order();
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') => {
                self.view = View::Dashboard;
            }
            _ => {}
        }
    }

    fn toggle_order(&mut self) {
        self.rank_order = self.rank_order.toggled();
        self.rerank();
    }

    fn handle_new_habit_input(&mut self, key: KeyEvent, store: &SqliteStore) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Tab => {
                let all = Frequency::all();
                let pos = all.iter().position(|f| *f == self.input_frequency).unwrap_or(0);
                self.input_frequency = all[(pos + 1) % all.len()];
            }
            KeyCode::Enter => {
                let draft = NewHabit {
                    title: self.input_buffer.trim().to_string(),
                    description: String::new(),
                    frequency: self.input_frequency,
                };
                match store.create_habit(&self.session, draft) {
                    Ok(habit) => {
                        self.notice = Some(Notice::Info(format!("✓ Added {}", habit.title)));
                        self.input_mode = InputMode::Normal;
                        self.input_buffer.clear();
                    }
                    Err(e) => {
                        self.notice = Some(Notice::Error(e.to_string()));
                    }
                }
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                self.notice = None;
            }
            _ => {}
        }
    }

    fn handle_confirm_delete(&mut self, key: KeyEvent, store: &SqliteStore) {
        self.input_mode = InputMode::Normal;
        if !matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            return;
        }
        let Some(habit) = self.focused_habit().cloned() else {
            return;
        };
        match store.delete_habit(&self.session, &habit.id) {
            Ok(()) => self.notice = Some(Notice::Info(format!("Deleted {}", habit.title))),
            Err(e) => {
                warn!("delete failed: {:#}", e);
                self.notice = Some(Notice::Error(e.to_string()));
            }
        }
    }

    fn complete_focused(&mut self, store: &SqliteStore) {
        let Some(habit) = self.focused_habit().cloned() else {
            return;
        };
        match store.record_completion(&self.session, &habit, Utc::now()) {
            Ok(_) => self.notice = Some(Notice::Info(format!("✓ {} done", habit.title))),
            Err(e) => self.notice = Some(Notice::Error(e.to_string())),
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        match self.view {
            View::Dashboard => self.draw_dashboard(frame),
            View::Ranking => self.draw_ranking(frame),
            View::Help => {
                self.draw_dashboard(frame);
                self.draw_help_overlay(frame);
            }
        }

        match self.input_mode {
            InputMode::NewHabit => self.draw_new_habit(frame),
            InputMode::ConfirmDelete => self.draw_confirm_delete(frame),
            InputMode::Normal => {}
        }
    }

    fn draw_dashboard(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(theme::base()), area);

        let outer_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // header
                Constraint::Min(0),    // body
                Constraint::Length(1), // status bar
            ])
            .split(area);

        let lines: Vec<HabitLine> = self
            .habits
            .iter()
            .map(|habit| HabitLine {
                habit,
                done: self.is_done_now(habit),
                streak: self.summary_for(habit).streak,
            })
            .collect();
        let done = lines.iter().filter(|l| l.done).count();

        let offset = self.config.streak.offset();
        let date_str = Utc::now().with_timezone(&offset).format("%A, %b %d, %Y").to_string();
        let progress = Progress {
            done,
            total: lines.len(),
        };
        header::render(frame, outer_chunks[0], &self.session.name, &date_str, progress);
        statusbar::render(
            frame,
            outer_chunks[2],
            self.notice.as_ref(),
            statusbar::DASHBOARD_HINTS,
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(outer_chunks[1]);

        habits::render(frame, columns[0], &lines, self.focus_idx);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(8), // streak badges
                Constraint::Min(0),    // ranking
            ])
            .split(columns[1]);

        let focused = self.focused_habit().map(|h| (h, self.summary_for(h)));
        streak::render(
            frame,
            right_chunks[0],
            focused.as_ref().map(|(h, s)| (*h, s)),
        );
        ranking::render(frame, right_chunks[1], &self.ranked, self.rank_order);
    }

    fn draw_ranking(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(theme::base()), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let title = Paragraph::new(Line::from(vec![
            Span::styled("  Habit Streaks", theme::accent().add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {} habits", self.ranked.len()), theme::dim()),
        ]));
        frame.render_widget(title, chunks[0]);
        ranking::render(frame, chunks[1], &self.ranked, self.rank_order);
        statusbar::render(frame, chunks[2], self.notice.as_ref(), statusbar::RANKING_HINTS);
    }

    fn draw_help_overlay(&self, frame: &mut Frame) {
        let area = frame.area();

        let popup_area = Rect {
            x: area.width / 4,
            y: area.height / 4,
            width: area.width / 2,
            height: (area.height / 2).max(12).min(area.height),
        };

        frame.render_widget(Clear, popup_area);

        let bindings = [
            ("  [Enter] / m  ", "Mark habit done"),
            ("  [a]          ", "Add a habit"),
            ("  [x]          ", "Delete habit"),
            ("  [s]          ", "Streak ranking"),
            ("  [o]          ", "Flip ranking order"),
            ("  [↑ ↓] / k j  ", "Navigate"),
            ("  [?]          ", "Toggle help"),
            ("  [Esc] / q    ", "Quit"),
        ];

        let mut help_text = vec![
            Line::from(Span::styled(
                "  Keybindings",
                theme::accent().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for (key, label) in bindings {
            help_text.push(Line::from(vec![
                Span::styled(key, theme::accent()),
                Span::styled(label, theme::dim()),
            ]));
        }

        let block = Block::default()
            .title(Span::styled(" Help ", theme::accent()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::accent())
            .style(theme::surface());

        let paragraph = Paragraph::new(help_text).block(block);
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_new_habit(&self, frame: &mut Frame) {
        let area = frame.area();
        let error = matches!(self.notice, Some(Notice::Error(_)));
        let height = if error { 8 } else { 6 };

        let popup_area = Rect {
            x: area.width / 4,
            y: (area.height / 2).saturating_sub(3),
            width: area.width / 2,
            height: height.min(area.height),
        };

        frame.render_widget(Clear, popup_area);

        let mut text = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Title: ", theme::dim()),
                Span::styled(self.input_buffer.as_str(), theme::accent().add_modifier(Modifier::BOLD)),
                Span::styled("█", theme::best()), // block cursor
            ]),
            Line::from(vec![
                Span::styled("  Frequency: ", theme::dim()),
                Span::styled(self.input_frequency.display_name(), theme::best()),
                Span::styled("  [Tab] change", theme::dim()),
            ]),
            Line::from(Span::styled(
                "  [Enter] add  ·  [Esc] cancel",
                theme::dim(),
            )),
        ];

        if let Some(Notice::Error(err)) = &self.notice {
            text.push(Line::from(""));
            text.push(Line::from(Span::styled(format!("  ✗ {}", err), theme::error())));
        }

        let block = Block::default()
            .title(Span::styled(" New Habit ", theme::accent()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if error { theme::error() } else { theme::best() })
            .style(theme::surface());

        let paragraph = Paragraph::new(text).block(block);
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_confirm_delete(&self, frame: &mut Frame) {
        let Some(habit) = self.focused_habit() else {
            return;
        };
        let area = frame.area();
        let popup_area = Rect {
            x: area.width / 4,
            y: (area.height / 2).saturating_sub(2),
            width: area.width / 2,
            height: 5u16.min(area.height),
        };
        frame.render_widget(Clear, popup_area);

        let text = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Delete ", theme::dim()),
                Span::styled(habit.title.as_str(), theme::bold()),
                Span::styled(" and its history?  ", theme::dim()),
                Span::styled("[y] yes", theme::error()),
                Span::styled("  [any] no", theme::dim()),
            ]),
        ];

        let block = Block::default()
            .title(Span::styled(" Delete ", theme::error()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::error())
            .style(theme::surface());

        frame.render_widget(Paragraph::new(text).block(block), popup_area);
    }
}

/// Run the TUI event loop.
pub fn run(store: SqliteStore, session: Session, config: AppConfig) -> Result<()> {
    let mut app = App::new(&store, session, config);
    app.load(&store)?;

    let mut terminal = ratatui::init();
    let events = EventHandler::new(Duration::from_millis(1000));

    let result = (|| -> Result<()> {
        loop {
            terminal.draw(|frame| app.draw(frame))?;

            match events.next()? {
                Event::Key(key) => {
                    app.handle_key(key, &store);
                    if app.should_quit {
                        return Ok(());
                    }
                }
                Event::Resize => {}
                Event::Tick => app.tick(&store),
            }
        }
    })();

    ratatui::restore();
    app.detach();

    // Remember the ranking order the user left the dashboard with
    if app.rank_order != app.config.display.rank_order {
        app.config.display.rank_order = app.rank_order;
        if let Err(e) = app.config.save() {
            warn!("could not save config: {:#}", e);
        }
    }
    result
}
