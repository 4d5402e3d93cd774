//! TUI Application - main event loop and terminal management
//!
//! This module contains the core TUI application logic including:
//! - Terminal setup and restoration
//! - Driving the bootstrap clone while keeping the screen responsive
//! - Event loop for keyboard input
//! - Tagging, filtering and opening patches

use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::status::StatusLine;
use super::views::{PatchListView, PatchRow, category_color};
use crate::bootstrap::{self, BootstrapTask};
use crate::config::ResolvedConfig;
use crate::filter::Filter;
use crate::logging;
use crate::models::Category;
use crate::session::Session;
use crate::sys;

/// How long to wait for input before redrawing
const TICK: Duration = Duration::from_millis(100);

/// Rows moved by PageUp/PageDown
const PAGE: usize = 10;

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// What the main area shows
enum Screen {
    /// Waiting for the patch source to be fetched
    Bootstrap(BootstrapTask),
    /// Tagging patches
    Patches(Session),
    /// Startup failed; nothing to do but read the message and quit
    Failed(crate::Error),
}

/// TUI Application state
pub struct TuiApp {
    config: ResolvedConfig,
    screen: Screen,
    /// Filter applied once the session is opened
    initial_filter: Filter,
    patch_list: PatchListView,
    status: StatusLine,
    /// Whether to quit the application
    should_quit: bool,
    /// Patch waiting to be opened by the event loop
    pending_open: Option<PathBuf>,
    /// Last key pressed (for gg detection)
    last_key: Option<KeyCode>,
}

impl TuiApp {
    /// Create the application, starting the clone if the patches are missing
    pub fn new(config: ResolvedConfig, initial_filter: Filter) -> Self {
        let screen = if bootstrap::needs_bootstrap(config.patches_dir()) {
            match bootstrap::start_clone(&config, true) {
                Ok(task) => Screen::Bootstrap(task),
                Err(e) => Screen::Failed(e),
            }
        } else {
            Self::open_session(&config)
        };
        Self::with_screen(config, screen, initial_filter)
    }

    fn with_screen(config: ResolvedConfig, screen: Screen, initial_filter: Filter) -> Self {
        let mut app = Self {
            config,
            screen,
            initial_filter,
            patch_list: PatchListView::new(),
            status: StatusLine::new(),
            should_quit: false,
            pending_open: None,
            last_key: None,
        };
        app.enter_patches();
        app
    }

    fn open_session(config: &ResolvedConfig) -> Screen {
        let session = bootstrap::verify_patches_dir(config.patches_dir())
            .and_then(|dir| Session::open(&dir, config.tags_file()));
        match session {
            Ok(session) => Screen::Patches(session),
            Err(e) => Screen::Failed(e),
        }
    }

    /// Apply the initial filter once a session is available
    fn enter_patches(&mut self) {
        if let Screen::Patches(ref mut session) = self.screen {
            session.set_filter(self.initial_filter);
            tracing::info!(
                patches = session.catalog().len(),
                tags = session.tags().len(),
                "session opened"
            );
        }
        self.refresh_list();
    }

    /// Advance background work. Called once per tick.
    fn tick(&mut self) {
        let done = match self.screen {
            Screen::Bootstrap(ref mut task) => task.poll(),
            _ => return,
        };
        match done {
            Ok(false) => {}
            Ok(true) => {
                self.screen = Self::open_session(&self.config);
                self.enter_patches();
            }
            Err(e) => {
                tracing::error!(error = %e, "bootstrap failed");
                self.screen = Screen::Failed(e);
            }
        }
    }

    /// Rebuild the list rows from the session
    fn refresh_list(&mut self) {
        let Screen::Patches(ref session) = self.screen else {
            return;
        };
        let rows = session
            .visible()
            .map(|patch| PatchRow {
                file_name: patch.file_name.clone(),
                tags: session.categories_of(patch),
            })
            .collect();
        self.patch_list.title = format!(
            "Filter: {} ({} of {})",
            session.filter(),
            session.visible_len(),
            session.catalog().len()
        );
        self.patch_list.update_items(rows);
    }

    /// Handle keyboard events
    fn handle_key(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Char('q') | KeyCode::Esc) {
            self.quit();
            return;
        }
        if matches!(self.screen, Screen::Patches(_)) {
            self.handle_patches_key(key);
        }
    }

    fn quit(&mut self) {
        if let Screen::Bootstrap(ref mut task) = self.screen {
            // The next run removes the partial checkout and clones again
            let cancelled = task.cancel().and_then(|()| task.poll());
            if let Err(e) = cancelled {
                self.screen = Screen::Failed(e);
            }
        }
        self.should_quit = true;
    }

    /// How the session ended: startup failures become the exit error
    fn into_result(self) -> crate::Result<()> {
        match self.screen {
            Screen::Failed(e) => Err(e),
            Screen::Patches(ref session) => {
                tracing::info!(tags = session.tags().len(), "tui closed");
                Ok(())
            }
            Screen::Bootstrap(_) => Ok(()),
        }
    }

    fn handle_patches_key(&mut self, key: KeyCode) {
        match key {
            // Navigation
            KeyCode::Char('j') | KeyCode::Down => self.patch_list.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.patch_list.select_previous(),
            KeyCode::Char('g') => {
                // Check for gg sequence
                if self.last_key == Some(KeyCode::Char('g')) {
                    self.patch_list.select_first();
                    self.last_key = None;
                    return;
                }
            }
            KeyCode::Char('G') | KeyCode::End => self.patch_list.select_last(),
            KeyCode::Home => self.patch_list.select_first(),
            KeyCode::PageDown => self.patch_list.page_down(PAGE),
            KeyCode::PageUp => self.patch_list.page_up(PAGE),
            // Filtering
            KeyCode::Tab | KeyCode::Char('/') => self.cycle_filter(),
            KeyCode::Char('0') => self.set_filter(Filter::All),
            KeyCode::Char('u') => self.set_filter(Filter::Untagged),
            KeyCode::Enter => self.request_open(),
            KeyCode::Char(c) => {
                if let Some(category) = Category::by_shortcut(c) {
                    self.toggle(category);
                }
            }
            _ => {}
        }
        self.last_key = Some(key);
    }

    fn cycle_filter(&mut self) {
        if let Screen::Patches(ref session) = self.screen {
            let next = session.filter().next();
            self.set_filter(next);
        }
    }

    fn set_filter(&mut self, filter: Filter) {
        let Screen::Patches(ref mut session) = self.screen else {
            return;
        };
        let count = session.set_filter(filter);
        self.status.info(format!("Filter: {} ({} patches)", filter, count));
        self.patch_list.select_first();
        self.refresh_list();
    }

    fn toggle(&mut self, category: Category) {
        let Some(index) = self.patch_list.selected_index() else {
            return;
        };
        let Screen::Patches(ref mut session) = self.screen else {
            return;
        };
        let file_name = self
            .patch_list
            .selected_item()
            .map(|row| row.file_name.clone())
            .unwrap_or_default();

        match session.toggle_tag(index, category) {
            Ok(tags) => {
                let verb = if tags.contains(category) { "Tagged" } else { "Untagged" };
                self.status
                    .success(format!("{} {} as {}", verb, file_name, category.name()));
            }
            // The change is kept in memory; the next successful save writes it
            Err(e) => self.status.error(format!("Could not save tags: {}", e)),
        }
        self.refresh_list();
    }

    fn request_open(&mut self) {
        let Some(index) = self.patch_list.selected_index() else {
            return;
        };
        if let Screen::Patches(ref session) = self.screen {
            match session.patch_path(index) {
                Ok(path) => self.pending_open = Some(path),
                Err(e) => self.status.error(e.to_string()),
            }
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Create main layout
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title bar
                Constraint::Min(5),    // Main content
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_title_bar(frame, chunks[0]);

        match self.screen {
            Screen::Bootstrap(ref task) => render_bootstrap(frame, chunks[1], task),
            Screen::Patches(_) => self.patch_list.render(frame, chunks[1]),
            Screen::Failed(ref error) => render_failure(frame, chunks[1], &error.to_string()),
        }

        self.render_status_bar(frame, chunks[2]);
    }

    /// Render the title bar with the category legend
    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " Patch Sorter ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if matches!(self.screen, Screen::Patches(_)) {
            spans.push(Span::raw(" "));
            for category in Category::all() {
                spans.push(Span::styled(
                    format!(" {}:{}", category.shortcut(), category.code()),
                    Style::default().fg(category_color(*category)),
                ));
            }
        }

        let title = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    /// Render the status bar with the latest message or keybindings
    fn render_status_bar(&mut self, frame: &mut Frame, area: Rect) {
        let status = match self.status.current() {
            Some(message) => Paragraph::new(format!(" {}", message.display()))
                .style(Style::default().fg(message.level.color())),
            None => {
                let hint = match self.screen {
                    Screen::Bootstrap(_) => " q:Cancel",
                    Screen::Patches(_) => {
                        " j/k:Navigate  gg/G:Top/Bottom  a/p/f/s/t/o:Toggle tag  Tab:Filter  u:Untagged  0:All  Enter:Open  q:Quit"
                    }
                    Screen::Failed(_) => " q:Quit",
                };
                Paragraph::new(hint).style(Style::default().fg(Color::DarkGray))
            }
        };
        frame.render_widget(status.block(Block::default().borders(Borders::ALL)), area);
    }
}

fn render_bootstrap(frame: &mut Frame, area: Rect, task: &BootstrapTask) {
    let elapsed = task.elapsed();
    let frame_index = (elapsed.as_millis() / TICK.as_millis()) as usize % SPINNER.len();
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!(" {} ", SPINNER[frame_index]),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(format!("{}...", task.description())),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}s elapsed", elapsed.as_secs()),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let paragraph =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Bootstrap "));
    frame.render_widget(paragraph, area);
}

fn render_failure(frame: &mut Frame, area: Rect, message: &str) {
    let paragraph = Paragraph::new(format!("\n {}", message))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Error "));
    frame.render_widget(paragraph, area);
}

/// Setup the terminal for TUI mode
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to normal mode
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Open a patch, handing the terminal to the opener if it needs it
fn open_patch(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    path: PathBuf,
) -> io::Result<()> {
    let opener = sys::resolve_opener(app.config.editor());
    if opener.interactive {
        restore_terminal()?;
    }
    let result = sys::open_path(&opener, &path);
    if opener.interactive {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        terminal.clear()?;
    }
    match result {
        Ok(()) => app.status.info(format!("Opened {}", path.display())),
        Err(e) => app.status.error(e.to_string()),
    }
    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> io::Result<()> {
    while !app.should_quit {
        app.tick();
        terminal.draw(|f| app.render(f))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if is_interrupt(&key) {
                        app.quit();
                    } else {
                        app.handle_key(key.code);
                    }
                }
            }
        }

        if let Some(path) = app.pending_open.take() {
            open_patch(terminal, app, path)?;
        }
    }
    Ok(())
}

/// Run the TUI application
///
/// Logs go to a daily file under the data directory since the terminal is
/// taken over. If the patches directory is missing, the clone starts
/// immediately and the patch list appears once it succeeds.
///
/// # Errors
/// Returns an error if the terminal cannot be set up or drawn to, or if
/// startup failed (including a failed or cancelled clone) once the user quits.
pub fn run_tui(config: &ResolvedConfig, filter: Filter) -> crate::Result<()> {
    let _log_guard = match logging::log_dir() {
        Some(dir) => match logging::init_file_logging(&dir) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: file logging disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let mut app = TuiApp::new(config.clone(), filter);

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app);
    restore_terminal()?;

    result?;
    app.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, SorterConfig, resolve_with};
    use crate::test_utils::TestEnv;
    use crate::tui::status::StatusLevel;
    use std::fs;

    fn config_for(env: &TestEnv, patches_dir: PathBuf) -> ResolvedConfig {
        let overrides = ConfigOverrides {
            patches_dir: Some(patches_dir),
            tags_file: Some(env.tags_path()),
            ..Default::default()
        };
        resolve_with(
            env.path(),
            &overrides,
            &SorterConfig::new(),
            &SorterConfig::new(),
        )
    }

    fn app_for(env: &TestEnv) -> TuiApp {
        TuiApp::new(config_for(env, env.patches_dir()), Filter::All)
    }

    fn sample() -> (TestEnv, TuiApp) {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch", "0003-c.patch"]);
        let app = app_for(&env);
        (env, app)
    }

    #[test]
    fn test_opens_session_when_patches_exist() {
        let (_env, app) = sample();
        assert!(matches!(app.screen, Screen::Patches(_)));
        assert_eq!(app.patch_list.items.len(), 3);
        assert_eq!(app.patch_list.title, "Filter: none (3 of 3)");
    }

    #[test]
    fn test_toggle_shortcut_saves() {
        let (env, mut app) = sample();
        app.handle_key(KeyCode::Char('j'));
        app.handle_key(KeyCode::Char('s'));

        assert!(app.patch_list.items[1].tags.contains(Category::Security));
        let content = fs::read_to_string(env.tags_path()).unwrap();
        assert_eq!(content, "patch,categories...\nb.patch,sec\n");

        app.handle_key(KeyCode::Char('s'));
        assert!(app.patch_list.items[1].tags.is_empty());
    }

    #[test]
    fn test_filter_cycling_and_reset() {
        let (_env, mut app) = sample();
        app.handle_key(KeyCode::Char('a'));

        app.handle_key(KeyCode::Tab);
        assert_eq!(app.patch_list.title, "Filter: untagged (2 of 3)");
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.patch_list.title, "Filter: api (1 of 3)");
        assert_eq!(app.patch_list.items[0].file_name, "0001-a.patch");

        app.handle_key(KeyCode::Char('0'));
        assert_eq!(app.patch_list.items.len(), 3);
    }

    #[test]
    fn test_untagging_under_category_filter_removes_row() {
        let (_env, mut app) = sample();
        app.handle_key(KeyCode::Char('f'));
        app.set_filter(Filter::Category(Category::BugFix));
        assert_eq!(app.patch_list.items.len(), 1);

        app.handle_key(KeyCode::Char('f'));
        assert!(app.patch_list.items.is_empty());
        assert_eq!(app.patch_list.selected_index(), None);
        // Nothing selected, so this is a no-op
        app.handle_key(KeyCode::Char('f'));
    }

    #[test]
    fn test_gg_and_enter() {
        let (env, mut app) = sample();
        app.handle_key(KeyCode::Char('G'));
        assert_eq!(app.patch_list.selected, 2);
        app.handle_key(KeyCode::Char('g'));
        app.handle_key(KeyCode::Char('g'));
        assert_eq!(app.patch_list.selected, 0);

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.pending_open, Some(env.patches_dir().join("0001-a.patch")));
    }

    #[test]
    fn test_quit() {
        let (_env, mut app) = sample();
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    #[cfg(unix)]
    fn test_save_failure_shows_error_and_keeps_tag() {
        let env = TestEnv::with_patches(&["0001-a.patch"]);
        let mut app = app_for(&env);
        // A directory where the tags file should be makes every save fail
        fs::create_dir_all(env.tags_path()).unwrap();

        app.handle_key(KeyCode::Char('p'));
        assert!(app.patch_list.items[0].tags.contains(Category::Performance));
        let message = app.status.current().unwrap();
        assert_eq!(message.level, StatusLevel::Error);
    }

    #[test]
    fn test_missing_patches_dir_is_reported() {
        let env = TestEnv::new();
        let config = config_for(&env, env.path().join("nowhere"));
        let screen = TuiApp::open_session(&config);
        assert!(matches!(screen, Screen::Failed(ref e) if e.to_string().contains("nowhere")));
    }

    fn bootstrapping(env: &TestEnv, script: &str) -> TuiApp {
        let mut command = std::process::Command::new("sh");
        command
            .args(["-c", script, "sh"])
            .arg(env.patches_dir().join("fresh"));
        let task = BootstrapTask::spawn(command, "Cloning test".to_string()).unwrap();
        let config = config_for(env, env.patches_dir().join("fresh"));
        TuiApp::with_screen(config, Screen::Bootstrap(task), Filter::Untagged)
    }

    fn tick_until_done(app: &mut TuiApp) {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while matches!(app.screen, Screen::Bootstrap(_)) {
            assert!(std::time::Instant::now() < deadline, "bootstrap never finished");
            app.tick();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_bootstrap_success_opens_patches() {
        let env = TestEnv::new();
        let mut app = bootstrapping(&env, "mkdir -p \"$1\" && touch \"$1/0001-x.patch\"");
        assert!(app.patch_list.items.is_empty());
        // Keys other than quit wait for the clone
        app.handle_key(KeyCode::Char('a'));

        tick_until_done(&mut app);
        assert!(matches!(app.screen, Screen::Patches(_)));
        assert_eq!(app.patch_list.title, "Filter: untagged (1 of 1)");
        assert!(!env.tags_path().exists());
        app.handle_key(KeyCode::Char('q'));
        assert!(app.into_result().is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn test_bootstrap_failure_is_fatal() {
        let env = TestEnv::new();
        let mut app = bootstrapping(&env, "exit 128");

        tick_until_done(&mut app);
        assert!(matches!(app.screen, Screen::Failed(_)));
        // Ticking again keeps the failure
        app.tick();
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
        let err = app.into_result().unwrap_err();
        assert!(matches!(err, crate::Error::Bootstrap(msg) if msg.contains("exited")));
    }

    #[test]
    #[cfg(unix)]
    fn test_quitting_cancels_bootstrap() {
        let env = TestEnv::new();
        let mut app = bootstrapping(&env, "sleep 30");
        let started = std::time::Instant::now();

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
        assert!(started.elapsed() < Duration::from_secs(10));
        let err = app.into_result().unwrap_err();
        assert!(matches!(err, crate::Error::Bootstrap(msg) if msg == "Cancelled"));
    }
}
