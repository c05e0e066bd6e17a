//! Interactive session state.
//!
//! [`App`] owns everything the renderer shows and turns key presses into
//! state changes. Side effects that need the engine (refresh, kill) are
//! handed back to the event loop as an [`Action`]; the loop reports their
//! outcome through [`App::finish_refresh`] and [`App::finish_kill`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use portman_core::{
    ConnectionStatus, EngineStats, FilterState, Process, Protocol, ReadOptions, SearchQuery,
    Snapshot,
};

/// Characters moved per horizontal scroll step.
const SCROLL_STEP: usize = 4;

/// Which input the keyboard is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Searching,
    ConfirmingKill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// Transient message shown in the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    expires_at: Instant,
}

impl StatusMessage {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// The row a kill was requested for, frozen when the dialog opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillTarget {
    pub pid: u32,
    pub name: String,
    pub status: ConnectionStatus,
    pub local_addr: String,
}

impl From<&Process> for KillTarget {
    fn from(process: &Process) -> Self {
        Self {
            pid: process.pid,
            name: process.display_name().to_string(),
            status: process.status.clone(),
            local_addr: process.local_addr.clone(),
        }
    }
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Refresh,
    Kill(KillTarget),
}

/// Identity used to keep the cursor on the same socket across refreshes.
type RowKey = (u32, u16, Protocol);

fn row_key(process: &Process) -> RowKey {
    (process.pid, process.port, process.protocol)
}

/// Session state for the interactive view.
pub struct App {
    pub mode: Mode,
    pub filter: FilterState,
    /// Search text; applied live while typing and kept after Enter.
    pub query: String,
    pub selected: usize,
    /// Horizontal scroll offset for the text columns, in characters.
    pub scroll: usize,
    pub target: Option<KillTarget>,
    pub should_quit: bool,
    /// Wall-clock time the current snapshot was first shown.
    pub updated_at: Option<DateTime<Local>>,

    scope: ReadOptions,
    snapshot: Arc<Snapshot>,
    stats: EngineStats,
    rows: Vec<Process>,
    status: Option<StatusMessage>,
    status_duration: Duration,
}

impl App {
    pub fn new(scope: ReadOptions, status_duration: Duration) -> Self {
        Self {
            mode: Mode::Normal,
            filter: FilterState::new(),
            query: String::new(),
            selected: 0,
            scroll: 0,
            target: None,
            should_quit: false,
            updated_at: None,
            scope,
            snapshot: Arc::new(Snapshot::empty()),
            stats: EngineStats::default(),
            rows: Vec::new(),
            status: None,
            status_duration,
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot and view
    // ------------------------------------------------------------------------

    /// Adopt `snapshot` if it is newer than the one on screen.
    pub fn sync(&mut self, snapshot: Arc<Snapshot>) {
        if snapshot.generation() == self.snapshot.generation() && !self.rows.is_empty() {
            return;
        }
        if snapshot.generation() != self.snapshot.generation() {
            self.updated_at = Some(Local::now());
        }
        self.snapshot = snapshot;
        self.rebuild();
    }

    /// Record the engine's poll health for the header.
    pub fn set_stats(&mut self, stats: EngineStats) {
        self.stats = stats;
    }

    /// Header note shown while background polls keep failing.
    pub fn staleness(&self, now: Instant) -> Option<String> {
        let failures = self.stats.consecutive_failures;
        if failures == 0 {
            return None;
        }
        Some(match self.stats.last_success {
            Some(at) => format!(
                "stale {}s, {} failed polls",
                now.saturating_duration_since(at).as_secs(),
                failures
            ),
            None => format!("no data, {} failed polls", failures),
        })
    }

    /// Rows that pass the scope, the structural filter and the search.
    pub fn rows(&self) -> &[Process] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.snapshot.len()
    }

    pub fn selected_process(&self) -> Option<&Process> {
        self.rows.get(self.selected)
    }

    fn rebuild(&mut self) {
        let keep = self.selected_process().map(row_key);

        let query = SearchQuery::parse(&self.query);
        self.rows = self.snapshot.view(&self.scope, &self.filter, &query);

        self.selected = keep
            .and_then(|key| self.rows.iter().position(|p| row_key(p) == key))
            .unwrap_or(self.selected);
        self.clamp_selection();
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }

    /// Longest text in a scrollable column of the current view.
    fn max_scroll(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|p| [&p.name, &p.local_addr, &p.remote_addr])
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------------

    pub fn set_info(&mut self, text: impl Into<String>) {
        self.set_status(text.into(), StatusKind::Info);
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.set_status(text.into(), StatusKind::Error);
    }

    fn set_status(&mut self, text: String, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text,
            kind,
            expires_at: Instant::now() + self.status_duration,
        });
    }

    /// The current message, if it has not expired.
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status
            .as_ref()
            .filter(|message| !message.is_expired(Instant::now()))
    }

    /// Drop an expired status message.
    pub fn tick(&mut self, now: Instant) {
        if self.status.as_ref().is_some_and(|m| m.is_expired(now)) {
            self.status = None;
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Action::Quit;
        }

        match self.mode {
            Mode::Normal => self.handle_normal(key),
            Mode::Searching => self.handle_search(key),
            Mode::ConfirmingKill => self.handle_confirm(key),
        }
    }

    fn handle_normal(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Action::Quit;
            }
            KeyCode::Char('r') => return Action::Refresh,
            KeyCode::Char('/') => self.mode = Mode::Searching,
            KeyCode::Char('k') => self.request_kill(),

            KeyCode::Char('t') => self.update_filter(FilterState::toggle_tcp),
            KeyCode::Char('u') => self.update_filter(FilterState::toggle_udp),
            KeyCode::Char('l') => self.update_filter(FilterState::toggle_listen),
            KeyCode::Char('e') => self.update_filter(FilterState::toggle_established),
            KeyCode::Char('c') => self.update_filter(FilterState::clear),
            KeyCode::Char(':') => self.show_filters(),

            KeyCode::Char('j') | KeyCode::Down => self.select_next(),
            KeyCode::Up => self.select_previous(),
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.rows.len().saturating_sub(1)
            }

            KeyCode::Char('h') | KeyCode::Left => {
                self.scroll = self.scroll.saturating_sub(SCROLL_STEP)
            }
            KeyCode::Right => self.scroll = (self.scroll + SCROLL_STEP).min(self.max_scroll()),
            _ => {}
        }
        Action::None
    }

    fn handle_search(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.query.clear();
                self.rebuild();
            }
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                self.query.pop();
                self.rebuild();
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.rebuild();
            }
            _ => {}
        }
        Action::None
    }

    fn handle_confirm(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.mode = Mode::Normal;
                match self.target.take() {
                    Some(target) => Action::Kill(target),
                    None => Action::None,
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.target = None;
                self.set_info("Kill cancelled");
                Action::None
            }
            _ => Action::None,
        }
    }

    fn request_kill(&mut self) {
        match self.selected_process().map(KillTarget::from) {
            Some(target) => {
                self.target = Some(target);
                self.mode = Mode::ConfirmingKill;
            }
            None => self.set_error("No process selected"),
        }
    }

    fn show_filters(&mut self) {
        let labels = self.filter.active_labels();
        if labels.is_empty() {
            self.set_info("Filters: none (t: TCP, u: UDP, l: LISTEN, e: ESTABLISHED)");
        } else {
            self.set_info(format!("Filters: {}", labels.join(" + ")));
        }
    }

    fn update_filter(&mut self, change: fn(&mut FilterState)) {
        change(&mut self.filter);
        self.rebuild();
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    // ------------------------------------------------------------------------
    // Side-effect results
    // ------------------------------------------------------------------------

    /// Report the outcome of a kill requested via [`Action::Kill`].
    pub fn finish_kill(&mut self, target: &KillTarget, result: portman_core::Result<()>) {
        match result {
            Ok(()) => self.set_info(format!("Killed {} (PID {})", target.name, target.pid)),
            Err(e) => self.set_error(format!(
                "Failed to kill {} (PID {}): {}",
                target.name, target.pid, e
            )),
        }
    }

    /// Report the outcome of a refresh requested via [`Action::Refresh`].
    pub fn finish_refresh(&mut self, result: portman_core::Result<usize>) {
        match result {
            Ok(count) => self.set_info(format!("Refreshed: {} sockets", count)),
            Err(e) => self.set_error(format!("Refresh failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portman_core::Error;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    fn process(pid: u32, name: &str, port: u16, protocol: Protocol, status: ConnectionStatus) -> Process {
        Process {
            pid,
            name: name.to_string(),
            port,
            protocol,
            status,
            local_addr: format!("0.0.0.0:{}", port),
            remote_addr: "*:*".to_string(),
        }
    }

    fn sample_snapshot(generation: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot::new(
            vec![
                process(10, "nginx", 8080, Protocol::Tcp, ConnectionStatus::Listen),
                process(20, "avahi-daemon", 5353, Protocol::Udp, ConnectionStatus::Active),
                process(30, "sshd", 22, Protocol::Tcp, ConnectionStatus::Listen),
                process(40, "curl", 51000, Protocol::Tcp, ConnectionStatus::Established),
            ],
            generation,
        ))
    }

    fn app() -> App {
        let mut app = App::new(ReadOptions::new(), Duration::from_secs(3));
        app.sync(sample_snapshot(1));
        app
    }

    fn names(app: &App) -> Vec<&str> {
        app.rows().iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert_eq!(app.handle_key(ch('q')), Action::Quit);
        assert!(app.should_quit);

        let mut app = self::app();
        app.handle_key(ch('/'));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_c), Action::Quit);
    }

    #[test]
    fn test_search_is_live_and_esc_clears() {
        let mut app = app();
        app.handle_key(ch('/'));
        assert_eq!(app.mode, Mode::Searching);

        for c in "ngi".chars() {
            app.handle_key(ch(c));
        }
        assert_eq!(names(&app), vec!["nginx"]);

        // 'q' is text while searching.
        assert_eq!(app.handle_key(ch('q')), Action::None);
        assert!(app.rows().is_empty());
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(names(&app), vec!["nginx"]);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.query.is_empty());
        assert_eq!(app.rows().len(), 4);
    }

    #[test]
    fn test_enter_commits_search() {
        let mut app = app();
        app.handle_key(ch('/'));
        for c in "tcp listen".chars() {
            app.handle_key(ch(c));
        }
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.query, "tcp listen");
        assert_eq!(names(&app), vec!["nginx", "sshd"]);

        // Committed query survives a refresh.
        app.sync(sample_snapshot(2));
        assert_eq!(names(&app), vec!["nginx", "sshd"]);
    }

    #[test]
    fn test_filter_accelerators() {
        let mut app = app();
        app.handle_key(ch('u'));
        assert_eq!(names(&app), vec!["avahi-daemon"]);

        app.handle_key(ch('t'));
        assert!(!app.filter.udp_only());
        app.handle_key(ch('e'));
        assert_eq!(names(&app), vec!["curl"]);

        app.handle_key(ch('l'));
        assert!(!app.filter.established_only());
        assert_eq!(names(&app), vec!["nginx", "sshd"]);

        app.handle_key(ch('c'));
        assert!(!app.filter.is_active());
        assert_eq!(app.rows().len(), 4);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut app = app();
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected, 0);

        app.handle_key(ch('G'));
        assert_eq!(app.selected, 3);
        app.handle_key(ch('j'));
        assert_eq!(app.selected, 3);

        app.handle_key(ch('g'));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected_process().unwrap().name, "avahi-daemon");
    }

    #[test]
    fn test_selection_follows_row_across_refresh() {
        let mut app = app();
        app.handle_key(ch('G'));
        assert_eq!(app.selected_process().unwrap().name, "curl");

        let reordered = Arc::new(Snapshot::new(
            vec![
                process(40, "curl", 51000, Protocol::Tcp, ConnectionStatus::Established),
                process(10, "nginx", 8080, Protocol::Tcp, ConnectionStatus::Listen),
            ],
            2,
        ));
        app.sync(reordered);
        assert_eq!(app.selected, 0);
        assert_eq!(app.selected_process().unwrap().name, "curl");
    }

    #[test]
    fn test_horizontal_scroll() {
        let mut app = app();
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.scroll, SCROLL_STEP);
        for _ in 0..50 {
            app.handle_key(key(KeyCode::Right));
        }
        // "0.0.0.0:51000" is the longest text in view.
        assert_eq!(app.scroll, 13);

        app.handle_key(ch('h'));
        assert_eq!(app.scroll, 9);
        for _ in 0..5 {
            app.handle_key(key(KeyCode::Left));
        }
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_kill_without_selection_is_an_error() {
        let mut app = App::new(ReadOptions::new(), Duration::from_secs(3));
        assert_eq!(app.handle_key(ch('k')), Action::None);
        assert_eq!(app.mode, Mode::Normal);

        let status = app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.text, "No process selected");
    }

    /// An app with a committed search and two structural filters active.
    fn filtered_app() -> App {
        let mut app = app();
        app.handle_key(ch('t'));
        app.handle_key(ch('l'));
        app.handle_key(ch('/'));
        for c in "0.0.0.0".chars() {
            app.handle_key(ch(c));
        }
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(ch('j'));
        assert_eq!(names(&app), vec!["nginx", "sshd"]);
        app
    }

    #[test]
    fn test_kill_cancel_round_trip() {
        let mut app = filtered_app();
        let filter = app.filter;
        let query = app.query.clone();
        let rows = app.rows().to_vec();

        app.handle_key(ch('k'));
        assert_eq!(app.mode, Mode::ConfirmingKill);
        assert_eq!(app.target.as_ref().unwrap().pid, 30);

        // Filter and search keys do nothing while the dialog is open.
        assert_eq!(app.handle_key(ch('u')), Action::None);
        assert_eq!(app.handle_key(ch('/')), Action::None);
        assert_eq!(app.handle_key(ch('c')), Action::None);

        assert_eq!(app.handle_key(ch('n')), Action::None);
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.target.is_none());
        let status = app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Info);
        assert!(status.text.contains("cancelled"));

        assert_eq!(app.filter, filter);
        assert!(app.filter.tcp_only() && app.filter.listen_only());
        assert_eq!(app.query, query);
        assert_eq!(app.rows(), rows.as_slice());
        assert_eq!(app.selected_process().unwrap().pid, 30);
    }

    #[test]
    fn test_failed_kill_keeps_filters_and_search() {
        let mut app = filtered_app();
        let filter = app.filter;
        let query = app.query.clone();
        let rows = app.rows().to_vec();

        app.handle_key(ch('k'));
        let Action::Kill(target) = app.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a kill action");
        };
        app.finish_kill(&target, Err(Error::ProcessNotFound(target.pid)));

        assert_eq!(app.mode, Mode::Normal);
        assert!(app.target.is_none());
        assert_eq!(app.status().unwrap().kind, StatusKind::Error);
        assert_eq!(app.filter, filter);
        assert_eq!(app.query, query);
        assert_eq!(app.rows(), rows.as_slice());

        // A retry has to go through the dialog again.
        assert_eq!(app.handle_key(ch('y')), Action::None);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_colon_lists_active_filters() {
        let mut app = app();
        app.handle_key(ch(':'));
        assert!(app.status().unwrap().text.starts_with("Filters: none"));

        app.handle_key(ch('u'));
        app.handle_key(ch(':'));
        assert_eq!(app.status().unwrap().text, "Filters: UDP");
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_staleness_follows_engine_stats() {
        let mut app = app();
        let now = Instant::now();
        assert!(app.staleness(now).is_none());

        app.set_stats(EngineStats {
            generation: 1,
            records: 4,
            last_success: Some(now),
            consecutive_failures: 2,
        });
        assert_eq!(
            app.staleness(now + Duration::from_secs(12)).as_deref(),
            Some("stale 12s, 2 failed polls")
        );

        app.set_stats(EngineStats {
            consecutive_failures: 1,
            ..EngineStats::default()
        });
        assert_eq!(app.staleness(now).as_deref(), Some("no data, 1 failed polls"));
    }

    #[test]
    fn test_kill_confirm_targets_frozen_row() {
        let mut app = app();
        app.handle_key(ch('j'));
        app.handle_key(ch('k'));

        // A refresh while the dialog is open does not move the target.
        app.sync(Arc::new(Snapshot::new(
            vec![process(99, "other", 1, Protocol::Tcp, ConnectionStatus::Listen)],
            2,
        )));

        let action = app.handle_key(key(KeyCode::Enter));
        let Action::Kill(target) = action else {
            panic!("expected a kill action, got {:?}", action);
        };
        assert_eq!(target.pid, 20);
        assert_eq!(target.name, "avahi-daemon");
        assert_eq!(target.status, ConnectionStatus::Active);
        assert_eq!(app.mode, Mode::Normal);

        app.finish_kill(&target, Ok(()));
        let status = app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Info);
        assert_eq!(status.text, "Killed avahi-daemon (PID 20)");
    }

    #[test]
    fn test_failed_kill_reports_error() {
        let mut app = app();
        app.handle_key(ch('k'));
        let Action::Kill(target) = app.handle_key(ch('y')) else {
            panic!("expected a kill action");
        };

        app.finish_kill(&target, Err(Error::PermissionDenied("pid 10".to_string())));
        let status = app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.contains("nginx"));
        assert!(status.text.contains("Permission denied"));
    }

    #[test]
    fn test_status_expires() {
        let mut app = App::new(ReadOptions::new(), Duration::ZERO);
        app.set_info("gone");
        assert!(app.status().is_none());
        app.tick(Instant::now());
        assert!(app.status.is_none());

        let mut app = App::new(ReadOptions::new(), Duration::from_secs(60));
        app.set_info("still here");
        app.tick(Instant::now());
        assert_eq!(app.status().unwrap().text, "still here");
    }

    #[test]
    fn test_refresh_key_and_result() {
        let mut app = app();
        assert_eq!(app.handle_key(ch('r')), Action::Refresh);
        app.finish_refresh(Err(Error::NoConnections));
        assert_eq!(app.status().unwrap().kind, StatusKind::Error);
        app.finish_refresh(Ok(4));
        assert_eq!(app.status().unwrap().text, "Refreshed: 4 sockets");
    }

    #[test]
    fn test_scope_limits_rows() {
        let scope = ReadOptions::new().with_port(Some(22));
        let mut app = App::new(scope, Duration::from_secs(3));
        app.sync(sample_snapshot(1));
        assert_eq!(names(&app), vec!["sshd"]);
        assert_eq!(app.total(), 4);
    }

    #[test]
    fn test_listen_then_established_scenario() {
        let mut app = App::new(ReadOptions::new(), Duration::from_secs(3));
        app.sync(Arc::new(Snapshot::new(
            vec![
                process(1, "sshd", 22, Protocol::Tcp, ConnectionStatus::Listen),
                process(2, "curl", 50000, Protocol::Tcp, ConnectionStatus::Established),
            ],
            1,
        )));

        app.handle_key(ch('l'));
        assert_eq!(names(&app), vec!["sshd"]);
        assert_eq!(app.filter.active_labels(), vec!["LISTEN"]);

        app.handle_key(ch('e'));
        assert_eq!(names(&app), vec!["curl"]);
        assert!(!app.filter.listen_only());

        app.handle_key(ch('k'));
        let Action::Kill(target) = app.handle_key(ch('y')) else {
            panic!("expected a kill action");
        };
        assert_eq!(target.pid, 2);
        assert_eq!(target.name, "curl");
    }
}
