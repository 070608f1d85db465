use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use audio_player::LocalPlayer;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use playback_types::PlaybackHandle;
use playback_view::render::ControlLayout;
use playback_view::{PlaybackControlView, PlaybackIntent, TrackProps};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::config::{ControlSettings, Settings};

use super::render;

const LOG_CAP: usize = 500;

/// Everything `main` resolved before the terminal is taken over.
pub(crate) struct Launch {
    pub(crate) path: PathBuf,
    pub(crate) props: TrackProps,
    pub(crate) settings: Settings,
    pub(crate) autoplay: bool,
    pub(crate) log_rx: Receiver<String>,
}

/// User input after key/mouse decoding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Action {
    TogglePlay,
    SkipBack,
    SkipForward,
    ToggleMute,
    VolumeUp,
    VolumeDown,
    /// Seek to `n / 10` of the track.
    SeekTenth(u8),
    ToggleLogs,
    ScrollLogsUp,
    ScrollLogsDown,
    Quit,
}

/// Start the player, mount the view and drive the event loop until quit.
pub(crate) fn run_tui(launch: Launch) -> Result<()> {
    let player = LocalPlayer::new(launch.settings.playback.clone())?;
    let handle: Arc<dyn PlaybackHandle> = player.clone();
    let intent = PlaybackIntent::new(false);

    let mut view = PlaybackControlView::mount(launch.props, Arc::downgrade(&handle), intent.clone());
    view.on_volume_changed(launch.settings.controls.initial_volume);
    player.load(&launch.path);
    if launch.autoplay {
        intent.set_is_playing(true);
    }

    let mut app = App::new(view, launch.settings.controls, launch.log_rx);
    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);
    restore_terminal(&mut term)?;

    app.view.unmount();
    tracing::info!("stopped");
    result
}

pub(crate) struct App {
    pub(crate) view: PlaybackControlView,
    pub(crate) controls: ControlSettings,
    /// Seek bar geometry from the last frame.
    pub(crate) layout: ControlLayout,
    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    log_rx: Receiver<String>,
}

impl App {
    fn new(view: PlaybackControlView, controls: ControlSettings, log_rx: Receiver<String>) -> Self {
        Self {
            view,
            controls,
            layout: ControlLayout::default(),
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            log_rx,
        }
    }

    /// Apply one action; returns `false` when the app should exit.
    pub(crate) fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::TogglePlay => self.view.on_play_pause_requested(),
            Action::SkipBack => self.view.on_skip_requested(-self.controls.skip_seconds),
            Action::SkipForward => self.view.on_skip_requested(self.controls.skip_seconds),
            Action::ToggleMute => self.view.on_mute_toggle(),
            Action::VolumeUp => {
                let v = step_volume(self.view.state().volume, self.controls.volume_step);
                self.view.on_volume_changed(v);
            }
            Action::VolumeDown => {
                let v = step_volume(self.view.state().volume, -self.controls.volume_step);
                self.view.on_volume_changed(v);
            }
            Action::SeekTenth(n) => self.view.on_seek_requested(f64::from(n) / 10.0),
            Action::ToggleLogs => {
                self.logs_open = !self.logs_open;
                if !self.logs_open {
                    self.logs_scroll = 0;
                }
            }
            Action::ScrollLogsUp => {
                let max = self.logs.len().saturating_sub(1);
                self.logs_scroll = (self.logs_scroll + 1).min(max);
            }
            Action::ScrollLogsDown => self.logs_scroll = self.logs_scroll.saturating_sub(1),
            Action::Quit => return false,
        }
        true
    }

    fn click(&mut self, column: u16, row: u16) {
        if self.logs_open {
            return;
        }
        if let Some(fraction) = self.layout.seek_fraction(column, row) {
            self.view.on_seek_requested(fraction);
        }
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
    }
}

/// Map a key press to an action. The log panel captures navigation keys while open.
pub(crate) fn action_for_key(key: KeyEvent, logs_open: bool) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    if logs_open {
        return match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Esc | KeyCode::Char('l') => Some(Action::ToggleLogs),
            KeyCode::Up => Some(Action::ScrollLogsUp),
            KeyCode::Down => Some(Action::ScrollLogsDown),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePlay),
        KeyCode::Left => Some(Action::SkipBack),
        KeyCode::Right => Some(Action::SkipForward),
        KeyCode::Char('m') => Some(Action::ToggleMute),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::VolumeUp),
        KeyCode::Char('-') => Some(Action::VolumeDown),
        KeyCode::Char('l') => Some(Action::ToggleLogs),
        KeyCode::Char(c @ '0'..='9') => Some(Action::SeekTenth(c as u8 - b'0')),
        _ => None,
    }
}

/// Move `current` by `delta`, clamp to `[0, 1]` and round to one decimal.
pub(crate) fn step_volume(current: f64, delta: f64) -> f64 {
    ((current + delta).clamp(0.0, 1.0) * 10.0).round() / 10.0
}

fn ui_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let tick = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    loop {
        app.view.poll();
        app.drain_logs();
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            match event::read().context("read terminal event")? {
                CEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = action_for_key(key, app.logs_open) {
                        if !app.apply(action) {
                            return Ok(());
                        }
                    }
                }
                CEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                    app.click(mouse.column, mouse.row);
                }
                _ => {}
            }
        }
        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
