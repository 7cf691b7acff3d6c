// src/display/terminal.rs
//! Terminal rendering of the waypoint panels and the interactive editor

use crate::{
    error::Result,
    panel::{Tab, WaypointListPanel},
    reconcile::TrackViews,
    vehicle_list::VehicleListPanel,
    view::FocusField,
    waypoint::WaypointHandle,
};
use crossterm::{
    cursor::{Hide, MoveTo, MoveToNextLine, Show},
    event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::{
    io::{self, Write},
    time::Duration,
};

const HELP: &str = "j/k select  u/d/t/b move  x remove  a add  p add here  c clear  enter current  w send  r read  f refresh  s save  l load  h home here  +/- altitude  tab switch  q quit";

pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new() -> Self {
        Self
    }

    fn line(&self, out: &mut impl Write, text: &str) -> Result<()> {
        queue!(out, Print(text), MoveToNextLine(1))?;
        Ok(())
    }

    fn heading(&self, out: &mut impl Write, color: Color, text: &str) -> Result<()> {
        queue!(out, SetForegroundColor(color), Print(text), ResetColor, MoveToNextLine(1))?;
        Ok(())
    }

    /// Render both tracks and the status line
    pub fn render_panel(&self, out: &mut impl Write, panel: &WaypointListPanel) -> Result<()> {
        self.heading(out, Color::Green, &"=".repeat(72))?;
        self.heading(out, Color::Green, "Mission List - Waypoint Editor")?;
        self.heading(out, Color::Green, &"=".repeat(72))?;

        if panel.show_offline_warning() {
            self.heading(out, Color::Red, "No vehicle connected: send/read disabled")?;
        }

        let (editable_color, onboard_color) = match panel.active_tab() {
            Tab::Editable => (Color::Yellow, Color::DarkGrey),
            Tab::ViewOnly => (Color::DarkGrey, Color::Cyan),
        };

        self.render_track(out, editable_color, "MISSION (editable):", panel.editable_views())?;
        self.render_track(out, onboard_color, "ONBOARD (view only):", panel.view_only_views())?;

        if let Some(altitude) = panel.default_altitude() {
            self.line(out, &format!("  Default altitude: {:.1} m", altitude))?;
        }

        let radius = panel.radius_control();
        if radius.enabled {
            self.line(out, &format!("  Waypoint radius: {:.2} m", radius.value))?;
        }

        let status = panel.status();
        let status_text = if status.text.is_empty() { "-" } else { status.text.as_str() };
        self.line(
            out,
            &format!("Status [{}]: {}", status.updated.format("%H:%M:%S"), status_text),
        )?;
        self.heading(out, Color::Green, &"=".repeat(72))?;
        Ok(())
    }

    fn render_track(&self, out: &mut impl Write, color: Color, title: &str, track: &TrackViews) -> Result<()> {
        self.heading(out, color, title)?;

        let visible: Vec<_> = track.ordered_views().into_iter().filter(|v| v.is_visible()).collect();
        if visible.is_empty() {
            self.line(out, "  (no waypoints)")?;
        }

        for view in visible {
            let selected = if view.focus.is_some() { "*" } else { " " };
            self.line(
                out,
                &format!("{} [v{:>3}] {}", selected, view.id().raw(), view.render_line()),
            )?;
        }

        self.line(out, "")?;
        Ok(())
    }

    pub fn render_vehicles(&self, out: &mut impl Write, panel: &VehicleListPanel) -> Result<()> {
        self.heading(out, Color::Magenta, "VEHICLES:")?;
        if panel.shows_placeholder() {
            self.line(out, "  No vehicle connected")?;
        }
        for view in panel.views() {
            let marker = if view.active { ">" } else { " " };
            self.line(out, &format!("{} {:>3} {}", marker, view.vehicle_id, view.name))?;
        }
        self.line(out, "")?;
        Ok(())
    }

    /// Interactive editing session on the terminal
    pub fn run_editor(&self, panel: &mut WaypointListPanel) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        let _restore = RawModeGuard;
        execute!(stdout, EnterAlternateScreen, Hide, DisableLineWrap)?;

        panel.set_visible(true);
        select_next(panel, 1);

        loop {
            panel.process_pending();

            queue!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
            self.render_panel(&mut stdout, panel)?;
            self.line(&mut stdout, HELP)?;
            stdout.flush()?;

            if !event::poll(Duration::from_millis(250))? {
                continue;
            }

            if let TermEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if !handle_key(panel, key) {
                    break;
                }
            }
        }

        panel.set_visible(false);
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), Show, EnableLineWrap, LeaveAlternateScreen);
    }
}

/// Selection lives in the focused view, so it follows the waypoint across reorders
fn selected(panel: &WaypointListPanel) -> Option<WaypointHandle> {
    panel
        .editable_views()
        .ordered_views()
        .into_iter()
        .find(|view| view.focus.is_some())
        .map(|view| view.handle())
}

fn select_next(panel: &mut WaypointListPanel, step: isize) {
    let visible: Vec<WaypointHandle> = panel
        .editable_views()
        .ordered_views()
        .into_iter()
        .filter(|view| view.is_visible())
        .map(|view| view.handle())
        .collect();
    if visible.is_empty() {
        return;
    }

    let target = match selected(panel).and_then(|h| visible.iter().position(|v| *v == h)) {
        Some(index) => (index as isize + step).clamp(0, visible.len() as isize - 1) as usize,
        None => 0,
    };

    let track = panel.editable_views_mut();
    for handle in &visible {
        if let Some(view) = track.view_mut(*handle) {
            view.focus = None;
        }
    }
    if let Some(view) = track.view_mut(visible[target]) {
        view.focus = Some(FocusField::Action);
    }
}

/// Returns false when the session should end
fn handle_key(panel: &mut WaypointListPanel, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return false;
    }

    let current = selected(panel);
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Up | KeyCode::Char('k') => select_next(panel, -1),
        KeyCode::Down | KeyCode::Char('j') => select_next(panel, 1),
        KeyCode::Char('u') => current.into_iter().for_each(|h| panel.move_up(h)),
        KeyCode::Char('d') => current.into_iter().for_each(|h| panel.move_down(h)),
        KeyCode::Char('t') => current.into_iter().for_each(|h| panel.move_top(h)),
        KeyCode::Char('b') => current.into_iter().for_each(|h| panel.move_bottom(h)),
        KeyCode::Char('x') | KeyCode::Delete => {
            if let Some(handle) = current {
                panel.remove_waypoint(handle);
                panel.process_pending();
                select_next(panel, 0);
            }
        }
        KeyCode::Char('a') => panel.add_editable(),
        KeyCode::Char('p') => panel.add_current_position_waypoint(),
        KeyCode::Char('c') => panel.clear_wp_widget(),
        KeyCode::Enter => {
            let seq = current
                .and_then(|h| panel.editable_views().view(h))
                .map(|view| view.fields().id);
            if let Some(seq) = seq {
                panel.current_waypoint_editable_changed(seq);
            }
        }
        KeyCode::Char('w') => panel.transmit(),
        KeyCode::Char('r') => panel.read(),
        KeyCode::Char('f') => panel.refresh(),
        KeyCode::Char('s') => {
            let path = panel.config().default_mission_path();
            panel.save_waypoints(Some(&path));
        }
        KeyCode::Char('l') => {
            let path = panel.config().default_mission_path();
            panel.load_waypoints(Some(&path));
        }
        KeyCode::Char('h') => {
            panel.set_home_to_vehicle();
        }
        KeyCode::Char('+') | KeyCode::Char('-') => {
            if let Some(altitude) = panel.default_altitude() {
                let step = if key.code == KeyCode::Char('+') { 1.0 } else { -1.0 };
                panel.set_default_altitude(altitude + step);
            }
        }
        KeyCode::Tab => {
            let tab = match panel.active_tab() {
                Tab::Editable => Tab::ViewOnly,
                Tab::ViewOnly => Tab::Editable,
            };
            panel.set_active_tab(tab);
        }
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissionConfig;
    use crate::manager::{self, MemoryWaypointManager, WaypointManager};
    use crate::waypoint::{MavFrame, Waypoint};

    fn panel_with(count: usize) -> WaypointListPanel {
        let mut memory = MemoryWaypointManager::new();
        for i in 0..count {
            memory.add_waypoint_editable(Waypoint::nav(MavFrame::LocalNed, i as f64, 0.0, -10.0, 1.0));
        }
        WaypointListPanel::new(Some(manager::shared(memory)), MissionConfig::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_render_lists_visible_views() {
        let panel = panel_with(3);
        let mut out = Vec::new();
        TerminalDisplay::new().render_panel(&mut out, &panel).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("MISSION (editable):"));
        assert!(text.contains("No vehicle connected"));
        // home is hidden, two waypoints remain
        assert_eq!(text.matches("WAYPOINT").count(), 2);
    }

    #[test]
    fn test_selection_survives_reorder() {
        let mut panel = panel_with(4);
        select_next(&mut panel, 0);
        let first = selected(&panel).unwrap();

        assert!(handle_key(&mut panel, key(KeyCode::Char('b'))));
        panel.process_pending();

        assert_eq!(selected(&panel), Some(first));
        let order: Vec<_> = panel.editable_views().ordered_views().iter().map(|v| v.handle()).collect();
        assert_eq!(order.last(), Some(&first));
    }

    #[test]
    fn test_quit_keys() {
        let mut panel = panel_with(1);
        assert!(!handle_key(&mut panel, key(KeyCode::Char('q'))));
        assert!(!handle_key(
            &mut panel,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(handle_key(&mut panel, key(KeyCode::Tab)));
        assert_eq!(panel.active_tab(), Tab::Editable);
    }

    #[test]
    fn test_altitude_and_home_keys() {
        let mut panel = panel_with(2);
        assert!(handle_key(&mut panel, key(KeyCode::Char('+'))));
        assert!(handle_key(&mut panel, key(KeyCode::Char('+'))));
        assert!(handle_key(&mut panel, key(KeyCode::Char('-'))));
        assert_eq!(panel.default_altitude(), Some(21.0));

        // no vehicle: home stays where it was
        assert!(handle_key(&mut panel, key(KeyCode::Char('h'))));
        assert_eq!(panel.config().home_latitude, MissionConfig::default().home_latitude);
        assert!(panel.status_text().starts_with("No global position"));
    }
}
