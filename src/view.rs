// src/view.rs
//! Per-waypoint view state bound to a single record

use crate::waypoint::{MavFrame, Waypoint, WaypointHandle};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a constructed view; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        Self(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Editable,
    ViewOnly,
}

/// Field of an editable view that can hold input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusField {
    Action,
    Frame,
    Latitude,
    Longitude,
    Altitude,
    HoldTime,
    AcceptanceRadius,
    Yaw,
}

/// Values shown by a view, refreshed from the record
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedFields {
    pub id: u16,
    pub frame: MavFrame,
    pub action: String,
    pub position: String,
    pub hold_time: f64,
    pub acceptance_radius: f64,
    pub yaw: f64,
    pub autocontinue: bool,
}

impl DisplayedFields {
    fn from_waypoint(wp: &Waypoint) -> Self {
        Self {
            id: wp.id,
            frame: wp.frame,
            action: wp.action.short_name(),
            position: wp.format_position(),
            hold_time: wp.hold_time(),
            acceptance_radius: wp.acceptance_radius(),
            yaw: wp.yaw(),
            autocontinue: wp.autocontinue,
        }
    }
}

#[derive(Debug)]
pub struct WaypointView {
    id: ViewId,
    kind: ViewKind,
    handle: WaypointHandle,
    fields: DisplayedFields,
    current: bool,
    visible: bool,
    pub focus: Option<FocusField>,
    refreshes: u64,
}

impl WaypointView {
    pub fn new(kind: ViewKind, handle: WaypointHandle, waypoint: &Waypoint) -> Self {
        Self {
            id: ViewId::next(),
            kind,
            handle,
            fields: DisplayedFields::from_waypoint(waypoint),
            current: waypoint.current,
            visible: true,
            focus: None,
            refreshes: 0,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn handle(&self) -> WaypointHandle {
        self.handle
    }

    pub fn fields(&self) -> &DisplayedFields {
        &self.fields
    }

    /// Refresh displayed values from the record. Safe to call repeatedly.
    pub fn update_values(&mut self, waypoint: &Waypoint) {
        self.fields = DisplayedFields::from_waypoint(waypoint);
        self.refreshes += 1;
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn set_current(&mut self, current: bool) {
        self.current = current;
    }

    pub fn is_current(&self) -> bool {
        self.current
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// One-line summary used by the terminal display
    pub fn render_line(&self) -> String {
        let marker = if self.current { ">" } else { " " };
        let cont = if self.fields.autocontinue { "auto" } else { "hold" };
        format!(
            "{}{:>3} {:<13} {:<22} {} r={:.1}m {}",
            marker,
            self.fields.id,
            self.fields.action,
            self.fields.frame.display_name(),
            self.fields.position,
            self.fields.acceptance_radius,
            cont
        )
    }
}
