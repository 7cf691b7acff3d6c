// src/waypoint.rs
//! Waypoint records and the mission file format used by the in-memory manager

use crate::error::{MissionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Coordinate frame of a waypoint position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MavFrame {
    /// Latitude, longitude, altitude above mean sea level
    Global,
    /// Latitude, longitude, altitude relative to home
    GlobalRelativeAlt,
    /// North, east, down in metres from the local origin
    LocalNed,
}

impl MavFrame {
    pub fn is_global(&self) -> bool {
        matches!(self, MavFrame::Global | MavFrame::GlobalRelativeAlt)
    }

    pub fn display_name(&self) -> &str {
        match self {
            MavFrame::Global => "GLOBAL (Abs alt.)",
            MavFrame::GlobalRelativeAlt => "GLOBAL (Relative alt.)",
            MavFrame::LocalNed => "LOCAL (NED)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MavCommand {
    NavWaypoint,
    NavLoiterUnlimited,
    NavLoiterTurns,
    NavLoiterTime,
    NavReturnToLaunch,
    NavLand,
    NavTakeoff,
    Other(u16),
}

impl MavCommand {
    pub fn code(&self) -> u16 {
        match self {
            MavCommand::NavWaypoint => 16,
            MavCommand::NavLoiterUnlimited => 17,
            MavCommand::NavLoiterTurns => 18,
            MavCommand::NavLoiterTime => 19,
            MavCommand::NavReturnToLaunch => 20,
            MavCommand::NavLand => 21,
            MavCommand::NavTakeoff => 22,
            MavCommand::Other(code) => *code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            16 => MavCommand::NavWaypoint,
            17 => MavCommand::NavLoiterUnlimited,
            18 => MavCommand::NavLoiterTurns,
            19 => MavCommand::NavLoiterTime,
            20 => MavCommand::NavReturnToLaunch,
            21 => MavCommand::NavLand,
            22 => MavCommand::NavTakeoff,
            other => MavCommand::Other(other),
        }
    }

    pub fn short_name(&self) -> String {
        match self {
            MavCommand::NavWaypoint => "WAYPOINT".to_string(),
            MavCommand::NavLoiterUnlimited => "LOITER".to_string(),
            MavCommand::NavLoiterTurns => "LOITER_TURNS".to_string(),
            MavCommand::NavLoiterTime => "LOITER_TIME".to_string(),
            MavCommand::NavReturnToLaunch => "RTL".to_string(),
            MavCommand::NavLand => "LAND".to_string(),
            MavCommand::NavTakeoff => "TAKEOFF".to_string(),
            MavCommand::Other(code) => format!("CMD_{}", code),
        }
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identity of a waypoint record.
///
/// Sequence ids are renumbered whenever the list is reordered, so views are
/// keyed by handle instead. Handles from [`WaypointHandle::next`] are unique
/// across every manager in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaypointHandle(u64);

impl WaypointHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a handle no other record has used
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaypointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: u16,
    pub frame: MavFrame,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Hold time in seconds
    pub param1: f64,
    /// Acceptance radius in metres
    pub param2: f64,
    /// Orbit radius
    pub param3: f64,
    /// Yaw in degrees
    pub param4: f64,
    pub autocontinue: bool,
    pub action: MavCommand,
    pub current: bool,
}

impl Waypoint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u16,
        x: f64,
        y: f64,
        z: f64,
        hold_time: f64,
        acceptance_radius: f64,
        orbit: f64,
        yaw: f64,
        autocontinue: bool,
        current: bool,
        frame: MavFrame,
        action: MavCommand,
    ) -> Self {
        Self {
            id,
            frame,
            x,
            y,
            z,
            param1: hold_time,
            param2: acceptance_radius,
            param3: orbit,
            param4: yaw,
            autocontinue,
            action,
            current,
        }
    }

    /// A plain navigation waypoint at the given position
    pub fn nav(frame: MavFrame, x: f64, y: f64, z: f64, acceptance_radius: f64) -> Self {
        Self::new(0, x, y, z, 0.0, acceptance_radius, 0.0, 0.0, true, false, frame, MavCommand::NavWaypoint)
    }

    /// Build the waypoint appended after `last`, expressed in `frame`.
    ///
    /// Global frames copy latitude/longitude only; the altitude stays at zero
    /// until the operator edits it. Local frames copy all three coordinates.
    pub fn following(last: &Waypoint, frame: MavFrame) -> Self {
        let mut wp = Self::nav(frame, 0.0, 0.0, 0.0, last.param2);
        if frame.is_global() {
            wp.x = last.latitude();
            wp.y = last.longitude();
        } else {
            wp.x = last.x;
            wp.y = last.y;
            wp.z = last.z;
        }
        wp.param1 = last.param1;
        wp.param2 = last.param2;
        wp.param3 = last.param3;
        wp.param4 = last.param4;
        wp.autocontinue = last.autocontinue;
        wp.action = last.action;
        wp
    }

    pub fn latitude(&self) -> f64 {
        self.x
    }

    pub fn longitude(&self) -> f64 {
        self.y
    }

    pub fn altitude(&self) -> f64 {
        self.z
    }

    pub fn hold_time(&self) -> f64 {
        self.param1
    }

    pub fn acceptance_radius(&self) -> f64 {
        self.param2
    }

    pub fn yaw(&self) -> f64 {
        self.param4
    }

    pub fn is_home(&self) -> bool {
        self.id == 0
    }

    /// Position formatted for display in the waypoint's frame
    pub fn format_position(&self) -> String {
        if self.frame.is_global() {
            format!("{:>11.6}° {:>11.6}° {:>7.1} m", self.x, self.y, self.z)
        } else {
            format!("N {:>8.2} E {:>8.2} D {:>7.2}", self.x, self.y, self.z)
        }
    }
}

/// One entry of an authoritative list snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct MissionItem {
    pub handle: WaypointHandle,
    pub waypoint: Waypoint,
}

impl MissionItem {
    pub fn new(handle: WaypointHandle, waypoint: Waypoint) -> Self {
        Self { handle, waypoint }
    }
}

pub const MISSION_FILE_VERSION: u32 = 1;

/// On-disk mission document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub waypoints: Vec<Waypoint>,
}

impl MissionFile {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self {
            version: MISSION_FILE_VERSION,
            saved_at: Utc::now(),
            waypoints,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mission: Self = serde_json::from_str(&contents)?;

        if mission.version != MISSION_FILE_VERSION {
            return Err(MissionError::Manager(format!(
                "unsupported mission file version {}",
                mission.version
            )));
        }

        Ok(mission)
    }
}
