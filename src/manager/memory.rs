// src/manager/memory.rs
//! In-memory waypoint manager with a simulated onboard mission

use super::WaypointManager;
use crate::{
    config::MissionConfig,
    error::Result,
    event::{Event, EventSender, SubscriptionId, Subscribers},
    waypoint::{MavFrame, MissionFile, MissionItem, Waypoint, WaypointHandle},
};
use log::{debug, info};
use std::{collections::HashMap, path::Path};

/// Waypoint manager that keeps records in an arena keyed by handle.
///
/// Sequence ids always equal list positions; they are renumbered after every
/// structural change. The "onboard" mission stands in for the vehicle.
pub struct MemoryWaypointManager {
    records: HashMap<WaypointHandle, Waypoint>,
    editable: Vec<WaypointHandle>,
    view_only: Vec<WaypointHandle>,
    onboard: Vec<Waypoint>,
    default_altitude: f64,
    acceptance_radius: f64,
    default_frame: MavFrame,
    subscribers: Subscribers,
}

impl MemoryWaypointManager {
    pub fn new() -> Self {
        Self::from_config(&MissionConfig::default())
    }

    pub fn from_config(config: &MissionConfig) -> Self {
        Self {
            records: HashMap::new(),
            editable: Vec::new(),
            view_only: Vec::new(),
            onboard: Vec::new(),
            default_altitude: config.default_altitude,
            acceptance_radius: config.acceptance_radius,
            default_frame: config.default_frame,
            subscribers: Subscribers::new(),
        }
    }

    /// Mission currently stored on the simulated vehicle
    pub fn onboard_mission(&self) -> &[Waypoint] {
        &self.onboard
    }

    /// Replace the simulated onboard mission without touching either list
    pub fn set_onboard_mission(&mut self, waypoints: Vec<Waypoint>) {
        self.onboard = waypoints;
        for (seq, wp) in self.onboard.iter_mut().enumerate() {
            wp.id = seq as u16;
        }
    }

    fn allocate(&mut self, waypoint: Waypoint) -> WaypointHandle {
        let handle = WaypointHandle::next();
        self.records.insert(handle, waypoint);
        handle
    }

    fn snapshot(&self, handles: &[WaypointHandle]) -> Vec<MissionItem> {
        handles
            .iter()
            .filter_map(|handle| {
                self.records
                    .get(handle)
                    .map(|wp| MissionItem::new(*handle, wp.clone()))
            })
            .collect()
    }

    fn renumber(records: &mut HashMap<WaypointHandle, Waypoint>, handles: &[WaypointHandle]) {
        for (seq, handle) in handles.iter().enumerate() {
            if let Some(wp) = records.get_mut(handle) {
                wp.id = seq as u16;
            }
        }
    }

    /// Swap a whole list for fresh records built from `waypoints`
    fn replace_list(&mut self, editable: bool, waypoints: Vec<Waypoint>) {
        let old = if editable {
            std::mem::take(&mut self.editable)
        } else {
            std::mem::take(&mut self.view_only)
        };
        for handle in old {
            self.records.remove(&handle);
        }

        let handles: Vec<WaypointHandle> = waypoints.into_iter().map(|wp| self.allocate(wp)).collect();
        Self::renumber(&mut self.records, &handles);

        if editable {
            self.editable = handles;
            self.subscribers.emit(Event::EditableListChanged);
        } else {
            self.view_only = handles;
            self.subscribers.emit(Event::ViewOnlyListChanged);
        }
    }

    fn last_editable(&self) -> Option<&Waypoint> {
        self.editable.last().and_then(|handle| self.records.get(handle))
    }

    fn status(&mut self, text: String) {
        info!("{}", text);
        self.subscribers.emit(Event::StatusText(text));
    }
}

impl Default for MemoryWaypointManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointManager for MemoryWaypointManager {
    fn editable_list(&self) -> Vec<MissionItem> {
        self.snapshot(&self.editable)
    }

    fn view_only_list(&self) -> Vec<MissionItem> {
        self.snapshot(&self.view_only)
    }

    fn add_waypoint_editable(&mut self, waypoint: Waypoint) -> WaypointHandle {
        let handle = self.allocate(waypoint);
        self.editable.push(handle);
        Self::renumber(&mut self.records, &self.editable);
        self.subscribers.emit(Event::EditableListChanged);
        handle
    }

    fn update_waypoint_editable(&mut self, handle: WaypointHandle, mut waypoint: Waypoint) -> bool {
        if !self.editable.contains(&handle) {
            debug!("Update for unknown waypoint {} ignored", handle);
            return false;
        }

        match self.records.get_mut(&handle) {
            Some(record) => {
                // sequence ids belong to the list, not the caller
                waypoint.id = record.id;
                *record = waypoint;
                self.subscribers.emit(Event::EditableChanged { handle });
                true
            }
            None => false,
        }
    }

    fn remove_waypoint(&mut self, seq: u16) {
        let position = self.editable.iter().position(|handle| {
            self.records.get(handle).map_or(false, |wp| wp.id == seq)
        });

        match position {
            Some(index) => {
                let handle = self.editable.remove(index);
                self.records.remove(&handle);
                Self::renumber(&mut self.records, &self.editable);
                self.subscribers.emit(Event::EditableListChanged);
            }
            None => debug!("Remove of unknown waypoint {} ignored", seq),
        }
    }

    fn move_waypoint(&mut self, from: usize, to: usize) {
        if from >= self.editable.len() || to >= self.editable.len() {
            debug!(
                "Move {} -> {} ignored, list has {} waypoints",
                from,
                to,
                self.editable.len()
            );
            return;
        }
        if from == to {
            return;
        }

        let handle = self.editable.remove(from);
        self.editable.insert(to, handle);
        Self::renumber(&mut self.records, &self.editable);
        self.subscribers.emit(Event::EditableListChanged);
    }

    fn set_current_editable(&mut self, seq: u16) {
        if usize::from(seq) >= self.editable.len() {
            return;
        }
        for handle in &self.editable {
            if let Some(wp) = self.records.get_mut(handle) {
                wp.current = wp.id == seq;
            }
        }
    }

    fn set_current_waypoint(&mut self, seq: u16) {
        if usize::from(seq) >= self.onboard.len() {
            debug!("Vehicle has no waypoint {}, SET_CURRENT ignored", seq);
            return;
        }

        for wp in self.onboard.iter_mut() {
            wp.current = wp.id == seq;
        }
        for handle in &self.view_only {
            if let Some(wp) = self.records.get_mut(handle) {
                wp.current = wp.id == seq;
            }
        }
        self.subscribers.emit(Event::CurrentWaypointChanged(seq));
    }

    fn write_waypoints(&mut self) {
        self.onboard = self.snapshot(&self.editable).into_iter().map(|item| item.waypoint).collect();
        let count = self.onboard.len();
        self.status(format!("Transmitted {} waypoints", count));
    }

    fn read_waypoints(&mut self, read_to_edit: bool) {
        let mission = self.onboard.clone();
        let count = mission.len();

        if read_to_edit {
            self.replace_list(true, mission.clone());
        }
        self.replace_list(false, mission);
        self.status(format!("Read {} waypoints", count));
    }

    fn save_waypoints(&mut self, path: &Path) -> Result<()> {
        let waypoints = self.snapshot(&self.editable).into_iter().map(|item| item.waypoint).collect();
        MissionFile::new(waypoints).save_to_file(path)?;
        self.status(format!("Saved mission to {}", path.display()));
        Ok(())
    }

    fn load_waypoints(&mut self, path: &Path) -> Result<()> {
        let mission = MissionFile::load_from_file(path)?;
        let count = mission.waypoints.len();
        self.replace_list(true, mission.waypoints);
        self.status(format!("Loaded {} waypoints from {}", count, path.display()));
        Ok(())
    }

    fn default_altitude(&self) -> f64 {
        self.default_altitude
    }

    fn set_default_altitude(&mut self, altitude: f64) {
        self.default_altitude = altitude;
    }

    fn acceptance_radius_recommendation(&self) -> f64 {
        self.last_editable()
            .map_or(self.acceptance_radius, |wp| wp.acceptance_radius())
    }

    fn frame_recommendation(&self) -> MavFrame {
        self.last_editable().map_or(self.default_frame, |wp| wp.frame)
    }

    fn altitude_recommendation(&self, frame: MavFrame) -> f64 {
        match self.last_editable() {
            Some(wp) if wp.frame == frame => wp.altitude(),
            _ if frame == MavFrame::LocalNed => -self.default_altitude,
            _ => self.default_altitude,
        }
    }

    fn subscribe(&mut self, sender: EventSender) -> SubscriptionId {
        self.subscribers.subscribe(sender)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.unsubscribe(id);
    }
}
