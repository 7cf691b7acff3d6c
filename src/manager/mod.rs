// src/manager/mod.rs
//! Interface to the component that owns the authoritative waypoint lists

pub mod memory;

pub use memory::MemoryWaypointManager;

use crate::{
    error::Result,
    event::{EventSender, SubscriptionId},
    waypoint::{MavFrame, MissionItem, Waypoint, WaypointHandle},
};
use log::warn;
use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Owner of the editable and view-only waypoint lists.
///
/// Mutations are requests: implementations may ignore them, and report the
/// resulting state only through the events sent to subscribers.
pub trait WaypointManager: Send + Sync {
    /// Locally composed mission, in order
    fn editable_list(&self) -> Vec<MissionItem>;

    /// Mirror of the vehicle's onboard mission, in order
    fn view_only_list(&self) -> Vec<MissionItem>;

    fn editable_waypoint(&self, handle: WaypointHandle) -> Option<Waypoint> {
        self.editable_list()
            .into_iter()
            .find(|item| item.handle == handle)
            .map(|item| item.waypoint)
    }

    fn view_only_waypoint(&self, handle: WaypointHandle) -> Option<Waypoint> {
        self.view_only_list()
            .into_iter()
            .find(|item| item.handle == handle)
            .map(|item| item.waypoint)
    }

    fn add_waypoint_editable(&mut self, waypoint: Waypoint) -> WaypointHandle;
    fn update_waypoint_editable(&mut self, handle: WaypointHandle, waypoint: Waypoint) -> bool;
    fn remove_waypoint(&mut self, seq: u16);
    fn move_waypoint(&mut self, from: usize, to: usize);

    fn set_current_editable(&mut self, seq: u16);
    /// Ask the vehicle to fly to waypoint `seq`
    fn set_current_waypoint(&mut self, seq: u16);

    /// Send the editable list to the vehicle
    fn write_waypoints(&mut self);
    /// Fetch the onboard mission, optionally replacing the editable list too
    fn read_waypoints(&mut self, read_to_edit: bool);

    fn save_waypoints(&mut self, path: &Path) -> Result<()>;
    fn load_waypoints(&mut self, path: &Path) -> Result<()>;

    fn default_altitude(&self) -> f64;
    fn set_default_altitude(&mut self, altitude: f64);
    fn acceptance_radius_recommendation(&self) -> f64;
    fn frame_recommendation(&self) -> MavFrame;
    fn altitude_recommendation(&self, frame: MavFrame) -> f64;

    fn subscribe(&mut self, sender: EventSender) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
}

pub type SharedManager = Arc<RwLock<dyn WaypointManager>>;

pub fn shared<M: WaypointManager + 'static>(manager: M) -> SharedManager {
    Arc::new(RwLock::new(manager))
}

/// Read access, recovering from a poisoned lock
pub fn read(manager: &SharedManager) -> RwLockReadGuard<'_, dyn WaypointManager + 'static> {
    manager.read().unwrap_or_else(|poisoned| {
        warn!("Waypoint manager lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

/// Write access, recovering from a poisoned lock
pub fn write(manager: &SharedManager) -> RwLockWriteGuard<'_, dyn WaypointManager + 'static> {
    manager.write().unwrap_or_else(|poisoned| {
        warn!("Waypoint manager lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
