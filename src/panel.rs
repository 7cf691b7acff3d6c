// src/panel.rs
//! Waypoint list panel: the editable and view-only tracks plus their controls
//!
//! The panel consumes notifications from one queue, one at a time, so a
//! reconciliation always finishes before the next event is looked at. User
//! gestures become requests to the waypoint manager; the panel never edits
//! the lists itself and only learns the outcome from later notifications.

use crate::{
    config::MissionConfig,
    event::{event_queue, Event, EventReceiver, EventSender, SubscriptionId},
    fleet::{self, SharedFleet},
    manager::{self, SharedManager},
    reconcile::{ReconcileReport, TrackViews},
    reorder::{self, MoveRequest},
    vehicle::{self, SharedVehicle},
    view::ViewKind,
    waypoint::{MavCommand, MavFrame, MissionItem, Waypoint, WaypointHandle},
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::{future::Future, path::Path, sync::Arc};

/// Name of the autopilot parameter holding the waypoint radius, in centimetres
pub const WP_RADIUS_PARAM: &str = "WPNAV_RADIUS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Editable,
    ViewOnly,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub updated: DateTime<Utc>,
}

/// State of the waypoint radius spin box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusControl {
    pub enabled: bool,
    /// metres
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehiclePose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

pub struct WaypointListPanel {
    manager: Option<SharedManager>,
    vehicle: Option<SharedVehicle>,
    fleet: Option<SharedFleet>,
    config: MissionConfig,
    sender: EventSender,
    receiver: EventReceiver,
    manager_subscription: Option<SubscriptionId>,
    vehicle_subscription: Option<SubscriptionId>,
    fleet_subscription: Option<SubscriptionId>,
    editable: TrackViews,
    view_only: TrackViews,
    status: StatusLine,
    visible: bool,
    active_tab: Tab,
    pose: VehiclePose,
    radius: RadiusControl,
    show_offline_warning: bool,
}

impl WaypointListPanel {
    pub fn new(manager: Option<SharedManager>, config: MissionConfig) -> Self {
        let (sender, receiver) = event_queue();
        let mut panel = Self {
            manager: None,
            vehicle: None,
            fleet: None,
            config,
            sender,
            receiver,
            manager_subscription: None,
            vehicle_subscription: None,
            fleet_subscription: None,
            editable: TrackViews::new(ViewKind::Editable),
            view_only: TrackViews::new(ViewKind::ViewOnly),
            status: StatusLine {
                text: String::new(),
                updated: Utc::now(),
            },
            visible: false,
            active_tab: Tab::Editable,
            pose: VehiclePose::default(),
            radius: RadiusControl {
                enabled: false,
                value: 0.0,
            },
            show_offline_warning: false,
        };

        match manager {
            Some(manager) => {
                // no vehicle yet: vehicle-only controls stay disabled
                panel.show_offline_warning = true;
                panel.attach_manager(manager);
                // a fresh panel on an existing manager must catch up with its lists
                panel.editable_list_changed();
                panel.view_only_list_changed();
            }
            None => debug!("Waypoint list created without a waypoint manager"),
        }

        panel
    }

    /// Follow the fleet's active vehicle selection
    pub fn attach_fleet(&mut self, fleet: SharedFleet) {
        if let (Some(old), Some(id)) = (&self.fleet, self.fleet_subscription.take()) {
            fleet::write(old).unsubscribe(id);
        }
        self.fleet_subscription = Some(fleet::write(&fleet).subscribe(self.sender.clone()));
        self.fleet = Some(fleet);
    }

    fn attach_manager(&mut self, manager: SharedManager) {
        let same = self
            .manager
            .as_ref()
            .map_or(false, |old| Arc::ptr_eq(old, &manager));
        self.detach_manager();
        if !same {
            // views belong to the old manager's records
            self.editable = TrackViews::new(ViewKind::Editable);
            self.view_only = TrackViews::new(ViewKind::ViewOnly);
        }
        self.manager_subscription = Some(manager::write(&manager).subscribe(self.sender.clone()));
        self.manager = Some(manager);
    }

    fn detach_manager(&mut self) {
        if let (Some(manager), Some(id)) = (&self.manager, self.manager_subscription.take()) {
            manager::write(manager).unsubscribe(id);
        }
    }

    /// Switch to another vehicle, or to none.
    ///
    /// The previous vehicle's editable list is cleared before its
    /// notifications are disconnected.
    pub fn set_vehicle(&mut self, vehicle: Option<SharedVehicle>) {
        if let Some(old) = self.vehicle.take() {
            self.clear_editable_list();
            self.detach_manager();
            if let Some(id) = self.vehicle_subscription.take() {
                vehicle::write(&old).unsubscribe(id);
            }
            self.radius.enabled = false;
        }

        let shared = match vehicle {
            Some(shared) => shared,
            None => return,
        };

        let manager = vehicle::read(&shared).waypoint_manager();
        info!("Waypoint list now following vehicle {}", vehicle::read(&shared).id());
        self.attach_manager(manager);
        self.vehicle_subscription = Some(vehicle::write(&shared).subscribe(self.sender.clone()));
        self.vehicle = Some(shared);
        self.radius.enabled = true;
        self.show_offline_warning = false;

        self.editable_list_changed();
        self.view_only_list_changed();
        self.read();
    }

    // ---- event loop ----

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::StatusText(text) => self.update_status_label(&text),
            Event::EditableListChanged => {
                self.editable_list_changed();
            }
            Event::EditableChanged { handle } => self.update_waypoint_editable(handle),
            Event::ViewOnlyListChanged => {
                self.view_only_list_changed();
            }
            Event::ViewOnlyChanged { handle } => self.update_waypoint_view_only(handle),
            Event::CurrentWaypointChanged(seq) => self.current_waypoint_view_only_changed(seq),
            Event::LocalPositionChanged { x, y, z, usec } => self.update_position(x, y, z, usec),
            Event::AttitudeChanged { roll, pitch, yaw, usec } => self.update_attitude(roll, pitch, yaw, usec),
            Event::ParameterChanged { component, name, value } => self.parameter_changed(component, &name, value),
            Event::ActiveVehicleSet(id) => {
                let vehicle = match (&self.fleet, id) {
                    (Some(fleet), Some(id)) => fleet::read(fleet).vehicle(id),
                    _ => None,
                };
                self.set_vehicle(vehicle);
            }
            Event::VehicleCreated(_) | Event::VehicleDeleted(_) => {}
        }
    }

    /// Handle every queued notification in delivery order
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Process notifications as they arrive until `shutdown` completes
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        self.run_with(shutdown, |_| {}).await;
    }

    /// Like [`run_until`](Self::run_until), calling `observer` after each notification
    pub async fn run_with<F, O>(&mut self, shutdown: F, mut observer: O)
    where
        F: Future<Output = ()>,
        O: FnMut(&Self),
    {
        tokio::pin!(shutdown);
        loop {
            let event = tokio::select! {
                biased;
                event = self.receiver.recv() => event,
                _ = &mut shutdown => None,
            };
            match event {
                Some(event) => {
                    self.handle_event(event);
                    observer(self);
                }
                None => break,
            }
        }
    }

    /// Sender feeding this panel's queue, for shells injecting notifications
    pub fn event_sender(&self) -> EventSender {
        self.sender.clone()
    }

    // ---- list synchronisation ----

    pub fn editable_list_changed(&mut self) -> ReconcileReport {
        match &self.manager {
            Some(manager) => {
                let list = manager::read(manager).editable_list();
                self.editable.reconcile(&list)
            }
            None => ReconcileReport::default(),
        }
    }

    pub fn view_only_list_changed(&mut self) -> ReconcileReport {
        let report = match &self.manager {
            Some(manager) => {
                let list = manager::read(manager).view_only_list();
                self.view_only.reconcile(&list)
            }
            None => return ReconcileReport::default(),
        };
        self.active_tab = Tab::ViewOnly;
        report
    }

    pub fn update_waypoint_editable(&mut self, handle: WaypointHandle) {
        let waypoint = match &self.manager {
            Some(manager) => manager::read(manager).editable_waypoint(handle),
            None => return,
        };
        if let Some(waypoint) = waypoint {
            self.editable.update_one(handle, &waypoint);
            self.active_tab = Tab::Editable;
        }
    }

    pub fn update_waypoint_view_only(&mut self, handle: WaypointHandle) {
        let waypoint = match &self.manager {
            Some(manager) => manager::read(manager).view_only_waypoint(handle),
            None => return,
        };
        if let Some(waypoint) = waypoint {
            self.view_only.update_one(handle, &waypoint);
            self.active_tab = Tab::ViewOnly;
        }
    }

    // ---- reordering and removal (editable track) ----

    fn editable_snapshot(&self) -> Option<Vec<MissionItem>> {
        match &self.manager {
            Some(manager) => Some(manager::read(manager).editable_list()),
            None => {
                debug!("No waypoint manager, request ignored");
                None
            }
        }
    }

    fn request_move(&self, handle: WaypointHandle, plan: fn(&[MissionItem], WaypointHandle) -> Option<MoveRequest>) {
        let list = match self.editable_snapshot() {
            Some(list) => list,
            None => return,
        };
        if let (Some(manager), Some(request)) = (&self.manager, plan(&list, handle)) {
            debug!("Requesting move {} -> {}", request.from, request.to);
            manager::write(manager).move_waypoint(request.from, request.to);
        }
    }

    pub fn move_up(&self, handle: WaypointHandle) {
        self.request_move(handle, reorder::plan_move_up);
    }

    pub fn move_down(&self, handle: WaypointHandle) {
        self.request_move(handle, reorder::plan_move_down);
    }

    pub fn move_top(&self, handle: WaypointHandle) {
        self.request_move(handle, reorder::plan_move_top);
    }

    pub fn move_bottom(&self, handle: WaypointHandle) {
        self.request_move(handle, reorder::plan_move_bottom);
    }

    pub fn remove_waypoint(&self, handle: WaypointHandle) {
        let list = match self.editable_snapshot() {
            Some(list) => list,
            None => return,
        };
        let seq = list
            .iter()
            .find(|item| item.handle == handle)
            .and_then(|item| reorder::plan_remove(&item.waypoint));

        if let (Some(manager), Some(seq)) = (&self.manager, seq) {
            debug!("Requesting removal of waypoint {}", seq);
            manager::write(manager).remove_waypoint(seq);
        }
    }

    /// Clear button: removes everything but home, only with a vehicle connected
    pub fn clear_waypoints(&mut self) {
        if self.vehicle.is_none() {
            debug!("No vehicle, clear ignored");
            return;
        }
        self.clear_editable_list();
    }

    /// Clear all but home regardless of vehicle state
    pub fn clear_wp_widget(&mut self) {
        self.clear_editable_list();
    }

    fn clear_editable_list(&self) {
        let manager = match &self.manager {
            Some(manager) => manager,
            None => return,
        };

        loop {
            let list = manager::read(manager).editable_list();
            let seq = match reorder::plan_clear_step(&list) {
                Some(seq) => seq,
                None => break,
            };

            manager::write(manager).remove_waypoint(seq);
            if manager::read(manager).editable_list().len() >= list.len() {
                warn!("Waypoint manager kept waypoint {}, stopping clear", seq);
                break;
            }
        }
    }

    // ---- current waypoint ----

    /// View-only gesture: ask the vehicle to fly to `seq`
    pub fn change_current_waypoint(&self, seq: u16) {
        if self.vehicle.is_none() {
            debug!("No vehicle, set current ignored");
            return;
        }
        if let Some(manager) = &self.manager {
            manager::write(manager).set_current_waypoint(seq);
        }
    }

    pub fn current_waypoint_editable_changed(&mut self, seq: u16) {
        let list = match &self.manager {
            Some(manager) => {
                let mut guard = manager::write(manager);
                guard.set_current_editable(seq);
                guard.editable_list()
            }
            None => return,
        };
        self.editable.mark_current(seq, &list);
    }

    pub fn current_waypoint_view_only_changed(&mut self, seq: u16) {
        self.current_waypoint_editable_changed(seq);

        let list = match &self.manager {
            Some(manager) => manager::read(manager).view_only_list(),
            None => return,
        };
        self.view_only.mark_current(seq, &list);
    }

    // ---- adding ----

    pub fn add_editable(&mut self) {
        self.add_editable_at(false);
    }

    pub fn add_current_position_waypoint(&mut self) {
        self.add_editable_at(true);
    }

    fn add_editable_at(&mut self, on_current_position: bool) {
        let manager = match &self.manager {
            Some(manager) => Arc::clone(manager),
            None => {
                debug!("No waypoint manager, add ignored");
                return;
            }
        };

        let (global, local) = match &self.vehicle {
            Some(shared) => {
                let guard = vehicle::read(shared);
                (guard.global_position(), guard.local_position())
            }
            None => (None, None),
        };
        let position_known = global.is_some() || local.is_some();

        let (last, frame, radius) = {
            let guard = manager::read(&manager);
            (
                guard.editable_list().pop().map(|item| item.waypoint),
                guard.frame_recommendation(),
                guard.acceptance_radius_recommendation(),
            )
        };

        if let Some(last) = last {
            if !(on_current_position && position_known) {
                manager::write(&manager).add_waypoint_editable(Waypoint::following(&last, frame));
                return;
            }
        }

        let home = |manager: &SharedManager| {
            let altitude = manager::read(manager).altitude_recommendation(frame);
            first_waypoint(self.config.home_latitude, self.config.home_longitude, altitude, radius, frame)
        };

        let (status, waypoint) = if self.vehicle.is_none() {
            ("No UAV connected. Adding default dummy HOME waypoint".to_string(), home(&manager))
        } else if let Some(position) = global {
            let status = format!("Added default {} waypoint.", frame.display_name());
            if on_current_position {
                let altitude = if frame == MavFrame::Global {
                    position.altitude_amsl
                } else {
                    position.altitude_relative
                };
                (
                    status,
                    first_waypoint(position.latitude, position.longitude, altitude, radius, frame),
                )
            } else {
                (status, home(&manager))
            }
        } else if let Some(position) = local {
            let status = "Added default LOCAL (NED) waypoint.".to_string();
            if on_current_position {
                (status, first_waypoint(position.x, position.y, position.z, radius, MavFrame::LocalNed))
            } else {
                (status, first_waypoint(0.0, 0.0, -0.5, radius, MavFrame::LocalNed))
            }
        } else {
            (
                "WARNING: No position known. Adding default LOCAL (NED) waypoint".to_string(),
                home(&manager),
            )
        };

        self.update_status_label(&status);
        manager::write(&manager).add_waypoint_editable(waypoint);
    }

    // ---- vehicle transfer ----

    pub fn transmit(&self) {
        if let (Some(_), Some(manager)) = (&self.vehicle, &self.manager) {
            manager::write(manager).write_waypoints();
        }
    }

    /// Read the onboard mission into both lists
    pub fn read(&self) {
        if let (Some(_), Some(manager)) = (&self.vehicle, &self.manager) {
            manager::write(manager).read_waypoints(true);
        }
    }

    /// Read the onboard mission into the view-only list
    pub fn refresh(&self) {
        if let (Some(_), Some(manager)) = (&self.vehicle, &self.manager) {
            manager::write(manager).read_waypoints(false);
        }
    }

    // ---- persistence ----

    /// `None` means the file dialog was cancelled
    pub fn save_waypoints(&mut self, path: Option<&Path>) {
        let (manager, path) = match (&self.manager, path) {
            (Some(manager), Some(path)) => (Arc::clone(manager), path),
            _ => return,
        };
        let result = manager::write(&manager).save_waypoints(path);
        if let Err(e) = result {
            warn!("Saving mission to {} failed: {}", path.display(), e);
            self.update_status_label(&format!("Could not save {}: {}", path.display(), e));
        }
    }

    /// `None` means the file dialog was cancelled
    pub fn load_waypoints(&mut self, path: Option<&Path>) {
        let (manager, path) = match (&self.manager, path) {
            (Some(manager), Some(path)) => (Arc::clone(manager), path),
            _ => return,
        };
        let result = manager::write(&manager).load_waypoints(path);
        if let Err(e) = result {
            warn!("Loading mission from {} failed: {}", path.display(), e);
            self.update_status_label(&format!("Could not load {}: {}", path.display(), e));
        }
    }

    // ---- controls ----

    pub fn default_altitude(&self) -> Option<f64> {
        self.manager.as_ref().map(|m| manager::read(m).default_altitude())
    }

    pub fn set_default_altitude(&self, altitude: f64) {
        if let Some(manager) = &self.manager {
            manager::write(manager).set_default_altitude(altitude);
        }
    }

    /// Radius spin box edited, metres
    pub fn wp_radius_changed(&mut self, radius: f64) {
        if let Some(shared) = &self.vehicle {
            self.radius.value = radius;
            vehicle::write(shared).set_parameter(1, WP_RADIUS_PARAM, radius * 100.0);
        }
    }

    pub fn parameter_changed(&mut self, _component: u8, name: &str, value: f64) {
        if name.contains(WP_RADIUS_PARAM) {
            self.radius.value = value / 100.0;
        }
    }

    /// Use the vehicle's global position as home for waypoints added without one
    pub fn set_home_to_vehicle(&mut self) -> bool {
        let position = self
            .vehicle
            .as_ref()
            .and_then(|shared| vehicle::read(shared).global_position());

        match position {
            Some(p) => {
                self.config.update_home(p.latitude, p.longitude);
                self.update_status_label(&format!("Home set to {:.6}, {:.6}", p.latitude, p.longitude));
                true
            }
            None => {
                self.update_status_label("No global position known, home unchanged");
                false
            }
        }
    }

    /// Copy the manager's current defaults into the configuration
    pub fn sync_config_defaults(&mut self) {
        let defaults = self.manager.as_ref().map(|m| {
            let guard = manager::read(m);
            (
                guard.default_altitude(),
                guard.acceptance_radius_recommendation(),
                guard.frame_recommendation(),
            )
        });
        if let Some((altitude, radius, frame)) = defaults {
            self.config.update_defaults(altitude, radius, frame);
        }
    }

    pub fn update_position(&mut self, x: f64, y: f64, z: f64, _usec: u64) {
        self.pose.x = x;
        self.pose.y = y;
        self.pose.z = z;
    }

    pub fn update_attitude(&mut self, _roll: f64, _pitch: f64, yaw: f64, _usec: u64) {
        self.pose.yaw = yaw;
    }

    pub fn update_status_label(&mut self, text: &str) {
        self.status = StatusLine {
            text: text.to_string(),
            updated: Utc::now(),
        };
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    // ---- accessors ----

    pub fn status_text(&self) -> &str {
        &self.status.text
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn pose(&self) -> VehiclePose {
        self.pose
    }

    pub fn radius_control(&self) -> RadiusControl {
        self.radius
    }

    pub fn show_offline_warning(&self) -> bool {
        self.show_offline_warning
    }

    pub fn has_vehicle(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn manager(&self) -> Option<&SharedManager> {
        self.manager.as_ref()
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn editable_views(&self) -> &TrackViews {
        &self.editable
    }

    pub fn editable_views_mut(&mut self) -> &mut TrackViews {
        &mut self.editable
    }

    pub fn view_only_views(&self) -> &TrackViews {
        &self.view_only
    }
}

fn first_waypoint(x: f64, y: f64, z: f64, radius: f64, frame: MavFrame) -> Waypoint {
    Waypoint::new(0, x, y, z, 0.0, radius, 0.0, 0.0, true, true, frame, MavCommand::NavWaypoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{MemoryWaypointManager, WaypointManager};
    use crate::vehicle::{GlobalPosition, LocalPosition, SimulatedVehicle, Vehicle};
    use crate::view::ViewId;
    use std::sync::RwLock;

    type Memory = Arc<RwLock<MemoryWaypointManager>>;

    fn memory_manager(count: usize) -> Memory {
        let mut manager = MemoryWaypointManager::new();
        for i in 0..count {
            manager.add_waypoint_editable(Waypoint::nav(MavFrame::GlobalRelativeAlt, 47.0 + i as f64, 8.0, 20.0, 3.0));
        }
        Arc::new(RwLock::new(manager))
    }

    fn panel_for(manager: &Memory) -> WaypointListPanel {
        let shared: SharedManager = manager.clone();
        let mut panel = WaypointListPanel::new(Some(shared), MissionConfig::default());
        panel.process_pending();
        panel
    }

    fn handles(manager: &Memory) -> Vec<WaypointHandle> {
        manager.read().unwrap().editable_list().iter().map(|i| i.handle).collect()
    }

    fn attach_vehicle(panel: &mut WaypointListPanel, manager: &Memory) -> Arc<RwLock<SimulatedVehicle>> {
        let sim = Arc::new(RwLock::new(SimulatedVehicle::new(1, "copter", manager.clone())));
        let shared: SharedVehicle = sim.clone();
        panel.set_vehicle(Some(shared));
        panel.process_pending();
        sim
    }

    #[test]
    fn test_construction_catches_up_with_manager() {
        let manager = memory_manager(3);
        let panel = panel_for(&manager);

        assert!(!panel.is_visible());
        assert!(panel.show_offline_warning());
        assert!(!panel.radius_control().enabled);
        assert!(panel.editable_views().is_consistent_with(&manager.read().unwrap().editable_list()));
        assert_eq!(panel.active_tab(), Tab::ViewOnly);
    }

    #[test]
    fn test_without_manager_everything_is_noop() {
        let mut panel = WaypointListPanel::new(None, MissionConfig::default());
        panel.add_editable();
        panel.move_up(WaypointHandle::new(1));
        panel.remove_waypoint(WaypointHandle::new(1));
        panel.clear_wp_widget();
        panel.current_waypoint_view_only_changed(0);
        panel.save_waypoints(Some(Path::new("/nonexistent/mission.json")));
        assert_eq!(panel.process_pending(), 0);
        assert!(panel.editable_views().is_empty());
        assert_eq!(panel.default_altitude(), None);
    }

    #[test]
    fn test_move_up_at_first_movable_slot_is_noop() {
        let manager = memory_manager(4);
        let mut panel = panel_for(&manager);
        let before = handles(&manager);

        panel.move_up(before[1]);
        assert_eq!(panel.process_pending(), 0);
        assert_eq!(handles(&manager), before);
    }

    #[test]
    fn test_move_up_requests_swap_and_view_follows() {
        let manager = memory_manager(4);
        let mut panel = panel_for(&manager);
        let before = handles(&manager);
        let view_id = panel.editable_views().view(before[2]).unwrap().id();

        panel.move_up(before[2]);
        panel.process_pending();

        let after = handles(&manager);
        assert_eq!(after, vec![before[0], before[2], before[1], before[3]]);
        assert_eq!(panel.editable_views().view(before[2]).unwrap().id(), view_id);
        assert_eq!(panel.editable_views().layout().item_at(1), Some(view_id));
    }

    #[test]
    fn test_move_down_top_bottom() {
        let manager = memory_manager(5);
        let mut panel = panel_for(&manager);
        let h = handles(&manager);

        panel.move_down(h[1]);
        panel.process_pending();
        assert_eq!(handles(&manager), vec![h[0], h[2], h[1], h[3], h[4]]);

        panel.move_top(h[4]);
        panel.process_pending();
        assert_eq!(handles(&manager), vec![h[0], h[4], h[2], h[1], h[3]]);

        panel.move_bottom(h[4]);
        panel.process_pending();
        assert_eq!(handles(&manager), vec![h[0], h[2], h[1], h[3], h[4]]);

        panel.move_down(h[4]);
        assert_eq!(panel.process_pending(), 0);
        assert!(panel.editable_views().is_consistent_with(&manager.read().unwrap().editable_list()));
    }

    #[test]
    fn test_remove_home_is_never_requested() {
        let manager = memory_manager(3);
        let mut panel = panel_for(&manager);
        let h = handles(&manager);

        panel.remove_waypoint(h[0]);
        assert_eq!(panel.process_pending(), 0);
        assert_eq!(handles(&manager).len(), 3);

        panel.remove_waypoint(h[2]);
        panel.process_pending();
        assert_eq!(handles(&manager), vec![h[0], h[1]]);
        assert!(!panel.editable_views().contains(h[2]));
    }

    #[test]
    fn test_clear_requires_vehicle_but_widget_clear_does_not() {
        let manager = memory_manager(4);
        let mut panel = panel_for(&manager);

        panel.clear_waypoints();
        assert_eq!(handles(&manager).len(), 4);

        panel.clear_wp_widget();
        panel.process_pending();
        assert_eq!(handles(&manager).len(), 1);
        assert_eq!(panel.editable_views().len(), 1);
    }

    #[test]
    fn test_current_index_out_of_range_keeps_marks() {
        let manager = memory_manager(3);
        let mut panel = panel_for(&manager);
        let h = handles(&manager);

        panel.handle_event(Event::CurrentWaypointChanged(1));
        assert!(panel.editable_views().view(h[1]).unwrap().is_current());

        panel.handle_event(Event::CurrentWaypointChanged(7));
        let marks: Vec<bool> = h
            .iter()
            .map(|handle| panel.editable_views().view(*handle).unwrap().is_current())
            .collect();
        assert_eq!(marks, vec![false, true, false]);
    }

    #[test]
    fn test_add_without_vehicle_creates_dummy_home() {
        let manager = memory_manager(0);
        let mut panel = panel_for(&manager);

        panel.add_editable();
        panel.process_pending();

        let list = manager.read().unwrap().editable_list();
        assert_eq!(list.len(), 1);
        let home = &list[0].waypoint;
        assert_eq!((home.latitude(), home.longitude()), (47.3977, 8.5456));
        assert_eq!(home.altitude(), 20.0);
        assert!(home.current);
        assert_eq!(panel.status_text(), "No UAV connected. Adding default dummy HOME waypoint");
        assert!(!panel.editable_views().view(list[0].handle).unwrap().is_visible());
    }

    #[test]
    fn test_add_appends_after_last() {
        let manager = memory_manager(2);
        let mut panel = panel_for(&manager);

        panel.add_editable();
        panel.process_pending();

        let list = manager.read().unwrap().editable_list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].waypoint.latitude(), 48.0);
        assert_eq!(list[2].waypoint.id, 2);
        assert!(panel.editable_views().is_consistent_with(&list));
    }

    #[test]
    fn test_add_at_current_global_position() {
        let manager = memory_manager(2);
        let mut panel = panel_for(&manager);
        let sim = attach_vehicle(&mut panel, &manager);
        sim.write().unwrap().set_global_position(Some(GlobalPosition {
            latitude: 46.5,
            longitude: 7.5,
            altitude_amsl: 600.0,
            altitude_relative: 45.0,
        }));

        panel.add_current_position_waypoint();
        panel.process_pending();

        let list = manager.read().unwrap().editable_list();
        let added = &list.last().unwrap().waypoint;
        assert_eq!((added.latitude(), added.longitude(), added.altitude()), (46.5, 7.5, 45.0));
        assert_eq!(panel.status_text(), "Added default GLOBAL (Relative alt.) waypoint.");
    }

    #[test]
    fn test_add_first_local_waypoint() {
        let manager = memory_manager(0);
        let mut panel = panel_for(&manager);
        let sim = attach_vehicle(&mut panel, &manager);
        sim.write().unwrap().set_local_position(Some(LocalPosition { x: 3.0, y: 4.0, z: -2.0 }));
        panel.process_pending();
        assert_eq!(panel.pose().x, 3.0);

        panel.add_editable();
        panel.process_pending();

        let list = manager.read().unwrap().editable_list();
        assert_eq!(list[0].waypoint.frame, MavFrame::LocalNed);
        assert_eq!(list[0].waypoint.z, -0.5);
        assert_eq!(panel.status_text(), "Added default LOCAL (NED) waypoint.");
    }

    #[test]
    fn test_vehicle_controls() {
        let manager = memory_manager(3);
        let mut panel = panel_for(&manager);

        panel.transmit();
        assert!(manager.read().unwrap().onboard_mission().is_empty());

        // connecting reads the (empty) onboard mission into the editable list
        let sim = attach_vehicle(&mut panel, &manager);
        assert!(panel.radius_control().enabled);
        assert!(panel.editable_views().is_empty());

        for i in 0..3 {
            manager
                .write()
                .unwrap()
                .add_waypoint_editable(Waypoint::nav(MavFrame::GlobalRelativeAlt, 47.0 + i as f64, 8.0, 20.0, 3.0));
        }
        panel.transmit();
        panel.refresh();
        panel.process_pending();
        assert_eq!(panel.view_only_views().len(), 3);
        assert_eq!(panel.status_text(), "Read 3 waypoints");

        panel.wp_radius_changed(2.5);
        assert_eq!(sim.read().unwrap().parameter(WP_RADIUS_PARAM), Some(250.0));
        panel.process_pending();
        assert_eq!(panel.radius_control().value, 2.5);

        panel.change_current_waypoint(2);
        panel.process_pending();
        let onboard = panel.view_only_views().ordered_views();
        assert!(onboard[2].is_current());
        assert!(!onboard[0].is_current());
    }

    #[test]
    fn test_switching_vehicle_clears_previous_list() {
        let first = memory_manager(4);
        let second = memory_manager(2);
        first.write().unwrap().write_waypoints();
        second.write().unwrap().write_waypoints();

        let mut panel = panel_for(&first);
        attach_vehicle(&mut panel, &first);
        assert_eq!(panel.editable_views().len(), 4);

        let sim = Arc::new(RwLock::new(SimulatedVehicle::new(2, "plane", second.clone())));
        let shared: SharedVehicle = sim.clone();
        panel.set_vehicle(Some(shared));
        panel.process_pending();

        assert_eq!(handles(&first).len(), 1);
        let list = second.read().unwrap().editable_list();
        assert_eq!(list.len(), 2);
        assert!(panel.editable_views().is_consistent_with(&list));
    }

    #[test]
    fn test_no_view_survives_manager_switch() {
        let first = memory_manager(2);
        let second = memory_manager(6);
        first.write().unwrap().write_waypoints();
        second.write().unwrap().write_waypoints();

        let mut panel = panel_for(&first);
        attach_vehicle(&mut panel, &first);
        let old_views: Vec<ViewId> = panel
            .editable_views()
            .ordered_views()
            .iter()
            .chain(panel.view_only_views().ordered_views().iter())
            .map(|view| view.id())
            .collect();
        assert_eq!(old_views.len(), 4);

        let sim = Arc::new(RwLock::new(SimulatedVehicle::new(2, "plane", second.clone())));
        let shared: SharedVehicle = sim.clone();
        panel.set_vehicle(Some(shared));
        panel.process_pending();

        let editable = second.read().unwrap().editable_list();
        assert!(panel.editable_views().is_consistent_with(&editable));
        for item in &editable {
            let view = panel.editable_views().view(item.handle).unwrap();
            assert!(!old_views.contains(&view.id()));
            assert_eq!(view.fields().id, item.waypoint.id);
            assert_eq!(view.is_visible(), item.waypoint.id != 0);
        }
        for view in panel.view_only_views().ordered_views() {
            assert!(!old_views.contains(&view.id()));
        }
    }

    /// Manager that reports a fixed list and ignores every mutation
    struct FrozenManager {
        list: Vec<MissionItem>,
    }

    impl WaypointManager for FrozenManager {
        fn editable_list(&self) -> Vec<MissionItem> {
            self.list.clone()
        }
        fn view_only_list(&self) -> Vec<MissionItem> {
            Vec::new()
        }
        fn add_waypoint_editable(&mut self, _waypoint: Waypoint) -> WaypointHandle {
            WaypointHandle::next()
        }
        fn update_waypoint_editable(&mut self, _handle: WaypointHandle, _waypoint: Waypoint) -> bool {
            false
        }
        fn remove_waypoint(&mut self, _seq: u16) {}
        fn move_waypoint(&mut self, _from: usize, _to: usize) {}
        fn set_current_editable(&mut self, _seq: u16) {}
        fn set_current_waypoint(&mut self, _seq: u16) {}
        fn write_waypoints(&mut self) {}
        fn read_waypoints(&mut self, _read_to_edit: bool) {}
        fn save_waypoints(&mut self, _path: &Path) -> crate::error::Result<()> {
            Ok(())
        }
        fn load_waypoints(&mut self, _path: &Path) -> crate::error::Result<()> {
            Ok(())
        }
        fn default_altitude(&self) -> f64 {
            20.0
        }
        fn set_default_altitude(&mut self, _altitude: f64) {}
        fn acceptance_radius_recommendation(&self) -> f64 {
            3.0
        }
        fn frame_recommendation(&self) -> MavFrame {
            MavFrame::GlobalRelativeAlt
        }
        fn altitude_recommendation(&self, _frame: MavFrame) -> f64 {
            20.0
        }
        fn subscribe(&mut self, _sender: EventSender) -> SubscriptionId {
            SubscriptionId(0)
        }
        fn unsubscribe(&mut self, _id: SubscriptionId) {}
    }

    #[test]
    fn test_rejected_requests_leave_views_alone() {
        let list: Vec<MissionItem> = (0..4u16)
            .map(|id| {
                let mut wp = Waypoint::nav(MavFrame::GlobalRelativeAlt, 47.0, 8.0 + id as f64, 20.0, 3.0);
                wp.id = id;
                MissionItem::new(WaypointHandle::next(), wp)
            })
            .collect();
        let shared = manager::shared(FrozenManager { list: list.clone() });
        let mut panel = WaypointListPanel::new(Some(shared), MissionConfig::default());
        let layout: Vec<ViewId> = panel.editable_views().layout().iter().collect();

        panel.move_up(list[2].handle);
        panel.move_down(list[1].handle);
        panel.move_top(list[3].handle);
        panel.move_bottom(list[1].handle);
        panel.remove_waypoint(list[2].handle);
        panel.clear_wp_widget();

        assert_eq!(panel.process_pending(), 0);
        assert_eq!(panel.editable_views().layout().iter().collect::<Vec<_>>(), layout);
        assert!(panel.editable_views().is_consistent_with(&list));
    }

    #[test]
    fn test_home_and_defaults_flow_into_config() {
        let manager = memory_manager(0);
        let mut panel = panel_for(&manager);
        assert!(!panel.set_home_to_vehicle());

        let sim = attach_vehicle(&mut panel, &manager);
        sim.write().unwrap().set_global_position(Some(GlobalPosition {
            latitude: 46.2,
            longitude: 6.1,
            altitude_amsl: 400.0,
            altitude_relative: 0.0,
        }));
        assert!(panel.set_home_to_vehicle());
        assert_eq!((panel.config().home_latitude, panel.config().home_longitude), (46.2, 6.1));

        panel.set_default_altitude(55.0);
        manager
            .write()
            .unwrap()
            .add_waypoint_editable(Waypoint::nav(MavFrame::Global, 46.2, 6.1, 480.0, 7.0));
        panel.sync_config_defaults();
        assert_eq!(panel.config().default_altitude, 55.0);
        assert_eq!(panel.config().acceptance_radius, 7.0);
        assert_eq!(panel.config().default_frame, MavFrame::Global);
    }

    #[test]
    fn test_dialog_cancel_is_noop_and_failures_reach_status() {
        let manager = memory_manager(2);
        let mut panel = panel_for(&manager);

        panel.save_waypoints(None);
        panel.load_waypoints(None);
        assert_eq!(panel.process_pending(), 0);

        let dir = tempfile::tempdir().unwrap();
        panel.load_waypoints(Some(&dir.path().join("missing.json")));
        assert!(panel.status_text().starts_with("Could not load"));
    }

    #[test]
    fn test_single_record_update_switches_tab() {
        let manager = memory_manager(2);
        let mut panel = panel_for(&manager);
        let h = handles(&manager);

        let mut changed = Waypoint::nav(MavFrame::GlobalRelativeAlt, 40.0, 9.0, 60.0, 3.0);
        changed.param1 = 5.0;
        manager.write().unwrap().update_waypoint_editable(h[1], changed);
        panel.process_pending();

        assert_eq!(panel.active_tab(), Tab::Editable);
        assert_eq!(panel.editable_views().view(h[1]).unwrap().fields().hold_time, 5.0);
    }

    #[tokio::test]
    async fn test_run_until_processes_queue() {
        let manager = memory_manager(3);
        let mut panel = panel_for(&manager);
        let h = handles(&manager);

        manager.write().unwrap().move_waypoint(1, 2);
        panel
            .run_until(tokio::time::sleep(std::time::Duration::from_millis(20)))
            .await;

        let list = manager.read().unwrap().editable_list();
        assert_eq!(list[2].handle, h[1]);
        assert!(panel.editable_views().is_consistent_with(&list));
    }
}
