// src/lib.rs
//! Mission List Library
//!
//! Keeps the on-screen waypoint lists of a ground control station in step
//! with the waypoint manager that owns the authoritative mission, and turns
//! user gestures into requests against that manager.

pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod fleet;
pub mod manager;
pub mod panel;
pub mod reconcile;
pub mod reorder;
pub mod vehicle;
pub mod vehicle_list;
pub mod view;
pub mod waypoint;

// Re-export main types for convenience
pub use config::MissionConfig;
pub use error::{MissionError, Result};
pub use event::Event;
pub use fleet::{Fleet, SharedFleet};
pub use manager::{MemoryWaypointManager, SharedManager, WaypointManager};
pub use panel::WaypointListPanel;
pub use reconcile::{ReconcileReport, TrackViews};
pub use vehicle::{SharedVehicle, SimulatedVehicle, Vehicle};
pub use vehicle_list::VehicleListPanel;
pub use waypoint::{MavFrame, MissionItem, Waypoint, WaypointHandle};
