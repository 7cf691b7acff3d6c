// src/vehicle.rs
//! Connected vehicle interface and a simulated implementation

use crate::{
    event::{Event, EventSender, SubscriptionId, Subscribers, VehicleId},
    manager::SharedManager,
};
use chrono::Utc;
use log::warn;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// System id used by the ground station itself
pub const GCS_VEHICLE_ID: VehicleId = 255;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_amsl: f64,
    pub altitude_relative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub trait Vehicle: Send + Sync {
    fn id(&self) -> VehicleId;
    fn name(&self) -> String;

    fn global_position(&self) -> Option<GlobalPosition>;
    fn local_position(&self) -> Option<LocalPosition>;

    fn set_parameter(&mut self, component: u8, name: &str, value: f64);
    fn parameter(&self, name: &str) -> Option<f64>;

    /// Manager holding this vehicle's waypoint lists
    fn waypoint_manager(&self) -> SharedManager;

    fn subscribe(&mut self, sender: EventSender) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
}

pub type SharedVehicle = Arc<RwLock<dyn Vehicle>>;

pub fn shared<V: Vehicle + 'static>(vehicle: V) -> SharedVehicle {
    Arc::new(RwLock::new(vehicle))
}

pub fn read(vehicle: &SharedVehicle) -> RwLockReadGuard<'_, dyn Vehicle + 'static> {
    vehicle.read().unwrap_or_else(|poisoned| {
        warn!("Vehicle lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

pub fn write(vehicle: &SharedVehicle) -> RwLockWriteGuard<'_, dyn Vehicle + 'static> {
    vehicle.write().unwrap_or_else(|poisoned| {
        warn!("Vehicle lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

fn timestamp_usec() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Vehicle whose state is driven by the caller, for tests and the demo
pub struct SimulatedVehicle {
    id: VehicleId,
    name: String,
    global: Option<GlobalPosition>,
    local: Option<LocalPosition>,
    attitude: (f64, f64, f64),
    parameters: HashMap<String, f64>,
    manager: SharedManager,
    subscribers: Subscribers,
}

impl SimulatedVehicle {
    pub fn new(id: VehicleId, name: &str, manager: SharedManager) -> Self {
        Self {
            id,
            name: name.to_string(),
            global: None,
            local: None,
            attitude: (0.0, 0.0, 0.0),
            parameters: HashMap::new(),
            manager,
            subscribers: Subscribers::new(),
        }
    }

    pub fn set_global_position(&mut self, position: Option<GlobalPosition>) {
        self.global = position;
    }

    pub fn set_local_position(&mut self, position: Option<LocalPosition>) {
        self.local = position;
        if let Some(p) = position {
            self.subscribers.emit(Event::LocalPositionChanged {
                x: p.x,
                y: p.y,
                z: p.z,
                usec: timestamp_usec(),
            });
        }
    }

    pub fn set_attitude(&mut self, roll: f64, pitch: f64, yaw: f64) {
        self.attitude = (roll, pitch, yaw);
        self.subscribers.emit(Event::AttitudeChanged {
            roll,
            pitch,
            yaw,
            usec: timestamp_usec(),
        });
    }

    pub fn attitude(&self) -> (f64, f64, f64) {
        self.attitude
    }
}

impl Vehicle for SimulatedVehicle {
    fn id(&self) -> VehicleId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn global_position(&self) -> Option<GlobalPosition> {
        self.global
    }

    fn local_position(&self) -> Option<LocalPosition> {
        self.local
    }

    /// Stores the value and echoes it back like an autopilot acknowledging a PARAM_SET
    fn set_parameter(&mut self, component: u8, name: &str, value: f64) {
        self.parameters.insert(name.to_string(), value);
        self.subscribers.emit(Event::ParameterChanged {
            component,
            name: name.to_string(),
            value,
        });
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    fn waypoint_manager(&self) -> SharedManager {
        Arc::clone(&self.manager)
    }

    fn subscribe(&mut self, sender: EventSender) -> SubscriptionId {
        self.subscribers.subscribe(sender)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.unsubscribe(id);
    }
}
