// src/fleet.rs
//! Registry of connected vehicles and the active selection

use crate::{
    event::{Event, EventSender, SubscriptionId, Subscribers, VehicleId},
    vehicle::{self, SharedVehicle},
};
use log::{debug, info, warn};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct Fleet {
    vehicles: Vec<(VehicleId, SharedVehicle)>,
    active: Option<VehicleId>,
    subscribers: Subscribers,
}

pub type SharedFleet = Arc<RwLock<Fleet>>;

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedFleet {
        Arc::new(RwLock::new(self))
    }

    /// Register a vehicle; a known id is ignored
    pub fn add_vehicle(&mut self, shared: SharedVehicle) {
        let id = vehicle::read(&shared).id();
        if self.vehicle(id).is_some() {
            debug!("Vehicle {} already registered", id);
            return;
        }

        info!("Vehicle {} connected", id);
        self.vehicles.push((id, shared));
        self.subscribers.emit(Event::VehicleCreated(id));
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) {
        let before = self.vehicles.len();
        self.vehicles.retain(|(known, _)| *known != id);
        if self.vehicles.len() == before {
            return;
        }

        info!("Vehicle {} removed", id);
        self.subscribers.emit(Event::VehicleDeleted(id));
        if self.active == Some(id) {
            self.active = None;
            self.subscribers.emit(Event::ActiveVehicleSet(None));
        }
    }

    pub fn set_active(&mut self, id: VehicleId) {
        if self.vehicle(id).is_none() {
            debug!("Cannot activate unknown vehicle {}", id);
            return;
        }
        self.active = Some(id);
        self.subscribers.emit(Event::ActiveVehicleSet(Some(id)));
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<SharedVehicle> {
        self.vehicles
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, shared)| Arc::clone(shared))
    }

    /// Vehicles in registration order
    pub fn vehicles(&self) -> Vec<SharedVehicle> {
        self.vehicles.iter().map(|(_, shared)| Arc::clone(shared)).collect()
    }

    pub fn active_vehicle(&self) -> Option<SharedVehicle> {
        self.active.and_then(|id| self.vehicle(id))
    }

    pub fn active_id(&self) -> Option<VehicleId> {
        self.active
    }

    pub fn subscribe(&mut self, sender: EventSender) -> SubscriptionId {
        self.subscribers.subscribe(sender)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.unsubscribe(id);
    }
}

pub fn read(fleet: &SharedFleet) -> RwLockReadGuard<'_, Fleet> {
    fleet.read().unwrap_or_else(|poisoned| {
        warn!("Fleet lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

pub fn write(fleet: &SharedFleet) -> RwLockWriteGuard<'_, Fleet> {
    fleet.write().unwrap_or_else(|poisoned| {
        warn!("Fleet lock poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
