// src/vehicle_list.rs
//! List of connected vehicles, ground station pinned to the top

use crate::{
    event::{event_queue, Event, EventReceiver, SubscriptionId, VehicleId},
    fleet::{self, SharedFleet},
    vehicle::{self, GCS_VEHICLE_ID},
};
use log::debug;
use std::collections::HashMap;

pub const MIN_PANEL_WIDTH: u32 = 262;

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleView {
    pub vehicle_id: VehicleId,
    pub name: String,
    pub active: bool,
}

pub struct VehicleListPanel {
    views: HashMap<VehicleId, VehicleView>,
    layout: Vec<VehicleId>,
    show_placeholder: bool,
    visible: bool,
    fleet: Option<SharedFleet>,
    receiver: EventReceiver,
    subscription: Option<SubscriptionId>,
}

impl VehicleListPanel {
    /// Create the panel and list every vehicle already known to `fleet`
    pub fn new(fleet: Option<SharedFleet>) -> Self {
        let (sender, receiver) = event_queue();
        let mut panel = Self {
            views: HashMap::new(),
            layout: Vec::new(),
            show_placeholder: true,
            visible: false,
            fleet: None,
            receiver,
            subscription: None,
        };

        if let Some(fleet) = fleet {
            let existing = {
                let mut guard = fleet::write(&fleet);
                panel.subscription = Some(guard.subscribe(sender));
                guard.vehicles()
            };
            for shared in existing {
                let (id, name) = {
                    let guard = vehicle::read(&shared);
                    (guard.id(), guard.name())
                };
                panel.add_vehicle(id, &name);
            }
            panel.fleet = Some(fleet);
        }

        panel
    }

    pub fn add_vehicle(&mut self, id: VehicleId, name: &str) {
        if self.views.is_empty() {
            self.show_placeholder = false;
        }
        if self.views.contains_key(&id) {
            return;
        }

        self.views.insert(
            id,
            VehicleView {
                vehicle_id: id,
                name: name.to_string(),
                active: false,
            },
        );

        if id == GCS_VEHICLE_ID {
            self.layout.insert(0, id);
        } else {
            self.layout.push(id);
        }
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) {
        if self.views.remove(&id).is_some() {
            self.layout.retain(|known| *known != id);
        }
    }

    /// Highlight `id` as the active vehicle; unknown ids are ignored
    pub fn activate_vehicle(&mut self, id: VehicleId) {
        if !self.views.contains_key(&id) {
            debug!("No view for vehicle {}", id);
            return;
        }
        for view in self.views.values_mut() {
            view.active = view.vehicle_id == id;
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::VehicleCreated(id) => {
                let name = self
                    .fleet
                    .as_ref()
                    .and_then(|fleet| fleet::read(fleet).vehicle(id))
                    .map(|shared| vehicle::read(&shared).name())
                    .unwrap_or_else(|| format!("Vehicle {}", id));
                self.add_vehicle(id, &name);
            }
            Event::VehicleDeleted(id) => self.remove_vehicle(id),
            Event::ActiveVehicleSet(Some(id)) => self.activate_vehicle(id),
            _ => {}
        }
    }

    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Views in display order
    pub fn views(&self) -> Vec<&VehicleView> {
        self.layout.iter().filter_map(|id| self.views.get(id)).collect()
    }

    pub fn shows_placeholder(&self) -> bool {
        self.show_placeholder
    }

    pub fn min_width(&self) -> u32 {
        MIN_PANEL_WIDTH
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Drop for VehicleListPanel {
    fn drop(&mut self) {
        if let (Some(fleet), Some(id)) = (&self.fleet, self.subscription.take()) {
            fleet::write(fleet).unsubscribe(id);
        }
    }
}
