// src/event.rs
//! Notifications flowing from managers and vehicles to the panels

use crate::waypoint::WaypointHandle;
use tokio::sync::mpsc;

pub type VehicleId = u8;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StatusText(String),
    EditableListChanged,
    EditableChanged { handle: WaypointHandle },
    ViewOnlyListChanged,
    ViewOnlyChanged { handle: WaypointHandle },
    CurrentWaypointChanged(u16),
    LocalPositionChanged { x: f64, y: f64, z: f64, usec: u64 },
    AttitudeChanged { roll: f64, pitch: f64, yaw: f64, usec: u64 },
    ParameterChanged { component: u8, name: String, value: f64 },
    ActiveVehicleSet(Option<VehicleId>),
    VehicleCreated(VehicleId),
    VehicleDeleted(VehicleId),
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the queue a panel consumes its notifications from
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Handle returned by `subscribe`, used to detach a panel again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Fan-out list of subscriber queues.
///
/// Closed queues are dropped on the next emit.
#[derive(Debug, Default)]
pub struct Subscribers {
    next_id: u64,
    senders: Vec<(SubscriptionId, EventSender)>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sender: EventSender) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.senders.push((id, sender));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.senders.retain(|(sub, _)| *sub != id);
    }

    pub fn emit(&mut self, event: Event) {
        self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_preserves_order() {
        let (tx, mut rx) = event_queue();
        let mut subs = Subscribers::new();
        subs.subscribe(tx);

        subs.emit(Event::EditableListChanged);
        subs.emit(Event::CurrentWaypointChanged(2));

        assert_eq!(rx.try_recv().unwrap(), Event::EditableListChanged);
        assert_eq!(rx.try_recv().unwrap(), Event::CurrentWaypointChanged(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_and_closed_queue() {
        let (tx_a, mut rx_a) = event_queue();
        let (tx_b, rx_b) = event_queue();
        let mut subs = Subscribers::new();
        let a = subs.subscribe(tx_a);
        subs.subscribe(tx_b);

        drop(rx_b);
        subs.emit(Event::ViewOnlyListChanged);
        assert_eq!(subs.len(), 1);

        subs.unsubscribe(a);
        subs.emit(Event::ViewOnlyListChanged);
        assert!(subs.is_empty());
        assert_eq!(rx_a.try_recv().unwrap(), Event::ViewOnlyListChanged);
        assert!(rx_a.try_recv().is_err());
    }
}
