// src/reorder.rs
//! Translates reorder and removal gestures into positional manager requests
//!
//! Index 0 of the editable list holds the home position, so the first movable
//! slot is index 1.

use crate::waypoint::{MissionItem, Waypoint, WaypointHandle};

/// First slot a waypoint may be moved into
pub const FIRST_MOVABLE_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: usize,
    pub to: usize,
}

impl MoveRequest {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

fn position_from(list: &[MissionItem], handle: WaypointHandle, start: usize) -> Option<usize> {
    list.iter()
        .enumerate()
        .skip(start)
        .find(|(_, item)| item.handle == handle)
        .map(|(index, _)| index)
}

pub fn plan_move_up(list: &[MissionItem], handle: WaypointHandle) -> Option<MoveRequest> {
    let index = position_from(list, handle, 0)?;
    (index > FIRST_MOVABLE_INDEX).then(|| MoveRequest::new(index, index - 1))
}

pub fn plan_move_down(list: &[MissionItem], handle: WaypointHandle) -> Option<MoveRequest> {
    let index = position_from(list, handle, FIRST_MOVABLE_INDEX)?;
    (index + 1 < list.len()).then(|| MoveRequest::new(index, index + 1))
}

pub fn plan_move_top(list: &[MissionItem], handle: WaypointHandle) -> Option<MoveRequest> {
    let index = position_from(list, handle, 0)?;
    (index > FIRST_MOVABLE_INDEX).then(|| MoveRequest::new(index, FIRST_MOVABLE_INDEX))
}

pub fn plan_move_bottom(list: &[MissionItem], handle: WaypointHandle) -> Option<MoveRequest> {
    let index = position_from(list, handle, FIRST_MOVABLE_INDEX)?;
    let last = list.len() - 1;
    (index < last).then(|| MoveRequest::new(index, last))
}

/// Sequence id to remove, or `None` for the home waypoint
pub fn plan_remove(waypoint: &Waypoint) -> Option<u16> {
    (waypoint.id > 0).then_some(waypoint.id)
}

/// Sequence id of the tail waypoint to remove next while clearing the list.
///
/// Clearing always removes from the end so earlier indices stay valid, and
/// stops once only the home waypoint remains.
pub fn plan_clear_step(list: &[MissionItem]) -> Option<u16> {
    if list.len() > 1 {
        list.last().and_then(|item| plan_remove(&item.waypoint))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waypoint::MavFrame;

    fn mission(len: u16) -> Vec<MissionItem> {
        (0..len)
            .map(|id| {
                let mut wp = Waypoint::nav(MavFrame::LocalNed, id as f64, 0.0, -5.0, 1.0);
                wp.id = id;
                MissionItem::new(WaypointHandle::new(100 + id as u64), wp)
            })
            .collect()
    }

    fn handle(id: u16) -> WaypointHandle {
        WaypointHandle::new(100 + id as u64)
    }

    #[test]
    fn test_move_up() {
        let list = mission(5);
        assert_eq!(plan_move_up(&list, handle(1)), None);
        assert_eq!(plan_move_up(&list, handle(0)), None);
        assert_eq!(plan_move_up(&list, handle(2)), Some(MoveRequest::new(2, 1)));
        assert_eq!(plan_move_up(&list, WaypointHandle::new(1)), None);
    }

    #[test]
    fn test_move_down() {
        let list = mission(4);
        assert_eq!(plan_move_down(&list, handle(1)), Some(MoveRequest::new(1, 2)));
        assert_eq!(plan_move_down(&list, handle(3)), None);
        // home is never found by the search, so it cannot be moved
        assert_eq!(plan_move_down(&list, handle(0)), None);
    }

    #[test]
    fn test_move_top() {
        let list = mission(4);
        assert_eq!(plan_move_top(&list, handle(3)), Some(MoveRequest::new(3, 1)));
        assert_eq!(plan_move_top(&list, handle(1)), None);
    }

    #[test]
    fn test_move_bottom() {
        let list = mission(4);
        assert_eq!(plan_move_bottom(&list, handle(1)), Some(MoveRequest::new(1, 3)));
        assert_eq!(plan_move_bottom(&list, handle(3)), None);
        assert_eq!(plan_move_bottom(&list, handle(0)), None);
        assert_eq!(plan_move_bottom(&[], handle(0)), None);
    }

    #[test]
    fn test_remove_never_targets_home() {
        let list = mission(3);
        assert_eq!(plan_remove(&list[0].waypoint), None);
        assert_eq!(plan_remove(&list[2].waypoint), Some(2));
    }

    #[test]
    fn test_clear_step_takes_tail() {
        assert_eq!(plan_clear_step(&mission(4)), Some(3));
        assert_eq!(plan_clear_step(&mission(1)), None);
        assert_eq!(plan_clear_step(&[]), None);
    }
}
