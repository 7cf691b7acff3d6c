// src/reconcile.rs
//! Keeps a track's views in step with the manager's authoritative list

use crate::{
    view::{ViewId, ViewKind, WaypointView},
    waypoint::{MissionItem, Waypoint, WaypointHandle},
};
use log::{debug, trace};
use std::collections::{hash_map::Entry, HashMap};

/// Ordered visual container of views
#[derive(Debug, Default, Clone)]
pub struct ListLayout {
    items: Vec<ViewId>,
}

impl ListLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at `index`, appending when the index is past the end
    pub fn insert_widget(&mut self, index: usize, view: ViewId) {
        let index = index.min(self.items.len());
        self.items.insert(index, view);
    }

    pub fn remove_widget(&mut self, view: ViewId) -> bool {
        match self.index_of(view) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn item_at(&self, index: usize) -> Option<ViewId> {
        self.items.get(index).copied()
    }

    pub fn index_of(&self, view: ViewId) -> Option<usize> {
        self.items.iter().position(|v| *v == view)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.items.iter().copied()
    }
}

/// What a reconciliation pass changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
    pub relocated: usize,
}

/// View registry and layout for one track
#[derive(Debug)]
pub struct TrackViews {
    kind: ViewKind,
    views: HashMap<WaypointHandle, WaypointView>,
    owners: HashMap<ViewId, WaypointHandle>,
    layout: ListLayout,
}

impl TrackViews {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            views: HashMap::new(),
            owners: HashMap::new(),
            layout: ListLayout::new(),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, handle: WaypointHandle) -> bool {
        self.views.contains_key(&handle)
    }

    pub fn view(&self, handle: WaypointHandle) -> Option<&WaypointView> {
        self.views.get(&handle)
    }

    pub fn view_mut(&mut self, handle: WaypointHandle) -> Option<&mut WaypointView> {
        self.views.get_mut(&handle)
    }

    pub fn layout(&self) -> &ListLayout {
        &self.layout
    }

    /// Views in display order
    pub fn ordered_views(&self) -> Vec<&WaypointView> {
        self.layout
            .iter()
            .filter_map(|id| self.owners.get(&id))
            .filter_map(|handle| self.views.get(handle))
            .collect()
    }

    /// Bring registry and layout in line with `list`.
    ///
    /// Views whose record is still present are relocated rather than rebuilt,
    /// so their transient state (focus) survives a reorder.
    pub fn reconcile(&mut self, list: &[MissionItem]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let stale: Vec<WaypointHandle> = self
            .views
            .keys()
            .filter(|handle| !list.iter().any(|item| item.handle == **handle))
            .copied()
            .collect();

        for handle in stale {
            if let Some(mut view) = self.views.remove(&handle) {
                view.hide();
                self.layout.remove_widget(view.id());
                self.owners.remove(&view.id());
                report.removed += 1;
            }
        }

        for (index, item) in list.iter().enumerate() {
            let view = match self.views.entry(item.handle) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut view = WaypointView::new(self.kind, item.handle, &item.waypoint);
                    // home position is never shown
                    if item.waypoint.id == 0 {
                        view.hide();
                    }
                    self.layout.insert_widget(index, view.id());
                    self.owners.insert(view.id(), item.handle);
                    report.created += 1;
                    entry.insert(view)
                }
            };

            if self.layout.item_at(index) != Some(view.id()) {
                self.layout.remove_widget(view.id());
                self.layout.insert_widget(index, view.id());
                report.relocated += 1;
            }

            view.update_values(&item.waypoint);
        }

        debug!(
            "{:?} track reconciled: {} views, {} created, {} removed, {} relocated",
            self.kind,
            self.views.len(),
            report.created,
            report.removed,
            report.relocated
        );

        report
    }

    /// Refresh a single view; unknown handles are ignored
    pub fn update_one(&mut self, handle: WaypointHandle, waypoint: &Waypoint) -> bool {
        match self.views.get_mut(&handle) {
            Some(view) => {
                view.update_values(waypoint);
                true
            }
            None => {
                trace!("{:?} track: no view for {}", self.kind, handle);
                false
            }
        }
    }

    /// Mark the view whose record id equals `seq` as current and clear the rest.
    ///
    /// An out-of-range `seq` leaves every mark as it was.
    pub fn mark_current(&mut self, seq: u16, list: &[MissionItem]) -> bool {
        if usize::from(seq) >= list.len() {
            debug!(
                "{:?} track: current index {} out of range ({} waypoints)",
                self.kind,
                seq,
                list.len()
            );
            return false;
        }

        for item in list {
            if let Some(view) = self.views.get_mut(&item.handle) {
                view.set_current(item.waypoint.id == seq);
            }
        }
        true
    }

    /// Registry keys equal the list's handles and layout order equals list order
    pub fn is_consistent_with(&self, list: &[MissionItem]) -> bool {
        if self.views.len() != list.len() || self.layout.len() != list.len() {
            return false;
        }

        list.iter().enumerate().all(|(index, item)| {
            self.views
                .get(&item.handle)
                .map_or(false, |view| self.layout.item_at(index) == Some(view.id()))
        })
    }
}
