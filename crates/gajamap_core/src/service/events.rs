//! Outbound notifications raised by the trip store.

use crate::model::item::ItemId;

/// Notification delivered to observers after a mutation has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Stored state changed; the view should re-query and re-render.
    StateChanged,
    /// An item went from unvisited to visited. Never raised on the reverse
    /// transition.
    ItemBecameVisited(ItemId),
    /// A backup document replaced the whole trip collection; the view should
    /// reload everything it cached.
    ImportCompleted { trip_count: usize },
}

/// Receiver of `CoreEvent`s, usually the view layer.
pub trait StateObserver {
    fn on_event(&self, event: &CoreEvent);
}

impl<F> StateObserver for F
where
    F: Fn(&CoreEvent),
{
    fn on_event(&self, event: &CoreEvent) {
        self(event)
    }
}
