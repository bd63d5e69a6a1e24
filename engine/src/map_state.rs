//! Map State Store
//!
//! The single shared mutable resource of the engine. Readers get a copy of
//! the whole [`MapState`]; writers submit a closure that derives the next
//! state from the current one. The closure runs under the write lock and
//! cannot await, so no I/O can happen between reading the old state and
//! installing the new one, and no reader ever sees a half-applied update.
//!
//! The store owns the `version` counter: it is incremented exactly once per
//! accepted mutation, whatever the closure returns in that field.

use sdk::types::MapState;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

pub struct MapStateStore {
    state: RwLock<MapState>,
}

impl MapStateStore {
    pub fn new(initial: MapState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Snapshot of the current state
    pub fn read(&self) -> MapState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an infallible mutation and return the installed state
    pub fn mutate<F>(&self, f: F) -> MapState
    where
        F: FnOnce(&MapState) -> MapState,
    {
        match self.try_mutate(|current| Ok::<_, std::convert::Infallible>(f(current))) {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }

    /// Apply a mutation that may be rejected.
    ///
    /// On `Err` the state and version are left untouched.
    pub fn try_mutate<F, E>(&self, f: F) -> Result<MapState, E>
    where
        F: FnOnce(&MapState) -> Result<MapState, E>,
    {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = f(&guard)?;
        next.version = guard.version + 1;
        *guard = next;
        debug!(
            "Map state v{}: ({:.4}, {:.4}) zoom {} [{}]",
            next.version, next.latitude, next.longitude, next.zoom, next.last_action
        );
        Ok(next)
    }
}
