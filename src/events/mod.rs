// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Named-event listener registry.
//!
//! Events are how the rest of the system talks to loaded modules without
//! going through command dispatch: producers enqueue `(name, args)` pairs
//! and the interpreter loop notifies every listener registered for that
//! name, in registration order.
//!
//! Every listener shares one signature: it receives an [`EventContext`]
//! carrying the event name and its positional arguments. Listeners are
//! registered under a caller-chosen key, so re-registering the same
//! `(event, key)` pair replaces the previous listener in place rather
//! than adding a duplicate.

use std::collections::HashMap;

use anyhow::Result;

/// The standardized payload passed to every event listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub name: String,
    pub args: Vec<String>,
}

/// A registered event listener.
pub type EventListener = Box<dyn FnMut(&EventContext) -> Result<()>>;

/// Maps event name → ordered list of keyed listeners.
#[derive(Default)]
pub struct EventRegistry {
    listeners: HashMap<String, Vec<(String, EventListener)>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for `event` under `key`. Idempotent: a listener
    /// already registered under the same key is replaced in place,
    /// keeping its position in the notification order.
    pub fn register_event(&mut self, event: &str, key: &str, listener: EventListener) {
        let slot = self.listeners.entry(event.to_string()).or_default();
        if let Some(existing) = slot.iter_mut().find(|(k, _)| k == key) {
            existing.1 = listener;
        } else {
            slot.push((key.to_string(), listener));
        }
    }

    /// Remove the listener registered for `event` under `key`. Returns
    /// whether a listener was actually removed.
    pub fn unregister_event(&mut self, event: &str, key: &str) -> bool {
        let Some(slot) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|(k, _)| k != key);
        before != slot.len()
    }

    /// Invoke every listener registered for `event`, in order.
    ///
    /// Each listener is its own fault boundary: an error is logged and
    /// the remaining listeners still run. The last error seen is returned
    /// for diagnostics only; it is never raised to the producer. An
    /// unknown event name is tolerated and merely logged.
    pub fn notify(&mut self, event: &str, args: &[String]) -> Option<anyhow::Error> {
        let Some(slot) = self.listeners.get_mut(event) else {
            log::debug!("no listeners registered for event `{event}`");
            return None;
        };

        let ctx = EventContext {
            name: event.to_string(),
            args: args.to_vec(),
        };

        let mut last_error = None;
        for (key, listener) in slot.iter_mut() {
            if let Err(err) = listener(&ctx) {
                log::warn!("listener `{key}` failed for event `{event}`: {err:#}");
                last_error = Some(err);
            }
        }
        last_error
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}
