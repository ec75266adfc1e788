//! World events the conversation engine reacts to.
//!
//! The host raises these at its lifecycle points and hands them to an
//! [`EventDispatcher`], which calls every registered handler in order.

use crate::error::Result;
use crate::world::LocationSnapshot;

/// A change in the player's surroundings.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// The player crossed into another map cell.
    MapPixelChanged(LocationSnapshot),
    /// The player left a building.
    TransitionToExterior(LocationSnapshot),
    /// The player left a dungeon.
    TransitionToDungeonExterior(LocationSnapshot),
    /// A save game was loaded.
    SaveLoaded(LocationSnapshot),
}

impl WorldEvent {
    /// The location the player is in after the event.
    #[must_use]
    pub fn location(&self) -> &LocationSnapshot {
        match self {
            Self::MapPixelChanged(location)
            | Self::TransitionToExterior(location)
            | Self::TransitionToDungeonExterior(location)
            | Self::SaveLoaded(location) => location,
        }
    }
}

/// Event for entering a new map cell.
#[must_use]
pub fn on_map_pixel_changed(location: LocationSnapshot) -> WorldEvent {
    WorldEvent::MapPixelChanged(location)
}

/// Event for stepping outside a building.
#[must_use]
pub fn on_transition_to_exterior(location: LocationSnapshot) -> WorldEvent {
    WorldEvent::TransitionToExterior(location)
}

/// Event for stepping outside a dungeon.
#[must_use]
pub fn on_transition_to_dungeon_exterior(location: LocationSnapshot) -> WorldEvent {
    WorldEvent::TransitionToDungeonExterior(location)
}

/// Event for a finished save load.
#[must_use]
pub fn on_save_loaded(location: LocationSnapshot) -> WorldEvent {
    WorldEvent::SaveLoaded(location)
}

type Handler<'a> = Box<dyn FnMut(&WorldEvent) -> Result<()> + 'a>;

/// Ordered list of world event handlers.
#[derive(Default)]
pub struct EventDispatcher<'a> {
    handlers: Vec<Handler<'a>>,
}

impl<'a> EventDispatcher<'a> {
    /// Create a dispatcher without handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; handlers run in registration order.
    pub fn subscribe(&mut self, handler: impl FnMut(&WorldEvent) -> Result<()> + 'a) {
        self.handlers.push(Box::new(handler));
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver an event to every handler.
    ///
    /// # Errors
    /// Stops at and returns the first handler error.
    pub fn dispatch(&mut self, event: &WorldEvent) -> Result<()> {
        for handler in &mut self.handlers {
            handler(event)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventDispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TalkError;

    fn town(index: i32) -> LocationSnapshot {
        LocationSnapshot {
            location_index: index,
            name: format!("Town {index}"),
            ..LocationSnapshot::default()
        }
    }

    #[test]
    fn handlers_run_in_order() {
        let mut seen = Vec::new();
        {
            let mut dispatcher = EventDispatcher::new();
            dispatcher.subscribe(|e| {
                seen.push(e.location().location_index);
                Ok(())
            });
            dispatcher.dispatch(&on_map_pixel_changed(town(1))).expect("dispatch");
            dispatcher.dispatch(&on_save_loaded(town(2))).expect("dispatch");
        }
        assert_eq!(seen, [1, 2]);
    }

    #[test]
    fn first_error_stops_dispatch() {
        let mut later = 0;
        {
            let mut dispatcher = EventDispatcher::new();
            dispatcher.subscribe(|_| Err(TalkError::NoTarget));
            dispatcher.subscribe(|_| {
                later += 1;
                Ok(())
            });
            assert_eq!(dispatcher.len(), 2);
            assert!(dispatcher.dispatch(&on_transition_to_exterior(town(1))).is_err());
        }
        assert_eq!(later, 0);
    }
}
