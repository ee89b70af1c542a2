//! Pointer input.

use std::fmt;

/// Identifier of an entity in the client world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity #{}", self.0)
    }
}

/// Payload of [`Channel::LeftClick`](crate::events::Channel::LeftClick).
///
/// `target` is the living entity under the crosshair when the click happened,
/// if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeftClickEvent {
    pub target: Option<EntityId>,
}

impl LeftClickEvent {
    pub fn on(target: EntityId) -> Self {
        LeftClickEvent {
            target: Some(target),
        }
    }
}
