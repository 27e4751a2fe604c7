//! Game events broadcast through the world
//!
//! Every event kind is a variant of one closed enum. Producers use the
//! constructor functions, consumers match on the variant or test the
//! [`EventKind`] tag with [`GameEvent::is`]. Events are delivered
//! synchronously to every system in order; there is no consumption or
//! cancellation.

use crate::ecs::EntityId;
use crate::pathfinding::GridPos;

/// Tag identifying an event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An entity finished a step onto a new cell
    EntityMoved,
    /// No path exists to a requested target
    PathFailed,
    /// The client connected to the server
    ClientConnected,
    /// The client lost its server connection
    ClientDisconnected,
    /// The server accepted the player into the world
    ServerWelcome,
    /// The server spawned an entity
    ServerSpawn,
    /// The server despawned an entity
    ServerDespawn,
    /// An entity attacked another
    Attack,
    /// An entity received damage
    Damage,
    /// An entity died
    Death,
    /// Loot appeared on the ground
    LootDropped,
    /// Loot was picked up
    LootPicked,
    /// A chat line arrived
    Chat,
    /// A message for the player should be shown
    Notification,
    /// A scene finished instantiating
    SceneLoaded,
}

/// Event payload delivered to every system's notification hook
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// An entity finished a step onto a new cell
    EntityMoved {
        /// Moving entity
        entity: EntityId,
        /// Cell it left
        from: GridPos,
        /// Cell it entered
        to: GridPos,
    },
    /// No path exists to a requested target
    PathFailed {
        /// Entity that asked
        entity: EntityId,
        /// Requested target
        target: GridPos,
    },
    /// The client connected to the server
    ClientConnected {
        /// Server address
        address: String,
    },
    /// The client lost its server connection
    ClientDisconnected {
        /// Reason given by the transport
        reason: String,
    },
    /// The server accepted the player into the world
    ServerWelcome {
        /// Server id of the player
        player_id: i32,
        /// Player name
        name: String,
        /// Spawn cell
        position: GridPos,
        /// Starting hit points
        hp: f32,
    },
    /// The server spawned an entity
    ServerSpawn {
        /// Server id
        server_id: i32,
        /// Prefab kind
        kind: String,
        /// Spawn cell
        position: GridPos,
    },
    /// The server despawned an entity
    ServerDespawn {
        /// Server id
        server_id: i32,
    },
    /// An entity attacked another
    Attack {
        /// Attacker
        attacker: EntityId,
        /// Target
        target: EntityId,
    },
    /// An entity received damage
    Damage {
        /// Damaged entity
        target: EntityId,
        /// Damage dealt
        amount: f32,
    },
    /// An entity died
    Death {
        /// Dead entity
        entity: EntityId,
    },
    /// Loot appeared on the ground
    LootDropped {
        /// Loot entity
        entity: EntityId,
        /// Item kind
        item: String,
        /// Cell it lies on
        position: GridPos,
    },
    /// Loot was picked up
    LootPicked {
        /// Entity that picked it up
        picker: EntityId,
        /// Item kind
        item: String,
        /// Stack size
        amount: f32,
    },
    /// A chat line arrived
    Chat {
        /// Sender name
        from: String,
        /// Message text
        text: String,
    },
    /// A message for the player should be shown
    Notification {
        /// Message text
        text: String,
    },
    /// A scene finished instantiating
    SceneLoaded {
        /// Scene name
        name: String,
        /// Root entity of the scene
        root: EntityId,
    },
}

impl GameEvent {
    /// Tag of this event
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::EntityMoved { .. } => EventKind::EntityMoved,
            Self::PathFailed { .. } => EventKind::PathFailed,
            Self::ClientConnected { .. } => EventKind::ClientConnected,
            Self::ClientDisconnected { .. } => EventKind::ClientDisconnected,
            Self::ServerWelcome { .. } => EventKind::ServerWelcome,
            Self::ServerSpawn { .. } => EventKind::ServerSpawn,
            Self::ServerDespawn { .. } => EventKind::ServerDespawn,
            Self::Attack { .. } => EventKind::Attack,
            Self::Damage { .. } => EventKind::Damage,
            Self::Death { .. } => EventKind::Death,
            Self::LootDropped { .. } => EventKind::LootDropped,
            Self::LootPicked { .. } => EventKind::LootPicked,
            Self::Chat { .. } => EventKind::Chat,
            Self::Notification { .. } => EventKind::Notification,
            Self::SceneLoaded { .. } => EventKind::SceneLoaded,
        }
    }

    /// Type guard on the event tag
    pub fn is(&self, kind: EventKind) -> bool {
        self.kind() == kind
    }

    /// Movement step finished
    pub const fn moved(entity: EntityId, from: GridPos, to: GridPos) -> Self {
        Self::EntityMoved { entity, from, to }
    }

    /// Path planning failed
    pub const fn path_failed(entity: EntityId, target: GridPos) -> Self {
        Self::PathFailed { entity, target }
    }

    /// Connected to a server
    pub fn connected(address: impl Into<String>) -> Self {
        Self::ClientConnected { address: address.into() }
    }

    /// Disconnected from the server
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::ClientDisconnected { reason: reason.into() }
    }

    /// Player accepted into the world
    pub fn welcome(player_id: i32, name: impl Into<String>, position: GridPos, hp: f32) -> Self {
        Self::ServerWelcome {
            player_id,
            name: name.into(),
            position,
            hp,
        }
    }

    /// Server spawned an entity
    pub fn spawn(server_id: i32, kind: impl Into<String>, position: GridPos) -> Self {
        Self::ServerSpawn {
            server_id,
            kind: kind.into(),
            position,
        }
    }

    /// Server despawned an entity
    pub const fn despawn(server_id: i32) -> Self {
        Self::ServerDespawn { server_id }
    }

    /// Attack
    pub const fn attack(attacker: EntityId, target: EntityId) -> Self {
        Self::Attack { attacker, target }
    }

    /// Damage dealt
    pub const fn damage(target: EntityId, amount: f32) -> Self {
        Self::Damage { target, amount }
    }

    /// Death
    pub const fn death(entity: EntityId) -> Self {
        Self::Death { entity }
    }

    /// Loot dropped
    pub fn loot_dropped(entity: EntityId, item: impl Into<String>, position: GridPos) -> Self {
        Self::LootDropped {
            entity,
            item: item.into(),
            position,
        }
    }

    /// Loot picked up
    pub fn loot_picked(picker: EntityId, item: impl Into<String>, amount: f32) -> Self {
        Self::LootPicked {
            picker,
            item: item.into(),
            amount,
        }
    }

    /// Chat line
    pub fn chat(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Chat {
            from: from.into(),
            text: text.into(),
        }
    }

    /// Player notification
    pub fn notification(text: impl Into<String>) -> Self {
        Self::Notification { text: text.into() }
    }

    /// Scene loaded
    pub fn scene_loaded(name: impl Into<String>, root: EntityId) -> Self {
        Self::SceneLoaded {
            name: name.into(),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_and_guard_agree() {
        let entity = EntityId::from_raw(4);
        let events = [
            (GameEvent::moved(entity, GridPos::new(0, 0), GridPos::new(0, 1)), EventKind::EntityMoved),
            (GameEvent::damage(entity, 3.0), EventKind::Damage),
            (GameEvent::death(entity), EventKind::Death),
            (GameEvent::chat("bob", "hi"), EventKind::Chat),
            (GameEvent::despawn(9), EventKind::ServerDespawn),
        ];
        for (event, kind) in events {
            assert!(event.is(kind));
            assert_eq!(event.kind(), kind);
        }
        assert!(!GameEvent::death(entity).is(EventKind::Damage));
    }
}
