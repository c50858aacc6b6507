//! Room membership and the per-room player table.

use shared::protocol::{PlayerState, RoomGameState, RoomSnapshot, StateFields};
use std::collections::HashMap;
use uuid::Uuid;

/// A named group of players whose updates are relayed to each other
///
/// Rooms are created lazily by the first `join_room` naming them. Player
/// entries are keyed by the server-issued user id, so a user occupies at most
/// one entry per room.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    players: HashMap<Uuid, PlayerState>,
    /// Static level blob echoed to every joiner
    pub game_state: RoomGameState,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            players: HashMap::new(),
            game_state: RoomGameState::default(),
        }
    }

    /// Inserts or replaces a player's entry, seeded with `initial_state`
    ///
    /// A repeated join by the same user overwrites the previous entry instead
    /// of adding a second one.
    pub fn upsert_player(
        &mut self,
        user_id: Uuid,
        client_id: Option<String>,
        initial_state: &StateFields,
    ) -> &PlayerState {
        let mut player = PlayerState::new(user_id, client_id);
        player.merge(initial_state);
        self.players.insert(user_id, player);
        &self.players[&user_id]
    }

    /// Shallow-merges an update into an existing entry
    ///
    /// Returns false when the user has no entry in this room.
    pub fn merge_update(&mut self, user_id: Uuid, state: &StateFields) -> bool {
        match self.players.get_mut(&user_id) {
            Some(player) => {
                player.merge(state);
                true
            }
            None => false,
        }
    }

    pub fn remove_player(&mut self, user_id: Uuid) -> Option<PlayerState> {
        self.players.remove(&user_id)
    }

    pub fn player(&self, user_id: Uuid) -> Option<&PlayerState> {
        self.players.get(&user_id)
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.players.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self.players.values().cloned().collect(),
            game_state: self.game_state.clone(),
        }
    }
}
