use crate::level::{default_level, SPAWN_X, SPAWN_Y};
use log::{debug, info};
use serde_json::Value;
use shared::protocol::{MotionState, PlayerState, UserInfo};
use shared::{Avatar, AvatarId, ClientMessage, ServerMessage, World, WorldEvent};
use std::collections::HashMap;
use uuid::Uuid;

/// A peer as last reported by the relay. Updates overwrite, never blend.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub user_id: Uuid,
    pub client_id: Option<String>,
    pub motion: MotionState,
}

impl RemotePlayer {
    fn from_state(player: &PlayerState) -> Self {
        let mut motion = MotionState::default();
        motion.merge_from(&player.fields);
        Self {
            user_id: player.user_id,
            client_id: player.client_id.clone(),
            motion,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub checkpoints: u32,
    pub points: u32,
}

pub struct ClientGameState {
    pub world: World,
    pub local: AvatarId,
    pub client_id: String,
    /// Assigned by the relay in `game_state`
    pub identity: Option<UserInfo>,
    pub score: Score,
    remote_players: HashMap<Uuid, RemotePlayer>,
}

impl ClientGameState {
    pub fn new(mut world: World, spawn_x: f32, spawn_y: f32, client_id: impl Into<String>) -> Self {
        let local = world.spawn_avatar(spawn_x, spawn_y);
        Self {
            world,
            local,
            client_id: client_id.into(),
            identity: None,
            score: Score::default(),
            remote_players: HashMap::new(),
        }
    }

    pub fn with_default_level(client_id: impl Into<String>) -> Self {
        Self::new(default_level(), SPAWN_X, SPAWN_Y, client_id)
    }

    pub fn local_avatar(&self) -> Option<&Avatar> {
        self.world.avatar(self.local)
    }

    pub fn local_avatar_mut(&mut self) -> Option<&mut Avatar> {
        self.world.avatar_mut(self.local)
    }

    pub fn local_motion(&self) -> MotionState {
        self.local_avatar().map(MotionState::from).unwrap_or_default()
    }

    /// Advances the local simulation and returns the messages it produced.
    pub fn step(&mut self, now_ms: u64) -> Vec<ClientMessage> {
        let mut outgoing = Vec::new();
        for event in self.world.step(now_ms) {
            if !self.is_local(&event) {
                continue;
            }
            if let Some(message) = self.handle_world_event(event) {
                outgoing.push(message);
            }
        }
        outgoing
    }

    fn is_local(&self, event: &WorldEvent) -> bool {
        let avatar = match event {
            WorldEvent::Bounced { avatar, .. }
            | WorldEvent::PowerupCollected { avatar, .. }
            | WorldEvent::CheckpointReached { avatar }
            | WorldEvent::PointCollected { avatar } => *avatar,
        };
        avatar == self.local
    }

    fn handle_world_event(&mut self, event: WorldEvent) -> Option<ClientMessage> {
        match event {
            WorldEvent::CheckpointReached { .. } => {
                self.score.checkpoints += 1;
                info!("Checkpoint reached");
                Some(ClientMessage::GetCheckpoint {
                    state: self.position_value(),
                })
            }
            WorldEvent::PointCollected { .. } => {
                self.score.points += 1;
                info!("Point collected ({} total)", self.score.points);
                Some(ClientMessage::GetPoint {
                    state: self.position_value(),
                })
            }
            WorldEvent::PowerupCollected { kind, .. } => {
                info!("Powerup collected: {:?}", kind);
                None
            }
            WorldEvent::Bounced { side, force, .. } => {
                debug!("Bounced off {:?} with force {:.1}", side, force);
                None
            }
        }
    }

    fn position_value(&self) -> Value {
        Value::Object(self.local_motion().to_fields())
    }

    pub fn join_message(&self, room_id: &str) -> ClientMessage {
        ClientMessage::JoinRoom {
            room_id: room_id.to_string(),
            client_id: Some(self.client_id.clone()),
            initial_state: self.local_motion().to_fields(),
        }
    }

    pub fn update_message(&self) -> ClientMessage {
        ClientMessage::PlayerUpdate {
            state: self.local_motion().to_fields(),
        }
    }

    /// Echoes of our own state come back under our user id or client id.
    fn is_self(&self, user_id: Uuid, client_id: Option<&str>) -> bool {
        let same_user = self
            .identity
            .as_ref()
            .map_or(false, |identity| identity.user_id == user_id);
        same_user || client_id == Some(self.client_id.as_str())
    }

    pub fn apply_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::GameState { state, user } => {
                info!("Joined as user {} with {} players", user.user_id, state.players.len());
                self.identity = Some(user);
                self.remote_players.clear();
                for player in &state.players {
                    if !self.is_self(player.user_id, player.client_id.as_deref()) {
                        self.remote_players
                            .insert(player.user_id, RemotePlayer::from_state(player));
                    }
                }
            }
            ServerMessage::PlayerJoined {
                user_id,
                client_id,
                state,
            } => {
                if self.is_self(user_id, client_id.as_deref()) {
                    return;
                }
                info!("Player {} joined", user_id);
                let mut motion = MotionState::default();
                motion.merge_from(&state);
                self.remote_players.insert(
                    user_id,
                    RemotePlayer {
                        user_id,
                        client_id,
                        motion,
                    },
                );
            }
            ServerMessage::PlayerUpdate {
                user_id,
                client_id,
                state,
            } => {
                if self.is_self(user_id, client_id.as_deref()) {
                    return;
                }
                let remote = self
                    .remote_players
                    .entry(user_id)
                    .or_insert_with(|| RemotePlayer {
                        user_id,
                        client_id: client_id.clone(),
                        motion: MotionState::default(),
                    });
                remote.motion.merge_from(&state);
            }
            ServerMessage::PlayerLeft { user_id, .. } => {
                if self.remote_players.remove(&user_id).is_some() {
                    info!("Player {} left", user_id);
                }
            }
            ServerMessage::GameAction {
                user_id, action, ..
            } => {
                debug!("Game action from {}: {}", user_id, action);
            }
            ServerMessage::GetCheckpoint { user_id, .. } => {
                debug!("Player {} reached a checkpoint", user_id);
            }
            ServerMessage::GetPoint { user_id, .. } => {
                debug!("Player {} collected a point", user_id);
            }
        }
    }

    pub fn remote_player(&self, user_id: &Uuid) -> Option<&RemotePlayer> {
        self.remote_players.get(user_id)
    }

    pub fn remote_players(&self) -> impl Iterator<Item = &RemotePlayer> {
        self.remote_players.values()
    }

    pub fn remote_count(&self) -> usize {
        self.remote_players.len()
    }
}
