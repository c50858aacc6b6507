//! Wire messages exchanged between clients and the relay.
//!
//! Every frame is a JSON object discriminated by a `type` field. The relay
//! never interprets player state beyond merging its top-level keys, so state
//! payloads are carried as open JSON maps.

use crate::avatar::Avatar;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Open set of player fields, shallow-merged by the relay.
pub type StateFields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("message has no string `type` field")]
    MissingType,
}

/// Messages sent from a client to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join_room", rename_all = "camelCase")]
    JoinRoom {
        #[serde(default, deserialize_with = "lenient_room_id")]
        room_id: String,
        #[serde(default, deserialize_with = "lenient_client_id")]
        client_id: Option<String>,
        #[serde(default, deserialize_with = "lenient_fields")]
        initial_state: StateFields,
    },

    #[serde(rename = "player_update")]
    PlayerUpdate {
        #[serde(default, deserialize_with = "lenient_fields")]
        state: StateFields,
    },

    /// Opaque action, rebroadcast untouched
    #[serde(rename = "game_action")]
    GameAction {
        #[serde(default)]
        action: Value,
    },

    #[serde(rename = "getCheckpoint")]
    GetCheckpoint {
        #[serde(default)]
        state: Value,
    },

    #[serde(rename = "getPoint")]
    GetPoint {
        #[serde(default)]
        state: Value,
    },
}

impl ClientMessage {
    const KNOWN_TYPES: [&'static str; 5] = [
        "join_room",
        "player_update",
        "game_action",
        "getCheckpoint",
        "getPoint",
    ];

    /// Parses one text frame. Unknown `type` tags yield `Ok(None)`.
    pub fn parse(text: &str) -> Result<Option<Self>, ProtocolError> {
        parse_tagged(text, &Self::KNOWN_TYPES)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "join_room",
            ClientMessage::PlayerUpdate { .. } => "player_update",
            ClientMessage::GameAction { .. } => "game_action",
            ClientMessage::GetCheckpoint { .. } => "getCheckpoint",
            ClientMessage::GetPoint { .. } => "getPoint",
        }
    }
}

/// Messages sent from the relay to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full room snapshot, sent only to the joining connection
    #[serde(rename = "game_state")]
    GameState { state: RoomSnapshot, user: UserInfo },

    #[serde(rename = "player_joined", rename_all = "camelCase")]
    PlayerJoined {
        user_id: Uuid,
        client_id: Option<String>,
        state: StateFields,
    },

    #[serde(rename = "player_update", rename_all = "camelCase")]
    PlayerUpdate {
        user_id: Uuid,
        client_id: Option<String>,
        state: StateFields,
    },

    #[serde(rename = "player_left", rename_all = "camelCase")]
    PlayerLeft {
        user_id: Uuid,
        client_id: Option<String>,
    },

    #[serde(rename = "game_action", rename_all = "camelCase")]
    GameAction {
        user_id: Uuid,
        client_id: Option<String>,
        action: Value,
    },

    #[serde(rename = "getCheckpoint", rename_all = "camelCase")]
    GetCheckpoint {
        user_id: Uuid,
        client_id: Option<String>,
        state: Value,
    },

    #[serde(rename = "getPoint", rename_all = "camelCase")]
    GetPoint {
        user_id: Uuid,
        client_id: Option<String>,
        state: Value,
    },
}

impl ServerMessage {
    const KNOWN_TYPES: [&'static str; 7] = [
        "game_state",
        "player_joined",
        "player_update",
        "player_left",
        "game_action",
        "getCheckpoint",
        "getPoint",
    ];

    pub fn parse(text: &str) -> Result<Option<Self>, ProtocolError> {
        parse_tagged(text, &Self::KNOWN_TYPES)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Identity echoed back to the joining connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: Uuid,
    pub client_id: Option<String>,
}

/// One room member as stored by the relay: identity plus whatever fields the
/// client has reported so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub user_id: Uuid,
    pub client_id: Option<String>,
    #[serde(flatten)]
    pub fields: StateFields,
}

impl PlayerState {
    pub fn new(user_id: Uuid, client_id: Option<String>) -> Self {
        Self {
            user_id,
            client_id,
            fields: StateFields::new(),
        }
    }

    /// Top-level keys of `update` overwrite stored ones; identity keys are ignored.
    pub fn merge(&mut self, update: &StateFields) {
        for (key, value) in update {
            if key == "userId" || key == "clientId" {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub players: Vec<PlayerState>,
    pub game_state: RoomGameState,
}

/// Static per-room blob. Never populated by the relay itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomGameState {
    #[serde(default)]
    pub platforms: Vec<Value>,
    #[serde(default)]
    pub powerups: Vec<Value>,
    #[serde(default)]
    pub checkpoint: Option<Value>,
    #[serde(default)]
    pub point: Option<Value>,
}

/// The position-sync subset of an avatar sent in `player_update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionState {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub is_jumping: bool,
}

impl From<&Avatar> for MotionState {
    fn from(avatar: &Avatar) -> Self {
        Self {
            x: avatar.x,
            y: avatar.y,
            velocity_x: avatar.velocity_x,
            velocity_y: avatar.velocity_y,
            is_jumping: avatar.is_jumping,
        }
    }
}

impl MotionState {
    pub fn to_fields(&self) -> StateFields {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => StateFields::new(),
        }
    }

    /// Overwrites only the fields present (and well-typed) in `fields`.
    pub fn merge_from(&mut self, fields: &StateFields) {
        let number = |key: &str| fields.get(key).and_then(Value::as_f64).map(|v| v as f32);

        if let Some(x) = number("x") {
            self.x = x;
        }
        if let Some(y) = number("y") {
            self.y = y;
        }
        if let Some(vx) = number("velocityX") {
            self.velocity_x = vx;
        }
        if let Some(vy) = number("velocityY") {
            self.velocity_y = vy;
        }
        if let Some(jumping) = fields.get("isJumping").and_then(Value::as_bool) {
            self.is_jumping = jumping;
        }
    }
}

fn parse_tagged<T: DeserializeOwned>(
    text: &str,
    known_types: &[&str],
) -> Result<Option<T>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !known_types.contains(&kind) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}

/// Strings pass through, null is absent, any other value is bound by its JSON text.
fn lenient_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// A missing or null room id joins the unnamed room `""`.
fn lenient_room_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_client_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(Value::deserialize(deserializer)?))
}

/// Anything other than a JSON object is treated as an empty state.
fn lenient_fields<'de, D>(deserializer: D) -> Result<StateFields, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(fields) => fields,
        _ => StateFields::new(),
    })
}
