//! Room relay state machine
//!
//! The relay owns every piece of server state: sessions and their users,
//! which room each user sits in, the rooms themselves and the outbound handle
//! of every live connection. It never blocks and never awaits; the network
//! layer feeds it one event at a time from a single task, so each message is
//! handled to completion before the next one is looked at.
//!
//! Nothing here interprets player state. Position updates are merged and
//! forwarded verbatim, and game events are rebroadcast with the sender's
//! identity attached.

use crate::config::RelayConfig;
use crate::room::Room;
use log::{debug, info, warn};
use shared::protocol::{ClientMessage, ServerMessage, StateFields, UserInfo};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound text frames for one connection
pub type Outbox = mpsc::UnboundedSender<String>;

/// Per-connection handle, distinct from the user id shown to peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity record created when a connection is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Server-generated, stable for the connection's lifetime
    pub user_id: Uuid,
    /// Client-supplied correlation key, bound on join
    pub client_id: Option<String>,
}

impl User {
    fn info(&self) -> UserInfo {
        UserInfo {
            user_id: self.user_id,
            client_id: self.client_id.clone(),
        }
    }
}

pub struct Relay {
    config: RelayConfig,
    users: HashMap<SessionId, User>,
    user_rooms: HashMap<Uuid, String>,
    rooms: HashMap<String, Room>,
    connections: HashMap<SessionId, Outbox>,
    last_seen: HashMap<SessionId, Instant>,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            users: HashMap::new(),
            user_rooms: HashMap::new(),
            rooms: HashMap::new(),
            connections: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Registers a new connection with a fresh session and user
    ///
    /// No authentication happens here; every accepted connection gets a
    /// brand-new user id, even if the same client reconnects.
    pub fn accept(&mut self, outbox: Outbox) -> SessionId {
        let session_id = SessionId::new();
        let user = User {
            user_id: Uuid::new_v4(),
            client_id: None,
        };

        info!("Session {} accepted as user {}", session_id, user.user_id);
        self.users.insert(session_id, user);
        self.connections.insert(session_id, outbox);
        self.last_seen.insert(session_id, Instant::now());
        session_id
    }

    /// Parses and dispatches one inbound text frame
    ///
    /// Malformed frames are logged and dropped without answering the sender.
    /// Unknown message types are ignored.
    pub fn handle_text(&mut self, session_id: SessionId, text: &str) {
        if let Some(seen) = self.last_seen.get_mut(&session_id) {
            *seen = Instant::now();
        }

        match ClientMessage::parse(text) {
            Ok(Some(message)) => self.handle_message(session_id, message),
            Ok(None) => debug!("Ignoring unknown message type from {}", session_id),
            Err(e) => warn!("Dropping message from {}: {}", session_id, e),
        }
    }

    pub fn handle_message(&mut self, session_id: SessionId, message: ClientMessage) {
        debug!("{} from {}", message.kind(), session_id);

        match message {
            ClientMessage::JoinRoom {
                room_id,
                client_id,
                initial_state,
            } => self.join_room(session_id, room_id, client_id, initial_state),
            ClientMessage::PlayerUpdate { state } => self.player_update(session_id, state),
            ClientMessage::GameAction { action } => {
                self.rebroadcast(session_id, |user| ServerMessage::GameAction {
                    user_id: user.user_id,
                    client_id: user.client_id.clone(),
                    action,
                })
            }
            ClientMessage::GetCheckpoint { state } => {
                self.rebroadcast(session_id, |user| ServerMessage::GetCheckpoint {
                    user_id: user.user_id,
                    client_id: user.client_id.clone(),
                    state,
                })
            }
            ClientMessage::GetPoint { state } => {
                self.rebroadcast(session_id, |user| ServerMessage::GetPoint {
                    user_id: user.user_id,
                    client_id: user.client_id.clone(),
                    state,
                })
            }
        }
    }

    fn join_room(
        &mut self,
        session_id: SessionId,
        room_id: String,
        client_id: Option<String>,
        initial_state: StateFields,
    ) {
        let Some(user) = self.users.get_mut(&session_id) else {
            return;
        };
        if let Some(client_id) = client_id.filter(|id| !id.is_empty()) {
            user.client_id = Some(client_id);
        }
        let user = user.clone();

        // A user sits in one room at a time.
        if let Some(previous) = self.user_rooms.get(&user.user_id).cloned() {
            if previous != room_id {
                self.leave_room(session_id, &user, &previous);
            }
        }

        let room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            debug!("Creating room {}", room_id);
            Room::new(room_id.clone())
        });
        room.upsert_player(user.user_id, user.client_id.clone(), &initial_state);
        let snapshot = room.snapshot();
        self.user_rooms.insert(user.user_id, room_id.clone());

        info!(
            "User {} joined room {} ({} players)",
            user.user_id,
            room_id,
            snapshot.players.len()
        );

        self.send_to(
            session_id,
            &ServerMessage::GameState {
                state: snapshot,
                user: user.info(),
            },
        );
        self.broadcast_to_room(
            &room_id,
            &ServerMessage::PlayerJoined {
                user_id: user.user_id,
                client_id: user.client_id.clone(),
                state: initial_state,
            },
            &[session_id],
        );
    }

    fn player_update(&mut self, session_id: SessionId, state: StateFields) {
        let Some((user, room_id)) = self.membership(session_id) else {
            debug!("player_update from {} before joining a room", session_id);
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if !room.merge_update(user.user_id, &state) {
            return;
        }

        let message = ServerMessage::PlayerUpdate {
            user_id: user.user_id,
            client_id: user.client_id,
            state,
        };
        if self.config.echo_to_sender {
            self.broadcast_to_room(&room_id, &message, &[]);
        } else {
            self.broadcast_to_room(&room_id, &message, &[session_id]);
        }
    }

    /// Sends an event envelope built from the sender's identity to its whole room.
    fn rebroadcast<F>(&mut self, session_id: SessionId, build: F)
    where
        F: FnOnce(&User) -> ServerMessage,
    {
        let Some((user, room_id)) = self.membership(session_id) else {
            return;
        };
        let message = build(&user);
        self.broadcast_to_room(&room_id, &message, &[]);
    }

    /// Tears down a session. Safe to call more than once.
    pub fn disconnect(&mut self, session_id: SessionId) {
        self.connections.remove(&session_id);
        self.last_seen.remove(&session_id);

        let Some(user) = self.users.remove(&session_id) else {
            return;
        };
        if let Some(room_id) = self.user_rooms.get(&user.user_id).cloned() {
            self.leave_room(session_id, &user, &room_id);
        }
        info!("Session {} (user {}) disconnected", session_id, user.user_id);
    }

    fn leave_room(&mut self, session_id: SessionId, user: &User, room_id: &str) {
        self.user_rooms.remove(&user.user_id);

        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.remove_player(user.user_id).is_none() {
            return;
        }
        let now_empty = room.is_empty();
        info!("User {} left room {}", user.user_id, room_id);

        self.broadcast_to_room(
            room_id,
            &ServerMessage::PlayerLeft {
                user_id: user.user_id,
                client_id: user.client_id.clone(),
            },
            &[session_id],
        );

        if now_empty && !self.config.keep_empty_rooms {
            self.rooms.remove(room_id);
            info!("Room {} is empty, evicted", room_id);
        }
    }

    /// Delivers `message` to every live connection bound to `room_id`
    ///
    /// Delivery is best-effort. A connection whose outbox is closed is dropped
    /// from the connection table; its user is cleaned up when the transport
    /// reports the disconnect.
    pub fn broadcast_to_room(
        &mut self,
        room_id: &str,
        message: &ServerMessage,
        exclude: &[SessionId],
    ) {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize broadcast for room {}: {}", room_id, e);
                return;
            }
        };

        let mut failed = Vec::new();
        for (session_id, outbox) in &self.connections {
            if exclude.contains(session_id) {
                continue;
            }
            let in_room = self
                .users
                .get(session_id)
                .and_then(|user| self.user_rooms.get(&user.user_id))
                .map_or(false, |bound| bound == room_id);
            if in_room && outbox.send(text.clone()).is_err() {
                failed.push(*session_id);
            }
        }

        self.prune(failed);
    }

    pub fn send_to(&mut self, session_id: SessionId, message: &ServerMessage) {
        let Some(outbox) = self.connections.get(&session_id) else {
            return;
        };
        match message.to_json() {
            Ok(text) => {
                if outbox.send(text).is_err() {
                    self.prune(vec![session_id]);
                }
            }
            Err(e) => warn!("Failed to serialize message for {}: {}", session_id, e),
        }
    }

    fn prune(&mut self, failed: Vec<SessionId>) {
        for session_id in failed {
            warn!("Send to {} failed, dropping its connection handle", session_id);
            self.connections.remove(&session_id);
        }
    }

    /// Sessions that have been silent for longer than `timeout` at `now`.
    pub fn idle_sessions(&self, now: Instant) -> Vec<SessionId> {
        let Some(timeout) = self.config.idle_timeout else {
            return Vec::new();
        };
        self.last_seen
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) > timeout)
            .map(|(&session_id, _)| session_id)
            .collect()
    }

    /// Disconnects every idle session through the normal teardown path.
    pub fn sweep_idle(&mut self, now: Instant) -> usize {
        let idle = self.idle_sessions(now);
        for &session_id in &idle {
            info!("Session {} idle, disconnecting", session_id);
            self.disconnect(session_id);
        }
        idle.len()
    }

    fn membership(&self, session_id: SessionId) -> Option<(User, String)> {
        let user = self.users.get(&session_id)?;
        let room_id = self.user_rooms.get(&user.user_id)?;
        Some((user.clone(), room_id.clone()))
    }

    pub fn user(&self, session_id: SessionId) -> Option<&User> {
        self.users.get(&session_id)
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_of(&self, session_id: SessionId) -> Option<&str> {
        let user = self.users.get(&session_id)?;
        self.user_rooms.get(&user.user_id).map(String::as_str)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.users.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_test::assert_ok;

    fn frame_type(text: &str) -> Option<String> {
        serde_json::from_str::<Value>(text)
            .ok()?
            .get("type")?
            .as_str()
            .map(str::to_owned)
    }

    struct Peer {
        session: SessionId,
        rx: UnboundedReceiver<String>,
    }

    impl Peer {
        fn connect(relay: &mut Relay) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Peer {
                session: relay.accept(tx),
                rx,
            }
        }

        fn next(&mut self) -> Value {
            let text = assert_ok!(self.rx.try_recv());
            serde_json::from_str(&text).unwrap()
        }

        fn drain_types(&mut self) -> Vec<String> {
            let mut types = Vec::new();
            while let Ok(text) = self.rx.try_recv() {
                types.extend(frame_type(&text));
            }
            types
        }
    }

    fn join(relay: &mut Relay, peer: &Peer, room: &str, client_id: &str) {
        let text = json!({
            "type": "join_room",
            "roomId": room,
            "clientId": client_id,
            "initialState": {"x": 50, "y": 550}
        })
        .to_string();
        relay.handle_text(peer.session, &text);
    }

    #[test]
    fn test_accept_creates_user() {
        let mut relay = Relay::new(RelayConfig::default());
        let peer = Peer::connect(&mut relay);

        let user = relay.user(peer.session).unwrap();
        assert_eq!(user.client_id, None);
        assert_eq!(relay.session_count(), 1);
        assert_eq!(relay.room_of(peer.session), None);
    }

    #[test]
    fn test_join_fresh_room_sends_snapshot() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut peer = Peer::connect(&mut relay);

        join(&mut relay, &peer, "lobby", "alice");

        assert_eq!(relay.room_count(), 1);
        assert_eq!(relay.room("lobby").unwrap().len(), 1);

        let state = peer.next();
        assert_eq!(state["type"], "game_state");
        assert_eq!(state["state"]["players"].as_array().unwrap().len(), 1);
        assert_eq!(state["state"]["players"][0]["x"], 50);
        assert_eq!(state["user"]["clientId"], "alice");
        assert_eq!(
            state["user"]["userId"],
            relay.user(peer.session).unwrap().user_id.to_string()
        );
        assert!(peer.drain_types().is_empty());
    }

    #[test]
    fn test_second_join_notifies_first_only() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut first = Peer::connect(&mut relay);
        let mut second = Peer::connect(&mut relay);

        join(&mut relay, &first, "lobby", "a");
        first.drain_types();
        join(&mut relay, &second, "lobby", "b");

        let joined = first.next();
        assert_eq!(joined["type"], "player_joined");
        assert_eq!(joined["clientId"], "b");
        assert_eq!(joined["state"]["y"], 550);

        assert_eq!(second.drain_types(), vec!["game_state".to_string()]);
    }

    #[test]
    fn test_players_in_other_rooms_are_isolated() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut first = Peer::connect(&mut relay);
        let second = Peer::connect(&mut relay);

        join(&mut relay, &first, "red", "a");
        first.drain_types();
        join(&mut relay, &second, "blue", "b");

        assert!(first.drain_types().is_empty());
        assert_eq!(relay.room_count(), 2);
    }

    #[test]
    fn test_empty_client_id_keeps_previous_binding() {
        let mut relay = Relay::new(RelayConfig::default());
        let peer = Peer::connect(&mut relay);

        join(&mut relay, &peer, "lobby", "alice");
        join(&mut relay, &peer, "lobby", "");

        assert_eq!(
            relay.user(peer.session).unwrap().client_id.as_deref(),
            Some("alice")
        );
        assert_eq!(relay.room("lobby").unwrap().len(), 1);
    }

    #[test]
    fn test_numeric_client_id_still_joins() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut peer = Peer::connect(&mut relay);

        relay.handle_text(
            peer.session,
            r#"{"type":"join_room","roomId":"lobby","clientId":42,"initialState":{"x":1}}"#,
        );

        assert_eq!(relay.room_count(), 1);
        assert_eq!(
            relay.user(peer.session).unwrap().client_id.as_deref(),
            Some("42")
        );
        let state = peer.next();
        assert_eq!(state["type"], "game_state");
        assert_eq!(state["user"]["clientId"], "42");
        assert_eq!(state["state"]["players"][0]["x"], 1);
    }

    #[test]
    fn test_player_update_merges_and_relays() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut first = Peer::connect(&mut relay);
        let mut second = Peer::connect(&mut relay);
        join(&mut relay, &first, "lobby", "a");
        join(&mut relay, &second, "lobby", "b");
        first.drain_types();
        second.drain_types();

        relay.handle_text(
            first.session,
            r#"{"type":"player_update","state":{"x":120,"velocityX":5}}"#,
        );

        let update = second.next();
        assert_eq!(update["type"], "player_update");
        assert_eq!(update["clientId"], "a");
        assert_eq!(update["state"]["x"], 120);
        assert!(first.drain_types().is_empty());

        let user_id = relay.user(first.session).unwrap().user_id;
        let stored = relay.room("lobby").unwrap().player(user_id).unwrap();
        assert_eq!(stored.fields["x"], 120);
        assert_eq!(stored.fields["y"], 550);
    }

    #[test]
    fn test_echo_to_sender_includes_sender() {
        let config = RelayConfig {
            echo_to_sender: true,
            ..RelayConfig::default()
        };
        let mut relay = Relay::new(config);
        let mut peer = Peer::connect(&mut relay);
        join(&mut relay, &peer, "lobby", "a");
        peer.drain_types();

        relay.handle_text(peer.session, r#"{"type":"player_update","state":{"x":1}}"#);
        assert_eq!(peer.drain_types(), vec!["player_update".to_string()]);
    }

    #[test]
    fn test_update_before_join_has_no_effect() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut lonely = Peer::connect(&mut relay);
        let mut member = Peer::connect(&mut relay);
        join(&mut relay, &member, "lobby", "m");
        member.drain_types();

        relay.handle_text(lonely.session, r#"{"type":"player_update","state":{"x":1}}"#);
        relay.handle_text(lonely.session, r#"{"type":"game_action","action":"wave"}"#);

        assert!(lonely.drain_types().is_empty());
        assert!(member.drain_types().is_empty());
        assert_eq!(relay.room("lobby").unwrap().len(), 1);
    }

    #[test]
    fn test_game_events_rebroadcast_to_whole_room() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut first = Peer::connect(&mut relay);
        let mut second = Peer::connect(&mut relay);
        join(&mut relay, &first, "lobby", "a");
        join(&mut relay, &second, "lobby", "b");
        first.drain_types();
        second.drain_types();

        relay.handle_text(
            first.session,
            r#"{"type":"getCheckpoint","state":{"x":50,"y":550}}"#,
        );
        relay.handle_text(first.session, r#"{"type":"game_action","action":{"kind":"emote"}}"#);

        let event = second.next();
        assert_eq!(event["type"], "getCheckpoint");
        assert_eq!(event["clientId"], "a");
        assert_eq!(event["state"]["x"], 50);
        assert_eq!(second.next()["action"]["kind"], "emote");
        assert_eq!(
            first.drain_types(),
            vec!["getCheckpoint".to_string(), "game_action".to_string()]
        );
    }

    #[test]
    fn test_malformed_and_unknown_messages_are_dropped() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut peer = Peer::connect(&mut relay);

        relay.handle_text(peer.session, "{definitely not json");
        relay.handle_text(peer.session, r#"{"type":"teleport","x":5}"#);
        relay.handle_text(peer.session, r#"{"type":42,"roomId":"lobby"}"#);

        assert!(peer.drain_types().is_empty());
        assert_eq!(relay.room_count(), 0);
        assert_eq!(relay.connection_count(), 1);
    }

    #[test]
    fn test_disconnect_notifies_remaining_members_once() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut first = Peer::connect(&mut relay);
        let mut second = Peer::connect(&mut relay);
        join(&mut relay, &first, "lobby", "a");
        join(&mut relay, &second, "lobby", "b");
        first.drain_types();
        second.drain_types();

        let leaving = relay.user(second.session).unwrap().user_id;
        relay.disconnect(second.session);

        let left = first.next();
        assert_eq!(left["type"], "player_left");
        assert_eq!(left["userId"], leaving.to_string());
        assert!(first.drain_types().is_empty());
        assert!(!relay.room("lobby").unwrap().contains(leaving));
        assert_eq!(relay.session_count(), 1);
    }

    #[test]
    fn test_last_member_leaving_evicts_room() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut peer = Peer::connect(&mut relay);
        join(&mut relay, &peer, "lobby", "a");
        peer.drain_types();

        relay.disconnect(peer.session);
        assert_eq!(relay.room_count(), 0);
        assert_eq!(relay.session_count(), 0);
        assert_eq!(relay.connection_count(), 0);
        assert!(peer.drain_types().is_empty());

        relay.disconnect(peer.session);
        assert_eq!(relay.session_count(), 0);
    }

    #[test]
    fn test_keep_empty_rooms() {
        let config = RelayConfig {
            keep_empty_rooms: true,
            ..RelayConfig::default()
        };
        let mut relay = Relay::new(config);
        let peer = Peer::connect(&mut relay);
        join(&mut relay, &peer, "lobby", "a");

        relay.disconnect(peer.session);
        assert_eq!(relay.room_count(), 1);
        assert!(relay.room("lobby").unwrap().is_empty());
    }

    #[test]
    fn test_joining_another_room_leaves_the_first() {
        let mut relay = Relay::new(RelayConfig::default());
        let mut mover = Peer::connect(&mut relay);
        let mut stayer = Peer::connect(&mut relay);
        join(&mut relay, &stayer, "red", "s");
        join(&mut relay, &mover, "red", "m");
        stayer.drain_types();
        mover.drain_types();

        join(&mut relay, &mover, "blue", "m");

        assert_eq!(stayer.drain_types(), vec!["player_left".to_string()]);
        assert_eq!(mover.drain_types(), vec!["game_state".to_string()]);
        assert_eq!(relay.room_of(mover.session), Some("blue"));
        assert_eq!(relay.room("red").unwrap().len(), 1);
    }

    #[test]
    fn test_closed_outbox_is_pruned() {
        let mut relay = Relay::new(RelayConfig::default());
        let first = Peer::connect(&mut relay);
        let mut second = Peer::connect(&mut relay);
        join(&mut relay, &first, "lobby", "a");
        join(&mut relay, &second, "lobby", "b");
        second.drain_types();

        let Peer { session, rx } = first;
        drop(rx);
        relay.handle_text(second.session, r#"{"type":"game_action","action":1}"#);

        assert_eq!(relay.connection_count(), 1);
        assert!(relay.user(session).is_some());

        relay.disconnect(session);
        assert_eq!(
            second.drain_types(),
            vec!["game_action".to_string(), "player_left".to_string()]
        );
    }

    #[test]
    fn test_idle_sweep_uses_disconnect_path() {
        let config = RelayConfig::default().with_idle_timeout_secs(5);
        let mut relay = Relay::new(config);
        let first = Peer::connect(&mut relay);
        let second = Peer::connect(&mut relay);
        join(&mut relay, &first, "lobby", "a");
        join(&mut relay, &second, "lobby", "b");

        let later = Instant::now() + Duration::from_secs(3);
        assert_eq!(relay.sweep_idle(later), 0);

        let much_later = Instant::now() + Duration::from_secs(60);
        assert_eq!(relay.sweep_idle(much_later), 2);
        assert_eq!(relay.session_count(), 0);
        assert_eq!(relay.room_count(), 0);
    }

    #[test]
    fn test_no_sweep_without_timeout() {
        let mut relay = Relay::new(RelayConfig::default());
        let _peer = Peer::connect(&mut relay);
        assert!(relay
            .idle_sessions(Instant::now() + Duration::from_secs(3_600))
            .is_empty());
    }
}
