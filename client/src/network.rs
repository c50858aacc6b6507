use crate::game::ClientGameState;
use crate::input::{InputCommand, InputManager};
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub room_id: String,
    pub client_id: String,
    /// Period between `player_update` messages
    pub update_interval: Duration,
    /// Period between simulation frames
    pub frame_interval: Duration,
}

pub struct Client {
    config: ClientConfig,
    game: ClientGameState,
    input: InputManager,
    started: Instant,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let game = ClientGameState::with_default_level(config.client_id.clone());
        Self {
            config,
            game,
            input: InputManager::new(),
            started: Instant::now(),
        }
    }

    pub fn game(&self) -> &ClientGameState {
        &self.game
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn handle_text(&mut self, text: &str) {
        match ServerMessage::parse(text) {
            Ok(Some(message)) => {
                let before = self.game.remote_count();
                self.game.apply_server_message(message);
                if self.game.remote_count() != before {
                    self.log_roster();
                }
            }
            Ok(None) => debug!("Ignoring unknown message type"),
            Err(e) => warn!("Dropping message from relay: {}", e),
        }
    }

    fn log_roster(&self) {
        let names: Vec<String> = self
            .game
            .remote_players()
            .map(|player| {
                player
                    .client_id
                    .clone()
                    .unwrap_or_else(|| player.user_id.to_string())
            })
            .collect();
        info!("{} other players in room: [{}]", names.len(), names.join(", "));
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {}...", self.config.server_url);
        let (ws_stream, _) = connect_async(self.config.server_url.as_str()).await?;
        let (mut ws_write, mut ws_read) = ws_stream.split();
        info!("Connected, joining room {}", self.config.room_id);

        send(&mut ws_write, &self.game.join_message(&self.config.room_id)).await?;

        let mut commands = spawn_stdin_reader();
        let mut input_open = true;

        let mut frame_interval = interval(self.config.frame_interval);
        let mut update_interval = interval(self.config.update_interval);

        loop {
            tokio::select! {
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Relay closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("Connection error: {}", e);
                            return Err(e.into());
                        }
                    }
                },

                command = commands.recv(), if input_open => {
                    match command {
                        Some(InputCommand::Quit) => break,
                        Some(command) => self.input.apply(command),
                        None => input_open = false,
                    }
                },

                _ = frame_interval.tick() => {
                    let now_ms = self.now_ms();
                    if let Some(avatar) = self.game.local_avatar_mut() {
                        self.input.drive(avatar);
                    }
                    for message in self.game.step(now_ms) {
                        send(&mut ws_write, &message).await?;
                    }
                },

                _ = update_interval.tick() => {
                    if self.game.identity.is_some() {
                        send(&mut ws_write, &self.game.update_message()).await?;
                    }
                },
            }
        }

        let _ = ws_write.close().await;
        info!("Disconnected");
        Ok(())
    }
}

async fn send<S>(sink: &mut S, message: &ClientMessage) -> Result<(), Box<dyn std::error::Error>>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(message.to_json()?)).await?;
    Ok(())
}

/// Reads input commands line by line from stdin.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<InputCommand> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<InputCommand>() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
    });

    rx
}
