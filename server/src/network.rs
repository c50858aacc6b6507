//! Server network layer: WebSocket transport feeding the relay event loop

use crate::config::{RelayConfig, IDLE_SWEEP_INTERVAL};
use crate::relay::{Outbox, Relay, SessionId};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

type ConnectionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Messages sent from connection tasks to the relay loop
#[derive(Debug)]
pub enum RelayEvent {
    Connected {
        outbox: Outbox,
        reply: oneshot::Sender<SessionId>,
    },
    Message {
        session_id: SessionId,
        text: String,
    },
    Disconnected {
        session_id: SessionId,
    },
}

/// WebSocket relay server
///
/// One task accepts TCP connections and spawns a task per connection. Every
/// connection task reports to a single loop that owns the [`Relay`], so all
/// relay state is touched from exactly one place.
pub struct Server {
    listener: TcpListener,
    relay: Relay,
    events_tx: mpsc::UnboundedSender<RelayEvent>,
    events_rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl Server {
    pub async fn bind(addr: &str, config: RelayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Relay listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            relay: Relay::new(config),
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until the event channel closes
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Server {
            listener,
            mut relay,
            events_tx,
            mut events_rx,
        } = self;

        tokio::spawn(accept_loop(listener, events_tx));

        let sweeping = relay.config().idle_timeout.is_some();
        let mut sweep_interval = interval(IDLE_SWEEP_INTERVAL);

        info!("Relay started");

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(event) => handle_event(&mut relay, event),
                        None => break,
                    }
                }
                _ = sweep_interval.tick(), if sweeping => {
                    let swept = relay.sweep_idle(Instant::now());
                    if swept > 0 {
                        debug!("Swept {} idle sessions", swept);
                    }
                }
            }
        }

        info!("Relay event loop stopped");
        Ok(())
    }
}

fn handle_event(relay: &mut Relay, event: RelayEvent) {
    match event {
        RelayEvent::Connected { outbox, reply } => {
            let session_id = relay.accept(outbox);
            if reply.send(session_id).is_err() {
                // Connection task vanished before learning its id.
                relay.disconnect(session_id);
            }
        }
        RelayEvent::Message { session_id, text } => relay.handle_text(session_id, &text),
        RelayEvent::Disconnected { session_id } => relay.disconnect(session_id),
    }
}

async fn accept_loop(listener: TcpListener, events_tx: mpsc::UnboundedSender<RelayEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("TCP connection from {}", addr);
                let events_tx = events_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, events_tx).await {
                        warn!("Connection {} ended with error: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Drives one WebSocket connection until it closes
///
/// Outbound frames are written by a separate task draining the session's
/// outbox. The writer stops once the relay drops the outbox, which happens
/// when the session is disconnected.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events_tx: mpsc::UnboundedSender<RelayEvent>,
) -> ConnectionResult {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<String>();
    let (reply_tx, reply_rx) = oneshot::channel();
    events_tx.send(RelayEvent::Connected {
        outbox,
        reply: reply_tx,
    })?;
    let session_id = reply_rx.await?;
    info!("WebSocket {} bound to session {}", addr, session_id);

    tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if ws_write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_write.close().await;
    });

    while let Some(frame) = ws_read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Dropping non UTF-8 binary frame from {}", session_id);
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Read error on {}: {}", session_id, e);
                break;
            }
        };

        if events_tx
            .send(RelayEvent::Message { session_id, text })
            .is_err()
        {
            break;
        }
    }

    let _ = events_tx.send(RelayEvent::Disconnected { session_id });
    Ok(())
}
