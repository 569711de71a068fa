//! WebSocket broadcast server for the Action stream.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actions::{ActionManager, ObserverId};
use crate::model::Action;

use super::errors::{BroadcastError, BroadcastResult};

/// Broadcast server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Bind address for the WebSocket listener
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Capacity of each connection's outbound queue; a connection that
    /// falls this far behind is evicted
    #[serde(default = "default_connection_queue_capacity")]
    pub connection_queue_capacity: usize,

    /// Capacity of the observer queue this server registers on the
    /// ActionManager
    #[serde(default = "default_relay_queue_capacity")]
    pub relay_queue_capacity: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:9001".to_string()
}

fn default_connection_queue_capacity() -> usize {
    256
}

fn default_relay_queue_capacity() -> usize {
    1024
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            connection_queue_capacity: default_connection_queue_capacity(),
            relay_queue_capacity: default_relay_queue_capacity(),
        }
    }
}

type ConnectionId = Uuid;
type ConnectionTable = Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>;

/// Table entry for one live connection. Dropping the sender closes the
/// connection's queue, which terminates its outbound pump and socket.
#[derive(Debug)]
struct ConnectionHandle {
    sender: mpsc::Sender<Action>,
}

/// Commands serialized through the coordination task.
enum Command {
    Register {
        id: ConnectionId,
        sender: mpsc::Sender<Action>,
    },
    Unregister {
        id: ConnectionId,
    },
}

/// Fans the Action stream out to all connected WebSocket listeners.
pub struct BroadcastServer {
    local_addr: SocketAddr,
    connections: ConnectionTable,
    shutdown_tx: broadcast::Sender<()>,
    observer_id: ObserverId,
    manager: Arc<ActionManager>,
}

impl BroadcastServer {
    /// Bind the listener, subscribe to the ActionManager, and spawn the
    /// coordination and accept tasks.
    pub async fn start(
        config: BroadcastConfig,
        manager: Arc<ActionManager>,
    ) -> BroadcastResult<Self> {
        let addr: SocketAddr =
            config
                .bind_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| BroadcastError::InvalidAddr {
                    addr: config.bind_addr.clone(),
                    reason: e.to_string(),
                })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BroadcastError::Bind {
                addr: config.bind_addr.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr().map_err(|e| BroadcastError::Bind {
            addr: config.bind_addr.clone(),
            source: e,
        })?;

        let (action_tx, action_rx) = mpsc::channel(config.relay_queue_capacity);
        let observer_id = manager.register_observer(action_tx);

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);
        let connections: ConnectionTable = Arc::new(RwLock::new(HashMap::new()));

        tokio::spawn(coordinate(
            Arc::clone(&connections),
            control_rx,
            action_rx,
            shutdown_tx.subscribe(),
        ));
        tokio::spawn(accept_loop(
            listener,
            control_tx,
            shutdown_tx.subscribe(),
            config.connection_queue_capacity,
        ));

        info!(addr = %local_addr, "broadcast server listening");

        Ok(Self {
            local_addr,
            connections,
            shutdown_tx,
            observer_id,
            manager,
        })
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Tear the server down: under the table lock close every
    /// connection's queue (and thereby its socket), then unregister from
    /// the ActionManager and stop the accept and coordination tasks.
    ///
    /// Concurrent fan-out sees either the full table or an empty one,
    /// never a partial teardown.
    pub fn close(&self) {
        {
            let mut connections = self
                .connections
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let count = connections.len();
            connections.clear();
            if count > 0 {
                info!(connections = count, "broadcast server closed connections");
            }
        }

        self.manager.unregister_observer(self.observer_id);
        let _ = self.shutdown_tx.send(());
    }
}

/// The single coordination task: serializes registration, teardown, and
/// Action relay so the connection table has one writer path.
async fn coordinate(
    connections: ConnectionTable,
    mut control_rx: mpsc::UnboundedReceiver<Command>,
    mut action_rx: mpsc::Receiver<Action>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            command = control_rx.recv() => match command {
                Some(Command::Register { id, sender }) => {
                    let mut table = connections
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    table.insert(id, ConnectionHandle { sender });
                    debug!(connection = %id, total = table.len(), "connection registered");
                }
                Some(Command::Unregister { id }) => {
                    let mut table = connections
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if table.remove(&id).is_some() {
                        debug!(connection = %id, total = table.len(), "connection unregistered");
                    }
                }
                None => break,
            },
            action = action_rx.recv() => match action {
                Some(action) => relay(&connections, action),
                // Unregistered from the ActionManager
                None => break,
            },
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Non-blocking fan-out of one Action to every connection queue. A full
/// (or already closed) queue evicts that connection immediately instead
/// of stalling the coordinator or any other connection.
fn relay(connections: &ConnectionTable, action: Action) {
    let mut evicted = Vec::new();
    {
        let table = connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (id, handle) in table.iter() {
            match handle.sender.try_send(action.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, "connection queue full, evicting");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => evicted.push(*id),
            }
        }
    }

    if !evicted.is_empty() {
        let mut table = connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for id in evicted {
            table.remove(&id);
        }
    }
}

/// Accepts sockets until shutdown; each connection gets its own task.
async fn accept_loop(
    listener: TcpListener,
    control_tx: mpsc::UnboundedSender<Command>,
    mut shutdown_rx: broadcast::Receiver<()>,
    queue_capacity: usize,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let control = control_tx.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, control, queue_capacity).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            },
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Lifecycle of one connection: handshake, register, run both pumps,
/// unregister.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    control: mpsc::UnboundedSender<Command>,
    queue_capacity: usize,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(peer = %peer_addr, error = %e, "websocket handshake failed");
            return;
        }
    };

    let id = Uuid::new_v4();
    let (sender, receiver) = mpsc::channel::<Action>(queue_capacity);
    if control
        .send(Command::Register { id, sender })
        .is_err()
    {
        // Server already shut down
        return;
    }
    debug!(connection = %id, peer = %peer_addr, "websocket connection established");

    let (ws_sink, ws_source) = ws_stream.split();
    let outbound = tokio::spawn(outbound_pump(receiver, ws_sink));
    inbound_pump(ws_source).await;

    let _ = control.send(Command::Unregister { id });
    let _ = outbound.await;
    debug!(connection = %id, "websocket connection closed");
}

/// Drains the connection queue to the socket. Ends when the queue closes
/// (eviction or server close) or the socket fails.
async fn outbound_pump(
    mut receiver: mpsc::Receiver<Action>,
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
) {
    while let Some(action) = receiver.recv().await {
        let payload = match serde_json::to_string(&action) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to serialize action");
                continue;
            }
        };
        if sink.send(Message::Text(payload)).await.is_err() {
            return;
        }
    }

    // Queue closed: say goodbye before the socket drops
    let _ = sink.send(Message::Close(None)).await;
}

/// Reads client frames for liveness only; payload content is not
/// interpreted in this protocol.
async fn inbound_pump(mut source: SplitStream<WebSocketStream<TcpStream>>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = BroadcastConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:9001");
        assert_eq!(config.connection_queue_capacity, 256);
        assert_eq!(config.relay_queue_capacity, 1024);
    }

    #[tokio::test]
    async fn test_start_registers_observer_and_close_unregisters() {
        let manager = Arc::new(ActionManager::new(0));
        let config = BroadcastConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..BroadcastConfig::default()
        };

        let server = BroadcastServer::start(config, Arc::clone(&manager))
            .await
            .unwrap();
        assert_eq!(manager.observer_count(), 1);
        assert_eq!(server.connection_count(), 0);

        server.close();
        assert_eq!(manager.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_bind_addr() {
        let manager = Arc::new(ActionManager::new(0));
        let config = BroadcastConfig {
            bind_addr: "not-an-address".to_string(),
            ..BroadcastConfig::default()
        };

        let result = BroadcastServer::start(config, manager).await;
        assert!(matches!(result, Err(BroadcastError::InvalidAddr { .. })));
    }
}
