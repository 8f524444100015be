//! Server network layer handling TCP connections and command processing
//!
//! Every accepted connection gets two tasks: a reader that parses one JSON
//! request per line and runs it against the world, and a writer that drains
//! an unbounded channel of outgoing lines. Anything that wants to talk to a
//! connection (its own reader, another robot's shot, the console) goes
//! through that channel.

use crate::client_manager::{ClientManager, Outbound};
use crate::command::CommandError;
use crate::config::ServerConfig;
use crate::dispatcher::{self, Notice};
use crate::world::World;
use crate::BoxError;
use log::{debug, error, info, warn};
use shared::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify, RwLock};

pub type SharedWorld = Arc<RwLock<World>>;
pub type SharedClients = Arc<RwLock<ClientManager>>;

/// Listening socket plus the state shared by every connection
pub struct Server {
    listener: TcpListener,
    world: SharedWorld,
    clients: SharedClients,
}

impl Server {
    pub async fn bind(config: &ServerConfig, world: World) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            world: Arc::new(RwLock::new(world)),
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    pub fn clients(&self) -> SharedClients {
        Arc::clone(&self.clients)
    }

    /// Accept loop. Each connection runs on its own task so a slow or
    /// broken client never holds up the others.
    pub async fn run(&self) -> Result<(), BoxError> {
        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let world = Arc::clone(&self.world);
                    let clients = Arc::clone(&self.clients);
                    tokio::spawn(async move {
                        handle_connection(stream, addr, world, clients).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Tells every client the server is going away and closes them
    pub async fn shutdown(&self) {
        let clients = self.clients.read().await;
        info!("Disconnecting {} clients", clients.len());
        clients.broadcast(&Response::quit());
        clients.close_all();
    }
}

/// Spawns the task that writes queued lines to the socket
fn spawn_network_sender(
    write_half: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    addr: SocketAddr,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut writer = BufWriter::new(write_half);

        while let Some(message) = outbound_rx.recv().await {
            match message {
                Outbound::Line(line) => {
                    let written = async {
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                        writer.flush().await
                    }
                    .await;
                    if let Err(e) = written {
                        warn!("Failed to write to {}: {}", addr, e);
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Error shutting down connection to {}: {}", addr, e);
        }
    })
}

fn send(outbound: &mpsc::UnboundedSender<Outbound>, response: &Response) {
    match serde_json::to_string(response) {
        Ok(line) => {
            let _ = outbound.send(Outbound::Line(line));
        }
        Err(e) => error!("Failed to serialize response: {}", e),
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, world: SharedWorld, clients: SharedClients) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(Notify::new());
    let writer = spawn_network_sender(write_half, outbound_rx, addr);

    let client_id = {
        let mut clients = clients.write().await;
        clients.add_client(addr, outbound_tx.clone(), Arc::clone(&closed))
    };
    let Some(client_id) = client_id else {
        warn!("Refusing connection from {}: server full", addr);
        send(&outbound_tx, &Response::error("Server full"));
        let _ = outbound_tx.send(Outbound::Close);
        let _ = writer.await;
        return;
    };

    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = tokio::select! {
            _ = closed.notified() => {
                debug!("Client {} closed by server", client_id);
                break;
            }
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let keep_going = handle_request(&line, client_id, &outbound_tx, &closed, &world, &clients).await;
                if !keep_going {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading from client {}: {}", client_id, e);
                break;
            }
        }
    }

    {
        // World before clients, like every other path that takes both.
        let mut world = world.write().await;
        let removed = clients.write().await.remove_client(&client_id);
        if let Some(robot) = removed.and_then(|client| client.robot) {
            if world.remove_robot(&robot).is_some() {
                info!("Removed robot '{}' after its client left", robot);
            }
        }
    }
    let _ = outbound_tx.send(Outbound::Close);
    drop(outbound_tx);
    if let Err(e) = writer.await {
        error!("Writer task for client {} panicked: {}", client_id, e);
    }
}

/// Processes one request line. Returns false when the connection must end.
async fn handle_request(
    line: &str,
    client_id: u32,
    outbound: &mpsc::UnboundedSender<Outbound>,
    closed: &Notify,
    world: &SharedWorld,
    clients: &SharedClients,
) -> bool {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!("Client {} sent an unparsable request: {}", client_id, e);
            send(outbound, &Response::error(CommandError::Malformed.to_string()));
            return true;
        }
    };
    debug!(
        "Client {} -> {} {} {:?}",
        client_id, request.robot, request.command, request.arguments
    );

    let dispatch = {
        let mut world = world.write().await;
        let dispatch = dispatcher::dispatch(&mut world, &request, Instant::now(), &mut rand::thread_rng());
        let mut clients = clients.write().await;

        if let Some(robot) = &dispatch.launched {
            if let Some(previous) = clients.bind_robot(client_id, robot) {
                if world.remove_robot(&previous).is_some() {
                    info!("Robot '{}' replaced by '{}' on client {}", previous, robot, client_id);
                }
            }
        }
        send(outbound, &dispatch.response);
        deliver_notices(&clients, &dispatch.notices);
        prune_dead(&mut world, &mut clients);
        dispatch
    };

    let Some(pending) = dispatch.pending else {
        return true;
    };
    // The robot is busy; this connection waits while everyone else carries on.
    tokio::select! {
        _ = closed.notified() => return false,
        _ = tokio::time::sleep(pending.duration) => {}
    }

    let completion = {
        let mut world = world.write().await;
        let completion = dispatcher::complete_timed_action(&mut world, &pending.robot);
        prune_dead(&mut world, &mut *clients.write().await);
        completion
    };
    match completion {
        Some(response) => send(outbound, &response),
        None => debug!("No completion for '{}', robot is gone", pending.robot),
    }
    true
}

/// Notices go out before pruning so a destroyed robot's connection can
/// still be found.
fn deliver_notices(clients: &ClientManager, notices: &[Notice]) {
    for notice in notices {
        if !clients.send_to_robot(&notice.robot, &notice.response) {
            debug!("No connection to notify for '{}'", notice.robot);
        }
        if notice.terminate {
            clients.close_robot(&notice.robot);
        }
    }
}

/// Takes dead robots out of the world and releases their names.
fn prune_dead(world: &mut World, clients: &mut ClientManager) {
    for robot in world.prune_dead() {
        info!("Robot '{}' removed from the world", robot);
        clients.unbind_robot(&robot);
    }
}
