//! Connection bookkeeping for the robot world server
//!
//! This module tracks every open TCP connection, including:
//! - Connection lifecycle (connect, disconnect, forced close)
//! - Capacity management and address tracking
//! - Binding between a connection and the robot it launched
//! - Routing of out-of-band notices to the right socket
//!
//! The manager never touches the world itself. It only knows which robot
//! names belong to which connection, so that the server can push a notice
//! to a robot's owner or clean the robot up when its owner goes away.

use log::{debug, info, warn};
use shared::Response;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Notify};

/// Messages consumed by a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// One serialized response, written followed by a newline
    Line(String),
    /// Flush and shut the socket down
    Close,
}

/// Represents one connected client
///
/// Each client maintains:
/// - Connection metadata (ID, address, connect time)
/// - The robot it launched, if any
/// - A sender feeding its writer task and a signal to stop its reader
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Peer address, used for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Name of the robot launched over this connection
    pub robot: Option<String>,
    sender: mpsc::UnboundedSender<Outbound>,
    closed: Arc<Notify>,
}

impl Client {
    /// Creates a new client record for an accepted connection
    pub fn new(
        id: u32,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Outbound>,
        closed: Arc<Notify>,
    ) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            robot: None,
            sender,
            closed,
        }
    }

    /// Queues a response for this client's writer task
    ///
    /// Returns false if the response could not be serialized or the writer
    /// has already gone away.
    pub fn send(&self, response: &Response) -> bool {
        match serde_json::to_string(response) {
            Ok(line) => self.sender.send(Outbound::Line(line)).is_ok(),
            Err(e) => {
                warn!("Failed to serialize response for client {}: {}", self.id, e);
                false
            }
        }
    }

    /// Asks both halves of the connection to shut down
    ///
    /// The writer flushes whatever is already queued before closing, so a
    /// notice sent just before this call still reaches the client.
    pub fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
        self.closed.notify_one();
    }
}

/// Manages all connected clients
///
/// The ClientManager enforces the server's capacity limit and keeps the
/// mapping from robot names to connections. It is shared between all
/// connection tasks behind a lock.
#[derive(Debug)]
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to register a new connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at
    /// capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Outbound>,
        closed: Arc<Notify>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender, closed));
        Some(client_id)
    }

    /// Removes a client and returns its record
    ///
    /// The caller uses the returned record to clean up the robot the
    /// connection owned.
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!(
            "Client {} disconnected after {:.1}s",
            client.id,
            client.connected_at.elapsed().as_secs_f64()
        );
        Some(client)
    }

    pub fn get(&self, client_id: &u32) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Records that `robot` was launched over connection `client_id`
    ///
    /// A robot name belongs to at most one connection, so any other binding
    /// of the same name is dropped. A connection owns at most one robot;
    /// the robot it controlled before is returned so the caller can take it
    /// out of the world.
    pub fn bind_robot(&mut self, client_id: u32, robot: &str) -> Option<String> {
        if !self.clients.contains_key(&client_id) {
            return None;
        }
        for (id, client) in self.clients.iter_mut() {
            if *id != client_id && client.robot.as_deref() == Some(robot) {
                warn!("Client {} loses stale binding to '{}'", id, robot);
                client.robot = None;
            }
        }

        let client = self.clients.get_mut(&client_id)?;
        debug!("Client {} now controls '{}'", client_id, robot);
        client
            .robot
            .replace(robot.to_string())
            .filter(|previous| previous != robot)
    }

    /// Forgets whichever connection controlled `robot`
    ///
    /// Called once the robot has left the world, so a later robot with the
    /// same name is never mistaken for it.
    pub fn unbind_robot(&mut self, robot: &str) {
        for client in self.clients.values_mut() {
            if client.robot.as_deref() == Some(robot) {
                debug!("Client {} no longer controls '{}'", client.id, robot);
                client.robot = None;
            }
        }
    }

    /// Finds the connection that launched a robot
    pub fn find_client_by_robot(&self, robot: &str) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.robot.as_deref() == Some(robot))
            .map(|(id, _)| *id)
    }

    /// Sends a response to whoever controls `robot`
    ///
    /// Returns false if no connection owns the robot or the send failed.
    pub fn send_to_robot(&self, robot: &str, response: &Response) -> bool {
        self.find_client_by_robot(robot)
            .and_then(|id| self.clients.get(&id))
            .map(|client| client.send(response))
            .unwrap_or(false)
    }

    /// Closes the connection that controls `robot`, if there is one
    pub fn close_robot(&self, robot: &str) {
        if let Some(client) = self
            .find_client_by_robot(robot)
            .and_then(|id| self.clients.get(&id))
        {
            info!("Closing client {} after '{}' was destroyed", client.id, robot);
            client.close();
        }
    }

    /// Sends the same response to every connection
    pub fn broadcast(&self, response: &Response) {
        for client in self.clients.values() {
            client.send(response);
        }
    }

    /// Asks every connection to shut down
    pub fn close_all(&self) {
        for client in self.clients.values() {
            client.close();
        }
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn connect(
        manager: &mut ClientManager,
        port: u16,
    ) -> (Option<u32>, mpsc::UnboundedReceiver<Outbound>, Arc<Notify>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(Notify::new());
        let id = manager.add_client(addr(port), tx, Arc::clone(&closed));
        (id, rx, closed)
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(4);
        assert_eq!(manager.len(), 0);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_add_client() {
        let mut manager = ClientManager::new(4);
        let (first, _rx1, _) = connect(&mut manager, 8001);
        let (second, _rx2, _) = connect(&mut manager, 8002);

        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get(&1).unwrap().addr, addr(8001));
    }

    #[test]
    fn test_max_clients_limit() {
        let mut manager = ClientManager::new(1);
        let (first, _rx1, _) = connect(&mut manager, 8001);
        let (second, _rx2, _) = connect(&mut manager, 8002);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client_returns_bound_robot() {
        let mut manager = ClientManager::new(4);
        let (id, _rx, _) = connect(&mut manager, 8001);
        let id = id.unwrap();
        assert_eq!(manager.bind_robot(id, "HAL"), None);

        let removed = manager.remove_client(&id).unwrap();
        assert_eq!(removed.robot.as_deref(), Some("HAL"));
        assert!(manager.remove_client(&id).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_binding_a_name_moves_it_to_the_new_owner() {
        let mut manager = ClientManager::new(4);
        let (first, _rx1, _) = connect(&mut manager, 8001);
        let (second, _rx2, _) = connect(&mut manager, 8002);
        let (first, second) = (first.unwrap(), second.unwrap());

        manager.bind_robot(first, "HAL");
        manager.bind_robot(second, "HAL");
        assert_eq!(manager.find_client_by_robot("HAL"), Some(second));
        assert!(manager.get(&first).unwrap().robot.is_none());

        let removed = manager.remove_client(&first).unwrap();
        assert!(removed.robot.is_none());
    }

    #[test]
    fn test_rebinding_returns_previous_robot() {
        let mut manager = ClientManager::new(4);
        let (id, _rx, _) = connect(&mut manager, 8001);
        let id = id.unwrap();

        assert_eq!(manager.bind_robot(id, "HAL"), None);
        assert_eq!(manager.bind_robot(id, "HAL"), None);
        assert_eq!(manager.bind_robot(id, "R2"), Some("HAL".to_string()));
        assert_eq!(manager.bind_robot(99, "C3PO"), None);
    }

    #[test]
    fn test_unbind_robot() {
        let mut manager = ClientManager::new(4);
        let (id, _rx, _) = connect(&mut manager, 8001);
        let id = id.unwrap();
        manager.bind_robot(id, "HAL");

        manager.unbind_robot("HAL");
        assert_eq!(manager.find_client_by_robot("HAL"), None);
        assert!(!manager.send_to_robot("HAL", &Response::quit()));
        assert_eq!(manager.bind_robot(id, "R2"), None);
    }

    #[test]
    fn test_send_to_robot_routes_to_owner() {
        let mut manager = ClientManager::new(4);
        let (hal, mut hal_rx, _) = connect(&mut manager, 8001);
        let (_other, mut other_rx, _) = connect(&mut manager, 8002);
        manager.bind_robot(hal.unwrap(), "HAL");

        assert!(manager.send_to_robot("HAL", &Response::quit()));
        assert!(!manager.send_to_robot("nobody", &Response::quit()));

        match hal_rx.try_recv().unwrap() {
            Outbound::Line(line) => {
                let response: Response = serde_json::from_str(&line).unwrap();
                assert!(response.is_quit());
            }
            other => panic!("Expected a line, got {:?}", other),
        }
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_robot_signals_connection() {
        let mut manager = ClientManager::new(4);
        let (id, mut rx, closed) = connect(&mut manager, 8001);
        manager.bind_robot(id.unwrap(), "HAL");

        manager.close_robot("HAL");
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        tokio::time::timeout(std::time::Duration::from_secs(1), closed.notified())
            .await
            .unwrap();
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut manager = ClientManager::new(4);
        let (_a, mut rx_a, _) = connect(&mut manager, 8001);
        let (_b, mut rx_b, _) = connect(&mut manager, 8002);

        manager.broadcast(&Response::ok("hello"));
        assert!(matches!(rx_a.try_recv(), Ok(Outbound::Line(_))));
        assert!(matches!(rx_b.try_recv(), Ok(Outbound::Line(_))));

        manager.close_all();
        assert_eq!(rx_a.try_recv().unwrap(), Outbound::Close);
        assert_eq!(rx_b.try_recv().unwrap(), Outbound::Close);
    }
}
