//! The connection registry, the single source of truth mapping target names
//! to device connections.
//!
//! Every mutation, whether it comes from a UI command, a transport
//! notification, or the player, goes through the one registry lock, so side
//! effects for a given target never interleave. Transport notifications
//! additionally carry the [`ConnectionId`] they were spawned for and are
//! dropped when the entry has since been replaced or removed; a stale
//! "handshake succeeded" arriving after a manual disconnect is a no-op.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::connection::{ConnectionId, ConnectionStatus, ConnectionView, DeviceConnection, Link};
use crate::endpoint::{Endpoint, EndpointError};
use crate::event::{EventNotifier, RelayEvent, Subscription};
use crate::orientation::{CalibrationOffset, OrientationSample};
use crate::session::RecordedFrame;
use crate::transport::{DialError, Dialer, MessageStream, TcpDialer, TransportHandle};
use crate::transport::CONNECT_TIMEOUT;

/// Synchronous rejections of a `connect` command. Asynchronous failures
/// (timeouts, refusals) surface as events instead.
#[derive(Debug)]
pub enum ConnectError {
    /// The target name was empty or all whitespace.
    EmptyTarget,
    /// The endpoint string failed validation.
    InvalidEndpoint(EndpointError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectError::EmptyTarget => write!(f, "empty target name"),
            ConnectError::InvalidEndpoint(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Maps target names to device connections and owns their lifecycles.
///
/// Cloning is cheap and shares the underlying state, which is how the
/// recorder, the player, and the transport worker threads all observe the
/// same connections.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<String, DeviceConnection>>>,
    notifier: EventNotifier,
    dialer: Arc<dyn Dialer>,
    next_id: Arc<AtomicU64>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// A registry that dials real TCP transports.
    pub fn new() -> Self {
        Self::with_dialer(Arc::new(TcpDialer))
    }

    /// A registry with a custom dialer, the seam tests use to substitute
    /// deterministic fakes.
    pub fn with_dialer(dialer: Arc<dyn Dialer>) -> Self {
        ConnectionRegistry {
            connections: Arc::new(Mutex::new(HashMap::new())),
            notifier: EventNotifier::new(),
            dialer,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a callback for lifecycle and playback events.
    pub fn subscribe(
        &self,
        callback: impl Fn(&RelayEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifier.subscribe(callback)
    }

    /// The notifier shared by every clone of this registry.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Binds `target` to a new device, tearing down any existing binding
    /// first; a target is bound to at most one device. Validation failures
    /// reject synchronously with no connection created; the handshake
    /// itself happens asynchronously and reports through events.
    pub fn connect(&self, target: &str, endpoint_raw: &str) -> Result<ConnectionId, ConnectError> {
        if target.trim().is_empty() {
            return Err(ConnectError::EmptyTarget);
        }
        let endpoint = match Endpoint::parse(endpoint_raw) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                self.notifier.emit(RelayEvent::ConnectionFailed {
                    target: target.to_owned(),
                    reason: err.to_string(),
                });
                return Err(ConnectError::InvalidEndpoint(err));
            }
        };

        // Tear down the previous binding before installing the new one.
        self.disconnect(target);

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!("connecting {} to {}", target, endpoint);
        self.connections.lock().unwrap().insert(
            target.to_owned(),
            DeviceConnection::connecting(id, target, endpoint.clone()),
        );

        let registry = self.clone();
        let target = target.to_owned();
        thread::spawn(move || registry.run_link(id, &target, &endpoint));

        Ok(id)
    }

    /// Removes `target`'s connection. No-op when absent. The entry is
    /// marked disconnected *before* the transport closes, so the reader's
    /// close notification stays silent; a manual close is not a fault.
    pub fn disconnect(&self, target: &str) {
        let removed = {
            let mut connections = self.connections.lock().unwrap();
            match connections.get_mut(target) {
                Some(conn) => {
                    conn.status = ConnectionStatus::Disconnected;
                    conn.close_link();
                    connections.remove(target)
                }
                None => None,
            }
        };
        if removed.is_some() {
            info!("{} removed", target);
            self.notifier.emit(RelayEvent::Removed {
                target: target.to_owned(),
            });
        }
    }

    /// Replaces `target`'s calibration offset as one triple; a concurrent
    /// reader never observes a partially applied rotation. No-op when the
    /// target has no connection.
    pub fn set_offset(&self, target: &str, x: f32, y: f32, z: f32) {
        if let Some(conn) = self.connections.lock().unwrap().get_mut(target) {
            conn.offset = CalibrationOffset::new(x, y, z);
        }
    }

    /// A point-in-time copy of every connection, sorted by target name so
    /// iteration order is deterministic.
    pub fn snapshot(&self) -> Vec<ConnectionView> {
        let connections = self.connections.lock().unwrap();
        let mut views: Vec<ConnectionView> =
            connections.values().map(DeviceConnection::view).collect();
        views.sort_by(|a, b| a.target.cmp(&b.target));
        views
    }

    /// The view for one target, if it has a connection.
    pub fn view(&self, target: &str) -> Option<ConnectionView> {
        self.connections
            .lock()
            .unwrap()
            .get(target)
            .map(DeviceConnection::view)
    }

    /// Playback path: overwrites samples for targets that already have a
    /// connection and synthesizes transient `Connected` entries for the
    /// rest, so the rendering layer consumes recorded and live data
    /// uniformly. The recorded data is already structured, so this bypasses
    /// the wire parser.
    pub fn apply_frame(&self, frame: &RecordedFrame) {
        let mut connections = self.connections.lock().unwrap();
        for (target, components) in frame.poses() {
            let sample = OrientationSample::from_components(*components);
            match connections.get_mut(target) {
                Some(conn) => conn.sample = sample,
                None => {
                    let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
                    debug!("synthesizing playback connection for {}", target);
                    connections
                        .insert(target.clone(), DeviceConnection::synthetic(id, target, sample));
                }
            }
        }
    }

    // --- transport worker -------------------------------------------------

    /// Body of the per-connection worker thread: dial, then pump messages
    /// until the link goes away.
    fn run_link(&self, id: ConnectionId, target: &str, endpoint: &Endpoint) {
        match self.dialer.dial(endpoint, CONNECT_TIMEOUT) {
            Ok((stream, handle)) => {
                if self.finish_handshake(id, target, handle) {
                    self.pump_messages(id, target, stream);
                }
            }
            Err(err) => self.fail_handshake(id, target, err),
        }
    }

    /// Returns false when the attempt was superseded while the dial was in
    /// flight; the fresh transport is closed and no event fires.
    fn finish_handshake(
        &self,
        id: ConnectionId,
        target: &str,
        handle: Box<dyn TransportHandle>,
    ) -> bool {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(target) {
            Some(conn) if conn.id == id && conn.status == ConnectionStatus::Connecting => {
                conn.status = ConnectionStatus::Connected;
                conn.link = Link::Live(handle);
                drop(connections);
                info!("{} connected", target);
                self.notifier.emit(RelayEvent::Connected {
                    target: target.to_owned(),
                });
                true
            }
            _ => {
                // Stale success, e.g. a manual disconnect won the race.
                handle.close();
                false
            }
        }
    }

    fn fail_handshake(&self, id: ConnectionId, target: &str, err: DialError) {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(target) {
            Some(conn) if conn.id == id && conn.status == ConnectionStatus::Connecting => {
                conn.status = ConnectionStatus::Error;
                conn.close_link();
                drop(connections);
                warn!("{}: {}", target, err);
                self.notifier.emit(RelayEvent::ConnectionFailed {
                    target: target.to_owned(),
                    reason: err.to_string(),
                });
            }
            _ => {}
        }
    }

    fn pump_messages(&self, id: ConnectionId, target: &str, mut stream: Box<dyn MessageStream>) {
        loop {
            match stream.next_line() {
                Ok(Some(line)) => {
                    if !self.ingest(id, target, &line) {
                        return;
                    }
                }
                Ok(None) => {
                    self.link_closed(id, target);
                    return;
                }
                Err(err) => {
                    self.link_failed(id, target, err);
                    return;
                }
            }
        }
    }

    /// Applies one inbound payload. A malformed payload is dropped and the
    /// previous sample retained. Returns false once this attempt no longer
    /// owns the registry entry.
    fn ingest(&self, id: ConnectionId, target: &str, line: &str) -> bool {
        let payload = match crate::wire::SensorPayload::from_str(line) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("{}: dropping malformed payload: {}", target, err);
                return true;
            }
        };
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(target) {
            Some(conn) if conn.id == id && conn.status == ConnectionStatus::Connected => {
                conn.sample = payload.rotation();
                true
            }
            _ => false,
        }
    }

    /// Remote-initiated close. Only a link that was healthy warrants a
    /// warning; a manual disconnect already set the status, so its close
    /// stays silent here.
    fn link_closed(&self, id: ConnectionId, target: &str) {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(target) {
            Some(conn) if conn.id == id && conn.status == ConnectionStatus::Connected => {
                conn.status = ConnectionStatus::Disconnected;
                conn.close_link();
                drop(connections);
                info!("{} disconnected by remote", target);
                self.notifier.emit(RelayEvent::Disconnected {
                    target: target.to_owned(),
                });
            }
            _ => {}
        }
    }

    fn link_failed(&self, id: ConnectionId, target: &str, err: io::Error) {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(target) {
            Some(conn)
                if conn.id == id
                    && matches!(
                        conn.status,
                        ConnectionStatus::Connecting | ConnectionStatus::Connected
                    ) =>
            {
                conn.status = ConnectionStatus::Error;
                conn.close_link();
                drop(connections);
                warn!("{}: transport error: {}", target, err);
                self.notifier.emit(RelayEvent::ConnectionFailed {
                    target: target.to_owned(),
                    reason: err.to_string(),
                });
            }
            _ => {}
        }
    }
}
