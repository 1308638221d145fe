//! One managed link between a sensor device and the target it drives.

use std::fmt;

use crate::endpoint::Endpoint;
use crate::orientation::{CalibrationOffset, OrientationSample};
use crate::transport::TransportHandle;

/// Identity of one connection attempt. Reconnecting or replacing a target
/// mints a new id, which is how late transport notifications from a dead
/// attempt are told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Where a connection is in its lifecycle.
///
/// `Disconnected` and `Error` are terminal; recovery takes a fresh connect
/// command, there is no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Handshake in flight, bounded by the connect timeout.
    Connecting,
    /// Link is up and payloads update the sample.
    Connected,
    /// The link closed, remotely or via an explicit command.
    Disconnected,
    /// The handshake timed out or failed, or the live transport faulted.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// What backs a connection.
pub enum Link {
    /// Handshake still in flight, nothing to close yet.
    Pending,
    /// A real transport; the handle is owned exclusively here.
    Live(Box<dyn TransportHandle>),
    /// A playback-synthesized state holder with no transport at all.
    Synthetic,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Link::Pending => write!(f, "Pending"),
            Link::Live(_) => write!(f, "Live"),
            Link::Synthetic => write!(f, "Synthetic"),
        }
    }
}

/// One logical sensor-to-target binding: the latest sample, the calibration
/// offset, and the transport that feeds it. Owned by the registry; external
/// code only ever sees [`ConnectionView`] copies.
#[derive(Debug)]
pub struct DeviceConnection {
    pub(crate) id: ConnectionId,
    pub(crate) target: String,
    pub(crate) endpoint: Option<Endpoint>,
    pub(crate) status: ConnectionStatus,
    pub(crate) sample: OrientationSample,
    pub(crate) offset: CalibrationOffset,
    pub(crate) link: Link,
}

impl DeviceConnection {
    /// A freshly created live connection, handshake pending.
    pub(crate) fn connecting(id: ConnectionId, target: &str, endpoint: Endpoint) -> Self {
        DeviceConnection {
            id,
            target: target.to_owned(),
            endpoint: Some(endpoint),
            status: ConnectionStatus::Connecting,
            sample: OrientationSample::IDENTITY,
            offset: CalibrationOffset::default(),
            link: Link::Pending,
        }
    }

    /// A transient playback-backed connection, born `Connected` so the
    /// rendering layer consumes it like any live one.
    pub(crate) fn synthetic(id: ConnectionId, target: &str, sample: OrientationSample) -> Self {
        DeviceConnection {
            id,
            target: target.to_owned(),
            endpoint: None,
            status: ConnectionStatus::Connected,
            sample,
            offset: CalibrationOffset::default(),
            link: Link::Synthetic,
        }
    }

    /// True for entries synthesized by the player.
    pub fn is_synthetic(&self) -> bool {
        matches!(self.link, Link::Synthetic)
    }

    /// Closes the live transport if there is one. Pending and synthetic
    /// links have nothing to close.
    pub(crate) fn close_link(&mut self) {
        if let Link::Live(handle) = &self.link {
            handle.close();
        }
    }

    /// A point-in-time copy of the observable state.
    pub fn view(&self) -> ConnectionView {
        ConnectionView {
            id: self.id,
            target: self.target.clone(),
            endpoint: self.endpoint.as_ref().map(|e| e.uri().to_owned()),
            status: self.status,
            sample: self.sample,
            offset: self.offset,
            synthetic: self.is_synthetic(),
        }
    }
}

/// A snapshot of one connection's observable state. Holding a view never
/// blocks the registry, and mutating it changes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionView {
    /// Identity of the connection attempt this view was taken from.
    pub id: ConnectionId,
    /// The joint or bone this connection drives.
    pub target: String,
    /// Full endpoint URI, `None` for synthetic entries.
    pub endpoint: Option<String>,
    /// Lifecycle state at snapshot time.
    pub status: ConnectionStatus,
    /// Latest orientation sample.
    pub sample: OrientationSample,
    /// Current calibration offset.
    pub offset: CalibrationOffset,
    /// True when the entry is playback-synthesized.
    pub synthetic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_connections_are_born_connected() {
        let conn = DeviceConnection::synthetic(
            ConnectionId(7),
            "Head",
            OrientationSample::new(0.7, 0.0, 0.0, 0.7),
        );
        assert!(conn.is_synthetic());
        assert_eq!(conn.status, ConnectionStatus::Connected);
        assert_eq!(conn.view().endpoint, None);
    }

    #[test]
    fn view_reflects_live_connection() {
        let endpoint = Endpoint::parse("10.0.0.5:4210").unwrap();
        let conn = DeviceConnection::connecting(ConnectionId(1), "LeftArm", endpoint);
        let view = conn.view();
        assert_eq!(view.target, "LeftArm");
        assert_eq!(view.status, ConnectionStatus::Connecting);
        assert_eq!(view.endpoint.as_deref(), Some("tcp://10.0.0.5:4210"));
        assert!(!view.synthetic);
        assert_eq!(view.sample, OrientationSample::IDENTITY);
    }
}
