//! The transport seam between the registry and the network.
//!
//! The registry only ever talks to the [`Dialer`], [`MessageStream`], and
//! [`TransportHandle`] traits, so the connection state machine can be tested
//! against deterministic fakes. The production implementation is plain TCP
//! with newline-delimited text payloads.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// How long a handshake may stay pending before the connection errors out.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Why a dial attempt failed.
#[derive(Debug)]
pub enum DialError {
    /// The handshake did not complete within the deadline.
    Timeout,
    /// The remote (or the network) rejected the handshake.
    Refused(String),
    /// The endpoint's authority did not resolve to a dialable address.
    BadAddress(String),
}

impl fmt::Display for DialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DialError::Timeout => write!(f, "connection timeout"),
            DialError::Refused(reason) => write!(f, "connection failed: {}", reason),
            DialError::BadAddress(reason) => write!(f, "bad address: {}", reason),
        }
    }
}

impl std::error::Error for DialError {}

/// The inbound half of a transport. Blocks until a payload arrives, the
/// peer closes, or the link faults.
pub trait MessageStream: Send {
    /// `Ok(Some(line))` for a payload, `Ok(None)` for an orderly close,
    /// `Err` for a transport fault.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// The half of a transport the registry keeps. Closing it unblocks any
/// reader thread parked in [`MessageStream::next_line`].
pub trait TransportHandle: Send + Sync {
    /// Forcibly closes the transport. Idempotent.
    fn close(&self);
}

/// Opens transports toward sensor endpoints, bounding the handshake by the
/// given timeout.
pub trait Dialer: Send + Sync {
    /// Attempts the handshake, returning the two transport halves on
    /// success. Must not block longer than `timeout`.
    fn dial(
        &self,
        endpoint: &crate::endpoint::Endpoint,
        timeout: Duration,
    ) -> Result<(Box<dyn MessageStream>, Box<dyn TransportHandle>), DialError>;
}

/// Plain TCP with newline-delimited text payloads, the production dialer.
#[derive(Debug, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn dial(
        &self,
        endpoint: &crate::endpoint::Endpoint,
        timeout: Duration,
    ) -> Result<(Box<dyn MessageStream>, Box<dyn TransportHandle>), DialError> {
        let addr = endpoint
            .authority()
            .to_socket_addrs()
            .map_err(|e| DialError::BadAddress(e.to_string()))?
            .next()
            .ok_or_else(|| DialError::BadAddress("no resolvable address".to_owned()))?;

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => DialError::Timeout,
            _ => DialError::Refused(e.to_string()),
        })?;

        let handle = stream
            .try_clone()
            .map_err(|e| DialError::Refused(e.to_string()))?;

        Ok((
            Box::new(TcpMessageStream {
                inner: BufReader::new(stream),
            }),
            Box::new(TcpHandle { stream: handle }),
        ))
    }
}

struct TcpMessageStream {
    inner: BufReader<TcpStream>,
}

impl MessageStream for TcpMessageStream {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match self.inner.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            // A local shutdown() surfaces as one of these; treat it like a
            // close rather than a fault.
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

struct TcpHandle {
    stream: TcpStream,
}

impl TransportHandle for TcpHandle {
    fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn dials_and_reads_lines_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut client, _) = listener.accept().unwrap();
            client.write_all(b"1,0,0,0\n0.7,0,0,0.7\n").unwrap();
            // client drops here, closing the connection
        });

        let endpoint = Endpoint::parse(&addr.to_string()).unwrap();
        let (mut stream, _handle) = TcpDialer.dial(&endpoint, CONNECT_TIMEOUT).unwrap();

        assert_eq!(stream.next_line().unwrap(), Some("1,0,0,0\n".to_owned()));
        assert_eq!(
            stream.next_line().unwrap(),
            Some("0.7,0,0,0.7\n".to_owned())
        );
        assert_eq!(stream.next_line().unwrap(), None);

        server.join().unwrap();
    }

    #[test]
    fn refused_dial_is_an_error() {
        // Bind and immediately drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let endpoint = Endpoint::parse(&addr.to_string()).unwrap();
        assert!(TcpDialer.dial(&endpoint, CONNECT_TIMEOUT).is_err());
    }

    #[test]
    fn unresolvable_host_is_a_bad_address() {
        let endpoint = Endpoint::parse("no.such.host.invalid:4210").unwrap();
        assert!(matches!(
            TcpDialer.dial(&endpoint, CONNECT_TIMEOUT),
            Err(DialError::BadAddress(_)) | Err(DialError::Refused(_))
        ));
    }
}
