//! Endpoint normalization and validation for the `connect` command.
//!
//! Users type addresses as bare `host:port`; we fill in a `tcp://` scheme
//! when none is given so the rest of the crate only ever sees a full URI.
//! Obviously malformed input is rejected here, before any connection state
//! is created.

use std::fmt;

/// Shortest raw address we will even attempt to dial. Anything below this
/// cannot plausibly name a host and a port.
pub const MIN_ENDPOINT_LEN: usize = 9;

/// A validated network address for one sensor device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: String,
    authority: String,
}

/// Validation failures for user-supplied endpoint strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The input is too short to name a reachable device.
    TooShort(String),
    /// The input has no `host:port` separator.
    MissingPort(String),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EndpointError::TooShort(raw) => write!(f, "endpoint '{}' is too short", raw),
            EndpointError::MissingPort(raw) => write!(f, "endpoint '{}' has no port", raw),
        }
    }
}

impl std::error::Error for EndpointError {}

impl Endpoint {
    /// Normalizes and validates a raw address. A bare `host:port` gains a
    /// `tcp://` scheme; an input that is too short or missing its port is
    /// rejected without side effects.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let trimmed = raw.trim();
        // The length check applies to what the user typed, before the
        // scheme pads it out.
        if trimmed.len() < MIN_ENDPOINT_LEN {
            return Err(EndpointError::TooShort(raw.to_owned()));
        }

        let uri = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("tcp://{}", trimmed)
        };

        let authority = match uri.split_once("://") {
            Some((_scheme, rest)) => rest.to_owned(),
            None => uri.clone(),
        };
        if !authority.contains(':') {
            return Err(EndpointError::MissingPort(raw.to_owned()));
        }

        Ok(Endpoint { uri, authority })
    }

    /// The full URI, scheme included.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The `host:port` part handed to the dialer.
    pub fn authority(&self) -> &str {
        &self.authority
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_gains_scheme() {
        let ep = Endpoint::parse("192.168.0.42:8080").unwrap();
        assert_eq!(ep.uri(), "tcp://192.168.0.42:8080");
        assert_eq!(ep.authority(), "192.168.0.42:8080");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let ep = Endpoint::parse("tcp://sensor.local:4210").unwrap();
        assert_eq!(ep.uri(), "tcp://sensor.local:4210");
        assert_eq!(ep.authority(), "sensor.local:4210");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let ep = Endpoint::parse("  10.0.0.7:4210 ").unwrap();
        assert_eq!(ep.authority(), "10.0.0.7:4210");
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(matches!(
            Endpoint::parse("a:1"),
            Err(EndpointError::TooShort(_))
        ));
        assert!(matches!(
            Endpoint::parse(""),
            Err(EndpointError::TooShort(_))
        ));
    }

    #[test]
    fn scheme_prefix_does_not_rescue_a_short_address() {
        // "a:1" would be 9 chars once "tcp://" is prepended; the threshold
        // has to apply to the typed address, not the padded URI.
        assert!(matches!(
            Endpoint::parse("1.2.3:45"),
            Err(EndpointError::TooShort(_))
        ));
        assert!(Endpoint::parse("1.2.3.4:1").is_ok());
    }

    #[test]
    fn missing_port_is_rejected() {
        assert!(matches!(
            Endpoint::parse("sensor.localdomain"),
            Err(EndpointError::MissingPort(_))
        ));
    }
}
