//! # Network Module
//!
//! This module provides the network parameters and socket helpers used to carry detection
//! records between the remote detector and the car. Records travel as single UDP datagrams, there
//! is no connection state and no delivery guarantee.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum UDP datagram size we'll receive.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Default local endpoint the detection receiver binds to.
pub const DEFAULT_DET_ENDPOINT: &str = "127.0.0.1:5005";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, usually loaded from `net.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetParams {
    /// Local endpoint on which detection datagrams are received, for example `127.0.0.1:5005`.
    pub det_endpoint: String,

    /// Maximum number of datagrams processed by a single drain.
    pub det_max_drain: usize,

    /// Period between drains when receiving on a background thread.
    ///
    /// Units: seconds
    pub det_bg_poll_period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not resolve the endpoint \"{0}\"")]
    InvalidEndpoint(String),

    #[error("Could not bind the socket to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    #[error("Could not make the socket non-blocking: {0}")]
    NonBlockingError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NetParams {
    fn default() -> Self {
        Self {
            det_endpoint: String::from(DEFAULT_DET_ENDPOINT),
            det_max_drain: 50,
            det_bg_poll_period_s: 0.005,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Resolve an endpoint string into a single socket address.
pub fn resolve(endpoint: &str) -> Result<SocketAddr, NetError> {
    endpoint
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| NetError::InvalidEndpoint(String::from(endpoint)))
}

/// Bind a UDP socket to the given endpoint and put it into non-blocking mode.
///
/// Reads on the returned socket fail with `WouldBlock` instead of waiting when no datagram is
/// queued.
pub fn bind_nonblocking(endpoint: &str) -> Result<UdpSocket, NetError> {
    let addr = resolve(endpoint)?;

    let socket = UdpSocket::bind(addr).map_err(|e| NetError::BindError(addr, e))?;
    socket
        .set_nonblocking(true)
        .map_err(NetError::NonBlockingError)?;

    Ok(socket)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_bind_nonblocking() {
        let socket = bind_nonblocking("127.0.0.1:0").unwrap();
        let mut buf = [0u8; 16];

        match socket.recv_from(&mut buf) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::WouldBlock),
            Ok(_) => panic!("Expected no data on a fresh socket"),
        }
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            bind_nonblocking("not an endpoint"),
            Err(NetError::InvalidEndpoint(_))
        ));
    }
}
