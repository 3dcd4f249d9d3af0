//! Loopback port helpers shared by CLI/runtime consumers.

use std::net::{IpAddr, TcpListener};

/// Returns `true` when `port` can be bound on `host`.
///
/// A `false` result on the helper port usually means a helper is already listening.
pub fn port_available(host: IpAddr, port: u16) -> bool {
	TcpListener::bind((host, port)).is_ok()
}
