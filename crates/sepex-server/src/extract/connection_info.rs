//! Per-connection metadata made available to handlers and middleware.

use std::net::{IpAddr, SocketAddr};
use std::time::SystemTime;

use axum::extract::connect_info::Connected;

/// Connection-level metadata captured once per TCP accept and threaded
/// through `ConnectInfo` to every handler and middleware on that connection.
#[derive(Debug, Clone, Copy)]
pub struct AppConnectInfo {
    pub addr: SocketAddr,
    pub connected_at: SystemTime,
}

impl AppConnectInfo {
    pub fn client_ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn is_loopback(&self) -> bool {
        self.addr.ip().is_loopback()
    }

    pub fn connection_age(&self) -> std::time::Duration {
        self.connected_at.elapsed().unwrap_or_default()
    }
}

impl Connected<SocketAddr> for AppConnectInfo {
    fn connect_info(addr: SocketAddr) -> Self {
        Self {
            addr,
            connected_at: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_detected() {
        let info = AppConnectInfo::connect_info("127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert!(info.is_loopback());
    }
}
