//! Which end of the TCP session this process plays.

use std::fmt;

/// Transport role, with the `host:port` address it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRole {
    /// Dial the address, retrying until it answers
    Connect(String),
    /// Bind the address and accept one peer
    Listen(String),
}

impl RemoteRole {
    /// Join a host and port into an address
    #[must_use]
    pub fn address_of(host: &str, port: u16) -> String {
        if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        }
    }

    /// Address this role applies to
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Connect(addr) | Self::Listen(addr) => addr,
        }
    }

    /// Whether this is the listening role
    #[must_use]
    pub const fn is_listen(&self) -> bool {
        matches!(self, Self::Listen(_))
    }
}

impl fmt::Display for RemoteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(addr) => write!(f, "connect to {addr}"),
            Self::Listen(addr) => write!(f, "listen on {addr}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_of() {
        assert_eq!(RemoteRole::address_of("localhost", 20000), "localhost:20000");
        assert_eq!(RemoteRole::address_of("::1", 9), "[::1]:9");
        assert_eq!(RemoteRole::address_of("[::1]", 9), "[::1]:9");
    }

    #[test]
    fn test_role_display() {
        let role = RemoteRole::Listen("0.0.0.0:20000".into());
        assert!(role.is_listen());
        assert_eq!(role.address(), "0.0.0.0:20000");
        assert_eq!(role.to_string(), "listen on 0.0.0.0:20000");
    }
}
