//! DNS resolve overrides.

use std::fmt;
use std::net::IpAddr;

/// Pins `host:port` to a fixed address for the duration of a transaction,
/// bypassing name resolution.
///
/// The [`Display`](fmt::Display) form is the `host:port:addr` entry understood
/// by the transport's resolve option. IPv6 addresses are bracketed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveHost {
    host: String,
    port: u16,
    addr: IpAddr,
}

impl ResolveHost {
    pub fn new(host: impl Into<String>, port: u16, addr: IpAddr) -> Self {
        Self { host: host.into(), port, addr }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }
}

impl fmt::Display for ResolveHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(v4) => write!(f, "{}:{}:{}", self.host, self.port, v4),
            IpAddr::V6(v6) => write!(f, "{}:{}:[{}]", self.host, self.port, v6),
        }
    }
}
