//! HEP listener configuration

use serde::Deserialize;

/// Default HEP capture port
const DEFAULT_PORT: u16 = 9060;

/// Default maximum packet size (64KB, the UDP ceiling)
const DEFAULT_MAX_PACKET_SIZE: usize = 65535;

/// Transport the listener binds
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListenProtocol {
    /// UDP datagrams only
    Udp,
    /// TCP streams only
    Tcp,
    /// Both transports on the same port (default)
    #[default]
    Both,
}

impl ListenProtocol {
    pub fn wants_udp(&self) -> bool {
        matches!(self, Self::Udp | Self::Both)
    }

    pub fn wants_tcp(&self) -> bool {
        matches!(self, Self::Tcp | Self::Both)
    }
}

/// HEP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port, shared by UDP and TCP
    pub port: u16,

    /// Which transports to accept
    pub protocol: ListenProtocol,

    /// Largest packet the listener accepts
    pub max_packet_size: usize,

    /// Number of UDP reader workers (SO_REUSEPORT sockets)
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            protocol: ListenProtocol::Both,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            workers: 1,
        }
    }
}

impl ServerConfig {
    /// Socket address string to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
