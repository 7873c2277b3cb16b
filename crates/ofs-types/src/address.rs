use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Default port an OrangeFS server listens on.
pub const DEFAULT_SERVER_PORT: u16 = 3334;

/// BMI transport method named in a server address.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum BmiProtocol {
    Tcp = 0,
    Ib = 1,
    Portals = 2,
}

impl BmiProtocol {
    /// Scheme string used in the textual address form.
    pub fn scheme(&self) -> &'static str {
        match self {
            BmiProtocol::Tcp => "tcp",
            BmiProtocol::Ib => "ib",
            BmiProtocol::Portals => "portals",
        }
    }
}

impl fmt::Display for BmiProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Server address in BMI form, e.g. `tcp://storage-03:3334`.
///
/// Hosts are kept as names rather than resolved IPs: schedulers match
/// block locations against their own host names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BmiAddress {
    pub protocol: BmiProtocol,
    pub host: String,
    pub port: u16,
}

impl BmiAddress {
    /// Create a new address.
    pub fn new(protocol: BmiProtocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    /// Shorthand for a TCP address.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(BmiProtocol::Tcp, host, port)
    }

    /// `host:port`, the form used for block location names.
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for BmiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for BmiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl FromStr for BmiAddress {
    type Err = AddressParseError;

    /// Parse `"tcp://host:3334"`. A bare `"host:port"` or `"host"` is taken
    /// as TCP, the latter on the default server port.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (protocol, rest) = match s.split_once("://") {
            Some((scheme, rest)) => {
                let protocol = match scheme.to_ascii_lowercase().as_str() {
                    "tcp" => BmiProtocol::Tcp,
                    "ib" => BmiProtocol::Ib,
                    "portals" => BmiProtocol::Portals,
                    // Hadoop-style URIs name the filesystem, not the transport.
                    "ofs" => BmiProtocol::Tcp,
                    _ => return Err(AddressParseError::UnknownProtocol(scheme.to_string())),
                };
                (protocol, rest)
            }
            None => (BmiProtocol::Tcp, s),
        };

        let rest = rest.split('/').next().unwrap_or_default();
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse()
                    .map_err(|_| AddressParseError::InvalidPort(port_str.to_string()))?;
                (host, port)
            }
            None => (rest, DEFAULT_SERVER_PORT),
        };

        if host.is_empty() {
            return Err(AddressParseError::MissingHost);
        }
        Ok(BmiAddress::new(protocol, host, port))
    }
}

impl TryFrom<String> for BmiAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BmiAddress> for String {
    fn from(addr: BmiAddress) -> Self {
        addr.to_string()
    }
}

/// Errors when parsing a `BmiAddress` from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("unknown BMI protocol: {0}")]
    UnknownProtocol(String),
    #[error("missing host")]
    MissingHost,
    #[error("invalid port number: {0}")]
    InvalidPort(String),
}
