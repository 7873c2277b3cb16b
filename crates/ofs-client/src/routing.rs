//! Server routing table: maps the server ids named in layouts to hosts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use ofs_proto::ServerDesc;
use ofs_types::{BmiAddress, ServerId};
use parking_lot::RwLock;
use tokio::time::Instant;

/// Information about a single storage server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub server_id: ServerId,
    pub address: BmiAddress,
    /// Rack path, after configured overrides are applied.
    pub rack: Option<String>,
}

impl ServerInfo {
    /// Build from a control-plane description; an override keyed by host
    /// name replaces the reported rack.
    pub fn from_desc(desc: ServerDesc, rack_overrides: &BTreeMap<String, String>) -> Self {
        let rack = rack_overrides
            .get(&desc.address.host)
            .cloned()
            .or(desc.rack);
        Self {
            server_id: desc.server_id,
            address: desc.address,
            rack,
        }
    }
}

/// Immutable snapshot of the routing table.
///
/// Readers hold an `Arc<RoutingInfo>`; a refresh installs a new snapshot
/// without disturbing in-flight resolutions.
#[derive(Debug, Clone)]
pub struct RoutingInfo {
    pub servers: HashMap<ServerId, ServerInfo>,
    /// When this snapshot was built. Tokio's clock, so paused-time tests
    /// can age it.
    pub last_refresh: Instant,
}

impl RoutingInfo {
    /// Create an empty routing info (no servers known).
    pub fn empty() -> Self {
        Self {
            servers: HashMap::new(),
            last_refresh: Instant::now(),
        }
    }

    pub fn from_servers(servers: impl IntoIterator<Item = ServerInfo>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.server_id, s)).collect(),
            last_refresh: Instant::now(),
        }
    }

    /// Whether the snapshot is at least `ttl` old.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_refresh.elapsed() >= ttl
    }

    pub fn get_server(&self, id: ServerId) -> Option<&ServerInfo> {
        self.servers.get(&id)
    }

    /// Ids from `ids` that this snapshot cannot resolve.
    pub fn missing<'a>(&self, ids: impl IntoIterator<Item = &'a ServerId>) -> Vec<ServerId> {
        ids.into_iter()
            .filter(|id| !self.servers.contains_key(id))
            .copied()
            .collect()
    }
}

/// Thread-safe handle to the current routing info.
#[derive(Debug, Clone)]
pub struct RoutingInfoHandle {
    inner: Arc<RwLock<Arc<RoutingInfo>>>,
}

impl RoutingInfoHandle {
    /// Create a handle with empty routing info.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(RoutingInfo::empty()))),
        }
    }

    /// Get a snapshot of the current routing info.
    pub fn get(&self) -> Arc<RoutingInfo> {
        Arc::clone(&*self.inner.read())
    }

    /// Replace the current routing info with a new snapshot.
    pub fn update(&self, info: RoutingInfo) {
        *self.inner.write() = Arc::new(info);
    }
}

impl Default for RoutingInfoHandle {
    fn default() -> Self {
        Self::new()
    }
}
