//! Configuration keys understood by the connector, with their defaults.

/// Comma-separated control-plane endpoints, e.g. `tcp://meta-1:3334,tcp://meta-2:3334`.
pub const SYSTEMS: &str = "fs.ofs.systems";
/// Numeric file-system id sent with every layout query.
pub const FS_ID: &str = "fs.ofs.fs_id";

/// Timeout of one control-plane call, in seconds.
pub const RPC_TIMEOUT: &str = "fs.ofs.rpc.timeout";
pub const RETRY_INIT_WAIT: &str = "fs.ofs.retry.init_wait";
pub const RETRY_MAX_WAIT: &str = "fs.ofs.retry.max_wait";
pub const RETRY_TOTAL_TIME: &str = "fs.ofs.retry.total_time";
pub const RETRY_MAX_ATTEMPTS: &str = "fs.ofs.retry.max_attempts";
/// Consecutive server errors before an endpoint is error-listed.
pub const RETRY_FAILOVER_AFTER: &str = "fs.ofs.retry.failover_after";
/// `round_robin`, `uniform_random` or `sticky`.
pub const SERVER_SELECTION: &str = "fs.ofs.server.selection";
/// Seconds a server routing table is trusted before it is reloaded; `0`
/// reloads it for every query.
pub const ROUTING_TTL: &str = "fs.ofs.routing.ttl";

/// Rack reported for hosts with no explicit mapping.
pub const TOPOLOGY_DEFAULT_RACK: &str = "fs.ofs.topology.default.rack";
/// Prefix of per-host rack keys: `fs.ofs.topology.rack.<host> = /rack1`.
pub const TOPOLOGY_RACK_PREFIX: &str = "fs.ofs.topology.rack.";

pub const DEFAULT_FS_ID: u32 = 0;
pub const DEFAULT_RPC_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_RETRY_INIT_WAIT_SECS: f64 = 0.1;
pub const DEFAULT_RETRY_MAX_WAIT_SECS: f64 = 1.0;
pub const DEFAULT_RETRY_TOTAL_TIME_SECS: f64 = 30.0;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_FAILOVER_AFTER: u32 = 1;
pub const DEFAULT_SERVER_SELECTION: &str = "sticky";
pub const DEFAULT_ROUTING_TTL_SECS: f64 = 60.0;
pub const DEFAULT_RACK: &str = "/default-rack";

/// Per-host rack key for `host`.
pub fn rack_key(host: &str) -> String {
    format!("{}{}", TOPOLOGY_RACK_PREFIX, host)
}
