//! Client configuration types.
//!
//! Built from an injected [`Configuration`]; nothing is read from global
//! state.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use ofs_config::{keys, Configuration};
use ofs_types::{BmiAddress, FsId};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

// ---------------------------------------------------------------------------
// Retry configuration
// ---------------------------------------------------------------------------

/// Retry configuration for control-plane calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Timeout for a single RPC call.
    #[serde(with = "secs_f64")]
    pub rpc_timeout: Duration,

    /// Initial wait time before the first retry.
    #[serde(with = "secs_f64")]
    pub retry_init_wait: Duration,

    /// Maximum wait time between retries (exponential back-off cap).
    #[serde(with = "secs_f64")]
    pub retry_max_wait: Duration,

    /// Total time budget for retries before giving up.
    #[serde(with = "secs_f64")]
    pub retry_total_time: Duration,

    /// Upper bound on the number of tries, the first one included.
    pub max_attempts: u32,

    /// Number of consecutive failures before switching to a different server.
    pub max_failures_before_failover: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs_f64(keys::DEFAULT_RPC_TIMEOUT_SECS),
            retry_init_wait: Duration::from_secs_f64(keys::DEFAULT_RETRY_INIT_WAIT_SECS),
            retry_max_wait: Duration::from_secs_f64(keys::DEFAULT_RETRY_MAX_WAIT_SECS),
            retry_total_time: Duration::from_secs_f64(keys::DEFAULT_RETRY_TOTAL_TIME_SECS),
            max_attempts: keys::DEFAULT_RETRY_MAX_ATTEMPTS,
            max_failures_before_failover: keys::DEFAULT_RETRY_FAILOVER_AFTER,
        }
    }
}

impl RetryConfig {
    pub fn from_configuration(conf: &Configuration) -> ClientResult<Self> {
        let cfg = Self {
            rpc_timeout: conf.get_duration(keys::RPC_TIMEOUT, keys::DEFAULT_RPC_TIMEOUT_SECS)?,
            retry_init_wait: conf
                .get_duration(keys::RETRY_INIT_WAIT, keys::DEFAULT_RETRY_INIT_WAIT_SECS)?,
            retry_max_wait: conf
                .get_duration(keys::RETRY_MAX_WAIT, keys::DEFAULT_RETRY_MAX_WAIT_SECS)?,
            retry_total_time: conf
                .get_duration(keys::RETRY_TOTAL_TIME, keys::DEFAULT_RETRY_TOTAL_TIME_SECS)?,
            max_attempts: conf
                .get_u32(keys::RETRY_MAX_ATTEMPTS, keys::DEFAULT_RETRY_MAX_ATTEMPTS)?,
            max_failures_before_failover: conf
                .get_u32(keys::RETRY_FAILOVER_AFTER, keys::DEFAULT_RETRY_FAILOVER_AFTER)?,
        };
        if cfg.max_attempts == 0 {
            return Err(ClientError::Config(format!(
                "{} must be at least 1",
                keys::RETRY_MAX_ATTEMPTS
            )));
        }
        if cfg.rpc_timeout.is_zero() {
            return Err(ClientError::Config(format!("{} must be positive", keys::RPC_TIMEOUT)));
        }
        Ok(cfg)
    }
}

// ---------------------------------------------------------------------------
// Server selection mode
// ---------------------------------------------------------------------------

/// Strategy for choosing which control-plane endpoint receives a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerSelectionMode {
    /// Round-robin across endpoints.
    RoundRobin,
    /// Uniform random selection.
    UniformRandom,
    /// Stay on the first healthy endpoint until it fails.
    #[default]
    Sticky,
}

impl FromStr for ServerSelectionMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round_robin" => Ok(Self::RoundRobin),
            "uniform_random" => Ok(Self::UniformRandom),
            "sticky" => Ok(Self::Sticky),
            other => Err(ClientError::Config(format!(
                "unknown {}: {}",
                keys::SERVER_SELECTION,
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Meta client config
// ---------------------------------------------------------------------------

/// Configuration for the metadata client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaClientConfig {
    /// Control-plane endpoints, in configured order.
    pub endpoints: Vec<BmiAddress>,

    /// File system id sent with each query.
    pub fs_id: FsId,

    /// Server selection strategy.
    pub selection_mode: ServerSelectionMode,

    /// Host name to rack path overrides; these win over racks reported by
    /// the control plane.
    pub rack_overrides: BTreeMap<String, String>,

    /// Age after which the server routing table is reloaded. Until then a
    /// server that moved is still reported at its old address.
    #[serde(with = "secs_f64")]
    pub routing_ttl: Duration,

    pub retry: RetryConfig,
}

impl Default for MetaClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            fs_id: FsId(keys::DEFAULT_FS_ID),
            selection_mode: ServerSelectionMode::default(),
            rack_overrides: BTreeMap::new(),
            routing_ttl: Duration::from_secs_f64(keys::DEFAULT_ROUTING_TTL_SECS),
            retry: RetryConfig::default(),
        }
    }
}

impl MetaClientConfig {
    /// Build from configuration. `fs.ofs.systems` is required.
    pub fn from_configuration(conf: &Configuration) -> ClientResult<Self> {
        conf.require(keys::SYSTEMS)?;
        let endpoints = conf
            .get_list(keys::SYSTEMS)
            .iter()
            .map(|s| {
                s.parse::<BmiAddress>().map_err(|e| {
                    ClientError::Config(format!("bad endpoint {:?} in {}: {}", s, keys::SYSTEMS, e))
                })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let rack_overrides = conf
            .with_prefix(keys::TOPOLOGY_RACK_PREFIX)
            .map(|(host, rack)| (host.to_string(), rack.trim().to_string()))
            .collect();

        Ok(Self {
            endpoints,
            fs_id: FsId(conf.get_u32(keys::FS_ID, keys::DEFAULT_FS_ID)?),
            selection_mode: conf
                .get_str_or(keys::SERVER_SELECTION, keys::DEFAULT_SERVER_SELECTION)
                .parse()?,
            rack_overrides,
            routing_ttl: conf.get_duration(keys::ROUTING_TTL, keys::DEFAULT_ROUTING_TTL_SECS)?,
            retry: RetryConfig::from_configuration(conf)?,
        })
    }

    /// The defaults written back as configuration entries.
    pub fn default_configuration() -> Configuration {
        let d = RetryConfig::default();
        let ttl = Duration::from_secs_f64(keys::DEFAULT_ROUTING_TTL_SECS);
        let mut conf = Configuration::new();
        conf.set(keys::SYSTEMS, "tcp://localhost:3334")
            .set(keys::FS_ID, keys::DEFAULT_FS_ID.to_string())
            .set(keys::SERVER_SELECTION, keys::DEFAULT_SERVER_SELECTION)
            .set(keys::ROUTING_TTL, ttl.as_secs_f64().to_string())
            .set(keys::RPC_TIMEOUT, d.rpc_timeout.as_secs_f64().to_string())
            .set(keys::RETRY_INIT_WAIT, d.retry_init_wait.as_secs_f64().to_string())
            .set(keys::RETRY_MAX_WAIT, d.retry_max_wait.as_secs_f64().to_string())
            .set(keys::RETRY_TOTAL_TIME, d.retry_total_time.as_secs_f64().to_string())
            .set(keys::RETRY_MAX_ATTEMPTS, d.max_attempts.to_string())
            .set(keys::RETRY_FAILOVER_AFTER, d.max_failures_before_failover.to_string())
            .set(keys::TOPOLOGY_DEFAULT_RACK, keys::DEFAULT_RACK);
        conf
    }
}

/// Serde helper: durations as floating-point seconds.
mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
