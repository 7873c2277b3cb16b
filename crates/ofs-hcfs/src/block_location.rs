//! The externally visible block-location record and its formatter.

use std::fmt;

use ofs_client::StorageNode;
use ofs_config::{keys, Configuration};
use serde::{Deserialize, Serialize};

use crate::resolver::ClippedExtent;

/// Which hosts hold one contiguous piece of the requested range.
///
/// `hosts`, `names` and `topology_paths` are parallel and keep the storage
/// system's replica order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    /// Host names.
    pub hosts: Vec<String>,
    /// `host:port` for each host.
    pub names: Vec<String>,
    /// `rack/host:port` for each host.
    pub topology_paths: Vec<String>,
    pub offset: u64,
    pub length: u64,
    /// Always false; OrangeFS does not report corrupt replicas here.
    #[serde(default)]
    pub corrupt: bool,
}

impl BlockLocation {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.offset, self.length)?;
        if self.corrupt {
            write!(f, "(corrupt)")?;
        }
        for host in &self.hosts {
            write!(f, ",{}", host)?;
        }
        Ok(())
    }
}

/// Turns clipped extents into [`BlockLocation`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFormatter {
    default_rack: String,
}

impl Default for LocationFormatter {
    fn default() -> Self {
        Self::new(keys::DEFAULT_RACK)
    }
}

impl LocationFormatter {
    pub fn new(default_rack: impl AsRef<str>) -> Self {
        Self {
            default_rack: normalize_rack(default_rack.as_ref()),
        }
    }

    pub fn from_configuration(conf: &Configuration) -> Self {
        Self::new(conf.get_str_or(keys::TOPOLOGY_DEFAULT_RACK, keys::DEFAULT_RACK))
    }

    pub fn default_rack(&self) -> &str {
        &self.default_rack
    }

    /// One location per clipped extent, in input order.
    pub fn format(&self, clipped: &[ClippedExtent]) -> Vec<BlockLocation> {
        clipped.iter().map(|c| self.format_one(c)).collect()
    }

    fn format_one(&self, c: &ClippedExtent) -> BlockLocation {
        let hosts = &c.extent.hosts;
        BlockLocation {
            hosts: hosts.iter().map(|h| h.host.clone()).collect(),
            names: hosts.iter().map(StorageNode::name).collect(),
            topology_paths: hosts.iter().map(|h| self.topology_path(h)).collect(),
            offset: c.offset,
            length: c.length,
            corrupt: false,
        }
    }

    fn topology_path(&self, node: &StorageNode) -> String {
        let rack = match &node.rack {
            Some(r) => normalize_rack(r),
            None => self.default_rack.clone(),
        };
        if rack == "/" {
            format!("/{}", node.name())
        } else {
            format!("{}/{}", rack, node.name())
        }
    }
}

/// Leading slash, no trailing slash; an empty rack is the root.
fn normalize_rack(rack: &str) -> String {
    let trimmed = rack.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
