//! Layout and server-list query types.

use ofs_types::{BmiAddress, FsId, Handle, ServerId, Status};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// One datafile of a striped file: its handle and the servers holding it,
/// primary first, mirrors after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatafileRef {
    pub handle: Handle,
    pub servers: Vec<ServerId>,
}

/// A raw stripe record as a server reports it. No ordering or disjointness
/// is promised; the client normalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeRecord {
    pub offset: u64,
    pub length: u64,
    #[serde(default)]
    pub servers: Vec<ServerId>,
}

/// How a file's bytes are placed on servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// Round-robin striping: strip `i` lives on `datafiles[i % datafiles.len()]`.
    SimpleStripe {
        strip_size: u64,
        datafiles: Vec<DatafileRef>,
    },
    /// An explicit list of stripes.
    Explicit { stripes: Vec<StripeRecord> },
}

impl Layout {
    /// Every server id the layout mentions, in first-seen order.
    pub fn server_ids(&self) -> Vec<ServerId> {
        let mut seen = Vec::new();
        let lists: Vec<&[ServerId]> = match self {
            Layout::SimpleStripe { datafiles, .. } => {
                datafiles.iter().map(|d| d.servers.as_slice()).collect()
            }
            Layout::Explicit { stripes } => stripes.iter().map(|s| s.servers.as_slice()).collect(),
        };
        for id in lists.into_iter().flatten() {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLayoutReq {
    pub fs_id: FsId,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLayoutRsp {
    pub handle: Handle,
    pub file_size: u64,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListServersReq {
    pub fs_id: FsId,
}

/// A storage server known to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDesc {
    pub server_id: ServerId,
    pub address: BmiAddress,
    /// Alias from the server config; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Rack path, when the control plane knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListServersRsp {
    pub servers: Vec<ServerDesc>,
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MetaRequest {
    GetLayout(GetLayoutReq),
    ListServers(ListServersReq),
}

impl MetaRequest {
    pub fn name(&self) -> &'static str {
        match self {
            MetaRequest::GetLayout(_) => "get_layout",
            MetaRequest::ListServers(_) => "list_servers",
        }
    }
}

/// Response envelope: either the payload or a `Status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireResult<T> {
    Ok(T),
    Err(Status),
}

impl<T> From<ofs_types::Result<T>> for WireResult<T> {
    fn from(r: ofs_types::Result<T>) -> Self {
        match r {
            Ok(v) => WireResult::Ok(v),
            Err(s) => WireResult::Err(s),
        }
    }
}

impl<T> From<WireResult<T>> for ofs_types::Result<T> {
    fn from(r: WireResult<T>) -> Self {
        match r {
            WireResult::Ok(v) => Ok(v),
            WireResult::Err(s) => Err(s),
        }
    }
}
