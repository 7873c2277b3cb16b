//! Control-plane stub trait, an in-memory implementation and a mock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ofs_proto::{GetLayoutReq, GetLayoutRsp, Layout, ListServersReq, ListServersRsp, ServerDesc};
use ofs_types::{make_error_msg, BmiAddress, FsId, Handle, MetaCode, Result, StatusCode};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Client-side stub for the control plane.
///
/// `server` is the endpoint the request is addressed to; implementations
/// that do not talk to the network may ignore it.
#[async_trait]
pub trait IMetaServiceStub: Send + Sync {
    async fn get_layout(&self, server: &BmiAddress, req: GetLayoutReq) -> Result<GetLayoutRsp>;
    async fn list_servers(&self, server: &BmiAddress, req: ListServersReq)
    -> Result<ListServersRsp>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// One file entry of a [`LayoutFixture`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureFile {
    pub path: String,
    pub handle: Handle,
    pub file_size: u64,
    pub layout: Layout,
}

/// A file system image in JSON: the server table plus file layouts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutFixture {
    #[serde(default)]
    pub fs_id: FsId,
    #[serde(default)]
    pub servers: Vec<ServerDesc>,
    #[serde(default)]
    pub files: Vec<FixtureFile>,
}

impl LayoutFixture {
    pub fn from_json(content: &str) -> ClientResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ClientError::Config(format!("invalid layout fixture: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read layout fixture {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

struct FileEntry {
    handle: Handle,
    file_size: u64,
    layout: Layout,
}

/// Serves layouts and the server table from memory.
///
/// Contents can be changed at any time; each query sees the state at the
/// moment it is served.
pub struct InMemoryMetaStub {
    fs_id: FsId,
    files: RwLock<HashMap<String, FileEntry>>,
    servers: RwLock<Vec<ServerDesc>>,
}

impl InMemoryMetaStub {
    pub fn new(fs_id: FsId) -> Self {
        Self {
            fs_id,
            files: RwLock::new(HashMap::new()),
            servers: RwLock::new(Vec::new()),
        }
    }

    pub fn from_fixture(fixture: LayoutFixture) -> Self {
        let stub = Self::new(fixture.fs_id);
        for server in fixture.servers {
            stub.add_server(server);
        }
        for f in fixture.files {
            stub.put_file(f.path, f.handle, f.file_size, f.layout);
        }
        stub
    }

    /// Add or replace a server by id.
    pub fn add_server(&self, desc: ServerDesc) {
        let mut servers = self.servers.write();
        match servers.iter_mut().find(|s| s.server_id == desc.server_id) {
            Some(existing) => *existing = desc,
            None => servers.push(desc),
        }
    }

    pub fn put_file(
        &self,
        path: impl Into<String>,
        handle: Handle,
        file_size: u64,
        layout: Layout,
    ) {
        self.files.write().insert(
            path.into(),
            FileEntry {
                handle,
                file_size,
                layout,
            },
        );
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    fn check_fs(&self, fs_id: FsId) -> Result<()> {
        if fs_id != self.fs_id {
            return make_error_msg(
                StatusCode::INVALID_ARG,
                format!("unknown file system {}", fs_id),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl IMetaServiceStub for InMemoryMetaStub {
    async fn get_layout(&self, _server: &BmiAddress, req: GetLayoutReq) -> Result<GetLayoutRsp> {
        self.check_fs(req.fs_id)?;
        let files = self.files.read();
        match files.get(&req.path) {
            Some(entry) => Ok(GetLayoutRsp {
                handle: entry.handle,
                file_size: entry.file_size,
                layout: entry.layout.clone(),
            }),
            None => make_error_msg(MetaCode::NOT_FOUND, req.path),
        }
    }

    async fn list_servers(
        &self,
        _server: &BmiAddress,
        req: ListServersReq,
    ) -> Result<ListServersRsp> {
        self.check_fs(req.fs_id)?;
        Ok(ListServersRsp {
            servers: self.servers.read().clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mock implementation
// ---------------------------------------------------------------------------

type Handler<Req, Rsp> = Box<dyn Fn(&BmiAddress, Req) -> Result<Rsp> + Send + Sync>;

/// A configurable mock for [`IMetaServiceStub`].
///
/// Each RPC can be overridden with a closure. Without a handler,
/// `get_layout` answers `NOT_FOUND` and `list_servers` an empty table.
/// Every call is counted, handled or not.
pub struct MockMetaServiceStub {
    pub get_layout_handler: Mutex<Option<Handler<GetLayoutReq, GetLayoutRsp>>>,
    pub list_servers_handler: Mutex<Option<Handler<ListServersReq, ListServersRsp>>>,
    get_layout_calls: AtomicUsize,
    list_servers_calls: AtomicUsize,
}

impl MockMetaServiceStub {
    pub fn new() -> Self {
        Self {
            get_layout_handler: Mutex::new(None),
            list_servers_handler: Mutex::new(None),
            get_layout_calls: AtomicUsize::new(0),
            list_servers_calls: AtomicUsize::new(0),
        }
    }

    /// Wrap in an `Arc` for convenient sharing.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn on_get_layout(
        &self,
        f: impl Fn(&BmiAddress, GetLayoutReq) -> Result<GetLayoutRsp> + Send + Sync + 'static,
    ) {
        *self.get_layout_handler.lock() = Some(Box::new(f));
    }

    pub fn on_list_servers(
        &self,
        f: impl Fn(&BmiAddress, ListServersReq) -> Result<ListServersRsp> + Send + Sync + 'static,
    ) {
        *self.list_servers_handler.lock() = Some(Box::new(f));
    }

    pub fn get_layout_calls(&self) -> usize {
        self.get_layout_calls.load(Ordering::SeqCst)
    }

    pub fn list_servers_calls(&self) -> usize {
        self.list_servers_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockMetaServiceStub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IMetaServiceStub for MockMetaServiceStub {
    async fn get_layout(&self, server: &BmiAddress, req: GetLayoutReq) -> Result<GetLayoutRsp> {
        self.get_layout_calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.get_layout_handler.lock();
        match guard.as_ref() {
            Some(f) => f(server, req),
            None => make_error_msg(MetaCode::NOT_FOUND, req.path),
        }
    }

    async fn list_servers(
        &self,
        server: &BmiAddress,
        req: ListServersReq,
    ) -> Result<ListServersRsp> {
        self.list_servers_calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.list_servers_handler.lock();
        match guard.as_ref() {
            Some(f) => f(server, req),
            None => Ok(ListServersRsp::default()),
        }
    }
}
