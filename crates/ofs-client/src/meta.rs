//! Metadata client.
//!
//! Fetches a file's layout from the control plane and turns it into an
//! extent map. Requests go to one of the configured endpoints chosen by the
//! `ServerSelectionMode`; transient failures are retried with exponential
//! back-off, and an endpoint that keeps failing is error-listed so the next
//! try goes elsewhere.

use std::collections::HashSet;
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ofs_config::Configuration;
use ofs_proto::{GetLayoutReq, ListServersReq};
use ofs_types::{is_rpc_code, BmiAddress, MetaCode, RPCCode, ServerId, Status};
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::config::{MetaClientConfig, ServerSelectionMode};
use crate::error::{ClientError, ClientResult};
use crate::layout::{build_file_metadata, FileMetadata};
use crate::retry::ExponentialBackoff;
use crate::routing::{RoutingInfo, RoutingInfoHandle, ServerInfo};
use crate::stub::IMetaServiceStub;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of file extent maps.
#[async_trait]
pub trait MetaClient: Send + Sync {
    /// Fetch the current extent map of `path`. Nothing is cached between
    /// calls except the server routing table, which is reloaded once it is
    /// older than `fs.ofs.routing.ttl` or names an unknown server.
    async fn get_extents(&self, path: &str) -> ClientResult<FileMetadata>;

    /// Fetch the extents of `path` overlapping `[offset, offset + length)`.
    /// The returned map covers the part of that range inside the file;
    /// a whole-file map is always a valid answer.
    async fn get_extents_in(
        &self,
        path: &str,
        _offset: u64,
        _length: u64,
    ) -> ClientResult<FileMetadata> {
        self.get_extents(path).await
    }

    /// Reload the server routing table from the control plane.
    async fn refresh_routing(&self) -> ClientResult<()>;
}

// ---------------------------------------------------------------------------
// Server selection
// ---------------------------------------------------------------------------

/// Selects a control-plane endpoint.
struct ServerSelector {
    mode: ServerSelectionMode,
    endpoints: Vec<BmiAddress>,
    round_robin_idx: AtomicUsize,
    err_nodes: RwLock<HashSet<BmiAddress>>,
}

impl ServerSelector {
    fn new(mode: ServerSelectionMode, endpoints: Vec<BmiAddress>) -> Self {
        Self {
            mode,
            endpoints,
            round_robin_idx: AtomicUsize::new(0),
            err_nodes: RwLock::new(HashSet::new()),
        }
    }

    /// Select an endpoint, skipping error-listed ones while any other is
    /// left.
    fn select(&self) -> ClientResult<BmiAddress> {
        if self.endpoints.is_empty() {
            return Err(ClientError::NoServerAvailable(
                "no control-plane endpoints configured".into(),
            ));
        }
        let err = self.err_nodes.read();
        let candidates: Vec<_> = self
            .endpoints
            .iter()
            .filter(|e| !err.contains(*e))
            .collect();

        if candidates.is_empty() {
            // Everything failed recently; start over with the full list.
            let all: Vec<_> = self.endpoints.iter().collect();
            return Ok(self.pick_from(&all));
        }
        Ok(self.pick_from(&candidates))
    }

    fn pick_from(&self, candidates: &[&BmiAddress]) -> BmiAddress {
        let picked = match self.mode {
            ServerSelectionMode::RoundRobin => {
                let idx = self.round_robin_idx.fetch_add(1, Ordering::Relaxed);
                candidates[idx % candidates.len()]
            }
            ServerSelectionMode::UniformRandom => {
                let mut rng = rand::thread_rng();
                candidates.choose(&mut rng).copied().unwrap_or(candidates[0])
            }
            // First healthy endpoint in configured order; moves on failover.
            ServerSelectionMode::Sticky => candidates[0],
        };
        picked.clone()
    }

    fn mark_error(&self, endpoint: &BmiAddress) {
        self.err_nodes.write().insert(endpoint.clone());
    }

    fn clear_error(&self, endpoint: &BmiAddress) {
        if self.err_nodes.read().contains(endpoint) {
            self.err_nodes.write().remove(endpoint);
        }
    }
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

/// Concrete implementation of [`MetaClient`].
pub struct MetaClientImpl {
    config: MetaClientConfig,
    selector: ServerSelector,
    stub: Arc<dyn IMetaServiceStub>,
    routing: RoutingInfoHandle,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl MetaClientImpl {
    pub fn new(config: MetaClientConfig, stub: Arc<dyn IMetaServiceStub>) -> Self {
        let selector = ServerSelector::new(config.selection_mode, config.endpoints.clone());
        Self {
            config,
            selector,
            stub,
            routing: RoutingInfoHandle::new(),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_configuration(
        conf: &Configuration,
        stub: Arc<dyn IMetaServiceStub>,
    ) -> ClientResult<Self> {
        Ok(Self::new(MetaClientConfig::from_configuration(conf)?, stub))
    }

    /// Execute an operation with retry logic.
    ///
    /// Each try selects an endpoint and runs `op` under the RPC timeout.
    /// Retryable statuses back off and try again; after
    /// `max_failures_before_failover` consecutive server errors the
    /// endpoint is error-listed. Any other status is returned as is.
    async fn with_retry<F, Fut, T>(&self, op_name: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut(BmiAddress) -> Fut,
        Fut: Future<Output = ofs_types::Result<T>>,
    {
        let retry_cfg = &self.config.retry;
        let mut backoff = ExponentialBackoff::from_config(retry_cfg);

        let mut current_server: Option<BmiAddress> = None;
        let mut consecutive_failures: u32 = 0;

        loop {
            let server = match &current_server {
                Some(s) => s.clone(),
                None => {
                    consecutive_failures = 0;
                    let s = self.selector.select()?;
                    current_server = Some(s.clone());
                    s
                }
            };

            let result = match tokio::time::timeout(retry_cfg.rpc_timeout, op(server.clone())).await
            {
                Ok(r) => r,
                Err(_) => Err(Status::with_message(
                    RPCCode::TIMEOUT,
                    format!("no reply within {:?}", retry_cfg.rpc_timeout),
                )),
            };

            let status = match result {
                Ok(val) => {
                    self.selector.clear_error(&server);
                    return Ok(val);
                }
                Err(status) => status,
            };

            let retryable = Self::is_retryable(&status);
            let is_server_error = Self::is_server_error(&status);
            if !retryable {
                return Err(ClientError::Status(status));
            }

            tracing::warn!(
                "{}: failed on {} (attempt {}): {} (server_err={})",
                op_name,
                server,
                backoff.attempts(),
                status,
                is_server_error,
            );

            if is_server_error {
                consecutive_failures += 1;
                if consecutive_failures >= retry_cfg.max_failures_before_failover {
                    tracing::warn!("{}: failing over from {}", op_name, server);
                    self.selector.mark_error(&server);
                    current_server = None;
                    backoff.reset_wait();
                }
            }

            let wait = if Self::is_fast_retryable(&status) {
                backoff.fast_wait()
            } else {
                backoff.next_wait()
            };

            match wait {
                Some(w) => tokio::time::sleep(w).await,
                None => {
                    return Err(ClientError::RetryExhausted {
                        attempts: backoff.attempts(),
                        message: format!("{}: {}", op_name, status),
                    });
                }
            }
        }
    }

    /// Transport failures and a busy server are worth another try.
    fn is_retryable(status: &Status) -> bool {
        let code = status.code();
        is_rpc_code(code) || code == MetaCode::BUSY
    }

    /// Retry quickly, without the full back-off.
    fn is_fast_retryable(status: &Status) -> bool {
        let code = status.code();
        code == RPCCode::REQUEST_REFUSED || code == RPCCode::SEND_FAILED || code == MetaCode::BUSY
    }

    /// The endpoint itself looks unhealthy (counts toward failover).
    fn is_server_error(status: &Status) -> bool {
        let code = status.code();
        code == RPCCode::CONNECT_FAILED
            || code == RPCCode::TIMEOUT
            || code == RPCCode::SOCKET_CLOSED
            || code == RPCCode::SOCKET_ERROR
            || code == RPCCode::INVALID_ADDR
    }

    /// Whether `snapshot` must be reloaded before resolving `ids`. A layout
    /// naming no servers needs no routing at all.
    fn routing_is_stale(&self, snapshot: &RoutingInfo, ids: &[ServerId]) -> bool {
        !ids.is_empty()
            && (snapshot.is_expired(self.config.routing_ttl) || !snapshot.missing(ids).is_empty())
    }

    /// Refresh routing if the current snapshot is too old or cannot resolve
    /// `ids`.
    async fn ensure_routing(&self, ids: &[ServerId]) -> ClientResult<Arc<RoutingInfo>> {
        let snapshot = self.routing.get();
        if !self.routing_is_stale(&snapshot, ids) {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited.
        let snapshot = self.routing.get();
        if !self.routing_is_stale(&snapshot, ids) {
            return Ok(snapshot);
        }
        self.load_routing().await?;
        Ok(self.routing.get())
    }

    async fn fetch_extents(&self, path: &str, window: Range<u64>) -> ClientResult<FileMetadata> {
        let req = GetLayoutReq {
            fs_id: self.config.fs_id,
            path: path.to_string(),
        };
        let stub = &self.stub;
        let rsp = self
            .with_retry("get_layout", |server| {
                let req = req.clone();
                async move { stub.get_layout(&server, req).await }
            })
            .await
            .map_err(|e| match e {
                ClientError::Status(s) => ClientError::from_status(s, path),
                other => other,
            })?;

        let ids = rsp.layout.server_ids();
        let routing = self.ensure_routing(&ids).await?;
        let meta = build_file_metadata(path, &rsp, &routing, window)?;
        tracing::debug!(
            "{}: handle {} length {}, {} extents over [{}, {})",
            path,
            meta.handle,
            meta.file_length,
            meta.extents.len(),
            meta.covered.start,
            meta.covered.end
        );
        Ok(meta)
    }

    async fn load_routing(&self) -> ClientResult<()> {
        let req = ListServersReq {
            fs_id: self.config.fs_id,
        };
        let stub = &self.stub;
        let rsp = self
            .with_retry("list_servers", |server| {
                let req = req.clone();
                async move { stub.list_servers(&server, req).await }
            })
            .await?;

        let info = RoutingInfo::from_servers(
            rsp.servers
                .into_iter()
                .map(|d| ServerInfo::from_desc(d, &self.config.rack_overrides)),
        );
        tracing::info!("routing refreshed: {} servers", info.servers.len());
        self.routing.update(info);
        Ok(())
    }
}

#[async_trait]
impl MetaClient for MetaClientImpl {
    async fn get_extents(&self, path: &str) -> ClientResult<FileMetadata> {
        self.fetch_extents(path, 0..u64::MAX).await
    }

    async fn get_extents_in(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> ClientResult<FileMetadata> {
        self.fetch_extents(path, offset..offset.saturating_add(length)).await
    }

    async fn refresh_routing(&self) -> ClientResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.load_routing().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::stub::{InMemoryMetaStub, MockMetaServiceStub};
    use ofs_proto::{
        DatafileRef, GetLayoutRsp, Layout, ListServersReq, ListServersRsp, ServerDesc,
        StripeRecord,
    };
    use ofs_types::{make_error, FsId, Handle, ServerId, StatusCode};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn test_config(endpoints: &[&str]) -> MetaClientConfig {
        MetaClientConfig {
            endpoints: endpoints.iter().map(|e| e.parse().unwrap()).collect(),
            retry: RetryConfig {
                rpc_timeout: Duration::from_secs(1),
                retry_total_time: Duration::from_secs(60),
                retry_init_wait: Duration::from_millis(1),
                retry_max_wait: Duration::from_millis(5),
                ..RetryConfig::default()
            },
            ..MetaClientConfig::default()
        }
    }

    fn server(id: u32) -> ServerDesc {
        ServerDesc {
            server_id: ServerId(id),
            address: BmiAddress::tcp(format!("storage-{}", id), 3334),
            alias: None,
            rack: None,
        }
    }

    fn two_stripes() -> GetLayoutRsp {
        GetLayoutRsp {
            handle: Handle(77),
            file_size: 200,
            layout: Layout::Explicit {
                stripes: vec![
                    StripeRecord { offset: 100, length: 100, servers: vec![ServerId(2)] },
                    StripeRecord { offset: 0, length: 100, servers: vec![ServerId(1)] },
                ],
            },
        }
    }

    fn mock_with_servers(ids: &'static [u32]) -> Arc<MockMetaServiceStub> {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_list_servers(move |_, _| {
            Ok(ListServersRsp {
                servers: ids.iter().map(|&i| server(i)).collect(),
            })
        });
        mock
    }

    #[tokio::test]
    async fn test_get_extents_refreshes_routing_once() {
        let mock = mock_with_servers(&[1, 2]);
        mock.on_get_layout(|_, _| Ok(two_stripes()));
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());

        let meta = client.get_extents("/f").await.unwrap();
        assert_eq!(meta.handle, Handle(77));
        assert_eq!(meta.extents[0].offset, 0);
        assert_eq!(meta.extents[0].hosts[0].host, "storage-1");
        assert_eq!(meta.extents[1].hosts[0].host, "storage-2");

        client.get_extents("/f").await.unwrap();
        assert_eq!(mock.get_layout_calls(), 2);
        assert_eq!(mock.list_servers_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_server_after_refresh_is_corrupt() {
        let mock = mock_with_servers(&[1]);
        mock.on_get_layout(|_, _| Ok(two_stripes()));
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());

        let err = client.get_extents("/f").await.unwrap_err();
        assert!(matches!(err, ClientError::CorruptMetadata { .. }));
        assert_eq!(mock.list_servers_calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mock = MockMetaServiceStub::new().into_arc();
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());

        let err = client.get_extents("/missing").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref p) if p == "/missing"));
        assert_eq!(mock.get_layout_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_arg_is_not_retried() {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_get_layout(|_, _| make_error(StatusCode::INVALID_ARG));
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());

        let err = client.get_extents("/f").await.unwrap_err();
        assert!(matches!(err, ClientError::Status(ref s) if s.code() == StatusCode::INVALID_ARG));
        assert_eq!(mock.get_layout_calls(), 1);
    }

    #[tokio::test]
    async fn test_bad_layout_status_is_corrupt() {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_get_layout(|_, _| make_error(MetaCode::BAD_LAYOUT));
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock);
        let err = client.get_extents("/f").await.unwrap_err();
        assert!(matches!(err, ClientError::CorruptMetadata { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_is_io() {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_get_layout(|_, _| make_error(RPCCode::SOCKET_ERROR));
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());

        let err = client.get_extents("/f").await.unwrap_err();
        assert!(matches!(err, ClientError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(mock.get_layout_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_is_retried_then_succeeds() {
        let mock = mock_with_servers(&[1, 2]);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        mock.on_get_layout(move |_, _| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                make_error(MetaCode::BUSY)
            } else {
                Ok(two_stripes())
            }
        });
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());
        client.get_extents("/f").await.unwrap();
        assert_eq!(mock.get_layout_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failover_to_next_endpoint() {
        let mock = mock_with_servers(&[1, 2]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        mock.on_get_layout(move |server, _| {
            s.lock().push(server.host.clone());
            if server.host == "meta-1" {
                make_error(RPCCode::CONNECT_FAILED)
            } else {
                Ok(two_stripes())
            }
        });
        let client = MetaClientImpl::new(test_config(&["meta-1", "meta-2"]), mock);

        client.get_extents("/f").await.unwrap();
        assert_eq!(*seen.lock(), vec!["meta-1", "meta-2"]);

        // The failed endpoint stays error-listed; sticky mode uses meta-2.
        client.get_extents("/f").await.unwrap();
        assert_eq!(seen.lock().last().map(String::as_str), Some("meta-2"));
    }

    struct SlowStub;

    #[async_trait]
    impl IMetaServiceStub for SlowStub {
        async fn get_layout(
            &self,
            _server: &BmiAddress,
            _req: GetLayoutReq,
        ) -> ofs_types::Result<GetLayoutRsp> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            make_error(StatusCode::FOUND_BUG)
        }

        async fn list_servers(
            &self,
            _server: &BmiAddress,
            _req: ListServersReq,
        ) -> ofs_types::Result<ListServersRsp> {
            Ok(ListServersRsp::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_timeout() {
        let client = MetaClientImpl::new(test_config(&["meta-1"]), Arc::new(SlowStub));
        let err = client.get_extents("/f").await.unwrap_err();
        match err {
            ClientError::RetryExhausted { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("get_layout"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let mock = MockMetaServiceStub::new().into_arc();
        let client = MetaClientImpl::new(test_config(&[]), mock.clone());
        let err = client.get_extents("/f").await.unwrap_err();
        assert!(matches!(err, ClientError::NoServerAvailable(_)));
        assert_eq!(mock.get_layout_calls(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_stub_and_rack_override() {
        let stub = Arc::new(InMemoryMetaStub::new(FsId(0)));
        stub.add_server(server(1));
        stub.put_file(
            "/f",
            Handle(1),
            10,
            Layout::Explicit {
                stripes: vec![StripeRecord { offset: 0, length: 10, servers: vec![ServerId(1)] }],
            },
        );
        let mut config = test_config(&["meta-1"]);
        config
            .rack_overrides
            .insert("storage-1".into(), "/rack-7".into());
        let client = MetaClientImpl::new(config, stub.clone());

        let meta = client.get_extents("/f").await.unwrap();
        assert_eq!(meta.extents[0].hosts[0].rack.as_deref(), Some("/rack-7"));

        // Layout changes are visible to the next call.
        stub.put_file(
            "/f",
            Handle(1),
            20,
            Layout::Explicit {
                stripes: vec![StripeRecord { offset: 0, length: 20, servers: vec![ServerId(1)] }],
            },
        );
        assert_eq!(client.get_extents("/f").await.unwrap().file_length, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moved_server_is_seen_after_routing_ttl() {
        let stub = Arc::new(InMemoryMetaStub::new(FsId(0)));
        stub.add_server(server(1));
        stub.put_file(
            "/f",
            Handle(1),
            10,
            Layout::Explicit {
                stripes: vec![StripeRecord { offset: 0, length: 10, servers: vec![ServerId(1)] }],
            },
        );
        let mut config = test_config(&["meta-1"]);
        config.routing_ttl = Duration::from_secs(30);
        let client = MetaClientImpl::new(config, stub.clone());

        let host = |meta: FileMetadata| meta.extents[0].hosts[0].host.clone();
        assert_eq!(host(client.get_extents("/f").await.unwrap()), "storage-1");

        stub.add_server(ServerDesc {
            server_id: ServerId(1),
            address: BmiAddress::tcp("storage-1-new", 3334),
            alias: None,
            rack: None,
        });
        // Still inside the TTL: the old address is served.
        assert_eq!(host(client.get_extents("/f").await.unwrap()), "storage-1");

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(host(client.get_extents("/f").await.unwrap()), "storage-1-new");
    }

    #[tokio::test]
    async fn test_zero_routing_ttl_reloads_every_query() {
        let mock = mock_with_servers(&[1, 2]);
        mock.on_get_layout(|_, _| Ok(two_stripes()));
        let mut config = test_config(&["meta-1"]);
        config.routing_ttl = Duration::ZERO;
        let client = MetaClientImpl::new(config, mock.clone());

        client.get_extents("/f").await.unwrap();
        client.get_extents("/f").await.unwrap();
        assert_eq!(mock.list_servers_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_layout_needs_no_routing() {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_get_layout(|_, _| {
            Ok(GetLayoutRsp {
                handle: Handle(3),
                file_size: 0,
                layout: Layout::Explicit { stripes: vec![] },
            })
        });
        let mut config = test_config(&["meta-1"]);
        config.routing_ttl = Duration::ZERO;
        let client = MetaClientImpl::new(config, mock.clone());

        let meta = client.get_extents("/empty").await.unwrap();
        assert!(meta.extents.is_empty());
        assert_eq!(mock.list_servers_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_extents_in_builds_only_the_window() {
        const GIB: u64 = 1 << 30;
        let mock = mock_with_servers(&[1, 2, 3, 4]);
        mock.on_get_layout(|_, _| {
            Ok(GetLayoutRsp {
                handle: Handle(9),
                file_size: 64 * GIB,
                layout: Layout::SimpleStripe {
                    strip_size: 65536,
                    datafiles: (1..=4)
                        .map(|i| DatafileRef {
                            handle: Handle(i as u64),
                            servers: vec![ServerId(i)],
                        })
                        .collect(),
                },
            })
        });
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock);

        let meta = client.get_extents_in("/big", GIB + 65536, 1).await.unwrap();
        assert_eq!(meta.file_length, 64 * GIB);
        assert_eq!(meta.covered, GIB + 65536..GIB + 2 * 65536);
        assert_eq!(meta.extents.len(), 1);
        assert_eq!(meta.extents[0].hosts[0].host, "storage-2");

        // Past EOF the window is empty but the file length is still reported.
        let meta = client.get_extents_in("/big", 65 * GIB, 10).await.unwrap();
        assert!(meta.extents.is_empty());
        assert_eq!(meta.file_length, 64 * GIB);
    }

    #[tokio::test]
    async fn test_explicit_refresh_routing() {
        let mock = mock_with_servers(&[1, 2, 3]);
        let client = MetaClientImpl::new(test_config(&["meta-1"]), mock.clone());
        client.refresh_routing().await.unwrap();
        assert_eq!(client.routing.get().servers.len(), 3);
        assert_eq!(mock.list_servers_calls(), 1);
    }

    #[test]
    fn test_round_robin_selector() {
        let eps: Vec<BmiAddress> = ["a", "b", "c"].iter().map(|h| BmiAddress::tcp(*h, 1)).collect();
        let sel = ServerSelector::new(ServerSelectionMode::RoundRobin, eps);
        let picks: Vec<_> = (0..4).map(|_| sel.select().unwrap().host).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_sticky_selector_error_listing() {
        let eps: Vec<BmiAddress> = ["a", "b"].iter().map(|h| BmiAddress::tcp(*h, 1)).collect();
        let sel = ServerSelector::new(ServerSelectionMode::Sticky, eps.clone());
        assert_eq!(sel.select().unwrap().host, "a");
        sel.mark_error(&eps[0]);
        assert_eq!(sel.select().unwrap().host, "b");
        sel.mark_error(&eps[1]);
        // All error-listed: fall back to the full list.
        assert_eq!(sel.select().unwrap().host, "a");
        sel.clear_error(&eps[0]);
        assert_eq!(sel.select().unwrap().host, "a");
    }

    #[test]
    fn test_uniform_random_selector_stays_in_set() {
        let eps: Vec<BmiAddress> = ["a", "b"].iter().map(|h| BmiAddress::tcp(*h, 1)).collect();
        let sel = ServerSelector::new(ServerSelectionMode::UniformRandom, eps);
        for _ in 0..20 {
            let host = sel.select().unwrap().host;
            assert!(host == "a" || host == "b");
        }
    }

    #[test]
    fn test_status_classification() {
        let s = |c| Status::new(c);
        assert!(MetaClientImpl::is_retryable(&s(RPCCode::TIMEOUT)));
        assert!(MetaClientImpl::is_retryable(&s(MetaCode::BUSY)));
        assert!(!MetaClientImpl::is_retryable(&s(MetaCode::NOT_FOUND)));
        assert!(!MetaClientImpl::is_retryable(&s(StatusCode::INVALID_ARG)));
        assert!(MetaClientImpl::is_fast_retryable(&s(RPCCode::SEND_FAILED)));
        assert!(!MetaClientImpl::is_fast_retryable(&s(RPCCode::TIMEOUT)));
        assert!(MetaClientImpl::is_server_error(&s(RPCCode::CONNECT_FAILED)));
        assert!(!MetaClientImpl::is_server_error(&s(MetaCode::BUSY)));
    }
}
