//! The block-location query surface.

use std::sync::Arc;

use async_trait::async_trait;
use ofs_client::{IMetaServiceStub, MetaClient, MetaClientImpl};
use ofs_config::Configuration;

use crate::block_location::{BlockLocation, LocationFormatter};
use crate::error::LocateError;
use crate::resolver::BlockLocationResolver;

/// Answers which nodes hold a byte range of a file.
///
/// Implementations must return locations sorted by offset that exactly
/// cover `[offset, offset + length)`, or an error; never a partial list.
/// `conformance` checks these properties against any implementation.
#[async_trait]
pub trait BlockLocationProvider: Send + Sync {
    async fn get_block_locations(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<BlockLocation>, LocateError>;
}

/// OrangeFS provider: resolver plus formatter.
pub struct OfsBlockLocationProvider {
    resolver: BlockLocationResolver,
    formatter: LocationFormatter,
}

impl OfsBlockLocationProvider {
    pub fn new(client: Arc<dyn MetaClient>, formatter: LocationFormatter) -> Self {
        Self {
            resolver: BlockLocationResolver::new(client),
            formatter,
        }
    }

    /// Build the metadata client and formatter from one configuration.
    pub fn from_configuration(
        conf: &Configuration,
        stub: Arc<dyn IMetaServiceStub>,
    ) -> Result<Self, ofs_client::ClientError> {
        let client = MetaClientImpl::from_configuration(conf, stub)?;
        Ok(Self::new(
            Arc::new(client),
            LocationFormatter::from_configuration(conf),
        ))
    }

    /// Locations of `[offset, EOF)`. The file length and the extents come
    /// from the same metadata fetch, so a concurrent truncate cannot turn
    /// the answer into a range error.
    pub async fn get_block_locations_to_eof(
        &self,
        path: &str,
        offset: u64,
    ) -> Result<Vec<BlockLocation>, LocateError> {
        let path = normalize_path(path)?;
        let clipped = self.resolver.resolve_to_eof(&path, offset).await?;
        let locations = self.formatter.format(&clipped);
        tracing::debug!(
            path = %path,
            offset,
            count = locations.len(),
            "resolved block locations to EOF"
        );
        Ok(locations)
    }
}

#[async_trait]
impl BlockLocationProvider for OfsBlockLocationProvider {
    async fn get_block_locations(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<BlockLocation>, LocateError> {
        let path = normalize_path(path)?;
        let clipped = self.resolver.resolve(&path, offset, length).await?;
        let locations = self.formatter.format(&clipped);
        tracing::debug!(
            path = %path,
            offset,
            length,
            count = locations.len(),
            "resolved block locations"
        );
        Ok(locations)
    }
}

/// Reduce a path or `ofs://authority/path` URI to an absolute file system
/// path with single separators and no trailing slash.
pub fn normalize_path(path: &str) -> Result<String, LocateError> {
    let raw = match path.strip_prefix("ofs://") {
        Some(rest) => match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "/",
        },
        None => path,
    };
    let parts: Vec<&str> = raw.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        if raw.is_empty() {
            return Err(LocateError::NotFound(path.to_string()));
        }
        return Ok("/".to_string());
    }
    Ok(format!("/{}", parts.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;
    use ofs_client::{InMemoryMetaStub, MetaClientConfig, MockMetaServiceStub, RetryConfig};
    use ofs_proto::{DatafileRef, Layout, ListServersRsp, ServerDesc, StripeRecord};
    use ofs_types::{make_error, BmiAddress, FsId, Handle, RPCCode, ServerId};
    use std::time::Duration;

    const MIB: u64 = 1024 * 1024;

    fn server(id: u32, host: &str) -> ServerDesc {
        ServerDesc {
            server_id: ServerId(id),
            address: BmiAddress::tcp(host, 3334),
            alias: None,
            rack: None,
        }
    }

    fn stripe(offset: u64, length: u64, servers: &[u32]) -> StripeRecord {
        StripeRecord {
            offset,
            length,
            servers: servers.iter().map(|&s| ServerId(s)).collect(),
        }
    }

    fn test_config() -> MetaClientConfig {
        MetaClientConfig {
            endpoints: vec![BmiAddress::tcp("localhost", 3334)],
            retry: RetryConfig {
                retry_init_wait: Duration::from_millis(1),
                retry_max_wait: Duration::from_millis(2),
                ..RetryConfig::default()
            },
            ..MetaClientConfig::default()
        }
    }

    fn provider_for(stub: Arc<dyn IMetaServiceStub>) -> OfsBlockLocationProvider {
        OfsBlockLocationProvider::new(
            Arc::new(MetaClientImpl::new(test_config(), stub)),
            LocationFormatter::default(),
        )
    }

    /// Hosts A, B, C; the 4 MiB file is split in two replicated extents.
    fn fixture() -> Arc<InMemoryMetaStub> {
        let stub = Arc::new(InMemoryMetaStub::new(FsId(0)));
        stub.add_server(server(1, "A"));
        stub.add_server(server(2, "B"));
        stub.add_server(server(3, "C"));
        stub.put_file(
            "/user/test/file4m",
            Handle(100),
            4 * MIB,
            Layout::Explicit {
                stripes: vec![stripe(2 * MIB, 2 * MIB, &[2, 3]), stripe(0, 2 * MIB, &[1, 2])],
            },
        );
        stub.put_file("/user/test/empty", Handle(101), 0, Layout::Explicit { stripes: vec![] });
        stub.put_file(
            "/user/test/striped",
            Handle(102),
            10 * MIB + 7,
            Layout::SimpleStripe {
                strip_size: MIB,
                datafiles: vec![
                    DatafileRef { handle: Handle(200), servers: vec![ServerId(1)] },
                    DatafileRef { handle: Handle(201), servers: vec![ServerId(2)] },
                    DatafileRef { handle: Handle(202), servers: vec![ServerId(3), ServerId(1)] },
                ],
            },
        );
        stub
    }

    #[tokio::test]
    async fn test_two_extent_query() {
        let provider = provider_for(fixture());
        let locs = provider
            .get_block_locations("/user/test/file4m", MIB, 3 * MIB)
            .await
            .unwrap();
        assert_eq!(locs.len(), 2);
        assert_eq!(locs[0].hosts, vec!["A", "B"]);
        assert_eq!((locs[0].offset, locs[0].length), (MIB, MIB));
        assert_eq!(locs[1].hosts, vec!["B", "C"]);
        assert_eq!((locs[1].offset, locs[1].length), (2 * MIB, 2 * MIB));
        assert_eq!(locs[1].topology_paths[0], "/default-rack/B:3334");
    }

    #[tokio::test]
    async fn test_zero_length_file() {
        let provider = provider_for(fixture());
        let locs = provider.get_block_locations("/user/test/empty", 0, 0).await.unwrap();
        assert!(locs.is_empty());
    }

    #[tokio::test]
    async fn test_missing_path() {
        let provider = provider_for(fixture());
        let err = provider
            .get_block_locations("/user/test/nope", 0, 0)
            .await
            .unwrap_err();
        assert_eq!(err, LocateError::NotFound("/user/test/nope".into()));
    }

    #[tokio::test]
    async fn test_uri_path_is_normalized() {
        let provider = provider_for(fixture());
        let locs = provider
            .get_block_locations("ofs://localhost:3334/user//test/file4m/", 0, 4 * MIB)
            .await
            .unwrap();
        assert_eq!(locs.len(), 2);
    }

    #[tokio::test]
    async fn test_conformance_on_fixture_files() {
        let provider = provider_for(fixture());
        conformance::run_all(&provider, "/user/test/file4m", 4 * MIB).await.unwrap();
        conformance::run_all(&provider, "/user/test/empty", 0).await.unwrap();
        conformance::run_all(&provider, "/user/test/striped", 10 * MIB + 7).await.unwrap();
    }

    #[tokio::test]
    async fn test_striped_locations_follow_datafiles() {
        let provider = provider_for(fixture());
        let locs = provider
            .get_block_locations("/user/test/striped", 0, 10 * MIB + 7)
            .await
            .unwrap();
        assert_eq!(locs.len(), 11);
        assert_eq!(locs[2].hosts, vec!["C", "A"]);
        assert_eq!(locs[3].hosts, vec!["A"]);
        assert_eq!(locs[10].length, 7);
    }

    #[tokio::test]
    async fn test_striped_sub_range() {
        let provider = provider_for(fixture());
        let locs = provider
            .get_block_locations("/user/test/striped", 5 * MIB - 1, 2)
            .await
            .unwrap();
        assert_eq!(locs.len(), 2);
        assert_eq!((locs[0].offset, locs[0].length), (5 * MIB - 1, 1));
        assert_eq!(locs[0].hosts, vec!["B"]);
        assert_eq!(locs[1].hosts, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_locations_to_eof() {
        let stub = fixture();
        let provider = provider_for(stub.clone());
        let locs = provider
            .get_block_locations_to_eof("/user/test/striped", 9 * MIB)
            .await
            .unwrap();
        assert_eq!(locs.len(), 2);
        assert_eq!(locs[1].offset + locs[1].length, 10 * MIB + 7);

        // The answer always matches the file as fetched, whatever its size.
        stub.put_file(
            "/user/test/striped",
            Handle(102),
            9 * MIB + 1,
            Layout::Explicit { stripes: vec![stripe(0, 9 * MIB + 1, &[1])] },
        );
        let locs = provider
            .get_block_locations_to_eof("/user/test/striped", 9 * MIB)
            .await
            .unwrap();
        assert_eq!((locs[0].offset, locs[0].length), (9 * MIB, 1));

        let err = provider
            .get_block_locations_to_eof("/user/test/empty", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::InvalidRange { file_length: 0, .. }));
    }

    #[tokio::test]
    async fn test_overlapping_stripes_on_same_servers_are_merged() {
        let stub = fixture();
        stub.put_file(
            "/user/test/overlap",
            Handle(104),
            20,
            Layout::Explicit {
                stripes: vec![stripe(0, 12, &[1]), stripe(10, 10, &[1]), stripe(4, 4, &[1])],
            },
        );
        let provider = provider_for(stub);
        let locs = provider.get_block_locations("/user/test/overlap", 0, 20).await.unwrap();
        assert_eq!(locs.len(), 1);
        assert_eq!((locs[0].offset, locs[0].length), (0, 20));
        assert_eq!(locs[0].hosts, vec!["A"]);
        conformance::run_all(&provider, "/user/test/overlap", 20).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_layout() {
        let stub = fixture();
        stub.put_file(
            "/user/test/bad",
            Handle(103),
            20,
            Layout::Explicit {
                stripes: vec![stripe(0, 12, &[1]), stripe(10, 10, &[2])],
            },
        );
        let provider = provider_for(stub);
        let err = provider.get_block_locations("/user/test/bad", 0, 20).await.unwrap_err();
        assert!(matches!(err, LocateError::CorruptMetadata { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_io() {
        let mock = MockMetaServiceStub::new().into_arc();
        mock.on_get_layout(|_, _| make_error(RPCCode::CONNECT_FAILED));
        mock.on_list_servers(|_, _| Ok(ListServersRsp::default()));
        let provider = provider_for(mock.clone());

        let err = provider.get_block_locations("/f", 0, 0).await.unwrap_err();
        assert!(matches!(err, LocateError::Io(_)));
        assert_eq!(mock.get_layout_calls(), 3);
    }

    #[tokio::test]
    async fn test_from_configuration() {
        let mut conf = MetaClientConfig::default_configuration();
        conf.set(ofs_config::keys::TOPOLOGY_DEFAULT_RACK, "/lab");
        let provider = OfsBlockLocationProvider::from_configuration(&conf, fixture()).unwrap();
        let locs = provider
            .get_block_locations("/user/test/file4m", 0, 1)
            .await
            .unwrap();
        assert_eq!(locs[0].topology_paths, vec!["/lab/A:3334", "/lab/B:3334"]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/b").unwrap(), "/a/b");
        assert_eq!(normalize_path("a//b/").unwrap(), "/a/b");
        assert_eq!(normalize_path("ofs://host:3334/x/y").unwrap(), "/x/y");
        assert_eq!(normalize_path("ofs://host:3334").unwrap(), "/");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert!(matches!(normalize_path(""), Err(LocateError::NotFound(_))));
    }
}
