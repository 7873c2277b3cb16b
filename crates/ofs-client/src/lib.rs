//! Client side of the OrangeFS layout query.
//!
//! [`MetaClient::get_extents`] asks a control-plane server for a file's
//! layout, resolves the server ids it names through the routing table, and
//! returns a normalized [`FileMetadata`]: extents sorted by offset that
//! tile `[0, file_length)` exactly. [`MetaClient::get_extents_in`] builds
//! only the extents overlapping a byte range, which keeps queries on
//! finely striped large files cheap.
//!
//! The control plane is reached through an [`IMetaServiceStub`]; the crate
//! ships a TCP implementation, an in-memory one for fixtures, and a
//! closure-driven mock for fault injection.

pub mod config;
pub mod error;
pub mod layout;
pub mod meta;
pub mod retry;
pub mod routing;
pub mod stub;
pub mod tcp;

pub use config::{MetaClientConfig, RetryConfig, ServerSelectionMode};
pub use error::{ClientError, ClientResult};
pub use layout::{Extent, FileMetadata, StorageNode};
pub use meta::{MetaClient, MetaClientImpl};
pub use routing::{RoutingInfo, RoutingInfoHandle, ServerInfo};
pub use stub::{FixtureFile, IMetaServiceStub, InMemoryMetaStub, LayoutFixture, MockMetaServiceStub};
pub use tcp::TcpMetaStub;
