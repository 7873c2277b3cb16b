//! Messages exchanged with the OrangeFS control plane.
//!
//! The connector only issues two read-only queries: the layout of one file
//! and the list of servers. Every message travels as a JSON body behind an
//! 8-byte checksummed header (see [`frame`]).

pub mod frame;
pub mod meta;

pub use frame::{decode_frame, encode_frame, FrameError, MessageHeader};
pub use meta::{
    DatafileRef, GetLayoutReq, GetLayoutRsp, Layout, ListServersReq, ListServersRsp, MetaRequest,
    ServerDesc, StripeRecord, WireResult,
};
