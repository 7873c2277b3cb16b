//! TCP implementation of [`IMetaServiceStub`].
//!
//! Each call opens a connection, writes one request frame, reads one reply
//! frame and closes. Transport failures come back as RPC-range statuses so
//! the retry loop can classify them; the caller applies the RPC timeout.

use async_trait::async_trait;
use ofs_proto::frame::{decode_payload, encode_frame, MessageHeader, FRAME_HEADER_SIZE};
use ofs_proto::{
    GetLayoutReq, GetLayoutRsp, ListServersReq, ListServersRsp, MetaRequest, WireResult,
};
use ofs_types::{make_error_msg, BmiAddress, BmiProtocol, RPCCode, Result, Status};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::stub::IMetaServiceStub;

/// Write one frame carrying `msg`.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(msg)
        .map_err(|e| Status::with_message(RPCCode::SEND_FAILED, e.to_string()))?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| Status::with_message(RPCCode::SEND_FAILED, e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| Status::with_message(RPCCode::SEND_FAILED, e.to_string()))
}

/// Read one frame and deserialize its body.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut raw = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut raw).await.map_err(read_error)?;
    let header = MessageHeader::from_bytes(&raw);
    header
        .check()
        .map_err(|e| Status::with_message(RPCCode::VERIFY_RESPONSE_FAILED, e.to_string()))?;

    let mut payload = vec![0u8; header.size as usize];
    reader.read_exact(&mut payload).await.map_err(read_error)?;
    decode_payload(&header, &payload)
        .map_err(|e| Status::with_message(RPCCode::VERIFY_RESPONSE_FAILED, e.to_string()))
}

fn read_error(err: std::io::Error) -> Status {
    let code = if err.kind() == std::io::ErrorKind::UnexpectedEof {
        RPCCode::SOCKET_CLOSED
    } else {
        RPCCode::SOCKET_ERROR
    };
    Status::with_message(code, err.to_string())
}

/// Talks to control-plane servers over plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpMetaStub;

impl TcpMetaStub {
    pub fn new() -> Self {
        Self
    }

    async fn call<T: DeserializeOwned>(&self, server: &BmiAddress, req: MetaRequest) -> Result<T> {
        if server.protocol != BmiProtocol::Tcp {
            return make_error_msg(
                RPCCode::INVALID_ADDR,
                format!("{} is not a tcp endpoint", server),
            );
        }

        let mut stream = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|e| {
                Status::with_message(RPCCode::CONNECT_FAILED, format!("{}: {}", server, e))
            })?;
        // Best effort; small request frames.
        let _ = stream.set_nodelay(true);

        tracing::trace!(op = req.name(), %server, "sending request");
        write_frame(&mut stream, &req).await?;
        let rsp: WireResult<T> = read_frame(&mut stream).await?;
        rsp.into()
    }
}

#[async_trait]
impl IMetaServiceStub for TcpMetaStub {
    async fn get_layout(&self, server: &BmiAddress, req: GetLayoutReq) -> Result<GetLayoutRsp> {
        self.call(server, MetaRequest::GetLayout(req)).await
    }

    async fn list_servers(
        &self,
        server: &BmiAddress,
        req: ListServersReq,
    ) -> Result<ListServersRsp> {
        self.call(server, MetaRequest::ListServers(req)).await
    }
}
