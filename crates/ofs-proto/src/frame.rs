//! Length-prefixed, checksummed JSON frames.
//!
//! Layout: `[checksum: u32 LE][size: u32 LE][payload: size bytes]`. The
//! checksum is CRC32C of the payload with its low byte replaced by
//! [`FRAME_MAGIC`], so a peer speaking another protocol is rejected on the
//! first header.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Size of the frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Magic value stored in the low byte of the checksum.
pub const FRAME_MAGIC: u8 = 0x4F;

/// Largest payload accepted (16 MiB). Layout replies for very wide files
/// stay far below this.
pub const FRAME_MAX_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("bad frame magic: {0:#04x}")]
    BadMagic(u8),

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("incomplete frame: need {need} bytes, have {have}")]
    Incomplete { need: usize, have: usize },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub checksum: u32,
    pub size: u32,
}

impl MessageHeader {
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            checksum: frame_checksum(payload),
            size: payload.len() as u32,
        }
    }

    pub fn from_bytes(data: &[u8; FRAME_HEADER_SIZE]) -> Self {
        let checksum = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Self { checksum, size }
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.checksum.to_le_bytes());
        buf[4..8].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    /// Check magic and size before reading the payload.
    pub fn check(&self) -> Result<(), FrameError> {
        let magic = (self.checksum & 0xFF) as u8;
        if magic != FRAME_MAGIC {
            return Err(FrameError::BadMagic(magic));
        }
        let size = self.size as usize;
        if size > FRAME_MAX_SIZE {
            return Err(FrameError::TooLarge {
                size,
                max: FRAME_MAX_SIZE,
            });
        }
        Ok(())
    }

    /// Full validation against a received payload.
    pub fn validate(&self, payload: &[u8]) -> Result<(), FrameError> {
        self.check()?;
        let expected = frame_checksum(payload);
        if self.checksum != expected {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: self.checksum,
            });
        }
        Ok(())
    }
}

/// CRC32C with the magic in the low byte.
pub fn frame_checksum(payload: &[u8]) -> u32 {
    (crc32c::crc32c(payload) & !0xFF) | FRAME_MAGIC as u32
}

/// Serialize `msg` into a complete frame.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Bytes, FrameError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > FRAME_MAX_SIZE {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            max: FRAME_MAX_SIZE,
        });
    }
    let header = MessageHeader::for_payload(&payload);
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_slice(&header.to_bytes());
    buf.put_slice(&payload);
    Ok(buf.freeze())
}

/// Decode a complete frame held in `data`.
pub fn decode_frame<T: DeserializeOwned>(data: &[u8]) -> Result<T, FrameError> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(FrameError::Incomplete {
            need: FRAME_HEADER_SIZE,
            have: data.len(),
        });
    }
    let mut raw = [0u8; FRAME_HEADER_SIZE];
    raw.copy_from_slice(&data[..FRAME_HEADER_SIZE]);
    let header = MessageHeader::from_bytes(&raw);
    header.check()?;

    let need = FRAME_HEADER_SIZE + header.size as usize;
    if data.len() < need {
        return Err(FrameError::Incomplete {
            need,
            have: data.len(),
        });
    }
    decode_payload(&header, &data[FRAME_HEADER_SIZE..need])
}

/// Validate and deserialize a payload read after `header`.
pub fn decode_payload<T: DeserializeOwned>(
    header: &MessageHeader,
    payload: &[u8],
) -> Result<T, FrameError> {
    header.validate(payload)?;
    Ok(serde_json::from_slice(payload)?)
}
