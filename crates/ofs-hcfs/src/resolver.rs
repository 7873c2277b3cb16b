//! Range clipping over a file's extent map.

use std::sync::Arc;

use ofs_client::{Extent, FileMetadata, MetaClient};

use crate::error::LocateError;

/// The part of one extent that falls inside a requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClippedExtent {
    /// The whole underlying extent, with its original host order.
    pub extent: Extent,
    pub offset: u64,
    pub length: u64,
}

/// Clip `meta`'s extents to `[offset, offset + length)`.
///
/// `meta.extents` must be sorted and tile `meta.covered`. A zero-length
/// request at or before EOF yields nothing; a range reaching past EOF is
/// rejected, and so is a map that does not cover the whole range.
pub fn clip_extents(
    meta: &FileMetadata,
    offset: u64,
    length: u64,
) -> Result<Vec<ClippedExtent>, LocateError> {
    let invalid = || LocateError::InvalidRange {
        offset,
        length,
        file_length: meta.file_length,
    };
    let end = offset.checked_add(length).ok_or_else(invalid)?;
    if offset > meta.file_length || end > meta.file_length {
        return Err(invalid());
    }
    if length == 0 {
        return Ok(Vec::new());
    }
    if !meta.covers(offset, end) {
        return Err(LocateError::CorruptMetadata {
            path: meta.path.clone(),
            reason: format!(
                "extent map covers [{}, {}), query needs [{}, {})",
                meta.covered.start, meta.covered.end, offset, end
            ),
        });
    }

    let first = meta.extents.partition_point(|e| e.end() <= offset);
    let clipped = meta.extents[first..]
        .iter()
        .take_while(|e| e.offset < end)
        .map(|e| {
            let start = e.offset.max(offset);
            let stop = e.end().min(end);
            ClippedExtent {
                extent: e.clone(),
                offset: start,
                length: stop - start,
            }
        })
        .collect();
    Ok(clipped)
}

/// Fetches the extent map and clips it. No retries here; those belong to
/// the metadata client.
pub struct BlockLocationResolver {
    client: Arc<dyn MetaClient>,
}

impl BlockLocationResolver {
    pub fn new(client: Arc<dyn MetaClient>) -> Self {
        Self { client }
    }

    pub async fn resolve(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<ClippedExtent>, LocateError> {
        let meta = self.client.get_extents_in(path, offset, length).await?;
        // The client may be a foreign implementation; never clip an extent
        // map that does not tile what it claims to cover.
        meta.validate()?;
        clip_extents(&meta, offset, length)
    }

    /// Resolve `[offset, EOF)` from a single metadata fetch.
    pub async fn resolve_to_eof(
        &self,
        path: &str,
        offset: u64,
    ) -> Result<Vec<ClippedExtent>, LocateError> {
        let meta = self.client.get_extents_in(path, offset, u64::MAX - offset).await?;
        meta.validate()?;
        clip_extents(&meta, offset, meta.file_length.saturating_sub(offset))
    }
}
