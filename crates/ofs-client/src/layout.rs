//! Extent model and layout normalization.
//!
//! A layout reply is turned into a list of [`Extent`]s that are sorted by
//! offset, pairwise disjoint, and tile `[0, file_length)` with no gap.
//! Anything that cannot be brought into that shape is reported as corrupt.

use std::ops::Range;

use ofs_proto::{DatafileRef, GetLayoutRsp, Layout, StripeRecord};
use ofs_types::{Handle, ServerId};
use serde::Serialize;

use crate::error::{ClientError, ClientResult};
use crate::routing::RoutingInfo;

/// A storage node holding a replica of an extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StorageNode {
    pub server_id: ServerId,
    pub host: String,
    pub port: u16,
    pub rack: Option<String>,
}

impl StorageNode {
    /// `host:port`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A contiguous byte range of a file and the nodes that hold it, in
/// replica order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub offset: u64,
    pub length: u64,
    pub hosts: Vec<StorageNode>,
}

impl Extent {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// A file's extent map, fetched fresh for each resolution.
///
/// `extents` tile `covered`, which is `0..file_length` for a whole-file
/// fetch and may be narrower when only part of the file was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub path: String,
    pub handle: Handle,
    pub file_length: u64,
    pub covered: Range<u64>,
    pub extents: Vec<Extent>,
}

impl FileMetadata {
    /// Check the tiling invariant.
    pub fn validate(&self) -> ClientResult<()> {
        if self.covered.start > self.covered.end || self.covered.end > self.file_length {
            return Err(ClientError::corrupt(
                &self.path,
                format!(
                    "extent map covers [{}, {}) of a {} byte file",
                    self.covered.start, self.covered.end, self.file_length
                ),
            ));
        }
        let mut expected = self.covered.start;
        for e in &self.extents {
            if e.length == 0 {
                return Err(ClientError::corrupt(
                    &self.path,
                    format!("zero-length extent at {}", e.offset),
                ));
            }
            if e.offset != expected {
                return Err(ClientError::corrupt(
                    &self.path,
                    format!("extent at {} does not follow {}", e.offset, expected),
                ));
            }
            expected = e.offset.checked_add(e.length).ok_or_else(|| {
                ClientError::corrupt(&self.path, format!("extent at {} overflows", e.offset))
            })?;
        }
        if expected != self.covered.end {
            return Err(ClientError::corrupt(
                &self.path,
                format!("extents end at {}, expected {}", expected, self.covered.end),
            ));
        }
        Ok(())
    }

    /// Whether this map has extents for every byte of `[offset, end)`.
    pub fn covers(&self, offset: u64, end: u64) -> bool {
        offset >= end || (self.covered.start <= offset && end <= self.covered.end)
    }
}

/// Build the extent map for `path` from a layout reply and a routing
/// snapshot that resolves every server id the layout names. Only extents
/// overlapping `window` (clamped to the file) are built; pass `0..u64::MAX`
/// for the whole file.
pub fn build_file_metadata(
    path: &str,
    rsp: &GetLayoutRsp,
    routing: &RoutingInfo,
    window: Range<u64>,
) -> ClientResult<FileMetadata> {
    let (stripes, covered) = stripes_in_window(rsp.file_size, &rsp.layout, window)
        .map_err(|reason| ClientError::corrupt(path, reason))?;

    let extents = stripes
        .into_iter()
        .map(|s| {
            let hosts = s
                .servers
                .iter()
                .map(|id| {
                    let server = routing.get_server(*id).ok_or_else(|| {
                        ClientError::corrupt(path, format!("layout names unknown server {}", id))
                    })?;
                    Ok(StorageNode {
                        server_id: server.server_id,
                        host: server.address.host.clone(),
                        port: server.address.port,
                        rack: server.rack.clone(),
                    })
                })
                .collect::<ClientResult<Vec<_>>>()?;
            Ok(Extent {
                offset: s.offset,
                length: s.length,
                hosts,
            })
        })
        .collect::<ClientResult<Vec<_>>>()?;

    let meta = FileMetadata {
        path: path.to_string(),
        handle: rsp.handle,
        file_length: rsp.file_size,
        covered,
        extents,
    };
    meta.validate()?;
    Ok(meta)
}

/// Stripes overlapping `window`, and the contiguous range they cover.
///
/// The window is clamped to `[0, file_size)`. Stripes are never cut, so the
/// covered range may start before and end after the window. The whole
/// layout is still checked, so a corrupt layout fails for any window.
pub fn stripes_in_window(
    file_size: u64,
    layout: &Layout,
    window: Range<u64>,
) -> Result<(Vec<StripeRecord>, Range<u64>), String> {
    let window = window.start.min(file_size)..window.end.min(file_size);
    match layout {
        Layout::SimpleStripe {
            strip_size,
            datafiles,
        } => simple_stripes(file_size, *strip_size, datafiles, window),
        Layout::Explicit { stripes } => {
            let all = normalize_stripes(file_size, stripes.clone())?;
            if window.is_empty() {
                return Ok((Vec::new(), window.start..window.start));
            }
            let selected: Vec<StripeRecord> = all
                .into_iter()
                .filter(|s| s.offset < window.end && s.offset + s.length > window.start)
                .collect();
            let covered = match (selected.first(), selected.last()) {
                (Some(first), Some(last)) => first.offset..last.offset + last.length,
                _ => window.start..window.start,
            };
            Ok((selected, covered))
        }
    }
}

/// Round-robin strips overlapping `window`. Consecutive strips on the same
/// datafile (only possible with a single datafile) are one physical run and
/// are joined. Only strips inside the window are built, so the cost follows
/// the window and not the file size.
fn simple_stripes(
    file_size: u64,
    strip_size: u64,
    datafiles: &[DatafileRef],
    window: Range<u64>,
) -> Result<(Vec<StripeRecord>, Range<u64>), String> {
    if file_size == 0 {
        return Ok((Vec::new(), 0..0));
    }
    if strip_size == 0 {
        return Err("strip size is zero".into());
    }
    let servers: Vec<&[ServerId]> = datafiles.iter().map(|d| &d.servers[..]).collect();
    if servers.is_empty() {
        return Err(format!("no datafiles for {} bytes", file_size));
    }
    if window.is_empty() {
        return Ok((Vec::new(), window.start..window.start));
    }

    if servers.len() == 1 {
        let run = StripeRecord {
            offset: 0,
            length: file_size,
            servers: servers[0].to_vec(),
        };
        return Ok((vec![run], 0..file_size));
    }

    let first = window.start / strip_size;
    let stop = window.end.div_ceil(strip_size);
    let out: Vec<StripeRecord> = (first..stop)
        .map(|i| {
            let offset = i * strip_size;
            StripeRecord {
                offset,
                length: strip_size.min(file_size - offset),
                servers: servers[(i % servers.len() as u64) as usize].to_vec(),
            }
        })
        .collect();
    let covered = first * strip_size..stop.saturating_mul(strip_size).min(file_size);
    Ok((out, covered))
}

/// Sort, merge and check raw stripe records.
///
/// Zero-length records are dropped. A record that overlaps or lies inside
/// the previous one is merged into it when both name the same servers;
/// with different servers the overlap is contradictory. A gap, or coverage
/// that does not end at `file_size`, is an error too.
pub fn normalize_stripes(
    file_size: u64,
    mut stripes: Vec<StripeRecord>,
) -> Result<Vec<StripeRecord>, String> {
    stripes.retain(|s| s.length > 0);
    stripes.sort_by_key(|s| (s.offset, s.length));

    let mut out: Vec<StripeRecord> = Vec::with_capacity(stripes.len());
    let mut expected = 0u64;
    for s in stripes {
        let end = s
            .offset
            .checked_add(s.length)
            .ok_or_else(|| format!("stripe at {} overflows", s.offset))?;

        // Sorted and contiguous so far, so only the last record can overlap.
        if let Some(prev) = out.last_mut().filter(|_| s.offset < expected) {
            if prev.servers != s.servers {
                if prev.offset == s.offset && prev.length == s.length {
                    return Err(format!("conflicting replicas for [{}, {})", s.offset, end));
                }
                return Err(format!(
                    "stripe [{}, {}) overlaps data ending at {} on other servers",
                    s.offset, end, expected
                ));
            }
            if end > expected {
                prev.length = end - prev.offset;
                expected = end;
            }
            continue;
        }
        if s.offset > expected {
            return Err(format!("gap [{}, {})", expected, s.offset));
        }
        expected = end;
        out.push(s);
    }

    if expected != file_size {
        return Err(format!(
            "stripes end at {}, file size is {}",
            expected, file_size
        ));
    }
    Ok(out)
}
