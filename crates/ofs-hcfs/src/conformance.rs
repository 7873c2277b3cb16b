//! Behavioural checks any [`BlockLocationProvider`] must pass.
//!
//! Each check drives a provider against a file whose length the caller
//! knows and reports the first violation it finds. Backends reuse them in
//! their own tests.

use crate::block_location::BlockLocation;
use crate::error::LocateError;
use crate::provider::BlockLocationProvider;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConformanceError {
    #[error("{check}: query failed: {source}")]
    Query {
        check: &'static str,
        #[source]
        source: LocateError,
    },

    #[error("{check}: expected data at {expected}, location {index} starts at {found}")]
    Discontiguous {
        check: &'static str,
        index: usize,
        expected: u64,
        found: u64,
    },

    #[error("{check}: location {index} has zero length")]
    EmptyLocation { check: &'static str, index: usize },

    #[error("{check}: locations end at {end}, expected {expected}")]
    WrongEnd {
        check: &'static str,
        end: u64,
        expected: u64,
    },

    #[error("{check}: offsets not strictly increasing at location {index}")]
    NotMonotonic { check: &'static str, index: usize },

    #[error("{check}: hosts and topology paths differ in length at location {index}")]
    ShapeMismatch { check: &'static str, index: usize },

    #[error("query at EOF returned {count} locations")]
    NonEmptyAtEof { count: usize },

    #[error("range offset {offset} length {length} was accepted")]
    RangeAccepted { offset: u64, length: u64 },

    #[error("range offset {offset} length {length} failed with {error}, not an invalid range")]
    WrongRejection {
        offset: u64,
        length: u64,
        error: LocateError,
    },

    #[error("repeated query returned a different answer")]
    NotIdempotent,
}

/// Locations must be non-empty, strictly increasing and contiguous from
/// `start` to `end`.
pub fn check_tiling(
    check: &'static str,
    locations: &[BlockLocation],
    start: u64,
    end: u64,
) -> Result<(), ConformanceError> {
    let mut expected = start;
    for (index, loc) in locations.iter().enumerate() {
        if loc.length == 0 {
            return Err(ConformanceError::EmptyLocation { check, index });
        }
        if index > 0 && loc.offset <= locations[index - 1].offset {
            return Err(ConformanceError::NotMonotonic { check, index });
        }
        if loc.offset != expected {
            return Err(ConformanceError::Discontiguous {
                check,
                index,
                expected,
                found: loc.offset,
            });
        }
        if loc.hosts.len() != loc.names.len() || loc.hosts.len() != loc.topology_paths.len() {
            return Err(ConformanceError::ShapeMismatch { check, index });
        }
        expected = loc.end();
    }
    if expected != end {
        return Err(ConformanceError::WrongEnd {
            check,
            end: expected,
            expected: end,
        });
    }
    Ok(())
}

/// A whole-file query covers `[0, file_length)` exactly.
pub async fn check_coverage(
    provider: &dyn BlockLocationProvider,
    path: &str,
    file_length: u64,
) -> Result<Vec<BlockLocation>, ConformanceError> {
    let check = "coverage";
    let locations = provider
        .get_block_locations(path, 0, file_length)
        .await
        .map_err(|source| ConformanceError::Query { check, source })?;
    check_tiling(check, &locations, 0, file_length)?;
    Ok(locations)
}

/// A sub-range query covers exactly that sub-range.
pub async fn check_sub_range(
    provider: &dyn BlockLocationProvider,
    path: &str,
    offset: u64,
    length: u64,
) -> Result<(), ConformanceError> {
    let check = "sub-range";
    let locations = provider
        .get_block_locations(path, offset, length)
        .await
        .map_err(|source| ConformanceError::Query { check, source })?;
    check_tiling(check, &locations, offset, offset + length)
}

/// A zero-length query at EOF is empty and not an error.
pub async fn check_eof_boundary(
    provider: &dyn BlockLocationProvider,
    path: &str,
    file_length: u64,
) -> Result<(), ConformanceError> {
    let locations = provider
        .get_block_locations(path, file_length, 0)
        .await
        .map_err(|source| ConformanceError::Query {
            check: "eof boundary",
            source,
        })?;
    if !locations.is_empty() {
        return Err(ConformanceError::NonEmptyAtEof {
            count: locations.len(),
        });
    }
    Ok(())
}

/// Ranges reaching past EOF fail with `InvalidRange`.
pub async fn check_range_rejection(
    provider: &dyn BlockLocationProvider,
    path: &str,
    file_length: u64,
) -> Result<(), ConformanceError> {
    let ranges = [
        (0, file_length + 1),
        (file_length, 1),
        (file_length + 1, 0),
        (file_length / 2, file_length - file_length / 2 + 1),
    ];
    for (offset, length) in ranges {
        match provider.get_block_locations(path, offset, length).await {
            Ok(_) => return Err(ConformanceError::RangeAccepted { offset, length }),
            Err(LocateError::InvalidRange { .. }) => {}
            Err(error) => {
                return Err(ConformanceError::WrongRejection {
                    offset,
                    length,
                    error,
                });
            }
        }
    }
    Ok(())
}

/// Two identical queries against an unchanged file agree.
pub async fn check_idempotence(
    provider: &dyn BlockLocationProvider,
    path: &str,
    offset: u64,
    length: u64,
) -> Result<(), ConformanceError> {
    let check = "idempotence";
    let first = provider
        .get_block_locations(path, offset, length)
        .await
        .map_err(|source| ConformanceError::Query { check, source })?;
    let second = provider
        .get_block_locations(path, offset, length)
        .await
        .map_err(|source| ConformanceError::Query { check, source })?;
    if first != second {
        return Err(ConformanceError::NotIdempotent);
    }
    Ok(())
}

/// Run every check against `path`.
pub async fn run_all(
    provider: &dyn BlockLocationProvider,
    path: &str,
    file_length: u64,
) -> Result<(), ConformanceError> {
    check_coverage(provider, path, file_length).await?;
    if file_length > 2 {
        check_sub_range(provider, path, 1, file_length - 2).await?;
    }
    check_eof_boundary(provider, path, file_length).await?;
    check_range_rejection(provider, path, file_length).await?;
    check_idempotence(provider, path, 0, file_length).await?;
    Ok(())
}
