//! ZIP archive extraction.
//!
//! The backend returns stems as a ZIP archive. Directory members are
//! skipped; every other member becomes one extracted file.
//!
//! # Member lookup
//!
//! Archives sometimes nest files under a common prefix (`song/vocals.wav`),
//! and callers sometimes ask with a prefix the archive lacks. Lookups
//! resolve in this order, first hit wins:
//!
//! 1. exact path match
//! 2. first member (archive order) whose path ends with `/{requested}`
//! 3. first member (archive order) such that `requested` ends with `/{member}`
//!
//! Leading `./` and `/` are ignored on both sides.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::LibraryError;

/// One extracted archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Path within the archive
    pub name: String,
    pub bytes: Vec<u8>,
}

fn normalize(path: &str) -> &str {
    let mut p = path;
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            return p;
        }
    }
}

fn is_directory(name: &str) -> bool {
    name.ends_with('/')
}

/// Find the member matching `requested` among `names`.
///
/// Returns the original (un-normalized) member name.
pub fn find_member<'a, I>(names: I, requested: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = normalize(requested);
    if wanted.is_empty() {
        return None;
    }

    let members: Vec<&str> = names.into_iter().filter(|n| !is_directory(n)).collect();

    if let Some(exact) = members.iter().find(|m| normalize(m) == wanted) {
        return Some(*exact);
    }

    let nested_suffix = format!("/{}", wanted);
    if let Some(nested) = members.iter().find(|m| normalize(m).ends_with(&nested_suffix)) {
        return Some(*nested);
    }

    members
        .iter()
        .find(|m| {
            let member = normalize(m);
            !member.is_empty() && wanted.ends_with(&format!("/{}", member))
        })
        .copied()
}

fn open(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, LibraryError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| LibraryError::Archive(e.to_string()))
}

/// Upper bound on up-front buffer allocation for one member
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Initial buffer size for a member declaring `declared` bytes
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

fn read_member(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    index: usize,
) -> Result<ArchiveFile, LibraryError> {
    let mut member = archive
        .by_index(index)
        .map_err(|e| LibraryError::Archive(e.to_string()))?;

    let name = member.name().replace('\\', "/");
    let mut bytes = Vec::with_capacity(initial_capacity(member.size()));
    member
        .read_to_end(&mut bytes)
        .map_err(|e| LibraryError::Archive(format!("failed to extract {}: {}", name, e)))?;

    Ok(ArchiveFile { name, bytes })
}

/// Member names in archive order, directories included
pub fn list_members(bytes: &[u8]) -> Result<Vec<String>, LibraryError> {
    let mut archive = open(bytes)?;
    let mut names = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let member = archive
            .by_index_raw(i)
            .map_err(|e| LibraryError::Archive(e.to_string()))?;
        names.push(member.name().replace('\\', "/"));
    }

    Ok(names)
}

/// Extract every non-directory member
pub fn extract_all(bytes: &[u8]) -> Result<Vec<ArchiveFile>, LibraryError> {
    let names = list_members(bytes)?;
    let mut archive = open(bytes)?;

    let mut files = Vec::new();
    for (i, name) in names.iter().enumerate() {
        if is_directory(name) {
            continue;
        }
        files.push(read_member(&mut archive, i)?);
    }

    tracing::debug!(members = names.len(), files = files.len(), "Extracted archive");
    Ok(files)
}

/// Extract a single member using the lookup order above
pub fn extract_one(bytes: &[u8], requested: &str) -> Result<ArchiveFile, LibraryError> {
    let names = list_members(bytes)?;

    let found = find_member(names.iter().map(String::as_str), requested).ok_or_else(|| {
        LibraryError::NotFound {
            filename: requested.to_string(),
        }
    })?;

    let index = names
        .iter()
        .position(|n| n == found)
        .ok_or_else(|| LibraryError::NotFound {
            filename: requested.to_string(),
        })?;

    let mut archive = open(bytes)?;
    read_member(&mut archive, index)
}
