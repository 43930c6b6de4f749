//! Archive inspection.
//!
//! Re-opens a finished container, locates the stub delimiter, parses the
//! entry table and verifies the signature trailer. Listing is the only
//! extraction surface; it exists so builds can be checked entry-for-entry.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{ArchiveEntry, FLAG_SIGNED, SIG_MAGIC, SIG_SHA256, STUB_DELIMITER};
use crate::error::BuildError;

/// Parsed container: stub, alias and the full entry table.
#[derive(Debug)]
pub struct ArchiveInfo {
    pub stub: Vec<u8>,
    pub alias: String,
    pub flags: u32,
    pub entries: Vec<ArchiveEntry>,
}

/// Parse the container at `path`, verifying the delimiter, the entry
/// table and the signature.
pub fn read_info(path: &Path) -> Result<ArchiveInfo, BuildError> {
    let bytes = fs::read(path).map_err(|e| BuildError::archive_read(path, e.to_string()))?;
    let fail = |message: &str| BuildError::archive_read(path, message);

    let delimiter = STUB_DELIMITER.as_bytes();
    let stub_end = find(&bytes, delimiter)
        .ok_or_else(|| fail("bootstrap delimiter not found"))?
        + delimiter.len();
    let stub = bytes[..stub_end].to_vec();

    let mut cursor = &bytes[stub_end..];
    let table_len = take_u32(&mut cursor).ok_or_else(|| fail("truncated entry table length"))?;
    if cursor.len() < table_len as usize {
        return Err(fail("entry table extends past end of file"));
    }
    let mut table = &cursor[..table_len as usize];

    let entry_count = take_u32(&mut table).ok_or_else(|| fail("truncated entry count"))?;
    let _api_version = take_u16(&mut table).ok_or_else(|| fail("truncated format version"))?;
    let flags = take_u32(&mut table).ok_or_else(|| fail("truncated flags"))?;
    let alias_len = take_u32(&mut table).ok_or_else(|| fail("truncated alias length"))?;
    let alias = take_bytes(&mut table, alias_len as usize)
        .ok_or_else(|| fail("truncated alias"))?;
    let alias = String::from_utf8_lossy(alias).into_owned();
    let metadata_len = take_u32(&mut table).ok_or_else(|| fail("truncated metadata length"))?;
    take_bytes(&mut table, metadata_len as usize).ok_or_else(|| fail("truncated metadata"))?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    let mut content_total: u64 = 0;
    for _ in 0..entry_count {
        let path_len = take_u32(&mut table).ok_or_else(|| fail("truncated entry path length"))?;
        let entry_path = take_bytes(&mut table, path_len as usize)
            .ok_or_else(|| fail("truncated entry path"))?;
        let entry_path = String::from_utf8_lossy(entry_path).into_owned();
        let size = take_u32(&mut table).ok_or_else(|| fail("truncated entry size"))?;
        let timestamp = take_u32(&mut table).ok_or_else(|| fail("truncated entry timestamp"))?;
        let compressed = take_u32(&mut table).ok_or_else(|| fail("truncated entry size"))?;
        let crc = take_u32(&mut table).ok_or_else(|| fail("truncated entry checksum"))?;
        let mode = take_u32(&mut table).ok_or_else(|| fail("truncated entry flags"))?;
        let entry_meta_len =
            take_u32(&mut table).ok_or_else(|| fail("truncated entry metadata"))?;
        take_bytes(&mut table, entry_meta_len as usize)
            .ok_or_else(|| fail("truncated entry metadata"))?;

        if compressed != size {
            return Err(fail("compressed entries are not supported"));
        }
        content_total += size as u64;
        entries.push(ArchiveEntry {
            path: entry_path,
            size,
            timestamp,
            crc,
            mode,
        });
    }

    let contents_start = stub_end + 4 + table_len as usize;
    let mut contents_end = bytes.len();
    if flags & FLAG_SIGNED != 0 {
        // hash(32) + sig type(4) + magic(4)
        if bytes.len() < contents_start + 40 {
            return Err(fail("truncated signature trailer"));
        }
        contents_end = bytes.len() - 40;
        if &bytes[bytes.len() - 4..] != SIG_MAGIC {
            return Err(fail("signature magic missing"));
        }
        let sig_type = u32::from_le_bytes(
            bytes[bytes.len() - 8..bytes.len() - 4].try_into().unwrap(),
        );
        if sig_type != SIG_SHA256 {
            return Err(fail("unsupported signature type"));
        }
        let stored = &bytes[contents_end..contents_end + 32];
        let computed = Sha256::digest(&bytes[..contents_end]);
        if stored != computed.as_slice() {
            return Err(fail("signature mismatch"));
        }
    }

    if content_total != (contents_end - contents_start) as u64 {
        return Err(fail("entry sizes do not match payload length"));
    }

    Ok(ArchiveInfo {
        stub,
        alias,
        flags,
        entries,
    })
}

/// Every stored path, in table order. The `listArchiveContents` surface.
pub fn list_contents(path: &Path) -> Result<Vec<String>, BuildError> {
    let info = read_info(path)?;
    Ok(info.entries.into_iter().map(|e| e.path).collect())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn take_u32(buf: &mut &[u8]) -> Option<u32> {
    let bytes = take_bytes(buf, 4)?;
    Some(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn take_u16(buf: &mut &[u8]) -> Option<u16> {
    let bytes = take_bytes(buf, 2)?;
    Some(u16::from_le_bytes(bytes.try_into().unwrap()))
}

fn take_bytes<'a>(buf: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    if buf.len() < len {
        return None;
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Some(head)
}
