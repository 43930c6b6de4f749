//! Archive assembly.
//!
//! Serializes the stub, the entry table, every manifest entry's content
//! and the signature trailer. The artifact is staged as `<dest>.tmp` in
//! the destination directory and renamed into place only once fully
//! written and synced, so a crash never leaves a partial file at the
//! destination path.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use flate2::Crc;
use sha2::{Digest, Sha256};

use super::{
    stub_code, ArchiveEntry, ENTRY_PERM_MASK, FLAG_SIGNED, MANIFEST_API_VERSION, SIG_MAGIC,
    SIG_SHA256,
};
use crate::error::BuildError;
use crate::manifest::FileManifest;

/// An entry whose content lives in memory rather than on disk: the
/// version-stamped entry script, which must never be re-read from disk
/// after mutation.
#[derive(Debug)]
pub struct MemoryEntry {
    /// In-archive path; also what the stub requires.
    pub path: String,
    pub content: Vec<u8>,
    pub mode: u32,
    pub timestamp: u32,
}

struct EntryPlan {
    meta: ArchiveEntry,
    source: EntrySource,
}

enum EntrySource {
    Disk(PathBuf),
    Memory(Vec<u8>),
}

/// Write the finished container to `destination`.
///
/// Disk entries resolve against the manifest's base directory and keep
/// their manifest-relative path inside the archive; the memory entry is
/// appended last and the stub is generated for it. The output file's
/// permission bits end up at `0o777` minus the active umask.
pub fn assemble(
    destination: &Path,
    alias: &str,
    manifest: &FileManifest,
    embedded: MemoryEntry,
) -> Result<(), BuildError> {
    let wrap = |e: io::Error| BuildError::archive_write(destination, e.to_string());

    let mut entries = Vec::with_capacity(manifest.len() + 1);
    for rel in manifest.iter() {
        // The embedded entry always wins over a same-named disk file.
        if rel == embedded.path {
            continue;
        }
        let path = manifest.resolve(rel);
        entries.push(plan_disk_entry(rel, &path)?);
    }
    entries.push(EntryPlan {
        meta: ArchiveEntry {
            path: embedded.path.clone(),
            size: embedded.content.len() as u32,
            timestamp: embedded.timestamp,
            crc: crc32(&embedded.content),
            mode: embedded.mode & ENTRY_PERM_MASK,
        },
        source: EntrySource::Memory(embedded.content),
    });

    let stub = stub_code(alias, &embedded.path);
    let table = entry_table(alias, &entries);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    let staging = staging_path(destination);
    if staging.exists() {
        fs::remove_file(&staging).map_err(wrap)?;
    }

    let file = File::create(&staging).map_err(wrap)?;
    let mut writer = HashingWriter::new(BufWriter::new(file));

    writer.write_all(stub.as_bytes()).map_err(wrap)?;
    writer
        .write_all(&(table.len() as u32).to_le_bytes())
        .map_err(wrap)?;
    writer.write_all(&table).map_err(wrap)?;

    for entry in &entries {
        match &entry.source {
            EntrySource::Disk(path) => {
                let mut source = File::open(path)
                    .map_err(|e| BuildError::filesystem(path.clone(), e))?;
                io::copy(&mut source, &mut writer).map_err(wrap)?;
            }
            EntrySource::Memory(content) => {
                writer.write_all(content).map_err(wrap)?;
            }
        }
    }

    let (mut inner, digest) = writer.finish();
    inner.write_all(&digest).map_err(wrap)?;
    inner.write_all(&SIG_SHA256.to_le_bytes()).map_err(wrap)?;
    inner.write_all(SIG_MAGIC).map_err(wrap)?;

    let file = inner
        .into_inner()
        .map_err(|e| BuildError::archive_write(destination, e.to_string()))?;
    file.sync_all().map_err(wrap)?;
    drop(file);

    let mode = 0o777 & !current_umask();
    fs::set_permissions(&staging, fs::Permissions::from_mode(mode)).map_err(wrap)?;
    fs::rename(&staging, destination).map_err(wrap)?;

    Ok(())
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    destination.with_file_name(name)
}

fn plan_disk_entry(rel: &str, path: &Path) -> Result<EntryPlan, BuildError> {
    let meta = fs::metadata(path).map_err(|e| BuildError::filesystem(path.to_path_buf(), e))?;
    let timestamp = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    let mut file = File::open(path).map_err(|e| BuildError::filesystem(path.to_path_buf(), e))?;
    let mut crc = Crc::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| BuildError::filesystem(path.to_path_buf(), e))?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
    }

    Ok(EntryPlan {
        meta: ArchiveEntry {
            path: rel.to_string(),
            size: meta.len() as u32,
            timestamp,
            crc: crc.sum(),
            mode: meta.permissions().mode() & ENTRY_PERM_MASK,
        },
        source: EntrySource::Disk(path.to_path_buf()),
    })
}

/// Serialize the entry table (everything the 4-byte length prefix
/// covers): entry count, format version, global flags, alias, global
/// metadata, then one record per file.
fn entry_table(alias: &str, entries: &[EntryPlan]) -> Vec<u8> {
    let mut table = Vec::new();
    table.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    table.extend_from_slice(&MANIFEST_API_VERSION.to_le_bytes());
    table.extend_from_slice(&FLAG_SIGNED.to_le_bytes());
    table.extend_from_slice(&(alias.len() as u32).to_le_bytes());
    table.extend_from_slice(alias.as_bytes());
    table.extend_from_slice(&0u32.to_le_bytes()); // no global metadata

    for entry in entries {
        let meta = &entry.meta;
        table.extend_from_slice(&(meta.path.len() as u32).to_le_bytes());
        table.extend_from_slice(meta.path.as_bytes());
        table.extend_from_slice(&meta.size.to_le_bytes());
        table.extend_from_slice(&meta.timestamp.to_le_bytes());
        // Stored uncompressed: compressed size equals the real size.
        table.extend_from_slice(&meta.size.to_le_bytes());
        table.extend_from_slice(&meta.crc.to_le_bytes());
        table.extend_from_slice(&meta.mode.to_le_bytes());
        table.extend_from_slice(&0u32.to_le_bytes()); // no entry metadata
    }

    table
}

fn crc32(content: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(content);
    crc.sum()
}

#[cfg(unix)]
fn current_umask() -> u32 {
    // umask(2) can only be read by setting it; set-and-restore.
    unsafe {
        let mask = libc::umask(0);
        libc::umask(mask);
        mask as u32
    }
}

struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> (W, [u8; 32]) {
        (self.inner, self.hasher.finalize().into())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
