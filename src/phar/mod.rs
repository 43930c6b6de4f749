//! The executable archive container (PHAR format).
//!
//! One output file: a PHP bootstrap stub, a little-endian entry table,
//! the concatenated file contents, and a trailing SHA-256 signature. The
//! stub makes the artifact self-executing; the delimiter token after it
//! marks the boundary between prologue and binary payload for every
//! reader of the format.

mod reader;
mod writer;

pub use reader::{list_contents, read_info, ArchiveInfo};
pub use writer::{assemble, MemoryEntry};

use crate::stamp::php_string_literal;

/// Token separating the executable prologue from the binary payload.
/// The trailing `?>\r\n` is part of the on-disk boundary.
pub const STUB_DELIMITER: &str = "__HALT_COMPILER(); ?>\r\n";

/// Entry-table format version 1.1.1, nibble-packed.
pub const MANIFEST_API_VERSION: u16 = 0x1110;

/// Global flag: the archive carries a signature trailer.
pub const FLAG_SIGNED: u32 = 0x0001_0000;

/// Signature trailer type: SHA-256.
pub const SIG_SHA256: u32 = 0x0003;

/// Magic closing the signature trailer.
pub const SIG_MAGIC: &[u8; 4] = b"GBMB";

/// Permission bits stored in an entry's flags word.
pub const ENTRY_PERM_MASK: u32 = 0x0000_01ff;

/// One stored file as described by the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub size: u32,
    pub timestamp: u32,
    pub crc: u32,
    pub mode: u32,
}

/// The bootstrap stub for `app_name`, loading `entry_script` from inside
/// the container.
///
/// Reproduced byte-for-byte for downstream tooling that inspects the
/// artifact: map the container's logical name, prepend its virtual root
/// to the include path, require the embedded entry script, halt.
pub fn stub_code(app_name: &str, entry_script: &str) -> String {
    format!(
        "#!/usr/bin/env php\n<?php\nPhar::mapPhar({});\nset_include_path({} . get_include_path());\nrequire({});\n{}",
        php_string_literal(app_name),
        php_string_literal(&format!("phar://{app_name}/")),
        php_string_literal(entry_script),
        STUB_DELIMITER,
    )
}
