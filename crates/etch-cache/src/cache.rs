//! Cache-subdirectory convention, freshness gate, and read/write of the
//! `.etchc` artifact (spec.md §4.7).
//!
//! Grounded on the donor runtime's load/compile split
//! (`raya-runtime/src/{loader,compile}.rs`): fall back to recompiling
//! whenever a matching cached artifact isn't found or doesn't check out.
//! The donor has no on-disk staleness gate of its own (its `.ryb` files are
//! produced once and loaded verbatim) — the mtime-then-hash freshness check
//! here is this crate's own addition, needed because Etch always compiles
//! from source and only wants to skip recompilation when nothing relevant
//! changed.

use std::fs;
use std::path::{Path, PathBuf};

use etch_bytecode::Module;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

const CACHE_DIR_NAME: &str = ".etch-cache";
const ARTIFACT_EXT: &str = "etchc";

/// SHA-256 of the source text, padded/truncated to the cache format's
/// 32-byte source-hash field (spec.md §6).
pub fn hash_source(source: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(source);
    Module::pad_hash(&digest)
}

/// Where the cached artifact for `source_path` would live:
/// `<parent>/.etch-cache/<file_name>.etchc`.
pub fn cache_path_for(source_path: &Path) -> PathBuf {
    let dir = source_path.parent().unwrap_or_else(|| Path::new(".")).join(CACHE_DIR_NAME);
    let file_name = source_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "source".to_string());
    dir.join(format!("{file_name}.{ARTIFACT_EXT}"))
}

/// Load a cached module for `source_path` if, and only if, it is fresh:
/// the artifact exists, is at least as new as the source file, and its
/// recorded source hash and debug-info flag match what's being requested.
/// Any other outcome (missing, stale, mismatched, corrupt) is `Ok(None)` —
/// only I/O failures on files that *do* exist are surfaced as errors.
pub fn load_if_fresh(source_path: &Path, expected_hash: &[u8; 32], debug_info: bool) -> CacheResult<Option<Module>> {
    let cache_path = cache_path_for(source_path);
    if !cache_path.exists() {
        return Ok(None);
    }

    if let (Ok(source_meta), Ok(cache_meta)) = (fs::metadata(source_path), fs::metadata(&cache_path)) {
        if let (Ok(source_mtime), Ok(cache_mtime)) = (source_meta.modified(), cache_meta.modified()) {
            if cache_mtime < source_mtime {
                return Ok(None);
            }
        }
    }

    let bytes = fs::read(&cache_path).map_err(|source| CacheError::Read { path: cache_path.clone(), source })?;
    let module = match Module::decode(&bytes) {
        Ok(m) => m,
        Err(_) => return Ok(None),
    };

    if &module.source_hash != expected_hash || module.debug_info != debug_info {
        return Ok(None);
    }

    Ok(Some(module))
}

/// Write `module` to the cache slot for `source_path`, creating the
/// `.etch-cache` subdirectory if needed.
pub fn store(source_path: &Path, module: &Module) -> CacheResult<()> {
    let cache_path = cache_path_for(source_path);
    if let Some(dir) = cache_path.parent() {
        fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir { path: dir.to_path_buf(), source })?;
    }
    fs::write(&cache_path, module.encode()).map_err(|source| CacheError::Write { path: cache_path, source })
}

/// Read whatever decodable artifact sits at `source_path`'s cache slot,
/// ignoring freshness — used by diagnostics/tests that want to inspect a
/// cache entry directly rather than go through the staleness gate.
pub fn read_raw(source_path: &Path) -> CacheResult<Module> {
    let cache_path = cache_path_for(source_path);
    let bytes = fs::read(&cache_path).map_err(|source| CacheError::Read { path: cache_path.clone(), source })?;
    Module::decode(&bytes).map_err(|source| CacheError::Corrupt { path: cache_path, source })
}
