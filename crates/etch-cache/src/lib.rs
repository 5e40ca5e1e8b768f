//! On-disk bytecode cache for Etch (spec.md §4.7).
//!
//! A compiled [`etch_bytecode::Module`] is kept in a `.etch-cache/`
//! subdirectory next to its source file, named `<source file>.etchc`. A
//! cached artifact is reused only when it is at least as new as the source
//! file and its recorded source hash and debug-info flag both match what
//! the caller is asking to build — anything else is treated as a cache miss
//! rather than an error, leaving recompilation to the caller.

mod cache;
mod error;

pub use cache::{cache_path_for, hash_source, load_if_fresh, read_raw, store};
pub use error::{CacheError, CacheResult};
