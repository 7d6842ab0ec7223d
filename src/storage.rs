//! Page-oriented heap-file storage.
//!
//! A heap file is a flat binary file that is an exact concatenation of
//! fixed-size pages; page `k` occupies the byte range
//! `[k * PAGE_SIZE, (k + 1) * PAGE_SIZE)`. There is no file header or footer,
//! and a trailing partial page is not addressable. Key components:
//!
//! - **HeapPage**: a parsed page — slot-occupancy bitmap plus fixed-width
//!   row slots
//! - **HeapFile**: page-granular file I/O and the cross-page row iterator
//! - **PageCache**: the contract this layer consumes from the external page
//!   cache, with `BufferPool` as a minimal shared implementation

pub mod cache;
pub mod heap_file;
pub mod page;

/// Size of a page in bytes, shared by heap files and the page cache.
pub const PAGE_SIZE: usize = 4096;

pub use cache::{BufferPool, PageCache};
pub use heap_file::{HeapFile, HeapFileIterator};
pub use page::{HeapPage, HeapPageId};
