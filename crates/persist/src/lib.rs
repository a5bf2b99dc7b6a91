//! Persistence: opaque snapshot blobs owned by the background runtime.
//!
//! # Invariants
//! - A blob is content-addressed; restoring a blob whose digest does not
//!   match its bytes fails closed.
//! - The foreground never inspects a blob; it only asks for take/restore.

mod snapshot;

pub use snapshot::{SnapshotBlob, SnapshotError};
