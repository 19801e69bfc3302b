//! Mutation layer over duplicate groups.
//!
//! The only code allowed to delete or rename files backing a
//! [`FingerprintRecord`](crate::duplicates::FingerprintRecord). Every
//! operation re-checks the live filesystem immediately before acting and
//! holds a per-path lock while it mutates.
//!
//! # Deletion
//!
//! - Move to system trash (default, recoverable)
//! - Permanent deletion (requires explicit configuration)
//! - Batch operations that count failures instead of aborting
//!
//! ```no_run
//! use mediadupe::actions::{delete_selected, DeleteConfig};
//! # let selected: Vec<mediadupe::duplicates::FingerprintRecord> = Vec::new();
//!
//! let report = delete_selected(&selected, &DeleteConfig::default());
//! assert_eq!(report.total_count(), selected.len());
//! ```
//!
//! # Rename
//!
//! Renames stay within the member's directory and never overwrite an
//! existing file.

pub mod delete;
pub mod locks;
pub mod rename;

pub use delete::{
    delete_group_selection, delete_record, delete_selected, delete_selected_with,
    validate_preserves_copy, DeleteConfig, DeleteError, DeleteProgressCallback, DeleteReport,
};
pub use locks::{PathGuard, PathLocks};
pub use rename::{rename, rename_member, rename_with, validate_filename, RenameError};
