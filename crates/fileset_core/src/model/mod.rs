//! Domain model for file sets, their parent works, and version history.
//!
//! # Responsibility
//! - Define canonical data structures used by authorization and mutation.
//! - Keep request classification pure so callers can test it in isolation.
//!
//! # Invariants
//! - A file set belongs to zero or one parent work.
//! - Version labels are unique per file set and compared by equality only.
//! - Indexed projections are read-only snapshots and may lag the authority.

pub mod file_set;
pub mod mutation;
pub mod principal;
pub mod projection;
pub mod version;
