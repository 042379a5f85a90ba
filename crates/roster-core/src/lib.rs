//! # roster-core
//!
//! The records engine for Roster - THE LOGIC.
//!
//! Students enroll into sections; a section optionally belongs to a subject.
//! The one rule with teeth: a student holds at most one section per subject.
//!
//! ## Layout
//!
//! - `types`: identifiers, records, drafts and errors
//! - `storage`: the `RecordStore` seam with memory and redb backends
//! - `enrollment`: enroll, withdraw and cascading student deletion
//! - `records`: validated CRUD for students, subjects and sections
//! - `session`: `Roster`, one store plus every operation on it
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no logging (the app crate logs)
//! - Every operation receives its store explicitly
//! - Validation completes before the first write

// =============================================================================
// MODULES
// =============================================================================

pub mod enrollment;
pub mod numbering;
pub mod primitives;
pub mod records;
pub mod seed;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{
    ConflictKind, Constraint, Counts, Enrollment, Entity, RosterError, Section, SectionDraft,
    SectionId, StoreError, Student, StudentDraft, StudentId, StudentRecord, StudentSummary,
    Subject, SubjectDraft, SubjectId,
};

pub use seed::{SeedBatch, SeedEnrollment, SeedReport, SeedSection};
pub use session::{Roster, StorageBackend};
pub use storage::{MemoryStore, RecordStore, RedbStore};
