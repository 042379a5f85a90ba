//! # Session Module
//!
//! `Roster` owns one store and exposes every operation on it.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed ACID storage)

use crate::enrollment;
use crate::records;
use crate::seed::{self, SeedBatch, SeedReport};
use crate::storage::{MemoryStore, RecordStore, RedbStore};
use crate::{
    Counts, Enrollment, RosterError, Section, SectionDraft, SectionId, StoreError, Student,
    StudentDraft, StudentId, StudentRecord, StudentSummary, Subject, SubjectDraft, SubjectId,
};
use std::path::Path;

/// Storage backend for a `Roster`.
#[derive(Debug)]
pub enum StorageBackend {
    /// BTreeMap rows (volatile).
    InMemory(MemoryStore),
    /// redb tables (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// The records engine bound to one store.
///
/// Reads take `&self`, writes `&mut self`. Callers sharing a `Roster`
/// across threads must hold an exclusive lock for every write so each
/// check-then-write sequence runs alone.
#[derive(Debug, Default)]
pub struct Roster {
    backend: StorageBackend,
}

impl Roster {
    /// Create an empty in-memory roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a roster over an existing in-memory store.
    #[must_use]
    pub fn with_memory(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Open or create a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Short backend name for status output.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            StorageBackend::InMemory(_) => "memory",
            StorageBackend::Persistent(_) => "redb",
        }
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// The underlying store, read-only.
    #[must_use]
    pub fn store(&self) -> &dyn RecordStore {
        match &self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    /// The underlying store, for writes.
    pub fn store_mut(&mut self) -> &mut dyn RecordStore {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    /// Compact the redb file. No-op for in-memory storage.
    pub fn compact(&mut self) -> Result<(), StoreError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(()),
            StorageBackend::Persistent(store) => store.compact(),
        }
    }

    // =========================================================================
    // ENROLLMENT
    // =========================================================================

    pub fn enroll(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<Enrollment, RosterError> {
        enrollment::enroll(self.store_mut(), student, section)
    }

    pub fn withdraw(&mut self, student: StudentId, section: SectionId) -> Result<(), RosterError> {
        enrollment::withdraw(self.store_mut(), student, section)
    }

    /// Delete a student and their enrollments. Returns the enrollments removed.
    pub fn delete_student(&mut self, student: StudentId) -> Result<usize, RosterError> {
        enrollment::delete_student(self.store_mut(), student)
    }

    pub fn enrollments_of(&self, student: StudentId) -> Result<Vec<Section>, RosterError> {
        enrollment::enrollments_of(self.store(), student)
    }

    // =========================================================================
    // STUDENTS
    // =========================================================================

    pub fn list_students(&self) -> Result<Vec<StudentSummary>, RosterError> {
        records::list_students(self.store())
    }

    pub fn get_student(&self, id: StudentId) -> Result<StudentRecord, RosterError> {
        records::get_student(self.store(), id)
    }

    pub fn create_student(&mut self, draft: &StudentDraft) -> Result<Student, RosterError> {
        records::create_student(self.store_mut(), draft)
    }

    pub fn update_student(
        &mut self,
        id: StudentId,
        draft: &StudentDraft,
    ) -> Result<Student, RosterError> {
        records::update_student(self.store_mut(), id, draft)
    }

    // =========================================================================
    // SUBJECTS
    // =========================================================================

    pub fn list_subjects(&self) -> Result<Vec<Subject>, RosterError> {
        records::list_subjects(self.store())
    }

    pub fn get_subject(&self, id: SubjectId) -> Result<Subject, RosterError> {
        records::get_subject(self.store(), id)
    }

    pub fn create_subject(&mut self, draft: &SubjectDraft) -> Result<Subject, RosterError> {
        records::create_subject(self.store_mut(), draft)
    }

    pub fn update_subject(
        &mut self,
        id: SubjectId,
        draft: &SubjectDraft,
    ) -> Result<Subject, RosterError> {
        records::update_subject(self.store_mut(), id, draft)
    }

    pub fn delete_subject(&mut self, id: SubjectId) -> Result<usize, RosterError> {
        records::delete_subject(self.store_mut(), id)
    }

    // =========================================================================
    // SECTIONS
    // =========================================================================

    pub fn list_sections(&self) -> Result<Vec<Section>, RosterError> {
        records::list_sections(self.store())
    }

    pub fn get_section(&self, id: SectionId) -> Result<Section, RosterError> {
        records::get_section(self.store(), id)
    }

    pub fn create_section(&mut self, draft: &SectionDraft) -> Result<Section, RosterError> {
        records::create_section(self.store_mut(), draft)
    }

    pub fn update_section(
        &mut self,
        id: SectionId,
        draft: &SectionDraft,
    ) -> Result<Section, RosterError> {
        records::update_section(self.store_mut(), id, draft)
    }

    pub fn delete_section(&mut self, id: SectionId) -> Result<usize, RosterError> {
        records::delete_section(self.store_mut(), id)
    }

    // =========================================================================
    // STATUS & BULK LOAD
    // =========================================================================

    pub fn status(&self) -> Result<Counts, RosterError> {
        records::status(self.store())
    }

    pub fn seed(&mut self, batch: &SeedBatch) -> Result<SeedReport, RosterError> {
        seed::apply(self.store_mut(), batch)
    }
}

// =============================================================================
// TESTS
// =============================================================================
