//! # Data Store
//!
//! The `RecordStore` trait is the seam between the rules in
//! [`crate::enrollment`] / [`crate::records`] and whatever holds the rows.
//!
//! Two backends implement it:
//! - [`MemoryStore`]: BTreeMaps, volatile
//! - [`RedbStore`]: redb tables, ACID and persistent
//!
//! ## Integrity
//!
//! Every backend keeps a *seat* index `(student, Option<subject>) -> section`
//! next to the enrollment rows and updates both in one atomic step.
//! A second enrollment of the same student into the same subject is
//! therefore rejected by the store itself with
//! [`Constraint::SubjectSeatTaken`], no matter who calls it.
//! Sections without a subject all share the `None` seat.
//!
//! [`Constraint::SubjectSeatTaken`]: crate::Constraint::SubjectSeatTaken

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{
    Counts, Entity, Section, SectionId, StoreError, Student, StudentId, Subject, SubjectId,
};

/// Row storage for students, subjects, sections and enrollments.
///
/// Reads take `&self`. Writes take `&mut self` and are atomic: either every
/// row a call touches changes, or none does.
pub trait RecordStore {
    // -------------------------------------------------------------------------
    // Identifiers
    // -------------------------------------------------------------------------

    /// Reserve the next identifier for `kind`. Identifiers are never reused.
    fn allocate_id(&mut self, kind: Entity) -> Result<u64, StoreError>;

    // -------------------------------------------------------------------------
    // Students
    // -------------------------------------------------------------------------

    fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;

    /// Case-insensitive (ASCII) email lookup.
    fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError>;

    fn student_number_taken(&self, number: &str) -> Result<bool, StoreError>;

    fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Insert or overwrite a student row.
    fn put_student(&mut self, student: &Student) -> Result<(), StoreError>;

    /// Remove the student row only. Returns whether a row was removed.
    ///
    /// Fails with `Constraint::StudentHasEnrollments` while enrollments still
    /// reference the student; use [`Self::delete_student_cascade`].
    fn delete_student(&mut self, id: StudentId) -> Result<bool, StoreError>;

    /// Remove every enrollment of the student and the student row in one
    /// atomic unit. Returns the number of enrollments removed.
    fn delete_student_cascade(&mut self, id: StudentId) -> Result<usize, StoreError>;

    // -------------------------------------------------------------------------
    // Subjects
    // -------------------------------------------------------------------------

    fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError>;

    fn list_subjects(&self) -> Result<Vec<Subject>, StoreError>;

    fn put_subject(&mut self, subject: &Subject) -> Result<(), StoreError>;

    /// Remove the subject and detach its sections (`subject = None`).
    /// Their seats move to the `None` seat; if a student already holds
    /// it the write fails with `Constraint::SubjectSeatTaken`.
    /// Returns the number of sections detached.
    fn delete_subject_detaching(&mut self, id: SubjectId) -> Result<usize, StoreError>;

    // -------------------------------------------------------------------------
    // Sections
    // -------------------------------------------------------------------------

    fn find_section(&self, id: SectionId) -> Result<Option<Section>, StoreError>;

    fn list_sections(&self) -> Result<Vec<Section>, StoreError>;

    /// Insert or overwrite a section row.
    ///
    /// When an existing section moves to another subject, the seats of its
    /// enrolled students move with it; if any of them already holds the
    /// new subject the write fails with `Constraint::SubjectSeatTaken`.
    fn put_section(&mut self, section: &Section) -> Result<(), StoreError>;

    /// Remove the section and all of its enrollments atomically.
    /// Returns the number of enrollments removed.
    fn delete_section_cascade(&mut self, id: SectionId) -> Result<usize, StoreError>;

    // -------------------------------------------------------------------------
    // Enrollments
    // -------------------------------------------------------------------------

    /// `(section, subject of that section)` for each enrollment of the student.
    fn enrollments_of_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<(SectionId, Option<SubjectId>)>, StoreError>;

    fn enrollments_of_section(&self, id: SectionId) -> Result<Vec<StudentId>, StoreError>;

    fn is_enrolled(&self, student: StudentId, section: SectionId) -> Result<bool, StoreError>;

    /// Record the enrollment and take the subject seat.
    ///
    /// Rejects missing rows, a repeated pair, and a taken seat.
    fn insert_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<(), StoreError>;

    /// Remove one enrollment and its seat. Returns whether it existed.
    fn delete_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<bool, StoreError>;

    /// Remove every enrollment of the student. Returns the count removed.
    fn delete_enrollments_of_student(&mut self, id: StudentId) -> Result<usize, StoreError>;

    // -------------------------------------------------------------------------
    // Metrics
    // -------------------------------------------------------------------------

    fn counts(&self) -> Result<Counts, StoreError>;
}
