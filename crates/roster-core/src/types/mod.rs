//! # Core Type Definitions
//!
//! This module contains all core types for the Roster records engine:
//! - Identifiers (`StudentId`, `SubjectId`, `SectionId`)
//! - Records (`Student`, `Subject`, `Section`, `Enrollment`)
//! - Drafts submitted by administrative requests
//! - Read projections (`StudentSummary`, `StudentRecord`, `Counts`)
//! - Error types (`RosterError`, `StoreError`)
//!
//! ## Ordering Guarantees
//!
//! Identifiers implement `Ord` so that every store lists records in
//! ascending id order through `BTreeMap`/`BTreeSet`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a student row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub u64);

/// Identifier of a subject row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

/// Identifier of a section row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of record a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Entity {
    Student,
    Subject,
    Section,
    Enrollment,
}

impl Entity {
    /// Human-readable name, as used in API messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Subject => "Subject",
            Self::Section => "Section",
            Self::Enrollment => "Enrollment",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A student.
///
/// `student_number` is assigned once at creation and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: String,
    pub course: Option<String>,
    pub age: Option<u32>,
}

impl Student {
    /// `"{first_name} {last_name}"`. Never stored.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An academic course, independent of scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub code: String,
    pub description: String,
}

/// A scheduled offering of a subject.
///
/// `subject` is `None` while the section is detached, e.g. after its
/// subject was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub subject: Option<SubjectId>,
}

/// A student holding a place in a section.
///
/// The pair is the identity; there is no separate enrollment id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Enrollment {
    pub student: StudentId,
    pub section: SectionId,
}

impl Enrollment {
    #[must_use]
    pub const fn new(student: StudentId, section: SectionId) -> Self {
        Self { student, section }
    }
}

// =============================================================================
// DRAFTS (administrative input)
// =============================================================================

/// Fields an administrator supplies when creating or updating a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: Option<String>,
    pub age: Option<u32>,
}

/// Fields for creating or updating a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDraft {
    pub code: String,
    pub description: String,
}

/// Fields for creating or updating a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    pub name: String,
    pub subject: Option<SubjectId>,
}

// =============================================================================
// READ PROJECTIONS
// =============================================================================

/// Flattened student row used by list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: StudentId,
    pub full_name: String,
    pub email: String,
    pub student_number: String,
    pub course: Option<String>,
    pub age: Option<u32>,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            full_name: student.full_name(),
            email: student.email.clone(),
            student_number: student.student_number.clone(),
            course: student.course.clone(),
            age: student.age,
        }
    }
}

/// A student together with the sections they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student: Student,
    pub sections: Vec<Section>,
}

/// Row counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub students: usize,
    pub subjects: usize,
    pub sections: usize,
    pub enrollments: usize,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Business-rule conflicts reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The student already holds a section of the same subject.
    DuplicateSubjectEnrollment,
    /// The student already holds this exact section.
    AlreadyEnrolled,
    /// Another student already uses the email address.
    DuplicateEmail,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DuplicateSubjectEnrollment => "duplicate-subject-enrollment",
            Self::AlreadyEnrolled => "already-enrolled",
            Self::DuplicateEmail => "duplicate-email",
        })
    }
}

/// Integrity rules a store refuses to break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Constraint {
    #[error("student {0} does not exist")]
    MissingStudent(StudentId),

    #[error("section {0} does not exist")]
    MissingSection(SectionId),

    #[error("subject {0} does not exist")]
    MissingSubject(SubjectId),

    #[error("student {student} is already enrolled in section {section}")]
    AlreadyEnrolled {
        student: StudentId,
        section: SectionId,
    },

    /// The `(student, subject)` seat is held by another section.
    /// `subject: None` is the seat shared by all subjectless sections.
    #[error("student {student} already holds section {held} of the same subject")]
    SubjectSeatTaken {
        student: StudentId,
        subject: Option<SubjectId>,
        held: SectionId,
    },

    /// Another student already uses the email (compared ASCII case-insensitively).
    #[error("email {email} is already used by student {held}")]
    EmailTaken { email: String, held: StudentId },

    #[error("student number {number} is already held by student {held}")]
    StudentNumberTaken { number: String, held: StudentId },

    /// Enrollments still reference the student.
    #[error("student {0} still has {1} enrollment(s)")]
    StudentHasEnrollments(StudentId, usize),

    #[error("no free student number after {0} attempts")]
    StudentNumberExhausted(u32),
}

/// Failures raised by a Data Store.
///
/// Constraint violations are kept apart from I/O so callers can tell a
/// rejected write from a broken disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Constraint(Constraint),

    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("row encoding error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the store rejected the write on integrity grounds.
    #[must_use]
    pub const fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}

impl From<Constraint> for StoreError {
    fn from(constraint: Constraint) -> Self {
        Self::Constraint(constraint)
    }
}

/// Errors returned by Roster operations.
///
/// - `NotFound`, `Conflict` and `Invalid` are detected before any write
/// - `Internal` wraps the store failure so it can be logged; the HTTP
///   surface only ever shows a generic message for it
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("internal error: {0}")]
    Internal(#[from] StoreError),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ada() -> Student {
        Student {
            id: StudentId(1),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.edu".to_string(),
            student_number: "S0123abcd".to_string(),
            course: Some("Mathematics".to_string()),
            age: None,
        }
    }

    #[test]
    fn full_name_joins_first_and_last() {
        assert_eq!(ada().full_name(), "Ada Lovelace");
    }

    #[test]
    fn summary_projects_student_fields() {
        let summary = StudentSummary::from(&ada());
        assert_eq!(summary.id, StudentId(1));
        assert_eq!(summary.full_name, "Ada Lovelace");
        assert_eq!(summary.course.as_deref(), Some("Mathematics"));
        assert_eq!(summary.age, None);
    }

    #[test]
    fn enrollment_orders_by_student_then_section() {
        let mut rows = vec![
            Enrollment::new(StudentId(2), SectionId(1)),
            Enrollment::new(StudentId(1), SectionId(9)),
            Enrollment::new(StudentId(1), SectionId(3)),
        ];
        rows.sort();
        assert_eq!(rows[0], Enrollment::new(StudentId(1), SectionId(3)));
        assert_eq!(rows[2], Enrollment::new(StudentId(2), SectionId(1)));
    }

    #[test]
    fn store_error_distinguishes_constraint_from_io() {
        let rejected = StoreError::from(Constraint::MissingStudent(StudentId(4)));
        assert!(rejected.is_constraint());
        assert!(!StoreError::Io("disk full".to_string()).is_constraint());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = RosterError::NotFound(Entity::Section);
        assert_eq!(err.to_string(), "Section not found");
    }
}
