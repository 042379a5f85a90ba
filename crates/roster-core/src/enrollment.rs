//! # Enrollment Manager
//!
//! Enforces the one rule with invariant content in Roster:
//! a student holds at most one enrollment per subject.
//!
//! Every operation receives the store handle explicitly. Validation runs
//! to completion before the single write, so a rejected call changes
//! nothing. The store's seat index backs the duplicate-subject check, so
//! a write racing past the check is still refused.

use crate::storage::RecordStore;
use crate::{
    ConflictKind, Constraint, Enrollment, Entity, RosterError, Section, SectionId, StoreError,
    StudentId,
};

/// Enroll a student into a section.
///
/// Checks, in order:
/// 1. the section exists, else `NotFound(Section)`
/// 2. the student exists, else `NotFound(Student)`
/// 3. no existing enrollment of the student shares the section's subject,
///    else `Conflict(DuplicateSubjectEnrollment)`. Sections without a
///    subject all share the same (absent) subject.
///
/// then writes the enrollment row.
pub fn enroll<S: RecordStore + ?Sized>(
    store: &mut S,
    student: StudentId,
    section: SectionId,
) -> Result<Enrollment, RosterError> {
    let target = store
        .find_section(section)?
        .ok_or(RosterError::NotFound(Entity::Section))?;
    if store.find_student(student)?.is_none() {
        return Err(RosterError::NotFound(Entity::Student));
    }

    let duplicate = store
        .enrollments_of_student(student)?
        .into_iter()
        .any(|(held, subject)| held != section && subject == target.subject);
    if duplicate {
        return Err(RosterError::Conflict(
            ConflictKind::DuplicateSubjectEnrollment,
        ));
    }

    match store.insert_enrollment(student, section) {
        Ok(()) => Ok(Enrollment::new(student, section)),
        Err(StoreError::Constraint(Constraint::SubjectSeatTaken { .. })) => Err(
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment),
        ),
        Err(StoreError::Constraint(Constraint::AlreadyEnrolled { .. })) => {
            Err(RosterError::Conflict(ConflictKind::AlreadyEnrolled))
        }
        Err(e) => Err(RosterError::Internal(e)),
    }
}

/// Remove a single enrollment.
pub fn withdraw<S: RecordStore + ?Sized>(
    store: &mut S,
    student: StudentId,
    section: SectionId,
) -> Result<(), RosterError> {
    if store.find_student(student)?.is_none() {
        return Err(RosterError::NotFound(Entity::Student));
    }
    if store.find_section(section)?.is_none() {
        return Err(RosterError::NotFound(Entity::Section));
    }
    if !store.delete_enrollment(student, section)? {
        return Err(RosterError::NotFound(Entity::Enrollment));
    }
    Ok(())
}

/// Delete a student together with all of their enrollments.
///
/// The enrollment rows and the student row go in one atomic store call.
/// Any store failure comes back as `Internal`, carrying the typed cause.
/// Returns the number of enrollments removed.
pub fn delete_student<S: RecordStore + ?Sized>(
    store: &mut S,
    student: StudentId,
) -> Result<usize, RosterError> {
    if store.find_student(student)?.is_none() {
        return Err(RosterError::NotFound(Entity::Student));
    }
    store
        .delete_student_cascade(student)
        .map_err(RosterError::Internal)
}

/// The sections a student is enrolled in, in section id order.
pub fn enrollments_of<S: RecordStore + ?Sized>(
    store: &S,
    student: StudentId,
) -> Result<Vec<Section>, RosterError> {
    if store.find_student(student)?.is_none() {
        return Err(RosterError::NotFound(Entity::Student));
    }
    let mut sections = Vec::new();
    for (id, _) in store.enrollments_of_student(student)? {
        if let Some(section) = store.find_section(id)? {
            sections.push(section);
        }
    }
    Ok(sections)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{Student, Subject, SubjectId};

    /// Student 1; subjects 100 and 200; sections 10, 11 (subject 100),
    /// 20 (subject 200) and 30 (no subject).
    fn campus() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .put_student(&Student {
                id: StudentId(1),
                first_name: "Edsger".to_string(),
                last_name: "Dijkstra".to_string(),
                email: "edsger@example.edu".to_string(),
                student_number: "S1a2b3c4d".to_string(),
                course: None,
                age: None,
            })
            .expect("student");
        for id in [100, 200] {
            store
                .put_subject(&Subject {
                    id: SubjectId(id),
                    code: format!("SUB{}", id),
                    description: String::new(),
                })
                .expect("subject");
        }
        for (id, subject) in [(10, Some(100)), (11, Some(100)), (20, Some(200)), (30, None)] {
            store
                .put_section(&Section {
                    id: SectionId(id),
                    name: format!("S-{}", id),
                    subject: subject.map(SubjectId),
                })
                .expect("section");
        }
        store
    }

    #[test]
    fn second_section_of_same_subject_conflicts() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(10)).expect("first");

        let err = enroll(&mut store, StudentId(1), SectionId(11)).expect_err("second");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment)
        ));
    }

    #[test]
    fn sections_of_different_subjects_both_succeed() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(10)).expect("subject 100");
        enroll(&mut store, StudentId(1), SectionId(20)).expect("subject 200");
        assert_eq!(
            store.enrollments_of_student(StudentId(1)).expect("rows").len(),
            2
        );
    }

    #[test]
    fn missing_section_wins_over_missing_student() {
        let mut store = campus();
        let err = enroll(&mut store, StudentId(99), SectionId(99)).expect_err("missing");
        assert!(matches!(err, RosterError::NotFound(Entity::Section)));

        let err = enroll(&mut store, StudentId(99), SectionId(10)).expect_err("missing");
        assert!(matches!(err, RosterError::NotFound(Entity::Student)));
    }

    #[test]
    fn subjectless_sections_conflict_with_each_other() {
        let mut store = campus();
        store
            .put_section(&Section {
                id: SectionId(31),
                name: "S-31".to_string(),
                subject: None,
            })
            .expect("section");
        enroll(&mut store, StudentId(1), SectionId(30)).expect("no subject");
        enroll(&mut store, StudentId(1), SectionId(10)).expect("subject 100");

        let err = enroll(&mut store, StudentId(1), SectionId(31)).expect_err("second subjectless");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment)
        ));
        assert_eq!(
            store.enrollments_of_student(StudentId(1)).expect("rows").len(),
            2
        );
    }

    #[test]
    fn repeating_the_same_pair_is_already_enrolled() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(30)).expect("no subject");

        let err = enroll(&mut store, StudentId(1), SectionId(30)).expect_err("same pair");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::AlreadyEnrolled)
        ));
    }

    #[test]
    fn withdraw_frees_the_subject() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(10)).expect("enroll");
        withdraw(&mut store, StudentId(1), SectionId(10)).expect("withdraw");
        enroll(&mut store, StudentId(1), SectionId(11)).expect("re-enroll");

        let err = withdraw(&mut store, StudentId(1), SectionId(20)).expect_err("not held");
        assert!(matches!(err, RosterError::NotFound(Entity::Enrollment)));
    }

    #[test]
    fn delete_student_reports_removed_enrollments() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(10)).expect("enroll");
        enroll(&mut store, StudentId(1), SectionId(20)).expect("enroll");
        enroll(&mut store, StudentId(1), SectionId(30)).expect("enroll");

        assert_eq!(delete_student(&mut store, StudentId(1)).expect("delete"), 3);
        let counts = store.counts().expect("counts");
        assert_eq!(counts.students, 0);
        assert_eq!(counts.enrollments, 0);
    }

    #[test]
    fn delete_missing_student_writes_nothing() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(10)).expect("enroll");
        let before = store.counts().expect("counts");

        let err = delete_student(&mut store, StudentId(2)).expect_err("missing");
        assert!(matches!(err, RosterError::NotFound(Entity::Student)));
        assert_eq!(store.counts().expect("counts"), before);
    }

    #[test]
    fn enrollments_of_lists_sections() {
        let mut store = campus();
        enroll(&mut store, StudentId(1), SectionId(20)).expect("enroll");
        enroll(&mut store, StudentId(1), SectionId(10)).expect("enroll");

        let names: Vec<String> = enrollments_of(&store, StudentId(1))
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["S-10", "S-20"]);
    }
}
