//! # Record Administration
//!
//! Create, read, update and delete for students, subjects and sections.
//!
//! Drafts are validated and trimmed before any store call. Deletes that
//! would leave dangling rows go through the store's cascading variants.

use crate::enrollment;
use crate::numbering;
use crate::primitives::{MAX_AGE, MAX_EMAIL_LENGTH, MAX_TEXT_LENGTH, MIN_AGE};
use crate::storage::RecordStore;
use crate::{
    ConflictKind, Constraint, Counts, Entity, RosterError, Section, SectionDraft, SectionId,
    StoreError, Student, StudentDraft, StudentId, StudentRecord, StudentSummary, Subject,
    SubjectDraft, SubjectId,
};

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim `value` and check it is non-empty and within `MAX_TEXT_LENGTH`.
fn required_text(field: &str, value: &str) -> Result<String, RosterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RosterError::Invalid(format!("{} is required", field)));
    }
    if trimmed.len() > MAX_TEXT_LENGTH {
        return Err(RosterError::Invalid(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            trimmed.len(),
            MAX_TEXT_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

/// Like `required_text`, but blank input becomes `None`.
fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, RosterError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text).map(Some),
    }
}

fn email(value: &str) -> Result<String, RosterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RosterError::Invalid("email is required".to_string()));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(RosterError::Invalid(format!(
            "email length {} exceeds maximum {} bytes",
            trimmed.len(),
            MAX_EMAIL_LENGTH
        )));
    }
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(trimmed.to_string())
        }
        _ => Err(RosterError::Invalid(format!(
            "'{}' is not an email address",
            trimmed
        ))),
    }
}

fn age(value: Option<u32>) -> Result<Option<u32>, RosterError> {
    match value {
        Some(years) if !(MIN_AGE..=MAX_AGE).contains(&years) => Err(RosterError::Invalid(
            format!("age {} is outside {}..={}", years, MIN_AGE, MAX_AGE),
        )),
        other => Ok(other),
    }
}

/// Validate a student draft, returning the normalized copy.
pub fn validate_student(draft: &StudentDraft) -> Result<StudentDraft, RosterError> {
    Ok(StudentDraft {
        first_name: required_text("firstName", &draft.first_name)?,
        last_name: required_text("lastName", &draft.last_name)?,
        email: email(&draft.email)?,
        course: optional_text("course", draft.course.as_deref())?,
        age: age(draft.age)?,
    })
}

/// Validate a subject draft, returning the normalized copy.
pub fn validate_subject(draft: &SubjectDraft) -> Result<SubjectDraft, RosterError> {
    Ok(SubjectDraft {
        code: required_text("code", &draft.code)?,
        description: required_text("description", &draft.description)?,
    })
}

/// Validate a section draft, returning the normalized copy.
pub fn validate_section(draft: &SectionDraft) -> Result<SectionDraft, RosterError> {
    Ok(SectionDraft {
        name: required_text("name", &draft.name)?,
        subject: draft.subject,
    })
}

// =============================================================================
// STUDENTS
// =============================================================================

/// All students, in id order, as list rows.
pub fn list_students<S: RecordStore + ?Sized>(
    store: &S,
) -> Result<Vec<StudentSummary>, RosterError> {
    Ok(store
        .list_students()?
        .iter()
        .map(StudentSummary::from)
        .collect())
}

/// One student with the sections they are enrolled in.
pub fn get_student<S: RecordStore + ?Sized>(
    store: &S,
    id: StudentId,
) -> Result<StudentRecord, RosterError> {
    let student = store
        .find_student(id)?
        .ok_or(RosterError::NotFound(Entity::Student))?;
    let sections = enrollment::enrollments_of(store, id)?;
    Ok(StudentRecord { student, sections })
}

/// Write a student row, reporting an email clash the store caught.
fn save_student<S: RecordStore + ?Sized>(
    store: &mut S,
    student: &Student,
) -> Result<(), RosterError> {
    match store.put_student(student) {
        Ok(()) => Ok(()),
        Err(StoreError::Constraint(Constraint::EmailTaken { .. })) => {
            Err(RosterError::Conflict(ConflictKind::DuplicateEmail))
        }
        Err(e) => Err(RosterError::Internal(e)),
    }
}

/// Create a student. The email must be unused; the student number is
/// generated here and never changes afterwards.
pub fn create_student<S: RecordStore + ?Sized>(
    store: &mut S,
    draft: &StudentDraft,
) -> Result<Student, RosterError> {
    let draft = validate_student(draft)?;
    if store.find_student_by_email(&draft.email)?.is_some() {
        return Err(RosterError::Conflict(ConflictKind::DuplicateEmail));
    }

    let id = StudentId(store.allocate_id(Entity::Student)?);
    let student_number = numbering::assign(store, id, &draft.email)?;
    let student = Student {
        id,
        first_name: draft.first_name,
        last_name: draft.last_name,
        email: draft.email,
        student_number,
        course: draft.course,
        age: draft.age,
    };
    save_student(store, &student)?;
    Ok(student)
}

/// Update a student's editable fields. The student number is kept.
pub fn update_student<S: RecordStore + ?Sized>(
    store: &mut S,
    id: StudentId,
    draft: &StudentDraft,
) -> Result<Student, RosterError> {
    let current = store
        .find_student(id)?
        .ok_or(RosterError::NotFound(Entity::Student))?;
    let draft = validate_student(draft)?;
    if let Some(other) = store.find_student_by_email(&draft.email)?
        && other.id != id
    {
        return Err(RosterError::Conflict(ConflictKind::DuplicateEmail));
    }

    let student = Student {
        id,
        first_name: draft.first_name,
        last_name: draft.last_name,
        email: draft.email,
        student_number: current.student_number,
        course: draft.course,
        age: draft.age,
    };
    save_student(store, &student)?;
    Ok(student)
}

// =============================================================================
// SUBJECTS
// =============================================================================

pub fn list_subjects<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Subject>, RosterError> {
    Ok(store.list_subjects()?)
}

pub fn get_subject<S: RecordStore + ?Sized>(
    store: &S,
    id: SubjectId,
) -> Result<Subject, RosterError> {
    store
        .find_subject(id)?
        .ok_or(RosterError::NotFound(Entity::Subject))
}

pub fn create_subject<S: RecordStore + ?Sized>(
    store: &mut S,
    draft: &SubjectDraft,
) -> Result<Subject, RosterError> {
    let draft = validate_subject(draft)?;
    let subject = Subject {
        id: SubjectId(store.allocate_id(Entity::Subject)?),
        code: draft.code,
        description: draft.description,
    };
    store.put_subject(&subject)?;
    Ok(subject)
}

pub fn update_subject<S: RecordStore + ?Sized>(
    store: &mut S,
    id: SubjectId,
    draft: &SubjectDraft,
) -> Result<Subject, RosterError> {
    if store.find_subject(id)?.is_none() {
        return Err(RosterError::NotFound(Entity::Subject));
    }
    let draft = validate_subject(draft)?;
    let subject = Subject {
        id,
        code: draft.code,
        description: draft.description,
    };
    store.put_subject(&subject)?;
    Ok(subject)
}

/// Delete a subject. Its sections stay, detached from any subject.
/// Returns the number of sections detached.
///
/// Refused when a student of one of those sections already holds a
/// subjectless section, since detaching would give them two.
pub fn delete_subject<S: RecordStore + ?Sized>(
    store: &mut S,
    id: SubjectId,
) -> Result<usize, RosterError> {
    if store.find_subject(id)?.is_none() {
        return Err(RosterError::NotFound(Entity::Subject));
    }
    match store.delete_subject_detaching(id) {
        Ok(detached) => Ok(detached),
        Err(StoreError::Constraint(Constraint::SubjectSeatTaken { .. })) => Err(
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment),
        ),
        Err(e) => Err(RosterError::Internal(e)),
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

pub fn list_sections<S: RecordStore + ?Sized>(store: &S) -> Result<Vec<Section>, RosterError> {
    Ok(store.list_sections()?)
}

pub fn get_section<S: RecordStore + ?Sized>(
    store: &S,
    id: SectionId,
) -> Result<Section, RosterError> {
    store
        .find_section(id)?
        .ok_or(RosterError::NotFound(Entity::Section))
}

fn require_subject<S: RecordStore + ?Sized>(
    store: &S,
    subject: Option<SubjectId>,
) -> Result<(), RosterError> {
    if let Some(id) = subject
        && store.find_subject(id)?.is_none()
    {
        return Err(RosterError::NotFound(Entity::Subject));
    }
    Ok(())
}

pub fn create_section<S: RecordStore + ?Sized>(
    store: &mut S,
    draft: &SectionDraft,
) -> Result<Section, RosterError> {
    let draft = validate_section(draft)?;
    require_subject(store, draft.subject)?;
    let section = Section {
        id: SectionId(store.allocate_id(Entity::Section)?),
        name: draft.name,
        subject: draft.subject,
    };
    store.put_section(&section)?;
    Ok(section)
}

/// Update a section. Moving it to another subject is refused when one of
/// its students already holds a section of that subject.
pub fn update_section<S: RecordStore + ?Sized>(
    store: &mut S,
    id: SectionId,
    draft: &SectionDraft,
) -> Result<Section, RosterError> {
    if store.find_section(id)?.is_none() {
        return Err(RosterError::NotFound(Entity::Section));
    }
    let draft = validate_section(draft)?;
    require_subject(store, draft.subject)?;

    let section = Section {
        id,
        name: draft.name,
        subject: draft.subject,
    };
    match store.put_section(&section) {
        Ok(()) => Ok(section),
        Err(StoreError::Constraint(Constraint::SubjectSeatTaken { .. })) => Err(
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment),
        ),
        Err(e) => Err(RosterError::Internal(e)),
    }
}

/// Delete a section and its enrollments. Returns the enrollments removed.
pub fn delete_section<S: RecordStore + ?Sized>(
    store: &mut S,
    id: SectionId,
) -> Result<usize, RosterError> {
    if store.find_section(id)?.is_none() {
        return Err(RosterError::NotFound(Entity::Section));
    }
    Ok(store.delete_section_cascade(id)?)
}

/// Row counts for status reporting.
pub fn status<S: RecordStore + ?Sized>(store: &S) -> Result<Counts, RosterError> {
    Ok(store.counts()?)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn draft(first: &str, email: &str) -> StudentDraft {
        StudentDraft {
            first_name: first.to_string(),
            last_name: "Student".to_string(),
            email: email.to_string(),
            course: Some("  ".to_string()),
            age: Some(19),
        }
    }

    #[test]
    fn create_student_trims_and_numbers() {
        let mut store = MemoryStore::new();
        let student = create_student(&mut store, &draft("  Mary ", " mary@example.edu "))
            .expect("create");

        assert_eq!(student.id, StudentId(1));
        assert_eq!(student.first_name, "Mary");
        assert_eq!(student.email, "mary@example.edu");
        assert_eq!(student.course, None);
        assert_eq!(student.student_number, numbering::derive(StudentId(1), "mary@example.edu", 0));
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let mut store = MemoryStore::new();
        create_student(&mut store, &draft("Mary", "mary@example.edu")).expect("create");

        let err = create_student(&mut store, &draft("Other", "MARY@example.edu"))
            .expect_err("duplicate");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateEmail)
        ));
        assert_eq!(store.counts().expect("counts").students, 1);
    }

    #[test]
    fn update_keeps_student_number_and_allows_own_email() {
        let mut store = MemoryStore::new();
        let created =
            create_student(&mut store, &draft("Mary", "mary@example.edu")).expect("create");

        let mut changed = draft("Maria", "mary@example.edu");
        changed.age = Some(20);
        let updated = update_student(&mut store, created.id, &changed).expect("update");

        assert_eq!(updated.first_name, "Maria");
        assert_eq!(updated.student_number, created.student_number);
    }

    #[test]
    fn update_rejects_email_of_another_student() {
        let mut store = MemoryStore::new();
        create_student(&mut store, &draft("Mary", "mary@example.edu")).expect("create");
        let bob = create_student(&mut store, &draft("Bob", "bob@example.edu")).expect("create");

        let err = update_student(&mut store, bob.id, &draft("Bob", "mary@example.edu"))
            .expect_err("taken");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateEmail)
        ));
    }

    #[test]
    fn invalid_drafts_are_rejected() {
        let mut store = MemoryStore::new();
        for bad in [
            draft("", "x@example.edu"),
            draft("Ok", "not-an-email"),
            draft("Ok", "@example.edu"),
            StudentDraft {
                age: Some(0),
                ..draft("Ok", "ok@example.edu")
            },
            draft(&"n".repeat(MAX_TEXT_LENGTH + 1), "long@example.edu"),
        ] {
            let err = create_student(&mut store, &bad).expect_err("invalid");
            assert!(matches!(err, RosterError::Invalid(_)), "{:?}", bad);
        }
        assert_eq!(store.counts().expect("counts").students, 0);
    }

    #[test]
    fn section_requires_existing_subject() {
        let mut store = MemoryStore::new();
        let err = create_section(
            &mut store,
            &SectionDraft {
                name: "A".to_string(),
                subject: Some(SubjectId(5)),
            },
        )
        .expect_err("missing subject");
        assert!(matches!(err, RosterError::NotFound(Entity::Subject)));
    }

    #[test]
    fn moving_section_onto_held_subject_conflicts() {
        let mut store = MemoryStore::new();
        let student =
            create_student(&mut store, &draft("Mary", "mary@example.edu")).expect("student");
        let math = create_subject(
            &mut store,
            &SubjectDraft {
                code: "MATH".to_string(),
                description: "Mathematics".to_string(),
            },
        )
        .expect("subject");
        let art = create_subject(
            &mut store,
            &SubjectDraft {
                code: "ART".to_string(),
                description: "Art".to_string(),
            },
        )
        .expect("subject");
        let m1 = create_section(
            &mut store,
            &SectionDraft {
                name: "M1".to_string(),
                subject: Some(math.id),
            },
        )
        .expect("section");
        let a1 = create_section(
            &mut store,
            &SectionDraft {
                name: "A1".to_string(),
                subject: Some(art.id),
            },
        )
        .expect("section");
        enrollment::enroll(&mut store, student.id, m1.id).expect("enroll");
        enrollment::enroll(&mut store, student.id, a1.id).expect("enroll");

        let err = update_section(
            &mut store,
            a1.id,
            &SectionDraft {
                name: "A1".to_string(),
                subject: Some(math.id),
            },
        )
        .expect_err("duplicate");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment)
        ));
    }

    #[test]
    fn deleting_subject_keeps_sections() {
        let mut store = MemoryStore::new();
        let subject = create_subject(
            &mut store,
            &SubjectDraft {
                code: "BIO".to_string(),
                description: "Biology".to_string(),
            },
        )
        .expect("subject");
        let section = create_section(
            &mut store,
            &SectionDraft {
                name: "B1".to_string(),
                subject: Some(subject.id),
            },
        )
        .expect("section");

        assert_eq!(delete_subject(&mut store, subject.id).expect("delete"), 1);
        assert_eq!(get_section(&store, section.id).expect("get").subject, None);
        assert!(matches!(
            get_subject(&store, subject.id),
            Err(RosterError::NotFound(Entity::Subject))
        ));
    }
}
