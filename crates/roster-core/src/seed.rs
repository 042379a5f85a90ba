//! # Seed Batches
//!
//! Bulk loading of subjects, sections, students and enrollments.
//!
//! Rows inside a batch refer to each other by natural keys (subject code,
//! section name, student email) since ids are only known after insertion.
//! Each row goes through the same operation a single request would use, so
//! validation and the one-seat-per-subject rule apply unchanged.
//!
//! Natural keys must be unique within a batch; a repeated subject code,
//! section name or student email rejects the whole batch before any write.

use crate::enrollment;
use crate::primitives::MAX_SEED_RECORDS;
use crate::records;
use crate::storage::RecordStore;
use crate::{
    Entity, RosterError, SectionDraft, SectionId, StudentDraft, StudentId, SubjectDraft, SubjectId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A section row referring to its subject by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSection {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// An enrollment row referring to a student by email and a section by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEnrollment {
    pub student: String,
    pub section: String,
}

/// A complete seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedBatch {
    #[serde(default)]
    pub subjects: Vec<SubjectDraft>,
    #[serde(default)]
    pub sections: Vec<SeedSection>,
    #[serde(default)]
    pub students: Vec<StudentDraft>,
    #[serde(default)]
    pub enrollments: Vec<SeedEnrollment>,
}

impl SeedBatch {
    /// Total number of rows in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len() + self.sections.len() + self.students.len() + self.enrollments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows created by a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub subjects: usize,
    pub sections: usize,
    pub students: usize,
    pub enrollments: usize,
}

fn repeated(kind: &str, keys: impl Iterator<Item = String>) -> Result<(), RosterError> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(RosterError::Invalid(format!(
                "{} '{}' appears more than once in the seed batch",
                kind, key
            )));
        }
    }
    Ok(())
}

/// Refuse a batch whose natural keys would resolve ambiguously.
fn check_natural_keys(batch: &SeedBatch) -> Result<(), RosterError> {
    repeated(
        "subject code",
        batch.subjects.iter().map(|s| s.code.trim().to_string()),
    )?;
    repeated(
        "section name",
        batch.sections.iter().map(|s| s.name.trim().to_string()),
    )?;
    repeated(
        "student email",
        batch
            .students
            .iter()
            .map(|s| s.email.trim().to_ascii_lowercase()),
    )
}

/// Load `batch` into `store`, stopping at the first failing row.
///
/// Rows written before the failure stay written. Batch-level checks
/// (size, repeated natural keys) run before the first write.
pub fn apply<S: RecordStore + ?Sized>(
    store: &mut S,
    batch: &SeedBatch,
) -> Result<SeedReport, RosterError> {
    if batch.len() > MAX_SEED_RECORDS {
        return Err(RosterError::Invalid(format!(
            "seed batch has {} rows, maximum is {}",
            batch.len(),
            MAX_SEED_RECORDS
        )));
    }

    check_natural_keys(batch)?;

    let mut report = SeedReport::default();

    let mut subjects: BTreeMap<String, SubjectId> = BTreeMap::new();
    for draft in &batch.subjects {
        let subject = records::create_subject(store, draft)?;
        subjects.insert(subject.code, subject.id);
        report.subjects += 1;
    }

    let mut sections: BTreeMap<String, SectionId> = BTreeMap::new();
    for row in &batch.sections {
        let subject = match row.subject.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(
                *subjects
                    .get(code)
                    .ok_or(RosterError::NotFound(Entity::Subject))?,
            ),
        };
        let section = records::create_section(
            store,
            &SectionDraft {
                name: row.name.clone(),
                subject,
            },
        )?;
        sections.insert(section.name, section.id);
        report.sections += 1;
    }

    let mut students: BTreeMap<String, StudentId> = BTreeMap::new();
    for draft in &batch.students {
        let student = records::create_student(store, draft)?;
        students.insert(student.email.to_ascii_lowercase(), student.id);
        report.students += 1;
    }

    for row in &batch.enrollments {
        let section = *sections
            .get(row.section.trim())
            .ok_or(RosterError::NotFound(Entity::Section))?;
        let student = *students
            .get(&row.student.trim().to_ascii_lowercase())
            .ok_or(RosterError::NotFound(Entity::Student))?;
        enrollment::enroll(store, student, section)?;
        report.enrollments += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConflictKind;
    use crate::storage::MemoryStore;

    fn batch() -> SeedBatch {
        SeedBatch {
            subjects: vec![SubjectDraft {
                code: "CS101".to_string(),
                description: "Programming".to_string(),
            }],
            sections: vec![
                SeedSection {
                    name: "CS101-A".to_string(),
                    subject: Some("CS101".to_string()),
                },
                SeedSection {
                    name: "CS101-B".to_string(),
                    subject: Some("CS101".to_string()),
                },
                SeedSection {
                    name: "Homeroom".to_string(),
                    subject: None,
                },
            ],
            students: vec![StudentDraft {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                email: "grace@example.edu".to_string(),
                course: None,
                age: Some(21),
            }],
            enrollments: vec![
                SeedEnrollment {
                    student: "GRACE@example.edu".to_string(),
                    section: "CS101-A".to_string(),
                },
                SeedEnrollment {
                    student: "grace@example.edu".to_string(),
                    section: "Homeroom".to_string(),
                },
            ],
        }
    }

    #[test]
    fn seed_resolves_natural_keys() {
        let mut store = MemoryStore::new();
        let report = apply(&mut store, &batch()).expect("seed");
        assert_eq!(
            report,
            SeedReport {
                subjects: 1,
                sections: 3,
                students: 1,
                enrollments: 2,
            }
        );
        assert_eq!(store.counts().expect("counts").enrollments, 2);
    }

    #[test]
    fn seed_applies_subject_rule() {
        let mut store = MemoryStore::new();
        let mut batch = batch();
        batch.enrollments.push(SeedEnrollment {
            student: "grace@example.edu".to_string(),
            section: "CS101-B".to_string(),
        });

        let err = apply(&mut store, &batch).expect_err("duplicate subject");
        assert!(matches!(
            err,
            RosterError::Conflict(ConflictKind::DuplicateSubjectEnrollment)
        ));
    }

    #[test]
    fn repeated_section_name_rejects_batch_before_writing() {
        let mut store = MemoryStore::new();
        let batch = SeedBatch {
            subjects: vec![
                SubjectDraft {
                    code: "MATH".to_string(),
                    description: "Mathematics".to_string(),
                },
                SubjectDraft {
                    code: "PHYS".to_string(),
                    description: "Physics".to_string(),
                },
            ],
            sections: vec![
                SeedSection {
                    name: "A".to_string(),
                    subject: Some("MATH".to_string()),
                },
                SeedSection {
                    name: " A ".to_string(),
                    subject: Some("PHYS".to_string()),
                },
            ],
            students: batch().students,
            enrollments: vec![SeedEnrollment {
                student: "grace@example.edu".to_string(),
                section: "A".to_string(),
            }],
        };

        let err = apply(&mut store, &batch).expect_err("ambiguous section");
        assert!(matches!(&err, RosterError::Invalid(msg) if msg.contains("section name 'A'")));
        assert_eq!(store.counts().expect("counts"), crate::Counts::default());
    }

    #[test]
    fn repeated_subject_code_or_email_rejects_batch() {
        let mut store = MemoryStore::new();

        let mut codes = batch();
        codes.subjects.push(codes.subjects[0].clone());
        let err = apply(&mut store, &codes).expect_err("repeated code");
        assert!(matches!(&err, RosterError::Invalid(msg) if msg.contains("CS101")));

        let mut emails = batch();
        let mut twin = emails.students[0].clone();
        twin.email = "Grace@Example.edu".to_string();
        emails.students.push(twin);
        let err = apply(&mut store, &emails).expect_err("repeated email");
        assert!(matches!(&err, RosterError::Invalid(msg) if msg.contains("student email")));

        assert_eq!(store.counts().expect("counts").subjects, 0);
    }

    #[test]
    fn unknown_subject_code_is_not_found() {
        let mut store = MemoryStore::new();
        let batch = SeedBatch {
            sections: vec![SeedSection {
                name: "X".to_string(),
                subject: Some("NOPE".to_string()),
            }],
            ..SeedBatch::default()
        };
        let err = apply(&mut store, &batch).expect_err("missing");
        assert!(matches!(err, RosterError::NotFound(Entity::Subject)));
    }
}
