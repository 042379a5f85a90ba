//! # In-Memory Store
//!
//! A volatile `RecordStore` backed by BTreeMaps.
//!
//! Every mutating method validates first and only then touches the maps,
//! so a rejected call leaves the store exactly as it was.

use super::RecordStore;
use crate::primitives::FIRST_ID;
use crate::{
    Constraint, Counts, Entity, Section, SectionId, StoreError, Student, StudentId, Subject,
    SubjectId,
};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory rows plus the seat index.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    students: BTreeMap<StudentId, Student>,
    subjects: BTreeMap<SubjectId, Subject>,
    sections: BTreeMap<SectionId, Section>,
    enrollments: BTreeSet<(StudentId, SectionId)>,
    /// `(student, subject) -> section` holding that seat. Subjectless
    /// sections share the `None` seat.
    seats: BTreeMap<(StudentId, Option<SubjectId>), SectionId>,
    next_ids: BTreeMap<Entity, u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            students: BTreeMap::new(),
            subjects: BTreeMap::new(),
            sections: BTreeMap::new(),
            enrollments: BTreeSet::new(),
            seats: BTreeMap::new(),
            next_ids: BTreeMap::new(),
        }
    }

    fn student_rows(&self, id: StudentId) -> impl Iterator<Item = SectionId> + '_ {
        self.enrollments
            .range((id, SectionId(0))..=(id, SectionId(u64::MAX)))
            .map(|&(_, section)| section)
    }

    fn subject_of(&self, section: SectionId) -> Option<SubjectId> {
        self.sections.get(&section).and_then(|s| s.subject)
    }

    /// Drop one enrollment pair and the seat it held.
    fn release(&mut self, student: StudentId, section: SectionId) -> bool {
        if !self.enrollments.remove(&(student, section)) {
            return false;
        }
        let seat = (student, self.subject_of(section));
        if self.seats.get(&seat) == Some(&section) {
            self.seats.remove(&seat);
        }
        true
    }
}

impl RecordStore for MemoryStore {
    fn allocate_id(&mut self, kind: Entity) -> Result<u64, StoreError> {
        let next = self.next_ids.entry(kind).or_insert(FIRST_ID);
        let id = *next;
        *next = next.saturating_add(1);
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Students
    // -------------------------------------------------------------------------

    fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.students.get(&id).cloned())
    }

    fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .students
            .values()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn student_number_taken(&self, number: &str) -> Result<bool, StoreError> {
        Ok(self.students.values().any(|s| s.student_number == number))
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.students.values().cloned().collect())
    }

    fn put_student(&mut self, student: &Student) -> Result<(), StoreError> {
        for other in self.students.values().filter(|s| s.id != student.id) {
            if other.email.eq_ignore_ascii_case(&student.email) {
                return Err(Constraint::EmailTaken {
                    email: student.email.clone(),
                    held: other.id,
                }
                .into());
            }
            if other.student_number == student.student_number {
                return Err(Constraint::StudentNumberTaken {
                    number: student.student_number.clone(),
                    held: other.id,
                }
                .into());
            }
        }
        self.students.insert(student.id, student.clone());
        Ok(())
    }

    fn delete_student(&mut self, id: StudentId) -> Result<bool, StoreError> {
        let held = self.student_rows(id).count();
        if held > 0 {
            return Err(Constraint::StudentHasEnrollments(id, held).into());
        }
        Ok(self.students.remove(&id).is_some())
    }

    fn delete_student_cascade(&mut self, id: StudentId) -> Result<usize, StoreError> {
        if !self.students.contains_key(&id) {
            return Err(Constraint::MissingStudent(id).into());
        }
        let removed = self.delete_enrollments_of_student(id)?;
        self.delete_student(id)?;
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Subjects
    // -------------------------------------------------------------------------

    fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(self.subjects.get(&id).cloned())
    }

    fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        Ok(self.subjects.values().cloned().collect())
    }

    fn put_subject(&mut self, subject: &Subject) -> Result<(), StoreError> {
        self.subjects.insert(subject.id, subject.clone());
        Ok(())
    }

    fn delete_subject_detaching(&mut self, id: SubjectId) -> Result<usize, StoreError> {
        if !self.subjects.contains_key(&id) {
            return Err(Constraint::MissingSubject(id).into());
        }

        // Seats of the subject fall into the subjectless seat.
        let moving: Vec<(StudentId, SectionId)> = self
            .seats
            .iter()
            .filter(|&(&(_, subject), _)| subject == Some(id))
            .map(|(&(student, _), &section)| (student, section))
            .collect();
        for &(student, _) in &moving {
            if let Some(&held) = self.seats.get(&(student, None)) {
                return Err(Constraint::SubjectSeatTaken {
                    student,
                    subject: None,
                    held,
                }
                .into());
            }
        }

        self.subjects.remove(&id);
        for (student, section) in moving {
            self.seats.remove(&(student, Some(id)));
            self.seats.insert((student, None), section);
        }

        let mut detached = 0;
        for section in self.sections.values_mut() {
            if section.subject == Some(id) {
                section.subject = None;
                detached += 1;
            }
        }
        Ok(detached)
    }

    // -------------------------------------------------------------------------
    // Sections
    // -------------------------------------------------------------------------

    fn find_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        Ok(self.sections.get(&id).cloned())
    }

    fn list_sections(&self) -> Result<Vec<Section>, StoreError> {
        Ok(self.sections.values().cloned().collect())
    }

    fn put_section(&mut self, section: &Section) -> Result<(), StoreError> {
        if let Some(subject) = section.subject
            && !self.subjects.contains_key(&subject)
        {
            return Err(Constraint::MissingSubject(subject).into());
        }

        let previous = self.subject_of(section.id);
        if previous != section.subject {
            let enrolled = self.enrollments_of_section(section.id)?;

            // Check every move before applying any of them.
            for &student in &enrolled {
                if let Some(&held) = self.seats.get(&(student, section.subject)) {
                    return Err(Constraint::SubjectSeatTaken {
                        student,
                        subject: section.subject,
                        held,
                    }
                    .into());
                }
            }

            for &student in &enrolled {
                self.seats.remove(&(student, previous));
                self.seats.insert((student, section.subject), section.id);
            }
        }

        self.sections.insert(section.id, section.clone());
        Ok(())
    }

    fn delete_section_cascade(&mut self, id: SectionId) -> Result<usize, StoreError> {
        if !self.sections.contains_key(&id) {
            return Err(Constraint::MissingSection(id).into());
        }
        let enrolled = self.enrollments_of_section(id)?;
        for &student in &enrolled {
            self.release(student, id);
        }
        self.sections.remove(&id);
        Ok(enrolled.len())
    }

    // -------------------------------------------------------------------------
    // Enrollments
    // -------------------------------------------------------------------------

    fn enrollments_of_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<(SectionId, Option<SubjectId>)>, StoreError> {
        Ok(self
            .student_rows(id)
            .map(|section| (section, self.subject_of(section)))
            .collect())
    }

    fn enrollments_of_section(&self, id: SectionId) -> Result<Vec<StudentId>, StoreError> {
        Ok(self
            .enrollments
            .iter()
            .filter(|&&(_, section)| section == id)
            .map(|&(student, _)| student)
            .collect())
    }

    fn is_enrolled(&self, student: StudentId, section: SectionId) -> Result<bool, StoreError> {
        Ok(self.enrollments.contains(&(student, section)))
    }

    fn insert_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<(), StoreError> {
        if !self.students.contains_key(&student) {
            return Err(Constraint::MissingStudent(student).into());
        }
        let Some(row) = self.sections.get(&section) else {
            return Err(Constraint::MissingSection(section).into());
        };
        if self.enrollments.contains(&(student, section)) {
            return Err(Constraint::AlreadyEnrolled { student, section }.into());
        }
        let seat = (student, row.subject);
        if let Some(&held) = self.seats.get(&seat) {
            return Err(Constraint::SubjectSeatTaken {
                student,
                subject: row.subject,
                held,
            }
            .into());
        }
        self.seats.insert(seat, section);
        self.enrollments.insert((student, section));
        Ok(())
    }

    fn delete_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<bool, StoreError> {
        Ok(self.release(student, section))
    }

    fn delete_enrollments_of_student(&mut self, id: StudentId) -> Result<usize, StoreError> {
        let held: Vec<SectionId> = self.student_rows(id).collect();
        for &section in &held {
            self.release(id, section);
        }
        Ok(held.len())
    }

    fn counts(&self) -> Result<Counts, StoreError> {
        Ok(Counts {
            students: self.students.len(),
            subjects: self.subjects.len(),
            sections: self.sections.len(),
            enrollments: self.enrollments.len(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: u64) -> Student {
        Student {
            id: StudentId(id),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: format!("grace{}@example.edu", id),
            student_number: format!("S{:08x}", id),
            course: None,
            age: Some(20),
        }
    }

    fn subject(id: u64) -> Subject {
        Subject {
            id: SubjectId(id),
            code: format!("CS{}", id),
            description: "Computing".to_string(),
        }
    }

    fn section(id: u64, subject: Option<u64>) -> Section {
        Section {
            id: SectionId(id),
            name: format!("Section {}", id),
            subject: subject.map(SubjectId),
        }
    }

    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put_student(&student(1)).expect("student");
        store.put_subject(&subject(100)).expect("subject");
        store.put_subject(&subject(200)).expect("subject");
        store.put_section(&section(10, Some(100))).expect("section");
        store.put_section(&section(11, Some(100))).expect("section");
        store.put_section(&section(20, Some(200))).expect("section");
        store
    }

    #[test]
    fn allocate_id_is_monotonic_per_kind() {
        let mut store = MemoryStore::new();
        assert_eq!(store.allocate_id(Entity::Student).expect("id"), 1);
        assert_eq!(store.allocate_id(Entity::Student).expect("id"), 2);
        assert_eq!(store.allocate_id(Entity::Section).expect("id"), 1);
    }

    #[test]
    fn put_student_refuses_email_of_another_student() {
        let mut store = fixture();
        let mut twin = student(2);
        twin.email = "GRACE1@example.edu".to_string();

        let err = store.put_student(&twin).expect_err("email taken");
        assert!(matches!(
            err,
            StoreError::Constraint(Constraint::EmailTaken { held, .. }) if held == StudentId(1)
        ));

        // Rewriting a student's own row is fine.
        store.put_student(&student(1)).expect("same student");
    }

    #[test]
    fn seat_blocks_second_section_of_subject() {
        let mut store = fixture();
        store
            .insert_enrollment(StudentId(1), SectionId(10))
            .expect("first");

        let err = store
            .insert_enrollment(StudentId(1), SectionId(11))
            .expect_err("seat taken");
        assert!(matches!(
            err,
            StoreError::Constraint(Constraint::SubjectSeatTaken { held, .. }) if held == SectionId(10)
        ));
        assert_eq!(store.counts().expect("counts").enrollments, 1);
    }

    #[test]
    fn plain_delete_refuses_enrolled_student() {
        let mut store = fixture();
        store
            .insert_enrollment(StudentId(1), SectionId(20))
            .expect("enroll");

        let err = store.delete_student(StudentId(1)).expect_err("dangling");
        assert!(matches!(
            err,
            StoreError::Constraint(Constraint::StudentHasEnrollments(_, 1))
        ));
        assert!(store.find_student(StudentId(1)).expect("find").is_some());
    }

    #[test]
    fn moving_section_carries_seats() {
        let mut store = fixture();
        store
            .insert_enrollment(StudentId(1), SectionId(10))
            .expect("enroll");

        store
            .put_section(&section(10, Some(200)))
            .expect("move to 200");

        // Subject 100 is free again, subject 200 is held by section 10.
        store
            .insert_enrollment(StudentId(1), SectionId(11))
            .expect("100 free");
        assert!(
            store
                .insert_enrollment(StudentId(1), SectionId(20))
                .is_err()
        );
    }

    #[test]
    fn moving_section_onto_held_subject_is_rejected_whole() {
        let mut store = fixture();
        store
            .insert_enrollment(StudentId(1), SectionId(10))
            .expect("enroll");
        store
            .insert_enrollment(StudentId(1), SectionId(20))
            .expect("enroll");

        let err = store
            .put_section(&section(20, Some(100)))
            .expect_err("would duplicate");
        assert!(err.is_constraint());
        assert_eq!(
            store.find_section(SectionId(20)).expect("find"),
            Some(section(20, Some(200)))
        );
    }

    #[test]
    fn deleting_subject_moves_seats_to_no_subject() {
        let mut store = fixture();
        store
            .insert_enrollment(StudentId(1), SectionId(10))
            .expect("enroll");

        let detached = store.delete_subject_detaching(SubjectId(100)).expect("delete");
        assert_eq!(detached, 2);
        assert_eq!(
            store.find_section(SectionId(11)).expect("find").map(|s| s.subject),
            Some(None)
        );
        // Section 10 now holds the subjectless seat; 11 is subjectless too.
        let err = store
            .insert_enrollment(StudentId(1), SectionId(11))
            .expect_err("subjectless seat held");
        assert!(matches!(
            err,
            StoreError::Constraint(Constraint::SubjectSeatTaken { subject: None, held, .. })
                if held == SectionId(10)
        ));
    }

    #[test]
    fn subjectless_sections_share_one_seat() {
        let mut store = fixture();
        store.put_section(&section(30, None)).expect("section");
        store.put_section(&section(31, None)).expect("section");

        store
            .insert_enrollment(StudentId(1), SectionId(30))
            .expect("first");
        let err = store
            .insert_enrollment(StudentId(1), SectionId(31))
            .expect_err("second subjectless");
        assert!(err.is_constraint());

        store
            .delete_enrollment(StudentId(1), SectionId(30))
            .expect("withdraw");
        store
            .insert_enrollment(StudentId(1), SectionId(31))
            .expect("seat freed");
    }

    #[test]
    fn deleting_subject_refuses_to_double_the_subjectless_seat() {
        let mut store = fixture();
        store.put_section(&section(30, None)).expect("section");
        store
            .insert_enrollment(StudentId(1), SectionId(10))
            .expect("enroll");
        store
            .insert_enrollment(StudentId(1), SectionId(30))
            .expect("enroll");

        let err = store
            .delete_subject_detaching(SubjectId(100))
            .expect_err("would double");
        assert!(err.is_constraint());
        assert!(store.find_subject(SubjectId(100)).expect("find").is_some());
        assert_eq!(
            store.find_section(SectionId(10)).expect("find").map(|s| s.subject),
            Some(Some(SubjectId(100)))
        );
    }
}
