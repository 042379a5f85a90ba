//! # redb-backed Record Storage
//!
//! A disk-backed `RecordStore` using the redb embedded database, providing:
//! - ACID transactions (one write transaction per mutating call)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Rows are postcard-encoded. Enrollments and seats are keyed by tuples so
//! that a student's rows form one contiguous range.

use super::RecordStore;
use crate::primitives::FIRST_ID;
use crate::{
    Constraint, Counts, Entity, Section, SectionId, StoreError, Student, StudentId, Subject,
    SubjectId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition, WriteTransaction,
};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

/// Table for students: StudentId(u64) -> serialized Student bytes
const STUDENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("students");

/// Table for subjects: SubjectId(u64) -> serialized Subject bytes
const SUBJECTS: TableDefinition<u64, &[u8]> = TableDefinition::new("subjects");

/// Table for sections: SectionId(u64) -> serialized Section bytes
const SECTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("sections");

/// Table for enrollments: (student_id, section_id) -> ()
const ENROLLMENTS: TableDefinition<(u64, u64), ()> = TableDefinition::new("enrollments");

/// Table for seats: (student_id, subject_id or None) -> section_id holding the seat
const SEATS: TableDefinition<(u64, Option<u64>), u64> = TableDefinition::new("seats");

/// Index: lowercased email -> StudentId(u64)
const STUDENT_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("student_emails");

/// Index: student number -> StudentId(u64)
const STUDENT_NUMBERS: TableDefinition<&str, u64> = TableDefinition::new("student_numbers");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

type RowTable<'txn> = Table<'txn, u64, &'static [u8]>;
type PairTable<'txn> = Table<'txn, (u64, u64), ()>;
type SeatTable<'txn> = Table<'txn, (u64, Option<u64>), u64>;
type IndexTable<'txn> = Table<'txn, &'static str, u64>;

// =============================================================================
// ENCODING HELPERS
// =============================================================================

fn io_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Io(e.to_string())
}

fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

const fn counter_key(kind: Entity) -> &'static str {
    match kind {
        Entity::Student => "next_student_id",
        Entity::Subject => "next_subject_id",
        Entity::Section => "next_section_id",
        Entity::Enrollment => "next_enrollment_id",
    }
}

// =============================================================================
// TABLE HELPERS (usable from read and write transactions)
// =============================================================================

fn load<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>, StoreError> {
    match table.get(id).map_err(io_err)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn load_all<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<T>, StoreError> {
    let mut rows = Vec::new();
    for entry in table.iter().map_err(io_err)? {
        let (_, value) = entry.map_err(io_err)?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

fn email_key(email: &str) -> String {
    email.to_ascii_lowercase()
}

fn index_holder(
    index: &impl ReadableTable<&'static str, u64>,
    key: &str,
) -> Result<Option<u64>, StoreError> {
    Ok(index.get(key).map_err(io_err)?.map(|g| g.value()))
}

/// Drop a student's email and number entries from the indexes.
fn unindex(
    emails: &mut IndexTable<'_>,
    numbers: &mut IndexTable<'_>,
    student: &Student,
) -> Result<(), StoreError> {
    emails
        .remove(email_key(&student.email).as_str())
        .map_err(io_err)?;
    numbers
        .remove(student.student_number.as_str())
        .map_err(io_err)?;
    Ok(())
}

fn seat_key(student: u64, subject: Option<SubjectId>) -> (u64, Option<u64>) {
    (student, subject.map(|id| id.0))
}

fn seat_holder(
    seats: &impl ReadableTable<(u64, Option<u64>), u64>,
    student: u64,
    subject: Option<SubjectId>,
) -> Result<Option<u64>, StoreError> {
    Ok(seats
        .get(seat_key(student, subject))
        .map_err(io_err)?
        .map(|g| g.value()))
}

fn subject_of(
    sections: &impl ReadableTable<u64, &'static [u8]>,
    section: u64,
) -> Result<Option<SubjectId>, StoreError> {
    Ok(load::<Section>(sections, section)?.and_then(|s| s.subject))
}

/// Section ids enrolled by one student, via a range scan.
fn sections_of(
    enrollments: &impl ReadableTable<(u64, u64), ()>,
    student: u64,
) -> Result<Vec<u64>, StoreError> {
    let mut held = Vec::new();
    for entry in enrollments
        .range((student, 0u64)..=(student, u64::MAX))
        .map_err(io_err)?
    {
        let (key, _) = entry.map_err(io_err)?;
        held.push(key.value().1);
    }
    Ok(held)
}

/// Student ids enrolled in one section, via a full scan.
fn students_in(
    enrollments: &impl ReadableTable<(u64, u64), ()>,
    section: u64,
) -> Result<Vec<u64>, StoreError> {
    let mut enrolled = Vec::new();
    for entry in enrollments.iter().map_err(io_err)? {
        let (key, _) = entry.map_err(io_err)?;
        let (student, held) = key.value();
        if held == section {
            enrolled.push(student);
        }
    }
    Ok(enrolled)
}

/// Drop one enrollment pair and the seat it held.
fn release(
    enrollments: &mut PairTable<'_>,
    seats: &mut SeatTable<'_>,
    sections: &RowTable<'_>,
    student: u64,
    section: u64,
) -> Result<bool, StoreError> {
    let existed = enrollments
        .remove((student, section))
        .map_err(io_err)?
        .is_some();
    if !existed {
        return Ok(false);
    }
    let subject = subject_of(sections, section)?;
    if seat_holder(&*seats, student, subject)? == Some(section) {
        seats.remove(seat_key(student, subject)).map_err(io_err)?;
    }
    Ok(true)
}

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed record store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a records database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            write_txn.open_table(STUDENTS).map_err(io_err)?;
            write_txn.open_table(SUBJECTS).map_err(io_err)?;
            write_txn.open_table(SECTIONS).map_err(io_err)?;
            write_txn.open_table(ENROLLMENTS).map_err(io_err)?;
            write_txn.open_table(SEATS).map_err(io_err)?;
            write_txn.open_table(STUDENT_EMAILS).map_err(io_err)?;
            write_txn.open_table(STUDENT_NUMBERS).map_err(io_err)?;
            write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), StoreError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&ReadTransaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        f(&read_txn)
    }

    /// Run `f` in one write transaction, committing only on success.
    /// An uncommitted transaction is aborted when dropped.
    fn write<T>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let value = f(&write_txn)?;
        write_txn.commit().map_err(io_err)?;
        Ok(value)
    }

    fn row<T: DeserializeOwned>(
        &self,
        def: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
    ) -> Result<Option<T>, StoreError> {
        self.read(|txn| {
            let table = txn.open_table(def).map_err(io_err)?;
            load(&table, id)
        })
    }

    fn rows<T: DeserializeOwned>(
        &self,
        def: TableDefinition<'static, u64, &'static [u8]>,
    ) -> Result<Vec<T>, StoreError> {
        self.read(|txn| {
            let table = txn.open_table(def).map_err(io_err)?;
            load_all(&table)
        })
    }

    fn put_row<T: Serialize>(
        &self,
        def: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
        row: &T,
    ) -> Result<(), StoreError> {
        let bytes = encode(row)?;
        self.write(|txn| {
            let mut table = txn.open_table(def).map_err(io_err)?;
            table.insert(id, bytes.as_slice()).map_err(io_err)?;
            Ok(())
        })
    }
}

// =============================================================================
// RECORDSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl RecordStore for RedbStore {
    fn allocate_id(&mut self, kind: Entity) -> Result<u64, StoreError> {
        self.write(|txn| {
            let mut meta = txn.open_table(METADATA).map_err(io_err)?;
            let key = counter_key(kind);
            let next = meta
                .get(key)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(FIRST_ID);
            meta.insert(key, next.saturating_add(1)).map_err(io_err)?;
            Ok(next)
        })
    }

    // -------------------------------------------------------------------------
    // Students
    // -------------------------------------------------------------------------

    fn find_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        self.row(STUDENTS, id.0)
    }

    fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        self.read(|txn| {
            let emails = txn.open_table(STUDENT_EMAILS).map_err(io_err)?;
            let Some(id) = index_holder(&emails, &email_key(email))? else {
                return Ok(None);
            };
            let students = txn.open_table(STUDENTS).map_err(io_err)?;
            load(&students, id)
        })
    }

    fn student_number_taken(&self, number: &str) -> Result<bool, StoreError> {
        self.read(|txn| {
            let numbers = txn.open_table(STUDENT_NUMBERS).map_err(io_err)?;
            Ok(index_holder(&numbers, number)?.is_some())
        })
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.rows(STUDENTS)
    }

    /// Writes the row and both index entries in one transaction.
    fn put_student(&mut self, student: &Student) -> Result<(), StoreError> {
        let bytes = encode(student)?;
        let email = email_key(&student.email);
        self.write(|txn| {
            let mut students = txn.open_table(STUDENTS).map_err(io_err)?;
            let mut emails = txn.open_table(STUDENT_EMAILS).map_err(io_err)?;
            let mut numbers = txn.open_table(STUDENT_NUMBERS).map_err(io_err)?;

            if let Some(held) = index_holder(&emails, &email)?
                && held != student.id.0
            {
                return Err(Constraint::EmailTaken {
                    email: student.email.clone(),
                    held: StudentId(held),
                }
                .into());
            }
            if let Some(held) = index_holder(&numbers, &student.student_number)?
                && held != student.id.0
            {
                return Err(Constraint::StudentNumberTaken {
                    number: student.student_number.clone(),
                    held: StudentId(held),
                }
                .into());
            }

            if let Some(previous) = load::<Student>(&students, student.id.0)? {
                unindex(&mut emails, &mut numbers, &previous)?;
            }
            emails.insert(email.as_str(), student.id.0).map_err(io_err)?;
            numbers
                .insert(student.student_number.as_str(), student.id.0)
                .map_err(io_err)?;
            students
                .insert(student.id.0, bytes.as_slice())
                .map_err(io_err)?;
            Ok(())
        })
    }

    fn delete_student(&mut self, id: StudentId) -> Result<bool, StoreError> {
        self.write(|txn| {
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let held = sections_of(&enrollments, id.0)?.len();
            if held > 0 {
                return Err(Constraint::StudentHasEnrollments(id, held).into());
            }
            let mut students = txn.open_table(STUDENTS).map_err(io_err)?;
            let Some(student) = load::<Student>(&students, id.0)? else {
                return Ok(false);
            };
            let mut emails = txn.open_table(STUDENT_EMAILS).map_err(io_err)?;
            let mut numbers = txn.open_table(STUDENT_NUMBERS).map_err(io_err)?;
            unindex(&mut emails, &mut numbers, &student)?;
            students.remove(id.0).map_err(io_err)?;
            Ok(true)
        })
    }

    fn delete_student_cascade(&mut self, id: StudentId) -> Result<usize, StoreError> {
        self.write(|txn| {
            let mut students = txn.open_table(STUDENTS).map_err(io_err)?;
            let mut enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;

            let Some(student) = load::<Student>(&students, id.0)? else {
                return Err(Constraint::MissingStudent(id).into());
            };

            let held = sections_of(&enrollments, id.0)?;
            for &section in &held {
                release(&mut enrollments, &mut seats, &sections, id.0, section)?;
            }
            let mut emails = txn.open_table(STUDENT_EMAILS).map_err(io_err)?;
            let mut numbers = txn.open_table(STUDENT_NUMBERS).map_err(io_err)?;
            unindex(&mut emails, &mut numbers, &student)?;
            students.remove(id.0).map_err(io_err)?;
            Ok(held.len())
        })
    }

    // -------------------------------------------------------------------------
    // Subjects
    // -------------------------------------------------------------------------

    fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError> {
        self.row(SUBJECTS, id.0)
    }

    fn list_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        self.rows(SUBJECTS)
    }

    fn put_subject(&mut self, subject: &Subject) -> Result<(), StoreError> {
        self.put_row(SUBJECTS, subject.id.0, subject)
    }

    fn delete_subject_detaching(&mut self, id: SubjectId) -> Result<usize, StoreError> {
        self.write(|txn| {
            let mut subjects = txn.open_table(SUBJECTS).map_err(io_err)?;
            let mut sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;

            if subjects.remove(id.0).map_err(io_err)?.is_none() {
                return Err(Constraint::MissingSubject(id).into());
            }

            // Seats of the subject fall into the subjectless seat.
            let mut moving = Vec::new();
            for entry in seats.iter().map_err(io_err)? {
                let (key, value) = entry.map_err(io_err)?;
                let (student, subject) = key.value();
                if subject == Some(id.0) {
                    moving.push((student, value.value()));
                }
            }
            for &(student, _) in &moving {
                if let Some(held) = seat_holder(&seats, student, None)? {
                    return Err(Constraint::SubjectSeatTaken {
                        student: StudentId(student),
                        subject: None,
                        held: SectionId(held),
                    }
                    .into());
                }
            }
            for (student, section) in moving {
                seats
                    .remove(seat_key(student, Some(id)))
                    .map_err(io_err)?;
                seats
                    .insert(seat_key(student, None), section)
                    .map_err(io_err)?;
            }

            let detached: Vec<Section> = load_all::<Section>(&sections)?
                .into_iter()
                .filter(|s| s.subject == Some(id))
                .map(|s| Section { subject: None, ..s })
                .collect();
            for section in &detached {
                let bytes = encode(section)?;
                sections
                    .insert(section.id.0, bytes.as_slice())
                    .map_err(io_err)?;
            }

            Ok(detached.len())
        })
    }

    // -------------------------------------------------------------------------
    // Sections
    // -------------------------------------------------------------------------

    fn find_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        self.row(SECTIONS, id.0)
    }

    fn list_sections(&self) -> Result<Vec<Section>, StoreError> {
        self.rows(SECTIONS)
    }

    fn put_section(&mut self, section: &Section) -> Result<(), StoreError> {
        let bytes = encode(section)?;
        self.write(|txn| {
            let subjects = txn.open_table(SUBJECTS).map_err(io_err)?;
            let mut sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;

            if let Some(subject) = section.subject
                && subjects.get(subject.0).map_err(io_err)?.is_none()
            {
                return Err(Constraint::MissingSubject(subject).into());
            }

            let previous = subject_of(&sections, section.id.0)?;
            if previous != section.subject {
                let enrolled = students_in(&enrollments, section.id.0)?;

                // Check every move before applying any of them.
                for &student in &enrolled {
                    if let Some(held) = seat_holder(&seats, student, section.subject)? {
                        return Err(Constraint::SubjectSeatTaken {
                            student: StudentId(student),
                            subject: section.subject,
                            held: SectionId(held),
                        }
                        .into());
                    }
                }

                for &student in &enrolled {
                    seats
                        .remove(seat_key(student, previous))
                        .map_err(io_err)?;
                    seats
                        .insert(seat_key(student, section.subject), section.id.0)
                        .map_err(io_err)?;
                }
            }

            sections
                .insert(section.id.0, bytes.as_slice())
                .map_err(io_err)?;
            Ok(())
        })
    }

    fn delete_section_cascade(&mut self, id: SectionId) -> Result<usize, StoreError> {
        self.write(|txn| {
            let mut sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let mut enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;

            if sections.get(id.0).map_err(io_err)?.is_none() {
                return Err(Constraint::MissingSection(id).into());
            }

            let enrolled = students_in(&enrollments, id.0)?;
            for &student in &enrolled {
                release(&mut enrollments, &mut seats, &sections, student, id.0)?;
            }
            sections.remove(id.0).map_err(io_err)?;
            Ok(enrolled.len())
        })
    }

    // -------------------------------------------------------------------------
    // Enrollments
    // -------------------------------------------------------------------------

    fn enrollments_of_student(
        &self,
        id: StudentId,
    ) -> Result<Vec<(SectionId, Option<SubjectId>)>, StoreError> {
        self.read(|txn| {
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;

            let mut rows = Vec::new();
            for section in sections_of(&enrollments, id.0)? {
                rows.push((SectionId(section), subject_of(&sections, section)?));
            }
            Ok(rows)
        })
    }

    fn enrollments_of_section(&self, id: SectionId) -> Result<Vec<StudentId>, StoreError> {
        self.read(|txn| {
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            Ok(students_in(&enrollments, id.0)?
                .into_iter()
                .map(StudentId)
                .collect())
        })
    }

    fn is_enrolled(&self, student: StudentId, section: SectionId) -> Result<bool, StoreError> {
        self.read(|txn| {
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            Ok(enrollments
                .get((student.0, section.0))
                .map_err(io_err)?
                .is_some())
        })
    }

    fn insert_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<(), StoreError> {
        self.write(|txn| {
            let students = txn.open_table(STUDENTS).map_err(io_err)?;
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let mut enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;

            if students.get(student.0).map_err(io_err)?.is_none() {
                return Err(Constraint::MissingStudent(student).into());
            }
            let Some(row) = load::<Section>(&sections, section.0)? else {
                return Err(Constraint::MissingSection(section).into());
            };
            if enrollments
                .get((student.0, section.0))
                .map_err(io_err)?
                .is_some()
            {
                return Err(Constraint::AlreadyEnrolled { student, section }.into());
            }

            if let Some(held) = seat_holder(&seats, student.0, row.subject)? {
                return Err(Constraint::SubjectSeatTaken {
                    student,
                    subject: row.subject,
                    held: SectionId(held),
                }
                .into());
            }
            seats
                .insert(seat_key(student.0, row.subject), section.0)
                .map_err(io_err)?;
            enrollments
                .insert((student.0, section.0), ())
                .map_err(io_err)?;
            Ok(())
        })
    }

    fn delete_enrollment(
        &mut self,
        student: StudentId,
        section: SectionId,
    ) -> Result<bool, StoreError> {
        self.write(|txn| {
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let mut enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;
            release(&mut enrollments, &mut seats, &sections, student.0, section.0)
        })
    }

    fn delete_enrollments_of_student(&mut self, id: StudentId) -> Result<usize, StoreError> {
        self.write(|txn| {
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let mut enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            let mut seats = txn.open_table(SEATS).map_err(io_err)?;

            let held = sections_of(&enrollments, id.0)?;
            for &section in &held {
                release(&mut enrollments, &mut seats, &sections, id.0, section)?;
            }
            Ok(held.len())
        })
    }

    fn counts(&self) -> Result<Counts, StoreError> {
        self.read(|txn| {
            let students = txn.open_table(STUDENTS).map_err(io_err)?;
            let subjects = txn.open_table(SUBJECTS).map_err(io_err)?;
            let sections = txn.open_table(SECTIONS).map_err(io_err)?;
            let enrollments = txn.open_table(ENROLLMENTS).map_err(io_err)?;
            Ok(Counts {
                students: students.len().map_err(io_err)? as usize,
                subjects: subjects.len().map_err(io_err)? as usize,
                sections: sections.len().map_err(io_err)? as usize,
                enrollments: enrollments.len().map_err(io_err)? as usize,
            })
        })
    }
}
