//! # Student Numbers
//!
//! Student numbers are opaque: `S` followed by eight lowercase hex digits
//! taken from a BLAKE3 digest of the student id, the email and a salt.
//! The salt only moves past zero when a derived number is already held.

use crate::primitives::{MAX_STUDENT_NUMBER_ATTEMPTS, STUDENT_NUMBER_DIGITS, STUDENT_NUMBER_PREFIX};
use crate::storage::RecordStore;
use crate::{Constraint, StoreError, StudentId};

/// Derive the candidate number for `(id, email, salt)`.
#[must_use]
pub fn derive(id: StudentId, email: &str, salt: u32) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&id.0.to_le_bytes());
    hasher.update(email.as_bytes());
    hasher.update(&salt.to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{}{}", STUDENT_NUMBER_PREFIX, &hex.as_str()[..STUDENT_NUMBER_DIGITS])
}

/// Pick the first derived number no student holds yet.
pub fn assign<S: RecordStore + ?Sized>(
    store: &S,
    id: StudentId,
    email: &str,
) -> Result<String, StoreError> {
    for salt in 0..MAX_STUDENT_NUMBER_ATTEMPTS {
        let candidate = derive(id, email, salt);
        if !store.student_number_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(Constraint::StudentNumberExhausted(MAX_STUDENT_NUMBER_ATTEMPTS).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Student;
    use crate::storage::MemoryStore;

    #[test]
    fn derived_number_has_expected_shape() {
        let number = derive(StudentId(7), "kim@example.edu", 0);
        assert_eq!(number.len(), 9);
        assert!(number.starts_with('S'));
        assert!(
            number[1..]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            derive(StudentId(3), "a@b.c", 0),
            derive(StudentId(3), "a@b.c", 0)
        );
        assert_ne!(
            derive(StudentId(3), "a@b.c", 0),
            derive(StudentId(3), "a@b.c", 1)
        );
    }

    #[test]
    fn taken_number_moves_to_next_salt() {
        let mut store = MemoryStore::new();
        store
            .put_student(&Student {
                id: StudentId(1),
                first_name: "Taken".to_string(),
                last_name: "Number".to_string(),
                email: "taken@example.edu".to_string(),
                student_number: derive(StudentId(2), "new@example.edu", 0),
                course: None,
                age: None,
            })
            .expect("put");

        let assigned = assign(&store, StudentId(2), "new@example.edu").expect("assign");
        assert_eq!(assigned, derive(StudentId(2), "new@example.edu", 1));
    }
}
