//! # Enrollment Benchmarks
//!
//! Run with: `cargo bench -p roster-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use roster_core::{
    MemoryStore, RecordStore, Section, SectionId, Student, StudentId, Subject, SubjectId,
    enrollment,
};
use std::hint::black_box;

/// `students` students and one section for each of `subjects` subjects.
fn campus(students: u64, subjects: u64) -> MemoryStore {
    let mut store = MemoryStore::new();
    for id in 1..=students {
        store
            .put_student(&Student {
                id: StudentId(id),
                first_name: format!("First{}", id),
                last_name: "Last".to_string(),
                email: format!("s{}@example.edu", id),
                student_number: format!("S{:08x}", id),
                course: None,
                age: None,
            })
            .expect("student");
    }
    for id in 1..=subjects {
        store
            .put_subject(&Subject {
                id: SubjectId(id),
                code: format!("SUB{}", id),
                description: String::new(),
            })
            .expect("subject");
        store
            .put_section(&Section {
                id: SectionId(id),
                name: format!("SEC{}", id),
                subject: Some(SubjectId(id)),
            })
            .expect("section");
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_enroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("enroll_all_subjects");

    for subjects in [10u64, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(subjects),
            subjects,
            |b, &subjects| {
                b.iter(|| {
                    let mut store = campus(1, subjects);
                    for section in 1..=subjects {
                        let _ = enrollment::enroll(&mut store, StudentId(1), SectionId(section));
                    }
                    black_box(store)
                });
            },
        );
    }

    group.finish();
}

fn bench_delete_student(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_student_cascade");

    for subjects in [10u64, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(subjects),
            subjects,
            |b, &subjects| {
                b.iter_batched(
                    || {
                        let mut store = campus(1, subjects);
                        for section in 1..=subjects {
                            let _ =
                                enrollment::enroll(&mut store, StudentId(1), SectionId(section));
                        }
                        store
                    },
                    |mut store| black_box(enrollment::delete_student(&mut store, StudentId(1))),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_enroll, bench_delete_student);
criterion_main!(benches);
