//! Serialization tests for the API types.

#![allow(clippy::unwrap_used, clippy::panic)]

use roster::api::{
    EnrollParams, MessageResponse, SectionJson, SectionRequest, StatusResponse,
    StudentDetailResponse, StudentJson, StudentRequest,
};
use roster_core::{
    Counts, Section, SectionDraft, SectionId, Student, StudentDraft, StudentId, StudentRecord,
    SubjectId,
};

// =============================================================================
// REQUESTS
// =============================================================================

#[test]
fn student_request_reads_camel_case() {
    let json = r#"{"firstName":"Chien-Shiung","lastName":"Wu","email":"wu@example.edu","age":24}"#;
    let request: StudentRequest = serde_json::from_str(json).unwrap();
    let draft = StudentDraft::from(request);

    assert_eq!(draft.first_name, "Chien-Shiung");
    assert_eq!(draft.last_name, "Wu");
    assert_eq!(draft.course, None);
    assert_eq!(draft.age, Some(24));
}

#[test]
fn student_request_requires_email() {
    let json = r#"{"firstName":"No","lastName":"Email"}"#;
    assert!(serde_json::from_str::<StudentRequest>(json).is_err());
}

#[test]
fn section_request_subject_is_optional() {
    let with: SectionRequest = serde_json::from_str(r#"{"name":"A","subjectId":3}"#).unwrap();
    assert_eq!(SectionDraft::from(with).subject, Some(SubjectId(3)));

    let without: SectionRequest = serde_json::from_str(r#"{"name":"B"}"#).unwrap();
    assert_eq!(SectionDraft::from(without).subject, None);
}

#[test]
fn enroll_params_map_to_ids() {
    let params = EnrollParams {
        student_id: 1,
        section_id: 10,
    };
    assert_eq!(params.ids(), (StudentId(1), SectionId(10)));

    let json = serde_json::to_string(&params).unwrap();
    assert!(json.contains("\"studentId\":1"));
    assert!(json.contains("\"sectionId\":10"));
}

// =============================================================================
// RESPONSES
// =============================================================================

fn hopper() -> Student {
    Student {
        id: StudentId(5),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@example.edu".to_string(),
        student_number: "S0a1b2c3d".to_string(),
        course: Some("Mathematics".to_string()),
        age: Some(22),
    }
}

#[test]
fn student_json_is_camel_case() {
    let json = serde_json::to_string(&StudentJson::from(&hopper())).unwrap();
    assert!(json.contains("\"firstName\":\"Grace\""));
    assert!(json.contains("\"fullName\":\"Grace Hopper\""));
    assert!(json.contains("\"studentNumber\":\"S0a1b2c3d\""));
}

#[test]
fn student_detail_flattens_student_fields() {
    let detail = StudentDetailResponse::from(StudentRecord {
        student: hopper(),
        sections: vec![Section {
            id: SectionId(10),
            name: "COBOL-A".to_string(),
            subject: Some(SubjectId(100)),
        }],
    });

    let value = serde_json::to_value(&detail).unwrap();
    assert_eq!(value["id"], 5);
    assert_eq!(value["email"], "grace@example.edu");
    assert_eq!(value["sections"][0]["subjectId"], 100);
}

#[test]
fn section_without_subject_serializes_null() {
    let json = serde_json::to_string(&SectionJson::from(&Section {
        id: SectionId(1),
        name: "Homeroom".to_string(),
        subject: None,
    }))
    .unwrap();
    assert!(json.contains("\"subjectId\":null"));
}

#[test]
fn message_response_constructors() {
    let ok = MessageResponse::success("done");
    assert!(ok.success);
    let err = MessageResponse::error("nope");
    assert!(!err.success);
    assert_eq!(
        serde_json::to_string(&err).unwrap(),
        r#"{"success":false,"message":"nope"}"#
    );
}

#[test]
fn status_response_copies_counts() {
    let status = StatusResponse::new(
        "redb",
        Counts {
            students: 3,
            subjects: 2,
            sections: 4,
            enrollments: 5,
        },
    );
    assert_eq!(status.backend, "redb");
    assert_eq!(status.enrollments, 5);
}
