//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Field names are camelCase on the wire.

use roster_core::{
    Counts, Section, SectionDraft, SectionId, Student, StudentDraft, StudentId, StudentRecord,
    StudentSummary, Subject, SubjectDraft, SubjectId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Row counts plus the active backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub backend: String,
    pub students: usize,
    pub subjects: usize,
    pub sections: usize,
    pub enrollments: usize,
}

impl StatusResponse {
    pub fn new(backend: &str, counts: Counts) -> Self {
        Self {
            backend: backend.to_string(),
            students: counts.students,
            subjects: counts.subjects,
            sections: counts.sections,
            enrollments: counts.enrollments,
        }
    }
}

// =============================================================================
// MESSAGE RESPONSE
// =============================================================================

/// Outcome of a command-style request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            success: true,
            message: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            message: msg.into(),
        }
    }
}

// =============================================================================
// STUDENTS
// =============================================================================

/// Create/update body for a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl From<StudentRequest> for StudentDraft {
    fn from(request: StudentRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            course: request.course,
            age: request.age,
        }
    }
}

/// A full student row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentJson {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub student_number: String,
    pub course: Option<String>,
    pub age: Option<u32>,
}

impl From<&Student> for StudentJson {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id.0,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            full_name: student.full_name(),
            email: student.email.clone(),
            student_number: student.student_number.clone(),
            course: student.course.clone(),
            age: student.age,
        }
    }
}

/// A row of the student list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummaryJson {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub student_number: String,
    pub course: Option<String>,
    pub age: Option<u32>,
}

impl From<StudentSummary> for StudentSummaryJson {
    fn from(summary: StudentSummary) -> Self {
        Self {
            id: summary.id.0,
            full_name: summary.full_name,
            email: summary.email,
            student_number: summary.student_number,
            course: summary.course,
            age: summary.age,
        }
    }
}

/// A student with the sections they are enrolled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetailResponse {
    #[serde(flatten)]
    pub student: StudentJson,
    pub sections: Vec<SectionJson>,
}

impl From<StudentRecord> for StudentDetailResponse {
    fn from(record: StudentRecord) -> Self {
        Self {
            student: StudentJson::from(&record.student),
            sections: record.sections.iter().map(SectionJson::from).collect(),
        }
    }
}

/// Query string of `POST /api/students/enroll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollParams {
    pub student_id: u64,
    pub section_id: u64,
}

impl EnrollParams {
    pub fn ids(&self) -> (StudentId, SectionId) {
        (StudentId(self.student_id), SectionId(self.section_id))
    }
}

// =============================================================================
// SUBJECTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequest {
    pub code: String,
    pub description: String,
}

impl From<SubjectRequest> for SubjectDraft {
    fn from(request: SubjectRequest) -> Self {
        Self {
            code: request.code,
            description: request.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectJson {
    pub id: u64,
    pub code: String,
    pub description: String,
}

impl From<&Subject> for SubjectJson {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id.0,
            code: subject.code.clone(),
            description: subject.description.clone(),
        }
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRequest {
    pub name: String,
    #[serde(default)]
    pub subject_id: Option<u64>,
}

impl From<SectionRequest> for SectionDraft {
    fn from(request: SectionRequest) -> Self {
        Self {
            name: request.name,
            subject: request.subject_id.map(SubjectId),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionJson {
    pub id: u64,
    pub name: String,
    pub subject_id: Option<u64>,
}

impl From<&Section> for SectionJson {
    fn from(section: &Section) -> Self {
        Self {
            id: section.id.0,
            name: section.name.clone(),
            subject_id: section.subject.map(|s| s.0),
        }
    }
}
