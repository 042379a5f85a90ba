//! # CLI Command Implementations

use crate::AppError;
use crate::api;
use crate::config::{Backend, RosterConfig};
use roster_core::{Roster, SeedBatch, SectionId, StudentId};
use std::path::Path;

/// Maximum seed file size (10 MB).
const MAX_SEED_FILE_SIZE: u64 = 10 * 1024 * 1024;

// =============================================================================
// HELPERS
// =============================================================================

/// Open the roster the configuration points at.
pub fn open_roster(config: &RosterConfig) -> Result<Roster, AppError> {
    match config.storage.backend {
        Backend::Redb => Ok(Roster::with_redb(&config.storage.database)?),
        Backend::Memory => Ok(Roster::new()),
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Read and parse a seed file, refusing oversized or non-file paths.
pub fn read_seed_file(path: &Path) -> Result<SeedBatch, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Io(format!("Invalid file path '{}': {}", path.display(), e)))?;
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_SEED_FILE_SIZE {
        return Err(AppError::Seed(format!(
            "file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SEED_FILE_SIZE
        )));
    }

    let data = std::fs::read(&canonical)
        .map_err(|e| AppError::Io(format!("Read seed file: {}", e)))?;
    serde_json::from_slice(&data).map_err(|e| AppError::Seed(e.to_string()))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(config: &RosterConfig) -> Result<(), AppError> {
    let roster = open_roster(config)?;
    let addr = config.bind_addr();

    println!("Roster Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Backend:  {}", config.storage.backend.as_str());
    if config.storage.backend == Backend::Redb {
        println!("  Database: {}", config.storage.database.display());
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /api/students         - List students");
    println!("  POST /api/students/enroll  - Enroll a student");
    println!("  GET  /api/subjects         - List subjects");
    println!("  GET  /api/sections         - List sections");
    println!("  GET  /status               - Row counts");
    println!("  GET  /health               - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&addr, roster, &config.security).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(config: &RosterConfig, json_mode: bool) -> Result<(), AppError> {
    let roster = open_roster(config)?;
    let counts = roster.status()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": roster.backend_name(),
            "students": counts.students,
            "subjects": counts.subjects,
            "sections": counts.sections,
            "enrollments": counts.enrollments,
        }));
        return Ok(());
    }

    println!("Roster Status");
    println!("=============");
    println!("Database: {}", config.storage.database.display());
    println!("Backend:  {}", roster.backend_name());
    println!();
    println!("Students:    {}", counts.students);
    println!("Subjects:    {}", counts.subjects);
    println!("Sections:    {}", counts.sections);
    println!("Enrollments: {}", counts.enrollments);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

pub fn cmd_init(config: &RosterConfig, force: bool) -> Result<(), AppError> {
    if config.storage.backend == Backend::Memory {
        println!("Memory backend selected; nothing to initialize.");
        return Ok(());
    }

    let path = &config.storage.database;
    if path.exists() {
        if !force {
            return Err(AppError::Io(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| AppError::Io(format!("Remove existing database: {}", e)))?;
        tracing::info!(path = %path.display(), "removed existing database");
    }

    let _roster = Roster::with_redb(path)?;
    println!("Initialized new redb database at {}", path.display());
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

pub fn cmd_seed(config: &RosterConfig, json_mode: bool, file: &Path) -> Result<(), AppError> {
    let batch = read_seed_file(file)?;
    let mut roster = open_roster(config)?;
    let report = roster.seed(&batch)?;
    tracing::info!(
        subjects = report.subjects,
        sections = report.sections,
        students = report.students,
        enrollments = report.enrollments,
        "seed applied"
    );

    if json_mode {
        print_json(&serde_json::json!({
            "success": true,
            "subjects": report.subjects,
            "sections": report.sections,
            "students": report.students,
            "enrollments": report.enrollments,
        }));
    } else {
        println!(
            "Seeded {} subjects, {} sections, {} students, {} enrollments",
            report.subjects, report.sections, report.students, report.enrollments
        );
    }
    Ok(())
}

// =============================================================================
// STUDENT COMMANDS
// =============================================================================

pub fn cmd_students(config: &RosterConfig, json_mode: bool) -> Result<(), AppError> {
    let roster = open_roster(config)?;
    let students = roster.list_students()?;

    if json_mode {
        let rows: Vec<api::StudentSummaryJson> = students.into_iter().map(Into::into).collect();
        print_json(&serde_json::to_value(rows).unwrap_or_default());
        return Ok(());
    }

    if students.is_empty() {
        println!("No students.");
        return Ok(());
    }
    println!("{:<6} {:<10} {:<30} Email", "ID", "Number", "Name");
    for student in students {
        println!(
            "{:<6} {:<10} {:<30} {}",
            student.id, student.student_number, student.full_name, student.email
        );
    }
    Ok(())
}

pub fn cmd_enroll(
    config: &RosterConfig,
    json_mode: bool,
    student: u64,
    section: u64,
) -> Result<(), AppError> {
    let mut roster = open_roster(config)?;
    roster.enroll(StudentId(student), SectionId(section))?;
    report(json_mode, "Student enrolled successfully.");
    Ok(())
}

pub fn cmd_withdraw(
    config: &RosterConfig,
    json_mode: bool,
    student: u64,
    section: u64,
) -> Result<(), AppError> {
    let mut roster = open_roster(config)?;
    roster.withdraw(StudentId(student), SectionId(section))?;
    report(json_mode, "Student withdrawn successfully.");
    Ok(())
}

pub fn cmd_delete_student(config: &RosterConfig, json_mode: bool, id: u64) -> Result<(), AppError> {
    let mut roster = open_roster(config)?;
    let removed = roster.delete_student(StudentId(id))?;
    tracing::info!(student = id, enrollments = removed, "student deleted");
    report(json_mode, "Student deleted successfully.");
    Ok(())
}

fn report(json_mode: bool, message: &str) {
    if json_mode {
        print_json(&serde_json::json!({ "success": true, "message": message }));
    } else {
        println!("{}", message);
    }
}

// =============================================================================
// TESTS
// =============================================================================
