//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/IO types here; these are mapped from adapters. Wire-facing
//! structs use camelCase field names to match the backend payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token supplied by the external session/auth collaborator.
/// Read-only during an aggregation pass; no component mutates it.
#[derive(Debug, Clone)]
pub struct Credential(pub String);

impl Credential {
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// The caller's identity, as far as this core needs it.
#[derive(Debug, Clone, Copy)]
pub struct UserIdentity {
    pub id: i64,
    pub is_instructor: bool,
}

/// A course owned by an instructor. Immutable once fetched; mutated only
/// via explicit delete operations that go through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Embedded on list endpoints; detail consumers may ignore it.
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// A lesson/session belonging to exactly one course. Display-insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub youtube_link: Option<String>,
    /// Rich-text body; opaque to the aggregation core.
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

/// Name/email pair embedded in enrollments, progress records, and reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrolledUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Relation linking one student to one course. Unique per (course, user),
/// enforced by the backend; consumed as a given here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user: Option<EnrolledUser>,
    pub created_at: DateTime<Utc>,
}

/// Per-enrollment completion record (instructor shape). Recomputed by the
/// backend; the core only folds a flat list into a lookup by enrollment id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub enrollment_id: i64,
    pub overall_progress: f64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user: Option<EnrolledUser>,
    /// Session ids the student has completed.
    #[serde(default)]
    pub per_session_completion: Vec<i64>,
}

/// The shape the backend returns for a *student's own* progress view.
/// Recognized only so the instructor paths can reject it (see
/// `CourseViewService`); its inner payloads are opaque here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub overall_progress: f64,
    #[serde(default)]
    pub progress: Vec<serde_json::Value>,
    #[serde(default)]
    pub sessions: Vec<serde_json::Value>,
}

/// Raw progress payload as fetched. The backend returns a list for
/// instructors and a single object for students; the untagged decode
/// lets the use case apply the shape guard instead of crashing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProgressPayload {
    Records(Vec<ProgressRecord>),
    StudentView(StudentProgress),
}

/// A course review. At most one per (course, user), enforced client-side
/// by `ReviewBoard` even if the backend does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub course_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user: Option<EnrolledUser>,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A comment on a review. Depth 1, no nested replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user: Option<EnrolledUser>,
    pub text: String,
}

/// One unique student across all of an instructor's courses, with how many
/// of those courses they are enrolled in. Derived; recomputed every pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRosterEntry {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub enrollment_count: usize,
}

/// Broadcast when a mutation changes the enrollment set, so other views
/// (dashboards, statistics) can refresh. Explicit channel handle instead
/// of an ambient global signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentEvent {
    Unenrolled { course_id: i64, enrollment_id: i64 },
}
