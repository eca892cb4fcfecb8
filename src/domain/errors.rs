//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into `GatewayError`; use cases map
//! those into `DomainError` slots or results. Nothing here is fatal to the
//! process: every error is local to one view-build or one user action.

use thiserror::Error;

/// Message shown when the course-detail fetch comes back forbidden.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: You are not the instructor of this course";

/// Message stored in the progress slot when the student-view shape arrives
/// on an instructor path.
pub const SHAPE_MISMATCH_MESSAGE: &str = "Invalid progress data for instructor view";

/// The only status distinction the core cares about: forbidden routes to the
/// view-wide unauthorized flag, everything else stays a per-source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    Forbidden,
    Other,
}

/// Failure of one atomic collection fetch or mutation call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub status: StatusHint,
    pub message: String,
}

impl GatewayError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusHint::Forbidden,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: StatusHint::Other,
            message: message.into(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == StatusHint::Forbidden
    }
}

/// Which independent collection a fetch error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Course,
    Sessions,
    Enrollments,
    Progress,
    Reviews,
}

impl std::error::Error for SourceKind {}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Course => "course",
            SourceKind::Sessions => "sessions",
            SourceKind::Enrollments => "enrollments",
            SourceKind::Progress => "progress",
            SourceKind::Reviews => "reviews",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// One collection failed to load. Captured per-source; never aborts the
    /// sibling fetches of the same pass.
    #[error("failed to fetch {source}: {cause}")]
    Fetch { source: SourceKind, cause: String },

    /// The caller is not the instructor of the requested course. View-wide:
    /// without course identity the other collections are meaningless.
    #[error("{UNAUTHORIZED_MESSAGE}")]
    Unauthorized,

    /// Progress payload arrived in the student-view shape on an instructor
    /// path. Guard against cross-role data confusion.
    #[error("{SHAPE_MISMATCH_MESSAGE}")]
    ShapeMismatch,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("you have already reviewed this course")]
    AlreadyReviewed,

    /// A delete/unenroll/submit call failed. Prior state is left intact.
    #[error("mutation failed: {0}")]
    Mutation(String),
}
