//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    Comment, Course, Credential, EnrolledUser, Enrollment, EnrollmentEvent, ProgressPayload,
    ProgressRecord, Review, Session, StudentProgress, StudentRosterEntry, UserIdentity,
};
pub use errors::{
    DomainError, GatewayError, SourceKind, StatusHint, SHAPE_MISMATCH_MESSAGE,
    UNAUTHORIZED_MESSAGE,
};
