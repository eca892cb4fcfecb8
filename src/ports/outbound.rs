//! Outbound port. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    Course, Credential, Enrollment, GatewayError, ProgressPayload, Review, Session,
};

/// Backend data-source gateway. One method per logical collection or
/// mutation; every call is atomic from the caller's perspective: it either
/// yields the full collection or a single typed error. No aggregation logic,
/// no automatic retries.
#[async_trait::async_trait]
pub trait CourseGateway: Send + Sync {
    /// Fetch one course by id. A forbidden failure here means the caller is
    /// not the course's instructor; `CourseViewService` routes on that.
    async fn get_course(&self, course_id: i64, cred: &Credential)
        -> Result<Course, GatewayError>;

    /// Fetch the course's session list, in display-insertion order.
    async fn get_sessions(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Session>, GatewayError>;

    /// Fetch enrollments filtered by course.
    async fn get_enrollments(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Enrollment>, GatewayError>;

    /// Fetch the raw progress payload for a course. The backend returns a
    /// list for instructors and a single object for students; the payload is
    /// returned undiscriminated so the use case can apply its shape guard.
    async fn get_progress(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<ProgressPayload, GatewayError>;

    /// Fetch the course's reviews, comments included.
    async fn get_reviews(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Review>, GatewayError>;

    async fn post_review(
        &self,
        course_id: i64,
        rating: u8,
        text: &str,
        cred: &Credential,
    ) -> Result<(), GatewayError>;

    async fn post_comment(
        &self,
        review_id: i64,
        text: &str,
        cred: &Credential,
    ) -> Result<(), GatewayError>;

    async fn delete_session(
        &self,
        course_id: i64,
        session_id: i64,
        cred: &Credential,
    ) -> Result<(), GatewayError>;

    async fn delete_course(&self, course_id: i64, cred: &Credential)
        -> Result<(), GatewayError>;

    async fn delete_enrollment(
        &self,
        enrollment_id: i64,
        cred: &Credential,
    ) -> Result<(), GatewayError>;
}
