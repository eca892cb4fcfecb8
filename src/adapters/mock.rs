//! Mock gateway for testing and offline development.
//!
//! Serves in-memory collections without network calls and supports
//! per-source failure injection, so use cases can be exercised against
//! every error path the real backend can produce.

use crate::domain::{
    Course, Credential, EnrolledUser, Enrollment, GatewayError, ProgressPayload, ProgressRecord,
    Review, Session, SourceKind, StudentProgress,
};
use crate::ports::CourseGateway;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

#[derive(Default)]
struct MockState {
    course: Option<Course>,
    sessions: Vec<Session>,
    enrollments: Vec<Enrollment>,
    progress: Vec<ProgressRecord>,
    /// Per-course progress overrides for multi-course statistics scenarios.
    progress_by_course: HashMap<i64, Vec<ProgressRecord>>,
    /// Per-course progress failures, for fan-out isolation scenarios.
    progress_failures: HashMap<i64, GatewayError>,
    reviews: Vec<Review>,
    /// When set, `get_progress` serves the student-view shape instead of
    /// the instructor list.
    student_shape: bool,
    failures: HashMap<SourceKind, GatewayError>,
    mutation_failure: Option<String>,
    /// User id attached to reviews appended via `post_review`.
    poster_id: i64,
    next_id: i64,
}

/// In-memory `CourseGateway`. Mutations are applied to the held state so a
/// refetch observes them, mirroring the real backend.
pub struct MockCourseGateway {
    state: Mutex<MockState>,
}

impl MockCourseGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1000,
                ..MockState::default()
            }),
        }
    }

    /// A small pre-seeded dataset for running the wiring without a backend.
    pub fn with_demo_data() -> Self {
        let gw = Self::new();
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        gw.set_course(Course {
            id: 1,
            title: "Intro to Systems Programming".to_string(),
            description: "Demo course served by the mock gateway".to_string(),
            category_id: Some(3),
            is_published: true,
            created_at: created,
            updated_at: created,
            sessions: Vec::new(),
        });
        gw.set_sessions(vec![
            Session {
                id: 10,
                course_id: 1,
                title: "Memory and Ownership".to_string(),
                youtube_link: None,
                explanation: None,
                duration: Some(25),
            },
            Session {
                id: 11,
                course_id: 1,
                title: "Concurrency Basics".to_string(),
                youtube_link: None,
                explanation: None,
                duration: Some(30),
            },
        ]);
        gw.set_enrollments(vec![
            Enrollment {
                id: 100,
                course_id: 1,
                user_id: 7,
                user: Some(EnrolledUser {
                    name: Some("Ann".to_string()),
                    email: Some("ann@example.com".to_string()),
                }),
                created_at: created,
            },
            Enrollment {
                id: 101,
                course_id: 1,
                user_id: 8,
                user: Some(EnrolledUser {
                    name: Some("Bo".to_string()),
                    email: Some("bo@example.com".to_string()),
                }),
                created_at: created,
            },
        ]);
        gw.set_progress(vec![
            ProgressRecord {
                enrollment_id: 100,
                overall_progress: 60.0,
                user_id: Some(7),
                user: Some(EnrolledUser {
                    name: Some("Ann".to_string()),
                    email: Some("ann@example.com".to_string()),
                }),
                per_session_completion: vec![10],
            },
            ProgressRecord {
                enrollment_id: 101,
                overall_progress: 0.0,
                user_id: Some(8),
                user: Some(EnrolledUser {
                    name: Some("Bo".to_string()),
                    email: Some("bo@example.com".to_string()),
                }),
                per_session_completion: Vec::new(),
            },
        ]);
        gw
    }

    pub fn set_course(&self, course: Course) {
        self.state.lock().unwrap().course = Some(course);
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.state.lock().unwrap().sessions = sessions;
    }

    pub fn set_enrollments(&self, enrollments: Vec<Enrollment>) {
        self.state.lock().unwrap().enrollments = enrollments;
    }

    pub fn set_progress(&self, records: Vec<ProgressRecord>) {
        self.state.lock().unwrap().progress = records;
    }

    /// Progress served for one specific course id, for cross-course
    /// statistics scenarios. Falls back to the shared list when absent.
    pub fn set_progress_for_course(&self, course_id: i64, records: Vec<ProgressRecord>) {
        self.state
            .lock()
            .unwrap()
            .progress_by_course
            .insert(course_id, records);
    }

    pub fn set_reviews(&self, reviews: Vec<Review>) {
        self.state.lock().unwrap().reviews = reviews;
    }

    /// Make the progress fetch for one specific course fail while others
    /// keep succeeding.
    pub fn fail_progress_for_course(&self, course_id: i64, error: GatewayError) {
        self.state
            .lock()
            .unwrap()
            .progress_failures
            .insert(course_id, error);
    }

    /// Serve the student-view progress shape (shape-guard scenarios).
    pub fn serve_student_shape(&self) {
        self.state.lock().unwrap().student_shape = true;
    }

    /// Make one source fail with the given error on every fetch.
    pub fn fail_source(&self, source: SourceKind, error: GatewayError) {
        self.state.lock().unwrap().failures.insert(source, error);
    }

    /// Make every mutation call fail with the given message.
    pub fn fail_mutations(&self, message: impl Into<String>) {
        self.state.lock().unwrap().mutation_failure = Some(message.into());
    }

    /// User id attached to reviews appended by `post_review`.
    pub fn set_poster(&self, user_id: i64) {
        self.state.lock().unwrap().poster_id = user_id;
    }

    fn check_source(state: &MockState, source: SourceKind) -> Result<(), GatewayError> {
        match state.failures.get(&source) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn check_mutation(state: &MockState) -> Result<(), GatewayError> {
        match &state.mutation_failure {
            Some(message) => Err(GatewayError::other(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockCourseGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CourseGateway for MockCourseGateway {
    async fn get_course(
        &self,
        course_id: i64,
        _cred: &Credential,
    ) -> Result<Course, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_source(&state, SourceKind::Course)?;
        state
            .course
            .clone()
            .filter(|c| c.id == course_id)
            .ok_or_else(|| GatewayError::other("Course not found"))
    }

    async fn get_sessions(
        &self,
        _course_id: i64,
        _cred: &Credential,
    ) -> Result<Vec<Session>, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_source(&state, SourceKind::Sessions)?;
        Ok(state.sessions.clone())
    }

    async fn get_enrollments(
        &self,
        course_id: i64,
        _cred: &Credential,
    ) -> Result<Vec<Enrollment>, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_source(&state, SourceKind::Enrollments)?;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn get_progress(
        &self,
        course_id: i64,
        _cred: &Credential,
    ) -> Result<ProgressPayload, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_source(&state, SourceKind::Progress)?;
        if let Some(err) = state.progress_failures.get(&course_id) {
            return Err(err.clone());
        }
        if state.student_shape {
            return Ok(ProgressPayload::StudentView(StudentProgress {
                overall_progress: 50.0,
                progress: Vec::new(),
                sessions: Vec::new(),
            }));
        }
        let records = state
            .progress_by_course
            .get(&course_id)
            .cloned()
            .unwrap_or_else(|| state.progress.clone());
        Ok(ProgressPayload::Records(records))
    }

    async fn get_reviews(
        &self,
        _course_id: i64,
        _cred: &Credential,
    ) -> Result<Vec<Review>, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_source(&state, SourceKind::Reviews)?;
        Ok(state.reviews.clone())
    }

    async fn post_review(
        &self,
        course_id: i64,
        rating: u8,
        text: &str,
        _cred: &Credential,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_mutation(&state)?;
        state.next_id += 1;
        let review = Review {
            id: state.next_id,
            course_id,
            user_id: state.poster_id,
            user: None,
            rating,
            text: text.to_string(),
            comments: Vec::new(),
        };
        state.reviews.push(review);
        info!(course_id, rating, "[MOCK] review stored");
        Ok(())
    }

    async fn post_comment(
        &self,
        review_id: i64,
        text: &str,
        _cred: &Credential,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_mutation(&state)?;
        state.next_id += 1;
        let comment_id = state.next_id;
        let poster_id = state.poster_id;
        let review = state
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| GatewayError::other("Review not found"))?;
        review.comments.push(crate::domain::Comment {
            id: comment_id,
            review_id,
            user_id: poster_id,
            user: None,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_session(
        &self,
        _course_id: i64,
        session_id: i64,
        _cred: &Credential,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_mutation(&state)?;
        state.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn delete_course(
        &self,
        course_id: i64,
        _cred: &Credential,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_mutation(&state)?;
        if state.course.as_ref().is_some_and(|c| c.id == course_id) {
            state.course = None;
        }
        Ok(())
    }

    async fn delete_enrollment(
        &self,
        enrollment_id: i64,
        _cred: &Credential,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_mutation(&state)?;
        state.enrollments.retain(|e| e.id != enrollment_id);
        state.progress.retain(|p| p.enrollment_id != enrollment_id);
        Ok(())
    }
}
