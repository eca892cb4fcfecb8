//! Course management aggregation: fan out the four per-course fetches,
//! merge into one view, track one error slot per source.
//!
//! - The four fetches run concurrently and are settled independently; one
//!   failure never blocks the other three.
//! - A forbidden course fetch sets the view-wide unauthorized flag.
//! - Student-shape progress payloads are rejected by the shape guard.
//! - Each pass is generation-tagged so a stale in-flight result cannot
//!   overwrite newer state.

use crate::domain::{
    Course, Credential, DomainError, Enrollment, EnrollmentEvent, ProgressPayload, ProgressRecord,
    Session, SHAPE_MISMATCH_MESSAGE, UNAUTHORIZED_MESSAGE,
};
use crate::ports::CourseGateway;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One independent error slot per fetched collection. A populated slot means
/// that source failed while the others were still merged normally.
#[derive(Debug, Clone, Default)]
pub struct SourceErrors {
    pub course: Option<String>,
    pub sessions: Option<String>,
    pub enrollments: Option<String>,
    pub progress: Option<String>,
}

impl SourceErrors {
    pub fn any(&self) -> bool {
        self.course.is_some()
            || self.sessions.is_some()
            || self.enrollments.is_some()
            || self.progress.is_some()
    }
}

/// Snapshot of everything the instructor's management page needs for one
/// course. Exclusively owned by the caller of one aggregation pass and
/// replaced wholesale on refresh, except for the optimistic removals applied
/// by the mutation operations.
#[derive(Debug, Clone)]
pub struct CourseManagementView {
    pub course_id: i64,
    pub generation: u64,
    pub course: Option<Course>,
    pub sessions: Vec<Session>,
    pub enrollments: Vec<Enrollment>,
    pub progress_by_enrollment: HashMap<i64, ProgressRecord>,
    pub errors: SourceErrors,
    /// Set only when the course-detail fetch is forbidden; overrides the
    /// per-source course error because the whole view is meaningless then.
    pub unauthorized: Option<String>,
}

impl CourseManagementView {
    fn empty(course_id: i64, generation: u64) -> Self {
        Self {
            course_id,
            generation,
            course: None,
            sessions: Vec::new(),
            enrollments: Vec::new(),
            progress_by_enrollment: HashMap::new(),
            errors: SourceErrors::default(),
            unauthorized: None,
        }
    }
}

/// Builds and mutates the instructor's course-management view.
pub struct CourseViewService {
    gateway: Arc<dyn CourseGateway>,
    events: mpsc::UnboundedSender<EnrollmentEvent>,
    pass_counter: AtomicU64,
}

impl CourseViewService {
    pub fn new(
        gateway: Arc<dyn CourseGateway>,
        events: mpsc::UnboundedSender<EnrollmentEvent>,
    ) -> Self {
        Self {
            gateway,
            events,
            pass_counter: AtomicU64::new(0),
        }
    }

    /// Start a new aggregation pass and return its generation tag. Any pass
    /// with an older tag is superseded.
    pub fn begin_pass(&self) -> u64 {
        self.pass_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the given pass is still the most recent one.
    pub fn is_latest(&self, generation: u64) -> bool {
        self.pass_counter.load(Ordering::SeqCst) == generation
    }

    /// One full aggregation pass. Returns `None` when a newer pass started
    /// while this one was in flight; the stale result must be discarded.
    pub async fn build_course_view(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Option<CourseManagementView> {
        let generation = self.begin_pass();

        // Settle all four, then inspect. join! awaits every arm; a failed
        // arm resolves to its own Err without cancelling the siblings.
        let (course_res, sessions_res, enrollments_res, progress_res) = tokio::join!(
            self.gateway.get_course(course_id, cred),
            self.gateway.get_sessions(course_id, cred),
            self.gateway.get_enrollments(course_id, cred),
            self.gateway.get_progress(course_id, cred),
        );

        if !self.is_latest(generation) {
            debug!(course_id, generation, "pass superseded, discarding result");
            return None;
        }

        let mut view = CourseManagementView::empty(course_id, generation);

        match course_res {
            Ok(course) => view.course = Some(course),
            Err(e) if e.is_forbidden() => {
                warn!(course_id, "course fetch forbidden");
                view.unauthorized = Some(UNAUTHORIZED_MESSAGE.to_string());
            }
            Err(e) => view.errors.course = Some(e.message),
        }

        match sessions_res {
            Ok(sessions) => view.sessions = sessions,
            Err(e) => view.errors.sessions = Some(e.message),
        }

        let mut enrollments_loaded = false;
        match enrollments_res {
            Ok(enrollments) => {
                view.enrollments = enrollments;
                enrollments_loaded = true;
            }
            Err(e) => view.errors.enrollments = Some(e.message),
        }

        match progress_res {
            Ok(ProgressPayload::Records(records)) => {
                view.progress_by_enrollment =
                    normalize_progress(records, enrollments_loaded.then(|| &view.enrollments));
            }
            Ok(ProgressPayload::StudentView(_)) => {
                warn!(course_id, "received student progress shape on instructor path");
                view.errors.progress = Some(SHAPE_MISMATCH_MESSAGE.to_string());
            }
            Err(e) => view.errors.progress = Some(e.message),
        }

        info!(
            course_id,
            generation,
            sessions = view.sessions.len(),
            enrollments = view.enrollments.len(),
            progress = view.progress_by_enrollment.len(),
            errors = view.errors.any(),
            "course view built"
        );

        Some(view)
    }

    /// Delete a session remotely, then drop it from the view. The view is
    /// untouched when the remote call fails.
    pub async fn delete_session(
        &self,
        view: &mut CourseManagementView,
        session_id: i64,
        cred: &Credential,
    ) -> Result<(), DomainError> {
        self.gateway
            .delete_session(view.course_id, session_id, cred)
            .await
            .map_err(|e| DomainError::Mutation(e.message))?;
        view.sessions.retain(|s| s.id != session_id);
        info!(course_id = view.course_id, session_id, "session deleted");
        Ok(())
    }

    /// Delete the whole course remotely. The caller abandons the view after
    /// this succeeds.
    pub async fn delete_course(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<(), DomainError> {
        self.gateway
            .delete_course(course_id, cred)
            .await
            .map_err(|e| DomainError::Mutation(e.message))?;
        info!(course_id, "course deleted");
        Ok(())
    }

    /// Unenroll a student remotely, then drop the enrollment and its
    /// dependent progress entry from the view and broadcast the change.
    /// The view is untouched when the remote call fails.
    pub async fn unenroll_student(
        &self,
        view: &mut CourseManagementView,
        enrollment_id: i64,
        cred: &Credential,
    ) -> Result<(), DomainError> {
        self.gateway
            .delete_enrollment(enrollment_id, cred)
            .await
            .map_err(|e| DomainError::Mutation(e.message))?;

        view.enrollments.retain(|e| e.id != enrollment_id);
        view.progress_by_enrollment.remove(&enrollment_id);

        let event = EnrollmentEvent::Unenrolled {
            course_id: view.course_id,
            enrollment_id,
        };
        if self.events.send(event).is_err() {
            warn!(enrollment_id, "enrollment event channel closed, dropping");
        }

        info!(course_id = view.course_id, enrollment_id, "student unenrolled");
        Ok(())
    }
}

/// Fold the flat progress list into a lookup by enrollment id.
/// Last write wins on duplicate keys. Records whose enrollment id has no
/// matching enrollment are stale data and dropped silently; the filter is
/// skipped when the enrollment fetch itself failed, since an empty
/// enrollment set then says nothing about staleness.
fn normalize_progress(
    records: Vec<ProgressRecord>,
    enrollments: Option<&Vec<Enrollment>>,
) -> HashMap<i64, ProgressRecord> {
    let known: Option<HashSet<i64>> =
        enrollments.map(|list| list.iter().map(|e| e.id).collect());

    let mut map = HashMap::new();
    for record in records {
        if let Some(known) = &known {
            if !known.contains(&record.enrollment_id) {
                debug!(
                    enrollment_id = record.enrollment_id,
                    "dropping stale progress record"
                );
                continue;
            }
        }
        map.insert(record.enrollment_id, record);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockCourseGateway;
    use crate::domain::{EnrolledUser, GatewayError, SourceKind};
    use chrono::{TimeZone, Utc};

    fn cred() -> Credential {
        Credential("test-token".to_string())
    }

    fn enrollment(id: i64, user_id: i64, name: &str) -> Enrollment {
        Enrollment {
            id,
            course_id: 1,
            user_id,
            user: Some(EnrolledUser {
                name: Some(name.to_string()),
                email: Some(format!("{}@example.com", name.to_lowercase())),
            }),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn progress(enrollment_id: i64, pct: f64) -> ProgressRecord {
        ProgressRecord {
            enrollment_id,
            overall_progress: pct,
            user_id: None,
            user: None,
            per_session_completion: Vec::new(),
        }
    }

    fn service(gateway: Arc<MockCourseGateway>) -> CourseViewService {
        let (tx, _rx) = mpsc::unbounded_channel();
        CourseViewService::new(gateway, tx)
    }

    #[tokio::test]
    async fn test_full_view_built() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert_eq!(view.course.as_ref().unwrap().id, 1);
        assert_eq!(view.sessions.len(), 2);
        assert_eq!(view.enrollments.len(), 2);
        assert_eq!(view.progress_by_enrollment.len(), 2);
        assert!(!view.errors.any());
        assert!(view.unauthorized.is_none());
    }

    #[tokio::test]
    async fn test_one_source_failing_does_not_block_others() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.fail_source(
            SourceKind::Enrollments,
            GatewayError::other("Failed to load enrollments"),
        );
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert!(view.course.is_some());
        assert_eq!(view.sessions.len(), 2);
        assert!(view.enrollments.is_empty());
        assert_eq!(
            view.errors.enrollments.as_deref(),
            Some("Failed to load enrollments")
        );
        // Enrollment fetch failed, so the stale filter is skipped and the
        // progress map still carries the fetched records.
        assert_eq!(view.progress_by_enrollment.len(), 2);
    }

    #[tokio::test]
    async fn test_forbidden_course_sets_unauthorized() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.fail_source(SourceKind::Course, GatewayError::forbidden("Forbidden"));
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert_eq!(view.unauthorized.as_deref(), Some(UNAUTHORIZED_MESSAGE));
        assert!(view.course.is_none());
        assert!(view.errors.course.is_none());
        // The other three fetches still settled.
        assert_eq!(view.sessions.len(), 2);
        assert_eq!(view.enrollments.len(), 2);
    }

    #[tokio::test]
    async fn test_non_forbidden_course_failure_stays_per_source() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.fail_source(SourceKind::Course, GatewayError::other("boom"));
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert!(view.unauthorized.is_none());
        assert_eq!(view.errors.course.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_student_shape_rejected_by_guard() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.serve_student_shape();
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert_eq!(view.errors.progress.as_deref(), Some(SHAPE_MISMATCH_MESSAGE));
        assert!(view.progress_by_enrollment.is_empty());
        // Other slots unaffected.
        assert!(view.course.is_some());
        assert_eq!(view.enrollments.len(), 2);
        assert!(view.errors.enrollments.is_none());
    }

    #[tokio::test]
    async fn test_progress_duplicates_last_write_wins_and_stale_dropped() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.set_enrollments(vec![enrollment(100, 7, "Ann")]);
        gateway.set_progress(vec![
            progress(100, 20.0),
            progress(100, 80.0),
            // No enrollment 999 exists: stale, dropped silently.
            progress(999, 50.0),
        ]);
        let svc = service(Arc::clone(&gateway));

        let view = svc.build_course_view(1, &cred()).await.unwrap();

        assert_eq!(view.progress_by_enrollment.len(), 1);
        assert_eq!(
            view.progress_by_enrollment.get(&100).unwrap().overall_progress,
            80.0
        );
        assert!(view.errors.progress.is_none());
    }

    #[tokio::test]
    async fn test_unenroll_removes_progress_and_emits_event() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let svc = CourseViewService::new(
            Arc::clone(&gateway) as Arc<dyn CourseGateway>,
            tx,
        );

        let mut view = svc.build_course_view(1, &cred()).await.unwrap();
        assert!(view.progress_by_enrollment.contains_key(&100));

        svc.unenroll_student(&mut view, 100, &cred()).await.unwrap();

        assert!(view.enrollments.iter().all(|e| e.id != 100));
        assert!(!view.progress_by_enrollment.contains_key(&100));
        assert_eq!(
            rx.recv().await,
            Some(EnrollmentEvent::Unenrolled {
                course_id: 1,
                enrollment_id: 100
            })
        );
    }

    #[tokio::test]
    async fn test_failed_unenroll_leaves_view_unchanged() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        gateway.fail_mutations("backend unavailable");
        let svc = service(Arc::clone(&gateway));

        let mut view = svc.build_course_view(1, &cred()).await.unwrap();
        let before = view.enrollments.len();

        let err = svc
            .unenroll_student(&mut view, 100, &cred())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Mutation(_)));
        assert_eq!(view.enrollments.len(), before);
        assert!(view.progress_by_enrollment.contains_key(&100));
    }

    #[tokio::test]
    async fn test_delete_session_applies_local_removal_only_on_success() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        let svc = service(Arc::clone(&gateway));

        let mut view = svc.build_course_view(1, &cred()).await.unwrap();
        svc.delete_session(&mut view, 10, &cred()).await.unwrap();
        assert!(view.sessions.iter().all(|s| s.id != 10));

        gateway.fail_mutations("nope");
        let err = svc.delete_session(&mut view, 11, &cred()).await.unwrap_err();
        assert!(matches!(err, DomainError::Mutation(_)));
        assert!(view.sessions.iter().any(|s| s.id == 11));
    }

    #[tokio::test]
    async fn test_generation_guard_marks_older_pass_stale() {
        let gateway = Arc::new(MockCourseGateway::with_demo_data());
        let svc = service(gateway);

        let first = svc.begin_pass();
        let second = svc.begin_pass();

        assert!(!svc.is_latest(first));
        assert!(svc.is_latest(second));

        // A fresh build after those passes is itself latest and completes.
        let view = svc.build_course_view(1, &cred()).await;
        assert!(view.is_some());
    }
}
