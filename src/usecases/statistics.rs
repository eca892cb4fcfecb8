//! Cross-course statistics: per-course summary metrics plus a deduplicated
//! student roster with enrollment counts.
//!
//! Progress is fetched once per course and reused for both the per-course
//! metric and the roster. The fan-out is isolated per course: one course's
//! failure populates only that course's error slot and never aborts the
//! rest of the batch, matching the per-source rule of the single-course view.

use crate::domain::{
    Course, Credential, GatewayError, ProgressPayload, ProgressRecord, StudentRosterEntry,
    SHAPE_MISMATCH_MESSAGE,
};
use crate::ports::CourseGateway;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Summary metrics for one course. When `error` is set the fetch for this
/// course failed and the enrollment-derived numbers are zeroed.
#[derive(Debug, Clone)]
pub struct CourseStats {
    pub course_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_sessions: usize,
    pub total_enrollments: usize,
    pub completed_sessions: usize,
    /// Share of enrollments with any progress, as a percentage.
    pub overall_progress: f64,
    pub error: Option<String>,
}

/// The instructor's cross-course statistics view. Recomputed wholesale on
/// every aggregation pass; nothing here is cached or persisted.
#[derive(Debug, Clone)]
pub struct InstructorStatistics {
    pub total_courses: usize,
    pub total_sessions: usize,
    pub per_course: Vec<CourseStats>,
    pub roster: Vec<StudentRosterEntry>,
}

/// Builds the instructor's statistics view.
pub struct StatsService {
    gateway: Arc<dyn CourseGateway>,
}

impl StatsService {
    pub fn new(gateway: Arc<dyn CourseGateway>) -> Self {
        Self { gateway }
    }

    /// One statistics pass over all of the instructor's courses. The course
    /// list itself comes from the caller (it is part of the dashboard's own
    /// fetch); this only fans out the per-course progress fetches.
    pub async fn build_instructor_stats(
        &self,
        courses: &[Course],
        cred: &Credential,
    ) -> InstructorStatistics {
        let progress_by_course = self.fetch_progress_fan_out(courses, cred).await;

        let mut per_course = Vec::with_capacity(courses.len());
        let mut roster: Vec<StudentRosterEntry> = Vec::new();
        let mut roster_index: HashMap<i64, usize> = HashMap::new();

        // Iterate courses in input order so the roster keeps first-occurrence
        // insertion order even though the fan-out completed unordered.
        for course in courses {
            let result = progress_by_course
                .get(&course.id)
                .cloned()
                .unwrap_or_else(|| Err(GatewayError::other("progress fetch missing")));

            match result {
                Ok(records) => {
                    per_course.push(compute_course_stats(course, &records));
                    accumulate_roster(&records, &mut roster, &mut roster_index);
                }
                Err(e) => {
                    warn!(course_id = course.id, error = %e, "progress fetch failed for course");
                    per_course.push(failed_course_stats(course, e.message));
                }
            }
        }

        let stats = InstructorStatistics {
            total_courses: courses.len(),
            total_sessions: courses.iter().map(|c| c.sessions.len()).sum(),
            per_course,
            roster,
        };

        info!(
            total_courses = stats.total_courses,
            total_sessions = stats.total_sessions,
            roster = stats.roster.len(),
            "instructor statistics built"
        );

        stats
    }

    /// Issue one progress fetch per course concurrently and settle them all.
    async fn fetch_progress_fan_out(
        &self,
        courses: &[Course],
        cred: &Credential,
    ) -> HashMap<i64, Result<Vec<ProgressRecord>, GatewayError>> {
        let mut tasks = JoinSet::new();
        for course in courses {
            let gateway = Arc::clone(&self.gateway);
            let cred = cred.clone();
            let course_id = course.id;
            tasks.spawn(async move {
                let result = match gateway.get_progress(course_id, &cred).await {
                    Ok(ProgressPayload::Records(records)) => Ok(records),
                    Ok(ProgressPayload::StudentView(_)) => {
                        Err(GatewayError::other(SHAPE_MISMATCH_MESSAGE))
                    }
                    Err(e) => Err(e),
                };
                (course_id, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((course_id, result)) => {
                    results.insert(course_id, result);
                }
                Err(e) => warn!(error = %e, "progress fetch task panicked"),
            }
        }
        results
    }
}

fn compute_course_stats(course: &Course, records: &[ProgressRecord]) -> CourseStats {
    let total_enrollments = records.len();
    let completed_sessions = records.iter().filter(|p| p.overall_progress > 0.0).count();
    let overall_progress = if total_enrollments > 0 {
        completed_sessions as f64 / total_enrollments as f64 * 100.0
    } else {
        0.0
    };
    CourseStats {
        course_id: course.id,
        title: course.title.clone(),
        created_at: course.created_at,
        updated_at: course.updated_at,
        total_sessions: course.sessions.len(),
        total_enrollments,
        completed_sessions,
        overall_progress,
        error: None,
    }
}

fn failed_course_stats(course: &Course, message: String) -> CourseStats {
    CourseStats {
        course_id: course.id,
        title: course.title.clone(),
        created_at: course.created_at,
        updated_at: course.updated_at,
        total_sessions: course.sessions.len(),
        total_enrollments: 0,
        completed_sessions: 0,
        overall_progress: 0.0,
        error: Some(message),
    }
}

/// Group progress records' users by user id. First occurrence seeds the
/// roster entry; every occurrence increments the enrollment count. Records
/// without a user id carry no student identity and are skipped.
fn accumulate_roster(
    records: &[ProgressRecord],
    roster: &mut Vec<StudentRosterEntry>,
    index: &mut HashMap<i64, usize>,
) {
    for record in records {
        let Some(user_id) = record.user_id else {
            continue;
        };
        let slot = *index.entry(user_id).or_insert_with(|| {
            roster.push(StudentRosterEntry {
                user_id,
                name: record.user.as_ref().and_then(|u| u.name.clone()),
                email: record.user.as_ref().and_then(|u| u.email.clone()),
                enrollment_count: 0,
            });
            roster.len() - 1
        });
        roster[slot].enrollment_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockCourseGateway;
    use crate::domain::EnrolledUser;
    use chrono::TimeZone;

    fn cred() -> Credential {
        Credential("test-token".to_string())
    }

    fn course(id: i64, title: &str, session_count: usize) -> Course {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        Course {
            id,
            title: title.to_string(),
            description: String::new(),
            category_id: None,
            is_published: true,
            created_at: created,
            updated_at: created,
            sessions: (0..session_count)
                .map(|i| crate::domain::Session {
                    id: id * 100 + i as i64,
                    course_id: id,
                    title: format!("Session {}", i),
                    youtube_link: None,
                    explanation: None,
                    duration: None,
                })
                .collect(),
        }
    }

    fn record(enrollment_id: i64, user_id: i64, name: &str, pct: f64) -> ProgressRecord {
        ProgressRecord {
            enrollment_id,
            overall_progress: pct,
            user_id: Some(user_id),
            user: Some(EnrolledUser {
                name: Some(name.to_string()),
                email: Some(format!("{}@x", name.to_lowercase())),
            }),
            per_session_completion: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_per_course_metrics() {
        let gateway = Arc::new(MockCourseGateway::new());
        gateway.set_progress_for_course(
            1,
            vec![
                record(10, 1, "Ann", 60.0),
                record(11, 2, "Bo", 0.0),
                record(12, 3, "Cara", 20.0),
            ],
        );
        let svc = StatsService::new(gateway);

        let stats = svc
            .build_instructor_stats(&[course(1, "Rust", 4)], &cred())
            .await;

        assert_eq!(stats.total_courses, 1);
        assert_eq!(stats.total_sessions, 4);
        let cs = &stats.per_course[0];
        assert_eq!(cs.total_enrollments, 3);
        assert_eq!(cs.completed_sessions, 2);
        assert!((cs.overall_progress - 66.666).abs() < 0.01);
        assert!(cs.error.is_none());
    }

    #[tokio::test]
    async fn test_no_enrollments_yields_zero_progress() {
        let gateway = Arc::new(MockCourseGateway::new());
        gateway.set_progress_for_course(1, Vec::new());
        let svc = StatsService::new(gateway);

        let stats = svc
            .build_instructor_stats(&[course(1, "Empty", 2)], &cred())
            .await;

        assert_eq!(stats.per_course[0].total_enrollments, 0);
        assert_eq!(stats.per_course[0].overall_progress, 0.0);
    }

    #[tokio::test]
    async fn test_roster_dedup_counts_enrollments_in_first_occurrence_order() {
        let gateway = Arc::new(MockCourseGateway::new());
        gateway.set_progress_for_course(1, vec![record(10, 1, "Ann", 50.0)]);
        gateway.set_progress_for_course(
            2,
            vec![record(20, 1, "Ann", 10.0), record(21, 2, "Bo", 0.0)],
        );
        let svc = StatsService::new(gateway);

        let stats = svc
            .build_instructor_stats(&[course(1, "A", 1), course(2, "B", 1)], &cred())
            .await;

        assert_eq!(stats.roster.len(), 2);
        assert_eq!(stats.roster[0].user_id, 1);
        assert_eq!(stats.roster[0].enrollment_count, 2);
        assert_eq!(stats.roster[1].user_id, 2);
        assert_eq!(stats.roster[1].enrollment_count, 1);
    }

    #[tokio::test]
    async fn test_one_course_failure_is_isolated() {
        let gateway = Arc::new(MockCourseGateway::new());
        gateway.set_progress_for_course(1, vec![record(10, 1, "Ann", 50.0)]);
        gateway.fail_progress_for_course(2, GatewayError::other("boom"));
        gateway.set_progress_for_course(3, vec![record(30, 3, "Cara", 0.0)]);
        let svc = StatsService::new(Arc::clone(&gateway) as Arc<dyn CourseGateway>);

        let stats = svc
            .build_instructor_stats(
                &[course(1, "A", 1), course(2, "B", 1), course(3, "C", 1)],
                &cred(),
            )
            .await;

        assert_eq!(stats.per_course.len(), 3);
        assert!(stats.per_course[0].error.is_none());
        assert_eq!(stats.per_course[0].total_enrollments, 1);
        assert_eq!(stats.per_course[1].error.as_deref(), Some("boom"));
        assert_eq!(stats.per_course[1].total_enrollments, 0);
        assert!(stats.per_course[2].error.is_none());

        // Roster still computed from the courses that succeeded.
        let roster_ids: Vec<i64> = stats.roster.iter().map(|r| r.user_id).collect();
        assert_eq!(roster_ids, vec![1, 3]);
        assert_eq!(stats.total_courses, 3);
    }

    #[tokio::test]
    async fn test_student_shape_populates_course_error_slot() {
        let gateway = Arc::new(MockCourseGateway::new());
        gateway.serve_student_shape();
        let svc = StatsService::new(gateway);

        let stats = svc
            .build_instructor_stats(&[course(1, "A", 1)], &cred())
            .await;

        assert_eq!(
            stats.per_course[0].error.as_deref(),
            Some(SHAPE_MISMATCH_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_records_without_user_id_skipped_in_roster() {
        let gateway = Arc::new(MockCourseGateway::new());
        let mut anonymous = record(10, 1, "Ann", 50.0);
        anonymous.user_id = None;
        gateway.set_progress_for_course(1, vec![anonymous, record(11, 2, "Bo", 0.0)]);
        let svc = StatsService::new(gateway);

        let stats = svc
            .build_instructor_stats(&[course(1, "A", 1)], &cred())
            .await;

        assert_eq!(stats.roster.len(), 1);
        assert_eq!(stats.roster[0].user_id, 2);
    }
}
