//! Wiring & DI. Entry point: bootstrap the gateway, inject into services,
//! run one demonstration aggregation pass. No business logic here.

use courseboard::adapters::{MockCourseGateway, RestCourseGateway};
use courseboard::domain::{Credential, UserIdentity};
use courseboard::ports::CourseGateway;
use courseboard::shared::config::AppConfig;
use courseboard::usecases::{
    enrollment_table, CourseViewService, ReviewBoard, StatsService, TableState,
};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = AppConfig::load().unwrap_or_default();

    // --- Gateway selection: real backend when configured, mock otherwise ---
    let gateway: Arc<dyn CourseGateway> = if cfg.is_backend_configured() {
        let api_url = cfg.api_url.clone().unwrap_or_default();
        info!(%api_url, "using REST gateway");
        Arc::new(RestCourseGateway::new(api_url))
    } else {
        warn!("COURSEBOARD_API_URL / COURSEBOARD_API_TOKEN not set, using mock gateway");
        Arc::new(MockCourseGateway::with_demo_data())
    };

    let cred = Credential(cfg.api_token.clone().unwrap_or_default());
    let course_id = cfg.course_id_or_default();
    let current_user = UserIdentity {
        id: cfg.user_id_or_default(),
        is_instructor: cfg.is_instructor_or_default(),
    };

    // --- Enrollment-change events: explicit channel, logged by a listener ---
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!(?event, "enrollment changed, dependent views should refresh");
        }
    });

    // --- Course management view ---
    let course_view = CourseViewService::new(Arc::clone(&gateway), events_tx);
    let Some(view) = course_view.build_course_view(course_id, &cred).await else {
        warn!(course_id, "aggregation pass superseded");
        return Ok(());
    };

    if let Some(message) = &view.unauthorized {
        warn!(course_id, %message, "view unavailable");
        return Ok(());
    }

    info!(
        course_id,
        title = view.course.as_ref().map(|c| c.title.as_str()).unwrap_or("?"),
        sessions = view.sessions.len(),
        enrollments = view.enrollments.len(),
        "course view ready"
    );
    if view.errors.any() {
        warn!(?view.errors, "some sources failed to load");
    }

    // --- First page of the enrolled-students table ---
    let table = TableState::default();
    let page = enrollment_table::project(
        &view.enrollments,
        &view.progress_by_enrollment,
        &table,
        enrollment_table::DEFAULT_PAGE_SIZE,
    );
    info!(
        page = page.page,
        total_pages = page.total_pages,
        from = page.from,
        to = page.to,
        total = page.total,
        "enrolled students page"
    );
    for row in &page.rows {
        info!(
            enrollment_id = row.enrollment.id,
            name = row
                .enrollment
                .user
                .as_ref()
                .and_then(|u| u.name.as_deref())
                .unwrap_or("N/A"),
            progress = row.progress_pct.map(|p| p.round()).unwrap_or(0.0),
            "row"
        );
    }

    // --- Reviews ---
    let mut board = ReviewBoard::new(Arc::clone(&gateway), course_id, current_user);
    match board.load(&cred).await {
        Ok(()) => info!(reviews = board.reviews().len(), "reviews loaded"),
        Err(e) => warn!(error = %e, "failed to load reviews"),
    }

    // --- Cross-course statistics over the course we just fetched ---
    if let Some(course) = view.course.clone() {
        let stats_service = StatsService::new(Arc::clone(&gateway));
        let stats = stats_service
            .build_instructor_stats(std::slice::from_ref(&course), &cred)
            .await;
        for cs in &stats.per_course {
            info!(
                course_id = cs.course_id,
                title = %cs.title,
                enrollments = cs.total_enrollments,
                completed = cs.completed_sessions,
                progress = %format!("{:.1}%", cs.overall_progress),
                error = cs.error.as_deref().unwrap_or(""),
                "course statistics"
            );
        }
        info!(
            total_courses = stats.total_courses,
            students = stats.roster.len(),
            "roster computed"
        );
    }

    Ok(())
}
