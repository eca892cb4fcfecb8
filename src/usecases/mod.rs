//! Application use cases. Orchestrate domain logic via ports.

pub mod course_view;
pub mod enrollment_table;
pub mod review_board;
pub mod statistics;

pub use course_view::{CourseManagementView, CourseViewService, SourceErrors};
pub use enrollment_table::{
    project, EnrollmentRow, PageResult, SortDirection, SortKey, TableState, DEFAULT_PAGE_SIZE,
};
pub use review_board::ReviewBoard;
pub use statistics::{CourseStats, InstructorStatistics, StatsService};
