//! Sorted, paginated projection of the enrolled-students table.
//!
//! Pure functions over the merged enrollment + progress data. Multi-key
//! sort with type-aware comparison, stable tie-break on input order, and
//! clamped pagination with a 1-based display range.

use crate::domain::{Enrollment, ProgressRecord};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Page size used by the management view.
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Email,
    CreatedAt,
    Progress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort/pagination state for the table. Toggling the active key flips the
/// direction; choosing a new key resets direction to ascending and the page
/// to 1. An explicit design rule, not incidental.
#[derive(Debug, Clone)]
pub struct TableState {
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub page: usize,
    last_len: Option<usize>,
}

impl Default for TableState {
    /// Initial view: newest enrollments first.
    fn default() -> Self {
        Self {
            sort_key: SortKey::CreatedAt,
            direction: SortDirection::Desc,
            page: 1,
            last_len: None,
        }
    }
}

impl TableState {
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.sort_key = key;
            self.direction = SortDirection::Asc;
        }
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Record the current row count; the page resets to 1 whenever the
    /// underlying row set shrinks (e.g. after an unenroll).
    pub fn note_row_count(&mut self, len: usize) {
        if self.last_len.is_some_and(|prev| len < prev) {
            self.page = 1;
        }
        self.last_len = Some(len);
    }
}

/// One display row: the enrollment plus its resolved progress percentage
/// (`None` when no progress record exists; rendered as N/A upstream).
#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub enrollment: Enrollment,
    pub progress_pct: Option<f64>,
}

/// One page of the projected table, with the literal 1-based inclusive
/// range currently shown for display-layer consumption.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub rows: Vec<EnrollmentRow>,
    pub page: usize,
    pub total_pages: usize,
    pub from: usize,
    pub to: usize,
    pub total: usize,
}

/// Sort and paginate the enrollment set. The sort is stable: rows with equal
/// keys retain their relative input order regardless of direction. Out-of-
/// range pages clamp to `[1, total_pages]`.
pub fn project(
    enrollments: &[Enrollment],
    progress: &HashMap<i64, ProgressRecord>,
    state: &TableState,
    page_size: usize,
) -> PageResult {
    let mut rows: Vec<EnrollmentRow> = enrollments
        .iter()
        .map(|e| EnrollmentRow {
            progress_pct: progress.get(&e.id).map(|p| p.overall_progress),
            enrollment: e.clone(),
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = compare(a, b, state.sort_key);
        match state.direction {
            SortDirection::Asc => ord,
            // Equal stays Equal, so the stable sort keeps input order.
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total = rows.len();
    let total_pages = total.div_ceil(page_size.max(1));
    let page = state.page.clamp(1, total_pages.max(1));

    let start = (page - 1) * page_size;
    let rows: Vec<EnrollmentRow> = rows
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    let (from, to) = if total == 0 {
        (0, 0)
    } else {
        (start + 1, start + rows.len())
    };

    PageResult {
        rows,
        page,
        total_pages,
        from,
        to,
        total,
    }
}

fn compare(a: &EnrollmentRow, b: &EnrollmentRow, key: SortKey) -> Ordering {
    match key {
        // Case-sensitive lexicographic compare; name falls back to email,
        // then the empty string.
        SortKey::Name => display_name(a).cmp(display_name(b)),
        SortKey::Email => email(a).cmp(email(b)),
        SortKey::CreatedAt => a.enrollment.created_at.cmp(&b.enrollment.created_at),
        // Missing progress records count as 0.
        SortKey::Progress => a
            .progress_pct
            .unwrap_or(0.0)
            .total_cmp(&b.progress_pct.unwrap_or(0.0)),
    }
}

fn display_name(row: &EnrollmentRow) -> &str {
    row.enrollment
        .user
        .as_ref()
        .and_then(|u| u.name.as_deref().or(u.email.as_deref()))
        .unwrap_or("")
}

fn email(row: &EnrollmentRow) -> &str {
    row.enrollment
        .user
        .as_ref()
        .and_then(|u| u.email.as_deref())
        .unwrap_or("")
}
