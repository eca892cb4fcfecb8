//! Review/comment subgraph for one course.
//!
//! Enforces the one-review-per-user invariant client-side against the
//! freshly fetched review set (never a cached flag alone, to tolerate a
//! concurrent submission from another session), validates submissions, and
//! keeps the per-review comment-box state local to the view.

use crate::domain::{Credential, DomainError, Review, SourceKind, UserIdentity};
use crate::ports::CourseGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Review board for one (course, current user) pair.
pub struct ReviewBoard {
    gateway: Arc<dyn CourseGateway>,
    course_id: i64,
    current_user: UserIdentity,
    reviews: Vec<Review>,
    /// Per-review comment-box visibility; view-local, never persisted.
    comment_open: HashMap<i64, bool>,
    drafts: HashMap<i64, String>,
}

impl ReviewBoard {
    pub fn new(
        gateway: Arc<dyn CourseGateway>,
        course_id: i64,
        current_user: UserIdentity,
    ) -> Self {
        Self {
            gateway,
            course_id,
            current_user,
            reviews: Vec::new(),
            comment_open: HashMap::new(),
            drafts: HashMap::new(),
        }
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Fetch (or refetch) the review list for the course.
    pub async fn load(&mut self, cred: &Credential) -> Result<(), DomainError> {
        self.reviews = self
            .gateway
            .get_reviews(self.course_id, cred)
            .await
            .map_err(|e| DomainError::Fetch {
                source: SourceKind::Reviews,
                cause: e.message,
            })?;
        Ok(())
    }

    /// Whether the current user already has a review here. Consults the
    /// fetched set, not a flag.
    pub fn has_reviewed(&self) -> bool {
        self.reviews
            .iter()
            .any(|r| r.user_id == self.current_user.id)
    }

    /// Submit a review. Instructors cannot review their own course; the
    /// rating must be in 1..=5; a second review for the same (course, user)
    /// pair is rejected against the fetched set. On success the list is
    /// refetched so the new review (and the Reviewed state) is visible.
    pub async fn submit_review(
        &mut self,
        rating: u8,
        text: &str,
        cred: &Credential,
    ) -> Result<(), DomainError> {
        if self.current_user.is_instructor {
            return Err(DomainError::Validation(
                "instructors cannot review their own course".to_string(),
            ));
        }
        if !(1..=5).contains(&rating) {
            return Err(DomainError::Validation(
                "rating must be between 1 and 5 stars".to_string(),
            ));
        }
        if self.has_reviewed() {
            return Err(DomainError::AlreadyReviewed);
        }

        self.gateway
            .post_review(self.course_id, rating, text, cred)
            .await
            .map_err(|e| DomainError::Mutation(e.message))?;

        info!(course_id = self.course_id, rating, "review submitted");
        self.load(cred).await
    }

    /// Submit a comment on a review. Any authenticated user may comment,
    /// the course's own instructor included. Empty (after trim) text is
    /// rejected. On success the draft is cleared, the comment box closed,
    /// and the list refetched.
    pub async fn submit_comment(
        &mut self,
        review_id: i64,
        text: &str,
        cred: &Credential,
    ) -> Result<(), DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::Validation(
                "comment cannot be empty".to_string(),
            ));
        }

        self.gateway
            .post_comment(review_id, text, cred)
            .await
            .map_err(|e| DomainError::Mutation(e.message))?;

        self.drafts.remove(&review_id);
        self.comment_open.insert(review_id, false);
        info!(course_id = self.course_id, review_id, "comment submitted");
        self.load(cred).await
    }

    /// Toggle the comment box for one review. Opening clears any stale
    /// draft for that id.
    pub fn toggle_comment_input(&mut self, review_id: i64) {
        let open = self.comment_open.entry(review_id).or_insert(false);
        *open = !*open;
        if *open {
            self.drafts.remove(&review_id);
        }
    }

    pub fn is_commenting(&self, review_id: i64) -> bool {
        self.comment_open.get(&review_id).copied().unwrap_or(false)
    }

    pub fn set_draft(&mut self, review_id: i64, text: impl Into<String>) {
        self.drafts.insert(review_id, text.into());
    }

    pub fn draft(&self, review_id: i64) -> &str {
        self.drafts.get(&review_id).map(String::as_str).unwrap_or("")
    }
}
