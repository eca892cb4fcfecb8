//! REST adapter for the course backend.
//!
//! Every response is a JSON envelope: `{data: <payload>}` on success,
//! `{error: <message>}` on failure. The only HTTP status with semantic
//! weight here is 403, which maps to `StatusHint::Forbidden`; everything
//! else is a generic gateway failure.

use crate::domain::{
    Course, Credential, Enrollment, GatewayError, ProgressPayload, Review, Session,
};
use crate::ports::CourseGateway;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Gateway talking to the course platform's REST API.
pub struct RestCourseGateway {
    client: reqwest::Client,
    base_url: String,
}

impl RestCourseGateway {
    /// Create a gateway for the given API base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a GET and unwrap the `{data}` envelope.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cred: &Credential,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(cred.token())
            .send()
            .await
            .map_err(|e| GatewayError::other(format!("request failed: {}", e)))?;

        Self::unwrap_envelope(path, response).await
    }

    /// Issue a request with no payload of interest (DELETE / POST) and
    /// surface only the envelope error, if any.
    async fn send_expect_ok(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<(), GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::other(format!("request failed: {}", e)))?;

        Self::unwrap_envelope::<serde_json::Value>(path, response)
            .await
            .map(|_| ())
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::other(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.error)
                .unwrap_or_else(|| format!("API error {}", status));
            warn!(path, status = %status, message, "backend returned error");
            if status == StatusCode::FORBIDDEN {
                return Err(GatewayError::forbidden(message));
            }
            return Err(GatewayError::other(message));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            warn!(path, error = %e, "failed to decode response envelope");
            GatewayError::other(format!("invalid response payload: {}", e))
        })?;

        if let Some(message) = envelope.error {
            return Err(GatewayError::other(message));
        }

        debug!(path, "fetch ok");
        envelope
            .data
            .ok_or_else(|| GatewayError::other("response envelope missing data".to_string()))
    }
}

/// The backend's `{data, error}` JSON envelope.
#[derive(Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait::async_trait]
impl CourseGateway for RestCourseGateway {
    async fn get_course(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Course, GatewayError> {
        self.get_json(&format!("/courses/{}", course_id), cred).await
    }

    async fn get_sessions(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Session>, GatewayError> {
        self.get_json(&format!("/courses/{}/sessions", course_id), cred)
            .await
    }

    async fn get_enrollments(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Enrollment>, GatewayError> {
        self.get_json(&format!("/enrollments?courseId={}", course_id), cred)
            .await
    }

    async fn get_progress(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<ProgressPayload, GatewayError> {
        self.get_json(&format!("/progress/course/{}/progress", course_id), cred)
            .await
    }

    async fn get_reviews(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<Vec<Review>, GatewayError> {
        self.get_json(&format!("/reviews/course/{}", course_id), cred)
            .await
    }

    async fn post_review(
        &self,
        course_id: i64,
        rating: u8,
        text: &str,
        cred: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/reviews/{}", course_id);
        let request = self
            .client
            .post(self.url(&path))
            .bearer_auth(cred.token())
            .json(&json!({ "rating": rating, "text": text }));
        self.send_expect_ok(request, &path).await
    }

    async fn post_comment(
        &self,
        review_id: i64,
        text: &str,
        cred: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/reviews/comment/{}", review_id);
        let request = self
            .client
            .post(self.url(&path))
            .bearer_auth(cred.token())
            .json(&json!({ "text": text }));
        self.send_expect_ok(request, &path).await
    }

    async fn delete_session(
        &self,
        course_id: i64,
        session_id: i64,
        cred: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/courses/{}/sessions/{}", course_id, session_id);
        let request = self.client.delete(self.url(&path)).bearer_auth(cred.token());
        self.send_expect_ok(request, &path).await
    }

    async fn delete_course(
        &self,
        course_id: i64,
        cred: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/courses/{}", course_id);
        let request = self.client.delete(self.url(&path)).bearer_auth(cred.token());
        self.send_expect_ok(request, &path).await
    }

    async fn delete_enrollment(
        &self,
        enrollment_id: i64,
        cred: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/enrollments/{}", enrollment_id);
        let request = self.client.delete(self.url(&path)).bearer_auth(cred.token());
        self.send_expect_ok(request, &path).await
    }
}
