//! Application configuration. Backend URL, credential, identity.

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Base URL of the course platform API. Read from COURSEBOARD_API_URL.
    pub api_url: Option<String>,
    /// Bearer token for the backend. Read from COURSEBOARD_API_TOKEN.
    pub api_token: Option<String>,
    /// Course id for the management-view pass. Read from COURSEBOARD_COURSE_ID.
    #[serde(default)]
    pub course_id: Option<i64>,
    /// Current user id (for review-board preconditions). Read from COURSEBOARD_USER_ID.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Whether the current user is an instructor. Read from COURSEBOARD_IS_INSTRUCTOR.
    #[serde(default)]
    pub is_instructor: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("COURSEBOARD").try_parsing(true));
        if let Ok(path) = std::env::var("COURSEBOARD_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns true when both API URL and token are present; otherwise the
    /// wiring falls back to the mock gateway.
    pub fn is_backend_configured(&self) -> bool {
        self.api_url.is_some() && self.api_token.is_some()
    }

    pub fn course_id_or_default(&self) -> i64 {
        self.course_id.unwrap_or(1)
    }

    pub fn user_id_or_default(&self) -> i64 {
        self.user_id.unwrap_or(0)
    }

    pub fn is_instructor_or_default(&self) -> bool {
        self.is_instructor.unwrap_or(true)
    }
}
