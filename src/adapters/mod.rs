//! Infrastructure adapters. Implement outbound ports.
//!
//! REST backend and in-memory mock. Map transport errors to GatewayError.

pub mod http;
pub mod mock;

pub use http::RestCourseGateway;
pub use mock::MockCourseGateway;
