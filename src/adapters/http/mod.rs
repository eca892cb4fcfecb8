//! HTTP adapter: reqwest client against the course platform REST API.

pub mod client;

pub use client::RestCourseGateway;
