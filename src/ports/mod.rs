//! Port traits. API boundaries for the hexagon.
//!
//! Outbound: called by application into infrastructure.

pub mod outbound;

pub use outbound::CourseGateway;
