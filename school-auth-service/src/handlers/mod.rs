//! HTTP handlers for school-auth-service.

pub mod auth;
pub mod dashboard;
pub mod metrics;
pub mod user;
