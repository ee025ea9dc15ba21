//! Shared building blocks for the database chat service.
//!
//! Contains the error type, configuration loading, API response envelope,
//! request models and the request-id middleware used by the service binary.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
