//! sempay - Seminar registration and payment reconciliation service
//!
//! This library provides the core functionality for the sempay registration
//! system: the registration record store, payment provider integration,
//! webhook/poll reconciliation, and transactional email notifications.

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod models;
pub mod payments;
pub mod reconcile;
