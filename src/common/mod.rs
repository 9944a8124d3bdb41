//! Common utilities and types shared across the application.

pub mod error;
pub mod titles;
pub mod types;
