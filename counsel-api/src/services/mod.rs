//! Business logic extracted from route handlers.

pub mod assignment;
