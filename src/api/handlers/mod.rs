//! API handlers for the identity core.
//!
//! This module organizes the service's route handlers: auth flows under
//! `auth`, plus the health and banner endpoints.

pub mod auth;
pub mod health;
pub mod root;
