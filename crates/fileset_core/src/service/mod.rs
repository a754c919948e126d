//! Core use-case services.
//!
//! # Responsibility
//! - Resolve workflow authorization for edit-class operations.
//! - Orchestrate repository calls into mutation use-cases.
//! - Keep calling layers decoupled from storage details.

pub mod error;
pub mod file_set_actor;
pub mod file_set_service;
pub mod workflow_auth;
