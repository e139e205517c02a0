//! Data Transfer Objects for the control-plane API
//!
//! Request bodies accepted by the orchestrator. They are decoded once at the
//! HTTP boundary and validated by the service layer before any remote call.

pub mod application;
