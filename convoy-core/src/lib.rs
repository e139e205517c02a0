//! Convoy Core
//!
//! Core types and abstractions for the Convoy control plane.
//!
//! This crate contains:
//! - Domain types: Core business entities (Application, Deployment, etc.)
//! - DTOs: Data transfer objects for the control-plane API

pub mod domain;
pub mod dto;
