//! Core domain types
//!
//! This module contains the core domain structures used across Convoy services.
//! These types are shared between the orchestrator (which persists and deploys
//! them) and the client (which renders them).

pub mod application;
pub mod command;
pub mod deployment;
pub mod instance;
pub mod progress;
