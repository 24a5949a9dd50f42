//! # Rabt Support
//!
//! Shared helpers for the rabt crates.
//!
//! This crate provides:
//! - Rendering of type names, dependency chains and dependency trees for
//!   error messages and diagnostics

pub mod rendering;
