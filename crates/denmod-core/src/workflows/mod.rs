//! # Workflows Module
//!
//! This module provides the top-level entry points of the library: each
//! workflow wires validated configuration, input data, and the external
//! numeric collaborators into one complete run and returns its products
//! together with per-cycle diagnostics.
//!
//! Workflows own the orchestration order; all numerics live in the core
//! and engine layers below.

pub mod density_modification;
