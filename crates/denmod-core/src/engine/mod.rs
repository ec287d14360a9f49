//! # Engine Module
//!
//! This module implements the stateful machinery of the iterative
//! density-modification run: everything the cycle loop needs between the
//! pure data models below it and the workflow entry point above it.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - strongly-typed run parameters with
//!   builder construction and one-time validation
//! - **Collaborator seams** ([`collaborators`]) - trait interfaces for the
//!   external numeric kernels (FFT transform, phase-probability
//!   integration, sigma-A estimation, anisotropic relative scaling)
//! - **Grid operators** ([`modification`]) - density truncation, solvent
//!   flipping/flattening, and solvent level adjustment
//! - **Phase recombination** ([`phases`]) - HL evidence increments, map
//!   coefficient assembly, and R-factor diagnostics
//! - **Scheduling** ([`schedule`]) - the averaging-radius schedule
//! - **Diagnostics** ([`statistics`], [`timing`], [`progress`]) - the
//!   append-only per-cycle statistics table, per-invocation timing
//!   accumulators, and cycle-boundary progress events
//! - **State & errors** ([`state`], [`error`]) - carried cycle state and
//!   the engine error taxonomy

pub mod collaborators;
pub mod config;
pub mod error;
pub mod modification;
pub mod phases;
pub mod progress;
pub mod schedule;
pub mod state;
pub mod statistics;
pub mod timing;
