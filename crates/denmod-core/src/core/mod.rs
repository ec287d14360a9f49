//! # Core Module
//!
//! This module provides the fundamental building blocks for iterative
//! density modification: the stateless data models shared by the whole
//! library and the pure numerical services the cycle engine invokes.
//!
//! ## Architecture
//!
//! - **Data models** ([`models`]) - reflection sets, Hendrickson-Lattman
//!   coefficients, phase estimates, map grids, solvent masks, unit-cell
//!   and symmetry mathematics
//! - **Solvent masking** ([`solvent`]) - the local-RMS map computation
//!   and the order-statistic solvent/protein classifier
//!
//! Everything here is a pure function of its inputs; all mutable run
//! state lives in the engine and workflow layers.

pub mod models;
pub mod solvent;
