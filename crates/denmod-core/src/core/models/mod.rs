//! Stateless data models for the density-modification engine.
//!
//! The module provides the reflection-space and real-space containers
//! that every other layer builds on:
//!
//! - **Reflection data** ([`miller`]) - Miller indices, completed
//!   reflection sets, and aligned amplitude arrays
//! - **Crystal geometry** ([`cell`], [`symmetry`]) - unit-cell metrics,
//!   Niggli reduction, and centricity
//! - **Phase evidence** ([`hl`], [`phase`]) - Hendrickson-Lattman
//!   coefficients and derived centroid phase estimates
//! - **Real space** ([`grid`], [`mask`]) - periodic map grids and
//!   solvent masks with per-class statistics

pub mod cell;
pub mod grid;
pub mod hl;
pub mod mask;
pub mod miller;
pub mod phase;
pub mod symmetry;
