//! # Denmod Core Library
//!
//! An iterative density-modification engine for macromolecular X-ray
//! crystallography: solvent flattening/flipping with adaptive masking and
//! phase-probability recombination, used to improve experimentally-derived
//! electron-density maps prior to model building.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`ReflectionSet`, `HlCoefficients`, `MapGrid`), pure crystallographic
//!   mathematics (unit-cell metrics, Niggli reduction, centricity), and the
//!   solvent-mask calculator.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer holds the
//!   strongly-typed configuration, the collaborator seams for the external
//!   numeric kernels (FFT transform, phase-probability integration, sigma-A
//!   estimation, relative scaling), the density-modification grid operators,
//!   and the per-cycle statistics recorder.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level,
//!   user-facing layer. It ties the `engine` and `core` together to execute
//!   the complete density-modification run, owning the cycle loop from
//!   initialization through the final combined map coefficients.

pub mod core;
pub mod engine;
pub mod workflows;
