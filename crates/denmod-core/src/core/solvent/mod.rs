//! Solvent-mask computation: local-RMS density maps and the
//! order-statistic solvent/protein classifier.

pub mod local_rms;
pub mod mask;

pub use local_rms::local_rms_map;
pub use mask::{MaskComputation, SolventMaskCalculator};
