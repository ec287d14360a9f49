use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// How the solvent region of the map is modified each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolventModificationMethod {
    /// Invert solvent density about its mean (identity on the final cycle).
    Flipping,
    /// Set every solvent point to the mean solvent density.
    Flattening,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct DensityTruncationOptions {
    /// Fraction of the lowest protein-region density values clamped up.
    pub fraction_min: Option<f64>,
    /// Fraction of the highest protein-region density values clamped down.
    pub fraction_max: Option<f64>,
}

impl DensityTruncationOptions {
    pub fn is_enabled(&self) -> bool {
        self.fraction_min.is_some() || self.fraction_max.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolventModificationOptions {
    pub method: SolventModificationMethod,
    /// Rescale the flip factor by (rms_protein_new / rms_protein_old)^2.
    pub scale_flip: bool,
}

impl Default for SolventModificationOptions {
    fn default() -> Self {
        Self {
            method: SolventModificationMethod::Flipping,
            scale_flip: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct AveragingRadiusOptions {
    /// Starting averaging radius; defaults to the final radius + 1.
    pub initial: Option<f64>,
    /// Final averaging radius; defaults to d_min.
    #[serde(rename = "final")]
    pub final_radius: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct SolventMaskOptions {
    pub averaging_radius: AveragingRadiusOptions,
}

/// Validated parameters of one density-modification run.
///
/// Construction goes through [`DensityModificationConfigBuilder`] (or
/// [`DensityModificationConfig::from_toml_str`]); all validation happens
/// exactly once there, and a constructed config is immutable for the
/// lifetime of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityModificationConfig {
    pub solvent_fraction: f64,
    /// Resolution limit; defaults to the resolution of the input data.
    pub d_min: Option<f64>,
    pub initial_steps: usize,
    pub shrink_steps: usize,
    pub final_steps: usize,
    pub grid_resolution_factor: f64,
    pub density_truncation: DensityTruncationOptions,
    pub solvent_modification: SolventModificationOptions,
    pub solvent_adjust: bool,
    pub solvent_mask: SolventMaskOptions,
    pub protein_solvent_ratio: f64,
    pub change_basis_to_niggli_cell: bool,
    /// Accepted for interface compatibility; enabling it makes the run
    /// fail with a not-supported error when the step would execute.
    pub ncs_averaging: bool,
    pub verbose: bool,
}

impl DensityModificationConfig {
    pub fn builder() -> DensityModificationConfigBuilder {
        DensityModificationConfigBuilder::new()
    }

    /// Total number of modification cycles.
    pub fn max_iterations(&self) -> usize {
        self.initial_steps + self.shrink_steps + self.final_steps
    }

    /// Parses a declarative TOML configuration, running the same
    /// validation as the builder.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut builder = Self::builder()
            .initial_steps(raw.initial_steps)
            .shrink_steps(raw.shrink_steps)
            .final_steps(raw.final_steps)
            .grid_resolution_factor(raw.grid_resolution_factor)
            .density_truncation(raw.density_truncation)
            .solvent_modification(raw.solvent_modification)
            .solvent_adjust(raw.solvent_adjust)
            .solvent_mask(raw.solvent_mask)
            .protein_solvent_ratio(raw.protein_solvent_ratio)
            .change_basis_to_niggli_cell(raw.change_basis_to_niggli_cell)
            .ncs_averaging(raw.ncs_averaging)
            .verbose(raw.verbose);
        if let Some(sf) = raw.solvent_fraction {
            builder = builder.solvent_fraction(sf);
        }
        if let Some(d_min) = raw.d_min {
            builder = builder.d_min(d_min);
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    solvent_fraction: Option<f64>,
    d_min: Option<f64>,
    initial_steps: usize,
    shrink_steps: usize,
    final_steps: usize,
    grid_resolution_factor: f64,
    density_truncation: DensityTruncationOptions,
    solvent_modification: SolventModificationOptions,
    solvent_adjust: bool,
    solvent_mask: SolventMaskOptions,
    protein_solvent_ratio: f64,
    change_basis_to_niggli_cell: bool,
    ncs_averaging: bool,
    verbose: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            solvent_fraction: None,
            d_min: None,
            initial_steps: 10,
            shrink_steps: 20,
            final_steps: 10,
            grid_resolution_factor: 0.25,
            density_truncation: DensityTruncationOptions::default(),
            solvent_modification: SolventModificationOptions::default(),
            solvent_adjust: true,
            solvent_mask: SolventMaskOptions::default(),
            protein_solvent_ratio: 1.31,
            change_basis_to_niggli_cell: false,
            ncs_averaging: false,
            verbose: false,
        }
    }
}

#[derive(Debug)]
pub struct DensityModificationConfigBuilder {
    raw: RawConfig,
}

impl Default for DensityModificationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityModificationConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfig::default(),
        }
    }

    pub fn solvent_fraction(mut self, fraction: f64) -> Self {
        self.raw.solvent_fraction = Some(fraction);
        self
    }
    pub fn d_min(mut self, d_min: f64) -> Self {
        self.raw.d_min = Some(d_min);
        self
    }
    pub fn initial_steps(mut self, steps: usize) -> Self {
        self.raw.initial_steps = steps;
        self
    }
    pub fn shrink_steps(mut self, steps: usize) -> Self {
        self.raw.shrink_steps = steps;
        self
    }
    pub fn final_steps(mut self, steps: usize) -> Self {
        self.raw.final_steps = steps;
        self
    }
    pub fn grid_resolution_factor(mut self, factor: f64) -> Self {
        self.raw.grid_resolution_factor = factor;
        self
    }
    pub fn density_truncation(mut self, options: DensityTruncationOptions) -> Self {
        self.raw.density_truncation = options;
        self
    }
    pub fn solvent_modification(mut self, options: SolventModificationOptions) -> Self {
        self.raw.solvent_modification = options;
        self
    }
    pub fn solvent_adjust(mut self, enabled: bool) -> Self {
        self.raw.solvent_adjust = enabled;
        self
    }
    pub fn solvent_mask(mut self, options: SolventMaskOptions) -> Self {
        self.raw.solvent_mask = options;
        self
    }
    pub fn protein_solvent_ratio(mut self, ratio: f64) -> Self {
        self.raw.protein_solvent_ratio = ratio;
        self
    }
    pub fn change_basis_to_niggli_cell(mut self, enabled: bool) -> Self {
        self.raw.change_basis_to_niggli_cell = enabled;
        self
    }
    pub fn ncs_averaging(mut self, enabled: bool) -> Self {
        self.raw.ncs_averaging = enabled;
        self
    }
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.raw.verbose = enabled;
        self
    }

    pub fn build(self) -> Result<DensityModificationConfig, ConfigError> {
        let raw = self.raw;
        let solvent_fraction = raw
            .solvent_fraction
            .ok_or(ConfigError::MissingParameter("solvent_fraction"))?;
        if !(solvent_fraction > 0.0 && solvent_fraction < 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "solvent_fraction",
                reason: format!("{solvent_fraction} is not in (0, 1)"),
            });
        }
        if let Some(d_min) = raw.d_min {
            if !(d_min > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    parameter: "d_min",
                    reason: format!("{d_min} is not positive"),
                });
            }
        }
        if !(raw.grid_resolution_factor > 0.0 && raw.grid_resolution_factor <= 0.5) {
            return Err(ConfigError::InvalidParameter {
                parameter: "grid_resolution_factor",
                reason: format!("{} is not in (0, 0.5]", raw.grid_resolution_factor),
            });
        }
        for (name, fraction) in [
            ("density_truncation.fraction_min", raw.density_truncation.fraction_min),
            ("density_truncation.fraction_max", raw.density_truncation.fraction_max),
        ] {
            if let Some(f) = fraction {
                if !(f >= 0.0 && f < 1.0) {
                    return Err(ConfigError::InvalidParameter {
                        parameter: name,
                        reason: format!("{f} is not in [0, 1)"),
                    });
                }
            }
        }
        if !(raw.protein_solvent_ratio > 1.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "protein_solvent_ratio",
                reason: format!("{} must be greater than 1", raw.protein_solvent_ratio),
            });
        }
        for (name, radius) in [
            (
                "solvent_mask.averaging_radius.initial",
                raw.solvent_mask.averaging_radius.initial,
            ),
            (
                "solvent_mask.averaging_radius.final",
                raw.solvent_mask.averaging_radius.final_radius,
            ),
        ] {
            if let Some(r) = radius {
                if !(r > 0.0) {
                    return Err(ConfigError::InvalidParameter {
                        parameter: name,
                        reason: format!("{r} is not positive"),
                    });
                }
            }
        }

        Ok(DensityModificationConfig {
            solvent_fraction,
            d_min: raw.d_min,
            initial_steps: raw.initial_steps,
            shrink_steps: raw.shrink_steps,
            final_steps: raw.final_steps,
            grid_resolution_factor: raw.grid_resolution_factor,
            density_truncation: raw.density_truncation,
            solvent_modification: raw.solvent_modification,
            solvent_adjust: raw.solvent_adjust,
            solvent_mask: raw.solvent_mask,
            protein_solvent_ratio: raw.protein_solvent_ratio,
            change_basis_to_niggli_cell: raw.change_basis_to_niggli_cell,
            ncs_averaging: raw.ncs_averaging,
            verbose: raw.verbose,
        })
    }
}
