//! Model-wide settings.
//!
//! Stored as `model.toml` next to the parameter tables. Every field has a
//! default, so a partial file only needs the years and the country.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RestoreError, RestoreResult};
use crate::ids::Year;
use crate::time::{TimeIndex, HOURS_PER_DAY};

/// Time horizon, resolution and economics of one model run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Country code used to pick load profiles (e.g. `CH`).
    pub country: String,

    /// Calibration year; historical actuals are pinned here.
    pub first_year: Year,

    pub last_year: Year,

    /// Model every n-th year.
    pub year_step: u32,

    /// Number of representative days (k).
    pub representative_days: usize,

    /// Hours per time slice; must divide 24.
    pub hour_slice: usize,

    pub discount_rate: f64,

    pub clustering: ClusteringSettings,

    /// Root of the load-profile library.
    pub profiles_dir: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            country: "CH".to_string(),
            first_year: 2020,
            last_year: 2020,
            year_step: 1,
            representative_days: 1,
            hour_slice: 1,
            discount_rate: 0.0,
            clustering: ClusteringSettings::default(),
            profiles_dir: None,
        }
    }
}

/// Representative-day clustering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    /// RNG seed for k-means initialisation.
    pub seed: u64,

    pub max_iterations: usize,

    /// One historical profile year for every model year. `None` looks up
    /// each model year's own profile.
    pub historical_year: Option<Year>,

    /// Demand entity whose activity follows the clustered shapes.
    pub entity: String,

    /// Annual parameter holding that entity's demand totals.
    pub total_parameter: String,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            max_iterations: 300,
            historical_year: None,
            entity: "dem_elec".to_string(),
            total_parameter: "actual_demand".to_string(),
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> RestoreResult<()> {
        if self.last_year < self.first_year {
            return Err(RestoreError::invalid(
                "model",
                "last_year",
                format!("{} is before first_year {}", self.last_year, self.first_year),
            ));
        }
        if self.year_step == 0 {
            return Err(RestoreError::invalid("model", "year_step", "must be at least 1"));
        }
        if self.hour_slice == 0 || HOURS_PER_DAY % self.hour_slice != 0 {
            return Err(RestoreError::invalid(
                "model",
                "hour_slice",
                format!("{} does not divide {}", self.hour_slice, HOURS_PER_DAY),
            ));
        }
        if self.representative_days == 0 {
            return Err(RestoreError::invalid("model", "representative_days", "must be at least 1"));
        }
        if !(self.discount_rate.is_finite() && self.discount_rate >= 0.0) {
            return Err(RestoreError::invalid(
                "model",
                "discount_rate",
                format!("{} must be a non-negative number", self.discount_rate),
            ));
        }
        if self.clustering.max_iterations == 0 {
            return Err(RestoreError::invalid("model", "clustering.max_iterations", "must be at least 1"));
        }
        Ok(())
    }

    /// Time index with equal day weights.
    pub fn time_index(&self) -> RestoreResult<TimeIndex> {
        self.validate()?;
        TimeIndex::with_step(
            self.first_year,
            self.last_year,
            self.year_step,
            self.representative_days,
            self.hour_slice,
        )?
        .with_discount_rate(self.discount_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let settings = ModelSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.clustering.historical_year, None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: ModelSettings = toml::from_str(
            r#"
            country = "DE"
            first_year = 2015
            last_year = 2030
            representative_days = 4
            hour_slice = 3

            [clustering]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(settings.country, "DE");
        assert_eq!(settings.year_step, 1);
        assert_eq!(settings.clustering.seed, 7);
        assert_eq!(settings.clustering.max_iterations, 300);
        assert_eq!(settings.clustering.entity, "dem_elec");

        let idx = settings.time_index().unwrap();
        assert_eq!(idx.years().len(), 16);
        assert_eq!(idx.hours().len(), 8);
    }

    #[test]
    fn test_invalid_settings() {
        let bad_slice = ModelSettings { hour_slice: 7, ..Default::default() };
        assert!(bad_slice.validate().is_err());

        let bad_years = ModelSettings { first_year: 2030, last_year: 2020, ..Default::default() };
        assert!(bad_years.time_index().is_err());

        let bad_rate = ModelSettings { discount_rate: -0.02, ..Default::default() };
        assert!(matches!(
            bad_rate.validate(),
            Err(RestoreError::InvalidConfiguration { .. })
        ));
    }
}
