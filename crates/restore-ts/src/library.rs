//! Load profile library and fallback chain
//!
//! ```text
//! {root}/
//! ├── elec_supply/
//! │   ├── CH_2015.csv        ← exact country + year
//! │   ├── CH_2019.csv
//! │   └── DE_2018.csv
//! ├── lf_vre/
//! │   └── conv_elec_pv.csv   ← hourly capacity factors of one entity
//! └── _common/
//!     └── GenericLoadProfile.csv   ← columns "*SensedHourly*"
//! ```
//!
//! Resolution for (country, year): the exact file, else the earliest file
//! of that country (by sorted name), else the generic profile.
//!
//! Country files have a day label in the first column followed by 24 hour
//! columns. A single value column with at least 8760 rows is read as a flat
//! hourly series instead.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use restore_core::{Year, HOURS_PER_DAY};
use tracing::{debug, warn};

use crate::profile::LoadProfile;

pub const SUPPLY_DIR: &str = "elec_supply";
pub const GENERIC_PROFILE: &str = "_common/GenericLoadProfile.csv";
pub const GENERIC_COLUMN_MARKER: &str = "SensedHourly";
pub const LOAD_FACTOR_DIR: &str = "lf_vre";

/// Which rung of the fallback chain supplied a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    Exact(PathBuf),
    Earliest(PathBuf),
    Generic(PathBuf),
}

impl ProfileSource {
    pub fn path(&self) -> &Path {
        match self {
            ProfileSource::Exact(p) | ProfileSource::Earliest(p) | ProfileSource::Generic(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProfileSource::Exact(_) => "exact",
            ProfileSource::Earliest(_) => "earliest",
            ProfileSource::Generic(_) => "generic",
        }
    }
}

/// Column selection when reading a profile CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileColumns<'a> {
    /// First column is a day label, the rest are values.
    AfterIndex,
    /// Only columns whose name contains the marker.
    Containing(&'a str),
}

/// A directory of load profiles.
#[derive(Debug, Clone)]
pub struct ProfileLibrary {
    root: PathBuf,
}

impl ProfileLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the fallback chain without reading any profile.
    pub fn resolve(&self, country: &str, year: Year) -> Result<ProfileSource> {
        let supply = self.root.join(SUPPLY_DIR);
        let exact = supply.join(format!("{country}_{year}.csv"));
        if exact.is_file() {
            return Ok(ProfileSource::Exact(exact));
        }

        let prefix = format!("{country}_");
        let mut candidates: Vec<PathBuf> = match std::fs::read_dir(&supply) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.is_file()
                        && path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.starts_with(&prefix) && n.ends_with(".csv"))
                            .unwrap_or(false)
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        candidates.sort();
        if let Some(earliest) = candidates.into_iter().next() {
            warn!(country, year, path = %earliest.display(), "no profile for year, using earliest");
            return Ok(ProfileSource::Earliest(earliest));
        }

        let generic = self.root.join(GENERIC_PROFILE);
        if generic.is_file() {
            warn!(country, year, "no profile for country, using generic profile");
            return Ok(ProfileSource::Generic(generic));
        }
        bail!(
            "no load profile for {country} {year} and no generic profile under '{}'",
            self.root.display()
        )
    }

    /// Average-day capacity factors of `entity`, one value per hour.
    /// `None` when the library has no file for it.
    pub fn load_factors(&self, entity: &str) -> Result<Option<Vec<f64>>> {
        let path = self.root.join(LOAD_FACTOR_DIR).join(format!("{entity}.csv"));
        if !path.is_file() {
            return Ok(None);
        }
        let profile = read_profile_csv(&path, ProfileColumns::AfterIndex)?;
        debug!(entity, days = profile.n_days(), "loaded load factor profile");
        Ok(Some(profile.slot_means()))
    }

    /// Resolve and read the profile for (country, year).
    pub fn load(&self, country: &str, year: Year) -> Result<(LoadProfile, ProfileSource)> {
        let source = self.resolve(country, year)?;
        let columns = match source {
            ProfileSource::Generic(_) => ProfileColumns::Containing(GENERIC_COLUMN_MARKER),
            _ => ProfileColumns::AfterIndex,
        };
        let profile = read_profile_csv(source.path(), columns)?;
        debug!(source = source.kind(), days = profile.n_days(), "loaded load profile");
        Ok((profile, source))
    }
}

/// Read a profile CSV into a [`LoadProfile`].
pub fn read_profile_csv(path: &Path, columns: ProfileColumns<'_>) -> Result<LoadProfile> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let df = CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .with_context(|| format!("reading profile CSV {}", path.display()))?;

    let selected: Vec<&Series> = match columns {
        ProfileColumns::AfterIndex => df.get_columns().iter().skip(1).collect(),
        ProfileColumns::Containing(marker) => df
            .get_columns()
            .iter()
            .filter(|s| s.name().contains(marker))
            .collect(),
    };
    if selected.is_empty() {
        bail!("profile '{}' has no value columns", path.display());
    }

    let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(selected.len());
    for series in selected {
        let cast = series
            .cast(&DataType::Float64)
            .with_context(|| format!("casting column '{}' to Float64", series.name()))?;
        values.push(cast.f64()?.into_iter().collect());
    }

    let profile = match values.len() {
        1 => LoadProfile::from_hourly(&values[0])?,
        HOURS_PER_DAY => {
            let rows = (0..df.height())
                .map(|r| values.iter().map(|col| col[r]).collect())
                .collect();
            LoadProfile::from_days(rows)?
        }
        n => bail!(
            "profile '{}' has {n} value columns, expected 1 or {HOURS_PER_DAY}",
            path.display()
        ),
    };
    Ok(profile)
}
