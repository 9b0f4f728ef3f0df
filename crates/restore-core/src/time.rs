//! Year × representative-day × hour index and annualization weights
//!
//! ```text
//! years:  2020 ─ 2021 ─ 2022 ─ …            (ordered, first = calibration)
//! days:   { 0, 1, …, k-1 }                  (each weighted per year)
//! hours:  0, HL, 2·HL, …, 24-HL             (slice start hours)
//! ```
//!
//! Every hourly quantity is a per-hour rate. Its annual total is
//!
//! ```text
//! total(y) = Σ_d weight[y,d] · Σ_h HL · q[y,d,h]
//! ```
//!
//! with `Σ_d weight[y,d] = 365` for every year.

use std::collections::BTreeMap;

use crate::error::{RestoreError, RestoreResult};
use crate::ids::{Day, Hour, Slice, Year};

pub const HOURS_PER_DAY: usize = 24;
pub const DAYS_PER_YEAR: f64 = 365.0;
pub const HOURS_PER_YEAR: f64 = 8760.0;

const RATIO_TOLERANCE: f64 = 1e-6;

/// The model's time sets and per-(year, day) occurrence weights.
#[derive(Debug, Clone)]
pub struct TimeIndex {
    years: Vec<Year>,
    year_step: u32,
    days: Vec<Day>,
    hours: Vec<Hour>,
    hour_slice: usize,
    day_weights: BTreeMap<(Year, Day), f64>,
    discount_rate: f64,
}

impl TimeIndex {
    /// Build an index with equal day weights (`365 / n_days`).
    pub fn new(first_year: Year, last_year: Year, n_days: usize, hour_slice: usize) -> RestoreResult<Self> {
        Self::with_step(first_year, last_year, 1, n_days, hour_slice)
    }

    /// Like [`new`](Self::new) but modelling every `year_step`-th year.
    pub fn with_step(
        first_year: Year,
        last_year: Year,
        year_step: u32,
        n_days: usize,
        hour_slice: usize,
    ) -> RestoreResult<Self> {
        if last_year < first_year {
            return Err(RestoreError::invalid(
                "model",
                "last_year",
                format!("{last_year} is before first year {first_year}"),
            ));
        }
        if year_step == 0 {
            return Err(RestoreError::invalid("model", "year_step", "must be at least 1"));
        }
        if n_days == 0 {
            return Err(RestoreError::invalid(
                "model",
                "representative_days",
                "must be at least 1",
            ));
        }
        if hour_slice == 0 || HOURS_PER_DAY % hour_slice != 0 {
            return Err(RestoreError::invalid(
                "model",
                "hour_slice",
                format!("{hour_slice} does not divide {HOURS_PER_DAY}"),
            ));
        }

        let years: Vec<Year> = (first_year..=last_year).step_by(year_step as usize).collect();
        let days: Vec<Day> = (0..n_days).collect();
        let hours: Vec<Hour> = (0..HOURS_PER_DAY).step_by(hour_slice).collect();
        let equal = DAYS_PER_YEAR / n_days as f64;
        let day_weights = years
            .iter()
            .flat_map(|&y| days.iter().map(move |&d| ((y, d), equal)))
            .collect();

        Ok(Self {
            years,
            year_step,
            days,
            hours,
            hour_slice,
            day_weights,
            discount_rate: 0.0,
        })
    }

    pub fn with_discount_rate(mut self, rate: f64) -> RestoreResult<Self> {
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(RestoreError::invalid(
                "model",
                "discount_rate",
                format!("{rate} must be a non-negative number"),
            ));
        }
        self.discount_rate = rate;
        Ok(self)
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn first_year(&self) -> Year {
        self.years[0]
    }

    pub fn last_year(&self) -> Year {
        self.years[self.years.len() - 1]
    }

    /// Every year after the calibration year.
    pub fn optimised_years(&self) -> &[Year] {
        &self.years[1..]
    }

    pub fn contains_year(&self, year: Year) -> bool {
        self.years.binary_search(&year).is_ok()
    }

    /// Modelled year preceding `year`, if any.
    pub fn previous_year(&self, year: Year) -> Option<Year> {
        let idx = self.years.binary_search(&year).ok()?;
        idx.checked_sub(1).map(|i| self.years[i])
    }

    /// Position of `year` in [`years`](Self::years).
    pub fn year_position(&self, year: Year) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }

    /// Dense position of a slice in (year, day, hour) order.
    pub fn slice_position(&self, slice: &Slice) -> Option<usize> {
        let y = self.year_position(slice.year)?;
        if slice.day >= self.days.len() || slice.hour % self.hour_slice != 0 {
            return None;
        }
        let h = slice.hour / self.hour_slice;
        if h >= self.hours.len() {
            return None;
        }
        Some((y * self.days.len() + slice.day) * self.hours.len() + h)
    }

    pub fn year_step(&self) -> u32 {
        self.year_step
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn hours(&self) -> &[Hour] {
        &self.hours
    }

    pub fn first_hour(&self) -> Hour {
        self.hours[0]
    }

    /// Slice preceding `hour` within the same day; `None` at the first hour.
    pub fn previous_hour(&self, hour: Hour) -> Option<Hour> {
        if hour == self.first_hour() || hour % self.hour_slice != 0 {
            return None;
        }
        Some(hour - self.hour_slice)
    }

    /// Slice length HL in hours.
    pub fn hour_slice(&self) -> usize {
        self.hour_slice
    }

    pub fn day_weight(&self, year: Year, day: Day) -> f64 {
        self.day_weights.get(&(year, day)).copied().unwrap_or(0.0)
    }

    /// Total weight of a year; 365 for a well-formed index.
    pub fn weight_sum(&self, year: Year) -> f64 {
        self.days.iter().map(|&d| self.day_weight(year, d)).sum()
    }

    /// Replace a year's equal split with fitted occurrence ratios.
    pub fn set_day_weights_from_ratios(&mut self, year: Year, ratios: &[f64]) -> RestoreResult<()> {
        if !self.contains_year(year) {
            return Err(RestoreError::invalid(
                "model",
                "day_weights",
                format!("year {year} is not modelled"),
            ));
        }
        if ratios.len() != self.days.len() {
            return Err(RestoreError::invalid(
                "model",
                "day_weights",
                format!("{} ratios for {} representative days", ratios.len(), self.days.len()),
            ));
        }
        if ratios.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(RestoreError::invalid("model", "day_weights", "ratios must be non-negative"));
        }
        let sum: f64 = ratios.iter().sum();
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(RestoreError::invalid(
                "model",
                "day_weights",
                format!("ratios sum to {sum}, expected 1"),
            ));
        }
        for (&day, ratio) in self.days.iter().zip(ratios) {
            self.day_weights.insert((year, day), ratio * DAYS_PER_YEAR);
        }
        Ok(())
    }

    /// Apply the same ratios to every modelled year.
    pub fn set_all_day_weights_from_ratios(&mut self, ratios: &[f64]) -> RestoreResult<()> {
        let years = self.years.clone();
        for year in years {
            self.set_day_weights_from_ratios(year, ratios)?;
        }
        Ok(())
    }

    /// `Σ_d weight[y,d] · Σ_h HL · f(d, h)`.
    pub fn annual_total<F>(&self, year: Year, mut f: F) -> f64
    where
        F: FnMut(Day, Hour) -> f64,
    {
        let hl = self.hour_slice as f64;
        self.days
            .iter()
            .map(|&d| {
                let daily: f64 = self.hours.iter().map(|&h| hl * f(d, h)).sum();
                self.day_weight(year, d) * daily
            })
            .sum()
    }

    /// `1 / (1 + r)^(y - y0)`.
    pub fn discount_factor(&self, year: Year) -> f64 {
        let elapsed = year - self.first_year();
        (1.0 + self.discount_rate).powi(-elapsed)
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// All slices of one year, in (day, hour) order.
    pub fn slices_in(&self, year: Year) -> impl Iterator<Item = Slice> + '_ {
        self.days
            .iter()
            .flat_map(move |&d| self.hours.iter().map(move |&h| Slice::new(year, d, h)))
    }

    /// All slices, in (year, day, hour) order.
    pub fn slices(&self) -> impl Iterator<Item = Slice> + '_ {
        self.years.iter().flat_map(move |&y| self.slices_in(y))
    }

    pub fn slice_count(&self) -> usize {
        self.years.len() * self.days.len() * self.hours.len()
    }
}
