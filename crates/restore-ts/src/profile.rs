//! Daily load profile matrix.

use restore_core::{RestoreError, RestoreResult, DAYS_PER_YEAR, HOURS_PER_DAY};
use tracing::warn;

/// Days × slots load matrix. Each value is a per-hour rate.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    days: Vec<Vec<f64>>,
    slot_hours: usize,
}

impl LoadProfile {
    /// Build from hourly day rows (24 values each).
    ///
    /// Missing values are back-filled from the next hour of the same day,
    /// falling back to the previous hour at the end of the day. Days with no
    /// value at all are dropped.
    pub fn from_days(rows: Vec<Vec<Option<f64>>>) -> RestoreResult<Self> {
        let mut days = Vec::with_capacity(rows.len());
        let mut dropped = 0;
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != HOURS_PER_DAY {
                return Err(RestoreError::Parse(format!(
                    "profile day {idx} has {} hours, expected {HOURS_PER_DAY}",
                    row.len()
                )));
            }
            match backfill(&row) {
                Some(filled) => days.push(filled),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped profile days without any value");
        }
        if days.is_empty() {
            return Err(RestoreError::Parse("load profile has no usable days".into()));
        }
        Ok(Self { days, slot_hours: 1 })
    }

    /// Build from a flat hourly series. Anything past 365 days (leap day,
    /// trailing rows) is ignored.
    pub fn from_hourly(values: &[Option<f64>]) -> RestoreResult<Self> {
        let needed = DAYS_PER_YEAR as usize * HOURS_PER_DAY;
        if values.len() < needed {
            return Err(RestoreError::Parse(format!(
                "hourly profile has {} values, expected at least {needed}",
                values.len()
            )));
        }
        let rows = values[..needed]
            .chunks(HOURS_PER_DAY)
            .map(|chunk| chunk.to_vec())
            .collect();
        Self::from_days(rows)
    }

    /// Average consecutive hours into slices of `hour_slice` hours.
    pub fn resample(&self, hour_slice: usize) -> RestoreResult<Self> {
        if hour_slice == 0 || HOURS_PER_DAY % hour_slice != 0 {
            return Err(RestoreError::invalid(
                "profile",
                "hour_slice",
                format!("{hour_slice} does not divide {HOURS_PER_DAY}"),
            ));
        }
        if self.slot_hours != 1 {
            return Err(RestoreError::Other("profile is already resampled".into()));
        }
        let days = self
            .days
            .iter()
            .map(|day| {
                day.chunks(hour_slice)
                    .map(|c| c.iter().sum::<f64>() / hour_slice as f64)
                    .collect()
            })
            .collect();
        Ok(Self { days, slot_hours: hour_slice })
    }

    pub fn days(&self) -> &[Vec<f64>] {
        &self.days
    }

    pub fn n_days(&self) -> usize {
        self.days.len()
    }

    /// Values per day.
    pub fn slots(&self) -> usize {
        self.days.first().map(Vec::len).unwrap_or(0)
    }

    pub fn slot_hours(&self) -> usize {
        self.slot_hours
    }

    /// Energy over all days in the profile.
    pub fn total(&self) -> f64 {
        let hl = self.slot_hours as f64;
        self.days.iter().flatten().map(|v| v * hl).sum()
    }

    /// Mean of each slot across all days, i.e. the average day.
    pub fn slot_means(&self) -> Vec<f64> {
        let n = self.days.len().max(1) as f64;
        let mut means = vec![0.0; self.slots()];
        for day in &self.days {
            for (mean, v) in means.iter_mut().zip(day) {
                *mean += v / n;
            }
        }
        means
    }
}

fn backfill(row: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut out: Vec<Option<f64>> = row.iter().map(|v| v.filter(|x| x.is_finite())).collect();
    let mut next = None;
    for v in out.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => *v = next,
        }
    }
    let mut prev = None;
    for v in out.iter_mut() {
        match v {
            Some(x) => prev = Some(*x),
            None => *v = prev,
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_day(value: f64) -> Vec<Option<f64>> {
        vec![Some(value); HOURS_PER_DAY]
    }

    #[test]
    fn test_backfill_within_day() {
        let mut row = flat_day(1.0);
        row[3] = None;
        row[4] = Some(5.0);
        row[23] = None;
        row[22] = Some(7.0);
        let profile = LoadProfile::from_days(vec![row]).unwrap();
        assert_eq!(profile.days()[0][3], 5.0);
        assert_eq!(profile.days()[0][23], 7.0);
    }

    #[test]
    fn test_empty_day_dropped() {
        let profile =
            LoadProfile::from_days(vec![flat_day(1.0), vec![None; HOURS_PER_DAY]]).unwrap();
        assert_eq!(profile.n_days(), 1);
        assert!(LoadProfile::from_days(vec![vec![None; HOURS_PER_DAY]]).is_err());
    }

    #[test]
    fn test_from_hourly_truncates_leap_day() {
        let values = vec![Some(2.0); 8784];
        let profile = LoadProfile::from_hourly(&values).unwrap();
        assert_eq!(profile.n_days(), 365);
        assert!((profile.total() - 2.0 * 8760.0).abs() < 1e-9);
        assert!(LoadProfile::from_hourly(&values[..100]).is_err());
    }

    #[test]
    fn test_resample_preserves_total() {
        let row: Vec<Option<f64>> = (0..24).map(|h| Some(h as f64)).collect();
        let profile = LoadProfile::from_days(vec![row]).unwrap();
        let sliced = profile.resample(6).unwrap();
        assert_eq!(sliced.slots(), 4);
        assert_eq!(sliced.days()[0][0], 2.5);
        assert!((sliced.total() - profile.total()).abs() < 1e-9);
        assert!(profile.resample(5).is_err());
    }

    #[test]
    fn test_slot_means_average_days() {
        let morning: Vec<Option<f64>> = (0..24).map(|h| Some(if h < 12 { 0.8 } else { 0.0 })).collect();
        let profile = LoadProfile::from_days(vec![morning, flat_day(0.2)]).unwrap();
        let means = profile.slot_means();
        assert_eq!(means.len(), 24);
        assert!((means[0] - 0.5).abs() < 1e-12);
        assert!((means[23] - 0.1).abs() < 1e-12);
    }
}
