//! Streaming approximate-quantile histogram with a fixed bin budget.
//!
//! Every sample starts as a unit-weight bin; once the budget is exceeded the
//! two adjacent bins with the smallest value gap are merged into their
//! count-weighted mean. Memory stays O(max bins) and the approximation error
//! concentrates where samples cluster.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::extension::Extension;

pub const DEFAULT_MAX_BINS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub value: f64,
    pub count: f64,
}

/// Unlocked histogram state. Shared by [`Histogram`] and histogram products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    max_bins: usize,
    bins: Vec<Bin>,
    total: f64,
}

impl HistogramData {
    /// A `max_bins` of zero means [`DEFAULT_MAX_BINS`]; it is resolved on
    /// the first trim, not here.
    #[must_use]
    pub const fn new(max_bins: usize) -> Self {
        Self {
            max_bins,
            bins: Vec::new(),
            total: 0.0,
        }
    }

    #[must_use]
    pub const fn max_bins(&self) -> usize {
        self.max_bins
    }

    #[must_use]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    #[must_use]
    pub const fn total(&self) -> f64 {
        self.total
    }

    pub fn add(&mut self, value: f64) {
        self.total += 1.0;
        self.insert(Bin { value, count: 1.0 });
        self.trim();
    }

    /// Fold another histogram's bins into this one, then trim to budget.
    pub fn merge(&mut self, other: &HistogramData) {
        self.total += other.total;
        for bin in &other.bins {
            self.insert(*bin);
        }
        self.trim();
    }

    pub fn reset(&mut self) {
        self.bins.clear();
        self.total = 0.0;
    }

    fn insert(&mut self, bin: Bin) {
        match self
            .bins
            .iter()
            .position(|existing| existing.value > bin.value)
        {
            Some(idx) => self.bins.insert(idx, bin),
            None => self.bins.push(bin),
        }
    }

    fn trim(&mut self) {
        if self.max_bins == 0 {
            self.max_bins = DEFAULT_MAX_BINS;
        }
        while self.bins.len() > self.max_bins {
            let Some(idx) = self.closest_pair() else {
                break;
            };
            self.merge_pair(idx);
        }
    }

    // Left-biased: the first pair wins, later pairs only on a strictly
    // smaller gap.
    fn closest_pair(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, pair) in self.bins.windows(2).enumerate() {
            let [left, right] = pair else {
                continue;
            };
            let gap = right.value - left.value;
            match best {
                None => best = Some((idx, gap)),
                Some((_, min)) if gap < min => best = Some((idx, gap)),
                Some(_) => {}
            }
        }
        best.map(|(idx, _)| idx)
    }

    fn merge_pair(&mut self, idx: usize) {
        let next = idx.saturating_add(1);
        let (Some(left), Some(right)) = (self.bins.get(idx).copied(), self.bins.get(next).copied())
        else {
            return;
        };
        let count = right.count + left.count;
        let merged = Bin {
            value: (right.value * right.count + left.value * left.count) / count,
            count,
        };
        self.bins.remove(next);
        if let Some(slot) = self.bins.get_mut(idx) {
            *slot = merged;
        }
    }

    /// Estimated value at quantile `q`; 0.0 when nothing qualifies.
    #[must_use]
    pub fn quantile(&self, q: f64) -> f64 {
        let mut remaining = q * self.total;
        for bin in &self.bins {
            remaining -= bin.count;
            if remaining <= 0.0 {
                return bin.value;
            }
        }
        0.0
    }

    /// Several quantiles in one pass; results follow the order of `qs`.
    #[must_use]
    pub fn quantiles(&self, qs: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; qs.len()];
        let mut remaining: Vec<f64> = qs.iter().map(|q| q * self.total).collect();
        let mut found = 0usize;
        for bin in &self.bins {
            for (slot, value) in remaining.iter_mut().zip(values.iter_mut()) {
                if slot.is_nan() {
                    continue;
                }
                *slot -= bin.count;
                if *slot <= 0.0 {
                    *value = bin.value;
                    *slot = f64::NAN;
                    found = found.saturating_add(1);
                }
            }
            if found == qs.len() {
                break;
            }
        }
        values
    }
}

/// Thread-safe histogram, usable directly or as an [`Extension`] target.
#[derive(Debug, Default)]
pub struct Histogram {
    state: Mutex<HistogramData>,
}

impl Histogram {
    #[must_use]
    pub const fn new(max_bins: usize) -> Self {
        Self {
            state: Mutex::new(HistogramData::new(max_bins)),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut HistogramData) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn add(&self, value: f64) {
        self.with_state(|state| state.add(value));
    }

    #[must_use]
    pub fn quantile(&self, q: f64) -> f64 {
        self.with_state(|state| state.quantile(q))
    }

    #[must_use]
    pub fn quantiles(&self, qs: &[f64]) -> Vec<f64> {
        self.with_state(|state| state.quantiles(qs))
    }

    pub fn reset(&self) {
        self.with_state(HistogramData::reset);
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.with_state(|state| state.total())
    }

    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.with_state(|state| state.bins().len())
    }

    #[must_use]
    pub fn snapshot(&self) -> HistogramData {
        self.with_state(|state| state.clone())
    }

    /// Snapshot and optionally clear under a single lock.
    pub(crate) fn take(&self, reset: bool) -> HistogramData {
        self.with_state(|state| {
            let snapshot = state.clone();
            if reset {
                state.reset();
            }
            snapshot
        })
    }
}

impl Extension for Histogram {
    fn add(&self, value: f64) {
        Histogram::add(self, value);
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.quantiles(&[0.5, 0.9, 0.99]);
        let rendered = serde_json::json!({
            "p50": values.first().copied().unwrap_or_default(),
            "p90": values.get(1).copied().unwrap_or_default(),
            "p99": values.get(2).copied().unwrap_or_default(),
        });
        write!(f, "{}", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use rand::Rng;

    fn approx_eq(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    fn filled(max_bins: usize) -> Histogram {
        let histogram = Histogram::new(max_bins);
        for value in 1..=100 {
            histogram.add(f64::from(value));
        }
        histogram
    }

    fn check_quantile(histogram: &Histogram, q: f64, expected: f64) -> AppResult<()> {
        let actual = histogram.quantile(q);
        if !approx_eq(actual, expected) {
            return Err(AppError::validation(format!(
                "quantile({}) expected {}, got {}",
                q, expected, actual
            )));
        }
        Ok(())
    }

    #[test]
    fn exact_quantiles_without_merging() -> AppResult<()> {
        let histogram = filled(100);
        check_quantile(&histogram, 0.50, 50.0)?;
        check_quantile(&histogram, 0.75, 75.0)?;
        check_quantile(&histogram, 0.90, 90.0)?;
        check_quantile(&histogram, 0.99, 99.0)?;
        check_quantile(&histogram, 0.999, 100.0)?;
        Ok(())
    }

    #[test]
    fn quantiles_follow_argument_order() -> AppResult<()> {
        let histogram = filled(100);
        let values = histogram.quantiles(&[0.75, 0.50, 0.90]);
        let expected = [75.0, 50.0, 90.0];
        if values.len() != expected.len()
            || values
                .iter()
                .zip(expected.iter())
                .any(|(left, right)| !approx_eq(*left, *right))
        {
            return Err(AppError::validation(format!(
                "unexpected quantiles {:?}",
                values
            )));
        }
        Ok(())
    }

    #[test]
    fn merged_bins_use_weighted_means() -> AppResult<()> {
        let histogram = filled(50);
        if histogram.bin_count() != 50 {
            return Err(AppError::validation(format!(
                "expected 50 bins, got {}",
                histogram.bin_count()
            )));
        }
        check_quantile(&histogram, 0.50, 49.5)?;
        check_quantile(&histogram, 0.90, 89.5)?;
        check_quantile(&histogram, 0.999, 99.5)?;
        if !approx_eq(histogram.total(), 100.0) {
            return Err(AppError::validation("merging must preserve the total"));
        }
        Ok(())
    }

    #[test]
    fn equal_gaps_merge_leftmost_pair() -> AppResult<()> {
        let histogram = Histogram::new(3);
        for value in [0.0, 1.0, 2.0, 3.0] {
            histogram.add(value);
        }
        let snapshot = histogram.snapshot();
        let values: Vec<f64> = snapshot.bins().iter().map(|bin| bin.value).collect();
        if values.len() != 3
            || !values
                .iter()
                .zip([0.5, 2.0, 3.0].iter())
                .all(|(left, right)| approx_eq(*left, *right))
        {
            return Err(AppError::validation(format!(
                "expected leftmost merge, got {:?}",
                values
            )));
        }
        Ok(())
    }

    #[test]
    fn zero_budget_defaults_to_hundred_bins() -> AppResult<()> {
        let histogram = Histogram::new(0);
        for value in 0..150 {
            histogram.add(f64::from(value));
        }
        if histogram.bin_count() != DEFAULT_MAX_BINS {
            return Err(AppError::validation(format!(
                "expected {} bins, got {}",
                DEFAULT_MAX_BINS,
                histogram.bin_count()
            )));
        }
        if histogram.snapshot().max_bins() != DEFAULT_MAX_BINS {
            return Err(AppError::validation("max bins should resolve on first trim"));
        }
        Ok(())
    }

    #[test]
    fn empty_and_reset_histograms_return_zero() -> AppResult<()> {
        let histogram = Histogram::new(10);
        check_quantile(&histogram, 0.5, 0.0)?;
        for value in [3.0, 7.0, 11.0] {
            histogram.add(value);
        }
        histogram.reset();
        for q in [0.0, 0.5, 0.99, 1.0] {
            check_quantile(&histogram, q, 0.0)?;
        }
        if histogram.quantiles(&[0.5, 0.9]) != vec![0.0, 0.0] {
            return Err(AppError::validation("reset histogram must report zeros"));
        }
        Ok(())
    }

    #[test]
    fn random_streams_stay_within_budget_and_monotonic() -> AppResult<()> {
        let mut rng = rand::thread_rng();
        for max_bins in [1usize, 5, 17, 64] {
            let histogram = Histogram::new(max_bins);
            for _ in 0..500 {
                histogram.add(rng.gen_range(-1_000.0..1_000.0));
                if histogram.bin_count() > max_bins {
                    return Err(AppError::validation(format!(
                        "bin budget {} exceeded: {}",
                        max_bins,
                        histogram.bin_count()
                    )));
                }
            }
            let mut previous = f64::NEG_INFINITY;
            for step in 0..=100 {
                let q = f64::from(step) / 100.0;
                let value = histogram.quantile(q);
                if value < previous {
                    return Err(AppError::validation(format!(
                        "quantile({}) = {} decreased below {}",
                        q, value, previous
                    )));
                }
                previous = value;
            }
        }
        Ok(())
    }

    #[test]
    fn merge_combines_totals_and_trims() -> AppResult<()> {
        let mut left = HistogramData::new(4);
        let mut right = HistogramData::new(4);
        for value in [1.0, 2.0, 3.0] {
            left.add(value);
        }
        for value in [10.0, 20.0, 30.0] {
            right.add(value);
        }
        left.merge(&right);
        if left.bins().len() != 4 || !approx_eq(left.total(), 6.0) {
            return Err(AppError::validation(format!(
                "unexpected merge result {:?}",
                left
            )));
        }
        Ok(())
    }

    #[test]
    fn display_renders_percentiles() -> AppResult<()> {
        let histogram = filled(100);
        let rendered: serde_json::Value = serde_json::from_str(&histogram.to_string())
            .map_err(|err| AppError::validation(format!("invalid json: {}", err)))?;
        if rendered.get("p50").and_then(serde_json::Value::as_f64) != Some(50.0) {
            return Err(AppError::validation(format!("unexpected rendering {}", rendered)));
        }
        Ok(())
    }
}
