use std::collections::BTreeSet;

use crate::raster::buffer::{Channel, RgbaBuffer};

/// Number of depth buckets.
pub const BUCKETS: usize = 256;
/// Candidate layer count handed to [`valley_division`] by [`combined_divisions`].
pub const VALLEY_CANDIDATES: usize = 12;
/// Candidate layer count handed to [`percentile_division`] by [`combined_divisions`].
pub const PERCENTILE_CANDIDATES: usize = 5;
/// Minimum share of total pixel mass a band must hold for its upper cut to survive.
pub const MIN_BAND_MASS: f64 = 0.10;

const SMOOTHING_HALF_WINDOW: usize = 8;
const VALLEY_THRESHOLD: f64 = 1.0;
const TIE_BREAK: f64 = 1e-3;

/// 256-bucket histogram of a depth map's primary channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; BUCKETS],
}

impl Histogram {
    /// Count every pixel's [`Channel::R`] value.
    pub fn of(depth: &RgbaBuffer) -> Self {
        let mut counts = [0u64; BUCKETS];
        for v in depth.channel(Channel::R) {
            counts[usize::from(v)] += 1;
        }
        Self { counts }
    }

    /// Wrap precomputed bucket counts.
    pub fn from_counts(counts: [u64; BUCKETS]) -> Self {
        Self { counts }
    }

    /// Per-bucket pixel counts.
    pub fn counts(&self) -> &[u64; BUCKETS] {
        &self.counts
    }

    /// Total pixel count.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Pixel mass in buckets `start..end`.
    pub fn mass(&self, start: usize, end: usize) -> u64 {
        let end = end.min(BUCKETS);
        if start >= end {
            return 0;
        }
        self.counts[start..end].iter().sum()
    }
}

/// Result of [`combined_divisions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Divisions {
    /// Histogram the points were derived from.
    pub histogram: Histogram,
    /// Strictly increasing division points in `1..=254`.
    pub points: Vec<u8>,
}

/// Split cumulative pixel mass into `num_layers` equal-probability bands.
///
/// Walking buckets upward, a cut is emitted at the first bucket where the running mass reaches
/// `ceil(total / num_layers) * k`; at most one cut is emitted per bucket.
pub fn percentile_division(histogram: &Histogram, num_layers: usize) -> Vec<u8> {
    let total = histogram.total();
    if num_layers < 2 || total == 0 {
        return Vec::new();
    }

    let per_layer = total.div_ceil(num_layers as u64);
    let wanted = num_layers - 1;
    let mut points = Vec::with_capacity(wanted);
    let mut cumulative = 0u64;
    for (i, &count) in histogram.counts().iter().enumerate() {
        cumulative += count;
        if points.len() < wanted && cumulative >= per_layer * (points.len() as u64 + 1) {
            points.push(i as u8);
        }
    }
    points
}

/// Pick up to `num_layers - 1` cuts at the deepest valleys of the smoothed histogram.
///
/// Falls back to [`percentile_division`] when no bucket qualifies as a valley.
pub fn valley_division(histogram: &Histogram, num_layers: usize) -> Vec<u8> {
    let smoothed = smoothed_histogram(histogram);
    let mean = smoothed.iter().sum::<f64>() / BUCKETS as f64;

    let mut valleys: Vec<(usize, f64)> = (1..BUCKETS - 1)
        .filter(|&i| {
            let v = smoothed[i];
            v < mean * VALLEY_THRESHOLD && v < smoothed[i - 1] && v < smoothed[i + 1]
        })
        .map(|i| (i, smoothed[i]))
        .collect();
    valleys.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut points: Vec<u8> = valleys
        .into_iter()
        .take(num_layers.saturating_sub(1))
        .map(|(i, _)| i as u8)
        .collect();
    points.sort_unstable();

    if points.is_empty() {
        return percentile_division(histogram, num_layers);
    }
    points
}

/// Percentile cuts snapped onto histogram valleys, then thinned by band mass.
///
/// Every percentile candidate moves to its nearest valley (the lower valley wins a tie). The
/// snapped set is deduplicated and sorted, then a cut is kept only when the band between it and
/// the previously kept cut holds at least [`MIN_BAND_MASS`] of all pixels; dropped candidates
/// leave their mass to the next band.
#[tracing::instrument(skip(depth), fields(width = depth.width(), height = depth.height()))]
pub fn combined_divisions(depth: &RgbaBuffer) -> Divisions {
    let histogram = Histogram::of(depth);
    let valleys = valley_division(&histogram, VALLEY_CANDIDATES);
    let percentiles = percentile_division(&histogram, PERCENTILE_CANDIDATES);

    let snapped: BTreeSet<u8> = percentiles
        .iter()
        .filter_map(|&p| {
            valleys
                .iter()
                .copied()
                .min_by_key(|&v| (i32::from(p) - i32::from(v)).unsigned_abs())
        })
        .filter(|&p| (1..=254).contains(&p))
        .collect();

    let points = filter_by_mass(&histogram, snapped);
    tracing::debug!(?valleys, ?percentiles, ?points, "depth divisions");
    Divisions { histogram, points }
}

fn filter_by_mass(histogram: &Histogram, candidates: BTreeSet<u8>) -> Vec<u8> {
    let total = histogram.total();
    if total == 0 {
        return Vec::new();
    }

    let mut kept = Vec::new();
    let mut prev: Option<u8> = None;
    for point in candidates {
        let start = prev.map_or(0, |p| usize::from(p) + 1);
        let mass = histogram.mass(start, usize::from(point));
        if mass as f64 / total as f64 >= MIN_BAND_MASS {
            kept.push(point);
            prev = Some(point);
        }
    }
    kept
}

/// Centred moving average over `±8` buckets (clipped at the ends) plus a deterministic
/// tie-break that never reorders distinct values.
fn smoothed_histogram(histogram: &Histogram) -> [f64; BUCKETS] {
    let counts = histogram.counts();
    let mut smoothed = [0f64; BUCKETS];
    for (i, out) in smoothed.iter_mut().enumerate() {
        let left = i.saturating_sub(SMOOTHING_HALF_WINDOW);
        let right = (i + SMOOTHING_HALF_WINDOW).min(BUCKETS - 1);
        let sum: u64 = counts[left..=right].iter().sum();
        *out = sum as f64 / (right - left + 1) as f64;
    }
    break_plateau_ties(&mut smoothed);
    smoothed
}

/// Within each run of equal values add at most `TIE_BREAK / 2`: a run enclosed by higher
/// neighbours dips toward its centre, any other run slopes down toward a lower side, and the
/// histogram ends count as lower sides. Distinct smoothed values differ by at least 1/289, so
/// ordering between runs is preserved.
fn break_plateau_ties(values: &mut [f64; BUCKETS]) {
    let mut start = 0usize;
    while start < BUCKETS {
        let mut end = start;
        while end + 1 < BUCKETS && values[end + 1] == values[start] {
            end += 1;
        }

        let base = values[start];
        let left_higher = start > 0 && values[start - 1] > base;
        let right_higher = end + 1 < BUCKETS && values[end + 1] > base;
        let len = (end - start + 1) as f64;

        for (i, v) in values.iter_mut().enumerate().take(end + 1).skip(start) {
            let rank = match (left_higher, right_higher) {
                (true, true) => (2 * i).abs_diff(start + end) + 1,
                (false, true) => i - start + 1,
                _ => end - i + 1,
            };
            *v = base + TIE_BREAK * rank as f64 / (2.0 * len);
        }

        start = end + 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/histogram.rs"]
mod tests;
