use super::*;

fn depth_from_values(width: u32, height: u32, values: &[u8]) -> RgbaBuffer {
    RgbaBuffer::from_gray(width, height, values).unwrap()
}

/// 100x100 map: 5000 pixels at depth 50 and 5000 at depth 200.
fn two_cluster_depth() -> RgbaBuffer {
    let mut values = vec![50u8; 5000];
    values.extend(std::iter::repeat_n(200u8, 5000));
    depth_from_values(100, 100, &values)
}

fn hist(pairs: &[(usize, u64)]) -> Histogram {
    let mut counts = [0u64; BUCKETS];
    for &(i, c) in pairs {
        counts[i] = c;
    }
    Histogram::from_counts(counts)
}

fn assert_strictly_increasing_in_range(points: &[u8]) {
    for w in points.windows(2) {
        assert!(w[0] < w[1], "not strictly increasing: {points:?}");
    }
    for &p in points {
        assert!((1..=254).contains(&p), "out of range: {points:?}");
    }
}

#[test]
fn histogram_sums_to_pixel_count() {
    let values: Vec<u8> = (0..37 * 11).map(|i| (i * 7 % 256) as u8).collect();
    let h = Histogram::of(&depth_from_values(37, 11, &values));
    assert_eq!(h.total(), 37 * 11);
    assert_eq!(h.counts()[0], values.iter().filter(|&&v| v == 0).count() as u64);
}

#[test]
fn histogram_reads_primary_channel_only() {
    let buf = RgbaBuffer::from_raw(1, 1, vec![9, 100, 200, 255]).unwrap();
    let h = Histogram::of(&buf);
    assert_eq!(h.counts()[9], 1);
    assert_eq!(h.total(), 1);
}

#[test]
fn percentile_two_clusters_cuts_at_first_cluster() {
    let h = Histogram::of(&two_cluster_depth());
    assert_eq!(percentile_division(&h, 2), vec![50]);
}

#[test]
fn percentile_emits_at_most_one_cut_per_bucket() {
    let h = Histogram::of(&two_cluster_depth());
    assert_eq!(percentile_division(&h, 5), vec![50, 51, 200, 201]);
}

#[test]
fn percentile_uniform_histogram_is_evenly_spaced() {
    let mut counts = [0u64; BUCKETS];
    counts.iter_mut().for_each(|c| *c = 10);
    let h = Histogram::from_counts(counts);
    assert_eq!(percentile_division(&h, 4), vec![63, 127, 191]);
}

#[test]
fn percentile_degenerate_inputs_are_empty() {
    assert!(percentile_division(&hist(&[]), 3).is_empty());
    assert!(percentile_division(&hist(&[(10, 5)]), 1).is_empty());
}

#[test]
fn valley_two_clusters_picks_centre_of_gap() {
    let h = Histogram::of(&two_cluster_depth());
    assert_eq!(valley_division(&h, 2), vec![125]);
}

#[test]
fn valley_open_ended_plateaus_are_not_valleys() {
    let h = Histogram::of(&two_cluster_depth());
    assert_eq!(valley_division(&h, 12), vec![125]);
}

#[test]
fn valley_three_clusters_finds_both_gaps() {
    let h = hist(&[(30, 1000), (130, 1000), (230, 1000)]);
    assert_eq!(valley_division(&h, 12), vec![80, 180]);
}

#[test]
fn valley_keeps_deepest_candidates_sorted_by_index() {
    // The narrow gaps around the small cluster at 120 lose to the two wide gaps.
    let h = hist(&[
        (20, 4000),
        (100, 4000),
        (140, 4000),
        (240, 4000),
        (120, 300),
    ]);
    let all = valley_division(&h, 12);
    let two = valley_division(&h, 3);
    assert_eq!(all, vec![60, 110, 130, 190]);
    assert_eq!(two, vec![60, 190]);
}

#[test]
fn valley_falls_back_to_percentile_without_valleys() {
    let h = hist(&[(128, 500)]);
    assert_eq!(valley_division(&h, 2), percentile_division(&h, 2));
}

#[test]
fn combined_two_clusters_yields_single_cut() {
    let d = combined_divisions(&two_cluster_depth());
    assert_eq!(d.histogram.total(), 10_000);
    assert_eq!(d.points, vec![125]);
}

#[test]
fn combined_band_mass_is_at_least_ten_percent() {
    let mut values = vec![60u8; 950];
    values.extend(std::iter::repeat_n(200u8, 50));
    let d = combined_divisions(&depth_from_values(100, 10, &values));
    assert_eq!(d.points, vec![130]);
    assert_strictly_increasing_in_range(&d.points);
}

#[test]
fn mass_filter_accumulates_into_next_candidate() {
    let h = hist(&[(10, 60), (40, 60), (200, 880)]);
    let candidates: BTreeSet<u8> = [30u8, 100].into_iter().collect();
    assert_eq!(filter_by_mass(&h, candidates), vec![100]);
}

#[test]
fn mass_filter_measures_from_last_kept_cut() {
    let h = hist(&[(10, 300), (40, 50), (60, 300), (200, 350)]);
    let candidates: BTreeSet<u8> = [20u8, 50, 100].into_iter().collect();
    // 20 keeps 30%; 50 only adds 5% and is dropped; 100 then holds 35% above 20.
    assert_eq!(filter_by_mass(&h, candidates), vec![20, 100]);
}

#[test]
fn combined_flat_depth_has_no_points() {
    let d = combined_divisions(&depth_from_values(8, 8, &[77u8; 64]));
    assert!(d.points.is_empty());
}

#[test]
fn combined_points_are_always_strictly_increasing() {
    let patterns: Vec<Vec<u8>> = vec![
        (0..4096).map(|i| (i % 256) as u8).collect(),
        (0..4096).map(|i| ((i * i) % 256) as u8).collect(),
        (0..4096).map(|i| if i % 3 == 0 { 20 } else { 240 }).collect(),
        (0..4096).map(|i| (i / 16) as u8).collect(),
    ];
    for values in patterns {
        let d = combined_divisions(&depth_from_values(64, 64, &values));
        assert_strictly_increasing_in_range(&d.points);
    }
}

#[test]
fn smoothing_is_deterministic() {
    let h = Histogram::of(&two_cluster_depth());
    assert_eq!(smoothed_histogram(&h), smoothed_histogram(&h));
}
