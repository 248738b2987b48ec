use super::*;

fn depth(width: u32, height: u32, values: &[u8]) -> RgbaBuffer {
    RgbaBuffer::from_gray(width, height, values).unwrap()
}

fn red(buf: &RgbaBuffer) -> Vec<u8> {
    buf.channel(Channel::R).collect()
}

#[test]
fn occlusion_clamps_and_marks_nearer_pixels() {
    let d = depth(4, 1, &[10, 125, 126, 250]);
    let occ = occlusion_mask(&d, 125);
    assert_eq!(red(&occ.clamped), vec![10, 125, 125, 125]);
    assert_eq!(red(&occ.mask), vec![0, 0, 255, 255]);
    assert!(occ.mask.channel(Channel::A).all(|a| a == 255));
}

#[test]
fn occlusion_at_255_marks_nothing() {
    let d = depth(3, 1, &[0, 128, 255]);
    let occ = occlusion_mask(&d, 255);
    assert_eq!(occ.clamped, d);
    assert!(occ.mask.channel(Channel::R).all(|m| m == 0));
}

#[test]
fn visibility_includes_lower_bound() {
    let d = depth(4, 1, &[0, 99, 100, 255]);
    assert_eq!(red(&visibility_mask(&d, 100)), vec![0, 0, 255, 255]);
}

#[test]
fn diffusion_leaves_unmasked_pixels_alone() {
    let values: Vec<u8> = (0..64).map(|i| if i % 8 < 4 { 40 } else { 200 }).collect();
    let d = depth(8, 8, &values);
    let occ = occlusion_mask(&d, 120);
    let mut mask = occ.mask.clone();
    mask.as_bytes_mut().fill(0);
    for px in mask.as_bytes_mut().chunks_exact_mut(4) {
        px[3] = 255;
    }
    let out = diffuse_occluded_depth(&occ.clamped, &mask).unwrap();
    assert_eq!(out, occ.clamped);
}

#[test]
fn diffusion_pulls_masked_region_toward_neighbours() {
    // Left half far (30), right half near (220) and occluded for a bound at 100.
    let values: Vec<u8> = (0..32 * 8).map(|i| if i % 32 < 16 { 30 } else { 220 }).collect();
    let d = depth(32, 8, &values);
    let occ = occlusion_mask(&d, 100);
    let out = diffuse_occluded_depth(&occ.clamped, &occ.mask).unwrap();

    for y in 0..8 {
        for x in 0..16 {
            assert_eq!(out.pixel(x, y)[0], 30, "unmasked pixel ({x},{y}) changed");
        }
        let near_edge = out.pixel(16, y)[0];
        assert!(near_edge < 100, "masked pixel next to the far side stays at the clamp");
        assert!(near_edge >= 30);
    }
    assert!(out.channel(Channel::A).all(|a| a == 255));
}

#[test]
fn diffusion_fills_masked_pixels_from_the_blurred_clamped_map() {
    // 64x8: far 30 on the left, near 220 on the right, occluded above 100.
    let values: Vec<u8> = (0..64 * 8).map(|i| if i % 64 < 32 { 30 } else { 220 }).collect();
    let d = depth(64, 8, &values);
    let occ = occlusion_mask(&d, 100);
    let fill = gaussian_blur(&dilate(&occ.mask, 8, Combine::Max), 2).unwrap();

    let out = diffuse_occluded_depth(&occ.clamped, &fill).unwrap();
    let blurred = gaussian_blur(&occ.clamped, DIFFUSION_RADIUS).unwrap();

    let row: Vec<u8> = (24..64).map(|x| out.pixel(x, 4)[0]).collect();
    for (x, &v) in (24u32..64).zip(&row) {
        if fill.pixel(x, 4)[0] == MASK_ON {
            assert_eq!(v, blurred.pixel(x, 4)[0], "fully masked pixel {x}");
        }
    }
    // Far from the edge the blurred clamp is back at the bound itself.
    assert!(row[row.len() - 1] >= 99, "{row:?}");
    assert!(row[row.len() - 2] >= 99, "{row:?}");
    // Non-decreasing from the far side into the occluded region.
    assert!(row.windows(2).all(|w| w[0] <= w[1] + 1), "{row:?}");
    assert_eq!(out.pixel(0, 4)[0], 30);
}

#[test]
fn diffusion_rejects_mismatched_mask() {
    let d = depth(2, 2, &[0; 4]);
    let m = depth(2, 1, &[0; 2]);
    assert!(diffuse_occluded_depth(&d, &m).is_err());
}

#[test]
fn pack_layer_depth_fills_three_channels() {
    let d = depth(4, 1, &[10, 20, 200, 210]);
    let vis = visibility_mask(&d, 100);
    let occ = occlusion_mask(&d, 150);
    let packed = pack_layer_depth(&d, &vis, &occ.mask, 0, 0, 0).unwrap();

    assert_eq!(red(&packed), vec![10, 20, 200, 210]);
    assert_eq!(packed.channel(Channel::G).collect::<Vec<_>>(), vec![0, 0, 255, 255]);
    assert_eq!(packed.channel(Channel::B).collect::<Vec<_>>(), vec![0, 0, 255, 255]);
}

#[test]
fn pack_layer_depth_dilates_depth_but_not_occlusion() {
    let d = depth(5, 1, &[0, 0, 200, 0, 0]);
    let vis = visibility_mask(&d, 100);
    let occ = occlusion_mask(&d, 100);
    let packed = pack_layer_depth(&d, &vis, &occ.mask, 1, 0, 0).unwrap();

    assert_eq!(red(&packed), vec![0, 200, 200, 200, 0]);
    assert_eq!(packed.channel(Channel::B).collect::<Vec<_>>(), vec![0, 0, 255, 0, 0]);
}
