use super::*;

fn gray(width: u32, height: u32, values: &[u8]) -> RgbaBuffer {
    RgbaBuffer::from_gray(width, height, values).unwrap()
}

#[test]
fn radius_0_is_identity_for_every_channel() {
    let src = RgbaBuffer::from_raw(2, 2, (0u8..16).collect()).unwrap();
    assert_eq!(dilate(&src, 0, Combine::Max), src);
    assert_eq!(dilate(&src, 0, Combine::Min), src);
}

#[test]
fn max_grows_single_bright_pixel_into_square() {
    let mut values = vec![0u8; 25];
    values[12] = 200;
    let out = dilate(&gray(5, 5, &values), 1, Combine::Max);

    for y in 0..5 {
        for x in 0..5 {
            let inside = (1..=3).contains(&x) && (1..=3).contains(&y);
            let expected = if inside { 200 } else { 0 };
            assert_eq!(out.pixel(x, y)[0], expected, "pixel ({x},{y})");
        }
    }
}

#[test]
fn min_shrinks_bright_region() {
    let mut values = vec![255u8; 9];
    values[0] = 10;
    let out = dilate(&gray(3, 3, &values), 1, Combine::Min);
    assert_eq!(out.pixel(1, 1)[0], 10);
    assert_eq!(out.pixel(2, 2)[0], 255);
}

#[test]
fn edges_only_use_in_bounds_neighbours() {
    let out = dilate(&gray(4, 1, &[9, 0, 0, 0]), 10, Combine::Max);
    assert!(out.channel(crate::raster::buffer::Channel::R).all(|v| v == 9));
}

#[test]
fn alpha_channel_is_filtered_independently() {
    let src = RgbaBuffer::from_raw(2, 1, vec![0, 0, 0, 255, 0, 0, 0, 0]).unwrap();
    let out = dilate(&src, 1, Combine::Min);
    assert_eq!(out.pixel(0, 0)[3], 0);
    assert_eq!(out.pixel(1, 0)[3], 0);
}
