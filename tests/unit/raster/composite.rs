use super::*;

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src), src);
}

#[test]
fn over_half_alpha_on_opaque_mixes_evenly() {
    let out = over([0, 0, 0, 255], [200, 100, 50, 128]);
    assert_eq!(out[3], 255);
    assert!((i32::from(out[0]) - 100).abs() <= 1);
    assert!((i32::from(out[1]) - 50).abs() <= 1);
    assert!((i32::from(out[2]) - 25).abs() <= 1);
}

#[test]
fn over_dst_transparent_keeps_src_colour() {
    let src = [100, 110, 120, 200];
    assert_eq!(over([0, 0, 0, 0], src), src);
}

#[test]
fn alpha_blend_opaque_front_returns_front() {
    let back = RgbaBuffer::filled(3, 2, [1, 2, 3, 255]).unwrap();
    let front = RgbaBuffer::from_raw(3, 2, (0u8..24).map(|v| v * 3).collect()).unwrap();
    let mut opaque = front.clone();
    for px in opaque.as_bytes_mut().chunks_exact_mut(4) {
        px[3] = 255;
    }
    assert_eq!(alpha_blend(&back, &[&opaque]).unwrap(), opaque);
}

#[test]
fn alpha_blend_applies_fronts_in_sequence() {
    let back = RgbaBuffer::filled(1, 1, [0, 0, 0, 255]).unwrap();
    let a = RgbaBuffer::filled(1, 1, [255, 0, 0, 255]).unwrap();
    let b = RgbaBuffer::filled(1, 1, [0, 255, 0, 255]).unwrap();
    let out = alpha_blend(&back, &[&a, &b]).unwrap();
    assert_eq!(out.pixel(0, 0), [0, 255, 0, 255]);
}

#[test]
fn alpha_blend_rejects_mismatched_sizes() {
    let back = RgbaBuffer::new(2, 2).unwrap();
    let front = RgbaBuffer::new(2, 3).unwrap();
    assert!(matches!(
        alpha_blend(&back, &[&front]),
        Err(DepthFlowError::Configuration(_))
    ));
}

#[test]
fn write_channel_copies_only_the_target_channel() {
    let source = RgbaBuffer::from_gray(2, 1, &[7, 9]).unwrap();
    let mut target = RgbaBuffer::filled(2, 1, [1, 2, 3, 4]).unwrap();
    write_channel(&source, Channel::R, &mut target, Channel::A).unwrap();
    assert_eq!(target.pixel(0, 0), [1, 2, 3, 7]);
    assert_eq!(target.pixel(1, 0), [1, 2, 3, 9]);
}

#[test]
fn write_channel_rejects_mismatched_sizes() {
    let source = RgbaBuffer::new(2, 1).unwrap();
    let mut target = RgbaBuffer::new(1, 2).unwrap();
    assert!(write_channel(&source, Channel::R, &mut target, Channel::G).is_err());
}
