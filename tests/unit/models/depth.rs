use super::*;

struct EchoRed;

impl DepthModel for EchoRed {
    fn predict(&mut self, image: &Tensor) -> DepthFlowResult<Tensor> {
        let [1, 3, h, w] = image.dims() else {
            return Err(DepthFlowError::model_inference("bad input"));
        };
        let plane = h * w;
        Tensor::new(vec![1, *h, *w], image.data()[..plane].to_vec())
    }
}

struct Failing;

impl DepthModel for Failing {
    fn predict(&mut self, _image: &Tensor) -> DepthFlowResult<Tensor> {
        Err(DepthFlowError::model_inference("session crashed"))
    }
}

#[test]
fn landscape_input_size() {
    assert_eq!(depth_input_size(1920, 1080).unwrap(), (924, 518));
    assert_eq!(depth_input_size(100, 100).unwrap(), (518, 518));
}

#[test]
fn portrait_input_size() {
    assert_eq!(depth_input_size(1080, 1920).unwrap(), (518, 924));
}

#[test]
fn extreme_aspect_keeps_one_patch() {
    assert_eq!(depth_input_size(10_000, 1).unwrap().1, DEPTH_INPUT_EDGE);
    let (w, h) = depth_input_size(1, 10_000).unwrap();
    assert_eq!(w, DEPTH_INPUT_EDGE);
    assert_eq!(h % DEPTH_PATCH, 0);
    assert_eq!(depth_input_size(1000, 1).unwrap().0 % DEPTH_PATCH, 0);
}

#[test]
fn zero_size_rejected() {
    assert!(depth_input_size(0, 10).is_err());
}

#[test]
fn prepare_input_has_model_shape() {
    let img = RgbaBuffer::filled(64, 32, [128, 128, 128, 255]).unwrap();
    let t = prepare_depth_input(&img).unwrap();
    assert_eq!(t.dims(), &[1, 3, 518, 1036]);
}

#[test]
fn estimate_depth_normalizes_output() {
    let mut img = RgbaBuffer::filled(20, 20, [0, 0, 0, 255]).unwrap();
    for y in 0..20 {
        for x in 10..20 {
            img.set_pixel(x, y, [255, 255, 255, 255]);
        }
    }
    let depth = estimate_depth(&mut EchoRed, &img).unwrap();
    assert_eq!(depth.dimensions(), (518, 518));
    assert_eq!(depth.pixel(0, 0)[0], 0);
    assert_eq!(depth.pixel(517, 0)[0], 255);
}

#[test]
fn estimate_depth_propagates_model_errors() {
    let img = RgbaBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
    let err = estimate_depth(&mut Failing, &img).unwrap_err();
    assert!(matches!(err, DepthFlowError::ModelInference(_)));
    assert!(err.to_string().contains("session crashed"));
}
