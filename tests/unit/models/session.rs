use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::{foundation::error::DepthFlowError, models::tensor::Tensor};

struct Constant(f32);

impl DepthModel for Constant {
    fn predict(&mut self, _image: &Tensor) -> DepthFlowResult<Tensor> {
        Tensor::new(vec![1, 1, 1], vec![self.0])
    }
}

#[test]
fn loads_once_and_reuses() {
    let lazy = LazySession::<dyn DepthModel>::new();
    let loads = AtomicUsize::new(0);
    let load = || -> DepthFlowResult<Box<dyn DepthModel>> {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Constant(1.0)))
    };

    let a = lazy.get_or_load(load).unwrap();
    let b = lazy.get_or_load(load).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(lazy.is_loaded());
}

#[test]
fn failed_load_is_retried() {
    let lazy = LazySession::<dyn DepthModel>::new();
    let err = lazy
        .get_or_load(|| Err(DepthFlowError::resource_missing("depth model not found in cache")))
        .err()
        .unwrap();
    assert!(matches!(err, DepthFlowError::ResourceMissing(_)));
    assert!(err.to_string().contains("depth model"));
    assert!(!lazy.is_loaded());

    let session = lazy
        .get_or_load(|| Ok(Box::new(Constant(3.0)) as Box<dyn DepthModel>))
        .unwrap();
    let out = with_session(&session, |m| m.predict(&Tensor::new(vec![1], vec![0.0])?)).unwrap();
    assert_eq!(out.data(), &[3.0]);
}

#[test]
fn reset_forces_reload() {
    let lazy = LazySession::<dyn DepthModel>::new();
    lazy.get_or_load(|| Ok(Box::new(Constant(1.0)) as Box<dyn DepthModel>))
        .unwrap();
    lazy.reset();
    assert!(!lazy.is_loaded());
}
