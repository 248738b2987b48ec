pub(crate) mod blur;
pub(crate) mod buffer;
pub(crate) mod codec;
pub(crate) mod composite;
pub(crate) mod dilate;
pub(crate) mod resample;
