pub(crate) mod bounds;
pub(crate) mod histogram;
pub(crate) mod masks;
