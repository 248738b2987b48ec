pub(crate) mod create;
pub(crate) mod model;
pub(crate) mod opts;
pub(crate) mod progress;
