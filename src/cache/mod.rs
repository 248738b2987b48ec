#[cfg(feature = "http")]
pub(crate) mod http;
pub(crate) mod models;
pub(crate) mod store;
