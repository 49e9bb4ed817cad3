pub mod http;
pub mod protocol;

pub use http::{DEFAULT_TIMEOUT, HttpRepository};
