#![forbid(unsafe_code)]

pub mod error;
pub mod estimator;
pub mod model;
pub mod surface;
pub mod time;

pub use error::Error;
pub use time::Clock;
