#![forbid(unsafe_code)]

pub mod auth;
pub mod band;
pub mod catalog;
pub mod error;
pub mod grading;
pub mod model;
pub mod report;
pub mod session;
pub mod time;
pub mod timer;

pub use error::Error;
pub use time::Clock;
