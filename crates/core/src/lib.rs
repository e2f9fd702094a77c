#![forbid(unsafe_code)]

pub mod model;
pub mod partial;
pub mod session;
pub mod time;

pub use time::Clock;
