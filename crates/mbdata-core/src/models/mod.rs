//! Shared data models for vehicle providers

mod custom;
mod vehicle;

pub use custom::*;
pub use vehicle::*;
