//! Data models for Salon

mod appointment;
mod service;
mod staff;

pub use appointment::*;
pub use service::*;
pub use staff::*;
