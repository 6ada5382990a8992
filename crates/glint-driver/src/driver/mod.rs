//! The engine-facing driver.
//!
//! [`GpuDriver`] is the entry-point table the paint engine calls;
//! [`Driver`] implements it over any [`Backend`](crate::backend::Backend) by
//! routing resource calls to the three managers and command lists to the
//! interpreter.

mod api;
mod config;
mod realize;
mod stats;

pub use api::GpuDriver;
pub use config::DriverConfig;
pub use realize::Driver;
pub use stats::OpCounters;
