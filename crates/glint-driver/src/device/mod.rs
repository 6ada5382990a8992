//! Headless GPU device acquisition.

mod context;
mod init;

pub use context::GpuContext;
pub use init::DeviceInit;
