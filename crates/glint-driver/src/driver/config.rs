/// Settings of a [`Driver`](super::Driver).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Minimum number of uniform slots allocated for the first command list.
    pub initial_uniform_slots: u32,
    /// Log operation counters and replay statistics after every flush.
    pub log_frame_stats: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            initial_uniform_slots: 64,
            log_frame_stats: true,
        }
    }
}
