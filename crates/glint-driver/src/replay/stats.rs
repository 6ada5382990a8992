use core::fmt;

/// Counters of one command-list replay.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ReplayStats {
    pub commands: usize,
    pub passes_opened: u32,
    pub draws: u32,
    pub clears: u32,
    /// Draws dropped because their render area or scissor was empty.
    pub skipped: u32,
}

impl fmt::Display for ReplayStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commands: {} passes, {} draws, {} clears, {} skipped",
            self.commands, self.passes_opened, self.draws, self.clears, self.skipped
        )
    }
}
