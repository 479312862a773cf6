//! Subcommands of the `seedup` binary

use std::process::ExitCode;

pub mod clear;
pub mod download;
pub mod status;
pub mod upload;

/// How a command finished, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// A precondition failed or at least one task failed
    Failed,
    /// Stopped by Ctrl-C; state was kept for resume
    Interrupted,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed => 1,
            Outcome::Interrupted => 130,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Success.code(), 0);
        assert_eq!(Outcome::Failed.code(), 1);
        assert_eq!(Outcome::Interrupted.code(), 130);
    }
}
