//! Outcome of a run call.

use std::fmt;

/// How a run, skip or async wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusCode {
    #[default]
    Success,
    /// The run failed; the processor is in `Error`.
    Exception,
    Other,
    /// A shutdown was requested while running.
    Signal,
    /// The source (or the event limit) ran out.
    InputExhausted,
    /// The requested number of events was processed.
    CountComplete,
    /// An async wait gave up; the run loop was abandoned.
    TimedOut,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "Success",
            StatusCode::Exception => "Exception",
            StatusCode::Other => "Other",
            StatusCode::Signal => "Signal",
            StatusCode::InputExhausted => "InputExhausted",
            StatusCode::CountComplete => "CountComplete",
            StatusCode::TimedOut => "TimedOut",
        }
    }

    /// Process exit code for a job that ended with this status.
    ///
    /// Normal terminations map to `0`.
    pub fn exit_code(&self) -> i32 {
        match self {
            StatusCode::Success | StatusCode::InputExhausted | StatusCode::CountComplete => 0,
            StatusCode::Exception => 1,
            StatusCode::Other => 2,
            StatusCode::Signal => 3,
            StatusCode::TimedOut => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StatusCode::InputExhausted.exit_code(), 0);
        assert_eq!(StatusCode::Exception.exit_code(), 1);
        assert_eq!(StatusCode::Signal.exit_code(), 3);
        assert!(!StatusCode::TimedOut.is_success());
        assert_eq!(StatusCode::default(), StatusCode::Success);
    }
}
