use std::fmt;

/// Small-integer outcome of every evaluated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    pub const SUCCESS: Self = Self(0);
    pub const FAILURE: Self = Self(1);
    /// The command exists but could not be executed.
    pub const NOT_EXECUTABLE: Self = Self(126);
    pub const NOT_FOUND: Self = Self(127);

    /// Status of a process killed by `signal`.
    pub fn from_signal(signal: i32) -> Self {
        Self(128 + signal)
    }

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn success(self) -> bool {
        self.0 == 0
    }

    /// Success becomes failure; anything else becomes success.
    pub fn negate(self) -> Self {
        if self.success() {
            Self::FAILURE
        } else {
            Self::SUCCESS
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl From<bool> for ExitStatus {
    fn from(ok: bool) -> Self {
        if ok { Self::SUCCESS } else { Self::FAILURE }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_is_binary() {
        assert_eq!(ExitStatus::SUCCESS.negate(), ExitStatus::FAILURE);
        assert_eq!(ExitStatus::FAILURE.negate(), ExitStatus::SUCCESS);
        assert_eq!(ExitStatus(42).negate(), ExitStatus::SUCCESS);
        assert_eq!(ExitStatus::from_signal(9), ExitStatus(137));
    }
}
