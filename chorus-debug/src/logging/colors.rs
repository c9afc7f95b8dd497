use std::fmt::{Debug, Display, Formatter, Result};

#[cfg(feature = "plain")]
mod codes {
    pub const GREEN: &str = "";
    pub const RED: &str = "";
    pub const CYAN: &str = "";
    pub const YELLOW: &str = "";
    pub const MAGENTA: &str = "";
    pub const RESET: &str = "";
}

#[cfg(not(feature = "plain"))]
mod codes {
    pub const GREEN: &str = "\x1B[32m";
    pub const RED: &str = "\x1B[31m";
    pub const CYAN: &str = "\x1B[36m";
    pub const YELLOW: &str = "\x1B[33m";
    pub const MAGENTA: &str = "\x1B[35m";
    pub const RESET: &str = "\x1B[0m";
}

/// A value that will be printed in the given terminal color.
pub struct Colorized<'a, T: ?Sized> {
    inner: &'a T,
    code: &'static str,
}

impl<T: Display + ?Sized> Display for Colorized<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{}{}", self.code, self.inner, codes::RESET)
    }
}

impl<T: Debug + ?Sized> Debug for Colorized<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{:?}{}", self.code, self.inner, codes::RESET)
    }
}

/// Wraps any value in a [`Colorized`].
pub trait Colorize {
    /// Used for things that went well.
    fn green(&self) -> Colorized<'_, Self> {
        Colorized {
            inner: self,
            code: codes::GREEN,
        }
    }

    /// Used for errors and timestamps.
    fn red(&self) -> Colorized<'_, Self> {
        Colorized {
            inner: self,
            code: codes::RED,
        }
    }

    /// Used for numbers and durations.
    fn cyan(&self) -> Colorized<'_, Self> {
        Colorized {
            inner: self,
            code: codes::CYAN,
        }
    }

    /// Used for warnings.
    fn yellow(&self) -> Colorized<'_, Self> {
        Colorized {
            inner: self,
            code: codes::YELLOW,
        }
    }

    /// Used for paths and URLs.
    fn magenta(&self) -> Colorized<'_, Self> {
        Colorized {
            inner: self,
            code: codes::MAGENTA,
        }
    }
}

impl<T: ?Sized> Colorize for T {}

#[cfg(all(test, not(feature = "plain")))]
mod tests {
    use super::Colorize;

    #[test]
    fn test_display_wraps_in_codes() {
        assert_eq!(format!("{}", "load".green()), "\x1B[32mload\x1B[0m");
    }

    #[test]
    fn test_debug_wraps_in_codes() {
        assert_eq!(format!("{:?}", "src".magenta()), "\x1B[35m\"src\"\x1B[0m");
    }
}
