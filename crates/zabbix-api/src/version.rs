// API version tuple
//
// `apiinfo.version` answers with a dotted string ("2.0.4", "6.0.21").
// Comparisons are lexicographic over (major, minor, micro), which is
// exactly the derived `Ord` of the struct below.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A parsed server API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// `true` if this version is equal to or newer than `major.minor.micro`.
    pub fn is_at_least(&self, major: u32, minor: u32, micro: u32) -> bool {
        *self >= Self::new(major, minor, micro)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    /// Accepts one to three numeric components; missing ones are zero.
    /// Pre-release suffixes on the last component ("7.0.0rc1") are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            |reason: &str| Error::schema("apiinfo", "version", format!("{reason}: {s:?}"));

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid("expected major[.minor[.micro]]"));
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                return Err(invalid("non-numeric version component"));
            }
            *slot = digits
                .parse()
                .map_err(|_| invalid("version component out of range"))?;
        }

        let [major, minor, micro] = numbers;
        Ok(Self::new(major, minor, micro))
    }
}
