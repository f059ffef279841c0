//! E.164 country calling codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid country calling code: {0}")]
pub struct InvalidCountryCode(pub String);

/// Country calling code (1 to 3 digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct CountryCode(u16);

impl CountryCode {
    pub const EGYPT: CountryCode = CountryCode(20);
    pub const FRANCE: CountryCode = CountryCode(33);
    pub const CUBA: CountryCode = CountryCode(53);
    pub const IRAN: CountryCode = CountryCode(98);
    pub const UKRAINE: CountryCode = CountryCode(380);
    pub const OMAN: CountryCode = CountryCode(968);
    pub const UAE: CountryCode = CountryCode(971);
    pub const QATAR: CountryCode = CountryCode(974);
    pub const UZBEKISTAN: CountryCode = CountryCode(998);

    /// Returns `None` outside 1..=999
    pub fn new(code: u16) -> Option<Self> {
        (1..=999).contains(&code).then_some(Self(code))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for CountryCode {
    type Error = InvalidCountryCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code).ok_or_else(|| InvalidCountryCode(code.to_string()))
    }
}

impl From<CountryCode> for u16 {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}", self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = InvalidCountryCode;

    /// Accepts `98` and `+98`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        digits
            .parse::<u16>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidCountryCode(s.to_string()))
    }
}
