use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A five-tone selcall code: an ordered sequence of decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToneCode(String);

#[derive(Debug, thiserror::Error)]
#[error("tone code must be all decimal digits, got {0:?}")]
pub struct InvalidToneCode(String);

impl ToneCode {
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl FromStr for ToneCode {
    type Err = InvalidToneCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidToneCode(s.to_string()));
        }
        Ok(ToneCode(s.to_string()))
    }
}

impl fmt::Display for ToneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_digit_string() {
        assert_eq!("12345".parse::<ToneCode>().unwrap().digits(), "12345");
    }

    #[test]
    fn rejects_non_digits() {
        assert!("12a45".parse::<ToneCode>().is_err());
        assert!("".parse::<ToneCode>().is_err());
    }
}
