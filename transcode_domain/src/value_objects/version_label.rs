// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Output version label: the 4-character key used to name one requested
//! transcoding output (e.g. resolution/bitrate variant) in an RPC request's
//! `outputs` map and in playlist/segment path templates.

use crate::TranscodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated 4-character, printable-ASCII version label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionLabel(String);

impl VersionLabel {
    pub const LENGTH: usize = 4;

    pub fn new(label: impl Into<String>) -> Result<Self, TranscodeError> {
        let label = label.into();
        Self::validate(&label)?;
        Ok(Self(label))
    }

    fn validate(label: &str) -> Result<(), TranscodeError> {
        if label.chars().count() != Self::LENGTH {
            return Err(TranscodeError::validation(format!(
                "version label must be exactly {} characters, got {}",
                Self::LENGTH,
                label.chars().count()
            )));
        }
        if !label.chars().all(|c| c.is_ascii_graphic()) {
            return Err(TranscodeError::validation(
                "version label must contain only printable ASCII characters",
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VersionLabel {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_four_printable_ascii_chars() {
        assert!(VersionLabel::new("1080").is_ok());
        assert!(VersionLabel::new("hd1x").is_ok());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(VersionLabel::new("abc").is_err());
        assert!(VersionLabel::new("abcde").is_err());
    }

    #[test]
    fn rejects_non_printable_characters() {
        assert!(VersionLabel::new("a\tbc").is_err());
    }
}
