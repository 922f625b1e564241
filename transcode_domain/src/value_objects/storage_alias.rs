// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Opaque alias identifying which configured storage backend a request's
//! source/destination paths resolve against.

use crate::TranscodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageAlias(String);

impl StorageAlias {
    pub fn new(alias: impl Into<String>) -> Result<Self, TranscodeError> {
        let alias = alias.into();
        if alias.is_empty() {
            return Err(TranscodeError::validation("storage alias cannot be empty"));
        }
        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TranscodeError::validation(
                "storage alias may only contain ascii alphanumerics, '-' and '_'",
            ));
        }
        Ok(Self(alias))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
