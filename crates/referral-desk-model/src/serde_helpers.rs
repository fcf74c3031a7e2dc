// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Deserializer};
use std::fmt::Display;

/// Optional enum cell where a blank string means "not set".
pub mod blank_as_none {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<String>,
        T::Error: Display,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => T::try_from(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Patch field for an optional enum: absent leaves the value alone, while
/// `null` or a blank string clears it. Pair with `#[serde(default)]`.
pub mod blank_as_cleared {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<String>,
        T::Error: Display,
    {
        super::blank_as_none::deserialize(deserializer).map(Some)
    }
}
