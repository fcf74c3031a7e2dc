// SPDX-License-Identifier: Apache-2.0

use crate::validation::ValidationError;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Calendar quarter in UTC. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    year: i32,
    q: u8,
}

impl Quarter {
    pub fn new(year: i32, q: u8) -> Result<Self, ValidationError> {
        if !(1..=4).contains(&q) {
            return Err(ValidationError::single("quarter", "must be between 1 and 4"));
        }
        Ok(Self { year, q })
    }

    #[must_use]
    pub fn from_datetime(ts: DateTime<Utc>) -> Self {
        let q = u8::try_from((ts.month0() / 3) + 1).unwrap_or(4);
        Self { year: ts.year(), q }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let err = || ValidationError::single("quarter", "must look like YYYY-Qn");
        let (year, q) = input.trim().split_once("-Q").ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let q: u8 = q.parse().map_err(|_| err())?;
        Self::new(year, q)
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn q(self) -> u8 {
        self.q
    }

    #[must_use]
    pub fn label(self) -> String {
        format!("{:04}-Q{}", self.year, self.q)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        if self.q == 4 {
            Self {
                year: self.year + 1,
                q: 1,
            }
        } else {
            Self {
                year: self.year,
                q: self.q + 1,
            }
        }
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        if self.q == 1 {
            Self {
                year: self.year - 1,
                q: 4,
            }
        } else {
            Self {
                year: self.year,
                q: self.q - 1,
            }
        }
    }
}

impl Display for Quarter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.q)
    }
}

impl TryFrom<String> for Quarter {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Quarter> for String {
    fn from(value: Quarter) -> Self {
        value.label()
    }
}
