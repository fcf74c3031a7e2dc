// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_filter_len: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 25,
            max_limit: 500,
            max_filter_len: 256,
        }
    }
}
