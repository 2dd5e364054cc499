//! Recursion Depth
//!
//! Depth is cumulative along a delegation chain, including across agent
//! processes: the context rides along with every invocation request. Root
//! sessions run at depth 0 and every capability hop adds one. A hop to depth
//! `d` is allowed iff `d <= max_depth`.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursionContext {
    pub current_depth: u32,
    pub max_depth: u32,
}

impl RecursionContext {
    /// Context for a root session
    pub fn root(max_depth: u32) -> Self {
        Self {
            current_depth: 0,
            max_depth,
        }
    }

    /// Context for a session nested one level below this one
    pub fn descend(&self) -> Result<Self, ToolError> {
        let depth = self.current_depth.saturating_add(1);
        if depth > self.max_depth {
            return Err(ToolError::RecursionLimitExceeded {
                depth,
                max_depth: self.max_depth,
            });
        }
        Ok(Self {
            current_depth: depth,
            max_depth: self.max_depth,
        })
    }

    /// Apply a local ceiling; the stricter limit wins
    pub fn with_ceiling(self, max_depth: u32) -> Self {
        Self {
            current_depth: self.current_depth,
            max_depth: self.max_depth.min(max_depth),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.max_depth.saturating_sub(self.current_depth)
    }
}
