//! Community (cluster) of spaces.

use serde::{Deserialize, Serialize};
use super::SpaceId;

/// A community produced by the detector. Members are listed in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: u32,
    pub members: Vec<SpaceId>,
}

impl Community {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
