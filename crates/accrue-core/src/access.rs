//! Capability checks gating funding and deployment.

use crate::types::Address;
use std::collections::HashSet;

/// Answers "may this caller act as distributor/owner?"
pub trait AccessControl: Send + Sync {
    fn is_authorized(&self, caller: &Address) -> bool;
}

/// Exactly one authorized address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingleOwner(pub Address);

impl AccessControl for SingleOwner {
    fn is_authorized(&self, caller: &Address) -> bool {
        *caller == self.0
    }
}

/// Any address from a fixed set
#[derive(Clone, Debug, Default)]
pub struct AllowList {
    members: HashSet<Address>,
}

impl AllowList {
    pub fn new(members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }
}

impl AccessControl for AllowList {
    fn is_authorized(&self, caller: &Address) -> bool {
        self.members.contains(caller)
    }
}
