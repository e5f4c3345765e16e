//! Per-borrower trove counters.

use super::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trove count for {borrower} on branch {coll_index} would go negative")]
pub struct NegativeTroveCount {
    pub borrower: Address,
    pub coll_index: u32,
}

/// Trove counts of one borrower across branches.
///
/// Per-branch maps are sparse; an absent branch reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowerInfo {
    pub id: Address,
    pub troves: u32,
    pub troves_by_collateral: BTreeMap<u32, u32>,
    /// Next unused owner index per branch; only ever grows.
    pub next_owner_index_by_collateral: BTreeMap<u32, u32>,
}

impl BorrowerInfo {
    pub fn new(id: Address) -> Self {
        BorrowerInfo {
            id,
            troves: 0,
            troves_by_collateral: BTreeMap::new(),
            next_owner_index_by_collateral: BTreeMap::new(),
        }
    }

    pub fn troves_on(&self, coll_index: u32) -> u32 {
        self.troves_by_collateral
            .get(&coll_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn next_owner_index(&self, coll_index: u32) -> u32 {
        self.next_owner_index_by_collateral
            .get(&coll_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn add_trove(&mut self, coll_index: u32) {
        self.troves += 1;
        *self.troves_by_collateral.entry(coll_index).or_insert(0) += 1;
        *self
            .next_owner_index_by_collateral
            .entry(coll_index)
            .or_insert(0) += 1;
    }

    pub fn remove_trove(&mut self, coll_index: u32) -> Result<(), NegativeTroveCount> {
        let on_branch = self.troves_on(coll_index);
        if on_branch == 0 || self.troves == 0 {
            return Err(NegativeTroveCount {
                borrower: self.id.clone(),
                coll_index,
            });
        }
        self.troves -= 1;
        self.troves_by_collateral.insert(coll_index, on_branch - 1);
        Ok(())
    }
}
