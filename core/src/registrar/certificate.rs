//! Certificate ledger
//!
//! Plain transferable-asset bookkeeping: holder per label, an enumerable
//! index of labels per holder, single-label approvals and holder-wide
//! operators. Expiry is not known here; the registrar gates every access.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{Address, LabelHash};

/// Holders, holdings and approvals of issued certificates
#[derive(Debug, Clone, Default)]
pub struct CertificateBook {
    /// label -> holder
    holders: HashMap<LabelHash, Address>,

    /// holder -> labels
    holdings: HashMap<Address, BTreeSet<LabelHash>>,

    /// label -> approved spender
    approvals: HashMap<LabelHash, Address>,

    /// holder -> operators
    operators: HashMap<Address, HashSet<Address>>,
}

impl CertificateBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of `label`
    pub fn holder_of(&self, label: &LabelHash) -> Option<Address> {
        self.holders.get(label).copied()
    }

    /// Issue `label` to `holder`. The label must not be held.
    pub fn mint(&mut self, label: LabelHash, holder: Address) {
        debug_assert!(!self.holders.contains_key(&label));
        self.holders.insert(label, holder);
        self.holdings.entry(holder).or_default().insert(label);
    }

    /// Destroy `label`, returning the holder it was taken from
    pub fn burn(&mut self, label: &LabelHash) -> Option<Address> {
        let holder = self.holders.remove(label)?;
        self.approvals.remove(label);
        self.unindex(&holder, label);
        Some(holder)
    }

    /// Move `label` to `to`, clearing its approval
    pub fn move_to(&mut self, label: LabelHash, to: Address) -> Option<Address> {
        let from = self.holders.insert(label, to)?;
        self.approvals.remove(&label);
        self.unindex(&from, &label);
        self.holdings.entry(to).or_default().insert(label);
        Some(from)
    }

    /// Approved spender of `label`; null if none
    pub fn approved(&self, label: &LabelHash) -> Address {
        self.approvals.get(label).copied().unwrap_or_default()
    }

    /// Set or clear (null) the approved spender of `label`
    pub fn approve(&mut self, label: LabelHash, spender: Address) {
        if spender.is_zero() {
            self.approvals.remove(&label);
        } else {
            self.approvals.insert(label, spender);
        }
    }

    /// Toggle `operator` for every certificate of `holder`
    pub fn set_operator(&mut self, holder: Address, operator: Address, approved: bool) {
        let ops = self.operators.entry(holder).or_default();
        if approved {
            ops.insert(operator);
        } else {
            ops.remove(&operator);
        }
    }

    /// Whether `operator` acts for `holder`
    pub fn is_operator(&self, holder: &Address, operator: &Address) -> bool {
        self.operators
            .get(holder)
            .map_or(false, |ops| ops.contains(operator))
    }

    /// Whether `caller` is holder, approved spender or operator of `label`
    pub fn is_approved_or_holder(&self, label: &LabelHash, caller: &Address) -> bool {
        match self.holder_of(label) {
            Some(holder) => {
                holder == *caller
                    || self.approved(label) == *caller
                    || self.is_operator(&holder, caller)
            }
            None => false,
        }
    }

    /// Number of labels held
    pub fn balance_of(&self, holder: &Address) -> usize {
        self.holdings.get(holder).map_or(0, BTreeSet::len)
    }

    /// Labels held, in label-hash order
    pub fn labels_of(&self, holder: &Address) -> Vec<LabelHash> {
        self.holdings
            .get(holder)
            .map(|labels| labels.iter().copied().collect())
            .unwrap_or_default()
    }

    fn unindex(&mut self, holder: &Address, label: &LabelHash) {
        if let Some(labels) = self.holdings.get_mut(holder) {
            labels.remove(label);
            if labels.is_empty() {
                self.holdings.remove(holder);
            }
        }
    }
}
