//! Commit-reveal registration controller
//!
//! End users acquire names in two transactions. `commit` publishes only a
//! blinded hash; after the minimum commitment age the matching `register`
//! reveals the parameters, pays, and drives the registrar. An observer of
//! the first transaction learns nothing it could front-run with.

mod commitment;
mod pricing;

pub use commitment::{Commitments, RegistrationRequest, COMMITMENT_DOMAIN};
pub use pricing::{Price, PriceOracle};
#[cfg(test)]
pub use pricing::MockPriceOracle;

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use bytes::Bytes;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;
use crate::error::{CoreError, Result};
use crate::events::ControllerEvent;
use crate::namehash::NameHasher;
use crate::registrar::{Ledger, Registrar};
use crate::resolver::{ResolverCall, ADDR_KEY, NAME_KEY};
use crate::reverse::ReverseRegistrar;
use crate::types::{Address, LabelHash, NodeId, Timestamp, TxContext};

/// Outcome of a successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    /// Registered label
    pub label: LabelHash,

    /// Registry identifier of the name
    pub node: NodeId,

    /// Certificate expiry
    pub expires: Timestamp,

    /// Price charged
    pub price: Price,

    /// Overpayment returned to the caller
    pub refund: u128,

    /// Reverse record set for the caller, if requested
    pub reverse_node: Option<NodeId>,
}

/// Outcome of a successful renewal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalReceipt {
    /// Renewed label
    pub label: LabelHash,

    /// New expiry
    pub expires: Timestamp,

    /// Amount charged
    pub cost: u128,

    /// Overpayment returned to the caller
    pub refund: u128,
}

/// The commit-reveal controller
#[derive(Clone)]
pub struct Controller {
    /// Identity the controller acts as towards the registrar
    address: Address,

    /// Administrator
    owner: Address,

    /// Label derivation and commitment hashing
    hasher: NameHasher,

    /// Pricing
    oracle: Arc<dyn PriceOracle>,

    /// Pending commitments
    commitments: Commitments,

    /// Seconds before a commitment may be consumed
    min_commitment_age: u64,

    /// Seconds after which a commitment is stale
    max_commitment_age: u64,

    /// Shortest registration
    min_registration_duration: u64,

    /// Registrations must be strictly shorter
    max_registration_duration: u64,

    /// Minimum label length in characters
    min_name_length: usize,

    /// Payments kept, not yet withdrawn
    collected: u128,

    /// Raised and not yet collected events
    events: Vec<ControllerEvent>,
}

impl Debug for Controller {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Controller")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("commitments", &self.commitments)
            .field("min_commitment_age", &self.min_commitment_age)
            .field("max_commitment_age", &self.max_commitment_age)
            .field("collected", &self.collected)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Create a controller
    pub fn new(
        address: Address,
        owner: Address,
        hasher: NameHasher,
        oracle: Arc<dyn PriceOracle>,
        config: &ControllerConfig,
    ) -> Self {
        Controller {
            address,
            owner,
            hasher,
            oracle,
            commitments: Commitments::new(),
            min_commitment_age: config.min_commitment_age.as_secs(),
            max_commitment_age: config.max_commitment_age.as_secs(),
            min_registration_duration: config.min_registration_duration.as_secs(),
            max_registration_duration: config.max_registration_duration.as_secs(),
            min_name_length: config.min_name_length,
            collected: 0,
            events: Vec::new(),
        }
    }

    /// Identity of the controller
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Payments held
    pub fn collected(&self) -> u128 {
        self.collected
    }

    /// Current commitment age window
    pub fn commitment_ages(&self) -> (u64, u64) {
        (self.min_commitment_age, self.max_commitment_age)
    }

    /// Number of stored commitments
    pub fn pending_commitments(&self) -> usize {
        self.commitments.len()
    }

    /// When a commitment was made
    pub fn committed_at(&self, commitment: &[u8; 32]) -> Option<Timestamp> {
        self.commitments.committed_at(commitment)
    }

    /// Commitment to a registration without resolver configuration
    pub fn make_commitment(&self, name: &str, owner: Address, duration: u64, secret: [u8; 32]) -> Result<[u8; 32]> {
        RegistrationRequest::new(name, owner, duration, secret).commitment(self.hasher.algorithm())
    }

    /// Commitment to a fully configured registration
    pub fn make_commitment_with_config(&self, request: &RegistrationRequest) -> Result<[u8; 32]> {
        request.commitment(self.hasher.algorithm())
    }

    /// Whether `name` is long enough to register
    pub fn valid(&self, name: &str) -> bool {
        name.chars().count() >= self.min_name_length && !name.contains('.')
    }

    /// Whether `name` is valid and its label available
    pub fn available(&self, registrar: &Registrar, name: &str, now: Timestamp) -> bool {
        self.valid(name) && registrar.is_available(&self.hasher.label_hash(name), now)
    }

    /// Price of `name` for `duration`, at its current expiry
    pub fn rent_price(&self, registrar: &Registrar, name: &str, duration: u64) -> Price {
        let expires = registrar.name_expires(&self.hasher.label_hash(name));
        self.oracle.price(name, expires, duration)
    }

    /// Publish a commitment
    pub fn commit(&mut self, ctx: &TxContext, commitment: [u8; 32]) -> Result<()> {
        self.commitments.commit(commitment, ctx.now, self.max_commitment_age)?;
        let pruned = self.commitments.prune(ctx.now, self.max_commitment_age);
        if pruned > 0 {
            debug!("Pruned {} stale commitments", pruned);
        }
        debug!("Commitment 0x{} made by {:?}", hex::encode(commitment), ctx.sender);
        self.events.push(ControllerEvent::CommitmentMade {
            commitment,
            at: ctx.now,
        });
        Ok(())
    }

    /// Reveal and execute a committed registration
    ///
    /// Checks run in order: commitment age, availability, duration bounds,
    /// reverse registrar presence, payment. Nothing is written before the
    /// last check passes.
    pub fn register(
        &mut self,
        registrar: &mut Registrar,
        ledger: &mut Ledger<'_>,
        reverse: Option<&mut Box<dyn ReverseRegistrar>>,
        ctx: &TxContext,
        request: &RegistrationRequest,
    ) -> Result<RegistrationReceipt> {
        let commitment = self.make_commitment_with_config(request)?;
        self.commitments.check_age(
            &commitment,
            ctx.now,
            self.min_commitment_age,
            self.max_commitment_age,
        )?;

        let label = self.hasher.label_hash(&request.name);
        if !self.available(registrar, &request.name, ctx.now) {
            return Err(CoreError::NameNotAvailable(label));
        }
        self.check_duration(request.duration)?;
        if request.reverse_record && reverse.is_none() {
            return Err(CoreError::ReverseRegistrarNotSet);
        }

        let price = self.rent_price(registrar, &request.name, request.duration);
        let total = price.total();
        if ctx.value < total {
            return Err(CoreError::InsufficientValue {
                required: total,
                provided: ctx.value,
            });
        }

        self.commitments.consume(&commitment);

        let (keys, values) = match request.addr {
            Some(addr) => (
                vec![ADDR_KEY.to_string()],
                vec![Bytes::copy_from_slice(addr.as_bytes())],
            ),
            None => (Vec::new(), Vec::new()),
        };
        let expires = registrar.register(
            ledger,
            &ctx.as_caller(self.address),
            label,
            request.owner,
            Bytes::new(),
            request.resolver,
            &keys,
            &values,
            request.duration,
        )?;

        let reverse_node = match reverse {
            Some(reverse) if request.reverse_record => {
                let full_name = format!("{}.{}", request.name, registrar.base_name());
                let data = ResolverCall::SetData {
                    node: self.hasher.reverse_node(&ctx.sender),
                    key: NAME_KEY.to_string(),
                    value: Bytes::from(full_name.into_bytes()),
                };
                let node = reverse.claim_for_addr_with_resolver_data(
                    ledger.registry,
                    ledger.resolvers,
                    self.address,
                    ctx.sender,
                    ctx.sender,
                    request.resolver,
                    &[data.encode()?],
                )?;
                Some(node)
            }
            _ => None,
        };

        self.collected = self.collected.saturating_add(total);
        let refund = ctx.value - total;

        info!(
            "Registered {:?} for {:?} until {} (paid {}, refund {})",
            request.name, request.owner, expires, total, refund
        );
        self.events.push(ControllerEvent::NameRegistered {
            name: request.name.clone(),
            label,
            owner: request.owner,
            base_cost: price.base,
            premium: price.premium,
            expires,
        });

        Ok(RegistrationReceipt {
            label,
            node: registrar.node_of(&label),
            expires,
            price,
            refund,
            reverse_node,
        })
    }

    /// Extend a name; anyone may pay
    pub fn renew(
        &mut self,
        registrar: &mut Registrar,
        ctx: &TxContext,
        name: &str,
        duration: u64,
    ) -> Result<RenewalReceipt> {
        let label = self.hasher.label_hash(name);
        let cost = self.rent_price(registrar, name, duration).base;
        if ctx.value < cost {
            return Err(CoreError::InsufficientValue {
                required: cost,
                provided: ctx.value,
            });
        }

        let expires = registrar.renew(&ctx.as_caller(self.address), label, duration)?;
        self.collected = self.collected.saturating_add(cost);
        let refund = ctx.value - cost;

        debug!("Renewed {:?} until {} (paid {})", name, expires, cost);
        self.events.push(ControllerEvent::NameRenewed {
            name: name.to_string(),
            label,
            cost,
            expires,
        });

        Ok(RenewalReceipt {
            label,
            expires,
            cost,
            refund,
        })
    }

    /// Sweep collected payments to the owner
    pub fn withdraw(&mut self, ctx: &TxContext) -> Result<u128> {
        self.only_owner(&ctx.sender)?;
        let amount = std::mem::take(&mut self.collected);
        info!("Withdrew {} to {:?}", amount, self.owner);
        self.events.push(ControllerEvent::Withdrawn {
            to: self.owner,
            amount,
        });
        Ok(amount)
    }

    /// Replace the price oracle
    pub fn set_price_oracle(&mut self, ctx: &TxContext, oracle: Arc<dyn PriceOracle>) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        self.oracle = oracle;
        info!("Price oracle replaced");
        self.events.push(ControllerEvent::PriceOracleChanged);
        Ok(())
    }

    /// Change the commitment age window
    pub fn set_commitment_ages(&mut self, ctx: &TxContext, min: u64, max: u64) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        if min >= max {
            return Err(CoreError::InvalidCommitmentAges { min, max });
        }
        self.min_commitment_age = min;
        self.max_commitment_age = max;
        info!("Commitment ages set to [{}, {}]", min, max);
        self.events.push(ControllerEvent::CommitmentAgesChanged { min, max });
        Ok(())
    }

    /// Collect raised events
    pub fn take_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_duration(&self, duration: u64) -> Result<()> {
        if duration < self.min_registration_duration {
            return Err(CoreError::DurationTooShort {
                duration,
                min: self.min_registration_duration,
            });
        }
        if duration >= self.max_registration_duration {
            return Err(CoreError::DurationTooLong {
                duration,
                max: self.max_registration_duration,
            });
        }
        Ok(())
    }

    fn only_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(CoreError::CallerIsNotOwner(*caller))
        }
    }
}
