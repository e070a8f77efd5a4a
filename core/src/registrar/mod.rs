//! Leasing registrar
//!
//! Issues time-limited ownership certificates for labels under a single
//! managed namespace (the base node) and mirrors every ownership change
//! into the registry.
//!
//! Each label moves through `Available -> Active -> Grace -> Available`.
//! Independently, a holder can burn an Active or Grace certificate in two
//! steps: the first `unregister` records a pending marker, the second one
//! (after the cool-down) destroys the certificate and restarts Grace.
//!
//! Destroying a certificate notifies the outgoing holder under a gas
//! ceiling. That notification is the only untrusted code the registrar
//! runs; it happens after all effects and its outcome is discarded.

mod certificate;
mod metadata;

pub use certificate::CertificateBook;
pub use metadata::{CertificateMetadata, NAME_LABEL_KEY};

use std::collections::{HashMap, HashSet};
use bytes::Bytes;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountDirectory, CertificateNotice, NotificationOutcome};
use crate::config::RegistrarConfig;
use crate::crypto::verify_hash;
use crate::error::{CoreError, Result};
use crate::events::RegistrarEvent;
use crate::namehash::NameHasher;
use crate::registry::Registry;
use crate::resolver::{ResolverCall, ResolverDirectory};
use crate::types::{Address, LabelHash, NodeId, Timestamp, TxContext};

/// Collaborators the registrar writes through during one transaction
pub struct Ledger<'a> {
    /// Namespace registry
    pub registry: &'a mut Registry,

    /// Installed resolvers
    pub resolvers: &'a mut ResolverDirectory,

    /// Holder hooks
    pub accounts: &'a AccountDirectory,
}

/// Lifecycle phase of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameStatus {
    /// Registrable
    Available,

    /// Held and resolvable
    Active,

    /// Expired but reserved for the previous holder
    Grace,
}

/// Result of an `unregister` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterStep {
    /// Pending marker recorded; the burn may complete at `ready_at`
    Requested { ready_at: Timestamp },

    /// Certificate destroyed
    Burned { holder: Address },
}

/// The leasing registrar
#[derive(Debug, Clone)]
pub struct Registrar {
    /// Identity the registrar acts as in the registry
    address: Address,

    /// Administrator
    owner: Address,

    /// Label derivation, shared with the registry
    hasher: NameHasher,

    /// Managed namespace label, e.g. "id"
    base_name: String,

    /// Identifier of the managed namespace
    base_node: NodeId,

    /// Identities allowed to register and renew
    controllers: HashSet<Address>,

    /// Issued certificates
    book: CertificateBook,

    /// label -> expiry; absent means never registered
    expiries: HashMap<LabelHash, Timestamp>,

    /// label -> time of the first unregister call
    pending_unregister: HashMap<LabelHash, Timestamp>,

    /// Seconds a label stays reserved after expiry
    grace_period: u64,

    /// Seconds between the two unregister calls
    unregister_cooldown: u64,

    /// Gas ceiling for burn notifications and controlling-owner queries
    max_burn_gas: u64,

    /// Identity allowed to write arbitrary metadata
    descriptor_setter: Address,

    /// Certificate metadata
    metadata: CertificateMetadata,

    /// Raised and not yet collected events
    events: Vec<RegistrarEvent>,
}

impl Registrar {
    /// Create a registrar for `config.base_name` under the root
    pub fn new(address: Address, owner: Address, hasher: NameHasher, config: &RegistrarConfig) -> Self {
        let base_node = hasher.namehash(&config.base_name);
        info!("Registrar {:?} managing {:?} ({})", address, config.base_name, base_node);

        Registrar {
            address,
            owner,
            hasher,
            base_name: config.base_name.clone(),
            base_node,
            controllers: HashSet::new(),
            book: CertificateBook::new(),
            expiries: HashMap::new(),
            pending_unregister: HashMap::new(),
            grace_period: config.grace_period.as_secs(),
            unregister_cooldown: config.unregister_cooldown.as_secs(),
            max_burn_gas: config.max_burn_gas,
            descriptor_setter: owner,
            metadata: CertificateMetadata::new(),
            events: Vec::new(),
        }
    }

    /// Identity of the registrar
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Managed namespace label
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Identifier of the managed namespace
    pub fn base_node(&self) -> NodeId {
        self.base_node
    }

    /// Registry identifier of `label` under the managed namespace
    pub fn node_of(&self, label: &LabelHash) -> NodeId {
        self.hasher.child_node(&self.base_node, label)
    }

    /// Whether the registrar still owns its base node
    pub fn is_live(&self, registry: &Registry) -> bool {
        registry.owner(&self.base_node) == self.address
    }

    /// Whether `controller` may register and renew
    pub fn is_controller(&self, controller: &Address) -> bool {
        self.controllers.contains(controller)
    }

    /// Current gas ceiling for holder notifications
    pub fn max_burn_gas(&self) -> u64 {
        self.max_burn_gas
    }

    /// Grace window in seconds
    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    /// Expiry of `label`; zero if never registered
    pub fn name_expires(&self, label: &LabelHash) -> Timestamp {
        self.expiries.get(label).copied().unwrap_or(0)
    }

    /// Whether `label` can be registered at `now`
    pub fn is_available(&self, label: &LabelHash, now: Timestamp) -> bool {
        match self.expiries.get(label) {
            Some(expiry) => now >= expiry.saturating_add(self.grace_period),
            None => true,
        }
    }

    /// Lifecycle phase of `label` at `now`
    pub fn status(&self, label: &LabelHash, now: Timestamp) -> NameStatus {
        if self.is_available(label, now) {
            NameStatus::Available
        } else if now < self.name_expires(label) {
            NameStatus::Active
        } else {
            NameStatus::Grace
        }
    }

    /// Time of the first unregister call, if one is pending
    pub fn pending_unregister_at(&self, label: &LabelHash) -> Option<Timestamp> {
        self.pending_unregister.get(label).copied()
    }

    /// Issue a certificate for `label` to `owner` for `duration` seconds
    ///
    /// Writes the registry sub-record and, when `keys` and `values` are
    /// non-empty and pair up, forwards them to `resolver`. Returns the
    /// expiry.
    #[allow(clippy::too_many_arguments)]
    pub fn register(
        &mut self,
        ledger: &mut Ledger<'_>,
        ctx: &TxContext,
        label: LabelHash,
        owner: Address,
        owner_data: Bytes,
        resolver: Address,
        keys: &[String],
        values: &[Bytes],
        duration: u64,
    ) -> Result<Timestamp> {
        self.only_controller(&ctx.sender)?;
        self.ensure_live(ledger.registry)?;
        if !self.is_available(&label, ctx.now) {
            return Err(CoreError::NameNotAvailable(label));
        }
        if owner.is_zero() {
            return Err(CoreError::TransferToNullIdentity(label));
        }
        let expires = ctx
            .now
            .checked_add(duration)
            .filter(|e| e.checked_add(self.grace_period).is_some())
            .ok_or(CoreError::DurationOverflow(label))?;

        self.pending_unregister.remove(&label);
        self.expiries.insert(label, expires);
        // A lapsed certificate may still be held; replace it
        self.destroy(ledger.accounts, ctx, label);
        self.book.mint(label, owner);

        let data = if !keys.is_empty() && keys.len() == values.len() {
            let call = ResolverCall::SetDataBatch {
                node: self.node_of(&label),
                keys: keys.to_vec(),
                values: values.to_vec(),
            };
            vec![call.encode()?]
        } else {
            if keys.len() != values.len() {
                debug!(
                    "Skipping resolver data for {}: {} keys, {} values",
                    label,
                    keys.len(),
                    values.len()
                );
            }
            Vec::new()
        };

        ledger.registry.set_sub_record_with_resolver_data(
            ledger.resolvers,
            self.address,
            self.base_node,
            label,
            owner,
            resolver,
            0,
            &data,
        )?;

        let notice = CertificateNotice {
            registrar: self.address,
            operator: ctx.sender,
            from: Address::zero(),
            label,
            data: owner_data,
        };
        ledger.accounts.offer(owner, &notice)?;

        info!("Registered {} to {:?} until {}", label, owner, expires);
        self.events.push(RegistrarEvent::NameRegistered { label, owner, expires });
        Ok(expires)
    }

    /// Extend the expiry of an Active or Grace certificate by `duration`
    ///
    /// A burned label sits in Grace with no holder. Renewing it would
    /// reserve the label for nobody, so it is refused like a released one.
    pub fn renew(&mut self, ctx: &TxContext, label: LabelHash, duration: u64) -> Result<Timestamp> {
        self.only_controller(&ctx.sender)?;
        if self.is_available(&label, ctx.now) || self.book.holder_of(&label).is_none() {
            return Err(CoreError::RenewalPeriodEnded(label));
        }

        let expires = self
            .name_expires(&label)
            .checked_add(duration)
            .filter(|e| e.checked_add(self.grace_period).is_some())
            .ok_or(CoreError::DurationOverflow(label))?;
        self.expiries.insert(label, expires);

        debug!("Renewed {} until {}", label, expires);
        self.events.push(RegistrarEvent::NameRenewed { label, expires });
        Ok(expires)
    }

    /// Two-step burn of a held certificate
    ///
    /// The caller must be the holder, its approved spender or operator, or
    /// the identity the holder's hooks report as controlling it.
    pub fn unregister(
        &mut self,
        accounts: &AccountDirectory,
        ctx: &TxContext,
        label: LabelHash,
    ) -> Result<UnregisterStep> {
        let holder = self.book.holder_of(&label).ok_or(CoreError::NameExpired(label))?;
        if self.is_available(&label, ctx.now) {
            return Err(CoreError::NameExpired(label));
        }
        if !self.book.is_approved_or_holder(&label, &ctx.sender)
            && accounts.controlling_owner(holder, self.max_burn_gas) != Some(ctx.sender)
        {
            return Err(CoreError::NotApprovedOrHolder {
                label,
                caller: ctx.sender,
            });
        }

        let Some(pending_at) = self.pending_unregister.get(&label).copied() else {
            self.pending_unregister.insert(label, ctx.now);
            let ready_at = ctx.now.saturating_add(self.unregister_cooldown);
            info!("Unregister of {} requested by {:?}, ready at {}", label, ctx.sender, ready_at);
            self.events.push(RegistrarEvent::UnregisterRequested { label, at: ctx.now });
            return Ok(UnregisterStep::Requested { ready_at });
        };

        let ready_at = pending_at.saturating_add(self.unregister_cooldown);
        if ctx.now < ready_at {
            return Err(CoreError::CannotUnregisterYet { label, ready_at });
        }

        self.pending_unregister.remove(&label);
        self.expiries.insert(label, ctx.now);
        self.destroy(accounts, ctx, label);

        info!("Burned {} held by {:?}", label, holder);
        self.events.push(RegistrarEvent::NameBurned { label, holder, at: ctx.now });
        Ok(UnregisterStep::Burned { holder })
    }

    /// Holder of an unexpired certificate
    pub fn owner_of(&self, label: &LabelHash, now: Timestamp) -> Result<Address> {
        let holder = self.book.holder_of(label).ok_or(CoreError::NameExpired(*label))?;
        if now >= self.name_expires(label) {
            return Err(CoreError::NameExpired(*label));
        }
        Ok(holder)
    }

    /// Move a certificate and the registry ownership with it
    pub fn transfer_from(
        &mut self,
        registry: &mut Registry,
        ctx: &TxContext,
        from: Address,
        to: Address,
        label: LabelHash,
    ) -> Result<()> {
        let holder = self.owner_of(&label, ctx.now)?;
        if !self.book.is_approved_or_holder(&label, &ctx.sender) {
            return Err(CoreError::NotApprovedOrHolder {
                label,
                caller: ctx.sender,
            });
        }
        if holder != from {
            return Err(CoreError::TransferFromIncorrectHolder { label, from });
        }
        if to.is_zero() {
            return Err(CoreError::TransferToNullIdentity(label));
        }

        self.book.move_to(label, to);
        self.pending_unregister.remove(&label);
        registry.set_subnode_owner(self.address, self.base_node, label, to)?;

        debug!("Transferred {} from {:?} to {:?}", label, from, to);
        self.events.push(RegistrarEvent::Transfer { label, from, to });
        Ok(())
    }

    /// `transfer_from`, then offer the certificate to the recipient's hooks
    pub fn safe_transfer_from(
        &mut self,
        ledger: &mut Ledger<'_>,
        ctx: &TxContext,
        from: Address,
        to: Address,
        label: LabelHash,
        data: Bytes,
    ) -> Result<()> {
        self.transfer_from(ledger.registry, ctx, from, to, label)?;
        let notice = CertificateNotice {
            registrar: self.address,
            operator: ctx.sender,
            from,
            label,
            data,
        };
        ledger.accounts.offer(to, &notice)
    }

    /// Approve `spender` (null clears) for one certificate
    pub fn approve(&mut self, ctx: &TxContext, spender: Address, label: LabelHash) -> Result<()> {
        let holder = self.owner_of(&label, ctx.now)?;
        if ctx.sender != holder && !self.book.is_operator(&holder, &ctx.sender) {
            return Err(CoreError::NotApprovedOrHolder {
                label,
                caller: ctx.sender,
            });
        }
        self.book.approve(label, spender);
        self.events.push(RegistrarEvent::Approval {
            label,
            holder,
            approved: spender,
        });
        Ok(())
    }

    /// Approved spender of an unexpired certificate
    pub fn get_approved(&self, label: &LabelHash, now: Timestamp) -> Result<Address> {
        self.owner_of(label, now)?;
        Ok(self.book.approved(label))
    }

    /// Toggle `operator` for all of the caller's certificates
    pub fn set_approval_for_all(&mut self, ctx: &TxContext, operator: Address, approved: bool) {
        self.book.set_operator(ctx.sender, operator, approved);
        self.events.push(RegistrarEvent::ApprovalForAll {
            holder: ctx.sender,
            operator,
            approved,
        });
    }

    /// Whether `operator` acts for `holder`
    pub fn is_approved_for_all(&self, holder: &Address, operator: &Address) -> bool {
        self.book.is_operator(holder, operator)
    }

    /// Number of certificates held, expired ones included
    pub fn balance_of(&self, holder: &Address) -> usize {
        self.book.balance_of(holder)
    }

    /// Labels of the certificates held
    pub fn certificates_of(&self, holder: &Address) -> Vec<LabelHash> {
        self.book.labels_of(holder)
    }

    /// Point the registry owner of `label` at `owner` without moving the
    /// certificate
    pub fn reclaim(
        &mut self,
        registry: &mut Registry,
        ctx: &TxContext,
        label: LabelHash,
        owner: Address,
    ) -> Result<()> {
        self.ensure_live(registry)?;
        self.owner_of(&label, ctx.now)?;
        if !self.book.is_approved_or_holder(&label, &ctx.sender) {
            return Err(CoreError::NotApprovedOrHolder {
                label,
                caller: ctx.sender,
            });
        }
        registry.set_subnode_owner(self.address, self.base_node, label, owner)?;
        Ok(())
    }

    /// Allow `controller` to register and renew
    pub fn add_controller(&mut self, ctx: &TxContext, controller: Address) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        self.controllers.insert(controller);
        info!("Controller {:?} added", controller);
        self.events.push(RegistrarEvent::ControllerAdded { controller });
        Ok(())
    }

    /// Revoke `controller`
    pub fn remove_controller(&mut self, ctx: &TxContext, controller: Address) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        self.controllers.remove(&controller);
        info!("Controller {:?} removed", controller);
        self.events.push(RegistrarEvent::ControllerRemoved { controller });
        Ok(())
    }

    /// Set the resolver of the base node
    pub fn set_base_resolver(&mut self, registry: &mut Registry, ctx: &TxContext, resolver: Address) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        registry.set_resolver(self.address, self.base_node, resolver)
    }

    /// Set the gas ceiling for holder notifications
    pub fn set_max_burn_gas(&mut self, ctx: &TxContext, value: u64) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        self.max_burn_gas = value;
        info!("Max burn gas set to {}", value);
        self.events.push(RegistrarEvent::MaxBurnGasChanged { value });
        Ok(())
    }

    /// Set the identity allowed to write metadata
    pub fn set_descriptor_setter(&mut self, ctx: &TxContext, setter: Address) -> Result<()> {
        self.only_owner(&ctx.sender)?;
        self.descriptor_setter = setter;
        self.events.push(RegistrarEvent::DescriptorSetterChanged { setter });
        Ok(())
    }

    /// Write a metadata entry
    ///
    /// The `name-label` entry is self-certifying and open to anyone: the
    /// value must hash to `label`. Other keys need the descriptor setter.
    pub fn set_metadata(&mut self, ctx: &TxContext, label: LabelHash, key: &str, value: &str) -> Result<()> {
        if key == NAME_LABEL_KEY {
            if !verify_hash(&self.hasher.label_hash(value).0, &label.0) {
                return Err(CoreError::LabelHashIsNotValid(label));
            }
        } else if ctx.sender != self.descriptor_setter {
            return Err(CoreError::NotDescriptorSetter(self.descriptor_setter));
        }

        self.metadata.set(label, key, value);
        self.events.push(RegistrarEvent::MetadataChanged {
            label,
            key: key.to_string(),
        });
        Ok(())
    }

    /// Read a metadata entry
    pub fn metadata(&self, label: &LabelHash, key: &str) -> Option<&str> {
        self.metadata.get(label, key)
    }

    /// Human-readable descriptor of a certificate
    pub fn descriptor(&self, label: &LabelHash) -> String {
        self.metadata.descriptor(label, &self.base_name)
    }

    /// Collect raised events
    pub fn take_events(&mut self) -> Vec<RegistrarEvent> {
        std::mem::take(&mut self.events)
    }

    /// Remove the certificate, then tell the former holder under the gas
    /// ceiling. Nothing the holder does can affect the outcome.
    fn destroy(&mut self, accounts: &AccountDirectory, ctx: &TxContext, label: LabelHash) -> NotificationOutcome {
        let Some(holder) = self.book.burn(&label) else {
            return NotificationOutcome::NoHooks;
        };

        let notice = CertificateNotice {
            registrar: self.address,
            operator: ctx.sender,
            from: holder,
            label,
            data: Bytes::new(),
        };
        accounts.notify_burned(holder, &notice, self.max_burn_gas)
    }

    fn only_controller(&self, caller: &Address) -> Result<()> {
        if self.controllers.contains(caller) {
            Ok(())
        } else {
            Err(CoreError::CallerIsNotController(*caller))
        }
    }

    fn only_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(CoreError::CallerIsNotOwner(*caller))
        }
    }

    fn ensure_live(&self, registry: &Registry) -> Result<()> {
        if self.is_live(registry) {
            Ok(())
        } else {
            Err(CoreError::RegistrarNotLive(self.base_node))
        }
    }
}
