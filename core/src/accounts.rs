//! Holder hooks and resource-bounded notification
//!
//! An identity may advertise hooks: code that runs when it receives or
//! loses a certificate, and an introspective query naming the identity
//! that controls it. Hooks are untrusted. They receive no handle to ledger
//! state and are metered by a [`GasMeter`]; destruction notifications run
//! under a hard ceiling with every failure caught and discarded.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use bytes::Bytes;
use log::{debug, warn};

use crate::error::{CoreError, Result};
use crate::types::{Address, LabelHash};

/// Execution budget handed to a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Meter with a hard ceiling
    pub fn new(limit: u64) -> Self {
        GasMeter { limit, used: 0 }
    }

    /// Meter for calls whose failure aborts the caller anyway
    pub fn unbounded() -> Self {
        GasMeter::new(u64::MAX)
    }

    /// Consume `units`; fails once the ceiling would be crossed
    pub fn charge(&mut self, units: u64) -> std::result::Result<(), HookError> {
        let next = self.used.saturating_add(units);
        if next > self.limit {
            self.used = self.limit;
            return Err(HookError::OutOfGas { limit: self.limit });
        }
        self.used = next;
        Ok(())
    }

    /// Units consumed so far
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Units left
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

/// Failure raised by a hook
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// Gas ceiling reached
    #[error("Out of gas (limit {limit})")]
    OutOfGas { limit: u64 },

    /// Hook refused the operation
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Hook panicked
    #[error("Hook panicked: {0}")]
    Panicked(String),
}

/// What a hook is told about a certificate movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateNotice {
    /// Registrar issuing the certificate
    pub registrar: Address,

    /// Identity that initiated the movement
    pub operator: Address,

    /// Previous holder (null on issuance)
    pub from: Address,

    /// Certificate label
    pub label: LabelHash,

    /// Opaque data supplied by the initiator
    pub data: Bytes,
}

/// Code attached to an identity
pub trait HolderHooks: Debug + Send + Sync {
    /// Called after a certificate was moved to this identity. An error
    /// aborts the movement.
    fn on_certificate_received(
        &self,
        _notice: &CertificateNotice,
        _meter: &mut GasMeter,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }

    /// Called after a certificate held by this identity was destroyed.
    /// The outcome is ignored.
    fn on_certificate_burned(
        &self,
        _notice: &CertificateNotice,
        _meter: &mut GasMeter,
    ) -> std::result::Result<(), HookError> {
        Ok(())
    }

    /// Identity that controls this one, if it reports one
    fn controlling_owner(&self, _meter: &mut GasMeter) -> std::result::Result<Option<Address>, HookError> {
        Ok(None)
    }
}

/// Result of a bounded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Identity has no hooks
    NoHooks,

    /// Hook returned normally
    Delivered { gas_used: u64 },

    /// Hook failed, panicked or ran out of gas; discarded
    Discarded(HookError),
}

/// Hooks registered per identity
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    hooks: HashMap<Address, Arc<dyn HolderHooks>>,
}

impl AccountDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach hooks to an identity
    pub fn attach(&mut self, identity: Address, hooks: Arc<dyn HolderHooks>) {
        self.hooks.insert(identity, hooks);
    }

    /// Detach hooks from an identity
    pub fn detach(&mut self, identity: &Address) -> Option<Arc<dyn HolderHooks>> {
        self.hooks.remove(identity)
    }

    /// Whether an identity advertises hooks
    pub fn has_hooks(&self, identity: &Address) -> bool {
        self.hooks.contains_key(identity)
    }

    /// Offer a certificate to its new holder; refusal is an error
    pub fn offer(&self, receiver: Address, notice: &CertificateNotice) -> Result<()> {
        let Some(hooks) = self.hooks.get(&receiver) else {
            return Ok(());
        };

        run_guarded(GasMeter::unbounded(), |meter| hooks.on_certificate_received(notice, meter))
            .map(|_| ())
            .map_err(|e| CoreError::ReceiverRejected {
                receiver,
                reason: e.to_string(),
            })
    }

    /// Tell a former holder its certificate is gone, within `gas_limit`
    ///
    /// Never fails: whatever the hook does is contained here.
    pub fn notify_burned(
        &self,
        holder: Address,
        notice: &CertificateNotice,
        gas_limit: u64,
    ) -> NotificationOutcome {
        let Some(hooks) = self.hooks.get(&holder) else {
            return NotificationOutcome::NoHooks;
        };

        match run_guarded(GasMeter::new(gas_limit), |meter| hooks.on_certificate_burned(notice, meter)) {
            Ok(((), gas_used)) => {
                debug!("Burn notification delivered to {:?} ({} gas)", holder, gas_used);
                NotificationOutcome::Delivered { gas_used }
            }
            Err(e) => {
                warn!("Burn notification to {:?} discarded: {}", holder, e);
                NotificationOutcome::Discarded(e)
            }
        }
    }

    /// Best-effort query of the identity controlling `holder`
    pub fn controlling_owner(&self, holder: Address, gas_limit: u64) -> Option<Address> {
        let hooks = self.hooks.get(&holder)?;
        match run_guarded(GasMeter::new(gas_limit), |meter| hooks.controlling_owner(meter)) {
            Ok((owner, _)) => owner,
            Err(e) => {
                debug!("Controlling owner query on {:?} failed: {}", holder, e);
                None
            }
        }
    }
}

/// Run untrusted hook code under a meter, converting panics to errors
fn run_guarded<T, F>(mut meter: GasMeter, f: F) -> std::result::Result<(T, u64), HookError>
where
    F: FnOnce(&mut GasMeter) -> std::result::Result<T, HookError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut meter))) {
        Ok(Ok(value)) => Ok((value, meter.used())),
        Ok(Err(e)) => Err(e),
        Err(payload) => Err(HookError::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    struct Greedy;

    impl HolderHooks for Greedy {
        fn on_certificate_burned(
            &self,
            _notice: &CertificateNotice,
            meter: &mut GasMeter,
        ) -> std::result::Result<(), HookError> {
            loop {
                meter.charge(1_000)?;
            }
        }
    }

    #[derive(Debug, Default)]
    struct Panicky;

    impl HolderHooks for Panicky {
        fn on_certificate_burned(
            &self,
            _notice: &CertificateNotice,
            _meter: &mut GasMeter,
        ) -> std::result::Result<(), HookError> {
            panic!("refusing to let go")
        }

        fn controlling_owner(&self, _meter: &mut GasMeter) -> std::result::Result<Option<Address>, HookError> {
            panic!("no owner")
        }
    }

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicU64,
    }

    impl HolderHooks for Counting {
        fn on_certificate_burned(
            &self,
            _notice: &CertificateNotice,
            meter: &mut GasMeter,
        ) -> std::result::Result<(), HookError> {
            meter.charge(10)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn controlling_owner(&self, _meter: &mut GasMeter) -> std::result::Result<Option<Address>, HookError> {
            Ok(Some(Address::from([9; 20])))
        }
    }

    fn notice() -> CertificateNotice {
        CertificateNotice {
            registrar: Address::from([1; 20]),
            operator: Address::from([1; 20]),
            from: Address::from([2; 20]),
            label: LabelHash([3; 32]),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_gas_meter() {
        let mut meter = GasMeter::new(100);
        meter.charge(60).unwrap();
        assert_eq!(meter.remaining(), 40);
        assert_eq!(meter.charge(41), Err(HookError::OutOfGas { limit: 100 }));
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_greedy_hook_is_capped() {
        let mut accounts = AccountDirectory::new();
        let holder = Address::from([2; 20]);
        accounts.attach(holder, Arc::new(Greedy));

        let outcome = accounts.notify_burned(holder, &notice(), 50_000);
        assert_eq!(outcome, NotificationOutcome::Discarded(HookError::OutOfGas { limit: 50_000 }));
    }

    #[test]
    fn test_panicking_hook_is_contained() {
        let mut accounts = AccountDirectory::new();
        let holder = Address::from([2; 20]);
        accounts.attach(holder, Arc::new(Panicky));

        let outcome = accounts.notify_burned(holder, &notice(), 50_000);
        assert!(matches!(outcome, NotificationOutcome::Discarded(HookError::Panicked(_))));
        assert_eq!(accounts.controlling_owner(holder, 50_000), None);
    }

    #[test]
    fn test_well_behaved_hook() {
        let mut accounts = AccountDirectory::new();
        let holder = Address::from([2; 20]);
        let hooks = Arc::new(Counting::default());
        accounts.attach(holder, hooks.clone());

        let outcome = accounts.notify_burned(holder, &notice(), 50_000);
        assert_eq!(outcome, NotificationOutcome::Delivered { gas_used: 10 });
        assert_eq!(hooks.calls.load(Ordering::SeqCst), 1);
        assert_eq!(accounts.controlling_owner(holder, 50_000), Some(Address::from([9; 20])));

        assert_eq!(
            accounts.notify_burned(Address::from([5; 20]), &notice(), 50_000),
            NotificationOutcome::NoHooks
        );
    }
}
