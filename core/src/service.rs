//! Transactional name service
//!
//! [`NameService`] serializes every state-changing call behind a lock,
//! stamps it with the shared clock and executes it against a copy of the
//! state. The copy replaces the live state only when the call succeeds, so
//! a failed call leaves nothing behind: not its writes, not its events.

use std::sync::{Arc, RwLock};
use bytes::Bytes;
use log::debug;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::controller::{PriceOracle, RegistrationReceipt, RegistrationRequest, RenewalReceipt};
use crate::error::{CoreError, Result};
use crate::events::EventRecord;
use crate::registrar::UnregisterStep;
use crate::state::{Deployment, NamingState};
use crate::types::{Address, LabelHash, Timestamp, TxContext};
use crate::utils::{Clock, Settlement, TxTimer};

/// Serialized, all-or-nothing access to a [`NamingState`]
#[derive(Debug)]
pub struct NameService {
    /// Live state
    state: RwLock<NamingState>,

    /// Events of committed transactions, in commit order
    events: RwLock<Vec<EventRecord>>,

    /// Ledger clock
    clock: Arc<dyn Clock>,

    /// Configuration
    config: CoreConfig,
}

impl NameService {
    /// Wrap an existing state
    pub fn new(state: NamingState, clock: Arc<dyn Clock>, config: CoreConfig) -> Self {
        NameService {
            state: RwLock::new(state),
            events: RwLock::new(Vec::new()),
            clock,
            config,
        }
    }

    /// Deploy fresh components
    pub fn bootstrap(
        config: CoreConfig,
        deployment: Deployment,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let state = NamingState::bootstrap(&config, deployment, oracle)?;
        Ok(Self::new(state, clock, config))
    }

    /// Configuration in use
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Current ledger time
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Run `f` as one atomic transaction of `sender` paying `value`
    ///
    /// The draft is a full clone of the state, installed resolvers
    /// included. Commitments older than the maximum age are pruned on every
    /// commit so the clone does not carry them forever.
    pub fn transact<T, F>(&self, sender: Address, value: u128, f: F) -> Result<T>
    where
        F: FnOnce(&mut NamingState, &TxContext) -> Result<T>,
    {
        let id = Uuid::new_v4();
        let timer = TxTimer::start(id, sender);

        let mut live = self
            .state
            .write()
            .map_err(|e| CoreError::StateError(format!("Failed to lock state: {}", e)))?;
        let ctx = TxContext::new(sender, self.clock.now()).with_value(value);

        let mut draft = live.clone();
        let result = f(&mut draft, &ctx);

        match result {
            Ok(output) => {
                let raised = draft.take_events();
                *live = draft;
                drop(live);

                let mut log = self
                    .events
                    .write()
                    .map_err(|e| CoreError::StateError(format!("Failed to lock event log: {}", e)))?;
                log.extend(raised.into_iter().map(|event| EventRecord {
                    transaction: id,
                    at: ctx.now,
                    event,
                }));

                timer.settle(Settlement::Committed);
                Ok(output)
            }
            Err(e) => {
                debug!("tx {} rolled back: {}", id, e);
                timer.settle(Settlement::RolledBack);
                Err(e)
            }
        }
    }

    /// Read the live state at the current time
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&NamingState, Timestamp) -> T,
    {
        let state = self
            .state
            .read()
            .map_err(|e| CoreError::StateError(format!("Failed to read state: {}", e)))?;
        Ok(f(&state, self.clock.now()))
    }

    /// Number of committed events
    pub fn event_count(&self) -> Result<usize> {
        let log = self
            .events
            .read()
            .map_err(|e| CoreError::StateError(format!("Failed to read event log: {}", e)))?;
        Ok(log.len())
    }

    /// Committed events from position `from` on
    pub fn events_since(&self, from: usize) -> Result<Vec<EventRecord>> {
        let log = self
            .events
            .read()
            .map_err(|e| CoreError::StateError(format!("Failed to read event log: {}", e)))?;
        Ok(log.get(from..).map(<[EventRecord]>::to_vec).unwrap_or_default())
    }

    /// Every committed event so far
    pub fn events(&self) -> Result<Vec<EventRecord>> {
        let log = self
            .events
            .read()
            .map_err(|e| CoreError::StateError(format!("Failed to read event log: {}", e)))?;
        Ok(log.clone())
    }

    /// Publish a commitment
    pub fn commit(&self, sender: Address, commitment: [u8; 32]) -> Result<()> {
        self.transact(sender, 0, |state, ctx| state.commit(ctx, commitment))
    }

    /// Reveal and register, paying `value`
    pub fn register(&self, sender: Address, value: u128, request: &RegistrationRequest) -> Result<RegistrationReceipt> {
        self.transact(sender, value, |state, ctx| state.register(ctx, request))
    }

    /// Renew `name`, paying `value`
    pub fn renew(&self, sender: Address, value: u128, name: &str, duration: u64) -> Result<RenewalReceipt> {
        self.transact(sender, value, |state, ctx| state.renew(ctx, name, duration))
    }

    /// One step of the two-step burn of `name`
    pub fn unregister(&self, sender: Address, name: &str) -> Result<UnregisterStep> {
        self.transact(sender, 0, |state, ctx| {
            let label = state.label_hash(name);
            state.unregister(ctx, label)
        })
    }

    /// Move the certificate of `name`
    pub fn transfer(&self, sender: Address, from: Address, to: Address, name: &str) -> Result<()> {
        self.transact(sender, 0, |state, ctx| {
            let label = state.label_hash(name);
            state.transfer_from(ctx, from, to, label)
        })
    }

    /// Whether `name` can be registered now
    pub fn available(&self, name: &str) -> Result<bool> {
        self.read(|state, now| state.available(name, now))
    }

    /// Holder of `name`; fails once expired
    pub fn owner_of(&self, name: &str) -> Result<Address> {
        self.read(|state, now| state.registrar().owner_of(&state.label_hash(name), now))?
    }

    /// Label hash under the configured algorithm
    pub fn label_hash(&self, name: &str) -> Result<LabelHash> {
        self.read(|state, _| state.label_hash(name))
    }

    /// Read `key` of a dotted name
    pub fn resolve(&self, name: &str, key: &str) -> Result<Option<Bytes>> {
        self.read(|state, _| state.resolve(name, key))
    }
}

/// Thread-safe name service
pub type SharedNameService = Arc<NameService>;

/// Create a new shared name service
pub fn create_name_service(
    config: CoreConfig,
    deployment: Deployment,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
) -> Result<SharedNameService> {
    let service = NameService::bootstrap(config, deployment, oracle, clock)?;
    Ok(Arc::new(service))
}
