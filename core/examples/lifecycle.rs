//! Walks one name through its whole lease on a simulated clock.
//!
//! Run with `RUST_LOG=debug` to see every component's log lines.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use leased_names_core::controller::{Price, PriceOracle};
use leased_names_core::utils::{init_logging, ManualClock};
use leased_names_core::{create_name_service, Address, CoreConfig, CoreError, Deployment, RegistrationRequest};

const DAY: u64 = 24 * 60 * 60;

/// Flat one unit per day
#[derive(Debug)]
struct PerDay;

impl PriceOracle for PerDay {
    fn price(&self, _name: &str, _expires: u64, duration: u64) -> Price {
        Price {
            base: u128::from(duration / DAY),
            premium: 0,
        }
    }
}

fn main() -> Result<()> {
    let config = CoreConfig::development();
    init_logging(&config.log_level);

    let clock = ManualClock::new(0);
    let admin = Address::from([1; 20]);
    let alice = Address::from([2; 20]);
    let bob = Address::from([3; 20]);
    let service = create_name_service(config, Deployment::new(admin), Arc::new(PerDay), Arc::new(clock.clone()))
        .context("bootstrapping name service")?;

    let request = RegistrationRequest::with_random_secret("alice", alice, 365 * DAY);
    let commitment = service.read(|state, _| state.controller().make_commitment_with_config(&request))??;
    service.commit(alice, commitment)?;
    clock.advance(70);

    let receipt = service.register(alice, 400, &request)?;
    println!("alice registered until {} (refund {})", receipt.expires, receipt.refund);

    clock.set(receipt.expires + 1);
    match service.owner_of("alice") {
        Err(CoreError::NameExpired(_)) => println!("alice expired, in grace: available = {}", service.available("alice")?),
        other => bail!("unexpected holder query result: {:?}", other),
    }

    clock.set(receipt.expires + 90 * DAY);
    let request = RegistrationRequest::with_random_secret("alice", bob, 365 * DAY);
    let commitment = service.read(|state, _| state.controller().make_commitment_with_config(&request))??;
    service.commit(bob, commitment)?;
    clock.advance(70);
    service.register(bob, 365, &request)?;
    println!("alice re-registered by {:?}", service.owner_of("alice")?);

    println!("{} events committed", service.events()?.len());
    Ok(())
}
