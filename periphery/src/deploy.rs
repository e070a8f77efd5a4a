//! Standard deployment
//!
//! Wires the core components together with the periphery ones: a versioned
//! public resolver, the reverse registrar on `addr.reverse`, and a root
//! administrator holding the registry root.

use std::sync::Arc;
use log::info;

use leased_names_core::controller::PriceOracle;
use leased_names_core::namehash::{ADDR_REVERSE_LABEL, REVERSE_TLD};
use leased_names_core::state::derive_identity;
use leased_names_core::{Address, CoreConfig, Deployment, NamingState, NodeId, TxContext};

use crate::error::Result;
use crate::resolver::VersionedResolver;
use crate::reverse::StandardReverseRegistrar;
use crate::root::RootAdmin;

/// A fully wired name service
#[derive(Debug)]
pub struct StandardDeployment {
    /// Core component identities
    pub core: Deployment,

    /// Handle of the public resolver
    pub public_resolver: Address,

    /// Identity of the reverse registrar
    pub reverse_registrar: Address,

    /// Naming state, ready for transactions
    pub state: NamingState,

    /// Root administrator, owning the registry root
    pub root: RootAdmin,
}

/// Deploy core and periphery components administered by `admin`
pub fn deploy_standard(config: &CoreConfig, admin: Address, oracle: Arc<dyn PriceOracle>) -> Result<StandardDeployment> {
    let core = Deployment::new(admin);
    let public_resolver = derive_identity("public-resolver");
    let reverse_registrar = derive_identity("reverse-registrar");
    let ctx = TxContext::new(admin, 0);

    let mut state = NamingState::bootstrap(config, core, oracle)?;
    state.install_resolver(public_resolver, Box::new(VersionedResolver::new([core.controller, reverse_registrar])));

    let hasher = *state.registry().hasher();
    let registry = state.registry_mut();
    let reverse_tld = registry.set_subnode_owner(admin, NodeId::ROOT, hasher.label_hash(REVERSE_TLD), admin)?;
    registry.set_subnode_owner(admin, reverse_tld, hasher.label_hash(ADDR_REVERSE_LABEL), reverse_registrar)?;

    let mut reverse = StandardReverseRegistrar::new(reverse_registrar, admin, public_resolver);
    reverse.set_controller(admin, core.controller, true)?;
    state.set_reverse_registrar(Box::new(reverse));
    state.set_base_resolver(&ctx, public_resolver)?;

    let mut root = RootAdmin::new(derive_identity("root"), admin);
    state.registry_mut().set_owner(admin, NodeId::ROOT, root.address())?;
    root.set_controller(admin, admin, true)?;
    root.lock(admin, hasher.label_hash(REVERSE_TLD))?;
    root.lock(admin, hasher.label_hash(&config.registrar.base_name))?;

    // Deployment is not a user transaction
    state.take_events();
    info!("Standard deployment ready, public resolver {:?}", public_resolver);

    Ok(StandardDeployment {
        core,
        public_resolver,
        reverse_registrar,
        state,
        root,
    })
}
