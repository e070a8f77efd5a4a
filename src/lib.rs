/// Leased Names - a hierarchical name registry with time-boxed leases
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `leased-names-core`: Name hashing, registry, leasing registrar and commit-reveal controller
/// - `leased-names-periphery`: Resolver, reverse registrar, root administrator and price oracles

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
