//! Configuration providers for the supervisor
//!
//! The supervisor re-reads the helper description on every start attempt and
//! every poll cycle instead of caching it at construction time. That keeps a
//! long-lived supervisor honest when the host mutates the configuration at
//! runtime (for example switching the startup policy from `Never` to
//! `Automatic` after onboarding completes).

use schema::HelperSpec;
use std::sync::{Arc, RwLock};

/// Source of the current helper description
///
/// `snapshot` must be cheap: the poll loop calls it once per cycle.
pub trait ConfigProvider: Send + Sync {
    /// Return the helper description as of right now
    fn snapshot(&self) -> HelperSpec;
}

/// Provider backed by a value fixed at construction time
#[derive(Debug, Clone)]
pub struct FixedProvider {
    spec: HelperSpec,
}

impl FixedProvider {
    pub fn new(spec: HelperSpec) -> Self {
        Self { spec }
    }
}

impl ConfigProvider for FixedProvider {
    fn snapshot(&self) -> HelperSpec {
        self.spec.clone()
    }
}

/// Provider backed by shared mutable state
///
/// Clones share the same underlying spec, so a host can keep one clone for
/// runtime updates while the supervisor holds another.
#[derive(Debug, Clone)]
pub struct SharedProvider {
    inner: Arc<RwLock<HelperSpec>>,
}

impl SharedProvider {
    pub fn new(spec: HelperSpec) -> Self {
        Self {
            inner: Arc::new(RwLock::new(spec)),
        }
    }

    /// Mutate the spec in place
    pub fn update(&self, f: impl FnOnce(&mut HelperSpec)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    /// Replace the spec wholesale
    pub fn replace(&self, spec: HelperSpec) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = spec;
    }

    /// Current value of the spec
    pub fn spec(&self) -> HelperSpec {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ConfigProvider for SharedProvider {
    fn snapshot(&self) -> HelperSpec {
        self.spec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::StartupPolicy;

    #[test]
    fn fixed_provider_returns_construction_value() {
        let spec = HelperSpec {
            executable: "/bin/true".to_string(),
            args: vec!["-v".to_string()],
            startup_policy: StartupPolicy::Delayed,
        };
        let provider = FixedProvider::new(spec.clone());
        assert_eq!(provider.snapshot(), spec);
        assert_eq!(provider.snapshot(), spec);
    }

    #[test]
    fn shared_provider_reflects_updates() {
        let provider = SharedProvider::new(HelperSpec::default());
        assert_eq!(provider.snapshot().executable, "");

        provider.update(|spec| {
            spec.executable = "/bin/sleep".to_string();
            spec.startup_policy = StartupPolicy::Never;
        });
        let snap = provider.snapshot();
        assert_eq!(snap.executable, "/bin/sleep");
        assert_eq!(snap.startup_policy, StartupPolicy::Never);
    }

    #[test]
    fn shared_provider_clones_share_state() {
        let provider = SharedProvider::new(HelperSpec::default());
        let other = provider.clone();

        provider.replace(HelperSpec {
            executable: "/bin/echo".to_string(),
            args: vec![],
            startup_policy: StartupPolicy::Automatic,
        });
        assert_eq!(other.snapshot().executable, "/bin/echo");
    }

    #[test]
    fn trait_object_snapshot_works() {
        let provider: Arc<dyn ConfigProvider> =
            Arc::new(FixedProvider::new(HelperSpec::default()));
        assert_eq!(provider.snapshot(), HelperSpec::default());
    }
}
