//! Provider Registry (C6): a pure lookup from `ProviderKind` to an adapter
//! constructor and its static capability descriptor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{GatewayError, Result};
use crate::provider::Provider;
use crate::providers;
use crate::types::{Capabilities, ProviderKind, ServiceContext};

type Constructor = Box<dyn Fn(&ServiceContext) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Maps provider kinds to constructors and capability descriptors.
/// Built-ins are seeded at construction; [`Registry::register`] lets a
/// caller add (or override, for testing) an adapter at runtime.
pub struct Registry {
    constructors: Mutex<HashMap<ProviderKind, Constructor>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut constructors: HashMap<ProviderKind, Constructor> = HashMap::new();
        providers::register_builtins(&mut constructors);
        Self {
            constructors: Mutex::new(constructors),
        }
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.constructors.lock().expect("registry lock poisoned").keys().copied().collect()
    }

    pub fn is_supported(&self, kind: ProviderKind) -> bool {
        self.constructors.lock().expect("registry lock poisoned").contains_key(&kind)
    }

    pub fn capabilities(&self, kind: ProviderKind) -> Option<Capabilities> {
        providers::capabilities_for(kind)
    }

    pub fn all_capabilities(&self) -> Vec<(ProviderKind, Capabilities)> {
        self.kinds()
            .into_iter()
            .filter_map(|k| self.capabilities(k).map(|c| (k, c)))
            .collect()
    }

    pub fn construct(&self, ctx: &ServiceContext) -> Result<Arc<dyn Provider>> {
        let guard = self.constructors.lock().expect("registry lock poisoned");
        let ctor = guard
            .get(&ctx.kind)
            .ok_or_else(|| GatewayError::unsupported(&format!("provider kind {}", ctx.kind)))?;
        ctor(ctx)
    }

    /// Compile-time extensibility hook: registers an additional (or
    /// replacement) constructor for `kind`.
    pub fn register<F>(&self, kind: ProviderKind, ctor: F)
    where
        F: Fn(&ServiceContext) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.constructors
            .lock()
            .expect("registry lock poisoned")
            .insert(kind, Box::new(ctor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_thirteen_kinds_registered() {
        let registry = Registry::new();
        assert_eq!(registry.kinds().len(), ProviderKind::ALL.len());
        for kind in ProviderKind::ALL {
            assert!(registry.is_supported(*kind), "{kind} missing from registry");
        }
    }

    #[test]
    fn every_kind_has_capabilities() {
        let registry = Registry::new();
        for kind in ProviderKind::ALL {
            assert!(registry.capabilities(*kind).is_some(), "{kind} missing capabilities");
        }
    }

    #[test]
    fn register_overrides_existing_constructor() {
        let registry = Registry::new();
        registry.register(ProviderKind::Aliyun, |_ctx| {
            Err(GatewayError::unsupported("test override"))
        });
        let ctx = ServiceContext::new(ProviderKind::Aliyun, Default::default());
        let result = registry.construct(&ctx);
        assert!(result.is_err());
    }
}
