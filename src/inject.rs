//! # Parameter resolution.
//!
//! Handlers and providers declare the parameter names they want; the
//! resolver assembles those values from a per-bot [`Providers`] registry
//! and the payload of the event being handled.
//!
//! ## Resolution order (per name)
//! 1. Already resolved in this request's scope (memoized).
//! 2. A registered provider, whose own declared parameters resolve
//!    recursively first, then it runs. A provider **shadows** a payload key
//!    of the same name.
//! 3. The payload (seed).
//!
//! Unresolvable names and provider cycles are programmer errors
//! ([`BotError::Invalid`]). Providers are synchronous value producers;
//! anything that needs to await belongs in the handler itself.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::BotError;
use crate::payload::Payload;

type ProviderFn = Arc<dyn Fn(&Payload) -> Result<Value, BotError> + Send + Sync>;

struct Provider {
    params: Vec<String>,
    call: ProviderFn,
}

/// Per-bot registry of named value providers.
///
/// Registered on the builder, consulted by the invoke stage for every
/// handled event:
///
/// ```
/// use botvisor::{Payload, Providers};
/// use serde_json::json;
///
/// let mut providers = Providers::new();
/// providers.register("greeting", &["sender"], |args| {
///     Ok(json!(format!("hello, {}", args.str("sender").unwrap_or("?"))))
/// });
///
/// let seed = Payload::new().with("sender", "console");
/// let resolved = providers.resolve(&["greeting".into()], &seed).unwrap();
/// assert_eq!(resolved.str("greeting"), Some("hello, console"));
/// ```
#[derive(Clone, Default)]
pub struct Providers {
    map: HashMap<String, Arc<Provider>>,
}

impl Providers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for `name`, replacing any previous one.
    ///
    /// `params` are the names the provider itself wants resolved; they are
    /// delivered as a [`Payload`] when it runs.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        params: &[&str],
        f: impl Fn(&Payload) -> Result<Value, BotError> + Send + Sync + 'static,
    ) {
        self.map.insert(
            name.into(),
            Arc::new(Provider {
                params: params.iter().map(|p| p.to_string()).collect(),
                call: Arc::new(f),
            }),
        );
    }

    /// Registers a constant value under `name`.
    pub fn register_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        self.register(name, &[], move |_| Ok(value.clone()));
    }

    /// Whether a provider is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Resolves `params` against this registry and the `seed` payload.
    ///
    /// Returns a payload holding exactly the requested names. Each provider
    /// runs at most once per call (request-scoped memoization).
    pub fn resolve(&self, params: &[String], seed: &Payload) -> Result<Payload, BotError> {
        let mut scope: BTreeMap<String, Value> = BTreeMap::new();
        let mut stack: Vec<String> = Vec::new();

        let mut out = Payload::new();
        for name in params {
            let value = self.resolve_one(name, seed, &mut scope, &mut stack)?;
            out.insert(name.clone(), value);
        }
        Ok(out)
    }

    fn resolve_one(
        &self,
        name: &str,
        seed: &Payload,
        scope: &mut BTreeMap<String, Value>,
        stack: &mut Vec<String>,
    ) -> Result<Value, BotError> {
        if let Some(v) = scope.get(name) {
            return Ok(v.clone());
        }
        if stack.iter().any(|n| n == name) {
            return Err(BotError::invalid(format!(
                "provider cycle: {} -> {name}",
                stack.join(" -> ")
            )));
        }

        if let Some(provider) = self.map.get(name).cloned() {
            stack.push(name.to_string());
            let mut args = Payload::new();
            for p in &provider.params {
                let v = self.resolve_one(p, seed, scope, stack)?;
                args.insert(p.clone(), v);
            }
            stack.pop();

            let value = (provider.call)(&args)?;
            scope.insert(name.to_string(), value.clone());
            return Ok(value);
        }

        if let Some(v) = seed.get(name) {
            scope.insert(name.to_string(), v.clone());
            return Ok(v.clone());
        }

        Err(BotError::invalid(format!(
            "parameter '{name}' cannot be resolved: no provider and no payload key"
        )))
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.map.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Providers").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn resolves_nested_provider_chain_from_seed() {
        let mut providers = Providers::new();
        providers.register("conn", &["host", "port"], |args| {
            let host = args.str("host").unwrap_or("?");
            let port: u16 = args.get_as("port")?;
            Ok(json!(format!("{host}:{port}")))
        });
        providers.register("repo", &["conn"], |args| {
            Ok(json!(format!("repo@{}", args.str("conn").unwrap_or("?"))))
        });

        let seed = Payload::new()
            .with("host", "localhost")
            .with("port", 5432)
            .with("extra", "kept");
        let out = providers
            .resolve(&params(&["repo", "extra"]), &seed)
            .unwrap();

        assert_eq!(out.str("repo"), Some("repo@localhost:5432"));
        assert_eq!(out.str("extra"), Some("kept"));
        assert!(!out.contains("conn"));
    }

    #[test]
    fn provider_shadows_seed_key() {
        let mut providers = Providers::new();
        providers.register_value("who", "provider");

        let seed = Payload::new().with("who", "payload");
        let out = providers.resolve(&params(&["who"]), &seed).unwrap();
        assert_eq!(out.str("who"), Some("provider"));
    }

    #[test]
    fn each_provider_runs_once_per_request() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        let mut providers = Providers::new();
        providers.register("counted", &[], |_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        });
        providers.register("a", &["counted"], |_| Ok(json!("a")));
        providers.register("b", &["counted"], |_| Ok(json!("b")));

        providers
            .resolve(&params(&["a", "b", "counted"]), &Payload::new())
            .unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cycle_is_programmer_error() {
        let mut providers = Providers::new();
        providers.register("a", &["b"], |_| Ok(json!(0)));
        providers.register("b", &["a"], |_| Ok(json!(0)));

        let err = providers
            .resolve(&params(&["a"]), &Payload::new())
            .unwrap_err();
        assert!(matches!(err, BotError::Invalid { .. }));
        assert!(err.as_message().contains("cycle"));
    }

    #[test]
    fn unresolvable_name_is_programmer_error() {
        let providers = Providers::new();
        let err = providers
            .resolve(&params(&["ghost"]), &Payload::new())
            .unwrap_err();
        assert!(matches!(err, BotError::Invalid { .. }));
    }
}
