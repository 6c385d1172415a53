//! Class-alias registry for class-tagged wire objects.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tracing::debug;

use crate::error::ProtocolError;
use crate::value::Value;

/// Registry of wire type aliases the server knows how to accept.
///
/// Peers tag serialised records with a class alias
/// (e.g. `"Pizza"`). Registering an alias declares the tag as known.
/// Enforcement is off by default: unregistered tags decode as plain
/// objects. With [`require_registration`](Self::set_require_registration)
/// enabled, the codec rejects packets carrying unknown aliases.
#[derive(Debug, Default)]
pub struct ClassAliasRegistry {
    aliases: DashSet<String>,
    require_registration: AtomicBool,
}

impl ClassAliasRegistry {
    /// Creates an empty registry with enforcement disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class alias. Re-registration is a no-op.
    pub fn register(&self, alias: impl Into<String>) {
        let alias = alias.into();
        if self.aliases.insert(alias.clone()) {
            debug!(alias = %alias, "Class alias registered");
        }
    }

    /// Whether an alias has been registered.
    #[must_use]
    pub fn is_registered(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// Toggles enforcement of alias registration at decode time.
    pub fn set_require_registration(&self, required: bool) {
        self.require_registration.store(required, Ordering::Relaxed);
    }

    /// Whether unknown aliases are rejected at decode time.
    #[must_use]
    pub fn requires_registration(&self) -> bool {
        self.require_registration.load(Ordering::Relaxed)
    }

    /// Validates every class tag in a value tree against the registry.
    ///
    /// A no-op unless enforcement is enabled.
    pub fn validate(&self, value: &Value) -> Result<(), ProtocolError> {
        if !self.requires_registration() {
            return Ok(());
        }
        self.validate_inner(value)
    }

    fn validate_inner(&self, value: &Value) -> Result<(), ProtocolError> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.validate_inner(item)?;
                }
                Ok(())
            }
            Value::Object { class, entries } => {
                if let Some(alias) = class {
                    if !self.is_registered(alias) {
                        return Err(ProtocolError::UnregisteredAlias(alias.clone()));
                    }
                }
                for (_, field) in entries {
                    self.validate_inner(field)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
