//! Named connection resolution.
//!
//! [`ConnectionResolver`] maps a connection name to its descriptor, picks the
//! driver factory registered for the descriptor's provider key, and hands back
//! a `Closed` connection handle. [`open_connection`] and [`close_connection`]
//! are the companion helpers transaction scopes use to manage the implicit
//! open/close half of a connection's lifecycle.

use crate::db::connection::{Connection, ProviderFactory};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionDescriptor, ConnectionState};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A lookup-by-name store of connection descriptors.
pub trait DescriptorStore: Send + Sync {
    /// Find the descriptor registered under `name`, if any.
    fn descriptor(&self, name: &str) -> Option<ConnectionDescriptor>;

    /// All registered connection names.
    fn names(&self) -> Vec<String>;
}

/// Driver factories keyed by case-insensitive provider key.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `key`, replacing any previous one.
    pub fn register(&mut self, key: impl AsRef<str>, factory: Arc<dyn ProviderFactory>) {
        let key = key.as_ref().trim().to_lowercase();
        debug!(provider = %key, "Registering provider factory");
        self.factories.insert(key, factory);
    }

    /// Builder-style [`ProviderRegistry::register`].
    pub fn with_provider(
        mut self,
        key: impl AsRef<str>,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        self.register(key, factory);
        self
    }

    /// Look up the factory for a provider key.
    pub fn get(&self, key: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.get(&key.trim().to_lowercase()).cloned()
    }

    /// Check whether a provider key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(&key.trim().to_lowercase())
    }

    /// Registered provider keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.keys())
            .finish()
    }
}

/// Resolves named connection descriptors into connection handles.
#[derive(Clone)]
pub struct ConnectionResolver {
    store: Arc<dyn DescriptorStore>,
    providers: ProviderRegistry,
}

impl ConnectionResolver {
    /// Create a resolver over a descriptor store and a provider registry.
    pub fn new(store: Arc<dyn DescriptorStore>, providers: ProviderRegistry) -> Self {
        Self { store, providers }
    }

    /// The provider registry used for resolution.
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Names known to the underlying descriptor store.
    pub fn names(&self) -> Vec<String> {
        self.store.names()
    }

    /// Look up a descriptor by name.
    ///
    /// A missing name is a [`DbError::ConnectionConfigNotFound`] carrying the
    /// requested key.
    pub fn descriptor(&self, name: &str) -> DbResult<ConnectionDescriptor> {
        self.store
            .descriptor(name)
            .ok_or_else(|| DbError::config_not_found(name))
    }

    /// Resolve a named connection into a new, `Closed` handle.
    pub fn resolve(&self, name: &str) -> DbResult<Box<dyn Connection>> {
        let descriptor = self.descriptor(name)?;
        let factory = self.providers.get(&descriptor.provider_key).ok_or_else(|| {
            DbError::provider_not_supported(&descriptor.provider_key, &descriptor.name)
        })?;

        let connection = factory.create_connection(&descriptor.connection_string)?;

        info!(
            connection = %descriptor.name,
            provider = %descriptor.provider_key,
            target = %descriptor.masked_connection_string(),
            "Resolved connection"
        );

        Ok(connection)
    }

    /// Create a handle for an ad-hoc provider key and connection string.
    pub fn create_connection(
        &self,
        provider_key: &str,
        connection_string: &str,
    ) -> DbResult<Box<dyn Connection>> {
        let factory = self
            .providers
            .get(provider_key)
            .ok_or_else(|| DbError::provider_not_supported(provider_key, "<ad-hoc>"))?;
        factory.create_connection(connection_string)
    }
}

impl std::fmt::Debug for ConnectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionResolver")
            .field("connections", &self.store.names())
            .field("providers", &self.providers)
            .finish()
    }
}

/// Open a connection that is `Closed` or `Broken`.
///
/// Returns `true` only when this call opened a previously `Closed`
/// connection. Reviving a `Broken` connection opens it but returns `false`,
/// and an already `Open` connection is left alone.
pub fn open_connection<C: Connection + ?Sized>(connection: &mut C) -> DbResult<bool> {
    match connection.state() {
        ConnectionState::Open => Ok(false),
        ConnectionState::Closed => {
            connection.open()?;
            debug!(provider = %connection.provider_key(), "Opened connection");
            Ok(true)
        }
        ConnectionState::Broken => {
            connection.open()?;
            info!(provider = %connection.provider_key(), "Reopened broken connection");
            Ok(false)
        }
    }
}

/// Close a connection if it is `Open`.
///
/// With `suppress_errors` set, a failing close is logged and swallowed; this
/// is the best-effort mode used on cleanup paths.
pub fn close_connection<C: Connection + ?Sized>(
    connection: &mut C,
    suppress_errors: bool,
) -> DbResult<()> {
    if !connection.state().is_open() {
        return Ok(());
    }

    match connection.close() {
        Ok(()) => {
            debug!(provider = %connection.provider_key(), "Closed connection");
            Ok(())
        }
        Err(e) if suppress_errors => {
            warn!(
                provider = %connection.provider_key(),
                error = %e,
                "Ignoring failure while closing connection"
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}
