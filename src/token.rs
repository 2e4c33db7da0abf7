//! Nominal identifiers that are not tied to a Rust type.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::key::{Key, Provide};
use crate::metadata::MetadataRegistry;
use crate::provider::Provider;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A typed, nominal identifier.
///
/// Tokens address providers that are not naturally keyed by a Rust type:
/// configuration values, several implementations of the same interface, or a
/// multi-provider collection. Every call to a constructor mints a fresh
/// identity; clones share it.
///
/// A token can carry a default provider. Such a token registers that provider
/// with a [`MetadataRegistry`] when it is created, and the root injector picks
/// it up during its bootstrap scan, so the token resolves everywhere without an
/// explicit `register` call.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{MetadataRegistry, Provider, RootInjector, Token};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_injector::DiResult<()> {
/// let registry = Arc::new(MetadataRegistry::new());
/// let greeting: Token<String> = Token::with_default_in(&registry, "greeting", |token| {
///     Provider::value(token, "hello".to_string())
/// });
///
/// let root = RootInjector::builder().metadata(registry).install()?;
/// assert_eq!(*root.resolve(&greeting).await?, "hello");
/// # Ok(())
/// # }
/// ```
pub struct Token<T> {
    key: Key,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Token<T> {
    /// Creates a token with no default provider.
    pub fn new(description: impl Into<String>) -> Self {
        let description: String = description.into();
        let seq = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self {
            key: Key::Token(seq, Arc::from(description)),
            _marker: PhantomData,
        }
    }

    /// Creates a token whose default provider is registered with the
    /// process-wide [`MetadataRegistry::global`].
    pub fn with_default<F>(description: impl Into<String>, make: F) -> Self
    where
        F: FnOnce(&Token<T>) -> Provider,
    {
        Self::with_default_in(&MetadataRegistry::global(), description, make)
    }

    /// Creates a token whose default provider is registered with `registry`.
    ///
    /// `make` receives the new token so the provider can be keyed by it. The
    /// provider's identifier is forced to this token.
    pub fn with_default_in<F>(registry: &MetadataRegistry, description: impl Into<String>, make: F) -> Self
    where
        F: FnOnce(&Token<T>) -> Provider,
    {
        let token = Self::new(description);
        let provider = make(&token).rekey(token.key.clone());
        registry.add_token(token.key.clone(), provider);
        token
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        self.key.display_name()
    }
}

impl<T> Provide for Token<T>
where
    T: Send + Sync + 'static,
{
    type Output = T;

    fn key(&self) -> Key {
        self.key.clone()
    }
}

impl<T> Token<T> {
    /// Borrow the untyped key.
    pub fn as_key(&self) -> &Key {
        &self.key
    }
}

impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("key", &self.key).finish()
    }
}

impl<T> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Token<T> {}

impl<T> From<&Token<T>> for Key {
    fn from(token: &Token<T>) -> Self {
        token.key.clone()
    }
}
