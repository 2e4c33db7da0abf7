//! Injector nodes.
//!
//! An [`Injector`] owns a provider table and an instance cache and links to an
//! optional parent. Resolution walks from the node it was called on towards
//! the root until it finds a node with providers for the identifier, builds the
//! value there and caches it there. A node with no parent is the root; see
//! [`RootInjector`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::{DiError, DiResult};
use crate::internal::{FlightTable, ResolutionStack};
use crate::key::{key_of_type, Key, Provide};
use crate::metadata::MetadataSource;
use crate::observer::{Observers, ResolutionObserver};
use crate::provider::{downcast, normalize, AnyArc, Provider, ProviderSet};

mod resolution;
pub mod root;

pub use root::{RootInjector, RootInjectorBuilder};

static NEXT_NODE: AtomicU64 = AtomicU64::new(1);

/// Options for a single resolution call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Yield nothing instead of failing when no provider is registered
    pub optional: bool,
}

impl ResolveOptions {
    pub const fn optional() -> Self {
        Self { optional: true }
    }

    pub const fn required() -> Self {
        Self { optional: false }
    }
}

pub(crate) struct InjectorInner {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) parent: Option<Injector>,
    pub(crate) providers: Mutex<AHashMap<Key, Vec<Arc<Provider>>>>,
    pub(crate) instances: Mutex<AHashMap<Key, Vec<AnyArc>>>,
    pub(crate) flight: FlightTable,
    pub(crate) metadata: Arc<dyn MetadataSource>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) observers: Observers,
    /// Set on root nodes; guards the one-shot bootstrap scan
    pub(crate) has_loaded: Option<OnceCell<()>>,
}

/// A node of the injector hierarchy.
///
/// Handles are cheap to clone and share one node. Resolution is async; values
/// come back as `Arc`s shared with the node's cache, so a non-multi identifier
/// resolves to the same `Arc` on every call.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{key_of_type, of, Arguments, BoxError, Construct, Injector, Key, Provider};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Database {
///     url: Arc<String>,
/// }
///
/// #[async_trait]
/// impl Construct for Database {
///     fn parameters() -> Vec<Option<Key>> {
///         vec![Some(key_of_type::<String>())]
///     }
///
///     async fn construct(args: Arguments) -> Result<Self, BoxError> {
///         Ok(Database { url: args.required::<String>(0)? })
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_injector::DiResult<()> {
/// let app = Injector::create("App", None);
/// app.register(Provider::value(&of::<String>(), "postgres://app".to_string()))?;
/// app.register(Provider::constructible::<Database>())?;
///
/// let request = app.child("Request");
/// let db = request.resolve(&of::<Database>()).await?;
/// assert_eq!(db.url.as_str(), "postgres://app");
/// assert!(Arc::ptr_eq(&db, &app.resolve(&of::<Database>()).await?));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Injector {
    pub(crate) inner: Arc<InjectorInner>,
}

impl Injector {
    /// Creates a node below `parent`, or below the process root when `parent`
    /// is `None`.
    pub fn create(name: impl Into<String>, parent: Option<&Injector>) -> Injector {
        let builder = Injector::builder(name);
        match parent {
            Some(parent) => builder.parent(parent).build(),
            None => builder.build(),
        }
    }

    /// Starts building a node.
    pub fn builder(name: impl Into<String>) -> InjectorBuilder {
        InjectorBuilder {
            name: name.into(),
            parent: None,
            observers: Vec::new(),
        }
    }

    /// Creates a node below this one.
    pub fn child(&self, name: impl Into<String>) -> Injector {
        Injector::builder(name).parent(self).build()
    }

    pub(crate) fn from_parts(
        name: String,
        parent: Option<Injector>,
        metadata: Arc<dyn MetadataSource>,
        config: Arc<EngineConfig>,
        observers: Observers,
    ) -> Injector {
        let is_root = parent.is_none();
        let inner = InjectorInner {
            id: NEXT_NODE.fetch_add(1, Ordering::Relaxed),
            name,
            parent,
            providers: Mutex::new(AHashMap::new()),
            instances: Mutex::new(AHashMap::new()),
            flight: FlightTable::default(),
            metadata,
            config,
            observers,
            has_loaded: is_root.then(OnceCell::new),
        };
        tracing::trace!(injector = %inner.name, id = inner.id, root = is_root, "injector created");
        Injector { inner: Arc::new(inner) }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Engine settings shared by this node's hierarchy.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// True when this node itself has providers for `key`.
    pub fn has_provider(&self, key: &Key) -> bool {
        self.inner
            .providers
            .lock()
            .get(key)
            .is_some_and(|list| !list.is_empty())
    }

    /// Registers one or many providers on this node.
    ///
    /// Every entry is validated first; if any is malformed nothing is
    /// registered. Providers are appended after those already registered for
    /// the same identifier, never replacing them.
    pub fn register(&self, set: impl Into<ProviderSet>) -> DiResult<&Self> {
        let set: ProviderSet = set.into();
        let providers = set
            .0
            .into_iter()
            .map(normalize)
            .collect::<DiResult<Vec<Provider>>>()?;

        for provider in providers {
            tracing::debug!(
                injector = %self.inner.name,
                identifier = %provider.provide(),
                kind = provider.kind().name(),
                multi = provider.is_multi(),
                "provider registered"
            );
            self.append_provider(Arc::new(provider));
        }
        Ok(self)
    }

    pub(crate) fn append_provider(&self, provider: Arc<Provider>) {
        self.inner
            .providers
            .lock()
            .entry(provider.provide().clone())
            .or_default()
            .push(provider);
    }

    /// Resolves the first value for `id`, building it if needed.
    pub async fn resolve<P: Provide>(&self, id: &P) -> DiResult<Arc<P::Output>> {
        let key = id.key();
        match self.resolve_key(&key, ResolveOptions::required()).await? {
            Some(value) => downcast(value, &key),
            None => Err(self.unresolved(&key)),
        }
    }

    pub async fn resolve_with<P: Provide>(&self, id: &P, options: ResolveOptions) -> DiResult<Option<Arc<P::Output>>> {
        let key = id.key();
        self.resolve_key(&key, options)
            .await?
            .map(|value| downcast(value, &key))
            .transpose()
    }

    /// Like [`resolve`](Self::resolve), yielding `None` when nothing is
    /// registered for `id` along the chain.
    pub async fn resolve_optional<P: Provide>(&self, id: &P) -> DiResult<Option<Arc<P::Output>>> {
        self.resolve_with(id, ResolveOptions::optional()).await
    }

    /// Resolves every value visible for `id`: this node's, then each
    /// ancestor's, nearest first.
    pub async fn resolve_all<P: Provide>(&self, id: &P) -> DiResult<Vec<Arc<P::Output>>> {
        self.resolve_all_with(id, ResolveOptions::required()).await
    }

    pub async fn resolve_all_with<P: Provide>(&self, id: &P, options: ResolveOptions) -> DiResult<Vec<Arc<P::Output>>> {
        let key = id.key();
        self.resolve_all_key(&key, options)
            .await?
            .into_iter()
            .map(|value| downcast(value, &key))
            .collect()
    }

    /// Resolves several identifiers one after the other.
    pub async fn resolve_many(&self, keys: &[Key], options: ResolveOptions) -> DiResult<Vec<Option<AnyArc>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.resolve_key(key, options).await?);
        }
        Ok(values)
    }

    /// Untyped [`resolve_with`](Self::resolve_with).
    pub async fn resolve_key(&self, key: &Key, options: ResolveOptions) -> DiResult<Option<AnyArc>> {
        self.resolve_value(key.clone(), options.optional, ResolutionStack::new())
            .await
    }

    /// Untyped [`resolve_all_with`](Self::resolve_all_with).
    pub async fn resolve_all_key(&self, key: &Key, options: ResolveOptions) -> DiResult<Vec<AnyArc>> {
        if self.is_self_key(key) {
            return Ok(self.get_all_key(key));
        }
        self.resolve_internal(key.clone(), options.optional, Vec::new(), ResolutionStack::new())
            .await?;
        Ok(self.get_all_key(key))
    }

    /// First already-built value for `id`; never builds.
    pub fn get<P: Provide>(&self, id: &P) -> DiResult<Arc<P::Output>> {
        let key = id.key();
        match self.get_key(&key) {
            Some(value) => downcast(value, &key),
            None => Err(DiError::InstanceNotFound {
                identifier: key.to_string(),
                injector: self.inner.name.clone(),
            }),
        }
    }

    pub fn get_optional<P: Provide>(&self, id: &P) -> DiResult<Option<Arc<P::Output>>> {
        let key = id.key();
        self.get_key(&key).map(|value| downcast(value, &key)).transpose()
    }

    /// Every already-built value for `id`, this node's first.
    pub fn get_all<P: Provide>(&self, id: &P) -> DiResult<Vec<Arc<P::Output>>> {
        let key = id.key();
        self.get_all_key(&key)
            .into_iter()
            .map(|value| downcast(value, &key))
            .collect()
    }

    /// Untyped [`get_optional`](Self::get_optional).
    ///
    /// Every node holds itself under the `Injector` identifier.
    pub fn get_key(&self, key: &Key) -> Option<AnyArc> {
        if self.is_self_key(key) {
            return Some(self.self_value());
        }
        let mut node = Some(self);
        while let Some(current) = node {
            if let Some(first) = current.inner.instances.lock().get(key).and_then(|list| list.first()) {
                return Some(first.clone());
            }
            node = current.parent();
        }
        None
    }

    /// Untyped [`get_all`](Self::get_all).
    pub fn get_all_key(&self, key: &Key) -> Vec<AnyArc> {
        let self_key = self.is_self_key(key);
        let mut values = Vec::new();
        let mut node = Some(self);
        while let Some(current) = node {
            if self_key {
                values.push(current.self_value());
            } else if let Some(list) = current.inner.instances.lock().get(key) {
                values.extend(list.iter().cloned());
            }
            node = current.parent();
        }
        values
    }

    pub(crate) fn is_self_key(&self, key: &Key) -> bool {
        *key == key_of_type::<Injector>()
    }

    pub(crate) fn self_value(&self) -> AnyArc {
        Arc::new(self.clone())
    }

    fn unresolved(&self, key: &Key) -> DiError {
        let mut path = Vec::new();
        let mut node = Some(self);
        while let Some(current) = node {
            path.push(current.inner.name.clone());
            node = current.parent();
        }
        DiError::UnresolvedProvider {
            identifier: key.to_string(),
            path,
        }
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("parent", &self.parent().map(|p| p.name().to_string()))
            .field("providers", &self.inner.providers.lock().len())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

/// Builder for a non-root node; see [`Injector::builder`].
#[must_use = "call build() to create the injector"]
pub struct InjectorBuilder {
    name: String,
    parent: Option<Injector>,
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl InjectorBuilder {
    /// Parent node; defaults to the process root.
    pub fn parent(mut self, parent: &Injector) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Observer for this node and every node created below it.
    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Injector {
        let parent = match self.parent {
            Some(parent) => parent,
            None => Injector::root(),
        };
        let mut observers = parent.inner.observers.clone();
        for observer in self.observers {
            observers.add(observer);
        }
        let metadata = parent.inner.metadata.clone();
        let config = parent.inner.config.clone();
        Injector::from_parts(self.name, Some(parent), metadata, config, observers)
    }
}
