//! Constructor metadata consumed by the resolution engine.
//!
//! The engine needs to know, for a constructible type, which identifier each
//! constructor position wants and whether that position is optional, plus which
//! types are flagged for automatic registration on the root injector. It asks
//! for this through the [`MetadataSource`] trait only. [`MetadataRegistry`] is
//! the implementation shipped with the crate: an explicit registry filled with
//! one builder call per type.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::forward_ref::Target;
use crate::key::Key;
use crate::provider::{Arguments, AnyArc, Construct, Constructor, Dependency, Factory, Provider};
use crate::error::BoxError;

/// Factory attached to an injectable type, replacing parameter injection when
/// the type is auto-registered.
#[derive(Clone)]
pub struct InjectableFactory {
    pub factory: Arc<dyn Factory>,
    pub deps: Vec<Dependency>,
}

impl fmt::Debug for InjectableFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectableFactory").field("deps", &self.deps).finish()
    }
}

/// Options attached to a constructible type.
#[derive(Clone, Debug, Default)]
pub struct InjectableOptions {
    /// Register automatically on the root injector
    pub global: bool,
    /// Build with this factory instead of parameter injection
    pub factory: Option<InjectableFactory>,
}

/// Query interface over constructor metadata.
///
/// This is the whole contract between the resolution engine and whatever
/// produces the metadata.
pub trait MetadataSource: Send + Sync {
    /// Identifier wanted at each constructor position. Explicit entries win
    /// over the constructor's reflected parameters; the two lists are merged
    /// position by position. `None` marks a position with no identifier.
    fn parameter_targets(&self, ctor: &Constructor) -> Vec<Option<Target>>;

    /// Optional flag of each constructor position.
    fn parameter_optional(&self, ctor: &Constructor) -> Vec<Option<bool>>;

    /// Options attached to a constructible type, if it was described.
    fn injectable_options(&self, type_id: TypeId) -> Option<InjectableOptions>;

    /// Every type flagged for automatic root registration, in description order.
    fn global_injectables(&self) -> Vec<(Constructor, InjectableOptions)>;

    /// Every token created with a default provider, in creation order.
    fn self_registering_tokens(&self) -> Vec<(Key, Arc<Provider>)>;
}

#[derive(Clone, Default)]
struct ParameterEntry {
    inject: Option<Target>,
    optional: Option<bool>,
}

#[derive(Default)]
struct RegistryInner {
    parameters: AHashMap<TypeId, Vec<ParameterEntry>>,
    injectables: Vec<(Constructor, InjectableOptions)>,
    injectable_index: AHashMap<TypeId, usize>,
    tokens: Vec<(Key, Arc<Provider>)>,
}

/// Explicit metadata registry.
///
/// Created once at startup, filled through [`describe`](Self::describe) and
/// token creation, and read by the root injector during its bootstrap scan.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{key_of_type, Arguments, BoxError, Construct, MetadataRegistry, MetadataSource, Constructor};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Clock;
/// #[async_trait]
/// impl Construct for Clock {
///     async fn construct(_args: Arguments) -> Result<Self, BoxError> { Ok(Clock) }
/// }
///
/// struct Scheduler { clock: Option<Arc<Clock>> }
/// #[async_trait]
/// impl Construct for Scheduler {
///     async fn construct(args: Arguments) -> Result<Self, BoxError> {
///         Ok(Scheduler { clock: args.optional::<Clock>(0)? })
///     }
/// }
///
/// let registry = MetadataRegistry::new();
/// registry
///     .describe::<Scheduler>()
///     .inject(0, key_of_type::<Clock>())
///     .optional(0)
///     .global()
///     .register();
///
/// let ctor = Constructor::of::<Scheduler>();
/// assert_eq!(registry.parameter_targets(&ctor).len(), 1);
/// assert_eq!(registry.parameter_optional(&ctor), vec![Some(true)]);
/// assert_eq!(registry.global_injectables().len(), 1);
/// ```
#[derive(Default)]
pub struct MetadataRegistry {
    inner: RwLock<RegistryInner>,
}

static GLOBAL_REGISTRY: Lazy<Arc<MetadataRegistry>> = Lazy::new(|| Arc::new(MetadataRegistry::new()));

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the default root injector and by
    /// [`Token::with_default`](crate::Token::with_default).
    pub fn global() -> Arc<MetadataRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Starts describing the constructible type `C`.
    pub fn describe<C: Construct>(&self) -> TypeDescriptor<'_> {
        TypeDescriptor {
            registry: self,
            ctor: Constructor::of::<C>(),
            parameters: BTreeMap::new(),
            options: None,
        }
    }

    /// Starts describing an already erased constructor.
    pub fn describe_constructor(&self, ctor: Constructor) -> TypeDescriptor<'_> {
        TypeDescriptor {
            registry: self,
            ctor,
            parameters: BTreeMap::new(),
            options: None,
        }
    }

    /// True when `C` was described as injectable.
    pub fn is_injectable<C: 'static>(&self) -> bool {
        self.inner.read().injectable_index.contains_key(&TypeId::of::<C>())
    }

    /// Records a self-registering token's default provider.
    pub fn add_token(&self, token: Key, provider: Provider) {
        tracing::trace!(identifier = %token, "token default provider recorded");
        self.inner.write().tokens.push((token, Arc::new(provider)));
    }

    fn commit(&self, ctor: Constructor, parameters: BTreeMap<usize, ParameterEntry>, options: Option<InjectableOptions>) {
        let mut inner = self.inner.write();
        let type_id = ctor.type_id();

        if !parameters.is_empty() {
            let entries = inner.parameters.entry(type_id).or_default();
            for (index, entry) in parameters {
                if entries.len() <= index {
                    entries.resize(index + 1, ParameterEntry::default());
                }
                let slot = &mut entries[index];
                if entry.inject.is_some() {
                    slot.inject = entry.inject;
                }
                if entry.optional.is_some() {
                    slot.optional = entry.optional;
                }
            }
        }

        if let Some(options) = options {
            match inner.injectable_index.get(&type_id).copied() {
                Some(position) => inner.injectables[position] = (ctor, options),
                None => {
                    let position = inner.injectables.len();
                    inner.injectables.push((ctor, options));
                    inner.injectable_index.insert(type_id, position);
                }
            }
        }
    }
}

impl MetadataSource for MetadataRegistry {
    fn parameter_targets(&self, ctor: &Constructor) -> Vec<Option<Target>> {
        let reflected = ctor.reflected_parameters();
        let inner = self.inner.read();
        let explicit = inner
            .parameters
            .get(&ctor.type_id())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let len = explicit.len().max(reflected.len());
        (0..len)
            .map(|index| {
                explicit
                    .get(index)
                    .and_then(|entry| entry.inject.clone())
                    .or_else(|| reflected.get(index).cloned().flatten().map(Target::Key))
            })
            .collect()
    }

    fn parameter_optional(&self, ctor: &Constructor) -> Vec<Option<bool>> {
        let inner = self.inner.read();
        inner
            .parameters
            .get(&ctor.type_id())
            .map(|entries| entries.iter().map(|entry| entry.optional).collect())
            .unwrap_or_default()
    }

    fn injectable_options(&self, type_id: TypeId) -> Option<InjectableOptions> {
        let inner = self.inner.read();
        inner
            .injectable_index
            .get(&type_id)
            .map(|position| inner.injectables[*position].1.clone())
    }

    fn global_injectables(&self) -> Vec<(Constructor, InjectableOptions)> {
        self.inner
            .read()
            .injectables
            .iter()
            .filter(|(_, options)| options.global)
            .cloned()
            .collect()
    }

    fn self_registering_tokens(&self) -> Vec<(Key, Arc<Provider>)> {
        self.inner.read().tokens.clone()
    }
}

impl fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MetadataRegistry")
            .field("described", &inner.parameters.len())
            .field("injectables", &inner.injectables.len())
            .field("tokens", &inner.tokens.len())
            .finish()
    }
}

/// Builder describing one constructible type; see [`MetadataRegistry::describe`].
#[must_use = "call register() to record the description"]
pub struct TypeDescriptor<'a> {
    registry: &'a MetadataRegistry,
    ctor: Constructor,
    parameters: BTreeMap<usize, ParameterEntry>,
    options: Option<InjectableOptions>,
}

impl<'a> TypeDescriptor<'a> {
    /// Position `index` wants `target`, overriding the reflected parameter.
    pub fn inject(mut self, index: usize, target: impl Into<Target>) -> Self {
        self.parameters.entry(index).or_default().inject = Some(target.into());
        self
    }

    /// Position `index` resolves to nothing when no provider exists.
    pub fn optional(mut self, index: usize) -> Self {
        self.parameters.entry(index).or_default().optional = Some(true);
        self
    }

    /// Marks the type as injectable without auto-registration.
    pub fn injectable(mut self) -> Self {
        self.options.get_or_insert_with(InjectableOptions::default);
        self
    }

    /// Marks the type for automatic registration on the root injector.
    pub fn global(mut self) -> Self {
        self.options.get_or_insert_with(InjectableOptions::default).global = true;
        self
    }

    /// Builds the type with `factory` over `deps` when auto-registered.
    pub fn factory<F, Fut>(mut self, deps: Vec<Dependency>, factory: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<AnyArc, BoxError>> + Send + 'static,
    {
        self.options.get_or_insert_with(InjectableOptions::default).factory = Some(InjectableFactory {
            factory: Arc::new(factory),
            deps,
        });
        self
    }

    /// Records the description.
    pub fn register(self) {
        tracing::trace!(
            constructor = self.ctor.type_name(),
            parameters = self.parameters.len(),
            global = self.options.as_ref().map(|o| o.global).unwrap_or(false),
            "type described"
        );
        self.registry.commit(self.ctor, self.parameters, self.options);
    }
}
