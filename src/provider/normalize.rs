//! Registration input and its validation into a [`Provider`].

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use super::{AnyArc, Constructor, Dependency, Factory, Provider, ProviderKind};

/// A loosely-typed provider description.
///
/// Mirrors a plain `{ provide, use_value | use_class | use_factory, deps, multi }`
/// record. Any combination of fields can be set; [`normalize`] accepts it only
/// when exactly one payload is present and `provide` is set. Presence is what
/// counts, so a `use_value` of `0` or `false` is a valid payload.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{normalize, DiError, ProviderDescriptor, ProviderInput, Token};
///
/// let flag: Token<bool> = Token::new("flag");
///
/// let ok = ProviderDescriptor::new().provide(&flag).use_value(false);
/// assert!(normalize(ProviderInput::Descriptor(ok)).is_ok());
///
/// let empty = ProviderDescriptor::new().provide(&flag);
/// assert!(matches!(
///     normalize(ProviderInput::Descriptor(empty)),
///     Err(DiError::InvalidProviderShape(_))
/// ));
/// ```
#[derive(Clone, Default)]
pub struct ProviderDescriptor {
    pub provide: Option<Key>,
    pub use_value: Option<AnyArc>,
    pub use_class: Option<Constructor>,
    pub use_factory: Option<Arc<dyn Factory>>,
    pub deps: Option<Vec<Dependency>>,
    pub multi: bool,
}

impl ProviderDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provide(mut self, id: impl Into<Key>) -> Self {
        self.provide = Some(id.into());
        self
    }

    pub fn use_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.use_value = Some(Arc::new(value));
        self
    }

    pub fn use_class(mut self, ctor: Constructor) -> Self {
        self.use_class = Some(ctor);
        self
    }

    pub fn use_factory(mut self, factory: impl Factory + 'static) -> Self {
        self.use_factory = Some(Arc::new(factory));
        self
    }

    pub fn deps(mut self, deps: Vec<Dependency>) -> Self {
        self.deps = Some(deps);
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    fn shape(&self) -> String {
        let mut fields = Vec::new();
        if let Some(key) = &self.provide {
            fields.push(format!("provide: {}", key));
        }
        if self.use_value.is_some() {
            fields.push("use_value".to_string());
        }
        if let Some(ctor) = &self.use_class {
            fields.push(format!("use_class: {}", ctor.type_name()));
        }
        if self.use_factory.is_some() {
            fields.push("use_factory".to_string());
        }
        if let Some(deps) = &self.deps {
            fields.push(format!("deps: {}", deps.len()));
        }
        format!("{{ {} }}", fields.join(", "))
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.shape())
    }
}

/// Anything `register` accepts for a single entry.
#[derive(Clone, Debug)]
pub enum ProviderInput {
    /// A ready provider, used unchanged
    Provider(Provider),
    /// A bare constructible type, keyed by itself
    Class(Constructor),
    /// A record validated by [`normalize`]
    Descriptor(ProviderDescriptor),
}

impl From<Provider> for ProviderInput {
    fn from(provider: Provider) -> Self {
        ProviderInput::Provider(provider)
    }
}

impl From<Constructor> for ProviderInput {
    fn from(ctor: Constructor) -> Self {
        ProviderInput::Class(ctor)
    }
}

impl From<ProviderDescriptor> for ProviderInput {
    fn from(descriptor: ProviderDescriptor) -> Self {
        ProviderInput::Descriptor(descriptor)
    }
}

/// One or many registration entries.
#[derive(Clone, Debug, Default)]
pub struct ProviderSet(pub(crate) Vec<ProviderInput>);

impl ProviderSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ProviderInput> for ProviderSet {
    fn from(input: ProviderInput) -> Self {
        ProviderSet(vec![input])
    }
}

impl From<Provider> for ProviderSet {
    fn from(provider: Provider) -> Self {
        ProviderSet(vec![provider.into()])
    }
}

impl From<Constructor> for ProviderSet {
    fn from(ctor: Constructor) -> Self {
        ProviderSet(vec![ctor.into()])
    }
}

impl From<ProviderDescriptor> for ProviderSet {
    fn from(descriptor: ProviderDescriptor) -> Self {
        ProviderSet(vec![descriptor.into()])
    }
}

impl<T: Into<ProviderInput>> From<Vec<T>> for ProviderSet {
    fn from(entries: Vec<T>) -> Self {
        ProviderSet(entries.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ProviderInput>, const N: usize> From<[T; N]> for ProviderSet {
    fn from(entries: [T; N]) -> Self {
        ProviderSet(entries.into_iter().map(Into::into).collect())
    }
}

/// Validates a registration entry into a [`Provider`].
pub fn normalize(input: ProviderInput) -> DiResult<Provider> {
    match input {
        ProviderInput::Provider(provider) => Ok(provider),
        ProviderInput::Class(ctor) => Ok(Provider::new(ctor.key(), ProviderKind::Class(ctor))),
        ProviderInput::Descriptor(descriptor) => normalize_descriptor(descriptor),
    }
}

fn normalize_descriptor(descriptor: ProviderDescriptor) -> DiResult<Provider> {
    let invalid = |descriptor: &ProviderDescriptor, reason: &str| {
        DiError::InvalidProviderShape(format!(
            "provider {} is not valid: {}. Use exactly one of use_value, use_class or use_factory",
            descriptor.shape(),
            reason
        ))
    };

    let Some(provide) = descriptor.provide.clone() else {
        return Err(invalid(&descriptor, "missing provide"));
    };
    let payloads = [
        descriptor.use_value.is_some(),
        descriptor.use_class.is_some(),
        descriptor.use_factory.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    match payloads {
        0 => return Err(invalid(&descriptor, "no payload")),
        1 => {}
        _ => return Err(invalid(&descriptor, "several payloads")),
    }
    if descriptor.deps.is_some() && descriptor.use_factory.is_none() {
        return Err(invalid(&descriptor, "deps without use_factory"));
    }

    let ProviderDescriptor {
        use_value,
        use_class,
        use_factory,
        deps,
        multi,
        ..
    } = descriptor;

    let kind = match (use_value, use_class, use_factory) {
        (Some(value), None, None) => ProviderKind::Value(value),
        (None, Some(ctor), None) => ProviderKind::Class(ctor),
        (None, None, Some(factory)) => ProviderKind::Factory {
            factory,
            deps: deps.unwrap_or_default(),
        },
        _ => return Err(DiError::InvalidProviderShape("several payloads".to_string())),
    };

    Ok(Provider::new(provide, kind).with_multi(multi))
}
