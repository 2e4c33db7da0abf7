//! Lazily dereferenced identifiers.

use std::fmt;
use std::sync::Arc;

use crate::key::Key;

/// A deferred identifier.
///
/// Holds a zero-argument function producing the key. The function runs when the
/// identifier is used as a constructor parameter or factory dependency, not when
/// the metadata or provider is declared, so it may name a token that is created
/// later (for example one stored in a `once_cell::sync::Lazy`).
#[derive(Clone)]
pub struct ForwardRef {
    resolver: Arc<dyn Fn() -> Key + Send + Sync>,
}

impl ForwardRef {
    /// Dereferences the handle.
    pub fn key(&self) -> Key {
        (self.resolver)()
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ForwardRef(..)")
    }
}

/// Creates a [`ForwardRef`].
///
/// ```rust
/// use ferrous_injector::{forward_ref, key_of_type};
///
/// struct Later;
/// let handle = forward_ref(|| key_of_type::<Later>());
/// assert_eq!(handle.key(), key_of_type::<Later>());
/// ```
pub fn forward_ref<F>(resolver: F) -> ForwardRef
where
    F: Fn() -> Key + Send + Sync + 'static,
{
    ForwardRef {
        resolver: Arc::new(resolver),
    }
}

/// A parameter or dependency target: a key, or a forward reference to one.
#[derive(Clone, Debug)]
pub enum Target {
    Key(Key),
    Forward(ForwardRef),
}

impl Target {
    /// The key this target names, dereferencing forward references.
    pub fn key(&self) -> Key {
        match self {
            Target::Key(key) => key.clone(),
            Target::Forward(handle) => handle.key(),
        }
    }
}

impl From<Key> for Target {
    fn from(key: Key) -> Self {
        Target::Key(key)
    }
}

impl From<ForwardRef> for Target {
    fn from(handle: ForwardRef) -> Self {
        Target::Forward(handle)
    }
}

impl<T: Send + Sync + 'static> From<crate::key::TypeKey<T>> for Target {
    fn from(id: crate::key::TypeKey<T>) -> Self {
        Target::Key(id.into())
    }
}

impl<T> From<&crate::token::Token<T>> for Target {
    fn from(token: &crate::token::Token<T>) -> Self {
        Target::Key(token.into())
    }
}
