//! Identifier types for provider storage and lookup.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Key for provider storage and lookup.
///
/// A key is either a Rust type or a [`Token`](crate::Token). Keys compare by
/// identity only: types by `TypeId`, tokens by a process-unique sequence number
/// assigned at creation. Two tokens with the same description are therefore
/// different keys.
///
/// Any `'static` type can act as an identifier, including trait objects, so an
/// abstract interface such as `dyn Logger` is a valid key.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{key_of_type, Key, Provide, Token};
///
/// trait Logger: Send + Sync {}
///
/// let a = key_of_type::<String>();
/// let b = key_of_type::<String>();
/// assert_eq!(a, b);
///
/// let iface = key_of_type::<dyn Logger>();
/// assert_ne!(iface, a);
///
/// let t1: Token<u32> = Token::new("port");
/// let t2: Token<u32> = Token::new("port");
/// assert_ne!(t1.key(), t2.key());
/// assert_eq!(t1.key().to_string(), "Token(port)");
/// ```
#[derive(Clone)]
pub enum Key {
    /// Type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Token key with its sequence number and description
    Token(u64, Arc<str>),
}

impl Key {
    /// Get the type name or token description for display
    pub fn display_name(&self) -> &str {
        match self {
            Key::Type(_, name) => name,
            Key::Token(_, description) => description,
        }
    }

    /// True for token keys.
    pub fn is_token(&self) -> bool {
        matches!(self, Key::Token(..))
    }
}

// Identity comparison only; names are for diagnostics
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Token(a, _), Key::Token(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Token(seq, _) => {
                1u8.hash(state);
                seq.hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => f.write_str(name),
            Key::Token(_, description) => write!(f, "Token({})", description),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => write!(f, "Key::Type({})", name),
            Key::Token(seq, description) => write!(f, "Key::Token(#{} {})", seq, description),
        }
    }
}

#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// A typed identifier.
///
/// `Provide` links an identifier to the type of value stored under it, so the
/// typed resolution methods on [`Injector`](crate::Injector) can hand back an
/// `Arc<Output>` instead of a type-erased value.
pub trait Provide {
    /// Type of the values produced for this identifier.
    type Output: Send + Sync + 'static;

    /// The untyped key used for storage.
    fn key(&self) -> Key;
}

/// Typed identifier for a Rust type; see [`of`].
pub struct TypeKey<T: ?Sized>(PhantomData<fn() -> T>);

impl<T: ?Sized> Clone for TypeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for TypeKey<T> {}

impl<T: ?Sized> fmt::Debug for TypeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey<{}>", std::any::type_name::<T>())
    }
}

impl<T: Send + Sync + 'static> Provide for TypeKey<T> {
    type Output = T;

    fn key(&self) -> Key {
        key_of_type::<T>()
    }
}

/// Typed identifier for the type `T`.
///
/// ```rust
/// use ferrous_injector::{key_of_type, of, Provide};
///
/// struct Database;
/// assert_eq!(of::<Database>().key(), key_of_type::<Database>());
/// ```
pub const fn of<T: ?Sized>() -> TypeKey<T> {
    TypeKey(PhantomData)
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl<T: Send + Sync + 'static> From<TypeKey<T>> for Key {
    fn from(id: TypeKey<T>) -> Self {
        id.key()
    }
}
