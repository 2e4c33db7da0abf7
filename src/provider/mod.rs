//! Provider recipes.
//!
//! A [`Provider`] tells an injector how to produce a value for an identifier:
//! hand out a value that already exists, build a constructible type by
//! parameter injection, or run a (possibly async) factory over a list of
//! dependencies. The recipe kind is a closed sum type, validated once at the
//! registration boundary by [`normalize`].

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{BoxError, DiError, DiResult};
use crate::forward_ref::{ForwardRef, Target};
use crate::key::{key_of_type, Key, Provide, TypeKey};
use crate::token::Token;

pub mod arguments;
pub mod normalize;

pub use arguments::Arguments;
pub use normalize::{normalize, ProviderDescriptor, ProviderInput, ProviderSet};

// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed, sendable future used for recursive resolution and erased constructors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type BuildFn = Arc<dyn Fn(Arguments) -> BoxFuture<'static, Result<AnyArc, BoxError>> + Send + Sync>;

/// A type that can be built by parameter injection.
///
/// `parameters` lists the identifier each constructor position expects; it
/// plays the part of reflected parameter types and can be overridden per
/// position by explicit entries in a [`MetadataRegistry`](crate::MetadataRegistry).
/// Positions left as `None` must be filled by the registry or be marked
/// optional.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{key_of_type, Arguments, BoxError, Construct, Key};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Database;
///
/// #[async_trait]
/// impl Construct for Database {
///     async fn construct(_args: Arguments) -> Result<Self, BoxError> {
///         Ok(Database)
///     }
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// #[async_trait]
/// impl Construct for UserService {
///     fn parameters() -> Vec<Option<Key>> {
///         vec![Some(key_of_type::<Database>())]
///     }
///
///     async fn construct(args: Arguments) -> Result<Self, BoxError> {
///         Ok(UserService { db: args.required::<Database>(0)? })
///     }
/// }
/// ```
#[async_trait]
pub trait Construct: Send + Sync + Sized + 'static {
    /// Identifiers wanted by each constructor position.
    fn parameters() -> Vec<Option<Key>> {
        Vec::new()
    }

    /// Builds the value from resolved arguments.
    async fn construct(args: Arguments) -> Result<Self, BoxError>;
}

/// A factory recipe.
///
/// Receives the resolved `deps` of its provider, in declaration order.
/// Closures of the shape `Fn(Arguments) -> impl Future<Output = Result<AnyArc, BoxError>>`
/// implement this trait directly.
#[async_trait]
pub trait Factory: Send + Sync {
    async fn create(&self, args: Arguments) -> Result<AnyArc, BoxError>;
}

#[async_trait]
impl<F, Fut> Factory for F
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AnyArc, BoxError>> + Send + 'static,
{
    async fn create(&self, args: Arguments) -> Result<AnyArc, BoxError> {
        self(args).await
    }
}

/// Handle to a constructible type.
///
/// Carries the type's identity (used to look up its metadata), its reflected
/// parameter list and an erased build function.
#[derive(Clone)]
pub struct Constructor {
    type_id: TypeId,
    type_name: &'static str,
    reflected: fn() -> Vec<Option<Key>>,
    build: BuildFn,
}

impl Constructor {
    /// Constructor for `C`, producing `C` itself.
    pub fn of<C: Construct>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            reflected: C::parameters,
            build: Arc::new(|args| {
                Box::pin(async move { C::construct(args).await.map(|value| Arc::new(value) as AnyArc) })
            }),
        }
    }

    /// Constructor for `C` whose product is converted with `map` before it is
    /// cached. Used to bind a concrete type to an abstract identifier such as
    /// `Arc<dyn Trait>`. Metadata is still looked up under `C`.
    pub fn of_mapped<C, O, M>(map: M) -> Self
    where
        C: Construct,
        O: Send + Sync + 'static,
        M: Fn(C) -> O + Send + Sync + 'static,
    {
        let map = Arc::new(map);
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            reflected: C::parameters,
            build: Arc::new(move |args| {
                let map = map.clone();
                Box::pin(async move { C::construct(args).await.map(|value| Arc::new(map(value)) as AnyArc) })
            }),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The identifier of the constructible type itself.
    pub fn key(&self) -> Key {
        Key::Type(self.type_id, self.type_name)
    }

    /// Reflected parameter identifiers.
    pub fn reflected_parameters(&self) -> Vec<Option<Key>> {
        (self.reflected)()
    }

    pub(crate) fn build(&self, args: Arguments) -> BoxFuture<'static, Result<AnyArc, BoxError>> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.type_name)
    }
}

/// A factory dependency: a target plus an optional flag.
#[derive(Clone, Debug)]
pub struct Dependency {
    pub target: Target,
    pub optional: bool,
}

impl Dependency {
    /// Required dependency.
    pub fn on(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            optional: false,
        }
    }

    /// Dependency that resolves to nothing when no provider exists.
    pub fn optional(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            optional: true,
        }
    }
}

impl From<Key> for Dependency {
    fn from(key: Key) -> Self {
        Dependency::on(key)
    }
}

impl From<ForwardRef> for Dependency {
    fn from(handle: ForwardRef) -> Self {
        Dependency::on(handle)
    }
}

impl<T: Send + Sync + 'static> From<TypeKey<T>> for Dependency {
    fn from(id: TypeKey<T>) -> Self {
        Dependency::on(id)
    }
}

impl<T> From<&Token<T>> for Dependency {
    fn from(token: &Token<T>) -> Self {
        Dependency::on(token)
    }
}

/// Recipe payload.
#[derive(Clone)]
pub enum ProviderKind {
    /// Already constructed value
    Value(AnyArc),
    /// Constructible type built by parameter injection
    Class(Constructor),
    /// Factory invoked with its resolved dependencies
    Factory {
        factory: Arc<dyn Factory>,
        deps: Vec<Dependency>,
    },
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Value(_) => "value",
            ProviderKind::Class(_) => "class",
            ProviderKind::Factory { .. } => "factory",
        }
    }
}

impl fmt::Debug for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Value(_) => f.write_str("Value(..)"),
            ProviderKind::Class(ctor) => write!(f, "Class({})", ctor.type_name()),
            ProviderKind::Factory { deps, .. } => write!(f, "Factory(deps: {})", deps.len()),
        }
    }
}

/// An immutable recipe for producing values of one identifier.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{of, Dependency, Injector, Provider, Token};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ferrous_injector::DiResult<()> {
/// let port: Token<u16> = Token::new("port");
/// let url: Token<String> = Token::new("url");
///
/// let injector = Injector::create("App", None);
/// injector.register([
///     Provider::value(&port, 8080u16),
///     Provider::factory_sync(&url, vec![Dependency::on(&port)], |args| {
///         Ok(format!("http://localhost:{}", args.required::<u16>(0)?))
///     }),
/// ])?;
///
/// assert_eq!(*injector.resolve(&url).await?, "http://localhost:8080");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Provider {
    provide: Key,
    multi: bool,
    kind: ProviderKind,
}

impl Provider {
    /// Untyped constructor.
    pub fn new(provide: Key, kind: ProviderKind) -> Self {
        Self {
            provide,
            multi: false,
            kind,
        }
    }

    /// Provider handing out an existing value.
    pub fn value<P: Provide>(id: &P, value: P::Output) -> Self {
        Self::new(id.key(), ProviderKind::Value(Arc::new(value)))
    }

    /// Provider building `C` by parameter injection for an identifier of type `C`.
    pub fn class<P, C>(id: &P) -> Self
    where
        P: Provide<Output = C>,
        C: Construct,
    {
        Self::new(id.key(), ProviderKind::Class(Constructor::of::<C>()))
    }

    /// Provider building `C` and converting it into the identifier's type.
    pub fn class_as<P, C, M>(id: &P, map: M) -> Self
    where
        P: Provide,
        C: Construct,
        M: Fn(C) -> P::Output + Send + Sync + 'static,
    {
        Self::new(id.key(), ProviderKind::Class(Constructor::of_mapped::<C, P::Output, M>(map)))
    }

    /// Provider for a constructible type keyed by the type itself.
    pub fn constructible<C: Construct>() -> Self {
        Self::new(key_of_type::<C>(), ProviderKind::Class(Constructor::of::<C>()))
    }

    /// Provider running an async factory over `deps`.
    pub fn factory<P, F, Fut>(id: &P, deps: Vec<Dependency>, factory: F) -> Self
    where
        P: Provide,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P::Output, BoxError>> + Send + 'static,
    {
        let erased = move |args: Arguments| {
            let fut = factory(args);
            async move { fut.await.map(|value| Arc::new(value) as AnyArc) }
        };
        Self::new(
            id.key(),
            ProviderKind::Factory {
                factory: Arc::new(erased),
                deps,
            },
        )
    }

    /// Provider running a synchronous factory over `deps`.
    pub fn factory_sync<P, F>(id: &P, deps: Vec<Dependency>, factory: F) -> Self
    where
        P: Provide,
        F: Fn(Arguments) -> Result<P::Output, BoxError> + Send + Sync + 'static,
    {
        let erased = move |args: Arguments| {
            let result = factory(args).map(|value| Arc::new(value) as AnyArc);
            async move { result }
        };
        Self::new(
            id.key(),
            ProviderKind::Factory {
                factory: Arc::new(erased),
                deps,
            },
        )
    }

    /// Marks this provider as contributing one element of a multi collection.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn provide(&self) -> &Key {
        &self.provide
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub(crate) fn rekey(mut self, provide: Key) -> Self {
        self.provide = provide;
        self
    }

    pub(crate) fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }
}

/// Downcasts a stored value to the requested type.
pub(crate) fn downcast<T: Send + Sync + 'static>(value: AnyArc, key: &Key) -> DiResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| DiError::TypeMismatch {
        identifier: key.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::of;

    struct Engine;

    #[async_trait]
    impl Construct for Engine {
        async fn construct(_args: Arguments) -> Result<Self, BoxError> {
            Ok(Engine)
        }
    }

    #[test]
    fn constructible_is_keyed_by_its_type() {
        let provider = Provider::constructible::<Engine>();
        assert_eq!(provider.provide(), &key_of_type::<Engine>());
        assert!(!provider.is_multi());
        assert_eq!(provider.kind().name(), "class");
    }

    #[test]
    fn multi_flag_defaults_to_false() {
        let token: Token<u8> = Token::new("bytes");
        assert!(!Provider::value(&token, 1).is_multi());
        assert!(Provider::value(&token, 1).multi().is_multi());
    }

    #[tokio::test]
    async fn mapped_constructor_keeps_class_identity() {
        trait Motor: Send + Sync {}
        impl Motor for Engine {}

        let ctor = Constructor::of_mapped::<Engine, Arc<dyn Motor>, _>(|e| Arc::new(e) as Arc<dyn Motor>);
        assert_eq!(ctor.type_id(), TypeId::of::<Engine>());

        let built = ctor.build(Arguments::empty()).await.unwrap();
        assert!(built.downcast::<Arc<dyn Motor>>().is_ok());
    }

    #[test]
    fn downcast_reports_expected_type() {
        let value: AnyArc = Arc::new(5u32);
        let err = downcast::<String>(value, &of::<String>().key()).unwrap_err();
        match err {
            DiError::TypeMismatch { expected, .. } => assert!(expected.contains("String")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
