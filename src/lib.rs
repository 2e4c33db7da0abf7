//! # ferrous-injector
//!
//! Hierarchical, async dependency injection for Rust.
//!
//! Providers are registered on [`Injector`] nodes under identifiers: a Rust
//! type (see [`of`]) or a nominal [`Token`]. Resolving an identifier walks from
//! the node it was asked on towards the root until a node with providers for it
//! is found. The value is built and cached there, so every node below it shares
//! the same instance.
//!
//! ## Features
//!
//! - **Three recipe kinds**: existing values, constructible types built by
//!   parameter injection, and async or sync factories over declared dependencies
//! - **Multi providers**: several providers under one identifier, collected
//!   with [`Injector::resolve_all`] across the whole chain
//! - **Global injectables**: types described as global in a [`MetadataRegistry`]
//!   are registered on the root lazily, on first use
//! - **Forward references**: [`forward_ref`] defers naming an identifier until
//!   it is actually needed
//! - **Guards**: constructor cycles fail with [`DiError::Circular`] instead of
//!   hanging; concurrent first resolutions build once
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_injector::{of, Dependency, Injector, Provider, Token};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn prefix(&self) -> &str;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn prefix(&self) -> &str {
//!         "[app]"
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_injector::DiResult<()> {
//! let greeting: Token<String> = Token::new("greeting");
//!
//! let app = Injector::create("App", None);
//! app.register([
//!     Provider::value(&of::<Arc<dyn Logger>>(), Arc::new(ConsoleLogger) as Arc<dyn Logger>),
//!     Provider::factory_sync(&greeting, vec![Dependency::on(of::<Arc<dyn Logger>>())], |args| {
//!         let logger = args.required::<Arc<dyn Logger>>(0)?;
//!         Ok(format!("{} hello", logger.prefix()))
//!     }),
//! ])?;
//!
//! let request = app.child("Request");
//! assert_eq!(*request.resolve(&greeting).await?, "[app] hello");
//! # Ok(())
//! # }
//! ```
//!
//! ## Multi Providers
//!
//! ```rust
//! use ferrous_injector::{Injector, Provider, Token};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ferrous_injector::DiResult<()> {
//! let plugins: Token<&'static str> = Token::new("plugins");
//!
//! let app = Injector::create("App", None);
//! app.register(Provider::value(&plugins, "auth").multi())?;
//!
//! let request = app.child("Request");
//! request.register([
//!     Provider::value(&plugins, "audit").multi(),
//!     Provider::value(&plugins, "trace").multi(),
//! ])?;
//!
//! let names: Vec<&str> = request.resolve_all(&plugins).await?.iter().map(|p| **p).collect();
//! assert_eq!(names, ["audit", "trace", "auth"]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forward_ref;
pub mod injector;
pub mod key;
pub mod metadata;
pub mod observer;
pub mod provider;
pub mod token;

mod internal;

pub use config::{ConfigProvider, ConfigSource, ConfigValue, EngineConfig, EnvironmentConfigSource, MapConfigSource};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use error::{BoxError, DiError, DiResult};
pub use forward_ref::{forward_ref, ForwardRef, Target};
pub use injector::{Injector, InjectorBuilder, ResolveOptions, RootInjector, RootInjectorBuilder};
pub use key::{key_of_type, of, Key, Provide, TypeKey};
pub use metadata::{InjectableFactory, InjectableOptions, MetadataRegistry, MetadataSource, TypeDescriptor};
pub use observer::{LoggingObserver, MetricsObserver, ResolutionObserver};
pub use provider::{
    normalize, AnyArc, Arguments, BoxFuture, Construct, Constructor, Dependency, Factory, Provider, ProviderDescriptor,
    ProviderInput, ProviderKind, ProviderSet,
};
pub use token::Token;
