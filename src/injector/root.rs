//! The process root.
//!
//! Exactly one parentless node exists per process. It is created either lazily
//! by [`Injector::root`] with the process-wide [`MetadataRegistry`] and default
//! settings, or explicitly, once, with [`RootInjector::builder`]. On the first
//! resolution that reaches it, the root registers every type flagged global in
//! its metadata and every token default provider that is not registered yet.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::EngineConfig;
use crate::error::{DiError, DiResult};
use crate::metadata::{MetadataRegistry, MetadataSource};
use crate::observer::{Observers, ResolutionObserver};

use super::Injector;

static PROCESS_ROOT: OnceCell<Injector> = OnceCell::new();

/// Entry point for installing the process root.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::{DiError, EngineConfig, Injector, MetadataRegistry, RootInjector};
/// use std::sync::Arc;
///
/// let root = RootInjector::builder()
///     .metadata(Arc::new(MetadataRegistry::new()))
///     .config(EngineConfig { root_name: "Platform".into(), ..EngineConfig::default() })
///     .install()
///     .unwrap();
/// assert!(root.is_root());
/// assert_eq!(Injector::root().name(), "Platform");
///
/// assert!(matches!(
///     RootInjector::builder().install(),
///     Err(DiError::RootCreationForbidden)
/// ));
/// ```
pub struct RootInjector;

impl RootInjector {
    pub fn builder() -> RootInjectorBuilder {
        RootInjectorBuilder {
            metadata: None,
            config: EngineConfig::default(),
            observers: Observers::default(),
        }
    }

    /// True once the process root exists.
    pub fn is_installed() -> bool {
        PROCESS_ROOT.get().is_some()
    }
}

/// Builder for the process root; see [`RootInjector::builder`].
#[must_use = "call install() to create the root injector"]
pub struct RootInjectorBuilder {
    metadata: Option<Arc<dyn MetadataSource>>,
    config: EngineConfig,
    observers: Observers,
}

impl RootInjectorBuilder {
    /// Metadata consulted by every node of the hierarchy. Defaults to
    /// [`MetadataRegistry::global`].
    pub fn metadata<M: MetadataSource + 'static>(mut self, metadata: Arc<M>) -> Self {
        self.metadata = Some(metadata as Arc<dyn MetadataSource>);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Observer inherited by every node of the hierarchy.
    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Creates the process root, failing with `RootCreationForbidden` when
    /// one already exists.
    pub fn install(self) -> DiResult<Injector> {
        if RootInjector::is_installed() {
            return Err(DiError::RootCreationForbidden);
        }
        let root = self.into_injector();
        PROCESS_ROOT
            .set(root.clone())
            .map_err(|_| DiError::RootCreationForbidden)?;
        tracing::debug!(injector = %root.name(), "root injector installed");
        Ok(root)
    }

    fn into_injector(self) -> Injector {
        let metadata = self
            .metadata
            .unwrap_or_else(|| MetadataRegistry::global() as Arc<dyn MetadataSource>);
        Injector::from_parts(
            self.config.root_name.clone(),
            None,
            metadata,
            Arc::new(self.config),
            self.observers,
        )
    }
}

impl Injector {
    /// The process root, created with defaults on first use.
    pub fn root() -> Injector {
        PROCESS_ROOT
            .get_or_init(|| RootInjector::builder().into_injector())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_root_is_forbidden() {
        let root = Injector::root();
        assert!(root.is_root());
        assert!(RootInjector::is_installed());
        assert!(matches!(
            RootInjector::builder().install(),
            Err(DiError::RootCreationForbidden)
        ));

        let child = Injector::create("Child", None);
        assert_eq!(child.parent().map(|p| p.inner.id), Some(root.inner.id));
    }
}
