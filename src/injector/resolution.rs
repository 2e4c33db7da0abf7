//! The resolution algorithm.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{BoxError, DiError, DiResult};
use crate::internal::ResolutionStack;
use crate::key::Key;
use crate::provider::{AnyArc, Arguments, BoxFuture, Constructor, Dependency, Provider, ProviderKind};

use super::Injector;

impl Injector {
    /// Resolves `key` from this node, returning the first visible value.
    ///
    /// Entry point for nested lookups too: constructor parameters and factory
    /// dependencies come back through here with the caller's stack.
    pub(crate) fn resolve_value<'a>(
        &'a self,
        key: Key,
        optional: bool,
        stack: ResolutionStack,
    ) -> BoxFuture<'a, DiResult<Option<AnyArc>>> {
        Box::pin(async move {
            if self.is_self_key(&key) {
                return Ok(Some(self.self_value()));
            }
            self.resolve_internal(key, optional, Vec::new(), stack).await
        })
    }

    /// Makes sure the node owning the providers for `key` has built its
    /// instances, then returns the first instance visible from this node.
    ///
    /// `path` collects the names of the visited nodes for diagnostics.
    pub(crate) fn resolve_internal<'a>(
        &'a self,
        key: Key,
        optional: bool,
        mut path: Vec<String>,
        stack: ResolutionStack,
    ) -> BoxFuture<'a, DiResult<Option<AnyArc>>> {
        Box::pin(async move {
            self.ensure_loaded();
            path.push(self.inner.name.clone());

            let providers = self.providers_for(&key);
            let Some(head) = providers.first() else {
                return match self.parent() {
                    Some(parent) => {
                        tracing::trace!(injector = %self.inner.name, identifier = %key, "delegating to parent");
                        parent.resolve_internal(key, optional, path, stack).await
                    }
                    None if optional => Ok(None),
                    None => Err(DiError::UnresolvedProvider {
                        identifier: key.to_string(),
                        path,
                    }),
                };
            };

            let multi = head.is_multi();
            if multi {
                if let Some(parent) = self.parent() {
                    parent.resolve_internal(key.clone(), true, path, stack.clone()).await?;
                }
            }

            if let Some(first) = self.satisfied(&key, multi, providers.len()) {
                return Ok(Some(first));
            }

            let stack = stack.enter(self.inner.id, &key, self.inner.config.max_depth)?;
            tracing::trace!(injector = %self.inner.name, identifier = %key, depth = stack.depth(), "building");
            let _flight = if self.inner.config.single_flight {
                Some(self.inner.flight.acquire(&key).await)
            } else {
                None
            };

            // Another task may have finished building while we waited.
            let providers = self.providers_for(&key);
            let start = if multi {
                self.instance_count(&key)
            } else if let Some(first) = self.satisfied(&key, false, providers.len()) {
                return Ok(Some(first));
            } else {
                0
            };

            for provider in providers.iter().skip(start) {
                let value = self.instantiate(provider, &stack).await?;
                self.inner
                    .instances
                    .lock()
                    .entry(key.clone())
                    .or_default()
                    .push(value);
            }

            Ok(self.first_instance(&key))
        })
    }

    /// The root's one-shot scan of global injectables and token defaults.
    pub(crate) fn ensure_loaded(&self) {
        if let Some(loaded) = &self.inner.has_loaded {
            loaded.get_or_init(|| self.bootstrap());
        }
    }

    fn bootstrap(&self) {
        let metadata = &self.inner.metadata;
        let mut registered = 0usize;

        for (ctor, options) in metadata.global_injectables() {
            let key = ctor.key();
            if self.has_provider(&key) {
                continue;
            }
            let kind = match options.factory {
                Some(injectable) => ProviderKind::Factory {
                    factory: injectable.factory,
                    deps: injectable.deps,
                },
                None => ProviderKind::Class(ctor),
            };
            self.append_provider(Arc::new(Provider::new(key, kind)));
            registered += 1;
        }

        for (key, provider) in metadata.self_registering_tokens() {
            if self.has_provider(&key) {
                continue;
            }
            self.append_provider(provider);
            registered += 1;
        }

        tracing::debug!(injector = %self.inner.name, registered, "root bootstrap complete");
    }

    fn providers_for(&self, key: &Key) -> Vec<Arc<Provider>> {
        self.inner.providers.lock().get(key).cloned().unwrap_or_default()
    }

    fn instance_count(&self, key: &Key) -> usize {
        self.inner.instances.lock().get(key).map_or(0, Vec::len)
    }

    fn first_instance(&self, key: &Key) -> Option<AnyArc> {
        self.inner
            .instances
            .lock()
            .get(key)
            .and_then(|list| list.first().cloned())
    }

    /// First own instance when nothing is left to build for `key`.
    fn satisfied(&self, key: &Key, multi: bool, provider_count: usize) -> Option<AnyArc> {
        let instances = self.inner.instances.lock();
        let list = instances.get(key)?;
        let done = if multi {
            list.len() >= provider_count
        } else {
            !list.is_empty()
        };
        if done {
            list.first().cloned()
        } else {
            None
        }
    }

    async fn instantiate(&self, provider: &Provider, stack: &ResolutionStack) -> DiResult<AnyArc> {
        let key = provider.provide();
        let observers = &self.inner.observers;
        let started = observers.has_observers().then(Instant::now);
        if started.is_some() {
            observers.resolving(&self.inner.name, key);
        }

        let result = self.build(provider, stack).await;

        if let Some(started) = started {
            match &result {
                Ok(_) => observers.resolved(&self.inner.name, key, started.elapsed()),
                Err(error) => observers.failed(&self.inner.name, key, error),
            }
        }
        match &result {
            Ok(_) => tracing::debug!(
                injector = %self.inner.name,
                identifier = %key,
                kind = provider.kind().name(),
                "instance built"
            ),
            Err(error) => tracing::debug!(
                injector = %self.inner.name,
                identifier = %key,
                %error,
                "instance build failed"
            ),
        }
        result
    }

    async fn build(&self, provider: &Provider, stack: &ResolutionStack) -> DiResult<AnyArc> {
        match provider.kind() {
            ProviderKind::Value(value) => Ok(value.clone()),
            ProviderKind::Class(ctor) => {
                let args = self.constructor_arguments(ctor, stack).await?;
                ctor.build(args)
                    .await
                    .map_err(|source| construction_error(provider.provide(), source))
            }
            ProviderKind::Factory { factory, deps } => {
                let args = self.dependency_arguments(deps, stack).await?;
                factory
                    .create(args)
                    .await
                    .map_err(|source| construction_error(provider.provide(), source))
            }
        }
    }

    /// Resolves constructor positions one after the other through this node.
    async fn constructor_arguments(&self, ctor: &Constructor, stack: &ResolutionStack) -> DiResult<Arguments> {
        let metadata = &self.inner.metadata;
        let targets = metadata.parameter_targets(ctor);
        let optional = metadata.parameter_optional(ctor);

        let mut args = Arguments::with_capacity(targets.len());
        for (position, target) in targets.into_iter().enumerate() {
            let is_optional = optional.get(position).copied().flatten().unwrap_or(false);
            match target {
                Some(target) => {
                    let key = target.key();
                    let value = self.resolve_value(key.clone(), is_optional, stack.clone()).await?;
                    args.push(Some(key), value);
                }
                None if is_optional => args.push(None, None),
                None => {
                    return Err(DiError::MissingDependency {
                        target: format!("{} parameter", ctor.type_name()),
                        position,
                    })
                }
            }
        }
        Ok(args)
    }

    async fn dependency_arguments(&self, deps: &[Dependency], stack: &ResolutionStack) -> DiResult<Arguments> {
        let mut args = Arguments::with_capacity(deps.len());
        for dependency in deps {
            let key = dependency.target.key();
            let value = self
                .resolve_value(key.clone(), dependency.optional, stack.clone())
                .await?;
            args.push(Some(key), value);
        }
        Ok(args)
    }
}

/// Wraps an error from user code, unwrapping engine errors it propagated.
fn construction_error(key: &Key, source: BoxError) -> DiError {
    match source.downcast::<DiError>() {
        Ok(error) => *error,
        Err(source) => DiError::Construction {
            identifier: key.to_string(),
            source,
        },
    }
}
