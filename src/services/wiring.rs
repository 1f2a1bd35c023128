use super::descriptor::{FunctionKind, ServiceDescriptor};
use super::entity::{Entity, EntityService, ListQuery, Page};
use super::DataSourceSwitch;
use crate::fallback::FallbackManager;
use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// A remote implementation and a fallback implementation of one service,
/// routed through a shared [`FallbackManager`].
pub struct ServiceWiring<R: ?Sized, F: ?Sized> {
    descriptor: ServiceDescriptor,
    remote: Arc<R>,
    fallback: Arc<F>,
    manager: Arc<FallbackManager>,
    source: Arc<DataSourceSwitch>,
}

impl<R: ?Sized, F: ?Sized> Clone for ServiceWiring<R, F> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor,
            remote: Arc::clone(&self.remote),
            fallback: Arc::clone(&self.fallback),
            manager: Arc::clone(&self.manager),
            source: Arc::clone(&self.source),
        }
    }
}

impl<R: ?Sized, F: ?Sized> ServiceWiring<R, F> {
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn fallback(&self) -> &Arc<F> {
        &self.fallback
    }

    pub fn manager(&self) -> &Arc<FallbackManager> {
        &self.manager
    }

    /// Route an async (network-backed) function.
    ///
    /// `remote` and `fallback` receive the respective implementation; only
    /// the one(s) the current policy selects are invoked.
    pub async fn call_async<'a, T, RF, FF>(
        &'a self,
        function: &str,
        remote: impl FnOnce(&'a R) -> RF,
        fallback: impl FnOnce(&'a F) -> FF,
    ) -> Result<T>
    where
        RF: Future<Output = Result<T>>,
        FF: Future<Output = Result<T>>,
    {
        let operation = self.check(function, FunctionKind::Async);
        if self.source.is_mock() {
            debug!(operation = %operation, "mock data source, calling fallback directly");
            return fallback(&*self.fallback).await;
        }
        self.manager
            .execute_with_fallback(
                || remote(&*self.remote),
                || fallback(&*self.fallback),
                &operation,
            )
            .await
    }

    /// Route a sync lookup: remote first, fallback on any error.
    ///
    /// Does not touch the manager's failure count.
    pub fn call_sync<T>(
        &self,
        function: &str,
        remote: impl FnOnce(&R) -> Result<T>,
        fallback: impl FnOnce(&F) -> Result<T>,
    ) -> Result<T> {
        let operation = self.check(function, FunctionKind::Sync);
        if self.source.is_mock() {
            return fallback(&*self.fallback);
        }
        match remote(&*self.remote) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(operation = %operation, error = %err, "sync lookup failed, using fallback");
                fallback(&*self.fallback)
            }
        }
    }

    fn check(&self, function: &str, expected: FunctionKind) -> String {
        match self.descriptor.kind_of(function) {
            Some(kind) if kind == expected => {}
            Some(kind) => warn!(
                service = self.descriptor.name,
                function,
                declared = ?kind,
                called_as = ?expected,
                "function called with a different kind than declared"
            ),
            None => warn!(
                service = self.descriptor.name,
                function,
                "function not declared by service descriptor"
            ),
        }
        self.descriptor.operation_name(function)
    }
}

#[async_trait]
impl<E, R, F> EntityService<E> for ServiceWiring<R, F>
where
    E: Entity,
    R: EntityService<E> + ?Sized,
    F: EntityService<E> + ?Sized,
{
    async fn list(&self, query: &ListQuery) -> Result<Page<E>> {
        self.call_async("list", |r| r.list(query), |f| f.list(query))
            .await
    }

    async fn get(&self, id: &str) -> Result<E> {
        self.call_async("get", |r| r.get(id), |f| f.get(id)).await
    }

    async fn search(&self, text: &str) -> Result<Vec<E>> {
        self.call_async("search", |r| r.search(text), |f| f.search(text))
            .await
    }

    fn categories(&self) -> Result<Vec<String>> {
        self.call_sync("categories", |r| r.categories(), |f| f.categories())
    }
}

/// Builds [`ServiceWiring`]s that share one manager and one data-source switch.
#[derive(Clone)]
pub struct ServiceFactory {
    manager: Arc<FallbackManager>,
    source: Arc<DataSourceSwitch>,
}

impl ServiceFactory {
    pub fn new(manager: Arc<FallbackManager>, source: Arc<DataSourceSwitch>) -> Self {
        Self { manager, source }
    }

    /// Same switch, different manager.
    pub fn with_manager(&self, manager: Arc<FallbackManager>) -> Self {
        Self {
            manager,
            source: Arc::clone(&self.source),
        }
    }

    pub fn manager(&self) -> &Arc<FallbackManager> {
        &self.manager
    }

    pub fn source(&self) -> &Arc<DataSourceSwitch> {
        &self.source
    }

    pub fn wire<R: ?Sized, F: ?Sized>(
        &self,
        descriptor: ServiceDescriptor,
        remote: Arc<R>,
        fallback: Arc<F>,
    ) -> ServiceWiring<R, F> {
        debug!(
            service = descriptor.name,
            functions = ?descriptor.functions().collect::<Vec<_>>(),
            "wiring service"
        );
        ServiceWiring {
            descriptor,
            remote,
            fallback,
            manager: Arc::clone(&self.manager),
            source: Arc::clone(&self.source),
        }
    }
}
