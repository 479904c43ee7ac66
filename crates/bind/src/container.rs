//! Type-keyed registry of shared services handed to handlers through their `Context`.
//!
//! Services are provided once, at startup, and resolved by type afterwards. A process-wide
//! container is available through [`Container::global`]; compiling a handler takes a
//! snapshot of it unless an explicit container is supplied.

use crate::response::StatusCoder;
use arc_swap::ArcSwap;
use http::StatusCode;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("no service of type `{type_name}` has been provided")]
    Missing { type_name: &'static str },
}

impl StatusCoder for ContainerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// An immutable map from service type to a shared instance.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

static GLOBAL_CONTAINER: Lazy<ArcSwap<Container>> = Lazy::new(|| ArcSwap::from_pointee(Container::default()));

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// The current process-wide container.
    pub fn global() -> Arc<Container> {
        GLOBAL_CONTAINER.load_full()
    }

    /// Replaces the process-wide container. Handlers compiled earlier keep the snapshot
    /// they were built with.
    pub fn set_global(container: Container) {
        GLOBAL_CONTAINER.store(Arc::new(container));
    }

    pub fn get<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        let service = self.services.get(&TypeId::of::<S>())?;
        Arc::clone(service).downcast::<S>().ok()
    }

    pub fn resolve<S: Any + Send + Sync>(&self) -> Result<Arc<S>, ContainerError> {
        self.get::<S>().ok_or(ContainerError::Missing { type_name: type_name::<S>() })
    }

    pub fn contains<S: Any + Send + Sync>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container").field("services", &self.names).finish()
    }
}

#[derive(Debug, Default)]
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides a service. Providing the same type twice keeps the latest instance.
    #[must_use]
    pub fn provide<S: Any + Send + Sync>(self, service: S) -> Self {
        self.provide_shared(Arc::new(service))
    }

    #[must_use]
    pub fn provide_shared<S: Any + Send + Sync>(mut self, service: Arc<S>) -> Self {
        let previous = self.container.services.insert(TypeId::of::<S>(), service);
        if previous.is_none() {
            self.container.names.push(type_name::<S>());
        }
        self
    }

    pub fn build(self) -> Container {
        self.container
    }
}
