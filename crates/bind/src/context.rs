use crate::container::{Container, ContainerError};
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-request context passed to typed handlers.
///
/// Carries the request's cancellation signal and the container the handler was compiled
/// with. The token is taken from the request extensions when the transport put one there,
/// otherwise it is a fresh token that is never cancelled.
#[derive(Debug, Clone)]
pub struct Context {
    cancellation: CancellationToken,
    container: Arc<Container>,
}

impl Context {
    pub fn new(cancellation: CancellationToken, container: Arc<Container>) -> Self {
        Self { cancellation, container }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes once the request is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn get<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        self.container.get::<S>()
    }

    pub fn resolve<S: Any + Send + Sync>(&self) -> Result<Arc<S>, ContainerError> {
        self.container.resolve::<S>()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(CancellationToken::new(), Arc::new(Container::default()))
    }
}
