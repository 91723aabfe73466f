use crate::{AdmissionGate, ResilienceError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that admits each request through an [`AdmissionGate`].
///
/// Every layered service shares the gate, so they all draw from one pool of permits.
#[derive(Clone, Debug)]
pub struct AdmissionLayer {
    gate: AdmissionGate,
}

impl AdmissionLayer {
    /// Create a new admission layer.
    pub fn new(gate: AdmissionGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService { inner: service, gate: self.gate.clone() }
    }
}

/// Middleware service that takes one permit per request before calling the inner service.
#[derive(Clone, Debug)]
pub struct AdmissionService<S> {
    inner: S,
    gate: AdmissionGate,
}

impl<S> AdmissionService<S> {
    /// Wrap `inner` directly.
    pub fn new(inner: S, gate: AdmissionGate) -> Self {
        Self { inner, gate }
    }

    /// The gate requests are admitted through.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl<S, Req> Service<Req> for AdmissionService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + Sync + std::error::Error + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = ResilienceError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(ResilienceError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let gate = self.gate.clone();
        // Keep the instance that was driven to readiness; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let _permit = gate.acquire_async().await?;
            inner.call(req).await.map_err(ResilienceError::Inner)
        })
    }
}
