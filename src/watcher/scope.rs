//! Routing of background diagnostics to an optional caller-supplied subscriber.
//!
//! Without a dispatch, tasks log through the global subscriber installed by
//! [`crate::logging`].

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

#[derive(Debug, Clone, Default)]
pub(crate) struct LogScope {
    dispatch: Option<Dispatch>,
}

impl LogScope {
    pub(crate) fn new(dispatch: Option<Dispatch>) -> Self {
        Self { dispatch }
    }

    /// Run `f` with the scoped subscriber as the default.
    pub(crate) fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Await `future` with the scoped subscriber as the default.
    pub(crate) async fn run<F: Future>(&self, future: F) -> F::Output {
        match &self.dispatch {
            Some(dispatch) => future.with_subscriber(dispatch.clone()).await,
            None => future.await,
        }
    }

    /// Spawn `future` on `runtime`, carrying the scoped subscriber with it.
    pub(crate) fn spawn<F>(&self, runtime: &Handle, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match &self.dispatch {
            Some(dispatch) => runtime.spawn(future.with_subscriber(dispatch.clone())),
            None => runtime.spawn(future),
        }
    }
}
