//! Fakes shared by the pipeline's unit tests

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use transport::{RequestDescriptor, Transport, TransportResult};

use crate::teardown::{SessionListener, TeardownReason};

type Handler = Box<dyn Fn(&RequestDescriptor) -> TransportResult + Send + Sync>;

/// Transport answering from a closure and recording every request it sees.
///
/// A request is recorded before it waits on the optional gate, so tests can
/// observe in-flight calls and release them one permit at a time.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<RequestDescriptor>>,
    gate: Option<(String, Arc<Semaphore>)>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&RequestDescriptor) -> TransportResult + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold requests to `path` until the returned semaphore grants a permit.
    pub fn gated(
        path: &str,
        handler: impl Fn(&RequestDescriptor) -> TransportResult + Send + Sync + 'static,
    ) -> (Self, Arc<Semaphore>) {
        let semaphore = Arc::new(Semaphore::new(0));
        let mut transport = Self::new(handler);
        transport.gate = Some((path.to_string(), semaphore.clone()));
        (transport, semaphore)
    }

    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RequestDescriptor> {
        self.calls()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn id(&self) -> &str {
        "scripted"
    }

    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = TransportResult> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(request.clone());
            if let Some((path, semaphore)) = &self.gate
                && request.path() == path
            {
                semaphore.acquire().await.unwrap().forget();
            }
            (self.handler)(request)
        })
    }
}

/// Listener remembering every teardown reason it was told about.
#[derive(Default)]
pub struct RecordingListener {
    reasons: Mutex<Vec<TeardownReason>>,
}

impl RecordingListener {
    pub fn reasons(&self) -> Vec<TeardownReason> {
        self.reasons.lock().unwrap().clone()
    }
}

impl SessionListener for RecordingListener {
    fn session_ended(&self, reason: &TeardownReason) {
        self.reasons.lock().unwrap().push(reason.clone());
    }
}
