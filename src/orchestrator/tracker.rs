//! Registry of tracked asynchronous requests.
//!
//! Each request runs on its own tokio task under a well-known key; observers
//! read its status from the registry or follow the event channel.

use crate::model::ExportEvent;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinError, JoinHandle};

/// Well-known request identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKey {
    DownloadFiles,
}

impl RequestKey {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKey::DownloadFiles => "downloadFiles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    InProgress,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    statuses: Arc<Mutex<HashMap<RequestKey, RequestStatus>>>,
    event_tx: Option<UnboundedSender<ExportEvent>>,
}

/// Handle to a dispatched request.
pub struct TrackedRequest<T, E> {
    key: RequestKey,
    handle: JoinHandle<Result<T, E>>,
}

impl<T, E> TrackedRequest<T, E>
where
    E: From<JoinError>,
{
    pub fn key(&self) -> RequestKey {
        self.key
    }

    /// Wait for the request to finish and return its outcome.
    pub async fn wait(self) -> Result<T, E> {
        match self.handle.await {
            Ok(res) => res,
            Err(e) => Err(e.into()),
        }
    }
}

impl RequestTracker {
    pub fn new(event_tx: Option<UnboundedSender<ExportEvent>>) -> Self {
        Self {
            statuses: Arc::default(),
            event_tx,
        }
    }

    pub fn status(&self, key: RequestKey) -> Option<RequestStatus> {
        self.lock().get(&key).cloned()
    }

    /// Start `fut` under `key` and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track<T, E, Fut>(&self, key: RequestKey, fut: Fut) -> TrackedRequest<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.set_status(key, RequestStatus::InProgress);
        self.emit(ExportEvent::RequestStarted {
            key: key.as_str().to_string(),
        });
        tracing::debug!(key = key.as_str(), "request dispatched");

        let tracker = self.clone();
        let handle = tokio::spawn(async move {
            let res = fut.await;
            match &res {
                Ok(_) => {
                    tracker.set_status(key, RequestStatus::Completed);
                    tracker.emit(ExportEvent::RequestCompleted {
                        key: key.as_str().to_string(),
                    });
                    tracing::debug!(key = key.as_str(), "request completed");
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(key = key.as_str(), error = %message, "request failed");
                    tracker.set_status(key, RequestStatus::Failed(message.clone()));
                    tracker.emit(ExportEvent::RequestFailed {
                        key: key.as_str().to_string(),
                        message,
                    });
                }
            }
            res
        });

        TrackedRequest { key, handle }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestKey, RequestStatus>> {
        self.statuses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, key: RequestKey, status: RequestStatus) {
        self.lock().insert(key, status);
    }

    fn emit(&self, event: ExportEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
