use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use studio_core::account::AccountStore;
use studio_core::backend::{BackendResponse, GenerationBackend, GenerationRequest};
use studio_core::catalog::BackendId;
use studio_core::error::{BackendError, SessionError};
use studio_core::history::{HistoryEntry, ResultRef};
use studio_core::notify::{Notice, Notifier};

use crate::snapshot::SessionSnapshot;
use crate::timeline::Timeline;

/// Undo/redo history of generated images, with every generation paid for in
/// credits from an external account.
///
/// Credits are checked before the remote call and deducted only after it
/// produced a usable result. One submission may be outstanding at a time;
/// a concurrent one fails with [`SessionError::AlreadyInProgress`].
pub struct GenerationSession {
    id: String,
    initial: Option<ResultRef>,
    timeline: Mutex<Timeline>,
    account: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission settles or its future is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl GenerationSession {
    pub fn new(
        initial: Option<ResultRef>,
        account: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let timeline = match &initial {
            Some(r) => Timeline::with_initial(HistoryEntry::original(r.clone())),
            None => Timeline::new(),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            initial,
            timeline: Mutex::new(timeline),
            account,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn restore(
        snapshot: SessionSnapshot,
        account: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SessionError> {
        let timeline = Timeline::from_parts(snapshot.entries, snapshot.current_index)
            .map_err(SessionError::CorruptSnapshot)?;
        tracing::debug!(session = %snapshot.id, entries = timeline.len(), "session restored");
        Ok(Self {
            id: snapshot.id,
            initial: snapshot.initial,
            timeline: Mutex::new(timeline),
            account,
            notifier,
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let timeline = self.timeline();
        SessionSnapshot {
            id: self.id.clone(),
            initial: self.initial.clone(),
            entries: timeline.entries().to_vec(),
            current_index: timeline.current_index(),
            saved_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn timeline(&self) -> MutexGuard<'_, Timeline> {
        // Timeline mutations cannot panic halfway, so a poisoned lock is still consistent
        self.timeline.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one credit-gated generation.
    ///
    /// `remote_call` is invoked at most once, and only after the balance
    /// covers `cost`. On any error neither history nor credits change.
    pub async fn submit<F, Fut>(
        &self,
        description: impl Into<String>,
        cost: u64,
        remote_call: F,
    ) -> Result<ResultRef, SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BackendResponse, BackendError>>,
    {
        self.submit_tagged(description.into(), cost, None, remote_call)
            .await
    }

    /// Price `request` from the backend's catalog entry and submit it.
    ///
    /// Edit backends without an explicit source image work on the current result.
    pub async fn run(
        &self,
        backend: &dyn GenerationBackend,
        mut request: GenerationRequest,
    ) -> Result<ResultRef, SessionError> {
        let info = backend.info();
        if info.requires_source_image() && request.source_image.is_none() {
            request.source_image = self.current_result();
        }
        let Some(cost) = info.cost(request.resolution) else {
            let err = SessionError::InvalidRequest(format!(
                "{} does not support {} output",
                info.display_name, request.resolution
            ));
            self.notifier.notify(Notice::error(err.to_string()));
            return Err(err);
        };

        let description = request.prompt.clone();
        self.submit_tagged(description, cost, Some(info.id), || {
            backend.generate(&request)
        })
        .await
    }

    async fn submit_tagged<F, Fut>(
        &self,
        description: String,
        cost: u64,
        backend: Option<BackendId>,
        remote_call: F,
    ) -> Result<ResultRef, SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BackendResponse, BackendError>>,
    {
        let outcome = self.attempt(description, cost, backend, remote_call).await;

        match &outcome {
            Ok(_) => self.notifier.notify(Notice::success(format!(
                "Image ready ({cost} credit{} used)",
                if cost == 1 { "" } else { "s" }
            ))),
            // The caller's own double submit; nothing for the user to see
            Err(SessionError::AlreadyInProgress) => {}
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "generation failed");
                self.notifier.notify(Notice::error(e.to_string()));
            }
        }
        outcome
    }

    async fn attempt<F, Fut>(
        &self,
        description: String,
        cost: u64,
        backend: Option<BackendId>,
        remote_call: F,
    ) -> Result<ResultRef, SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BackendResponse, BackendError>>,
    {
        if cost == 0 {
            return Err(SessionError::InvalidCost);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!(session = %self.id, "rejecting overlapping submission");
            return Err(SessionError::AlreadyInProgress);
        };

        let available = self.account.get_credits().await?;
        if available < cost {
            return Err(SessionError::InsufficientCredits {
                required: cost,
                available,
            });
        }

        tracing::debug!(session = %self.id, cost, available, "dispatching generation");
        let result = classify(remote_call().await)?;

        // Nothing charged means nothing kept
        self.account.deduct_credits(cost).await?;

        let discarded = self
            .timeline()
            .push(HistoryEntry::new(result.clone(), description, backend));
        if discarded > 0 {
            self.notifier.notify(Notice::info(format!(
                "Discarded {discarded} undone result{}",
                if discarded == 1 { "" } else { "s" }
            )));
        }

        tracing::info!(
            session = %self.id,
            cost,
            discarded,
            backend = backend.map(|b| b.as_str()).unwrap_or("custom"),
            "generation recorded"
        );
        Ok(result)
    }

    pub fn undo(&self) -> Option<ResultRef> {
        let mut timeline = self.timeline();
        let result = timeline.undo().map(|e| e.result.clone());
        if result.is_some() {
            tracing::debug!(session = %self.id, index = ?timeline.current_index(), "undo");
        }
        result
    }

    pub fn redo(&self) -> Option<ResultRef> {
        let mut timeline = self.timeline();
        let result = timeline.redo().map(|e| e.result.clone());
        if result.is_some() {
            tracing::debug!(session = %self.id, index = ?timeline.current_index(), "redo");
        }
        result
    }

    pub fn current_result(&self) -> Option<ResultRef> {
        self.timeline()
            .current()
            .map(|e| e.result.clone())
            .or_else(|| self.initial.clone())
    }

    pub fn current_entry(&self) -> Option<HistoryEntry> {
        self.timeline().current().cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.timeline().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.timeline().can_redo()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.timeline().entries().to_vec()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.timeline().current_index()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn credits(&self) -> Result<u64, SessionError> {
        Ok(self.account.get_credits().await?)
    }
}

/// Map a remote answer onto a usable reference or a session error.
fn classify(outcome: Result<BackendResponse, BackendError>) -> Result<ResultRef, SessionError> {
    let response = outcome?;
    if !response.success {
        return Err(SessionError::RemoteRejected(
            response
                .message
                .unwrap_or_else(|| "request rejected by the service".into()),
        ));
    }
    response
        .usable_reference()
        .cloned()
        .ok_or(SessionError::InvalidResult)
}
