//! The reveal protocol.
//!
//! Each region moves through three states:
//!
//! ```text
//!             request sent          success
//! Redacted ───────────────► Pending ────────► Revealed (terminal)
//!     ▲                        │
//!     └────────────────────────┘
//!        denied / failed
//! ```
//!
//! A reveal for a region that is already Pending joins the request in
//! flight instead of sending another one. Results are committed only if the
//! session they were requested under is still loaded.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use veil_client::{Backend, ClientError, RevealRequest, RevealResponse};
use veil_core::{RegionId, RevealedContent};
use veil_store::{PutResult, SessionEpoch};

use crate::state::{PendingReveal, ViewState};

/// Message shown when the backend requires the Reviewer role.
pub const DENIED_MESSAGE: &str = "Reviewer role required. Toggle Reviewer.";
/// Message shown for any other reveal failure.
pub const REVEAL_FAILED_MESSAGE: &str = "Decrypt failed";
/// Message shown when an upload fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed";
/// Message shown when a stored image cannot be reopened.
pub const OPEN_FAILED_MESSAGE: &str = "Open failed";

/// Reveal state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RevealState {
    /// Content hidden; a reveal may be requested.
    #[default]
    Redacted,
    /// A reveal request is in flight.
    Pending,
    /// Content is in the cache. Terminal for the session.
    Revealed,
}

/// Result of asking to reveal a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// The region's content is available. `cached` is true when no request
    /// was needed.
    Revealed {
        content: RevealedContent,
        cached: bool,
    },
    /// The backend requires the Reviewer role.
    Denied,
    /// Transport, status or format failure. The region can be retried.
    Failed { reason: String },
    /// The session changed while the request was in flight; the result was
    /// discarded.
    Stale,
    /// The region is not part of the current session.
    UnknownRegion,
    /// The region has no identifier and cannot be revealed.
    ViewOnly,
}

impl RevealOutcome {
    /// Revealed content, if any.
    pub fn content(&self) -> Option<&RevealedContent> {
        match self {
            RevealOutcome::Revealed { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self, RevealOutcome::Revealed { .. })
    }
}

/// A user-visible notice produced by a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A reveal was refused for lack of the Reviewer role.
    RevealDenied { region: RegionId },
    /// A reveal failed for any other reason.
    RevealFailed { region: RegionId, reason: String },
    /// An upload did not produce a session.
    UploadFailed { reason: String },
    /// A stored image could not be reopened.
    OpenFailed { reason: String },
}

impl Notice {
    /// The text shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            Notice::RevealDenied { .. } => DENIED_MESSAGE,
            Notice::RevealFailed { .. } => REVEAL_FAILED_MESSAGE,
            Notice::UploadFailed { .. } => UPLOAD_FAILED_MESSAGE,
            Notice::OpenFailed { .. } => OPEN_FAILED_MESSAGE,
        }
    }

    /// The region this notice is about, if any.
    pub fn region(&self) -> Option<&RegionId> {
        match self {
            Notice::RevealDenied { region } | Notice::RevealFailed { region, .. } => Some(region),
            Notice::UploadFailed { .. } | Notice::OpenFailed { .. } => None,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a reveal response could not be committed.
enum Rejection {
    Denied,
    Failed(String),
}

/// Either an immediate outcome or a reveal in flight.
enum Ticket {
    Ready(RevealOutcome),
    Waiting(PendingReveal),
}

impl Ticket {
    async fn outcome(self) -> RevealOutcome {
        match self {
            Ticket::Ready(outcome) => outcome,
            Ticket::Waiting(mut rx) => {
                let outcome = match rx.wait_for(Option::is_some).await {
                    Ok(value) => (*value).clone(),
                    Err(_) => None,
                };
                outcome.unwrap_or_else(|| RevealOutcome::Failed {
                    reason: "reveal task ended without a result".into(),
                })
            }
        }
    }
}

/// Drives reveal requests against a backend and commits their results.
pub struct RevealController<B> {
    backend: Arc<B>,
    state: Arc<Mutex<ViewState>>,
}

impl<B> Clone for RevealController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: Backend + 'static> RevealController<B> {
    pub(crate) fn new(backend: Arc<B>, state: Arc<Mutex<ViewState>>) -> Self {
        Self { backend, state }
    }

    /// Reveal one region of the current session.
    ///
    /// Never fails: every error is classified into an outcome, and denials
    /// and failures also leave a [`Notice`].
    pub async fn reveal(&self, id: &RegionId) -> RevealOutcome {
        self.begin(id).await.outcome().await
    }

    /// Reveal several regions, one request per region, all in flight at once.
    ///
    /// Outcomes are returned in input order.
    pub async fn reveal_many(&self, ids: &[RegionId]) -> Vec<RevealOutcome> {
        let mut tickets = Vec::with_capacity(ids.len());
        for id in ids {
            tickets.push(self.begin(id).await);
        }

        let mut outcomes = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            outcomes.push(ticket.outcome().await);
        }
        outcomes
    }

    async fn begin(&self, id: &RegionId) -> Ticket {
        let mut state = self.state.lock().await;

        let Some(session) = state.store.current() else {
            debug!(region = %id, "reveal without a session");
            return Ticket::Ready(RevealOutcome::UnknownRegion);
        };
        if !session.contains(id) {
            debug!(region = %id, image_id = %session.image_id, "reveal of unknown region");
            return Ticket::Ready(RevealOutcome::UnknownRegion);
        }
        if let Some(content) = state.cache.get(id) {
            return Ticket::Ready(RevealOutcome::Revealed {
                content: content.clone(),
                cached: true,
            });
        }
        if let Some(rx) = state.pending.get(id) {
            debug!(region = %id, "joining reveal in flight");
            return Ticket::Waiting(rx.clone());
        }

        let epoch = state.store.epoch();
        let role = state.role;
        let (tx, rx) = watch::channel(None);
        state.pending.insert(id.clone(), rx.clone());
        drop(state);

        debug!(region = %id, image_id = %session.image_id, ?role, %epoch, "sending reveal request");

        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.state);
        let image_id = session.image_id.clone();
        let id = id.clone();
        let region = id.clone();
        tokio::spawn(async move {
            // The call runs in its own task so that a panic in the backend
            // still reaches commit and clears the pending entry.
            let call = tokio::spawn(async move {
                let request = RevealRequest::single(region);
                backend.reveal(&image_id, &request, role).await
            });
            let result = match call.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(region = %id, error = %e, "reveal task aborted");
                    Err(ClientError::Transport(format!("reveal task aborted: {e}")))
                }
            };
            let outcome = commit(&shared, &id, epoch, result).await;
            tx.send_replace(Some(outcome));
        });

        Ticket::Waiting(rx)
    }
}

/// Apply a reveal result to the state, if its session is still current.
async fn commit(
    state: &Mutex<ViewState>,
    id: &RegionId,
    epoch: SessionEpoch,
    result: Result<RevealResponse, ClientError>,
) -> RevealOutcome {
    let mut state = state.lock().await;

    if !state.store.is_current(epoch) {
        debug!(region = %id, %epoch, current = %state.store.epoch(), "discarding stale reveal result");
        return RevealOutcome::Stale;
    }
    state.pending.remove(id);

    match interpret(id, result) {
        Ok(content) => {
            let content = match state.cache.put(id.clone(), content.clone()) {
                PutResult::Inserted => content,
                PutResult::AlreadyRevealed => state.cache.get(id).cloned().unwrap_or(content),
            };
            info!(
                region = %id,
                media_type = content.media_type(),
                bytes = content.bytes().len(),
                "region revealed"
            );
            RevealOutcome::Revealed {
                content,
                cached: false,
            }
        }
        Err(Rejection::Denied) => {
            warn!(region = %id, role = ?state.role, "reveal denied");
            state.notices.push(Notice::RevealDenied { region: id.clone() });
            RevealOutcome::Denied
        }
        Err(Rejection::Failed(reason)) => {
            warn!(region = %id, %reason, "reveal failed");
            state.notices.push(Notice::RevealFailed {
                region: id.clone(),
                reason: reason.clone(),
            });
            RevealOutcome::Failed { reason }
        }
    }
}

/// Classify a backend result for region `id`.
fn interpret(
    id: &RegionId,
    result: Result<RevealResponse, ClientError>,
) -> Result<RevealedContent, Rejection> {
    let response = match result {
        Ok(response) => response,
        Err(e) if e.is_forbidden() => return Err(Rejection::Denied),
        Err(e) => return Err(Rejection::Failed(e.to_string())),
    };

    let raw = response
        .content_for(id)
        .ok_or_else(|| Rejection::Failed(format!("no content returned for region {id}")))?;

    RevealedContent::from_data_url(raw).map_err(|e| Rejection::Failed(e.to_string()))
}
