//! Connection handler: binds one socket to one conversation's stream.
//!
//! Lifecycle: `Pending` (token issued, no socket) → `Replaying` (socket
//! attached, backlog in flight) → `Streaming` (live messages flow) →
//! `Closed`. A handler accepts at most one socket in its lifetime.
//!
//! All mutable state sits behind one async mutex. Every delivery holds it
//! across the watermark bump and the transport send, so frames never
//! interleave and the cursor always matches what the transport accepted.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use convey_core::error::{AppError, ErrorKind};
use convey_core::result::AppResult;
use convey_core::traits::{MessageListener, MessageStore, Subscription, Transport};
use convey_core::types::{ConversationId, Message, StreamId};

use crate::message::frame::DeliveryFrame;
use crate::metrics::EngineMetrics;
use crate::metrics::delivery;

use super::live::LiveStream;

/// Live messages a handler queues while its socket is busy. A stream that
/// falls further behind is closed; the client resumes from its watermark.
pub const LIVE_QUEUE_CAPACITY: usize = 1024;

/// Lifecycle phase of a [`ConnectionHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerPhase {
    /// Registered under a token, no socket yet.
    Pending,
    /// Socket attached, backlog being replayed.
    Replaying,
    /// Backlog flushed, live messages flowing.
    Streaming,
    /// Terminal.
    Closed,
}

impl fmt::Display for HandlerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Replaying => write!(f, "replaying"),
            Self::Streaming => write!(f, "streaming"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

struct HandlerState {
    phase: HandlerPhase,
    watermark: u64,
    transport: Option<Arc<dyn Transport>>,
    subscription: Option<Subscription>,
    /// Ids carried by the backlog. Live copies of these are dropped until
    /// the first live message outside the set arrives.
    replay_window: HashSet<String>,
}

/// Streams one conversation to one socket, tracking the resume watermark.
pub struct ConnectionHandler {
    conversation_id: ConversationId,
    date_issued: DateTime<Utc>,
    store: Arc<dyn MessageStore>,
    state: Mutex<HandlerState>,
    /// Mirror of the watermark for lock-free reads.
    watermark: AtomicU64,
    /// Bound on the live queue between the store listener and the pump.
    live_capacity: usize,
    metrics: Arc<EngineMetrics>,
}

impl fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("conversation_id", &self.conversation_id)
            .field("date_issued", &self.date_issued)
            .field("watermark", &self.watermark())
            .finish()
    }
}

impl ConnectionHandler {
    /// Creates a pending handler.
    pub fn new(
        conversation_id: ConversationId,
        store: Arc<dyn MessageStore>,
        date_issued: DateTime<Utc>,
        watermark: u64,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            conversation_id,
            date_issued,
            store,
            state: Mutex::new(HandlerState {
                phase: HandlerPhase::Pending,
                watermark,
                transport: None,
                subscription: None,
                replay_window: HashSet::new(),
            }),
            watermark: AtomicU64::new(watermark),
            live_capacity: LIVE_QUEUE_CAPACITY,
            metrics,
        }
    }

    /// Overrides the live queue bound.
    pub fn with_live_capacity(mut self, capacity: usize) -> Self {
        self.live_capacity = capacity.max(1);
        self
    }

    /// Conversation this handler streams.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// When the handler (and its token) was issued.
    pub fn date_issued(&self) -> DateTime<Utc> {
        self.date_issued
    }

    /// Messages delivered so far, counting any resume offset.
    pub fn watermark(&self) -> u64 {
        self.watermark.load(Ordering::SeqCst)
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> HandlerPhase {
        self.state.lock().await.phase
    }

    /// Whether the token lifetime `ttl` has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        match self.date_issued.checked_add_signed(ttl) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Attaches a socket, replays the backlog, then starts live streaming.
    ///
    /// The store listener is attached before history is fetched, so a
    /// message appended in between is never lost; if it shows up both in
    /// the backlog and live, the live copy is dropped by id.
    ///
    /// Fails with `DoubleBind` if a socket was ever bound before, and with
    /// `StoreUnavailable` or `Delivery` if the replay fails. A failed
    /// replay leaves the handler closed.
    pub async fn bind(self: &Arc<Self>, transport: Arc<dyn Transport>) -> AppResult<LiveStream> {
        let mut state = self.state.lock().await;
        if state.phase != HandlerPhase::Pending {
            warn!(
                conversation_id = %self.conversation_id,
                phase = %state.phase,
                "Rejected second bind"
            );
            return Err(AppError::double_bind(format!(
                "Handler for conversation {} is {}",
                self.conversation_id, state.phase
            )));
        }

        state.phase = HandlerPhase::Replaying;
        state.transport = Some(transport);

        let (live_tx, live_rx) = mpsc::channel(self.live_capacity);
        let lagged = Arc::new(AtomicBool::new(false));
        let feed = Arc::new(ConversationFeed {
            conversation_id: self.conversation_id.clone(),
            live_tx,
            lagged: lagged.clone(),
        });
        state.subscription = Some(self.store.subscribe(feed));

        info!(
            conversation_id = %self.conversation_id,
            watermark = state.watermark,
            "Opening conversation stream"
        );

        let history = match self.store.get_messages(&self.conversation_id).await {
            Ok(history) => history,
            Err(e) => {
                error!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Backlog fetch failed"
                );
                self.close_locked(&mut state);
                return Err(match e.kind {
                    ErrorKind::StoreUnavailable => e,
                    _ => AppError::with_source(
                        ErrorKind::StoreUnavailable,
                        format!("Failed to read conversation {}", self.conversation_id),
                        e,
                    ),
                });
            }
        };

        let replay_window: HashSet<String> =
            history.iter().filter_map(|m| m.id.clone()).collect();
        let skip = usize::try_from(state.watermark).unwrap_or(usize::MAX);
        let backlog: Vec<Message> = history.into_iter().skip(skip).collect();

        if let Err(e) = self.send_locked(&mut state, backlog, true).await {
            self.close_locked(&mut state);
            return Err(e);
        }

        state.replay_window = replay_window;
        state.phase = HandlerPhase::Streaming;
        drop(state);

        let handler = Arc::clone(self);
        let pump = tokio::spawn(async move { handler.run_live(live_rx, lagged).await });

        Ok(LiveStream::new(StreamId::new(), Arc::clone(self), pump))
    }

    /// Sends `messages` as one frame and advances the watermark by their
    /// count.
    ///
    /// A no-op returning `Ok` when no socket is bound. On transport
    /// failure the watermark is unchanged and the error is returned.
    pub async fn deliver(&self, messages: Vec<Message>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.send_locked(&mut state, messages, true).await
    }

    /// Sends `messages` in a frame with a null watermark, leaving the
    /// cursor where it is.
    pub async fn deliver_untracked(&self, messages: Vec<Message>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.send_locked(&mut state, messages, false).await
    }

    /// Unsubscribes from the store and drops the socket. Idempotent.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        self.close_locked(&mut state);
    }

    async fn run_live(
        &self,
        mut live_rx: mpsc::Receiver<Message>,
        lagged: Arc<AtomicBool>,
    ) -> AppResult<()> {
        while let Some(message) = live_rx.recv().await {
            if lagged.load(Ordering::SeqCst) {
                delivery::record_failure(&self.metrics);
                error!(
                    conversation_id = %self.conversation_id,
                    capacity = self.live_capacity,
                    watermark = self.watermark(),
                    "Live queue overflowed, closing stream"
                );
                self.close().await;
                return Err(AppError::delivery(format!(
                    "Stream for conversation {} fell behind live traffic",
                    self.conversation_id
                )));
            }
            if let Err(e) = self.deliver_live(message).await {
                error!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Live delivery failed, closing stream"
                );
                self.close().await;
                return Err(e);
            }
        }
        debug!(conversation_id = %self.conversation_id, "Live feed ended");
        Ok(())
    }

    async fn deliver_live(&self, message: Message) -> AppResult<()> {
        let mut state = self.state.lock().await;

        if !state.replay_window.is_empty() {
            let replayed = message
                .id
                .as_ref()
                .is_some_and(|id| state.replay_window.contains(id));
            if replayed {
                delivery::record_duplicate(&self.metrics);
                debug!(
                    conversation_id = %self.conversation_id,
                    message_id = ?message.id,
                    "Skipping live copy of replayed message"
                );
                return Ok(());
            }
            state.replay_window = HashSet::new();
        }

        self.send_locked(&mut state, vec![message], true).await
    }

    async fn send_locked(
        &self,
        state: &mut HandlerState,
        messages: Vec<Message>,
        tracked: bool,
    ) -> AppResult<()> {
        let Some(transport) = state.transport.clone() else {
            return Ok(());
        };

        let count = messages.len() as u64;
        let next = if tracked {
            state.watermark.checked_add(count).ok_or_else(|| {
                AppError::validation(format!(
                    "Watermark {} cannot advance by {count}",
                    state.watermark
                ))
            })?
        } else {
            state.watermark
        };
        let frame = if tracked {
            DeliveryFrame::tracked(messages, next)
        } else {
            DeliveryFrame::untracked(messages)
        };

        if let Err(e) = transport.send(frame.encode()?).await {
            delivery::record_failure(&self.metrics);
            error!(
                conversation_id = %self.conversation_id,
                error = %e,
                "Error sending to socket"
            );
            return Err(e);
        }

        state.watermark = next;
        self.watermark.store(next, Ordering::SeqCst);
        delivery::record_frame(&self.metrics, count);
        debug!(
            conversation_id = %self.conversation_id,
            count,
            watermark = next,
            "Frame delivered"
        );
        Ok(())
    }

    fn close_locked(&self, state: &mut HandlerState) {
        if state.phase == HandlerPhase::Closed {
            return;
        }
        if let Some(mut subscription) = state.subscription.take() {
            subscription.unsubscribe();
        }
        state.transport = None;
        state.replay_window = HashSet::new();
        state.phase = HandlerPhase::Closed;
        info!(
            conversation_id = %self.conversation_id,
            watermark = state.watermark,
            "Conversation stream closed"
        );
    }
}

/// Store listener feeding a bound handler.
///
/// Receives every message in the store and forwards only those of its
/// conversation, in callback order, to the handler's live pump.
struct ConversationFeed {
    conversation_id: ConversationId,
    live_tx: mpsc::Sender<Message>,
    /// Set once a message had to be dropped.
    lagged: Arc<AtomicBool>,
}

impl MessageListener for ConversationFeed {
    fn on_message(&self, message: &Message) {
        if !message.belongs_to(&self.conversation_id) {
            return;
        }
        match self.live_tx.try_send(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if !self.lagged.swap(true, Ordering::SeqCst) {
                    warn!(
                        conversation_id = %self.conversation_id,
                        "Live queue full, stream will be closed"
                    );
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    conversation_id = %self.conversation_id,
                    "Live pump gone, dropping message"
                );
            }
        }
    }
}
