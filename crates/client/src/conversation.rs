use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::debug;

use zubi_shared::{Message, TurnResponse};

use crate::client::ApiClient;

#[derive(Default)]
struct SessionState {
    transcript: Vec<Message>,
    image: Option<String>,
    turn_count: u32,
    ended: bool,
    begun: bool,
    started_at: Option<Instant>,
    // Bumped by begin and reset; an in-flight exchange applies its
    // response only if the epoch it captured is still current.
    epoch: u64,
}

/// Client-side owner of the conversation: the transcript, the attached
/// photo, and the begin/send/end lifecycle. Clones share one session.
///
/// Callers are expected to keep at most one exchange in flight; if they
/// do not, state stays consistent — appends follow completion order and
/// responses superseded by `reset` or a new `begin` are discarded.
#[derive(Clone)]
pub struct Conversation {
    api: ApiClient,
    state: Arc<Mutex<SessionState>>,
}

impl Conversation {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Start a fresh conversation about `image`, discarding any previous
    /// session. The opening exchange carries no user text; the server
    /// side produces the opening line.
    pub async fn begin(&self, image: impl Into<String>) -> Option<TurnResponse> {
        let epoch = {
            let mut state = self.lock();
            let epoch = state.epoch + 1;
            *state = SessionState {
                image: Some(image.into()),
                begun: true,
                started_at: Some(Instant::now()),
                epoch,
                ..SessionState::default()
            };
            epoch
        };

        self.exchange(epoch).await
    }

    /// Send one child utterance. Returns `None` with no state change if
    /// the conversation has not begun or has already ended.
    pub async fn send_message(&self, text: impl Into<String>) -> Option<TurnResponse> {
        let epoch = {
            let mut state = self.lock();
            if !state.begun || state.ended {
                return None;
            }
            state.transcript.push(Message::user(text));
            state.turn_count += 1;
            state.epoch
        };

        self.exchange(epoch).await
    }

    /// Clear all state unconditionally. An exchange that was in flight
    /// when this ran will see the epoch bump and discard its response.
    pub fn reset(&self) {
        let mut state = self.lock();
        let epoch = state.epoch + 1;
        *state = SessionState {
            epoch,
            ..SessionState::default()
        };
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    pub fn turn_count(&self) -> u32 {
        self.lock().turn_count
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.lock()
            .started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    pub fn image(&self) -> Option<String> {
        self.lock().image.clone()
    }

    async fn exchange(&self, epoch: u64) -> Option<TurnResponse> {
        // Snapshot outside the lock; the HTTP round trip must not hold it.
        let (messages, image) = {
            let state = self.lock();
            (state.transcript.clone(), state.image.clone())
        };

        let result = self.api.chat(&messages, image.as_deref()).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!("discarding superseded exchange (epoch {epoch} != {})", state.epoch);
            return None;
        }

        match result {
            Ok(turn) => {
                state.transcript.push(Message::assistant(turn.say.clone()));
                if turn.end_conversation {
                    state.ended = true;
                }
                Some(turn)
            }
            Err(e) => {
                debug!("exchange failed: {e:#}");
                Some(TurnResponse::say_again())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
