//! # Playground Session
//!
//! Client-side state of one playground: prompt settings, the recent prompt
//! log and the primary/compare response sessions.

use crate::{
    consumer::{CancelHandle, ConsumeOutcome, RelayClient, StreamObserver, StreamSession},
    coordinator::{run_compare, run_single},
    history::RecentPromptLog,
    models::{DEFAULT_COMPARE_MODEL_ID, DEFAULT_MODEL_ID},
    schemas::{CompletionRequest, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE},
};
use std::sync::{Arc, Mutex};

/// Cancels the run the owning [`Playground`] is executing, or is about to.
///
/// [`Playground::stop_handle`] arms a token for the next submit, so a stop
/// issued between obtaining the handle and the run starting is honoured: that
/// run ends as cancelled right away. Stopping when nothing is armed or running
/// does nothing.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    state: Arc<Mutex<StopState>>,
}

#[derive(Debug, Default)]
struct StopState {
    current: CancelHandle,
    /// `current` is reserved for the next run and not yet used
    armed: bool,
    running: bool,
}

impl StopHandle {
    pub fn stop(&self) {
        self.lock().current.cancel();
    }

    /// Reserve a fresh token for the next run, unless one is already armed or
    /// a run holds the current one.
    fn arm(&self) {
        let mut state = self.lock();
        if !state.armed && !state.running {
            state.current = CancelHandle::new();
            state.armed = true;
        }
    }

    /// Token for a run that starts now.
    fn begin_run(&self) -> CancelHandle {
        let mut state = self.lock();
        if !state.armed {
            state.current = CancelHandle::new();
        }
        state.armed = false;
        state.running = true;
        state.current.clone()
    }

    fn end_run(&self) {
        self.lock().running = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StopState> {
        // The guarded value is plain flags and a token; a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Result of one [`Playground::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Single(ConsumeOutcome),
    Compare(ConsumeOutcome, ConsumeOutcome),
}

#[derive(Debug)]
pub struct Playground {
    pub prompt: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub compare_mode: bool,
    pub compare_model: String,
    pub history: RecentPromptLog,
    pub primary: StreamSession,
    pub compare: StreamSession,
    client: RelayClient,
    stop: StopHandle,
}

impl Playground {
    pub fn new(client: RelayClient) -> Self {
        Self {
            prompt: String::new(),
            system_prompt: String::new(),
            model: DEFAULT_MODEL_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            compare_mode: false,
            compare_model: DEFAULT_COMPARE_MODEL_ID.to_string(),
            history: RecentPromptLog::new(),
            primary: StreamSession::new(DEFAULT_MODEL_ID),
            compare: StreamSession::new(DEFAULT_COMPARE_MODEL_ID),
            client,
            stop: StopHandle::default(),
        }
    }

    pub fn with_history(mut self, history: RecentPromptLog) -> Self {
        self.history = history;
        self
    }

    /// Handle for stopping the next or current run. Arms the next run when idle.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.arm();
        self.stop.clone()
    }

    /// Request for `model` built from the current settings.
    pub fn request_for(&self, model: &str) -> CompletionRequest {
        CompletionRequest::new(self.prompt.clone(), model)
            .with_system_prompt(self.system_prompt.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Run the current prompt. Returns `None` when the prompt is blank.
    ///
    /// Primary-session deltas are also passed to `watcher` in single mode.
    pub async fn submit_with<W>(&mut self, watcher: &mut W) -> Option<RunOutcome>
    where
        W: StreamObserver + ?Sized,
    {
        if self.prompt.trim().is_empty() {
            return None;
        }

        let cancel = self.stop.begin_run();
        self.history.record(&self.prompt);

        let primary_request = self.request_for(&self.model);
        let outcome = if self.compare_mode {
            let compare_request = self.request_for(&self.compare_model);
            let (left, right) = run_compare(
                &self.client,
                &primary_request,
                &compare_request,
                &mut self.primary,
                &mut self.compare,
                &cancel,
            )
            .await;
            RunOutcome::Compare(left, right)
        } else {
            self.compare.clear();
            RunOutcome::Single(run_single(&self.client, &primary_request, &mut self.primary, watcher, &cancel).await)
        };

        self.stop.end_run();
        Some(outcome)
    }

    pub async fn submit(&mut self) -> Option<RunOutcome> {
        self.submit_with(&mut ()).await
    }

    /// Clear both responses and errors. Settings and history are kept.
    pub fn clear(&mut self) {
        self.primary.clear();
        self.compare.clear();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
