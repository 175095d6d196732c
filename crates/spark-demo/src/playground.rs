//! LLM playground
//!
//! Sends a free-form prompt to the completion service and keeps the last
//! successful answer. A failed call leaves the previous answer in place.

use crate::error::DemoError;
use crate::toast::{Notifier, Toast};
use parking_lot::Mutex;
use spark_host::{llm_prompt, Host};
use std::sync::Arc;

/// Observable playground state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaygroundState {
    /// A completion call is in flight
    pub is_loading: bool,
    /// Last successful answer
    pub response: Option<String>,
}

/// Prompt/response controller
pub struct Playground {
    host: Host,
    notifier: Arc<dyn Notifier>,
    model: String,
    state: Mutex<PlaygroundState>,
}

impl Playground {
    /// Create playground calling `model`
    #[must_use]
    pub fn new(host: Host, notifier: Arc<dyn Notifier>, model: impl Into<String>) -> Self {
        Self {
            host,
            notifier,
            model: model.into(),
            state: Mutex::new(PlaygroundState::default()),
        }
    }

    /// Model identifier sent with every call
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Snapshot of the state
    #[must_use]
    pub fn state(&self) -> PlaygroundState {
        self.state.lock().clone()
    }

    /// Check if a call is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    /// Last successful answer
    #[must_use]
    pub fn response(&self) -> Option<String> {
        self.state.lock().response.clone()
    }

    /// Check if `prompt` could be submitted right now
    #[must_use]
    pub fn can_generate(&self, prompt: &str) -> bool {
        !self.is_loading() && !prompt.trim().is_empty()
    }

    /// Complete `prompt` as free text
    ///
    /// # Errors
    /// - `DemoError::EmptyInput` for a blank prompt; no call is made
    /// - `DemoError::Busy` while another call is in flight
    /// - `DemoError::Host` when the completion call fails
    pub async fn generate(&self, prompt: &str) -> Result<String, DemoError> {
        self.run(prompt, false, |text| Ok(text.to_string())).await
    }

    /// Complete `prompt` in JSON mode and parse the answer
    ///
    /// An answer that does not parse counts as a failure and leaves the
    /// previous response in place.
    ///
    /// # Errors
    /// As [`Playground::generate`], plus `DemoError::InvalidJson`.
    pub async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, DemoError> {
        self.run(prompt, true, |text| serde_json::from_str(text)).await
    }

    async fn run<R>(
        &self,
        prompt: &str,
        json_mode: bool,
        parse: impl FnOnce(&str) -> Result<R, serde_json::Error>,
    ) -> Result<R, DemoError> {
        if prompt.trim().is_empty() {
            self.notifier.notify(Toast::error("Please enter a prompt"));
            return Err(DemoError::EmptyInput { field: "prompt" });
        }

        {
            let mut state = self.state.lock();
            if state.is_loading {
                return Err(DemoError::Busy);
            }
            state.is_loading = true;
        }
        let _loading = LoadingGuard(&self.state);

        let prompt = llm_prompt(&["", ""], &[&prompt])?;
        let response = match self.host.complete(&prompt, &self.model, json_mode).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, model = %self.model, "completion failed");
                self.notifier
                    .notify(Toast::error("Failed to generate response. Please try again."));
                return Err(e.into());
            }
        };

        let parsed = match parse(&response) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(error = %e, "json-mode response did not parse");
                self.notifier
                    .notify(Toast::error("The response was not valid JSON"));
                return Err(DemoError::InvalidJson(e));
            }
        };

        self.state.lock().response = Some(response);
        self.notifier.notify(Toast::success("Response generated!"));
        Ok(parsed)
    }
}

impl std::fmt::Debug for Playground {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playground")
            .field("model", &self.model)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

/// Clears the loading flag however the call ends, cancellation included
struct LoadingGuard<'a>(&'a Mutex<PlaygroundState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().is_loading = false;
    }
}
