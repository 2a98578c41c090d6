//! Chat session state for the terminal UI.
//!
//! Everything the UI mutates lives in [`ChatSession`], which the event loop
//! owns and passes by `&mut` into its update step. The transcript is
//! append-only: messages are pushed, or the whole list is cleared.

use crate::error::{SubmitError, TurnError};
use crate::provider::{
    ChatResult, ClientFactory, ProviderKind, ProviderRequest, MAX_TEMPERATURE, MAX_TIMEOUT_SECS, MIN_TEMPERATURE,
    MIN_TIMEOUT_SECS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub provider_label: Option<String>,
}

/// Values of the provider/model/temperature/timeout selectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    provider: ProviderKind,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl Controls {
    /// Out-of-range temperature and timeout are clamped into bounds; a
    /// missing model falls back to the provider's first catalogue entry.
    pub fn new(provider: ProviderKind, model: Option<String>, temperature: f32, timeout_secs: u64) -> Self {
        let mut c = Self {
            provider,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            temperature: MIN_TEMPERATURE,
            timeout_secs: MIN_TIMEOUT_SECS,
        };
        c.set_temperature(temperature);
        c.set_timeout_secs(timeout_secs);
        c
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Switching provider resets the model to that provider's default.
    pub fn set_provider(&mut self, provider: ProviderKind) {
        if provider != self.provider {
            self.provider = provider;
            self.model = provider.default_model().to_string();
        }
    }

    pub fn cycle_provider(&mut self) {
        let all = ProviderKind::ALL;
        let idx = all.iter().position(|p| *p == self.provider).unwrap_or(0);
        self.set_provider(all[(idx + 1) % all.len()]);
    }

    /// Step through the provider's catalogue. A free-form model not in the
    /// catalogue steps to the first entry.
    pub fn cycle_model(&mut self) {
        let models = self.provider.models();
        let next = match models.iter().position(|m| *m == self.model) {
            Some(idx) => models[(idx + 1) % models.len()],
            None => models[0],
        };
        self.model = next.to_string();
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = if temperature.is_nan() {
            MIN_TEMPERATURE
        } else {
            temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        };
    }

    pub fn set_timeout_secs(&mut self, secs: u64) {
        self.timeout_secs = secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
    }

    pub fn request(&self) -> ProviderRequest {
        ProviderRequest::new(self.provider, self.model.clone(), self.temperature, self.timeout_secs)
    }
}

/// One exchange taken off the session for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub request: ProviderRequest,
    pub prompt: String,
    /// Session generation the turn was taken from.
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingState {
    Idle,
    /// User message appended, not yet picked up.
    Waiting,
    /// Picked up by `begin_turn`, waiting for `finish_turn`.
    InFlight,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    username: Option<String>,
    messages: Vec<ChatMessage>,
    pending: PendingState,
    /// Bumped on logout; turns from an older generation are discarded.
    generation: u64,
    pub controls: Controls,
}

impl ChatSession {
    pub fn new(controls: Controls) -> Self {
        Self {
            username: None,
            messages: Vec::new(),
            pending: PendingState::Idle,
            generation: 0,
            controls,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending != PendingState::Idle
    }

    /// Start a session for `username`. The name is a display label only.
    /// Logging in as someone else starts from an empty transcript.
    pub fn login(&mut self, username: &str) -> Result<(), SubmitError> {
        let name = username.trim();
        if name.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.username.as_deref() != Some(name) {
            self.logout();
            tracing::info!(user = name, "logged in");
            self.username = Some(name.to_string());
        }
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(name) = self.username.take() {
            tracing::info!(user = %name, "logged out");
        }
        self.messages.clear();
        self.pending = PendingState::Idle;
        self.generation += 1;
    }

    /// Empty the transcript. The pending flag is left alone so a reply that
    /// is still in flight lands in the fresh transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append a user message and mark a response as pending.
    pub fn submit(&mut self, text: &str) -> Result<(), SubmitError> {
        if !self.is_logged_in() {
            return Err(SubmitError::NotLoggedIn);
        }
        if self.is_pending() {
            return Err(SubmitError::Pending);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::Empty);
        }
        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.to_string(),
            provider_label: None,
        });
        self.pending = PendingState::Waiting;
        Ok(())
    }

    /// Take the waiting exchange for processing, snapshotting the current
    /// controls. Returns `None` when nothing is waiting.
    pub fn begin_turn(&mut self) -> Option<Turn> {
        if self.pending != PendingState::Waiting {
            return None;
        }
        let prompt = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone());
        let Some(prompt) = prompt else {
            // Transcript was cleared before pickup; nothing to answer.
            self.pending = PendingState::Idle;
            return None;
        };
        self.pending = PendingState::InFlight;
        Some(Turn {
            request: self.controls.request(),
            prompt,
            generation: self.generation,
        })
    }

    /// Record the outcome of `turn` as an assistant message and clear the
    /// pending flag. Failures are recorded too, labelled with the bare
    /// provider identifier.
    ///
    /// A turn started before the last logout belongs to a session that no
    /// longer exists; its outcome is dropped and the pending flag is left to
    /// the current session's own request.
    pub fn finish_turn(&mut self, turn: &Turn, outcome: Result<ChatResult, TurnError>) {
        if turn.generation != self.generation {
            tracing::debug!(provider = %turn.request.provider, "dropping reply from a previous session");
            return;
        }
        let msg = match outcome {
            Ok(result) => ChatMessage {
                role: Role::Assistant,
                content: result.content,
                provider_label: Some(turn.request.label()),
            },
            Err(err) => {
                tracing::warn!(provider = %turn.request.provider, error = %err, "chat turn failed");
                ChatMessage {
                    role: Role::Assistant,
                    content: format!("Error: {err}"),
                    provider_label: Some(turn.request.provider.to_string()),
                }
            }
        };
        self.messages.push(msg);
        self.pending = PendingState::Idle;
    }

    /// Process the waiting exchange inline: build, invoke, record.
    #[cfg(test)]
    pub async fn process_pending(&mut self, factory: &dyn ClientFactory) {
        if let Some(turn) = self.begin_turn() {
            let outcome = run_turn(factory, &turn).await;
            self.finish_turn(&turn, outcome);
        }
    }
}

/// Build a client for `turn` and send its prompt.
pub async fn run_turn(factory: &dyn ClientFactory, turn: &Turn) -> Result<ChatResult, TurnError> {
    let client = factory.build(&turn.request)?;
    let result = client.invoke(&turn.prompt).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{NoCredentialFactory, StubFactory};

    fn session() -> ChatSession {
        let mut s = ChatSession::new(Controls::new(ProviderKind::OpenAI, Some("gpt-4".to_string()), 0.0, 60));
        s.login("ada").unwrap();
        s
    }

    #[tokio::test]
    async fn successful_turn_appends_labelled_reply() {
        let mut s = session();
        s.submit("Hi there").unwrap();
        assert!(s.is_pending());

        s.process_pending(&StubFactory::replying("Hello")).await;

        assert!(!s.is_pending());
        let assistant: Vec<_> = s.messages().iter().filter(|m| m.role == Role::Assistant).collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].content, "Hello");
        assert_eq!(assistant[0].provider_label.as_deref(), Some("OpenAI - gpt-4"));
    }

    #[tokio::test]
    async fn turn_uses_current_controls_and_last_user_message() {
        let mut s = session();
        s.controls.set_temperature(0.7);
        s.controls.set_timeout_secs(90);
        s.submit("first").unwrap();
        let factory = StubFactory::replying("ok");
        s.process_pending(&factory).await;
        s.submit("second").unwrap();
        s.process_pending(&factory).await;

        let seen = factory.requests.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].model, "gpt-4");
        assert!((seen[1].temperature - 0.7).abs() < 1e-6);
        assert_eq!(seen[1].timeout.as_secs(), 90);
    }

    #[tokio::test]
    async fn invoke_failure_is_recorded_with_bare_provider_label() {
        let mut s = session();
        s.submit("Hi").unwrap();
        s.process_pending(&StubFactory::failing("rate limited")).await;

        assert!(!s.is_pending());
        assert_eq!(s.messages().len(), 2);
        let last = &s.messages()[1];
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("rate limited"));
        assert_eq!(last.provider_label.as_deref(), Some("OpenAI"));
    }

    #[tokio::test]
    async fn build_failure_is_recorded_as_a_turn() {
        let mut s = session();
        s.submit("Hi").unwrap();
        s.process_pending(&NoCredentialFactory).await;

        let last = s.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("OPENAI_API_KEY"));
        assert_eq!(last.provider_label.as_deref(), Some("OpenAI"));
    }

    #[test]
    fn submit_while_pending_keeps_prior_pending_state() {
        let mut s = session();
        s.submit("one").unwrap();
        assert_eq!(s.submit("two"), Err(SubmitError::Pending));
        assert!(s.is_pending());
        assert_eq!(s.messages().len(), 1);

        let turn = s.begin_turn().unwrap();
        assert_eq!(turn.prompt, "one");
        assert_eq!(s.submit("two"), Err(SubmitError::Pending));
        assert!(s.is_pending());
        assert!(s.begin_turn().is_none());

        s.finish_turn(&turn, Ok(ChatResult::text("done")));
        assert!(!s.is_pending());
        assert!(s.submit("two").is_ok());
    }

    #[test]
    fn clear_empties_transcript_including_errors() {
        let mut s = session();
        s.submit("Hi").unwrap();
        let turn = s.begin_turn().unwrap();
        s.finish_turn(
            &turn,
            Err(TurnError::Invoke(crate::error::InvokeError::EmptyResponse)),
        );
        assert_eq!(s.messages().len(), 2);

        s.clear();
        assert!(s.messages().is_empty());
        assert!(s.is_logged_in());
    }

    #[test]
    fn in_flight_reply_lands_after_clear() {
        let mut s = session();
        s.submit("Hi").unwrap();
        let turn = s.begin_turn().unwrap();
        s.clear();
        assert!(s.is_pending());
        s.finish_turn(&turn, Ok(ChatResult::text("late")));
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].content, "late");
    }

    #[test]
    fn cleared_before_pickup_drops_pending() {
        let mut s = session();
        s.submit("Hi").unwrap();
        s.clear();
        assert!(s.begin_turn().is_none());
        assert!(!s.is_pending());
    }

    #[test]
    fn must_log_in_to_submit() {
        let mut s = ChatSession::new(Controls::new(ProviderKind::Ollama, None, 0.0, 60));
        assert_eq!(s.submit("Hi"), Err(SubmitError::NotLoggedIn));
        assert_eq!(s.login("   "), Err(SubmitError::Empty));
        s.login(" grace ").unwrap();
        assert_eq!(s.username(), Some("grace"));
        assert_eq!(s.submit("   "), Err(SubmitError::Empty));
    }

    #[test]
    fn logout_clears_transcript_and_pending() {
        let mut s = session();
        s.submit("Hi").unwrap();
        s.logout();
        assert!(!s.is_logged_in());
        assert!(s.messages().is_empty());
        assert!(!s.is_pending());
    }

    #[test]
    fn logging_in_as_someone_else_starts_fresh() {
        let mut s = session();
        s.submit("Hi").unwrap();
        s.login("ada").unwrap();
        assert_eq!(s.messages().len(), 1);
        s.login("bob").unwrap();
        assert!(s.messages().is_empty());
        assert_eq!(s.username(), Some("bob"));
    }

    #[test]
    fn reply_from_before_logout_is_dropped() {
        let mut s = session();
        s.submit("from ada").unwrap();
        let ada_turn = s.begin_turn().unwrap();

        s.logout();
        s.login("bob").unwrap();
        s.submit("from bob").unwrap();
        let bob_turn = s.begin_turn().unwrap();

        s.finish_turn(&ada_turn, Ok(ChatResult::text("reply meant for ada")));
        assert!(s.is_pending());
        let contents: Vec<_> = s.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["from bob"]);
        assert_eq!(s.submit("another"), Err(SubmitError::Pending));

        s.finish_turn(&bob_turn, Ok(ChatResult::text("reply for bob")));
        assert!(!s.is_pending());
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[1].content, "reply for bob");
    }

    #[test]
    fn reply_from_before_relogin_as_other_user_is_dropped() {
        let mut s = session();
        s.submit("from ada").unwrap();
        let turn = s.begin_turn().unwrap();
        s.login("bob").unwrap();

        s.finish_turn(&turn, Err(TurnError::Invoke(crate::error::InvokeError::EmptyResponse)));
        assert!(s.messages().is_empty());
        assert!(!s.is_pending());
        assert!(s.submit("hello").is_ok());
    }

    #[test]
    fn controls_clamp_to_documented_bounds() {
        let mut c = Controls::new(ProviderKind::OpenAI, None, 5.0, 1);
        assert_eq!(c.temperature(), MAX_TEMPERATURE);
        assert_eq!(c.timeout_secs(), MIN_TIMEOUT_SECS);
        assert_eq!(c.model(), "gpt-4o-mini");
        c.set_temperature(-1.0);
        c.set_timeout_secs(10_000);
        assert_eq!(c.temperature(), MIN_TEMPERATURE);
        assert_eq!(c.timeout_secs(), MAX_TIMEOUT_SECS);
    }

    #[test]
    fn provider_change_resets_model() {
        let mut c = Controls::new(ProviderKind::OpenAI, Some("gpt-4".to_string()), 0.0, 60);
        c.cycle_provider();
        assert_eq!(c.provider(), ProviderKind::Anthropic);
        assert_eq!(c.model(), ProviderKind::Anthropic.default_model());
        c.set_provider(ProviderKind::Anthropic);
        assert_eq!(c.model(), ProviderKind::Anthropic.default_model());
    }

    #[test]
    fn cycle_model_walks_catalogue() {
        let mut c = Controls::new(ProviderKind::Ollama, Some("custom:7b".to_string()), 0.0, 60);
        c.cycle_model();
        assert_eq!(c.model(), ProviderKind::Ollama.models()[0]);
        c.cycle_model();
        assert_eq!(c.model(), ProviderKind::Ollama.models()[1]);
    }
}
