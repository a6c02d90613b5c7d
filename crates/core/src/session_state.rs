use crate::Command;
use crate::generator::JokeGenerator;
use crate::quota::UserJokeCounters;
use anyhow::{Context, Result};
use augmentos_client::types::TranscriptionData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const READY_MESSAGE: &str = "Dad is ready when you are!";
pub const THINKING_MESSAGE: &str = "Dad is thinking...";
pub const TIRED_MESSAGE: &str = "Dad is all joked out for today. Give him a break!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle; the next final transcription starts a joke request.
    Waiting,
    /// A generation request is in flight (or the session is quota-locked).
    Thinking,
    /// A joke is on the display until the reset timer fires.
    Joke,
}

/// One-shot timers a session schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The "ready" prompt scheduled once at session start.
    Greeting,
    /// The joke display timeout that returns the session to `Waiting`.
    JokeReset,
}

/// The closed set of inputs a session reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Transcription(TranscriptionData),
    TimerFired(TimerKind),
    Disconnected,
}

/// Delays for the session's one-shot timers.
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    pub greeting_delay: Duration,
    pub joke_reset_delay: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            greeting_delay: Duration::from_secs(5),
            joke_reset_delay: Duration::from_secs(10),
        }
    }
}

/// Per-session joke-request state machine.
///
/// Events are handled one at a time by [`drive_session`]; the handler
/// suspends inside the generation call, so a second request can never start
/// while one is in flight.
pub struct JokeSession {
    pub session_id: String,
    pub user_id: String,
    pub state: SessionState,
    max_jokes: u32,
    timing: SessionTiming,
    counters: Arc<UserJokeCounters>,
    event_tx: mpsc::Sender<SessionEvent>,
    command_tx: mpsc::Sender<Command>,
}

impl JokeSession {
    /// Create the session in `Waiting`, register the user's counter entry,
    /// and schedule the one-shot greeting.
    pub fn new(
        session_id: String,
        user_id: String,
        max_jokes: u32,
        timing: SessionTiming,
        counters: Arc<UserJokeCounters>,
        event_tx: mpsc::Sender<SessionEvent>,
        command_tx: mpsc::Sender<Command>,
    ) -> Self {
        counters.register(&user_id);
        let session = Self {
            session_id,
            user_id,
            state: SessionState::Waiting,
            max_jokes,
            timing,
            counters,
            event_tx,
            command_tx,
        };
        session.schedule_timer(TimerKind::Greeting, session.timing.greeting_delay);
        session
    }

    /// Handle one input event. Returns `false` once the session is over and
    /// the event loop should stop.
    pub async fn handle_event<G: JokeGenerator + Send + Sync>(
        &mut self,
        generator: &G,
        event: SessionEvent,
    ) -> Result<bool> {
        match event {
            SessionEvent::Transcription(data) => {
                self.on_transcription(generator, data).await?;
                Ok(true)
            }
            SessionEvent::TimerFired(TimerKind::Greeting) => {
                // Fires unconditionally: it may overwrite a thinking/joke
                // display and never touches the state.
                self.show(READY_MESSAGE).await?;
                Ok(true)
            }
            SessionEvent::TimerFired(TimerKind::JokeReset) => {
                self.state = SessionState::Waiting;
                self.show(READY_MESSAGE).await?;
                Ok(true)
            }
            SessionEvent::Disconnected => {
                tracing::info!("Session {} disconnected.", self.session_id);
                Ok(false)
            }
        }
    }

    async fn on_transcription<G: JokeGenerator + Send + Sync>(
        &mut self,
        generator: &G,
        data: TranscriptionData,
    ) -> Result<()> {
        if !data.is_final || self.state != SessionState::Waiting {
            tracing::debug!(
                "Session {} ignoring transcription (final: {}, state: {:?})",
                self.session_id,
                data.is_final,
                self.state
            );
            return Ok(());
        }

        self.state = SessionState::Thinking;

        let count = self.counters.increment(&self.user_id);
        if count > self.max_jokes {
            tracing::info!(
                "User {} is over the joke cap ({} > {})",
                self.user_id,
                count,
                self.max_jokes
            );
            // No transition back to Waiting: the session stays locked in
            // Thinking and accepts no further requests.
            self.show(TIRED_MESSAGE).await?;
            return Ok(());
        }

        self.show(THINKING_MESSAGE).await?;

        tracing::info!(
            "Generating joke for session {} with input: {}",
            self.session_id,
            data.text
        );
        let joke = generator.generate_joke(&data.text).await?;
        tracing::info!("Generated joke for session {}: {}", self.session_id, joke);

        self.state = SessionState::Joke;
        self.show(joke).await?;
        self.schedule_timer(TimerKind::JokeReset, self.timing.joke_reset_delay);
        Ok(())
    }

    /// One-shot timer delivered back into the session's own event queue.
    /// Never cancelled; firing into a closed queue is a no-op.
    fn schedule_timer(&self, kind: TimerKind, delay: Duration) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::TimerFired(kind)).await;
        });
    }

    async fn show(&self, text: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(Command::ShowTextWall(text.into()))
            .await
            .context("display command channel closed")
    }
}

/// Runs a session's event loop until disconnect.
///
/// A failed event (a generation error, a closed display channel) is logged
/// and the loop keeps serving the session; a generation failure therefore
/// leaves the session in `Thinking` with no user-facing message.
pub async fn drive_session<G: JokeGenerator + Send + Sync>(
    mut session: JokeSession,
    generator: Arc<G>,
    mut event_rx: mpsc::Receiver<SessionEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        match session.handle_event(generator.as_ref(), event).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                tracing::error!(
                    "Session {}: event handling failed: {:?}",
                    session.session_id,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockJokeGenerator;

    fn slow_timing() -> SessionTiming {
        // Long enough that no timer fires during a non-paused test.
        SessionTiming {
            greeting_delay: Duration::from_secs(3600),
            joke_reset_delay: Duration::from_secs(3600),
        }
    }

    fn new_session(
        user_id: &str,
        max_jokes: u32,
        timing: SessionTiming,
        counters: Arc<UserJokeCounters>,
    ) -> (
        JokeSession,
        mpsc::Sender<SessionEvent>,
        mpsc::Receiver<SessionEvent>,
        mpsc::Receiver<Command>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (command_tx, command_rx) = mpsc::channel(32);
        let session = JokeSession::new(
            "session-1".to_string(),
            user_id.to_string(),
            max_jokes,
            timing,
            counters,
            event_tx.clone(),
            command_tx,
        );
        (session, event_tx, event_rx, command_rx)
    }

    fn final_transcription(text: &str) -> SessionEvent {
        SessionEvent::Transcription(TranscriptionData {
            text: text.to_string(),
            is_final: true,
        })
    }

    fn joke_generator(expected_calls: usize) -> MockJokeGenerator {
        let mut generator = MockJokeGenerator::new();
        generator
            .expect_generate_joke()
            .times(expected_calls)
            .returning(|_| Box::pin(async { Ok("A joke.".to_string()) }));
        generator
    }

    #[tokio::test]
    async fn second_final_transcription_while_busy_is_dropped() {
        let counters = Arc::new(UserJokeCounters::new());
        let (session, event_tx, event_rx, mut command_rx) =
            new_session("user-1", 5, slow_timing(), counters);

        // Exactly one generation call for the pair of transcriptions.
        let generator = joke_generator(1);

        event_tx.send(final_transcription("first")).await.unwrap();
        event_tx.send(final_transcription("second")).await.unwrap();
        event_tx.send(SessionEvent::Disconnected).await.unwrap();

        drive_session(session, Arc::new(generator), event_rx).await;

        assert_eq!(
            command_rx.try_recv().unwrap(),
            Command::ShowTextWall(THINKING_MESSAGE.to_string())
        );
        assert_eq!(
            command_rx.try_recv().unwrap(),
            Command::ShowTextWall("A joke.".to_string())
        );
        assert!(
            command_rx.try_recv().is_err(),
            "the second transcription must not produce any display update"
        );
    }

    #[tokio::test]
    async fn non_final_transcription_never_triggers_generation() {
        let counters = Arc::new(UserJokeCounters::new());
        let (mut session, _event_tx, _event_rx, mut command_rx) =
            new_session("user-1", 5, slow_timing(), counters.clone());

        // No expectations: any generation call panics the test.
        let generator = MockJokeGenerator::new();

        for state in [
            SessionState::Waiting,
            SessionState::Thinking,
            SessionState::Joke,
        ] {
            session.state = state;
            let keep_going = session
                .handle_event(
                    &generator,
                    SessionEvent::Transcription(TranscriptionData {
                        text: "partial words".to_string(),
                        is_final: false,
                    }),
                )
                .await
                .unwrap();
            assert!(keep_going);
            assert_eq!(session.state, state, "state must not change");
            assert!(command_rx.try_recv().is_err(), "no display update");
        }
        assert_eq!(counters.get("user-1"), 0);
    }

    #[tokio::test]
    async fn quota_lockout_after_configured_maximum() {
        let counters = Arc::new(UserJokeCounters::new());
        let (mut session, _event_tx, _event_rx, mut command_rx) =
            new_session("user-1", 2, slow_timing(), counters.clone());

        let generator = joke_generator(2);

        for _ in 0..2 {
            session
                .handle_event(&generator, final_transcription("tell me one"))
                .await
                .unwrap();
            assert_eq!(session.state, SessionState::Joke);
            session
                .handle_event(&generator, SessionEvent::TimerFired(TimerKind::JokeReset))
                .await
                .unwrap();
            assert_eq!(session.state, SessionState::Waiting);
        }
        while command_rx.try_recv().is_ok() {}

        // Third request: over the cap of 2.
        session
            .handle_event(&generator, final_transcription("one more"))
            .await
            .unwrap();

        assert_eq!(counters.get("user-1"), 3);
        assert_eq!(session.state, SessionState::Thinking, "session is locked");
        assert_eq!(
            command_rx.try_recv().unwrap(),
            Command::ShowTextWall(TIRED_MESSAGE.to_string())
        );
        assert!(command_rx.try_recv().is_err());

        // Locked for good: a further request neither bumps the counter nor
        // reaches the generator.
        session
            .handle_event(&generator, final_transcription("please"))
            .await
            .unwrap();
        assert_eq!(counters.get("user-1"), 3);
        assert!(command_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn joke_reset_fires_after_exactly_the_configured_delay() {
        let timing = SessionTiming {
            greeting_delay: Duration::from_secs(3600),
            joke_reset_delay: Duration::from_secs(10),
        };
        let counters = Arc::new(UserJokeCounters::new());
        let (session, event_tx, event_rx, mut command_rx) =
            new_session("user-1", 5, timing, counters);

        // Two calls: the second proves the reset returned the session to
        // Waiting.
        let generator = joke_generator(2);
        let driver = tokio::spawn(drive_session(session, Arc::new(generator), event_rx));

        event_tx.send(final_transcription("first")).await.unwrap();
        assert!(
            matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == THINKING_MESSAGE)
        );
        assert!(matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == "A joke."));

        tokio::time::advance(Duration::from_secs(9)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(command_rx.try_recv().is_err(), "reset must not fire early");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(
            matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == READY_MESSAGE)
        );

        event_tx.send(final_transcription("second")).await.unwrap();
        assert!(
            matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == THINKING_MESSAGE)
        );
        assert!(matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == "A joke."));

        event_tx.send(SessionEvent::Disconnected).await.unwrap();
        driver.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_fires_after_start_delay_even_mid_joke() {
        let timing = SessionTiming {
            greeting_delay: Duration::from_secs(5),
            joke_reset_delay: Duration::from_secs(3600),
        };
        let counters = Arc::new(UserJokeCounters::new());
        let (session, event_tx, event_rx, mut command_rx) =
            new_session("user-1", 5, timing, counters);

        let generator = joke_generator(1);
        let driver = tokio::spawn(drive_session(session, Arc::new(generator), event_rx));

        event_tx
            .send(final_transcription("make it punny"))
            .await
            .unwrap();
        assert!(
            matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == THINKING_MESSAGE)
        );
        assert!(matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == "A joke."));

        tokio::time::advance(Duration::from_secs(4)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(
            command_rx.try_recv().is_err(),
            "greeting must not fire early"
        );

        // At the 5 second mark the greeting overwrites the joke display and
        // leaves the state untouched.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(
            matches!(command_rx.recv().await, Some(Command::ShowTextWall(t)) if t == READY_MESSAGE)
        );

        // Still in Joke: another final transcription is dropped.
        event_tx.send(final_transcription("again")).await.unwrap();
        event_tx.send(SessionEvent::Disconnected).await.unwrap();
        driver.await.unwrap();
        assert!(command_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn counters_persist_across_sessions_of_the_same_user() {
        let counters = Arc::new(UserJokeCounters::new());
        let generator = joke_generator(2);

        let (mut first, _tx1, _rx1, _cmd1) =
            new_session("alice", 5, slow_timing(), counters.clone());
        first
            .handle_event(&generator, final_transcription("hello"))
            .await
            .unwrap();
        assert_eq!(counters.get("alice"), 1);

        // A later session of the same user keeps counting from 1.
        let (mut second, _tx2, _rx2, _cmd2) =
            new_session("alice", 5, slow_timing(), counters.clone());
        second
            .handle_event(&generator, final_transcription("hello again"))
            .await
            .unwrap();
        assert_eq!(counters.get("alice"), 2);

        assert_eq!(counters.get("bob"), 0);
    }
}
