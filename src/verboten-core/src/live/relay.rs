//! Game relay: one player connection fanned out to two live sessions.
//!
//! Three loops run per game:
//! - guesser → client: every guesser event is forwarded verbatim;
//! - client → sessions: every input frame goes to the guesser, then to the judge;
//! - judge → relay: the judge's spoken transcript is the loss signal.
//!
//! A single writer task owns the client sink. All loops share one
//! cancellation token; whichever loop ends first records why and cancels the
//! others, and both sessions are closed on every exit path.

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::language::Language;
use crate::live::client::{ClientSink, ClientSource, ClientTransport};
use crate::live::protocol::{LiveSessionConfig, Notice, RealtimeInput};
use crate::live::session::{LiveConnector, LiveSession, SessionSink, SessionStream};

const OUTBOUND_CAPACITY: usize = 256;

/// Silence after which buffered judge speech counts as a finished phrase.
const JUDGE_QUIET: Duration = Duration::from_millis(750);

/// Upper bound on closing a connection once the game is over.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Short random token naming a game in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameId(String);

impl GameId {
    pub fn random() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a live game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The player closed the connection.
    ClientDisconnected,
    /// The guesser session went away.
    GuesserDisconnected,
    /// The judge session went away.
    JudgeDisconnected,
    /// The judge heard a proscribed word.
    Lost { judge: String },
    /// The player sent a frame that is not realtime input.
    MalformedInput(String),
    /// A session read or write failed.
    TransportError(String),
}

impl RelayOutcome {
    fn reason(&self) -> String {
        match self {
            RelayOutcome::ClientDisconnected => "client disconnected".to_string(),
            RelayOutcome::GuesserDisconnected => "guesser disconnected".to_string(),
            RelayOutcome::JudgeDisconnected => "judge disconnected".to_string(),
            RelayOutcome::Lost { .. } => "lost".to_string(),
            RelayOutcome::MalformedInput(_) => "malformed input".to_string(),
            RelayOutcome::TransportError(e) => format!("transport error: {}", e),
        }
    }
}

/// Per-game cancellation scope; the first recorded outcome wins.
#[derive(Clone)]
struct Shutdown {
    token: CancellationToken,
    outcome: Arc<OnceLock<RelayOutcome>>,
}

impl Shutdown {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            outcome: Arc::new(OnceLock::new()),
        }
    }

    fn finish(&self, outcome: RelayOutcome) {
        let _ = self.outcome.set(outcome);
        self.token.cancel();
    }

    fn outcome(&self) -> RelayOutcome {
        self.outcome
            .get()
            .cloned()
            .unwrap_or(RelayOutcome::ClientDisconnected)
    }
}

/// One live game.
#[derive(Debug, Clone)]
pub struct LiveGame {
    pub id: GameId,
    pub language: Language,
    pub forbidden: Vec<String>,
    pub voice_name: String,
}

impl LiveGame {
    pub fn new(language: Language, forbidden: Vec<String>, voice_name: impl Into<String>) -> Self {
        Self {
            id: GameId::random(),
            language,
            forbidden,
            voice_name: voice_name.into(),
        }
    }

    /// Open the guesser and judge sessions, then relay until the game ends.
    ///
    /// If a session cannot be opened the player is told so and the error is
    /// returned; the process keeps serving other games.
    pub async fn play(self, connector: &dyn LiveConnector, mut client: ClientTransport) -> Result<RelayOutcome> {
        info!(
            "Starting game {} in {} with proscribed words {:?}",
            self.id, self.language, self.forbidden
        );

        let guesser_config = LiveSessionConfig::guesser(self.language, &self.voice_name);
        let judge_config = LiveSessionConfig::judge(&self.forbidden);

        let sessions = tokio::try_join!(
            connector.connect(&guesser_config),
            connector.connect(&judge_config),
        );
        let (guesser, judge) = match sessions {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(game = %self.id, error = %e, "failed to open live sessions");
                let notice = Notice::Error { message: e.to_string() };
                let _ = client.sink.send(notice.to_json()).await;
                let _ = client.sink.close().await;
                return Err(e);
            }
        };

        Ok(self.relay(client, guesser, judge).await)
    }

    /// Run the three relay loops over already-open sessions.
    pub async fn relay(&self, client: ClientTransport, guesser: LiveSession, judge: LiveSession) -> RelayOutcome {
        let shutdown = Shutdown::new();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        let writer = tokio::spawn(write_client(
            self.id.clone(),
            client.sink,
            out_rx,
            shutdown.clone(),
        ));
        let guesser_loop = tokio::spawn(relay_guesser(
            self.id.clone(),
            guesser.stream,
            out_tx.clone(),
            shutdown.clone(),
        ));
        let judge_loop = tokio::spawn(listen_judge(
            self.id.clone(),
            judge.stream,
            out_tx.clone(),
            shutdown.clone(),
        ));

        fan_out(
            &self.id,
            client.source,
            guesser.sink,
            judge.sink,
            out_tx,
            shutdown.clone(),
        )
        .await;

        for (name, handle) in [("guesser", guesser_loop), ("judge", judge_loop), ("writer", writer)] {
            if let Err(e) = handle.await {
                warn!(game = %self.id, task = name, error = %e, "relay task failed");
            }
        }

        let outcome = shutdown.outcome();
        info!(game = %self.id, outcome = ?outcome, "Game ended");
        outcome
    }
}

/// Client → guesser and judge, in arrival order.
async fn fan_out(
    id: &GameId,
    mut source: Box<dyn ClientSource>,
    mut guesser: Box<dyn SessionSink>,
    mut judge: Box<dyn SessionSink>,
    out: mpsc::Sender<String>,
    shutdown: Shutdown,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.token.cancelled() => break,
            message = source.recv() => message,
        };

        match message {
            Ok(Some(text)) => {
                let frame = match RealtimeInput::parse(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(game = %id, error = %e, "malformed frame from client");
                        let notice = Notice::Error { message: e.to_string() }.to_json();
                        tokio::select! {
                            _ = shutdown.token.cancelled() => {}
                            _ = out.send(notice) => {}
                        }
                        shutdown.finish(RelayOutcome::MalformedInput(e.to_string()));
                        break;
                    }
                };

                // Sequential: each session handle has exactly one writer.
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.token.cancelled() => break,
                    sent = guesser.send_realtime_input(&frame) => sent,
                };
                if let Err(e) = sent {
                    warn!(game = %id, error = %e, "write to guesser failed");
                    shutdown.finish(RelayOutcome::TransportError(format!("guesser: {}", e)));
                    break;
                }
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.token.cancelled() => break,
                    sent = judge.send_realtime_input(&frame) => sent,
                };
                if let Err(e) = sent {
                    warn!(game = %id, error = %e, "write to judge failed");
                    shutdown.finish(RelayOutcome::TransportError(format!("judge: {}", e)));
                    break;
                }
            }
            Ok(None) => {
                info!(game = %id, "client disconnected");
                shutdown.finish(RelayOutcome::ClientDisconnected);
                break;
            }
            Err(e) => {
                warn!(game = %id, error = %e, "read from client error");
                shutdown.finish(RelayOutcome::ClientDisconnected);
                break;
            }
        }
    }

    for (name, sink) in [("guesser", &mut guesser), ("judge", &mut judge)] {
        match tokio::time::timeout(CLOSE_GRACE, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(game = %id, session = name, error = %e, "closing session"),
            Err(_) => warn!(game = %id, session = name, "session close timed out"),
        }
    }
}

/// Guesser → client, unmodified.
async fn relay_guesser(
    id: GameId,
    mut stream: Box<dyn SessionStream>,
    out: mpsc::Sender<String>,
    shutdown: Shutdown,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.token.cancelled() => return,
            event = stream.receive() => event,
        };

        match event {
            Ok(Some(event)) => {
                if let Some(text) = event.input_transcript() {
                    debug!(game = %id, heard = %text, "player transcript");
                }
                if let Some(text) = event.output_transcript() {
                    debug!(game = %id, guess = %text, "guesser transcript");
                }
                if event.has_audio() {
                    debug!(game = %id, "guesser audio");
                }
                let json = match event.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(game = %id, error = %e, "marshal guesser event error");
                        continue;
                    }
                };
                let delivered = tokio::select! {
                    biased;
                    _ = shutdown.token.cancelled() => return,
                    delivered = out.send(json) => delivered.is_ok(),
                };
                if !delivered {
                    shutdown.finish(RelayOutcome::ClientDisconnected);
                    return;
                }
                if event.is_go_away() {
                    info!(game = %id, "guesser session is going away");
                    shutdown.finish(RelayOutcome::GuesserDisconnected);
                    return;
                }
            }
            Ok(None) => {
                info!(game = %id, "guesser model disconnected");
                shutdown.finish(RelayOutcome::GuesserDisconnected);
                return;
            }
            Err(e) => {
                warn!(game = %id, error = %e, "guesser receive error");
                shutdown.finish(RelayOutcome::TransportError(format!("guesser: {}", e)));
                return;
            }
        }
    }
}

/// Judge → relay. Anything the judge says is the offending phrase.
///
/// Transcripts are not ordered against the turn markers, so a phrase is
/// reported at turn completion or once the judge has been quiet for
/// [`JUDGE_QUIET`], whichever comes first.
async fn listen_judge(
    id: GameId,
    mut stream: Box<dyn SessionStream>,
    out: mpsc::Sender<String>,
    shutdown: Shutdown,
) {
    let mut spoken = String::new();

    loop {
        let pending = !spoken.trim().is_empty();
        let event = tokio::select! {
            biased;
            _ = shutdown.token.cancelled() => return,
            _ = tokio::time::sleep(JUDGE_QUIET), if pending => {
                declare_loss(&id, &spoken, &out, &shutdown).await;
                return;
            }
            event = stream.receive() => event,
        };

        match event {
            Ok(Some(event)) => {
                if let Some(text) = event.output_transcript() {
                    spoken.push_str(text);
                }
                if event.is_go_away() {
                    info!(game = %id, "judge session is going away");
                    shutdown.finish(RelayOutcome::JudgeDisconnected);
                    return;
                }
                if !event.is_turn_complete() || spoken.trim().is_empty() {
                    continue;
                }

                declare_loss(&id, &spoken, &out, &shutdown).await;
                return;
            }
            Ok(None) => {
                info!(game = %id, "judge disconnected");
                shutdown.finish(RelayOutcome::JudgeDisconnected);
                return;
            }
            Err(e) => {
                warn!(game = %id, error = %e, "judge receive error");
                shutdown.finish(RelayOutcome::TransportError(format!("judge: {}", e)));
                return;
            }
        }
    }
}

async fn declare_loss(id: &GameId, spoken: &str, out: &mpsc::Sender<String>, shutdown: &Shutdown) {
    let phrase = spoken.trim().to_string();
    info!("Game {} Judge says {:?}", id, phrase);
    let notice = Notice::Lost { judge: phrase.clone() }.to_json();
    tokio::select! {
        _ = shutdown.token.cancelled() => {}
        _ = out.send(notice) => {}
    }
    shutdown.finish(RelayOutcome::Lost { judge: phrase });
}

/// Sole writer of the client connection.
///
/// Once the game is cancelled, pending messages are flushed, an `ended`
/// notice is sent unless the player is already gone, and the sink is closed.
/// That farewell gets at most [`CLOSE_GRACE`].
async fn write_client(
    id: GameId,
    mut sink: Box<dyn ClientSink>,
    mut rx: mpsc::Receiver<String>,
    shutdown: Shutdown,
) {
    loop {
        let message = tokio::select! {
            biased;
            message = rx.recv() => message,
            _ = shutdown.token.cancelled() => break,
        };
        let Some(message) = message else { break };

        let sent = tokio::select! {
            biased;
            sent = sink.send(message) => sent,
            _ = shutdown.token.cancelled() => break,
        };
        if let Err(e) = sent {
            warn!(game = %id, error = %e, "write message error");
            shutdown.finish(RelayOutcome::ClientDisconnected);
            return;
        }
    }

    let outcome = shutdown.outcome();
    let farewell = async {
        if outcome != RelayOutcome::ClientDisconnected {
            while let Ok(message) = rx.try_recv() {
                sink.send(message).await?;
            }
            sink.send(Notice::Ended { reason: outcome.reason() }.to_json()).await?;
        }
        sink.close().await
    };

    match tokio::time::timeout(CLOSE_GRACE, farewell).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(game = %id, error = %e, "closing client connection"),
        Err(_) => warn!(game = %id, "client did not take the farewell in time"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerbotenError;
    use crate::live::protocol::ServerEvent;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ChannelSource(mpsc::UnboundedReceiver<String>);

    #[async_trait]
    impl ClientSource for ChannelSource {
        async fn recv(&mut self) -> Result<Option<String>> {
            Ok(self.0.recv().await)
        }
    }

    struct ChannelSink {
        tx: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ClientSink for ChannelSink {
        async fn send(&mut self, text: String) -> Result<()> {
            self.tx
                .send(text)
                .map_err(|_| VerbotenError::Transport("client gone".to_string()))
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingSink {
        frames: Arc<Mutex<Vec<RealtimeInput>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SessionSink for RecordingSink {
        async fn send_realtime_input(&mut self, frame: &RealtimeInput) -> Result<()> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedStream(mpsc::UnboundedReceiver<Result<ServerEvent>>);

    #[async_trait]
    impl SessionStream for ScriptedStream {
        async fn receive(&mut self) -> Result<Option<ServerEvent>> {
            match self.0.recv().await {
                Some(event) => event.map(Some),
                None => Ok(None),
            }
        }
    }

    struct SessionProbe {
        frames: Arc<Mutex<Vec<RealtimeInput>>>,
        closed: Arc<AtomicBool>,
        events: Option<mpsc::UnboundedSender<Result<ServerEvent>>>,
    }

    impl SessionProbe {
        fn push(&self, json: &str) {
            if let Some(events) = &self.events {
                events.send(ServerEvent::from_json(json)).unwrap();
            }
        }

        /// The backend drops the session.
        fn disconnect(&mut self) {
            self.events.take();
        }

        fn frames(&self) -> Vec<RealtimeInput> {
            self.frames.lock().unwrap().clone()
        }

        fn closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn session() -> (LiveSession, SessionProbe) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (events, rx) = mpsc::unbounded_channel();
        let session = LiveSession {
            sink: Box::new(RecordingSink {
                frames: Arc::clone(&frames),
                closed: Arc::clone(&closed),
            }),
            stream: Box::new(ScriptedStream(rx)),
        };
        (session, SessionProbe { frames, closed, events: Some(events) })
    }

    struct ClientProbe {
        input: Option<mpsc::UnboundedSender<String>>,
        output: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
    }

    impl ClientProbe {
        fn send(&self, text: &str) {
            if let Some(input) = &self.input {
                input.send(text.to_string()).unwrap();
            }
        }

        /// The player closes the connection.
        fn disconnect(&mut self) {
            self.input.take();
        }

        fn closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }

        fn drain(&mut self) -> Vec<Value> {
            let mut messages = Vec::new();
            while let Ok(text) = self.output.try_recv() {
                messages.push(serde_json::from_str(&text).unwrap());
            }
            messages
        }
    }

    fn client() -> (ClientTransport, ClientProbe) {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = ClientTransport::new(
            ChannelSource(input_rx),
            ChannelSink {
                tx: output_tx,
                closed: Arc::clone(&closed),
            },
        );
        (transport, ClientProbe { input: Some(input), output, closed })
    }

    fn game() -> LiveGame {
        LiveGame::new(Language::Fr, vec!["Pousser".into(), "Plante".into()], "Puck")
    }

    #[tokio::test]
    async fn test_frames_fan_out_in_order_to_both_sessions() {
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        for i in 0..5 {
            probe.send(&format!(r#"{{"text":"frame {}"}}"#, i));
        }
        probe.disconnect();

        let outcome = game().relay(transport, guesser, judge).await;

        assert_eq!(outcome, RelayOutcome::ClientDisconnected);
        let expected: Vec<RealtimeInput> = (0..5)
            .map(|i| RealtimeInput::text(format!("frame {}", i)))
            .collect();
        assert_eq!(guesser_probe.frames(), expected);
        assert_eq!(judge_probe.frames(), expected);
        assert!(guesser_probe.closed());
        assert!(judge_probe.closed());
        assert!(probe.closed());
    }

    #[tokio::test]
    async fn test_guesser_events_relayed_and_judge_audio_is_not() {
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        let audio = r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"data":"AAAA","mimeType":"audio/pcm;rate=24000"}}]}}}"#;
        judge_probe.push(audio);
        guesser_probe.push(audio);

        let relay = tokio::spawn(async move { game().relay(transport, guesser, judge).await });

        let first = probe.output.recv().await.unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&first).unwrap(),
            serde_json::from_str::<Value>(audio).unwrap()
        );

        probe.disconnect();
        assert_eq!(relay.await.unwrap(), RelayOutcome::ClientDisconnected);
        assert!(probe.drain().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_ends_only_this_game() {
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        probe.send("{not json");

        let outcome = game().relay(transport, guesser, judge).await;

        assert!(matches!(outcome, RelayOutcome::MalformedInput(_)));
        let messages = probe.drain();
        assert_eq!(messages[0]["verboten"]["type"], "error");
        assert_eq!(messages[1]["verboten"]["type"], "ended");
        assert!(guesser_probe.frames().is_empty());
        assert!(guesser_probe.closed());
        assert!(judge_probe.closed());
        assert!(probe.closed());
    }

    #[tokio::test]
    async fn test_judge_speech_loses_the_game() {
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        // A silent turn is not a loss.
        judge_probe.push(r#"{"serverContent":{"turnComplete":true}}"#);
        judge_probe.push(r#"{"serverContent":{"outputTranscription":{"text":"ils pous"}}}"#);
        judge_probe.push(r#"{"serverContent":{"outputTranscription":{"text":"sent"}}}"#);
        judge_probe.push(r#"{"serverContent":{"turnComplete":true}}"#);

        let outcome = game().relay(transport, guesser, judge).await;

        assert_eq!(outcome, RelayOutcome::Lost { judge: "ils poussent".to_string() });
        let messages = probe.drain();
        assert_eq!(messages[0]["verboten"]["type"], "lost");
        assert_eq!(messages[0]["verboten"]["judge"], "ils poussent");
        assert_eq!(messages[1]["verboten"]["reason"], "lost");
        assert!(guesser_probe.closed());
        assert!(judge_probe.closed());
    }

    #[tokio::test]
    async fn test_guesser_disconnect_tears_down_everything() {
        let (transport, mut probe) = client();
        let (guesser, mut guesser_probe) = session();
        let (judge, judge_probe) = session();

        guesser_probe.disconnect();

        let outcome = game().relay(transport, guesser, judge).await;

        assert_eq!(outcome, RelayOutcome::GuesserDisconnected);
        assert!(guesser_probe.closed());
        assert!(judge_probe.closed());
        assert_eq!(probe.drain()[0]["verboten"]["reason"], "guesser disconnected");
        assert!(probe.closed());
    }

    #[tokio::test]
    async fn test_judge_speech_after_turn_complete_still_loses() {
        let (transport, mut probe) = client();
        let (guesser, _guesser_probe) = session();
        let (judge, judge_probe) = session();

        judge_probe.push(r#"{"serverContent":{"turnComplete":true}}"#);
        judge_probe.push(r#"{"serverContent":{"outputTranscription":{"text":"ils poussent"}}}"#);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            game().relay(transport, guesser, judge),
        )
        .await
        .expect("game should end once the judge goes quiet");

        assert_eq!(outcome, RelayOutcome::Lost { judge: "ils poussent".to_string() });
        let messages = probe.drain();
        assert_eq!(messages[0]["verboten"]["type"], "lost");
        assert!(judge_probe.closed());
    }

    #[tokio::test]
    async fn test_judge_go_away_ends_the_game() {
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        judge_probe.push(r#"{"goAway":{"timeLeft":"5s"}}"#);

        let outcome = game().relay(transport, guesser, judge).await;

        assert_eq!(outcome, RelayOutcome::JudgeDisconnected);
        assert_eq!(probe.drain()[0]["verboten"]["reason"], "judge disconnected");
        assert!(guesser_probe.closed());
    }

    struct StalledSink {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ClientSink for StalledSink {
        async fn send(&mut self, _text: String) -> Result<()> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stalled_client_does_not_block_teardown() {
        let (_input, input_rx) = mpsc::unbounded_channel();
        let transport = ClientTransport::new(
            ChannelSource(input_rx),
            StalledSink { closed: Arc::new(AtomicBool::new(false)) },
        );
        let (guesser, guesser_probe) = session();
        let (judge, mut judge_probe) = session();

        guesser_probe.push(r#"{"serverContent":{"outputTranscription":{"text":"corde"}}}"#);
        let relay = tokio::spawn(async move { game().relay(transport, guesser, judge).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        judge_probe.disconnect();

        let outcome = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("teardown should be bounded")
            .unwrap();

        assert_eq!(outcome, RelayOutcome::JudgeDisconnected);
        assert!(guesser_probe.closed());
        assert!(judge_probe.closed());
    }

    #[tokio::test]
    async fn test_malformed_frame_leaves_other_games_running() {
        let (broken_transport, mut broken) = client();
        let (broken_guesser, _g1) = session();
        let (broken_judge, _j1) = session();
        let (transport, mut probe) = client();
        let (guesser, guesser_probe) = session();
        let (judge, judge_probe) = session();

        let healthy = tokio::spawn(async move { game().relay(transport, guesser, judge).await });
        let failing =
            tokio::spawn(async move { game().relay(broken_transport, broken_guesser, broken_judge).await });

        broken.send("{not json");
        let failed = failing.await.unwrap();
        assert!(matches!(failed, RelayOutcome::MalformedInput(_)));
        assert_eq!(broken.drain()[0]["verboten"]["type"], "error");

        probe.send(r#"{"text":"still here"}"#);
        guesser_probe.push(r#"{"serverContent":{"outputTranscription":{"text":"ici"}}}"#);
        let relayed: Value = serde_json::from_str(&probe.output.recv().await.unwrap()).unwrap();
        assert_eq!(relayed["serverContent"]["outputTranscription"]["text"], "ici");

        probe.disconnect();
        assert_eq!(healthy.await.unwrap(), RelayOutcome::ClientDisconnected);
        assert_eq!(guesser_probe.frames(), vec![RealtimeInput::text("still here")]);
        assert_eq!(judge_probe.frames(), vec![RealtimeInput::text("still here")]);
    }

    struct FailingConnector;

    #[async_trait]
    impl LiveConnector for FailingConnector {
        async fn connect(&self, _config: &LiveSessionConfig) -> Result<LiveSession> {
            Err(VerbotenError::Transport("backend unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported_to_client() {
        let (transport, mut probe) = client();

        let result = game().play(&FailingConnector, transport).await;

        assert!(matches!(result, Err(VerbotenError::Transport(_))));
        let messages = probe.drain();
        assert_eq!(messages[0]["verboten"]["type"], "error");
        assert!(probe.closed());
    }

    #[test]
    fn test_game_id_is_four_alphanumerics() {
        let id = GameId::random();
        assert_eq!(id.as_str().len(), 4);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
