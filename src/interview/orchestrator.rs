//! # Realtime Session Orchestrator
//!
//! Bridges one interview's audio WebSocket to the upstream realtime
//! conversational-AI API. The upstream connection lives on a dedicated OS
//! thread running its own single-threaded Tokio runtime, so the actor
//! system never blocks on upstream I/O and the WebSocket stream has exactly
//! one owner.
//!
//! ## Data flow:
//! - Candidate audio: actor -> command queue -> worker -> upstream
//! - Agent audio and captions: upstream -> worker -> `BrowserSink` -> actor
//! - Transcript entries accumulate in a shared `Transcript` as upstream
//!   transcription events arrive
//!
//! ## Turn signaling:
//! The worker fires a notification each time the agent finishes a response.
//! `start()` waits for the first of these, so the caller knows the greeting
//! has been spoken before it reports the session as live. The notification
//! also fires when the connection drops, so a failed session never leaves
//! `start()` hanging.

use crate::audio::framing::pcm16_to_wav;
use crate::audio::transcode::to_upstream_pcm;
use crate::config::{AudioFormatConfig, RealtimeConfig};
use crate::interview::events::{
    agent_transcript, input_audio_append, response_create, session_update, UpstreamEvent,
    END_QUESTION,
};
use crate::interview::transcript::{Speaker, Transcript};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Outbound half of the browser connection, as seen by the worker thread.
///
/// Implementations must not block; the actor-backed one just queues a
/// message onto the actor's mailbox. Returning false means the browser is
/// gone and the payload was dropped.
pub trait BrowserSink: Send + Sync {
    fn send_text(&self, text: &str) -> bool;
    fn send_audio(&self, wav: &[u8]) -> bool;
}

enum WorkerCommand {
    /// Mono PCM16 candidate audio, already at the upstream rate
    Audio(Vec<u8>),
    /// The candidate finished their turn; ask the agent to respond
    EndTurn,
    Close,
}

#[derive(Default)]
struct TurnSignal {
    notify: Notify,
}

impl TurnSignal {
    fn fire(&self) {
        // notify_one stores a permit for a waiter that has not arrived yet
        self.notify.notify_one();
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Handle to one upstream realtime session.
pub struct RealtimeOrchestrator {
    cmd_tx: mpsc::UnboundedSender<WorkerCommand>,
    connected: Arc<AtomicBool>,
    ever_connected: Arc<AtomicBool>,
    turn: Arc<TurnSignal>,
    transcript: Arc<Mutex<Transcript>>,
    sample_rate: u32,
    stopped: AtomicBool,
}

impl RealtimeOrchestrator {
    /// Spawn the upstream worker and return a handle to it.
    ///
    /// ## Parameters:
    /// - `realtime`: upstream endpoint configuration
    /// - `audio`: the PCM format spoken on both legs
    /// - `instructions`: personalized system instructions for the agent
    /// - `sink`: outbound half of the browser connection
    pub fn new(
        realtime: RealtimeConfig,
        audio: AudioFormatConfig,
        instructions: String,
        sink: Arc<dyn BrowserSink>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let ever_connected = Arc::new(AtomicBool::new(false));
        let turn = Arc::new(TurnSignal::default());
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let sample_rate = audio.sample_rate;

        let worker = Worker {
            realtime,
            instructions,
            sink,
            cmd_rx,
            connected: connected.clone(),
            ever_connected: ever_connected.clone(),
            turn: turn.clone(),
            transcript: transcript.clone(),
            sample_rate,
        };

        // The upstream socket gets its own thread and runtime so the actor
        // arbiter never blocks on upstream I/O
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Could not build realtime worker runtime: {}", e);
                    worker.turn.fire();
                    return;
                }
            };
            runtime.block_on(worker.run());
        });

        Self {
            cmd_tx,
            connected,
            ever_connected,
            turn,
            transcript,
            sample_rate,
            stopped: AtomicBool::new(false),
        }
    }

    /// Wait until the agent has spoken its opening turn.
    ///
    /// Returns an error if the upstream connection could not be established
    /// or dropped before the first response completed.
    pub async fn start(&self) -> Result<(), String> {
        self.turn.wait().await;
        if !self.ever_connected.load(Ordering::SeqCst) {
            return Err("Could not establish realtime session".to_string());
        }
        Ok(())
    }

    /// Normalize one browser audio chunk and queue it for upstream.
    ///
    /// Empty chunks are a no-op. Chunks arriving while the upstream
    /// connection is down are an error, so the caller can close the browser
    /// connection instead of silently eating audio.
    pub fn process_input_audio(&self, data: &[u8]) -> Result<(), String> {
        if data.is_empty() {
            return Ok(());
        }
        let pcm = to_upstream_pcm(data, self.sample_rate)?;
        if !self.connected.load(Ordering::SeqCst) {
            return Err("Realtime session is not connected".to_string());
        }
        self.cmd_tx
            .send(WorkerCommand::Audio(pcm))
            .map_err(|_| "Realtime session has shut down".to_string())
    }

    /// The candidate ended their turn; ask the agent to respond.
    pub fn end_turn(&self) {
        let _ = self.cmd_tx.send(WorkerCommand::EndTurn);
    }

    /// Tear down the upstream connection. Safe to call more than once.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.cmd_tx.send(WorkerCommand::Close);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of the conversation so far.
    pub fn transcript(&self) -> Transcript {
        self.transcript.lock().unwrap().clone()
    }
}

impl Drop for RealtimeOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    realtime: RealtimeConfig,
    instructions: String,
    sink: Arc<dyn BrowserSink>,
    cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    connected: Arc<AtomicBool>,
    ever_connected: Arc<AtomicBool>,
    turn: Arc<TurnSignal>,
    transcript: Arc<Mutex<Transcript>>,
    sample_rate: u32,
}

impl Worker {
    async fn run(mut self) {
        let url = format!("{}?model={}", self.realtime.endpoint, self.realtime.model);
        let mut ws = match self.connect(&url).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("Realtime connect to {} failed: {}", url, e);
                self.turn.fire();
                return;
            }
        };

        self.connected.store(true, Ordering::SeqCst);
        self.ever_connected.store(true, Ordering::SeqCst);
        info!("Realtime session connected to {}", self.realtime.endpoint);

        // Configure the session, then ask for the opening turn (the agent
        // greets the candidate before any candidate audio arrives)
        let setup = session_update(&self.instructions, &self.realtime);
        if ws.send(Message::Text(setup)).await.is_err()
            || ws.send(Message::Text(response_create())).await.is_err()
        {
            error!("Could not configure realtime session");
            self.shutdown();
            return;
        }

        // Caption text accumulates across deltas and flushes on response.done
        let mut agent_caption = String::new();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(WorkerCommand::Audio(pcm)) => {
                            if ws.send(Message::Text(input_audio_append(&pcm))).await.is_err() {
                                warn!("Upstream send failed, closing realtime session");
                                break;
                            }
                        }
                        Some(WorkerCommand::EndTurn) => {
                            debug!("Candidate turn ended, requesting agent response");
                            if ws.send(Message::Text(response_create())).await.is_err() {
                                break;
                            }
                        }
                        Some(WorkerCommand::Close) | None => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if !self.handle_event(&text, &mut agent_caption) {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Upstream closed the realtime session");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Realtime stream error: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown();
    }

    async fn connect(
        &self,
        url: &str,
    ) -> Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        String,
    > {
        let api_key = std::env::var(&self.realtime.api_key_env)
            .map_err(|_| format!("{} is not set", self.realtime.api_key_env))?;

        let mut request = url
            .into_client_request()
            .map_err(|e| format!("Invalid endpoint: {}", e))?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| format!("Invalid API key: {}", e))?;
        request.headers_mut().insert("Authorization", auth);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| format!("Connect failed: {}", e))?;
        Ok(ws)
    }

    /// React to one upstream event. Returns false when the session should
    /// end.
    fn handle_event(&self, raw: &str, agent_caption: &mut String) -> bool {
        let event: UpstreamEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!("Unparseable upstream event ({}), ignoring", e);
                return true;
            }
        };

        match event {
            UpstreamEvent::AudioDelta { delta } => match BASE64.decode(&delta) {
                Ok(pcm) => {
                    let framed = pcm16_to_wav(&pcm, self.sample_rate);
                    if !self.sink.send_audio(&framed) {
                        warn!("Browser is gone, dropping agent audio");
                    }
                }
                Err(e) => warn!("Undecodable agent audio delta: {}", e),
            },
            UpstreamEvent::AudioTranscriptDelta { delta } => {
                agent_caption.push_str(&delta);
                // Live captions for the browser while the agent speaks
                if !self.sink.send_text(&delta) {
                    warn!("Browser is gone, dropping caption delta");
                }
            }
            UpstreamEvent::ResponseDone { response } => {
                // Prefer the authoritative transcript from the response;
                // fall back to the accumulated caption deltas
                let text = agent_transcript(&response)
                    .map(str::to_string)
                    .unwrap_or_else(|| std::mem::take(agent_caption));
                agent_caption.clear();
                self.transcript.lock().unwrap().push(Speaker::Agent, text);
                // The browser re-opens the microphone on this sentinel
                if !self.sink.send_text(END_QUESTION) {
                    warn!("Browser is gone, dropping turn-end marker");
                }
                self.turn.fire();
            }
            UpstreamEvent::InputTranscriptionCompleted { transcript } => {
                self.transcript
                    .lock()
                    .unwrap()
                    .push(Speaker::Candidate, transcript);
            }
            UpstreamEvent::Error { error } => {
                let message = error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error");
                error!("Realtime session error: {}", message);
                // The transcript gathered so far stays usable; end the
                // session and let finalization persist it
                self.turn.fire();
                return false;
            }
            UpstreamEvent::Other => {}
        }
        true
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Unblock anyone waiting on the opening turn
        self.turn.fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    #[derive(Default)]
    struct CollectingSink {
        texts: Mutex<Vec<String>>,
        audio: Mutex<Vec<Vec<u8>>>,
    }

    impl BrowserSink for CollectingSink {
        fn send_text(&self, text: &str) -> bool {
            self.texts.lock().unwrap().push(text.to_string());
            true
        }

        fn send_audio(&self, wav: &[u8]) -> bool {
            self.audio.lock().unwrap().push(wav.to_vec());
            true
        }
    }

    /// A browser that has already gone away.
    struct RejectingSink;

    impl BrowserSink for RejectingSink {
        fn send_text(&self, _text: &str) -> bool {
            false
        }

        fn send_audio(&self, _wav: &[u8]) -> bool {
            false
        }
    }

    fn worker_with_sink(sink: Arc<dyn BrowserSink>) -> Worker {
        let cfg = AppConfig::default();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Worker {
            realtime: cfg.realtime,
            instructions: String::new(),
            sink,
            cmd_rx,
            connected: Arc::new(AtomicBool::new(true)),
            ever_connected: Arc::new(AtomicBool::new(true)),
            turn: Arc::new(TurnSignal::default()),
            transcript: Arc::new(Mutex::new(Transcript::new())),
            sample_rate: cfg.audio.sample_rate,
        }
    }

    fn agent_done(text: &str) -> String {
        json!({
            "type": "response.done",
            "response": {"output": [{"content": [{"transcript": text}]}]},
        })
        .to_string()
    }

    fn candidate_done(text: &str) -> String {
        json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "transcript": text,
        })
        .to_string()
    }

    #[test]
    fn test_transcript_keeps_upstream_event_order() {
        let worker = worker_with_sink(Arc::new(CollectingSink::default()));
        let mut caption = String::new();

        assert!(worker.handle_event(&agent_done("Hello Jordan."), &mut caption));
        assert!(worker.handle_event(&candidate_done("Hi."), &mut caption));
        assert!(worker.handle_event(&agent_done("Tell me about Rust."), &mut caption));

        let transcript = worker.transcript.lock().unwrap();
        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].speaker, Speaker::Agent);
        assert_eq!(entries[1].speaker, Speaker::Candidate);
        assert_eq!(entries[2].speaker, Speaker::Agent);
        assert_eq!(entries[1].text, "Hi.");
        assert_eq!(entries[2].text, "Tell me about Rust.");
    }

    #[test]
    fn test_agent_turn_end_sends_sentinel_with_caption_fallback() {
        let sink = Arc::new(CollectingSink::default());
        let worker = worker_with_sink(sink.clone());
        let mut caption = String::new();

        let delta = json!({"type": "response.audio_transcript.delta", "delta": "Welcome"});
        assert!(worker.handle_event(&delta.to_string(), &mut caption));
        // response.done without a transcript falls back to the caption deltas
        let done = json!({"type": "response.done", "response": {}});
        assert!(worker.handle_event(&done.to_string(), &mut caption));

        let texts = sink.texts.lock().unwrap();
        assert_eq!(
            texts.as_slice(),
            &["Welcome".to_string(), END_QUESTION.to_string()]
        );
        let transcript = worker.transcript.lock().unwrap();
        assert_eq!(transcript.entries()[0].text, "Welcome");
        assert!(caption.is_empty());
    }

    #[test]
    fn test_agent_audio_delta_is_framed_for_playback() {
        let sink = Arc::new(CollectingSink::default());
        let worker = worker_with_sink(sink.clone());
        let mut caption = String::new();

        let delta = json!({
            "type": "response.audio.delta",
            "delta": BASE64.encode([0x01u8, 0x02, 0x03, 0x04]),
        });
        assert!(worker.handle_event(&delta.to_string(), &mut caption));

        let audio = sink.audio.lock().unwrap();
        assert_eq!(audio.len(), 1);
        assert!(audio[0].starts_with(b"RIFF"));
    }

    #[test]
    fn test_error_event_ends_session_keeping_transcript() {
        let worker = worker_with_sink(Arc::new(CollectingSink::default()));
        let mut caption = String::new();

        assert!(worker.handle_event(&candidate_done("Hi."), &mut caption));
        let error = json!({"type": "error", "error": {"message": "session expired"}});
        assert!(!worker.handle_event(&error.to_string(), &mut caption));

        // The entries gathered so far survive for finalization
        assert_eq!(worker.transcript.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unparseable_event_is_ignored() {
        let worker = worker_with_sink(Arc::new(CollectingSink::default()));
        let mut caption = String::new();
        assert!(worker.handle_event("not json at all", &mut caption));
        assert!(worker.transcript.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gone_browser_drops_payloads_without_ending_session() {
        let worker = worker_with_sink(Arc::new(RejectingSink));
        let mut caption = String::new();

        let delta = json!({"type": "response.audio_transcript.delta", "delta": "Hi"});
        assert!(worker.handle_event(&delta.to_string(), &mut caption));
        assert!(worker.handle_event(&agent_done("Hello."), &mut caption));

        // The transcript still fills in even though nothing was delivered
        assert_eq!(worker.transcript.lock().unwrap().len(), 1);
    }

    fn unreachable_orchestrator() -> (RealtimeOrchestrator, Arc<CollectingSink>) {
        let mut cfg = AppConfig::default();
        // Discard port on loopback: connection is refused immediately
        cfg.realtime.endpoint = "ws://127.0.0.1:9".to_string();
        cfg.realtime.api_key_env = "INTERVIEW_TEST_MISSING_KEY".to_string();
        let sink = Arc::new(CollectingSink::default());
        let orchestrator = RealtimeOrchestrator::new(
            cfg.realtime,
            cfg.audio,
            "Interview the candidate.".to_string(),
            sink.clone(),
        );
        (orchestrator, sink)
    }

    #[tokio::test]
    async fn test_start_fails_without_connection() {
        let (orchestrator, _sink) = unreachable_orchestrator();
        assert!(orchestrator.start().await.is_err());
        assert!(!orchestrator.is_connected());
    }

    #[tokio::test]
    async fn test_audio_rejected_while_disconnected() {
        let (orchestrator, _sink) = unreachable_orchestrator();
        let _ = orchestrator.start().await;
        assert!(orchestrator.process_input_audio(&[0x00, 0x01]).is_err());
    }

    #[tokio::test]
    async fn test_empty_audio_is_noop() {
        let (orchestrator, _sink) = unreachable_orchestrator();
        assert!(orchestrator.process_input_audio(&[]).is_ok());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (orchestrator, _sink) = unreachable_orchestrator();
        orchestrator.stop();
        orchestrator.stop();
    }

    #[test]
    fn test_transcript_starts_empty() {
        let mut cfg = AppConfig::default();
        cfg.realtime.endpoint = "ws://127.0.0.1:9".to_string();
        cfg.realtime.api_key_env = "INTERVIEW_TEST_MISSING_KEY".to_string();
        let orchestrator = RealtimeOrchestrator::new(
            cfg.realtime,
            cfg.audio,
            String::new(),
            Arc::new(CollectingSink::default()),
        );
        assert!(orchestrator.transcript().is_empty());
    }
}
