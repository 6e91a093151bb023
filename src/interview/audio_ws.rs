//! # Interview Audio WebSocket Handler
//!
//! Drives the conversational half of an interview. Clients connect to
//! `/ws/interview/audio?token=...` and stream candidate audio; the handler
//! relays it to the realtime agent and sends agent speech and live captions
//! back down the same connection.
//!
//! ## WebSocket Protocol:
//! - **Client -> Server**: binary candidate audio (raw PCM16 or WAV chunks),
//!   plus the text frame `END_QUESTION` when the candidate ends their turn
//! - **Server -> Client**: binary WAV chunks of agent speech, plus text
//!   frames carrying caption deltas and error messages
//!
//! ## Session lifecycle:
//! 1. The invite token is resolved before the upgrade; bad tokens get a 401
//! 2. On connect, prerequisites are checked and the rendezvous signal for
//!    the video channel is registered
//! 3. The realtime session starts and the agent speaks its greeting
//! 4. When the connection ends, for any reason, finalization persists the
//!    transcript, completes the interview, and fires the rendezvous signal

use crate::interview::events::END_QUESTION;
use crate::interview::manager::InterviewManager;
use crate::interview::orchestrator::{BrowserSink, RealtimeOrchestrator};
use crate::interview::rendezvous::RendezvousRegistry;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// WebSocket actor for one candidate's interview conversation.
pub struct InterviewAudioSocket {
    manager: Arc<InterviewManager>,
    rendezvous: Arc<RendezvousRegistry>,
    app_state: web::Data<AppState>,

    /// Present once the realtime session has been spawned. Taken exactly
    /// once during shutdown, which makes finalization run exactly once.
    orchestrator: Option<Arc<RealtimeOrchestrator>>,

    /// Whether this session was counted in the active-session metric
    counted: bool,

    last_heartbeat: Instant,
}

impl InterviewAudioSocket {
    pub fn new(
        manager: Arc<InterviewManager>,
        rendezvous: Arc<RendezvousRegistry>,
        app_state: web::Data<AppState>,
    ) -> Self {
        Self {
            manager,
            rendezvous,
            app_state,
            orchestrator: None,
            counted: false,
            last_heartbeat: Instant::now(),
        }
    }
}

/// Text frame for the browser (captions, status, errors).
#[derive(Message)]
#[rtype(result = "()")]
struct SendText(String);

/// Binary frame of agent speech for the browser.
#[derive(Message)]
#[rtype(result = "()")]
struct SendAudio(Vec<u8>);

/// The agent finished its greeting; the session is live.
#[derive(Message)]
#[rtype(result = "()")]
struct SessionReady;

/// The realtime session could not be established.
#[derive(Message)]
#[rtype(result = "()")]
struct SessionFailed(String);

/// Outbound half of the browser connection handed to the upstream worker.
struct ActorBrowserSink {
    addr: Addr<InterviewAudioSocket>,
}

impl BrowserSink for ActorBrowserSink {
    fn send_text(&self, text: &str) -> bool {
        self.addr.try_send(SendText(text.to_string())).is_ok()
    }

    fn send_audio(&self, wav: &[u8]) -> bool {
        self.addr.try_send(SendAudio(wav.to_vec())).is_ok()
    }
}

impl Actor for InterviewAudioSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let candidate_id = self.manager.candidate_id();
        info!(
            "Interview audio connection started for candidate {}",
            candidate_id
        );

        // The video channel may connect at any time, so its rendezvous
        // signal exists from the moment this connection is accepted
        self.rendezvous.register(candidate_id);

        if let Err(message) = self.manager.check_prerequisites() {
            warn!(
                "Rejecting interview for candidate {}: {}",
                candidate_id, message
            );
            // The session never started; drop the entry so it cannot leak
            // into a later session for this candidate
            self.rendezvous.remove(candidate_id);
            ctx.text(message);
            ctx.close(Some(ws::CloseReason {
                code: ws::CloseCode::Policy,
                description: None,
            }));
            ctx.stop();
            return;
        }

        let config = self.app_state.get_config();
        let orchestrator = Arc::new(RealtimeOrchestrator::new(
            config.realtime,
            config.audio,
            self.manager.instructions(),
            Arc::new(ActorBrowserSink {
                addr: ctx.address(),
            }),
        ));
        self.orchestrator = Some(orchestrator.clone());

        let addr = ctx.address();
        tokio::spawn(async move {
            match orchestrator.start().await {
                Ok(()) => addr.do_send(SessionReady),
                Err(e) => addr.do_send(SessionFailed(e)),
            }
        });

        // Heartbeat timer, same cadence as the rest of the server's sockets
        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(60) {
                warn!("Interview audio heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let candidate_id = self.manager.candidate_id();
        info!(
            "Interview audio connection stopped for candidate {}",
            candidate_id
        );

        if self.counted {
            self.app_state.decrement_active_sessions();
        }

        // take() guards finalization against running twice
        if let Some(orchestrator) = self.orchestrator.take() {
            let manager = self.manager.clone();
            let rendezvous = self.rendezvous.clone();
            tokio::spawn(async move {
                finalize_session(manager, orchestrator, rendezvous).await;
            });
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for InterviewAudioSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                if text.trim() == END_QUESTION {
                    debug!(
                        "Candidate {} ended their turn",
                        self.manager.candidate_id()
                    );
                    if let Some(orchestrator) = &self.orchestrator {
                        orchestrator.end_turn();
                    }
                } else {
                    warn!("Unexpected text frame on audio channel: {}", text);
                }
            }
            Ok(ws::Message::Binary(data)) => {
                let Some(orchestrator) = &self.orchestrator else {
                    warn!("Audio received before session setup, ignoring");
                    return;
                };
                if let Err(e) = orchestrator.process_input_audio(&data) {
                    error!(
                        "Dropping interview for candidate {}: {}",
                        self.manager.candidate_id(),
                        e
                    );
                    ctx.text(e);
                    ctx.stop();
                }
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Interview audio connection closed: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                error!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
        }
    }
}

impl Handler<SendText> for InterviewAudioSocket {
    type Result = ();

    fn handle(&mut self, msg: SendText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<SendAudio> for InterviewAudioSocket {
    type Result = ();

    fn handle(&mut self, msg: SendAudio, ctx: &mut Self::Context) {
        ctx.binary(msg.0);
    }
}

impl Handler<SessionReady> for InterviewAudioSocket {
    type Result = ();

    fn handle(&mut self, _msg: SessionReady, _ctx: &mut Self::Context) {
        let candidate_id = self.manager.candidate_id();
        if !self.manager.mark_in_progress() {
            // A second connection raced this one; the interview record was
            // already moved, so this session proceeds without retagging it
            warn!(
                "Interview for candidate {} was not in Scheduled state",
                candidate_id
            );
        }
        self.app_state.increment_active_sessions();
        self.counted = true;
    }
}

impl Handler<SessionFailed> for InterviewAudioSocket {
    type Result = ();

    fn handle(&mut self, msg: SessionFailed, ctx: &mut Self::Context) {
        error!(
            "Realtime session failed for candidate {}: {}",
            self.manager.candidate_id(),
            msg.0
        );
        ctx.text(msg.0);
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Error,
            description: None,
        }));
        ctx.stop();
    }
}

/// Close out one interview session. Runs exactly once per session,
/// whatever ended the connection.
async fn finalize_session(
    manager: Arc<InterviewManager>,
    orchestrator: Arc<RealtimeOrchestrator>,
    rendezvous: Arc<RendezvousRegistry>,
) {
    let candidate_id = manager.candidate_id();
    orchestrator.stop();

    let transcript = orchestrator.transcript();
    if transcript.is_empty() {
        warn!("No transcript captured for candidate {}", candidate_id);
    } else if let Err(e) = manager.write_transcript(&transcript) {
        error!(
            "Could not persist transcript for candidate {}: {}",
            candidate_id, e
        );
    }

    manager.complete();

    // The video channel may be waiting on this, so it fires last, after the
    // transcript has been persisted
    rendezvous.signal(candidate_id);
    info!("Finalized interview session for candidate {}", candidate_id);
}

/// WebSocket endpoint handler for `/ws/interview/audio`.
///
/// ## HTTP to WebSocket Upgrade:
/// The invite token is validated before the upgrade, so an invalid token is
/// answered with a plain 401 instead of an accepted-then-closed socket.
pub async fn interview_audio(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let candidate = match authenticate(&req, &app_state) {
        Ok(candidate) => candidate,
        Err(response) => return Ok(response),
    };

    info!(
        "Interview audio connection request for candidate {} from {:?}",
        candidate.id,
        req.connection_info().peer_addr()
    );

    let manager = Arc::new(InterviewManager::new(
        candidate,
        app_state.documents.clone(),
        app_state.interviews.clone(),
        app_state.candidates.clone(),
        app_state.tokens.clone(),
    ));
    let rendezvous = app_state.rendezvous.clone();

    ws::start(
        InterviewAudioSocket::new(manager, rendezvous, app_state),
        &req,
        stream,
    )
}

/// Resolve the `token` query parameter to an active candidate, or produce
/// the 401 response the endpoint should answer with.
pub(crate) fn authenticate(
    req: &HttpRequest,
    app_state: &web::Data<AppState>,
) -> Result<crate::candidates::CandidateProfile, HttpResponse> {
    let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .unwrap_or_else(|_| web::Query(HashMap::new()));

    let Some(token) = query.get("token") else {
        return Err(unauthorized("Missing interview token"));
    };

    let candidate_id = match app_state.tokens.resolve(token) {
        Ok(id) => id,
        Err(e) => return Err(unauthorized(&e)),
    };

    match app_state.candidates.get_active(candidate_id) {
        Some(candidate) => Ok(candidate),
        None => Err(unauthorized("Candidate is not eligible for an interview")),
    }
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": {
            "type": "unauthorized",
            "message": message,
        }
    }))
}
