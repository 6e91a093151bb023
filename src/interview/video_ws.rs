//! # Interview Video WebSocket Handler
//!
//! Receives the candidate's recorded video during the interview. Clients
//! connect to `/ws/interview/video?token=...`, stream container fragments as
//! binary frames, and send the text frame `TRANSFER_COMPLETE` after the last
//! one.
//!
//! ## Completion:
//! Once the upload ends (and produced at least one chunk), the file is
//! remuxed in place and the handler waits for the audio channel's
//! rendezvous signal, so downstream analysis starts only when the transcript
//! is already on disk. A disconnect mid-upload counts as the end of the
//! upload too: whatever was written is still remuxed and handed to analysis.
//! An upload with zero chunks leaves no file behind and skips analysis
//! entirely.

use crate::interview::events::TRANSFER_COMPLETE;
use crate::interview::manager::InterviewManager;
use crate::interview::remux::remux_in_place;
use crate::interview::rendezvous::{RendezvousRegistry, WaitOutcome};
use crate::interview::report::ReportGenerator;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Accumulates uploaded video fragments into one file.
///
/// The file is opened lazily on the first chunk, so an upload that never
/// sends one leaves nothing on disk.
pub(crate) struct VideoRecorder {
    path: PathBuf,
    file: Option<File>,
    chunks: usize,
}

impl VideoRecorder {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            chunks: 0,
        }
    }

    pub(crate) fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.file = Some(File::create(&self.path)?);
        }
        // The unwrap cannot fire: the file was just created above
        self.file.as_mut().unwrap().write_all(data)?;
        self.chunks += 1;
        Ok(())
    }

    pub(crate) fn chunks(&self) -> usize {
        self.chunks
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Flush and close the file. Returns whether any chunk was written.
    pub(crate) fn finish(&mut self) -> std::io::Result<bool> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(self.chunks > 0)
    }
}

/// WebSocket actor for one candidate's video upload.
pub struct InterviewVideoSocket {
    manager: Arc<InterviewManager>,
    rendezvous: Arc<RendezvousRegistry>,
    app_state: web::Data<AppState>,
    recorder: VideoRecorder,
    /// Set once `TRANSFER_COMPLETE` arrives, so stray frames after it and
    /// duplicate completion markers are ignored
    completing: bool,
    last_heartbeat: Instant,
}

impl InterviewVideoSocket {
    pub fn new(
        manager: Arc<InterviewManager>,
        rendezvous: Arc<RendezvousRegistry>,
        app_state: web::Data<AppState>,
    ) -> Self {
        let path = manager.qa_dir().join("video.webm");
        Self {
            manager,
            rendezvous,
            app_state,
            recorder: VideoRecorder::new(path),
            completing: false,
            last_heartbeat: Instant::now(),
        }
    }
}

/// The upload has been fully processed; close the connection.
#[derive(Message)]
#[rtype(result = "()")]
struct UploadFinished;

impl Actor for InterviewVideoSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let candidate_id = self.manager.candidate_id();
        info!(
            "Interview video connection started for candidate {}",
            candidate_id
        );

        if let Err(message) = self.manager.check_prerequisites() {
            warn!(
                "Rejecting video upload for candidate {}: {}",
                candidate_id, message
            );
            ctx.text(message);
            ctx.close(Some(ws::CloseReason {
                code: ws::CloseCode::Policy,
                description: None,
            }));
            ctx.stop();
            return;
        }

        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(60) {
                warn!("Interview video heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // A disconnect mid-upload still post-processes what arrived: the
        // fragmented file remains usable and analysis must not be lost to a
        // browser crash
        if self.finish_upload() {
            warn!(
                "Interview video connection for candidate {} ended before transfer \
                 completion, post-processing anyway",
                self.manager.candidate_id()
            );
            self.spawn_postprocess(None);
        }
        info!(
            "Interview video connection stopped for candidate {} ({} chunks)",
            self.manager.candidate_id(),
            self.recorder.chunks()
        );
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for InterviewVideoSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Binary(data)) => {
                if self.completing {
                    warn!("Video chunk received after transfer completion, ignoring");
                    return;
                }
                if let Err(e) = self.recorder.write_chunk(&data) {
                    error!(
                        "Could not write video chunk for candidate {}: {}",
                        self.manager.candidate_id(),
                        e
                    );
                    ctx.text(format!("Could not store video: {}", e));
                    ctx.stop();
                }
            }
            Ok(ws::Message::Text(text)) => {
                if text.trim() == TRANSFER_COMPLETE {
                    self.handle_transfer_complete(ctx);
                } else {
                    warn!("Unexpected text frame on video channel: {}", text);
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
                info!("Interview video connection closed: {:?}", reason);
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

impl InterviewVideoSocket {
    /// Flush the recorder and claim the one post-processing slot.
    ///
    /// Returns true when this caller should run post-processing: the slot
    /// was free and at least one chunk was written. Whichever of the
    /// completion sentinel and the disconnect path gets here first wins.
    fn finish_upload(&mut self) -> bool {
        if self.completing {
            return false;
        }
        self.completing = true;

        match self.recorder.finish() {
            Ok(had_chunks) => had_chunks,
            Err(e) => {
                error!(
                    "Could not flush video for candidate {}: {}",
                    self.manager.candidate_id(),
                    e
                );
                false
            }
        }
    }

    /// Run the remux / rendezvous / analysis pipeline in the background.
    /// `notify` receives `UploadFinished` afterwards when the connection is
    /// still around to be closed.
    fn spawn_postprocess(&self, notify: Option<Addr<Self>>) {
        let config = self.app_state.get_config();
        let manager = self.manager.clone();
        let rendezvous = self.rendezvous.clone();
        let reports = self.app_state.reports.clone();
        let video_path = self.recorder.path().clone();

        tokio::spawn(async move {
            finalize_video(
                manager,
                rendezvous,
                reports,
                &config.report.remux_program,
                Duration::from_secs(config.interview.rendezvous_timeout_secs),
                video_path,
            )
            .await;
            if let Some(addr) = notify {
                addr.do_send(UploadFinished);
            }
        });
    }

    fn handle_transfer_complete(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if self.completing {
            return;
        }

        if !self.finish_upload() {
            info!(
                "Video upload for candidate {} carried no chunks, skipping analysis",
                self.manager.candidate_id()
            );
            ctx.close(None);
            ctx.stop();
            return;
        }

        self.spawn_postprocess(Some(ctx.address()));
    }
}

impl Handler<UploadFinished> for InterviewVideoSocket {
    type Result = ();

    fn handle(&mut self, _msg: UploadFinished, ctx: &mut Self::Context) {
        ctx.close(None);
        ctx.stop();
    }
}

/// Post-upload pipeline: remux the recording, wait for the audio channel to
/// finalize, then hand the session to analysis.
pub(crate) async fn finalize_video(
    manager: Arc<InterviewManager>,
    rendezvous: Arc<RendezvousRegistry>,
    reports: Arc<dyn ReportGenerator>,
    remux_program: &str,
    rendezvous_timeout: Duration,
    video_path: PathBuf,
) {
    let candidate_id = manager.candidate_id();
    remux_in_place(remux_program, &video_path).await;

    match rendezvous.wait(candidate_id, rendezvous_timeout).await {
        WaitOutcome::Signalled => {
            debug!("Audio channel finalized for candidate {}", candidate_id);
            reports.trigger(candidate_id, &manager.qa_dir());
        }
        WaitOutcome::TimedOut => {
            warn!(
                "Timed out waiting for the audio channel of candidate {}, skipping analysis",
                candidate_id
            );
        }
    }
}

/// WebSocket endpoint handler for `/ws/interview/video`.
pub async fn interview_video(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let candidate = match crate::interview::audio_ws::authenticate(&req, &app_state) {
        Ok(candidate) => candidate,
        Err(response) => return Ok(response),
    };

    info!(
        "Interview video connection request for candidate {} from {:?}",
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
        InterviewVideoSocket::new(manager, rendezvous, app_state),
        &req,
        stream,
    )
}
