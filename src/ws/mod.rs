//! WebSocket surfaces.
//!
//! Two upgrade endpoints:
//!
//! - `/ws/activity` relays the shared `agent:activity` channel to any number
//!   of observers. Frames are forwarded verbatim; the relay never parses or
//!   rewrites event payloads.
//! - `/ws/voice` runs the voice round trip: inbound text frames are treated
//!   as finalized transcripts, inbound binary frames feed the streaming
//!   transcriber, and the single agent response per utterance comes back as
//!   JSON frames plus synthesized audio.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;

use crate::collaborators::SpeechSynthesizer;
use crate::store::{Store, Subscription, ACTIVITY_CHANNEL};
use crate::types::{ClientMessage, ReplyMessage};
use crate::voice::VoiceSession;
use crate::AppState;

// ============= Activity Relay =============

/// Upgrade handler for `GET /ws/activity`.
pub async fn activity_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| relay_activity(socket, state.store.clone()))
}

/// Forward activity events to one observer until either side goes away.
async fn relay_activity(mut socket: WebSocket, store: Arc<dyn Store>) {
    let mut subscription = match store.subscribe(ACTIVITY_CHANNEL).await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(error = %e, "activity subscribe failed, closing socket");
            return;
        }
    };
    tracing::debug!("activity observer connected");

    loop {
        tokio::select! {
            event = subscription.next_message() => {
                match event {
                    // Verbatim relay; the payload is already JSON.
                    Some(raw) => {
                        if socket.send(Message::Text(raw.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            frame = socket.recv() => {
                match frame {
                    // Observers only listen; anything but a close/error is
                    // ignored so pings keep the connection alive.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    // Dropping the subscription unsubscribes.
    tracing::debug!("activity observer disconnected");
}

// ============= Voice Bridge =============

/// Upgrade handler for `GET /ws/voice`.
pub async fn voice_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| bridge_voice(socket, state))
}

/// Run one voice connection: session setup, reply forwarding, transcript
/// intake. The session (and its reply subscription) dies with the socket.
async fn bridge_voice(socket: WebSocket, state: AppState) {
    let (session, subscription) = match VoiceSession::open(state.store.clone()).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::warn!(error = %e, "voice session open failed, closing socket");
            return;
        }
    };
    let (sender, mut receiver) = socket.split();

    let forwarder = tokio::spawn(forward_replies(
        sender,
        subscription,
        state.synthesizer.clone(),
    ));

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                // Text frames carry finalized transcripts from the client.
                if let Err(e) = session.submit_transcript(text.as_str()).await {
                    tracing::warn!(session_id = %session.session_id, error = %e, "transcript submit failed");
                }
            }
            Ok(Message::Binary(chunk)) => match state.transcriber.accept_chunk(&chunk).await {
                Ok(Some(transcript)) => {
                    if let Err(e) = session.submit_transcript(&transcript).await {
                        tracing::warn!(session_id = %session.session_id, error = %e, "transcript submit failed");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %session.session_id, error = %e, "audio chunk rejected");
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    forwarder.abort();
    tracing::info!(session_id = %session.session_id, "voice session closed");
}

/// Forward reply-channel messages to the peer as client frames.
async fn forward_replies(
    mut sender: SplitSink<WebSocket, Message>,
    mut subscription: Box<dyn Subscription>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) {
    while let Some(raw) = subscription.next_message().await {
        let reply: ReplyMessage = match serde_json::from_str(&raw) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed reply message");
                continue;
            }
        };
        for frame in client_frames(&reply, synthesizer.as_ref()).await {
            if sender.send(frame).await.is_err() {
                return;
            }
        }
    }
}

/// Translate one agent response into outbound frames: a `media_url` frame
/// when media was generated, and a `text_response` frame followed by the
/// synthesized audio when there is text. Synthesis failure downgrades to
/// text-only rather than dropping the response.
async fn client_frames(reply: &ReplyMessage, synthesizer: &dyn SpeechSynthesizer) -> Vec<Message> {
    let ReplyMessage::AgentResponse(response) = reply;
    let mut frames = Vec::new();

    if let (Some(url), Some(media_type)) = (&response.media_url, &response.media_type) {
        let message = ClientMessage::MediaUrl {
            url: url.clone(),
            media_type: media_type.clone(),
        };
        if let Ok(json) = serde_json::to_string(&message) {
            frames.push(Message::Text(json.into()));
        }
    }

    if let Some(text) = &response.text {
        let message = ClientMessage::TextResponse { text: text.clone() };
        if let Ok(json) = serde_json::to_string(&message) {
            frames.push(Message::Text(json.into()));
        }
        match synthesizer.synthesize(text).await {
            Ok(audio) => frames.push(Message::Binary(audio.into())),
            Err(e) => tracing::warn!(error = %e, "speech synthesis failed, sending text only"),
        }
    }

    frames
}
