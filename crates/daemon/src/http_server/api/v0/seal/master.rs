//! Generation ceremony over websockets
//!
//! Every party that wants a share of the next master secret opens
//! `GET /seal/master?threshold=N` as a websocket and waits. Once an operator
//! calls `/seal/master/complete`, each open socket receives a single
//! `{"part": "<base64>"}` text frame followed by a close frame. A share only
//! counts as delivered once that frame has been written. Aborting the
//! ceremony closes the sockets without a share. A party that hangs up before
//! completion is dropped from the ceremony.

use std::borrow::Cow;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use common::prelude::{GenerationReport, ShareDelivery, VaultError};

use crate::http_server::api::encoding::encode_share;
use crate::http_server::api::error::from_kind;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterRequest {
    /// Shares required to reconstruct the new master secret
    pub threshold: usize,
}

/// Frame carrying a freshly minted share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareFrame {
    pub part: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(req): Query<MasterRequest>,
    ws: WebSocketUpgrade,
) -> Result<Response, MasterError> {
    // register before upgrading so a bad threshold is still a plain http error
    let receiver = state.vault().register_recipient(req.threshold).await?;
    let (recipients, _) = state.vault().pending_recipients().await;
    tracing::info!(
        threshold = req.threshold,
        recipients,
        "share recipient connected"
    );

    Ok(ws.on_upgrade(move |socket| deliver(socket, receiver)))
}

enum Event {
    Share(ShareDelivery),
    Aborted,
    Disconnected,
}

/// Resolves once the peer closes the socket or the connection drops
async fn disconnected(socket: &mut WebSocket) {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        }
    }
}

async fn deliver(mut socket: WebSocket, receiver: flume::Receiver<ShareDelivery>) {
    let event = tokio::select! {
        delivery = receiver.recv_async() => match delivery {
            Ok(delivery) => Event::Share(delivery),
            Err(_) => Event::Aborted,
        },
        _ = disconnected(&mut socket) => Event::Disconnected,
    };
    drop(receiver);

    let reason = match event {
        Event::Disconnected => {
            tracing::info!("share recipient disconnected before completion");
            return;
        }
        Event::Aborted => "ceremony aborted",
        Event::Share(delivery) => {
            let frame = ShareFrame {
                part: encode_share(delivery.share()),
            };
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode share frame");
                    return;
                }
            };
            if let Err(e) = socket.send(Message::Text(text)).await {
                tracing::warn!(error = %e, "failed to send share to recipient");
                return;
            }
            delivery.acknowledge();
            "share delivered"
        }
    };

    let close = Message::Close(Some(CloseFrame {
        code: close_code::NORMAL,
        reason: Cow::Borrowed(reason),
    }));
    if let Err(e) = socket.send(close).await {
        tracing::debug!(error = %e, "failed to close recipient socket");
    }
}

/// Mint the new master secret and deliver its shares
pub async fn complete_handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, MasterError> {
    let report: GenerationReport = state.vault().complete_generation().await?;
    tracing::info!(
        recipients = report.recipients,
        delivered = report.delivered,
        threshold = report.threshold,
        rotated = report.rotated,
        "generation ceremony completed"
    );
    Ok((http::StatusCode::OK, Json(report)).into_response())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortResponse {
    pub dropped: usize,
}

pub async fn abort_handler(State(state): State<ServiceState>) -> impl IntoResponse {
    let dropped = state.vault().abort_generation().await;
    (http::StatusCode::OK, Json(AbortResponse { dropped }))
}

#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl IntoResponse for MasterError {
    fn into_response(self) -> Response {
        match self {
            MasterError::Vault(e) => {
                tracing::warn!(error = %e, "generation ceremony request failed");
                from_kind(e.kind(), e)
            }
        }
    }
}
