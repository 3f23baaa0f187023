//! Newsletter campaign routes.
//!
//! Author-facing endpoints for creating, inspecting, cancelling and deleting
//! campaigns, plus the processor trigger invoked by an external cron.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::NewsletterProcessor;
use domain::models::{
    CreateSendRequest, NewsletterEvent, NewsletterSend, ProcessSummary, SendEngagement, SendMode,
    SendResponse, SendStatus,
};
use persistence::repositories::{
    CreateSendParams, NewsletterEventRepository, NewsletterSendRepository,
};
use shared::validation::validate_future_timestamp;

/// Cap for the admin list and per-send event listing.
const MAX_LIST_LIMIT: i64 = 200;
const DEFAULT_LIST_LIMIT: i64 = 50;
const DETAIL_EVENT_LIMIT: i64 = 100;

fn processor_for(state: &AppState) -> NewsletterProcessor {
    NewsletterProcessor::new(
        state.pool.clone(),
        state.adapter.clone(),
        state.config.server.public_base_url.clone(),
        state.config.newsletter.batch_size,
    )
}

/// POST /api/v1/newsletter/send
///
/// Create a campaign. `sendMode=now` renders and dispatches synchronously as
/// part of this request; `sendMode=schedule` persists the row as `scheduled`
/// for a later processor pass.
pub async fn send_newsletter(
    State(state): State<AppState>,
    Json(request): Json<CreateSendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    request
        .validate_content()
        .map_err(ApiError::Validation)?;

    if request.send_mode == SendMode::Schedule {
        // validate_content guarantees the timestamp is present
        if let Some(at) = &request.scheduled_at {
            validate_future_timestamp(at)
                .map_err(|_| ApiError::Validation("scheduledAt must be in the future".to_string()))?;
        }
    }

    let status = match request.send_mode {
        SendMode::Now => SendStatus::Sending,
        SendMode::Schedule => SendStatus::Scheduled,
    };

    let repo = NewsletterSendRepository::new(state.pool.clone());
    let entity = repo
        .create(&CreateSendParams {
            subject: request.subject.clone(),
            kind: request.kind,
            body_html: request.body_html.clone(),
            poster_url: request.poster_url.clone(),
            poster_text: request.poster_text.clone(),
            button_text: request.button_text.clone(),
            button_link: request.button_link.clone(),
            status,
            scheduled_at: match request.send_mode {
                SendMode::Schedule => request.scheduled_at,
                SendMode::Now => None,
            },
        })
        .await?;
    let send: NewsletterSend = entity.into();

    match request.send_mode {
        SendMode::Schedule => {
            info!(
                send_id = send.id,
                scheduled_at = ?send.scheduled_at,
                "Campaign scheduled"
            );
            Ok((
                StatusCode::CREATED,
                Json(SendResponse {
                    send_id: send.id,
                    status: SendStatus::Scheduled,
                    campaign_id: None,
                    scheduled_at: send.scheduled_at,
                }),
            ))
        }
        SendMode::Now => {
            let outcome = processor_for(&state).deliver(&send).await;
            match outcome.error {
                None => Ok((
                    StatusCode::CREATED,
                    Json(SendResponse {
                        send_id: send.id,
                        status: SendStatus::Sent,
                        campaign_id: outcome.campaign_id,
                        scheduled_at: None,
                    }),
                )),
                // The row already carries the error; surface it to the author.
                Some(err) => Err(err.into()),
            }
        }
    }
}

/// POST /api/v1/newsletter/process
///
/// One processor pass over all due campaigns. Safe to invoke repeatedly and
/// concurrently; overlapping passes claim disjoint rows.
pub async fn process_newsletters(
    State(state): State<AppState>,
) -> Result<Json<ProcessSummary>, ApiError> {
    let summary = processor_for(&state).run().await?;
    Ok(Json(summary))
}

/// Response for the cancel endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub send_id: i64,
    pub status: SendStatus,
}

/// POST /api/v1/newsletter/:id/cancel
///
/// Transition `scheduled -> cancelled`. Rejected with a conflict for any
/// other status. If the ESP already knows the campaign, upstream cancel is
/// attempted best-effort.
pub async fn cancel_newsletter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CancelResponse>, ApiError> {
    let repo = NewsletterSendRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Newsletter send {id} not found")))?;
    let send: NewsletterSend = entity.into();

    // Conditional update: the status may have moved since the read above,
    // so zero affected rows is also a conflict.
    let affected = repo.cancel(id).await?;
    if affected == 0 {
        return Err(ApiError::Conflict(format!(
            "Cannot cancel a campaign in status '{}'",
            send.status.as_str()
        )));
    }

    if let Some(campaign_id) = &send.campaign_id {
        if let Err(e) = state.adapter.cancel(campaign_id).await {
            warn!(
                send_id = id,
                campaign_id = %campaign_id,
                error = %e,
                "Upstream cancel failed; local row is cancelled regardless"
            );
        }
    }

    info!(send_id = id, "Campaign cancelled");
    Ok(Json(CancelResponse {
        send_id: id,
        status: SendStatus::Cancelled,
    }))
}

/// DELETE /api/v1/newsletter/:id
///
/// Remove a campaign and its engagement events regardless of status. The
/// ESP-side campaign is deleted best-effort first.
pub async fn delete_newsletter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = NewsletterSendRepository::new(state.pool.clone());
    let entity = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Newsletter send {id} not found")))?;
    let send: NewsletterSend = entity.into();

    if let Some(campaign_id) = &send.campaign_id {
        if let Err(e) = state.adapter.delete(campaign_id).await {
            warn!(
                send_id = id,
                campaign_id = %campaign_id,
                error = %e,
                "Upstream delete failed; deleting local row regardless"
            );
        }
    }

    repo.delete(id).await?;
    info!(send_id = id, "Campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for the admin list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/newsletter
///
/// Recent campaigns, newest first.
pub async fn list_newsletters(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<NewsletterSend>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let repo = NewsletterSendRepository::new(state.pool.clone());
    let sends = repo
        .list(limit)
        .await?
        .into_iter()
        .map(NewsletterSend::from)
        .collect();

    Ok(Json(sends))
}

/// Detail view: the campaign plus its engagement counts and recent events.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDetailResponse {
    #[serde(flatten)]
    pub send: NewsletterSend,
    pub engagement: SendEngagement,
    pub events: Vec<NewsletterEvent>,
}

/// GET /api/v1/newsletter/:id
pub async fn get_newsletter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SendDetailResponse>, ApiError> {
    let send_repo = NewsletterSendRepository::new(state.pool.clone());
    let entity = send_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Newsletter send {id} not found")))?;

    let event_repo = NewsletterEventRepository::new(state.pool.clone());
    let engagement = event_repo.engagement(id).await?;
    let events = event_repo
        .list_by_send(id, DETAIL_EVENT_LIMIT)
        .await?
        .into_iter()
        .map(NewsletterEvent::from)
        .collect();

    Ok(Json(SendDetailResponse {
        send: entity.into(),
        engagement,
        events,
    }))
}
