use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use carefund_campaigns::CampaignId;
use carefund_core::AggregateId;
use carefund_infra::{CampaignFilter, LedgerService};

use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", axum::routing::post(create_campaign).get(list_campaigns))
        .route("/:id", get(get_campaign).put(update_campaign).delete(delete_campaign))
}

fn parse_campaign_id(id: &str) -> Result<CampaignId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(CampaignId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid campaign id"))
}

pub async fn create_campaign(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Json(body): Json<dto::CampaignRequest>,
) -> axum::response::Response {
    match service.create_campaign(actor.actor(), body.into_draft()) {
        Ok(campaign) => (StatusCode::CREATED, Json(campaign)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_campaign(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Path(id): Path<String>,
    Json(body): Json<dto::CampaignRequest>,
) -> axum::response::Response {
    let campaign_id = match parse_campaign_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service.update_campaign(actor.actor(), campaign_id, body.into_draft()) {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_campaign(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Path(id): Path<String>,
    Query(query): Query<dto::DeleteCampaignQuery>,
) -> axum::response::Response {
    let campaign_id = match parse_campaign_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service.delete_campaign(actor.actor(), campaign_id, query.cascade) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_campaign(
    Extension(service): Extension<Arc<LedgerService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let campaign_id = match parse_campaign_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service.get_campaign(campaign_id) {
        Ok(campaign) => (StatusCode::OK, Json(campaign)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_campaigns(
    Extension(service): Extension<Arc<LedgerService>>,
    Query(query): Query<dto::ListCampaignsQuery>,
) -> axum::response::Response {
    let filter = CampaignFilter {
        is_active: query.active,
        title_contains: query.q,
    };

    (StatusCode::OK, Json(service.list_campaigns(&filter))).into_response()
}
