use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use carefund_campaigns::CampaignId;
use carefund_core::AggregateId;
use carefund_donations::{DonationId, DonorDetails, DonorRef};
use carefund_infra::{DonationFilter, LedgerService};

use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_donation))
        .route("/pending", get(list_pending_donations))
        .route("/:id/approve", post(approve_donation))
        .route("/:id/reject", post(reject_donation))
}

fn parse_donation_id(id: &str) -> Result<DonationId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(DonationId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid donation id"))
}

pub async fn submit_donation(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Json(body): Json<dto::SubmitDonationRequest>,
) -> axum::response::Response {
    let campaign_id = match body.campaign_id.parse::<AggregateId>() {
        Ok(v) => CampaignId::new(v),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid campaign id");
        }
    };

    let donor = if body.anonymous {
        DonorRef::Anonymous
    } else {
        DonorRef::User(actor.actor().id)
    };

    let details = DonorDetails {
        email: body.email,
        card_name: body.card_name,
    };

    match service.submit_donation(actor.actor(), campaign_id, body.amount, donor, details) {
        Ok(donation) => (StatusCode::CREATED, Json(donation)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn approve_donation(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    let donation_id = match parse_donation_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service.approve_donation(actor.actor(), donation_id) {
        Ok((donation, campaign)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "donation": donation, "campaign": campaign })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn reject_donation(
    Extension(service): Extension<Arc<LedgerService>>,
    actor: ActorContext,
    Path(id): Path<String>,
    Json(body): Json<dto::RejectDonationRequest>,
) -> axum::response::Response {
    let donation_id = match parse_donation_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match service.reject_donation(actor.actor(), donation_id, body.reason) {
        Ok(donation) => (StatusCode::OK, Json(donation)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_pending_donations(
    Extension(service): Extension<Arc<LedgerService>>,
    _actor: ActorContext,
    Query(query): Query<dto::PendingDonationsQuery>,
) -> axum::response::Response {
    let campaign_id = match query.campaign_id {
        Some(raw) => match raw.parse::<AggregateId>() {
            Ok(v) => Some(CampaignId::new(v)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid campaign id",
                );
            }
        },
        None => None,
    };

    let filter = DonationFilter { campaign_id };
    (StatusCode::OK, Json(service.list_pending_donations(&filter))).into_response()
}
