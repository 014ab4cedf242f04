use log::info;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    config::SharedSystem,
    error::Result,
    logging::RequestId,
    model::{
        auth::{Admin, AuthToken},
        common::ElectionId,
        relay::{BatchOutcome, RelayBatchRequest, RelayRecord, RelayVoteRequest},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        authorize,
        unauthorize,
        update_quota,
        update_cost_limit,
        get_record,
        relay_vote,
        relay_batch,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaChange {
    pub quota: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLimitChange {
    /// Absent or null removes the limit.
    #[serde(default)]
    pub cost_limit: Option<u64>,
}

#[post("/relay/elections/<id>", data = "<change>", format = "json")]
pub async fn authorize(
    token: AuthToken<Admin>,
    id: ElectionId,
    change: Json<QuotaChange>,
    system: &State<SharedSystem>,
) -> Result<Json<RelayRecord>> {
    let mut system = system.lock().await;
    system.authorize_relay(&token.caller(), id, change.quota)?;
    info!(
        "'{}' authorized the relay for election {id} with quota {}",
        token.principal, change.quota
    );
    Ok(Json(system.relay_record(id)?.clone()))
}

#[delete("/relay/elections/<id>")]
pub async fn unauthorize(
    token: AuthToken<Admin>,
    id: ElectionId,
    system: &State<SharedSystem>,
) -> Result<()> {
    system.lock().await.unauthorize_relay(&token.caller(), id)?;
    info!("'{}' withdrew the relay from election {id}", token.principal);
    Ok(())
}

#[put("/relay/elections/<id>/quota", data = "<change>", format = "json")]
pub async fn update_quota(
    token: AuthToken<Admin>,
    id: ElectionId,
    change: Json<QuotaChange>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_relay_quota(&token.caller(), id, change.quota)
}

#[put("/relay/elections/<id>/cost-limit", data = "<change>", format = "json")]
pub async fn update_cost_limit(
    token: AuthToken<Admin>,
    id: ElectionId,
    change: Json<CostLimitChange>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_relay_cost_limit(&token.caller(), id, change.cost_limit)
}

#[get("/relay/elections/<id>")]
pub async fn get_record(
    _token: AuthToken,
    id: ElectionId,
    system: &State<SharedSystem>,
) -> Result<Json<RelayRecord>> {
    Ok(Json(system.lock().await.relay_record(id)?.clone()))
}

#[post("/relay/votes", data = "<request>", format = "json")]
pub async fn relay_vote(
    token: AuthToken,
    request_id: &RequestId,
    request: Json<RelayVoteRequest>,
    system: &State<SharedSystem>,
) -> Result<()> {
    let election_id = request.election_id;
    system.lock().await.relay_vote(&token.caller(), request.0)?;
    info!("req{request_id}: relayed one vote for election {election_id}");
    Ok(())
}

/// Relay many votes at once. Succeeds if any vote is recorded; the outcome
/// lists each rejected element.
#[post("/relay/votes/batch", data = "<batch>", format = "json")]
pub async fn relay_batch(
    token: AuthToken,
    request_id: &RequestId,
    batch: Json<RelayBatchRequest>,
    system: &State<SharedSystem>,
) -> Result<Json<BatchOutcome>> {
    let election_id = batch.election_id;
    let outcome = system.lock().await.relay_batch(&token.caller(), batch.0)?;
    info!(
        "req{request_id}: relayed {} of {} votes for election {election_id}",
        outcome.succeeded,
        outcome.succeeded + outcome.failures.len()
    );
    Ok(Json(outcome))
}
