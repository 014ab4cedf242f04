use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    config::SharedSystem,
    error::Result,
    model::{
        auth::AuthToken,
        common::ElectionId,
        voter::{KeyHash, NewVoter, Voter, VoterBatch},
    },
};

pub fn routes() -> Vec<Route> {
    routes![add_voter, add_voters_batch, get_voter, check_access]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAdded {
    pub added: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub key_hash: KeyHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access: bool,
}

#[post("/elections/<id>/voters", data = "<voter>", format = "json")]
pub async fn add_voter(
    token: AuthToken,
    id: ElectionId,
    voter: Json<NewVoter>,
    system: &State<SharedSystem>,
) -> Result<Json<Voter>> {
    let mut system = system.lock().await;
    let voter_id = voter.voter_id.clone();
    system.add_voter(&token.caller(), id, voter.0)?;
    Ok(Json(system.voter(id, &voter_id)?.clone()))
}

/// Register many voters at once. Either all are added or none are.
#[post("/elections/<id>/voters/batch", data = "<batch>", format = "json")]
pub async fn add_voters_batch(
    token: AuthToken,
    id: ElectionId,
    batch: Json<VoterBatch>,
    system: &State<SharedSystem>,
) -> Result<Json<BatchAdded>> {
    let added = system
        .lock()
        .await
        .add_voters_batch(&token.caller(), id, batch.0)?;
    Ok(Json(BatchAdded { added }))
}

#[get("/elections/<id>/voters/<voter_id>")]
pub async fn get_voter(
    _token: AuthToken,
    id: ElectionId,
    voter_id: &str,
    system: &State<SharedSystem>,
) -> Result<Json<Voter>> {
    Ok(Json(system.lock().await.voter(id, voter_id)?.clone()))
}

/// Check a key hash against a voter without voting. Needs no account.
#[post("/elections/<id>/voters/<voter_id>/access", data = "<request>", format = "json")]
pub async fn check_access(
    id: ElectionId,
    voter_id: &str,
    request: Json<AccessRequest>,
    system: &State<SharedSystem>,
) -> Result<Json<AccessResponse>> {
    let access = system
        .lock()
        .await
        .verify_access(id, voter_id, &request.key_hash)?;
    Ok(Json(AccessResponse { access }))
}
