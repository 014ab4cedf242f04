use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    config::SharedSystem,
    error::Result,
    model::{
        auth::AuthToken,
        common::ElectionId,
        vote::{Vote, VoteRequest},
        voter::KeyHash,
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, cast_vote_with_key, get_vote]
}

/// A vote authenticated by a pre-shared key hash instead of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedVote {
    pub key_hash: KeyHash,
    #[serde(flatten)]
    pub vote: VoteRequest,
}

/// Vote as the voter bound to the logged-in account.
#[post("/elections/<id>/votes", data = "<vote>", format = "json")]
pub async fn cast_vote(
    token: AuthToken,
    id: ElectionId,
    vote: Json<VoteRequest>,
    system: &State<SharedSystem>,
) -> Result<Json<Vote>> {
    let mut system = system.lock().await;
    let voter_id = vote.voter_id.clone();
    system.cast_vote_direct(&token.caller(), id, vote.0)?;
    Ok(Json(system.vote(id, &voter_id)?.clone()))
}

#[post("/elections/<id>/votes/key", data = "<vote>", format = "json")]
pub async fn cast_vote_with_key(
    id: ElectionId,
    vote: Json<KeyedVote>,
    system: &State<SharedSystem>,
) -> Result<Json<Vote>> {
    let KeyedVote { key_hash, vote } = vote.0;
    let mut system = system.lock().await;
    let voter_id = vote.voter_id.clone();
    system.cast_vote_with_key(id, &key_hash, vote)?;
    Ok(Json(system.vote(id, &voter_id)?.clone()))
}

#[get("/elections/<id>/votes/<voter_id>")]
pub async fn get_vote(
    _token: AuthToken,
    id: ElectionId,
    voter_id: &str,
    system: &State<SharedSystem>,
) -> Result<Json<Vote>> {
    Ok(Json(system.lock().await.vote(id, voter_id)?.clone()))
}
