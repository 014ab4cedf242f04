use rocket::{serde::json::Json, Route, State};

use crate::{
    config::SharedSystem,
    error::Result,
    model::{
        auth::AuthToken,
        ballot::{Ballot, BallotSpec},
        common::{BallotId, ElectionId},
    },
};

pub fn routes() -> Vec<Route> {
    routes![add_ballot, get_ballot]
}

#[post("/elections/<id>/ballots", data = "<spec>", format = "json")]
pub async fn add_ballot(
    token: AuthToken,
    id: ElectionId,
    spec: Json<BallotSpec>,
    system: &State<SharedSystem>,
) -> Result<Json<Ballot>> {
    let mut system = system.lock().await;
    let ballot_id = system.add_ballot(&token.caller(), id, spec.0)?;
    Ok(Json(system.ballot(id, ballot_id)?.clone()))
}

#[get("/elections/<id>/ballots/<ballot_id>")]
pub async fn get_ballot(
    id: ElectionId,
    ballot_id: BallotId,
    system: &State<SharedSystem>,
) -> Result<Json<Ballot>> {
    Ok(Json(system.lock().await.ballot(id, ballot_id)?.clone()))
}
