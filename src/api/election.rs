use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::{
    config::SharedSystem,
    error::Result,
    model::{
        auth::AuthToken,
        common::{ContentRef, ElectionId},
        election::{
            BasicInfo, ElectionCounts, ElectionDescription, ElectionSpec, ElectionStatus,
            ElectionSummary, Messages, ResultsConfig, Timing, VotingSettings,
        },
        event::EventRecord,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        my_elections,
        get_election,
        delete_election,
        change_status,
        update_info,
        update_timing,
        update_settings,
        update_messages,
        update_results,
        update_metadata,
        update_url,
        get_counts,
        get_events,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ElectionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataChange {
    pub metadata_ref: ContentRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlChange {
    pub url: String,
}

#[post("/elections", data = "<spec>", format = "json")]
pub async fn create_election(
    token: AuthToken,
    spec: Json<ElectionSpec>,
    system: &State<SharedSystem>,
) -> Result<Json<ElectionDescription>> {
    let mut system = system.lock().await;
    let id = system.create_election(&token.caller(), spec.0)?;
    Ok(Json(system.election(id)?.into()))
}

/// The caller's own elections.
#[get("/elections")]
pub async fn my_elections(
    token: AuthToken,
    system: &State<SharedSystem>,
) -> Json<Vec<ElectionSummary>> {
    Json(system.lock().await.elections_created_by(&token.principal))
}

#[get("/elections/<id>")]
pub async fn get_election(
    id: ElectionId,
    system: &State<SharedSystem>,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(system.lock().await.election(id)?.into()))
}

#[delete("/elections/<id>")]
pub async fn delete_election(
    token: AuthToken,
    id: ElectionId,
    system: &State<SharedSystem>,
) -> Result<()> {
    system.lock().await.delete_election(&token.caller(), id)
}

#[post("/elections/<id>/status", data = "<change>", format = "json")]
pub async fn change_status(
    token: AuthToken,
    id: ElectionId,
    change: Json<StatusChange>,
    system: &State<SharedSystem>,
) -> Result<Json<ElectionSummary>> {
    let mut system = system.lock().await;
    system.transition(&token.caller(), id, change.status)?;
    Ok(Json(system.election(id)?.into()))
}

#[put("/elections/<id>/info", data = "<info>", format = "json")]
pub async fn update_info(
    token: AuthToken,
    id: ElectionId,
    info: Json<BasicInfo>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_basic_info(&token.caller(), id, info.0)
}

#[put("/elections/<id>/timing", data = "<timing>", format = "json")]
pub async fn update_timing(
    token: AuthToken,
    id: ElectionId,
    timing: Json<Timing>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_timing(&token.caller(), id, timing.0)
}

#[put("/elections/<id>/settings", data = "<settings>", format = "json")]
pub async fn update_settings(
    token: AuthToken,
    id: ElectionId,
    settings: Json<VotingSettings>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_voting_settings(&token.caller(), id, settings.0)
}

#[put("/elections/<id>/messages", data = "<messages>", format = "json")]
pub async fn update_messages(
    token: AuthToken,
    id: ElectionId,
    messages: Json<Messages>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_messages(&token.caller(), id, messages.0)
}

#[put("/elections/<id>/results", data = "<results>", format = "json")]
pub async fn update_results(
    token: AuthToken,
    id: ElectionId,
    results: Json<ResultsConfig>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_results(&token.caller(), id, results.0)
}

#[put("/elections/<id>/metadata", data = "<change>", format = "json")]
pub async fn update_metadata(
    token: AuthToken,
    id: ElectionId,
    change: Json<MetadataChange>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_metadata(&token.caller(), id, change.0.metadata_ref)
}

#[put("/elections/<id>/url", data = "<change>", format = "json")]
pub async fn update_url(
    token: AuthToken,
    id: ElectionId,
    change: Json<UrlChange>,
    system: &State<SharedSystem>,
) -> Result<()> {
    system
        .lock()
        .await
        .update_access_url(&token.caller(), id, change.0.url)
}

#[get("/elections/<id>/counts")]
pub async fn get_counts(id: ElectionId, system: &State<SharedSystem>) -> Result<Json<ElectionCounts>> {
    Ok(Json(system.lock().await.counts(id)?))
}

#[get("/elections/<id>/events")]
pub async fn get_events(
    _token: AuthToken,
    id: ElectionId,
    system: &State<SharedSystem>,
) -> Result<Json<Vec<EventRecord>>> {
    let system = system.lock().await;
    let events = system.events(id)?.into_iter().cloned().collect();
    Ok(Json(events))
}
