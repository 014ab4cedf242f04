use rocket::Route;

pub(crate) mod auth;
pub(crate) mod ballot;
pub(crate) mod election;
pub(crate) mod relay;
pub(crate) mod voter;
pub(crate) mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(election::routes());
    routes.extend(ballot::routes());
    routes.extend(voter::routes());
    routes.extend(voting::routes());
    routes.extend(relay::routes());
    routes
}
