use log::info;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::{Config, SharedAccounts},
    error::Result,
    model::auth::{AuthToken, Credentials, Rights, AUTH_TOKEN_COOKIE},
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

/// Create an ordinary account. Administrators are only created from config.
#[post("/auth/register", data = "<credentials>", format = "json")]
pub async fn register(
    credentials: Json<Credentials>,
    accounts: &State<SharedAccounts>,
) -> Result<()> {
    accounts
        .lock()
        .await
        .register(credentials.0, Rights::User)?;
    Ok(())
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    accounts: &State<SharedAccounts>,
    config: &State<Config>,
) -> Result<()> {
    let token: AuthToken = {
        let accounts = accounts.lock().await;
        let account = accounts.authenticate(&credentials)?;
        AuthToken::new(account)
    };
    info!("'{}' logged in with {} rights", token.principal, token.rights);
    cookies.add(token.into_cookie(config)?);
    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
