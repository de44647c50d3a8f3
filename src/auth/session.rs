use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const REFRESH_COOKIE: &str = "refreshToken";

/// HTTP-only, same-site strict cookie carrying the refresh token.
pub fn refresh_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

/// Removal cookie; attributes must match the ones the cookie was set with.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .build()
}

pub fn read_refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
