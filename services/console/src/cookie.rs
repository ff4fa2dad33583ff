use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Opaque browser-session id; maps to one entry in the session registry.
pub const SESSION_COOKIE: &str = "garage_session";

pub fn session_id(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE).map(Cookie::value).filter(|v| !v.is_empty())
}

/// Browser-lifetime cookie; idle expiry is enforced server-side.
pub fn set_session_cookie(jar: CookieJar, id: String, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
