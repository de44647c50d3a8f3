use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, reviews};

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.production {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .merge(auth::router())
        .merge(reviews::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_state;
    use axum::{
        body::{to_bytes, Body},
        http::{HeaderMap, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn encode(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                    (b as char).to_string()
                }
                _ => format!("%{b:02X}"),
            })
            .collect()
    }

    fn form(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn request(method: Method, uri: &str, body: Option<String>, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("refreshToken={token}"));
        }
        match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(b))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    fn set_cookie(headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("refreshToken="))
            .map(str::to_string)
    }

    fn cookie_value(set_cookie: &str) -> String {
        set_cookie
            .trim_start_matches("refreshToken=")
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    async fn register(app: &Router, email: &str, password: &str, nickname: &str) -> StatusCode {
        let body = form(&[("email", email), ("password", password), ("nickName", nickname)]);
        send(app, request(Method::POST, "/register", Some(body), None)).await.0
    }

    async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, HeaderMap, Value) {
        let body = form(&[("email", email), ("password", password)]);
        send(app, request(Method::POST, "/login", Some(body), None)).await
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(fake_state());
        let res = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_refresh_scenario() {
        let state = fake_state();
        let app = build_app(state.clone());

        assert_eq!(register(&app, "a@x.com", "p1", "A").await, StatusCode::CREATED);

        let (status, headers, body) = login(&app, "a@x.com", "p1").await;
        assert_eq!(status, StatusCode::OK);
        let access = body["accessToken"].as_str().unwrap().to_string();
        assert!(!access.is_empty());
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["nickName"], "A");
        assert!(body["user"].get("password_hash").is_none());
        assert!(body.get("refreshToken").is_none());

        let set = set_cookie(&headers).expect("refresh cookie set");
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Strict"));
        assert!(set.contains("Path=/"));
        assert!(set.contains("Max-Age=604800"));
        let token = cookie_value(&set);

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(token.as_str()));

        let (status, _, body) =
            send(&app, request(Method::POST, "/refreshToken", None, Some(&token))).await;
        assert_eq!(status, StatusCode::CREATED);
        let reissued = body["accessToken"].as_str().unwrap();
        let before = state.jwt.verify_access(&access).unwrap();
        let after = state.jwt.verify_access(reissued).unwrap();
        assert_eq!(before.user(), after.user());
        assert_eq!(body["userData"]["id"], stored.id.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let state = fake_state();
        let app = build_app(state.clone());
        assert_eq!(register(&app, "a@x.com", "p1", "A").await, StatusCode::CREATED);
        assert_eq!(register(&app, "a@x.com", "p2", "B").await, StatusCode::BAD_REQUEST);

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.nickname, "A");
    }

    #[tokio::test]
    async fn register_without_nickname_is_bad_request() {
        let app = build_app(fake_state());
        let body = form(&[("email", "a@x.com"), ("password", "p1")]);
        let (status, _, json) =
            send(&app, request(Method::POST, "/register", Some(body), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("nickName"));
    }

    #[tokio::test]
    async fn wrong_password_sets_no_cookie() {
        let state = fake_state();
        let app = build_app(state.clone());
        register(&app, "a@x.com", "p1", "A").await;

        let (status, headers, body) = login(&app, "a@x.com", "wrong").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(set_cookie(&headers).is_none());
        assert!(body.get("accessToken").is_none());

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_kills_refresh() {
        let state = fake_state();
        let app = build_app(state.clone());
        register(&app, "a@x.com", "p1", "A").await;
        let (_, headers, _) = login(&app, "a@x.com", "p1").await;
        let token = cookie_value(&set_cookie(&headers).unwrap());

        for _ in 0..2 {
            let (status, headers, body) =
                send(&app, request(Method::POST, "/logout", None, Some(&token))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            let removal = set_cookie(&headers).expect("removal cookie");
            assert!(removal.contains("Max-Age=0"));
        }

        let stored = state.users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());

        let (status, _, body) =
            send(&app, request(Method::POST, "/refreshToken", None, Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("accessToken").is_none());
    }

    #[tokio::test]
    async fn logout_without_cookie_is_ok() {
        let app = build_app(fake_state());
        let (status, _, _) = send(&app, request(Method::POST, "/logout", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_without_or_with_unknown_cookie_is_unauthorized() {
        let app = build_app(fake_state());
        let (status, _, _) = send(&app, request(Method::POST, "/refreshToken", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _, _) =
            send(&app, request(Method::POST, "/refreshToken", None, Some("nope"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn withdrawal() {
        let state = fake_state();
        let app = build_app(state.clone());
        register(&app, "a@x.com", "p1", "A").await;

        let body = form(&[("email", "nobody@x.com")]);
        let (status, _, _) =
            send(&app, request(Method::DELETE, "/withdrawal", Some(body), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(state.users.find_by_email("a@x.com").await.unwrap().is_some());

        let body = form(&[("email", "a@x.com")]);
        let (status, _, _) =
            send(&app, request(Method::DELETE, "/withdrawal", Some(body), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.users.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn me_requires_access_token() {
        let app = build_app(fake_state());
        register(&app, "a@x.com", "p1", "A").await;
        let (_, headers, body) = login(&app, "a@x.com", "p1").await;
        let access = body["accessToken"].as_str().unwrap().to_string();
        let refresh = cookie_value(&set_cookie(&headers).unwrap());

        let me = |token: Option<String>| {
            let mut builder = Request::builder().uri("/me");
            if let Some(t) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
            }
            builder.body(Body::empty()).unwrap()
        };

        let (status, _, body) = send(&app, me(Some(access))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");

        let (status, _, _) = send(&app, me(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, me(Some(refresh))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn review_routes() {
        let app = build_app(fake_state());
        let author = uuid::Uuid::new_v4();
        let author_json = format!(r#"{{"_id":"{author}","nickName":"A"}}"#);

        let body = form(&[
            ("review", r#"{"content":"great","rating":4.5,"tags":["sf"]}"#),
            ("author", author_json.as_str()),
            ("movie", r#"{"id":"603","title":"The Matrix"}"#),
        ]);
        let (status, _, json) =
            send(&app, request(Method::POST, "/review/create", Some(body), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        let review = &json["data"]["review"];
        assert_eq!(review["review"]["content"], "great");
        assert_eq!(review["author"]["nickName"], "A");
        assert_eq!(review["movie"]["title"], "The Matrix");
        let id = review["id"].as_str().unwrap().to_string();

        let body = form(&[("review", r#"{"content":"x"}"#)]);
        let (status, _, json) =
            send(&app, request(Method::POST, "/review/create", Some(body), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("movie.title"));

        let (status, _, json) =
            send(&app, request(Method::GET, "/review/view?id=603", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reviews"].as_array().unwrap().len(), 1);

        let uri = format!("/review/find?userId={author}&movieId=603");
        let (status, _, json) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["review"]["id"], id);

        let uri = format!("/review/find?userId={author}&movieId=604");
        let (status, _, _) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let update = format!(r#"{{"_id":"{id}","content":"even better","rating":5}}"#);
        let body = form(&[("review", update.as_str())]);
        let (status, _, _) =
            send(&app, request(Method::POST, "/review/update", Some(body), None)).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/review/findUserReviews?userId={author}");
        let (status, _, json) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["review"]["content"], "even better");

        let uri = format!("/review/delete?id={id}");
        let (status, _, _) = send(&app, request(Method::DELETE, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(&app, request(Method::DELETE, &uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
