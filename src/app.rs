use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .nest("/api/v1", users::router())
        .route(
            "/",
            get(|| async { StatusCode::OK }).fallback(users::handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/user/register",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_returns_token_and_user_without_password() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "secret" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_register_is_conflict() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com", "secret").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "other" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn login_flow_and_uniform_failures() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com", "secret").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["user"]["email"], "a@x.com");

        let (wrong_status, wrong_body) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "nope" })),
        )
        .await;
        let (unknown_status, unknown_body) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "who@x.com", "password": "secret" })),
        )
        .await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_body, unknown_body);
    }

    #[tokio::test]
    async fn malformed_login_email_is_unauthorized() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "bob", "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn profile_view_and_build() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com", "secret").await;

        let (status, body) =
            send(&app, Method::GET, "/api/v1/user/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User profile");
        assert_eq!(body["data"]["email"], "a@x.com");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/profile",
            Some(&token),
            Some(json!({ "first_name": "Ada", "last_name": "Lovelace" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["first_name"], "Ada");
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn token_for_a_cannot_touch_b() {
        let app = build_app(AppState::fake());
        let token_a = register(&app, "a@x.com", "secret-a").await;
        let token_b = register(&app, "b@x.com", "secret-b").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/profile",
            Some(&token_a),
            Some(json!({ "email": "b@x.com", "first_name": "Eve", "last_name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/user/pwd",
            Some(&token_a),
            Some(json!({ "email": "b@x.com", "password": "hijacked" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, b_profile) =
            send(&app, Method::GET, "/api/v1/user/profile", Some(&token_b), None).await;
        assert!(b_profile["data"].get("first_name").is_none());

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "b@x.com", "password": "secret-b" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn change_password_then_login() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com", "old-pass").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/pwd",
            Some(&token),
            Some(json!({ "password": "new-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "password changed");

        let login = |password: &'static str| {
            let app = app.clone();
            async move {
                send(
                    &app,
                    Method::POST,
                    "/api/v1/user/login",
                    None,
                    Some(json!({ "email": "a@x.com", "password": password })),
                )
                .await
                .0
            }
        };
        assert_eq!(login("new-pass").await, StatusCode::OK);
        assert_eq!(login("old-pass").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_or_bad_tokens() {
        let app = build_app(AppState::fake());
        let token = register(&app, "a@x.com", "secret").await;
        let tampered = format!("{}x", token);

        for bad in [None, Some("garbage"), Some(tampered.as_str())] {
            let (status, body) = send(&app, Method::GET, "/api/v1/user/profile", bad, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "invalid_token");

            let (status, _) = send(
                &app,
                Method::POST,
                "/api/v1/user/pwd",
                bad,
                Some(json!({ "password": "x" })),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn token_from_another_deployment_is_rejected() {
        let app = build_app(AppState::fake());
        register(&app, "a@x.com", "secret").await;

        let foreign = crate::auth::JwtKeys::new(&crate::config::JwtConfig {
            secret: "someone-elses-secret".into(),
            issuer: "test-issuer".into(),
            ttl_minutes: 5,
        })
        .sign(1, "a@x.com")
        .unwrap();

        let (status, _) =
            send(&app, Method::GET, "/api/v1/user/profile", Some(&foreign), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn other_methods_are_405() {
        let app = build_app(AppState::fake());
        for (method, uri) in [
            (Method::GET, "/api/v1/user/register"),
            (Method::GET, "/api/v1/user/login"),
            (Method::DELETE, "/api/v1/user/profile"),
            (Method::PUT, "/api/v1/user/pwd"),
        ] {
            let (status, body) = send(&app, method, uri, None, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
            assert_eq!(body["error"], "method_not_allowed");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_validation_error() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/user/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn liveness_routes() {
        let app = build_app(AppState::fake());
        assert_eq!(send(&app, Method::GET, "/", None, None).await.0, StatusCode::OK);
        assert_eq!(
            send(&app, Method::GET, "/api/v1/user/ping", None, None).await.0,
            StatusCode::OK
        );
    }
}
