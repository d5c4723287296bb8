// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler,
        catalog::{materials_handler, pricing_handler},
        delivery::delivery_handler,
        driver::driver_handler,
        jobs::jobs_handler,
        payments::payments_handler,
        tracking::tracking_handler,
    },
    middleware::{auth, role_check},
    models::usermodel::UserRole,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .route("/health", get(health_check))
        .nest("/materials", materials_handler().layer(middleware::from_fn(auth)))
        .nest("/pricing", pricing_handler().layer(middleware::from_fn(auth)))
        .nest("/jobs", jobs_handler().layer(middleware::from_fn(auth)))
        .nest("/tracking", tracking_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/proof-of-delivery",
            delivery_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/payments", payments_handler())
        .nest(
            "/driver",
            driver_handler()
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Driver])
                }))
                .layer(middleware::from_fn(auth)),
        )
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Admin])
                }))
                .layer(middleware::from_fn(auth)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new().nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, MpesaConfig, PricingConfig, StorageConfig},
        db::memory::MemoryStore,
        models::{jobmodel::JobStatus, paymentmodel::ChargeOutcome, usermodel::User},
        service::{
            admin_service::AdminService,
            delivery_service::DeliveryService,
            error::ServiceError,
            job_service::JobService,
            mpesa::{ChargeRequest, ChargeSession, PaymentGateway},
            payment_service::PaymentService,
            pricing_service::PricingEngine,
            storage::ObjectStorage,
            tracking_service::TrackingService,
        },
        utils::token::create_token,
    };
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";

    struct NoopGateway;

    #[async_trait]
    impl PaymentGateway for NoopGateway {
        async fn initiate_charge(&self, _request: ChargeRequest) -> Result<ChargeSession, ServiceError> {
            Err(ServiceError::ExternalService("offline".to_string()))
        }

        async fn query_charge(&self, _session_id: &str) -> Result<ChargeOutcome, ServiceError> {
            Ok(ChargeOutcome::Processing)
        }
    }

    struct NoopStorage;

    #[async_trait]
    impl ObjectStorage for NoopStorage {
        async fn put(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, ServiceError> {
            Ok(format!("https://files.test/{}", path))
        }
    }

    fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            jwt_secret: SECRET.to_string(),
            port: 0,
            log_level: "debug".to_string(),
            allowed_origins: vec![],
            pricing: PricingConfig::default(),
            mpesa: MpesaConfig {
                consumer_key: String::new(),
                consumer_secret: String::new(),
                business_short_code: String::new(),
                passkey: String::new(),
                callback_url: String::new(),
                environment: "sandbox".to_string(),
            },
            storage: StorageConfig {
                url: String::new(),
                bucket: "delivery-photos".to_string(),
                service_key: String::new(),
            },
            gateway_timeout_secs: 1,
        }
    }

    fn test_app() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let pricing = Arc::new(PricingEngine::new(PricingConfig::default()));
        let state = AppState {
            env: test_config(),
            store: store.clone(),
            job_service: JobService::new(store.clone(), pricing),
            tracking_service: TrackingService::new(store.clone()),
            delivery_service: DeliveryService::new(store.clone(), Arc::new(NoopStorage)),
            payment_service: PaymentService::new(store.clone(), Arc::new(NoopGateway)),
            admin_service: AdminService::new(store.clone()),
        };
        (store, create_router(Arc::new(state)))
    }

    fn bearer(user: &User) -> String {
        let token = create_token(&user.id.to_string(), SECRET.as_bytes(), 3600).unwrap();
        format!("Bearer {}", token)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_, app) = test_app();
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (_, app) = test_app();
        let request = Request::get("/api/jobs").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn role_checks_apply_per_route() {
        let (store, app) = test_app();
        let client = store.add_user(UserRole::Client);

        let request = Request::get("/api/admin/stats")
            .header(header::AUTHORIZATION, bearer(&client))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::FORBIDDEN);

        let request = Request::get("/api/jobs/available")
            .header(header::AUTHORIZATION, bearer(&client))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn driver_accepts_over_http_and_loser_gets_conflict() {
        let (store, app) = test_app();
        let client = store.add_user(UserRole::Client);
        let first = store.add_user(UserRole::Driver);
        let second = store.add_user(UserRole::Driver);
        let job = store.seed_job(client.id, None, JobStatus::Pending);

        let accept = |driver: &User| {
            Request::builder()
                .method(Method::PATCH)
                .uri(format!("/api/jobs/{}", job.id))
                .header(header::AUTHORIZATION, bearer(driver))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"action":"accept"}"#))
                .unwrap()
        };

        let (status, body) = send(&app, accept(&first)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "accepted");

        let (status, body) = send(&app, accept(&second)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Job no longer available for this action");
    }

    #[tokio::test]
    async fn callback_acknowledges_garbage() {
        let (_, app) = test_app();
        let request = Request::post("/api/payments/callback")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ResultCode"], 0);

        let request = Request::get("/api/payments/callback").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn admin_manages_users_and_deactivated_accounts_are_locked_out() {
        let (store, app) = test_app();
        let admin = store.add_user(UserRole::Admin);
        let driver = store.add_user(UserRole::Driver);
        store.add_driver_profile(driver.id, "DL-3030");

        let request = Request::get("/api/admin/users")
            .header(header::AUTHORIZATION, bearer(&admin))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let update = |user: &User, payload: String| {
            Request::builder()
                .method(Method::PATCH)
                .uri("/api/admin/users")
                .header(header::AUTHORIZATION, bearer(user))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .unwrap()
        };

        let (status, body) = send(
            &app,
            update(&admin, format!(r#"{{"user_id":"{}","action":"verify_driver"}}"#, driver.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["driver_profile"]["is_verified"], true);

        // Only admins may manage accounts.
        let (status, _) = send(
            &app,
            update(&driver, format!(r#"{{"user_id":"{}","action":"toggle_active"}}"#, admin.id)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            update(&admin, format!(r#"{{"user_id":"{}","action":"toggle_active"}}"#, driver.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User deactivated");

        let request = Request::get("/api/jobs")
            .header(header::AUTHORIZATION, bearer(&driver))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::FORBIDDEN);
    }
}
