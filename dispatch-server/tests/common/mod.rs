//! Test harness: an in-memory server driven through the router

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use dispatch_server::auth::JwtConfig;
use dispatch_server::jobs::Actor;
use dispatch_server::{Config, JwtService, ServerState, build_router};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::job::Role;
use tower::ServiceExt;

pub struct TestApp {
    pub state: ServerState,
    router: Router,
    jwt: JwtService,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.jwt = JwtConfig {
            secret: "integration-test-secret-0123456789abcdef".to_string(),
            expiration_minutes: 60,
            issuer: "test-identity".to_string(),
            audience: "dispatch-test".to_string(),
        };
        config.eta.routing_url = None;
        config.geo.geocoder_url = None;

        let state = ServerState::in_memory(&config).expect("in-memory state");
        let jwt = JwtService::with_config(config.jwt.clone());
        Self {
            router: build_router(state.clone()),
            state,
            jwt,
        }
    }

    pub fn token(&self, id: &str, name: &str, role: Role) -> String {
        self.jwt
            .generate_token(&Actor::new(id, name, role))
            .expect("token")
    }

    pub fn customer(&self) -> String {
        self.token("cust-1", "Ana Cruz", Role::Customer)
    }

    pub fn operator(&self) -> String {
        self.token("op-1", "Dispatch Desk", Role::Operator)
    }

    pub fn technician(&self, id: &str, name: &str) -> String {
        let actor = Actor::new(id, name, Role::Technician).with_phone("+63 917 555 0101");
        self.jwt.generate_token(&actor).expect("token")
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Submit a ticket as the default customer; returns its id
    pub async fn submit_ticket(&self) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/api/customer/tickets",
                Some(&self.customer()),
                Some(json!({
                    "contact": { "name": "Ana Cruz", "phone": "+63 900 111 2222" },
                    "device": { "device_type": "washing machine", "brand": "Lumen" },
                    "issue": "Drum does not spin",
                    "address": "12 Mabini St, Makati",
                    "coordinates": { "lat": 14.5547, "lng": 121.0244 }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().expect("ticket id")
    }

    /// Offer the ticket; returns the job id
    pub async fn offer(&self, ticket_id: i64, candidates: &[&str]) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                &format!("/api/admin/tickets/{}/offer", ticket_id),
                Some(&self.operator()),
                Some(json!({ "candidates": candidates })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().expect("job id")
    }

    pub async fn set_status(&self, job_id: i64, token: &str, status: &str) -> (StatusCode, Value) {
        self.send(
            "PUT",
            &format!("/api/jobs/{}/status", job_id),
            Some(token),
            Some(json!({ "status": status })),
        )
        .await
    }
}
