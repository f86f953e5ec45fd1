//! Mock controller REST API on wiremock

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "xsrf-test-token";

pub struct MockController {
    pub server: MockServer,
    pub base_url: String,
}

impl MockController {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Successful login setting the XSRF cookie
    pub async fn mock_login(&self) {
        Mock::given(method("POST"))
            .and(path("/api/_session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", format!("XSRF-TOKEN={}; Path=/", TOKEN).as_str())
                    .set_body_json(json!({ "ok": true })),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_login_rejected(&self, message: &str) {
        Mock::given(method("POST"))
            .and(path("/api/_session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error": message
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_session_valid(&self, ok: bool) {
        Mock::given(method("GET"))
            .and(path("/api/_session"))
            .and(header("X-XSRF-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": ok })))
            .mount(&self.server)
            .await;
    }

    /// Current services; only answered when the XSRF header is present
    pub async fn mock_services(&self, services: Value) {
        Mock::given(method("GET"))
            .and(path_regex("currentModernServices"))
            .and(header("X-XSRF-TOKEN", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "status": { "pathman": { "currentModernServices": services } } }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_services_unauthorized(&self) {
        Mock::given(method("GET"))
            .and(path_regex("currentModernServices"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_profiles(&self, profiles: Value) {
        Mock::given(method("GET"))
            .and(path_regex("/config/profiles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "config": { "profiles": profiles } }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_local_endpoints(&self, elements: Value) {
        Mock::given(method("GET"))
            .and(path_regex("nGraphElements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "config": { "network": { "nGraphElements": elements } } }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_group_connections(&self, services: Value) {
        Mock::given(method("GET"))
            .and(path_regex("/conman/services/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "status": { "conman": { "services": services } } }
            })))
            .mount(&self.server)
            .await;
    }

    /// Booking accepted with the given controller id
    pub async fn mock_create_success(&self, new_id: &str) {
        Mock::given(method("POST"))
            .and(path("/api/setModernServices"))
            .and(header("X-XSRF-TOKEN", TOKEN))
            .and(body_partial_json(json!({
                "data": { "conflictStrategy": 0, "bookingStrategy": 2 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(booking_response(new_id, 0)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_create_link_error(&self, message: &str) {
        Mock::given(method("POST"))
            .and(path("/api/setModernServices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "header": { "ok": true },
                "data": { "entriesLink": [{ "id": null, "error": message }] }
            })))
            .mount(&self.server)
            .await;
    }

    /// Cancellation accepted for `service_id` at `rev`
    pub async fn mock_cancel_success(&self, service_id: &str, rev: Value) {
        Mock::given(method("POST"))
            .and(path("/api/cancelModernServices"))
            .and(body_partial_json(json!({
                "data": { "entries": [{ "id": service_id, "rev": rev }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(booking_response(service_id, 0)))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

pub fn booking_response(id: &str, status: i64) -> Value {
    let mut details = serde_json::Map::new();
    details.insert(id.to_string(), json!({ "status": status }));
    json!({
        "header": { "ok": true },
        "data": {
            "entriesLink": [{ "id": id, "error": null }],
            "bookresult": { "details": details }
        }
    })
}

/// One `currentModernServices` entry
pub fn booking(id: &str, from: &str, to: &str, profile: &str, rev: i64) -> Value {
    json!({
        "booking": {
            "serviceId": id,
            "from": from,
            "to": to,
            "profile": profile,
            "start": 1_700_000_000_000_i64,
            "end": 0,
            "rev": rev,
            "createdBy": "ops",
            "allocationState": 0,
            "descriptor": { "label": "", "desc": "" },
            "tags": []
        },
        "res": {}
    })
}
