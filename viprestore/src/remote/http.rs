// File: viprestore/src/remote/http.rs
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::records::{self, Directory};
use super::{Credentials, RemoteClient, Session};
use crate::config::{Config, SystemConfig};
use crate::constants::controller::*;
use crate::constants::http::{CONNECT_TIMEOUT, REQUEST_TIMEOUT, XSRF_COOKIE, XSRF_HEADER};
use crate::errors::RemoteError;
use crate::model::{ServiceId, ServiceRecord};
use crate::selection::{ScheduleInfo, ServiceDefinition};

/// REST adapter for one controller instance.
///
/// Revisions seen in the last listing are cached because the controller
/// requires the current revision to cancel a booking.
pub struct HttpControllerClient {
    system: String,
    base_url: String,
    client: Client,
    revisions: RwLock<HashMap<ServiceId, String>>,
}

impl HttpControllerClient {
    pub fn new(system: &str, base_url: &str, verify_ssl: bool) -> Result<Self, RemoteError> {
        Self::with_timeouts(system, base_url, verify_ssl, REQUEST_TIMEOUT, CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        system: &str,
        base_url: &str,
        verify_ssl: bool,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        if !verify_ssl {
            warn!("TLS certificate verification disabled for system {}", system);
        }

        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_ssl)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            system: system.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            revisions: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(system: &SystemConfig, config: &Config) -> Result<Self, RemoteError> {
        Self::with_timeouts(
            &system.name,
            &system.controller.base_url,
            system.controller.verify_ssl,
            config.request_timeout(),
            config.connect_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        match &session.xsrf_token {
            Some(token) => builder.header(XSRF_HEADER, token),
            None => builder,
        }
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn get_json(&self, session: &Session, path: &str) -> Result<Value, RemoteError> {
        let builder = self.authorized(self.client.get(self.url(path)), session);
        self.send_json(builder).await
    }

    async fn post_booking(
        &self,
        session: &Session,
        path: &str,
        entries: Vec<Value>,
    ) -> Result<Value, RemoteError> {
        let payload = json!({
            "header": { "id": 1 },
            "data": {
                "conflictStrategy": CONFLICT_STRATEGY,
                "bookingStrategy": BOOKING_STRATEGY,
                "entries": entries,
            }
        });

        let builder = self.authorized(self.client.post(self.url(path)).json(&payload), session);
        self.send_json(builder).await
    }

    /// Whether the controller still accepts this session.
    pub async fn validate_session(&self, session: &Session) -> Result<bool, RemoteError> {
        let body = self.get_json(session, SESSION_PATH).await?;
        Ok(body.get("ok").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn logout(&self, session: &Session) -> Result<(), RemoteError> {
        let builder = self.authorized(self.client.delete(self.url(SESSION_PATH)), session);
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        self.revisions.write().await.clear();
        info!("Logged out of {}", self.system);
        Ok(())
    }

    /// Fetch a lookup section; failures degrade to an absent payload.
    async fn optional_section(&self, session: &Session, path: &str, what: &str) -> Option<Value> {
        match self.get_json(session, path).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Failed to fetch {} from {}: {}", what, self.system, e);
                None
            }
        }
    }
}

/// Interpret `entriesLink` and `bookresult.details` for the single entry sent.
fn booking_outcome(response: &Value) -> Result<String, RemoteError> {
    if let Some(false) = response.pointer("/header/ok").and_then(Value::as_bool) {
        let message = response
            .pointer("/header/msg")
            .and_then(Value::as_str)
            .unwrap_or("request refused");
        return Err(RemoteError::Rejected {
            message: message.to_string(),
        });
    }

    let link = response
        .pointer("/data/entriesLink/0")
        .ok_or_else(|| RemoteError::InvalidResponse {
            reason: "response has no entriesLink".to_string(),
        })?;

    match link.get("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(RemoteError::Rejected { message });
        }
    }

    let id = link
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RemoteError::InvalidResponse {
            reason: "entriesLink entry has no id".to_string(),
        })?;

    let status = response
        .pointer("/data/bookresult/details")
        .and_then(|details| details.get(id))
        .and_then(|detail| detail.get("status"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if status != 0 {
        return Err(RemoteError::Rejected {
            message: format!("booking status {}", status),
        });
    }

    Ok(id.to_string())
}

/// Revisions travel as numbers when they look like numbers.
fn revision_value(revision: &str) -> Value {
    revision
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(revision.to_string()))
}

#[async_trait]
impl RemoteClient for HttpControllerClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
        let response = self
            .client
            .post(self.url(SESSION_PATH))
            .form(&[
                ("name", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token = response
            .cookies()
            .find(|c| c.name() == XSRF_COOKIE)
            .map(|c| c.value().to_string());

        let body: Value = response.json().await?;
        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let message = body
                .get("error")
                .or_else(|| body.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(RemoteError::Rejected {
                message: format!("login failed: {}", message),
            });
        }

        let mut session = Session::new(&self.system, &credentials.username);
        match token {
            Some(token) => session = session.with_token(token),
            None => debug!("Controller {} set no {} cookie", self.system, XSRF_COOKIE),
        }

        info!("Authenticated to {} as {}", self.system, credentials.username);
        Ok(session)
    }

    async fn list_services(&self, session: &Session) -> Result<Vec<ServiceRecord>, RemoteError> {
        let (services, profiles, local, external, groups) = tokio::join!(
            self.get_json(session, CURRENT_SERVICES_PATH),
            self.optional_section(session, PROFILES_PATH, "profiles"),
            self.optional_section(session, LOCAL_ENDPOINTS_PATH, "local endpoints"),
            self.optional_section(session, EXTERNAL_ENDPOINTS_PATH, "external endpoints"),
            self.optional_section(session, GROUP_CONNECTIONS_PATH, "group connections"),
        );
        let services = services?;

        let directory = Directory {
            profiles: profiles
                .as_ref()
                .map(records::profile_names)
                .unwrap_or_default(),
            endpoints: records::endpoint_labels(local.as_ref(), external.as_ref()),
        };
        let groups = groups
            .as_ref()
            .map(|body| records::group_connections(body, &directory))
            .unwrap_or_default();

        let listing = records::merge(records::current_services(&services)?, groups, &directory);

        let mut revisions = self.revisions.write().await;
        *revisions = listing
            .iter()
            .filter_map(|r| r.revision.clone().map(|rev| (r.service_id.clone(), rev)))
            .collect();

        info!("Listed {} services on {}", listing.len(), self.system);
        Ok(listing)
    }

    async fn create_service(
        &self,
        session: &Session,
        definition: &ServiceDefinition,
        schedule: &ScheduleInfo,
    ) -> Result<ServiceId, RemoteError> {
        let entry = json!({
            "scheduleInfo": schedule,
            "locked": false,
            "serviceDefinition": definition,
        });

        let response = self
            .post_booking(session, CREATE_SERVICES_PATH, vec![entry])
            .await?;
        let id = booking_outcome(&response)?;

        debug!("Controller {} booked {} -> {} as {}", self.system, definition.from, definition.to, id);
        Ok(id)
    }

    async fn cancel_service(&self, session: &Session, service_id: &str) -> Result<(), RemoteError> {
        let revision = self
            .revisions
            .read()
            .await
            .get(service_id)
            .cloned()
            .ok_or_else(|| RemoteError::UnknownService {
                service_id: service_id.to_string(),
            })?;

        let entry = json!({ "id": service_id, "rev": revision_value(&revision) });
        let response = self
            .post_booking(session, CANCEL_SERVICES_PATH, vec![entry])
            .await?;
        booking_outcome(&response)?;

        self.revisions.write().await.remove(service_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_outcome_success() {
        let response = json!({
            "header": { "ok": true },
            "data": {
                "entriesLink": [{ "id": "new-1", "error": null }],
                "bookresult": { "details": { "new-1": { "status": 0 } } }
            }
        });
        assert_eq!(booking_outcome(&response).unwrap(), "new-1");
    }

    #[test]
    fn test_booking_outcome_failures() {
        let link_error = json!({ "data": { "entriesLink": [{ "id": null, "error": "conflict" }] } });
        assert_eq!(
            booking_outcome(&link_error),
            Err(RemoteError::Rejected { message: "conflict".to_string() })
        );

        let bad_status = json!({ "data": {
            "entriesLink": [{ "id": "x" }],
            "bookresult": { "details": { "x": { "status": 3 } } }
        }});
        assert_eq!(
            booking_outcome(&bad_status),
            Err(RemoteError::Rejected { message: "booking status 3".to_string() })
        );

        let refused = json!({ "header": { "ok": false, "msg": "locked" } });
        assert_eq!(
            booking_outcome(&refused),
            Err(RemoteError::Rejected { message: "locked".to_string() })
        );

        assert!(matches!(
            booking_outcome(&json!({ "data": {} })),
            Err(RemoteError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_revision_value() {
        assert_eq!(revision_value("12"), json!(12));
        assert_eq!(revision_value("r-3"), json!("r-3"));
    }
}
