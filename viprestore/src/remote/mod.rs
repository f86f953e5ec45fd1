// File: viprestore/src/remote/mod.rs
//! The controller capability consumed by the batch orchestrator.
//!
//! Every call takes an explicit [`Session`]; nothing in this crate holds a
//! "current controller" globally. Implementations must accept concurrent
//! calls from independent tasks.

pub mod http;
pub mod records;

use async_trait::async_trait;
use std::fmt;

use crate::errors::RemoteError;
use crate::model::{ServiceId, ServiceRecord};
use crate::selection::{ScheduleInfo, ServiceDefinition};

pub use http::HttpControllerClient;

/// Login credentials for one controller system
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated controller session.
///
/// The anti-forgery token is sent back on every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub system: String,
    pub username: String,
    pub xsrf_token: Option<String>,
}

impl Session {
    pub fn new(system: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            username: username.into(),
            xsrf_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.xsrf_token = Some(token.into());
        self
    }
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, RemoteError>;

    /// Every service the controller currently knows, group services included.
    async fn list_services(&self, session: &Session) -> Result<Vec<ServiceRecord>, RemoteError>;

    /// Book one service. Returns the id the controller assigned.
    async fn create_service(
        &self,
        session: &Session,
        definition: &ServiceDefinition,
        schedule: &ScheduleInfo,
    ) -> Result<ServiceId, RemoteError>;

    async fn cancel_service(&self, session: &Session, service_id: &str) -> Result<(), RemoteError>;
}
