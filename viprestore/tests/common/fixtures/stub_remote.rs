//! In-process `RemoteClient` that records every call.
//!
//! Create calls are keyed by `serviceDefinition.from`, cancel calls by the
//! service id. Keys can be made to fail or to respond after a delay, and a
//! gate can hold every call until the test releases it.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use viprestore::errors::RemoteError;
use viprestore::model::{ServiceId, ServiceRecord};
use viprestore::remote::{Credentials, RemoteClient, Session};
use viprestore::selection::{ScheduleInfo, ServiceDefinition};

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Authenticate(String),
    List,
    Create {
        definition: ServiceDefinition,
        schedule: ScheduleInfo,
    },
    Cancel(ServiceId),
}

#[derive(Default)]
pub struct StubRemote {
    calls: Mutex<Vec<RemoteCall>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    services: Vec<ServiceRecord>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn with_delay(mut self, key: &str, millis: u64) -> Self {
        self.delays.insert(key.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceRecord>) -> Self {
        self.services = services;
        self
    }

    /// Hold every create/cancel call until `release` adds permits.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn created(&self) -> Vec<(ServiceDefinition, ScheduleInfo)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::Create { definition, schedule } => Some((definition, schedule)),
                _ => None,
            })
            .collect()
    }

    /// Calls started but not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn perform(&self, call: RemoteCall, key: &str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delays.get(key) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(key) {
            return Err(RemoteError::Rejected {
                message: format!("stub refused {}", key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for StubRemote {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push(RemoteCall::Authenticate(credentials.username.clone()));
        Ok(Session::new("stub", &credentials.username).with_token("stub-token"))
    }

    async fn list_services(&self, _session: &Session) -> Result<Vec<ServiceRecord>, RemoteError> {
        self.calls.lock().unwrap().push(RemoteCall::List);
        Ok(self.services.clone())
    }

    async fn create_service(
        &self,
        _session: &Session,
        definition: &ServiceDefinition,
        schedule: &ScheduleInfo,
    ) -> Result<ServiceId, RemoteError> {
        let call = RemoteCall::Create {
            definition: definition.clone(),
            schedule: schedule.clone(),
        };
        self.perform(call, &definition.from).await?;
        Ok(format!("created-{}", definition.from))
    }

    async fn cancel_service(&self, _session: &Session, service_id: &str) -> Result<(), RemoteError> {
        self.perform(RemoteCall::Cancel(service_id.to_string()), service_id)
            .await
    }
}
