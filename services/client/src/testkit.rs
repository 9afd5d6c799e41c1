//! services/client/src/testkit.rs
//!
//! In-crate test doubles for the transport and storage ports, plus wire
//! fixtures shared by the module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventbook_core::ports::{
    ApiError, ApiResult, HttpTransport, SecureStorage, StorageResult, WireRequest, WireResponse,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::config::ClientConfig;

enum Script {
    Respond(ApiResult<WireResponse>),
    Hold {
        started: oneshot::Sender<()>,
        release: oneshot::Receiver<ApiResult<WireResponse>>,
    },
    Pending,
}

/// A transport that replays a scripted sequence of responses and records
/// every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<WireRequest>>,
}

/// Handle to a held request: `started` resolves once the request has been
/// dispatched, `release` resolves it.
pub struct HoldHandle {
    pub started: oneshot::Receiver<()>,
    pub release: oneshot::Sender<ApiResult<WireResponse>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_raw(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Script::Respond(Ok(WireResponse {
                status,
                body: body.to_string(),
            })));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, &body.to_string());
    }

    pub fn push_ok(&self, body: Value) {
        self.push_json(200, body);
    }

    pub fn push_error(&self, error: ApiError) {
        self.script
            .lock()
            .unwrap()
            .push_back(Script::Respond(Err(error)));
    }

    /// Queues a response that blocks until released by the returned handle.
    pub fn push_hold(&self) -> HoldHandle {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.script.lock().unwrap().push_back(Script::Hold {
            started: started_tx,
            release: release_rx,
        });
        HoldHandle {
            started: started_rx,
            release: release_tx,
        }
    }

    /// Queues a response that never resolves.
    pub fn push_pending(&self) {
        self.script.lock().unwrap().push_back(Script::Pending);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> WireRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> ApiResult<WireResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Respond(result)) => result,
            Some(Script::Hold { started, release }) => {
                let _ = started.send(());
                release
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Network("hold handle dropped".to_string())))
            }
            Some(Script::Pending) => futures::future::pending().await,
            None => Err(ApiError::Network("no scripted response left".to_string())),
        }
    }
}

/// An in-memory stand-in for the platform keychain.
#[derive(Default)]
pub struct MemoryKeychain {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKeychain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecureStorage for MemoryKeychain {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

/// A config tuned for tests: real policy shape, negligible retry delays.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        base_url: "http://testhost/api/v1".to_string(),
        retry_base_delay: std::time::Duration::from_millis(1),
        ..ClientConfig::default()
    }
}

pub fn wire_event(id: &str, spots: &str, capacity: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Event {}", id),
        "description": "An event used by the tests",
        "date": "2099-09-01T00:00:00.000Z",
        "time": "2000-01-01T18:30:00.000Z",
        "location": "Berlin",
        "price": "25",
        "image": "https://img.example/event.png",
        "capacity": capacity,
        "availableSpots": spots,
        "speakersName": "Ada Lovelace",
        "speakerTitle": "Engineer",
        "speakerBio": "Wrote the first program",
        "speakerAvatar": "",
        "createdAt": "2026-01-01T00:00:00.000Z",
    })
}

pub fn wire_user(id: &str, name: &str, email: &str, password: &str, registered: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": email,
        "password": password,
        "registeredEventIds": registered,
        "createdAt": "2026-01-01T00:00:00.000Z",
    })
}

pub fn wire_registration(id: &str, user_id: &str, event_id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "userId": user_id,
        "eventId": event_id,
        "userName": "Test User",
        "userEmail": "user@test.com",
        "registeredAt": "2026-02-01T10:00:00.000Z",
        "status": status,
    })
}
