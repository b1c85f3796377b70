use std::sync::{Arc, Mutex};
use std::time::Duration;

use luminair_common::ContentTypeId;
use luminair_common::draft::Draft;
use luminair_common::identity::RemoteId;
use luminair_common::payload::Payload;
use luminair_common::test_utils::case_studies;
use serde_json::{Value, json};

use crate::domain::ContentApi;
use crate::domain::error::ApiError;

/// Request seen by [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(String, Value),
    Update(String, RemoteId, Value),
    Get(String, RemoteId),
    List(String),
    Remove(String, RemoteId),
}

/// In-memory content API recording every request.
#[derive(Clone)]
pub struct RecordingApi {
    calls: Arc<Mutex<Vec<Call>>>,
    created: Value,
    record: Value,
    listing: Value,
    failure: Option<ApiError>,
    latency: Duration,
}

impl Default for RecordingApi {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            created: json!({"_id": "abc123"}),
            record: json!({}),
            listing: json!([]),
            failure: None,
            latency: Duration::ZERO,
        }
    }
}

impl RecordingApi {
    pub fn creating(mut self, created: Value) -> Self {
        self.created = created;
        self
    }

    pub fn serving(mut self, record: Value) -> Self {
        self.record = record;
        self
    }

    pub fn listing(mut self, listing: Value) -> Self {
        self.listing = listing;
        self
    }

    pub fn failing_with(mut self, status: u16, message: &str) -> Self {
        self.failure = Some(ApiError::Status {
            status,
            message: message.to_owned(),
        });
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: Call, response: &Value) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(response.clone()),
        }
    }
}

impl ContentApi for RecordingApi {
    async fn create(&self, collection: &ContentTypeId, body: &Value) -> Result<Value, ApiError> {
        let call = Call::Create(collection.to_string(), body.clone());
        self.respond(call, &self.created).await
    }

    async fn update(
        &self,
        collection: &ContentTypeId,
        id: &RemoteId,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let call = Call::Update(collection.to_string(), id.clone(), body.clone());
        self.respond(call, body).await
    }

    async fn get_by_id(&self, collection: &ContentTypeId, id: &RemoteId) -> Result<Value, ApiError> {
        let call = Call::Get(collection.to_string(), id.clone());
        self.respond(call, &self.record).await
    }

    async fn list(&self, collection: &ContentTypeId) -> Result<Value, ApiError> {
        let call = Call::List(collection.to_string());
        self.respond(call, &self.listing).await
    }

    async fn remove(&self, collection: &ContentTypeId, id: &RemoteId) -> Result<Value, ApiError> {
        let call = Call::Remove(collection.to_string(), id.clone());
        self.respond(call, &Value::Null).await
    }
}

/// Valid case study payload with the given hero title.
pub fn payload_with_title(title: &str) -> Payload {
    let mut draft = Draft::new(case_studies());
    draft.set_field("heroTitle", title).unwrap();
    draft.set_field("heroSubtitle", "subtitle").unwrap();
    draft.build_payload()
}
