use luminair_common::identity::RemoteId;
use luminair_common::{ContentTypeId, DATA_FIELD_NAME};
use serde_json::Value;

pub mod autosave;
pub mod editor;
pub mod error;
pub mod listing;
pub mod navigation;
pub mod table;
pub mod widgets;

use error::ApiError;

/// REST surface of the content backend.
///
/// Every operation addresses one collection (`/api/{collection}[/{id}]`) and
/// exchanges plain JSON, the shape of records is up to the caller.
pub trait ContentApi: Clone + Send + Sync + 'static {
    /// POST a new record
    fn create(
        &self,
        collection: &ContentTypeId,
        body: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// PUT a full replacement of an existing record
    fn update(
        &self,
        collection: &ContentTypeId,
        id: &RemoteId,
        body: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn get_by_id(
        &self,
        collection: &ContentTypeId,
        id: &RemoteId,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn list(&self, collection: &ContentTypeId)
        -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn remove(
        &self,
        collection: &ContentTypeId,
        id: &RemoteId,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// One collection bound to an API, the `getBlogs`/`createBlog` family of calls.
#[derive(Clone, Debug)]
pub struct Collection<A: ContentApi> {
    api: A,
    id: ContentTypeId,
}

impl<A: ContentApi> Collection<A> {
    pub fn new(api: A, id: ContentTypeId) -> Self {
        Self { api, id }
    }

    pub fn id(&self) -> &ContentTypeId {
        &self.id
    }

    pub async fn create(&self, body: &Value) -> Result<Value, ApiError> {
        self.api.create(&self.id, body).await
    }

    pub async fn update(&self, id: &RemoteId, body: &Value) -> Result<Value, ApiError> {
        self.api.update(&self.id, id, body).await
    }

    pub async fn get_by_id(&self, id: &RemoteId) -> Result<Value, ApiError> {
        self.api.get_by_id(&self.id, id).await
    }

    pub async fn list(&self) -> Result<Value, ApiError> {
        self.api.list(&self.id).await
    }

    pub async fn remove(&self, id: &RemoteId) -> Result<Value, ApiError> {
        self.api.remove(&self.id, id).await
    }
}

/// Records of a listing response: either the array itself or `{ data: [...] }`.
pub fn unwrap_list(response: Value) -> Vec<Value> {
    match response {
        Value::Array(items) => items,
        Value::Object(mut body) => match body.remove(DATA_FIELD_NAME) {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::warn!("listing response carries no record array");
                Vec::new()
            }
        },
        _ => Vec::new(),
    }
}

/// Record of a single-item response: `{ <singular>: {...} }`, `{ data: {...} }` or the record.
pub fn unwrap_record(response: Value, singular_name: &str) -> Value {
    let is_truthy = |value: &Value| match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    };

    if let Value::Object(body) = &response {
        for key in [singular_name, DATA_FIELD_NAME] {
            if let Some(inner) = body.get(key).filter(|inner| is_truthy(inner)) {
                return inner.clone();
            }
        }
    }
    response
}
