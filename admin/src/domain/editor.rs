use std::time::Duration;

use luminair_common::content_types::ContentType;
use luminair_common::draft::{Draft, DraftError, FieldValue, Row, ValidationError};
use luminair_common::identity::{RemoteId, record_key};
use luminair_common::payload::Payload;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::autosave::{AutoSave, AutoSaveStatus, SaveError};
use crate::domain::error::ApiError;
use crate::domain::{ContentApi, unwrap_record};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("failed to load the record: {0}")]
    Load(#[from] ApiError),
}

/// One open editor: a draft and the auto-save task persisting it.
///
/// Every mutation re-validates the draft. A valid draft schedules a save of
/// its payload, an invalid one cancels whatever save was pending.
#[derive(Debug)]
pub struct EditorSession {
    draft: Draft,
    autosave: AutoSave,
    /// set while a fetched record is copied into the draft
    hydrating: bool,
}

impl EditorSession {
    /// Editor for a record that does not exist yet, the first save creates it.
    pub fn create<A: ContentApi>(api: A, content_type: &'static ContentType, delay: Duration) -> Self {
        Self {
            draft: Draft::new(content_type),
            autosave: AutoSave::spawn(api, content_type, None, delay),
            hydrating: false,
        }
    }

    /// Editor for an existing record, fetched and hydrated without triggering a save.
    pub async fn open<A: ContentApi>(
        api: A,
        content_type: &'static ContentType,
        id: &RemoteId,
        delay: Duration,
    ) -> Result<Self, EditorError> {
        let response = api.get_by_id(&content_type.id, id).await?;
        let record = unwrap_record(response, content_type.singular_name());
        let remote_id = record_key(&record).unwrap_or_else(|| id.clone());
        tracing::debug!("editing {} record {}", content_type.id, remote_id);

        let mut session = Self {
            draft: Draft::new(content_type),
            autosave: AutoSave::spawn(api, content_type, Some(remote_id), delay),
            hydrating: false,
        };
        session.hydrate(&record);
        Ok(session)
    }

    /// Replaces the draft with a record, no save is scheduled for it and a save
    /// still waiting for its deadline is dropped.
    pub fn hydrate(&mut self, record: &Value) {
        self.autosave.invalidate();
        self.hydrating = true;
        self.draft.hydrate(record);
        self.changed();
        self.hydrating = false;
    }

    /// Copies a record into the draft as an edit, unlike [`Self::hydrate`] it schedules a save.
    pub fn import(&mut self, record: &Value) {
        self.draft.hydrate(record);
        self.changed();
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), EditorError> {
        self.draft.set_field(name, value)?;
        self.changed();
        Ok(())
    }

    pub fn set_list_item(
        &mut self,
        list: &str,
        index: usize,
        cell: &str,
        value: impl Into<Value>,
    ) -> Result<(), EditorError> {
        self.draft.set_list_item(list, index, cell, value)?;
        self.changed();
        Ok(())
    }

    pub fn add_list_row(&mut self, list: &str) -> Result<usize, EditorError> {
        let index = self.draft.add_list_row(list)?;
        self.changed();
        Ok(index)
    }

    pub fn remove_list_row(&mut self, list: &str, index: usize) -> Result<Row, EditorError> {
        let row = self.draft.remove_list_row(list, index)?;
        self.changed();
        Ok(row)
    }

    pub fn generate_slug(&mut self, name: &str) -> Result<bool, EditorError> {
        let generated = self.draft.generate_slug(name)?;
        if generated {
            self.changed();
        }
        Ok(generated)
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn payload(&self) -> Payload {
        self.draft.build_payload()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.draft.validate()
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.autosave.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutoSaveStatus> {
        self.autosave.subscribe()
    }

    pub fn remote_id(&self) -> Option<RemoteId> {
        self.autosave.remote_id()
    }

    /// Explicit save: validates, then saves immediately through the same
    /// scheduler so that a record is never created twice.
    pub async fn submit(&self) -> Result<RemoteId, EditorError> {
        self.draft.validate()?;
        let id = self.autosave.flush(self.payload()).await?;
        Ok(id)
    }

    pub async fn close(self) {
        self.autosave.close().await;
    }

    fn changed(&mut self) {
        if self.hydrating {
            return;
        }
        match self.draft.validate() {
            Ok(()) => self.autosave.schedule(self.draft.build_payload()),
            Err(error) => {
                tracing::debug!("auto-save skipped: {}", error);
                self.autosave.invalidate();
            }
        }
    }
}
