use std::future::pending;
use std::time::Duration;

use luminair_common::content_types::ContentType;
use luminair_common::identity::{RemoteId, extract_id};
use luminair_common::payload::Payload;
use luminair_common::ContentTypeId;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::domain::ContentApi;
use crate::domain::error::ApiError;

/// Lifecycle of the latest edit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    /// a save is scheduled, the deadline restarts with every edit
    Pending,
    Saving,
    Saved,
    Error(String),
}

/// What the scheduler publishes after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutoSaveStatus {
    pub state: SaveState,
    pub remote_id: Option<RemoteId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("the server did not return an id for the created record")]
    MissingIdentity,
    #[error("auto-save is stopped")]
    Stopped,
}

type Responder = oneshot::Sender<Result<RemoteId, SaveError>>;

enum Command {
    Changed(Payload),
    Invalidated,
    Flush(Payload, Responder),
    Close,
}

/// Handle of the debounced auto-save task of one editor.
///
/// At most one request is in flight. The first successful create fixes the
/// remote identity and every later save is an update of that record.
/// Dropping the handle stops the task and abandons any request in flight.
#[derive(Debug)]
pub struct AutoSave {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<AutoSaveStatus>,
    task: Option<JoinHandle<()>>,
}

impl AutoSave {
    pub fn spawn<A: ContentApi>(
        api: A,
        content_type: &'static ContentType,
        remote_id: Option<RemoteId>,
        delay: Duration,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (publisher, status) = watch::channel(AutoSaveStatus {
            state: SaveState::Idle,
            remote_id: remote_id.clone(),
        });

        let scheduler = Scheduler {
            api,
            content_type,
            delay,
            commands: receiver,
            publisher,
            remote_id,
            slot: None,
            deadline: None,
            in_flight: None,
            queued_flush: None,
            waiters: Vec::new(),
            detached: false,
        };
        let task = tokio::spawn(scheduler.run());

        Self {
            commands,
            status,
            task: Some(task),
        }
    }

    /// Replaces the pending payload and restarts the debounce deadline.
    pub fn schedule(&self, payload: Payload) {
        self.send(Command::Changed(payload));
    }

    /// The draft no longer validates: forget the pending payload.
    pub fn invalidate(&self) {
        self.send(Command::Invalidated);
    }

    /// Saves `payload` now, after any request in flight, and returns the identity of the record.
    pub async fn flush(&self, payload: Payload) -> Result<RemoteId, SaveError> {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::Flush(payload, responder))
            .map_err(|_| SaveError::Stopped)?;
        response.await.unwrap_or(Err(SaveError::Stopped))
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.status.borrow().clone()
    }

    pub fn remote_id(&self) -> Option<RemoteId> {
        self.status.borrow().remote_id.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutoSaveStatus> {
        self.status.clone()
    }

    /// Stops the task and waits for it to exit.
    pub async fn close(mut self) {
        self.send(Command::Close);
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("auto-save task ended abnormally: {}", error);
            }
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("auto-save task is gone, command ignored");
        }
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Close);
        }
    }
}

/// Saves one payload: an update when the record exists, a create otherwise.
pub async fn persist<A: ContentApi>(
    api: &A,
    content_type: &ContentType,
    remote_id: Option<&RemoteId>,
    payload: &Payload,
) -> Result<RemoteId, SaveError> {
    let collection: &ContentTypeId = &content_type.id;
    let body = payload.to_value();

    match remote_id {
        Some(id) => {
            tracing::debug!("updating {}/{}", collection, id);
            api.update(collection, id, &body).await?;
            Ok(id.clone())
        }
        None => {
            tracing::debug!("creating a record in {}", collection);
            let created = api.create(collection, &body).await?;
            extract_id(&created, content_type.singular_name()).ok_or_else(|| {
                tracing::warn!("create response of {} carries no id: {}", collection, created);
                SaveError::MissingIdentity
            })
        }
    }
}

struct InFlight {
    handle: JoinHandle<Result<RemoteId, SaveError>>,
    responders: Vec<Responder>,
}

enum Wake {
    Command(Option<Command>),
    Deadline,
    Settled(Result<RemoteId, SaveError>),
}

struct Scheduler<A: ContentApi> {
    api: A,
    content_type: &'static ContentType,
    delay: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<AutoSaveStatus>,
    remote_id: Option<RemoteId>,
    /// latest payload not yet handed to a request
    slot: Option<Payload>,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    /// explicit save waiting behind the request in flight
    queued_flush: Option<Payload>,
    waiters: Vec<Responder>,
    /// set when a create came back without an id, no further creates are attempted
    detached: bool,
}

impl<A: ContentApi> Scheduler<A> {
    async fn run(mut self) {
        loop {
            let idle = self.in_flight.is_none();
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                _ = expire(self.deadline), if idle && self.deadline.is_some() => Wake::Deadline,
                result = settle(&mut self.in_flight), if !idle => Wake::Settled(result),
            };

            match wake {
                Wake::Command(Some(Command::Changed(payload))) => self.changed(payload),
                Wake::Command(Some(Command::Invalidated)) => self.invalidated(),
                Wake::Command(Some(Command::Flush(payload, responder))) => {
                    self.flush(payload, responder)
                }
                Wake::Command(Some(Command::Close)) | Wake::Command(None) => break,
                Wake::Deadline => self.deadline_elapsed(),
                Wake::Settled(result) => self.settled(result),
            }
        }

        if let Some(request) = self.in_flight.take() {
            tracing::debug!("abandoning the save in flight of {}", self.content_type.id);
            request.handle.abort();
        }
    }

    fn changed(&mut self, payload: Payload) {
        if self.detached {
            tracing::debug!("auto-save of {} is detached, change ignored", self.content_type.id);
            return;
        }
        self.slot = Some(payload);
        self.deadline = Some(Instant::now() + self.delay);
        if self.in_flight.is_none() {
            self.publish(SaveState::Pending);
        }
    }

    fn invalidated(&mut self) {
        self.slot = None;
        self.deadline = None;
        if self.in_flight.is_none() && !self.detached {
            self.publish(SaveState::Idle);
        }
    }

    fn flush(&mut self, payload: Payload, responder: Responder) {
        self.slot = None;
        self.deadline = None;
        if self.in_flight.is_some() {
            self.queued_flush = Some(payload);
            self.waiters.push(responder);
        } else {
            self.start(payload, vec![responder]);
        }
    }

    fn deadline_elapsed(&mut self) {
        self.deadline = None;
        if let Some(payload) = self.slot.take() {
            self.start(payload, Vec::new());
        }
    }

    fn start(&mut self, payload: Payload, responders: Vec<Responder>) {
        if self.detached && self.remote_id.is_none() {
            for responder in responders {
                let _ = responder.send(Err(SaveError::MissingIdentity));
            }
            return;
        }

        self.publish(SaveState::Saving);
        let api = self.api.clone();
        let content_type = self.content_type;
        let remote_id = self.remote_id.clone();
        let handle = tokio::spawn(async move {
            persist(&api, content_type, remote_id.as_ref(), &payload).await
        });
        self.in_flight = Some(InFlight { handle, responders });
    }

    fn settled(&mut self, result: Result<RemoteId, SaveError>) {
        let responders = self
            .in_flight
            .take()
            .map(|request| request.responders)
            .unwrap_or_default();

        match &result {
            Ok(id) => {
                if self.remote_id.is_none() {
                    tracing::info!("created {} record {}", self.content_type.id, id);
                }
                self.remote_id = Some(id.clone());
                self.publish(SaveState::Saved);
            }
            Err(error) => {
                if *error == SaveError::MissingIdentity {
                    self.detached = true;
                    self.slot = None;
                    self.deadline = None;
                }
                tracing::error!("failed to save {}: {}", self.content_type.id, error);
                self.publish(SaveState::Error(error.to_string()));
            }
        }
        for responder in responders {
            let _ = responder.send(result.clone());
        }

        if let Some(payload) = self.queued_flush.take() {
            let waiters = std::mem::take(&mut self.waiters);
            self.start(payload, waiters);
        } else if self.slot.is_some() {
            // edits made while saving start a fresh debounce window
            self.deadline = Some(Instant::now() + self.delay);
            self.publish(SaveState::Pending);
        }
    }

    fn publish(&self, state: SaveState) {
        tracing::debug!("auto-save of {} is now {:?}", self.content_type.id, state);
        self.publisher.send_replace(AutoSaveStatus {
            state,
            remote_id: self.remote_id.clone(),
        });
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn settle(in_flight: &mut Option<InFlight>) -> Result<RemoteId, SaveError> {
    match in_flight {
        Some(request) => (&mut request.handle).await.unwrap_or_else(|error| {
            tracing::warn!("save task failed: {}", error);
            Err(SaveError::Stopped)
        }),
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{Call, RecordingApi, payload_with_title};
    use luminair_common::test_utils::case_studies;

    const DELAY: Duration = Duration::from_millis(1200);

    fn spawn(api: &RecordingApi) -> AutoSave {
        AutoSave::spawn(api.clone(), case_studies(), None, DELAY)
    }

    async fn wait_until(autosave: &AutoSave, state: SaveState) -> AutoSaveStatus {
        let mut status = autosave.subscribe();
        let reached = status.wait_for(|status| status.state == state).await.unwrap().clone();
        reached
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_produces_one_save_with_the_last_payload() {
        let api = RecordingApi::default();
        let autosave = spawn(&api);

        for title in ["A", "Ab", "Abc"] {
            autosave.schedule(payload_with_title(title));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(autosave.status().state, SaveState::Pending);
        assert!(api.calls().is_empty());

        let status = wait_until(&autosave, SaveState::Saved).await;
        assert_eq!(status.remote_id, Some(RemoteId::from("abc123")));

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        let Call::Create(collection, body) = &calls[0] else {
            panic!("expected a create, got {:?}", calls[0]);
        };
        assert_eq!(collection, "case-studies");
        assert_eq!(body["heroTitle"], json!("Abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_restarts_with_every_edit() {
        let api = RecordingApi::default();
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("A"));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        autosave.schedule(payload_with_title("B"));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(api.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn saves_after_a_create_are_updates() {
        let api = RecordingApi::default();
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("first"));
        wait_until(&autosave, SaveState::Saved).await;
        autosave.schedule(payload_with_title("second"));
        tokio::time::sleep(DELAY * 2).await;
        autosave.schedule(payload_with_title("third"));
        tokio::time::sleep(DELAY * 2).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], Call::Create(..)));
        for call in &calls[1..] {
            let Call::Update(_, id, _) = call else {
                panic!("expected an update, got {:?}", call);
            };
            assert_eq!(id, &RemoteId::from("abc123"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn edits_during_a_save_wait_for_it_to_settle() {
        let api = RecordingApi::default().with_latency(Duration::from_millis(500));
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("first"));
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
        assert_eq!(autosave.status().state, SaveState::Saving);

        // the create is still in flight, this must not produce a second create
        autosave.schedule(payload_with_title("second"));
        tokio::time::sleep(DELAY * 3).await;

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::Create(..)));
        let Call::Update(_, id, body) = &calls[1] else {
            panic!("expected an update, got {:?}", calls[1]);
        };
        assert_eq!(id, &RemoteId::from("abc123"));
        assert_eq!(body["heroTitle"], json!("second"));
        assert_eq!(autosave.status().state, SaveState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_cancels_the_pending_save() {
        let api = RecordingApi::default();
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("A"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        autosave.invalidate();
        tokio::time::sleep(DELAY * 2).await;

        assert!(api.calls().is_empty());
        assert_eq!(autosave.status().state, SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_reports_the_server_message() {
        let api = RecordingApi::default().failing_with(500, "locked");
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("A"));
        let status = wait_until(&autosave, SaveState::Error("locked".into())).await;
        assert_eq!(status.remote_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn create_without_identity_detaches() {
        let api = RecordingApi::default().creating(json!({"ok": true}));
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("A"));
        wait_until(&autosave, SaveState::Error(SaveError::MissingIdentity.to_string())).await;

        autosave.schedule(payload_with_title("B"));
        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(api.calls().len(), 1);
        assert_eq!(
            autosave.flush(payload_with_title("C")).await,
            Err(SaveError::MissingIdentity)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_immediately_and_shares_the_identity() {
        let api = RecordingApi::default();
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("draft"));
        let id = autosave.flush(payload_with_title("final")).await.unwrap();
        assert_eq!(id, RemoteId::from("abc123"));

        tokio::time::sleep(DELAY * 2).await;
        let calls = api.calls();
        assert_eq!(calls.len(), 1, "the scheduled save is replaced by the flush");

        autosave.flush(payload_with_title("again")).await.unwrap();
        assert!(matches!(api.calls()[1], Call::Update(..)));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_behind_the_request_in_flight() {
        let api = RecordingApi::default().with_latency(Duration::from_millis(500));
        let autosave = spawn(&api);

        autosave.schedule(payload_with_title("auto"));
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
        let id = autosave.flush(payload_with_title("submit")).await.unwrap();

        assert_eq!(id, RemoteId::from("abc123"));
        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::Create(..)));
        assert!(matches!(calls[1], Call::Update(..)));
    }

    #[tokio::test(start_paused = true)]
    async fn existing_record_is_only_updated() {
        let api = RecordingApi::default();
        let autosave = AutoSave::spawn(api.clone(), case_studies(), Some(RemoteId::from(7)), DELAY);

        autosave.schedule(payload_with_title("A"));
        wait_until(&autosave, SaveState::Saved).await;

        assert_eq!(api.calls().len(), 1);
        assert!(matches!(&api.calls()[0], Call::Update(_, RemoteId::Number(7), _)));
    }

    #[tokio::test(start_paused = true)]
    async fn closing_abandons_the_request_in_flight() {
        let api = RecordingApi::default().with_latency(Duration::from_millis(500));
        let autosave = spawn(&api);
        let status = autosave.subscribe();

        autosave.schedule(payload_with_title("A"));
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
        autosave.close().await;
        tokio::time::sleep(DELAY).await;

        assert_eq!(status.borrow().state, SaveState::Saving);
        assert_eq!(status.borrow().remote_id, None);
    }
}
