//! Debounced field mutation pipeline.
//!
//! A [`FormEditor`] holds one instance's answers while a user edits them. Each accepted edit
//! updates the in-memory answers and validity at once, then (re)starts a per-field debounce
//! timer; when a field's timer settles, its last value is handed to a [`FieldSink`].
//!
//! Ordering: deliveries for one field run one at a time and carry a sequence number, so an
//! older value can never overwrite a newer one. Different fields are independent.
//!
//! Failures are not retried and the in-memory value is kept. They are logged and published
//! on [`FormEditor::subscribe_failures`].
//!
//! Dropping the editor does not cancel anything: timers that have not fired yet still fire
//! and deliver, and deliveries already in flight run to completion.

use crate::error::GrantsResult;
use crate::locks::KeyedLocks;
use crate::progress::{
    evaluate_field, evaluate_form, evaluate_section, FieldProgress, FormProgress, SectionProgress,
};
use async_trait::async_trait;
use forms::{FieldValue, Form, FormData};
use grants_types::RoleName;
use grants_uuid::RecordId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Where settled edits go.
#[async_trait]
pub trait FieldSink: Send + Sync + 'static {
    async fn persist(
        &self,
        instance_id: RecordId,
        field_name: &str,
        value: FieldValue,
    ) -> GrantsResult<()>;
}

/// Why an edit was dropped without touching state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownField,
    /// The key names a group, which holds no value of its own.
    NotAValue,
    NotEditable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldChange {
    Accepted {
        /// The top-level field the key belongs to.
        field: FieldProgress,
        section: SectionProgress,
    },
    Ignored(IgnoreReason),
}

/// A delivery that the sink rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceFailure {
    pub field_name: String,
    pub message: String,
}

struct PendingEdit {
    timer: JoinHandle<()>,
    seq: u64,
    value: FieldValue,
}

/// State shared by an editor and its in-flight deliveries.
struct Delivery {
    instance_id: RecordId,
    sink: Arc<dyn FieldSink>,
    field_locks: KeyedLocks<String>,
    delivered: Mutex<HashMap<String, u64>>,
    failures: broadcast::Sender<PersistenceFailure>,
}

impl Delivery {
    async fn deliver(&self, field_name: String, seq: u64, value: FieldValue) {
        let _guard = self.field_locks.acquire(&field_name).await;

        {
            let mut delivered = self.delivered.lock().await;
            let last = delivered.entry(field_name.clone()).or_insert(0);
            if *last >= seq {
                tracing::debug!(field = %field_name, seq, "skipping stale field write");
                return;
            }
            *last = seq;
        }

        if let Err(e) = self
            .sink
            .persist(self.instance_id, &field_name, value)
            .await
        {
            tracing::warn!(
                instance_id = %self.instance_id,
                field = %field_name,
                error = %e,
                "failed to persist field"
            );
            // Nobody listening is fine.
            let _ = self.failures.send(PersistenceFailure {
                field_name,
                message: e.to_string(),
            });
        }
    }
}

pub struct FormEditor {
    form: Arc<Form>,
    data: FormData,
    role: RoleName,
    debounce: Duration,
    next_seq: HashMap<String, u64>,
    pending: HashMap<String, PendingEdit>,
    delivery: Arc<Delivery>,
}

impl FormEditor {
    /// An editor over `data` (normally the materialised answers) acting as `role`.
    pub fn new(
        instance_id: RecordId,
        form: Arc<Form>,
        data: FormData,
        role: RoleName,
        debounce: Duration,
        sink: Arc<dyn FieldSink>,
    ) -> Self {
        let (failures, _) = broadcast::channel(32);
        Self {
            form,
            data,
            role,
            debounce,
            next_seq: HashMap::new(),
            pending: HashMap::new(),
            delivery: Arc::new(Delivery {
                instance_id,
                sink,
                field_locks: KeyedLocks::new(),
                delivered: Mutex::new(HashMap::new()),
                failures,
            }),
        }
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Every section's progress and the submission gate over the current answers.
    pub fn progress(&self) -> FormProgress {
        evaluate_form(&self.form, &self.data)
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<PersistenceFailure> {
        self.delivery.failures.subscribe()
    }

    /// Keys with an edit waiting for its debounce timer.
    pub fn pending_fields(&self) -> Vec<&str> {
        self.pending
            .iter()
            .filter(|(_, edit)| !edit.timer.is_finished())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Applies an edit to `key` and schedules its persistence.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_field_change(&mut self, key: &str, value: FieldValue) -> FieldChange {
        let form = Arc::clone(&self.form);
        let Some(location) = form.locate(key) else {
            return FieldChange::Ignored(IgnoreReason::UnknownField);
        };
        if !location.holds_value() {
            return FieldChange::Ignored(IgnoreReason::NotAValue);
        }
        if !location.section.is_editable_by(&self.role) {
            tracing::debug!(field = %key, role = %self.role, "edit ignored: section not editable");
            return FieldChange::Ignored(IgnoreReason::NotEditable);
        }

        self.data.insert(key.to_owned(), value.clone());
        let change = FieldChange::Accepted {
            field: evaluate_field(location.field, &self.data),
            section: evaluate_section(location.section, &self.data),
        };

        self.schedule(key.to_owned(), value);
        change
    }

    fn schedule(&mut self, key: String, value: FieldValue) {
        let seq = {
            let next = self.next_seq.entry(key.clone()).or_insert(0);
            *next += 1;
            *next
        };

        if let Some(previous) = self.pending.remove(&key) {
            previous.timer.abort();
        }

        let delivery = Arc::clone(&self.delivery);
        let debounce = self.debounce;
        let field_name = key.clone();
        let timer_value = value.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // Detached so aborting a later timer never cancels a request in flight.
            tokio::spawn(async move { delivery.deliver(field_name, seq, timer_value).await });
        });

        self.pending.insert(key, PendingEdit { timer, seq, value });
    }

    /// Delivers every pending edit now instead of waiting for its timer.
    pub async fn flush(&mut self) {
        let pending: Vec<(String, PendingEdit)> = self.pending.drain().collect();
        for (key, edit) in pending {
            edit.timer.abort();
            self.delivery.deliver(key, edit.seq, edit.value).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrantsError;
    use crate::materialize::tests::leaf;
    use forms::{Field, Section};

    #[derive(Default)]
    struct RecordingSink {
        calls: std::sync::Mutex<Vec<(String, FieldValue)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<(String, FieldValue)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FieldSink for RecordingSink {
        async fn persist(
            &self,
            _instance_id: RecordId,
            field_name: &str,
            value: FieldValue,
        ) -> GrantsResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((field_name.to_owned(), value));
            if self.fail {
                return Err(GrantsError::Persistence {
                    field: field_name.to_owned(),
                    message: "backend down".into(),
                });
            }
            Ok(())
        }
    }

    fn form() -> Arc<Form> {
        Arc::new(Form {
            title: "Application".into(),
            sections: vec![
                Section {
                    title: "Project".into(),
                    description: None,
                    notice: None,
                    fields: vec![
                        Field::Leaf(leaf("a", true, None)),
                        Field::Leaf(leaf("b", false, None)),
                    ],
                    editable_by: None,
                },
                Section {
                    title: "Assessment".into(),
                    description: None,
                    notice: None,
                    fields: vec![Field::Leaf(leaf("score", true, None))],
                    editable_by: Some(vec![]),
                },
            ],
        })
    }

    fn editor(sink: Arc<RecordingSink>) -> FormEditor {
        FormEditor::new(
            RecordId::new(),
            form(),
            FormData::new(),
            RoleName::new("USER").unwrap(),
            Duration::from_millis(500),
            sink,
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(600)).await;
        // Let the detached delivery task run.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_collapse_to_one_call_with_last_value() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(Arc::clone(&sink));

        for value in ["W", "Wa", "Water"] {
            editor.on_field_change("a", FieldValue::from(value));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(sink.calls().is_empty());

        settle().await;
        assert_eq!(sink.calls(), vec![("a".to_string(), FieldValue::from("Water"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn different_fields_debounce_independently() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(Arc::clone(&sink));

        editor.on_field_change("a", FieldValue::from("1"));
        editor.on_field_change("b", FieldValue::from("2"));
        settle().await;

        let mut calls = sink.calls();
        calls.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            calls,
            vec![
                ("a".to_string(), FieldValue::from("1")),
                ("b".to_string(), FieldValue::from("2"))
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_edit_updates_validity_synchronously() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(sink);

        match editor.on_field_change("a", FieldValue::from("Water")) {
            FieldChange::Accepted { field, section } => {
                assert!(field.is_valid);
                assert_eq!((section.completed, section.required), (1, 1));
                assert!(section.is_valid);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert_eq!(editor.data()["a"], FieldValue::from("Water"));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_reach_the_submission_gate() {
        let sink = Arc::new(RecordingSink::default());
        let mut data = FormData::new();
        data.insert("score".into(), FieldValue::from("9"));
        let mut editor = FormEditor::new(
            RecordId::new(),
            form(),
            data,
            RoleName::new("USER").unwrap(),
            Duration::from_millis(500),
            sink,
        );

        let before = editor.progress();
        assert!(!before.sections[0].is_valid);
        assert!(before.sections[1].is_valid);
        assert!(!before.can_submit);

        editor.on_field_change("a", FieldValue::from("Water"));
        assert!(editor.progress().can_submit);

        editor.on_field_change("a", FieldValue::from("  "));
        assert!(!editor.progress().can_submit);
    }

    #[tokio::test(start_paused = true)]
    async fn non_editable_section_changes_nothing_and_persists_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(Arc::clone(&sink));

        assert_eq!(
            editor.on_field_change("score", FieldValue::from("9")),
            FieldChange::Ignored(IgnoreReason::NotEditable)
        );
        assert_eq!(
            editor.on_field_change("nope", FieldValue::from("9")),
            FieldChange::Ignored(IgnoreReason::UnknownField)
        );
        settle().await;

        assert!(editor.data().is_empty());
        assert!(sink.calls().is_empty());
        assert!(editor.pending_fields().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_published_and_value_is_kept() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let mut editor = editor(Arc::clone(&sink));
        let mut failures = editor.subscribe_failures();

        editor.on_field_change("a", FieldValue::from("Water"));
        settle().await;

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.field_name, "a");
        assert_eq!(editor.data()["a"], FieldValue::from("Water"));
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_delivers_immediately_and_only_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(Arc::clone(&sink));

        editor.on_field_change("a", FieldValue::from("now"));
        editor.flush().await;
        assert_eq!(sink.calls(), vec![("a".to_string(), FieldValue::from("now"))]);

        settle().await;
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_editor_still_delivers_pending_edits() {
        let sink = Arc::new(RecordingSink::default());
        let mut editor = editor(Arc::clone(&sink));

        editor.on_field_change("a", FieldValue::from("last"));
        drop(editor);
        settle().await;

        assert_eq!(sink.calls(), vec![("a".to_string(), FieldValue::from("last"))]);
    }
}
