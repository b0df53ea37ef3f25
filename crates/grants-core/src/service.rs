//! Form instance service.
//!
//! [`FormInstanceService`] is the facade the API layers call. Every operation takes the
//! acting user explicitly and enforces its rules server-side:
//! - field edits only in sections the actor's role may edit
//! - status and amount edits only for permitted roles, and only for attributes the
//!   template's sidebar exposes
//! - submission only when every section of the materialised answers is valid
//!
//! Writes to one instance document are serialised in-process. A status change holds the
//! parent's lock across the linked-child lookup and create, and storage backs that up with
//! an exclusive link claim.

use crate::actor::Actor;
use crate::config::CoreConfig;
use crate::error::{GrantsError, GrantsResult};
use crate::instance::{default_title, FormInstance};
use crate::locks::KeyedLocks;
use crate::materialize::materialize;
use crate::organisation::Organisation;
use crate::permissions::{PermissionPolicy, RoleListPolicy};
use crate::pipeline::{FieldSink, FormEditor};
use crate::progress::{evaluate_form, FormProgress};
use crate::repositories::{
    FileInstanceStore, FileOrganisationStore, FileTemplateStore, InstanceStore, LinkOutcome,
    OrganisationStore, TemplateStore,
};
use crate::status::FormStatus;
use crate::transitions::{child_status_for, plan_status_change, ChildAction, LinkedState};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use forms::{FieldValue, FormData, FormTemplate};
use grants_uuid::RecordId;
use serde::Serialize;
use std::sync::Arc;

// ============================================================================
// Inputs and outputs
// ============================================================================

/// A request to start a new instance of a template for an organisation.
#[derive(Clone, Debug, PartialEq)]
pub struct NewInstance {
    pub form_template_id: RecordId,
    pub local_development_agency_id: RecordId,
    /// Defaults to `"{template name} - {year}"`.
    pub title: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Sidebar attributes to change. `None` leaves an attribute as it is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributePatch {
    pub form_status: Option<FormStatus>,
    pub amount: Option<f64>,
    pub funding_start: Option<NaiveDate>,
    pub funding_end: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl AttributePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    #[serde(flatten)]
    pub instance: FormInstance,
    /// Set only when this change created the parent's linked child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_linked_instance: Option<FormInstance>,
}

/// An instance as an editor sees it: answers materialised, progress computed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    #[serde(flatten)]
    pub instance: FormInstance,
    /// `None` when the template has no form.
    pub progress: Option<FormProgress>,
    /// The parent's answers, for child instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_form_data: Option<FormData>,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct FormInstanceService {
    cfg: Arc<CoreConfig>,
    templates: Arc<dyn TemplateStore>,
    organisations: Arc<dyn OrganisationStore>,
    instances: Arc<dyn InstanceStore>,
    permissions: Arc<dyn PermissionPolicy>,
    record_locks: Arc<KeyedLocks<RecordId>>,
}

impl FormInstanceService {
    /// A service over the file-backed stores in `cfg`'s data directory, gating status and
    /// amount edits by the configured status editor roles.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let permissions = RoleListPolicy::new(cfg.status_editor_roles().iter().cloned());
        Self::with_parts(
            Arc::clone(&cfg),
            Arc::new(FileTemplateStore::new(Arc::clone(&cfg))),
            Arc::new(FileOrganisationStore::new(Arc::clone(&cfg))),
            Arc::new(FileInstanceStore::new(Arc::clone(&cfg))),
            Arc::new(permissions),
        )
    }

    pub fn with_parts(
        cfg: Arc<CoreConfig>,
        templates: Arc<dyn TemplateStore>,
        organisations: Arc<dyn OrganisationStore>,
        instances: Arc<dyn InstanceStore>,
        permissions: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            cfg,
            templates,
            organisations,
            instances,
            permissions,
            record_locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------------
    // Templates and organisations
    // ------------------------------------------------------------------------

    pub fn template(&self, id: &RecordId) -> GrantsResult<FormTemplate> {
        self.templates.load(id)
    }

    pub fn templates(&self) -> GrantsResult<Vec<FormTemplate>> {
        self.templates.list()
    }

    /// Stores a template, replacing any previous version with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::Validation`] if the template links to a template that is not
    /// stored.
    pub fn import_template(&self, template: &FormTemplate) -> GrantsResult<()> {
        if let Some(linked_id) = &template.linked_form_template_id {
            match self.templates.load(linked_id) {
                Ok(_) => {}
                Err(GrantsError::NotFound { .. }) => {
                    return Err(GrantsError::Validation(format!(
                        "linked form template {linked_id} does not exist"
                    )))
                }
                Err(e) => return Err(e),
            }
        }
        self.templates.save(template)?;
        tracing::info!(template_id = %template.id, name = %template.name, "form template stored");
        Ok(())
    }

    pub fn organisation(&self, id: &RecordId) -> GrantsResult<Organisation> {
        self.organisations.load(id)
    }

    pub fn import_organisation(&self, organisation: &Organisation) -> GrantsResult<()> {
        self.organisations.save(organisation)?;
        tracing::info!(organisation_id = %organisation.id, "organisation stored");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Loads an instance with its answers materialised and its progress computed.
    ///
    /// A missing template, organisation or parent instance never fails the read; the
    /// affected prefill is skipped and a warning logged.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::NotFound`] if the instance does not exist, or a storage error if
    /// it cannot be read.
    pub fn read(&self, actor: &Actor, id: &RecordId) -> GrantsResult<InstanceView> {
        tracing::debug!(instance_id = %id, user = %actor.user_id, "reading form instance");
        let mut instance = self.instances.load(id)?;

        let template = self
            .templates
            .load(&instance.form_template_id)
            .map_err(|e| {
                tracing::warn!(
                    instance_id = %id,
                    template_id = %instance.form_template_id,
                    error = %e,
                    "template unavailable; serving stored answers"
                )
            })
            .ok();
        let organisation = self
            .organisations
            .load(&instance.local_development_agency_id)
            .map_err(|e| {
                tracing::warn!(
                    instance_id = %id,
                    organisation_id = %instance.local_development_agency_id,
                    error = %e,
                    "organisation unavailable; skipping organisation prefill"
                )
            })
            .ok();
        let linked_form_data = self.linked_form_data(&instance);

        let form = template.as_ref().and_then(|t| t.form.as_ref());
        instance.form_data = materialize(
            form,
            &instance.form_data,
            organisation.as_ref(),
            linked_form_data.as_ref(),
        );
        let progress = form.map(|form| evaluate_form(form, &instance.form_data));

        Ok(InstanceView {
            instance,
            progress,
            linked_form_data,
        })
    }

    fn linked_form_data(&self, instance: &FormInstance) -> Option<FormData> {
        let parent_id = instance.linked_form_id?;
        match self.instances.load(&parent_id) {
            Ok(parent) => Some(parent.form_data),
            Err(e) => {
                tracing::warn!(
                    instance_id = %instance.id,
                    parent_id = %parent_id,
                    error = %e,
                    "linked form unavailable; skipping linked prefill"
                );
                None
            }
        }
    }

    pub fn list_for_organisation(
        &self,
        actor: &Actor,
        organisation_id: &RecordId,
    ) -> GrantsResult<Vec<FormInstance>> {
        tracing::debug!(organisation_id = %organisation_id, user = %actor.user_id, "listing form instances");
        self.instances.list_for_organisation(organisation_id)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Starts a `Draft` instance of a template for an organisation.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::NotFound`] for an unknown template or organisation and
    /// [`GrantsError::Validation`] for an inactive template or a blank title.
    pub fn create_instance(&self, actor: &Actor, request: NewInstance) -> GrantsResult<FormInstance> {
        let template = self.templates.load(&request.form_template_id)?;
        if !template.active {
            return Err(GrantsError::Validation(format!(
                "form template '{}' is not active",
                template.name
            )));
        }
        // Existence check only.
        self.organisations.load(&request.local_development_agency_id)?;

        let now = Utc::now();
        let title = match request.title {
            Some(title) if title.trim().is_empty() => {
                return Err(GrantsError::Validation("title must not be blank".into()))
            }
            Some(title) => title.trim().to_owned(),
            None => default_title(&template.name, now),
        };

        let mut instance = FormInstance::draft(
            title,
            template.id,
            request.local_development_agency_id,
            actor.user_id.as_str().to_owned(),
            now,
        );
        instance.due_date = request.due_date;

        self.instances.create(&instance)?;
        tracing::info!(
            instance_id = %instance.id,
            template_id = %template.id,
            organisation_id = %instance.local_development_agency_id,
            "form instance created"
        );
        Ok(instance)
    }

    /// Merges one answer into the stored instance.
    ///
    /// # Errors
    ///
    /// - [`GrantsError::Validation`] if `key` is not a value-holding key of the form.
    /// - [`GrantsError::PermissionDenied`] if the key's section is not editable by the
    ///   actor's role.
    pub async fn patch_field(
        &self,
        actor: &Actor,
        instance_id: &RecordId,
        key: &str,
        value: FieldValue,
    ) -> GrantsResult<FormInstance> {
        let _guard = self.record_locks.acquire(instance_id).await;

        let mut instance = self.instances.load(instance_id)?;
        let template = self.templates.load(&instance.form_template_id)?;
        Self::apply_answer(actor, &template, &mut instance, key, value)?;
        instance.updated_at = Utc::now();
        self.instances.save(&instance)?;
        tracing::debug!(instance_id = %instance_id, field = %key, "field answer stored");
        Ok(instance)
    }

    /// Changes sidebar attributes and, when given, the status.
    ///
    /// A status change runs the linked-child transition. The parent is written first; if the
    /// child write then fails the error is [`GrantsError::Consistency`].
    ///
    /// # Errors
    ///
    /// - [`GrantsError::Validation`] for an empty patch, an attribute the template's sidebar
    ///   does not expose, a negative amount, or a funding start after its end.
    /// - [`GrantsError::PermissionDenied`] for a status or amount change the actor may not
    ///   make.
    pub async fn patch_instance(
        &self,
        actor: &Actor,
        instance_id: &RecordId,
        patch: AttributePatch,
    ) -> GrantsResult<PatchOutcome> {
        self.apply_patch(actor, instance_id, None, patch).await
    }

    /// Stores one answer and changes attributes in a single write of the instance.
    ///
    /// Every check of both [`Self::patch_field`] and [`Self::patch_instance`] runs before
    /// anything is written, so a rejected attribute change leaves the answer unstored too.
    pub async fn patch_answer_and_attributes(
        &self,
        actor: &Actor,
        instance_id: &RecordId,
        key: &str,
        value: FieldValue,
        patch: AttributePatch,
    ) -> GrantsResult<PatchOutcome> {
        self.apply_patch(actor, instance_id, Some((key, value)), patch)
            .await
    }

    async fn apply_patch(
        &self,
        actor: &Actor,
        instance_id: &RecordId,
        answer: Option<(&str, FieldValue)>,
        patch: AttributePatch,
    ) -> GrantsResult<PatchOutcome> {
        if patch.is_empty() {
            return Err(GrantsError::Validation("no attributes to update".into()));
        }

        let _parent_guard = self.record_locks.acquire(instance_id).await;
        let mut parent = self.instances.load(instance_id)?;
        let template = self.templates.load(&parent.form_template_id)?;
        self.check_attribute_patch(actor, &template, &patch)?;
        if let Some((key, value)) = answer {
            Self::apply_answer(actor, &template, &mut parent, key, value)?;
        }

        if let Some(amount) = patch.amount {
            parent.amount = Some(amount);
        }
        if let Some(start) = patch.funding_start {
            parent.funding_start = Some(start);
        }
        if let Some(end) = patch.funding_end {
            parent.funding_end = Some(end);
        }
        if let Some(due) = patch.due_date {
            parent.due_date = Some(due);
        }
        if let (Some(start), Some(end)) = (parent.funding_start, parent.funding_end) {
            if start > end {
                return Err(GrantsError::Validation(format!(
                    "funding start {start} is after funding end {end}"
                )));
            }
        }
        let now = Utc::now();
        parent.updated_at = now;

        let Some(new_status) = patch.form_status else {
            self.instances.save(&parent)?;
            return Ok(PatchOutcome {
                instance: parent,
                created_linked_instance: None,
            });
        };

        let linked_template = template
            .linked_form_template_id
            .map(|id| self.templates.load(&id))
            .transpose()?;

        // Held until the child is written.
        let mut _child_guard = None;
        let mut existing_child = None;
        if linked_template.is_some() {
            if let Some(child) = self.instances.find_linked_child(instance_id)? {
                _child_guard = Some(self.record_locks.acquire(&child.id).await);
                existing_child = Some(self.instances.load(&child.id)?);
            }
        }

        let plan = plan_status_change(
            &parent,
            new_status,
            linked_template.as_ref().map(|template| LinkedState {
                template,
                child: existing_child.as_ref(),
            }),
            actor.user_id.as_str(),
            now,
            self.cfg.approval_history(),
        );

        self.instances.save(&plan.parent)?;
        tracing::info!(
            instance_id = %instance_id,
            from = %parent.form_status,
            to = %new_status,
            user = %actor.user_id,
            "form status changed"
        );

        let created_linked_instance = self
            .apply_child_action(&plan.parent, plan.child, now)
            .await
            .map_err(|(child_id, source)| GrantsError::Consistency {
                parent_id: *instance_id,
                child_id,
                source: Box::new(source),
            })?;

        Ok(PatchOutcome {
            instance: plan.parent,
            created_linked_instance,
        })
    }

    /// Checks that `key` is an answer `actor` may give and stores it on `instance`.
    fn apply_answer(
        actor: &Actor,
        template: &FormTemplate,
        instance: &mut FormInstance,
        key: &str,
        value: FieldValue,
    ) -> GrantsResult<()> {
        let form = template.form.as_ref().ok_or_else(|| {
            GrantsError::Validation(format!("form template '{}' has no form", template.name))
        })?;
        let location = form
            .locate(key)
            .ok_or_else(|| GrantsError::Validation(format!("unknown field '{key}'")))?;
        if !location.holds_value() {
            return Err(GrantsError::Validation(format!(
                "field '{key}' is a group; set its subfields instead"
            )));
        }
        if !location.section.is_editable_by(&actor.role) {
            return Err(GrantsError::PermissionDenied(format!(
                "role {} may not edit section '{}'",
                actor.role, location.section.title
            )));
        }

        instance.set_answer(key, value);
        Ok(())
    }

    fn check_attribute_patch(
        &self,
        actor: &Actor,
        template: &FormTemplate,
        patch: &AttributePatch,
    ) -> GrantsResult<()> {
        let sidebar = &template.sidebar_config;
        let exposed = [
            ("status", patch.form_status.is_some(), sidebar.status),
            ("amount", patch.amount.is_some(), sidebar.amount),
            ("fundingStart", patch.funding_start.is_some(), sidebar.start_date),
            ("fundingEnd", patch.funding_end.is_some(), sidebar.end_date),
            ("dueDate", patch.due_date.is_some(), sidebar.due_date),
        ];
        if let Some((name, _, _)) = exposed
            .iter()
            .find(|(_, requested, allowed)| *requested && !*allowed)
        {
            return Err(GrantsError::Validation(format!(
                "form template '{}' does not expose '{name}'",
                template.name
            )));
        }

        if patch.form_status.is_some() && !self.permissions.can_edit_status(actor) {
            return Err(GrantsError::PermissionDenied(format!(
                "role {} may not change form status",
                actor.role
            )));
        }
        if let Some(amount) = patch.amount {
            if !self.permissions.can_edit_amount(actor) {
                return Err(GrantsError::PermissionDenied(format!(
                    "role {} may not change the amount",
                    actor.role
                )));
            }
            if !amount.is_finite() || amount < 0.0 {
                return Err(GrantsError::Validation(format!(
                    "amount must be a non-negative number, got {amount}"
                )));
            }
        }
        Ok(())
    }

    /// Writes the child side of a transition. Errors carry the child id when one is known.
    async fn apply_child_action(
        &self,
        parent: &FormInstance,
        action: ChildAction,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<FormInstance>, (Option<RecordId>, GrantsError)> {
        match action {
            ChildAction::None | ChildAction::Unchanged(_) => Ok(None),
            ChildAction::Update(child) => {
                self.instances
                    .save(&child)
                    .map_err(|e| (Some(child.id), e))?;
                tracing::info!(
                    parent_id = %parent.id,
                    child_id = %child.id,
                    status = %child.form_status,
                    "linked form status updated"
                );
                Ok(None)
            }
            ChildAction::Create(child) => {
                match self.instances.create_linked_child(&child) {
                    Ok(LinkOutcome::Created) => {
                        tracing::info!(
                            parent_id = %parent.id,
                            child_id = %child.id,
                            template_id = %child.form_template_id,
                            "linked form created"
                        );
                        Ok(Some(child))
                    }
                    Ok(LinkOutcome::AlreadyLinked(existing_id)) => {
                        // Lost the claim to another writer: treat as an update.
                        let _guard = self.record_locks.acquire(&existing_id).await;
                        let mut existing = self
                            .instances
                            .load(&existing_id)
                            .map_err(|e| (Some(existing_id), e))?;
                        let target = child_status_for(parent.form_status);
                        if existing.form_status != target {
                            existing.form_status = target;
                            existing.updated_at = now;
                            self.instances
                                .save(&existing)
                                .map_err(|e| (Some(existing_id), e))?;
                        }
                        Ok(None)
                    }
                    Err(e) => Err((None, e)),
                }
            }
        }
    }

    /// Submits an instance.
    ///
    /// The gate runs on the materialised answers, which are stored with the submission.
    /// Submitting an already submitted instance changes nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::Validation`] naming the incomplete sections when the gate
    /// fails. Nothing is written in that case.
    pub async fn submit(&self, actor: &Actor, instance_id: &RecordId) -> GrantsResult<FormInstance> {
        let _guard = self.record_locks.acquire(instance_id).await;
        let mut instance = self.instances.load(instance_id)?;
        if instance.is_submitted() {
            tracing::debug!(instance_id = %instance_id, "already submitted");
            return Ok(instance);
        }

        let template = self.templates.load(&instance.form_template_id)?;
        let form = template.form.as_ref().ok_or_else(|| {
            GrantsError::Validation(format!("form template '{}' has no form", template.name))
        })?;
        let organisation = self
            .organisations
            .load(&instance.local_development_agency_id)
            .map_err(|e| {
                tracing::warn!(
                    instance_id = %instance_id,
                    error = %e,
                    "organisation unavailable; submitting without organisation prefill"
                )
            })
            .ok();
        let linked_form_data = self.linked_form_data(&instance);

        let answers = materialize(
            Some(form),
            &instance.form_data,
            organisation.as_ref(),
            linked_form_data.as_ref(),
        );
        let progress = evaluate_form(form, &answers);
        if !progress.can_submit {
            let incomplete: Vec<&str> = progress
                .sections
                .iter()
                .filter(|s| !s.is_valid)
                .map(|s| s.title.as_str())
                .collect();
            return Err(GrantsError::Validation(format!(
                "form is incomplete; sections needing attention: {}",
                incomplete.join(", ")
            )));
        }

        let now = Utc::now();
        instance.form_data = answers;
        instance.submitted = Some(now);
        instance.updated_at = now;
        self.instances.save(&instance)?;
        tracing::info!(instance_id = %instance_id, user = %actor.user_id, "form instance submitted");
        Ok(instance)
    }

    /// Opens an editor over the instance's materialised answers, persisting through this
    /// service as `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::Validation`] if the instance's template cannot be loaded or has
    /// no form.
    pub fn open_editor(&self, actor: &Actor, instance_id: &RecordId) -> GrantsResult<FormEditor> {
        let view = self.read(actor, instance_id)?;
        let template = self.templates.load(&view.instance.form_template_id)?;
        let form = template.form.ok_or_else(|| {
            GrantsError::Validation(format!("form template '{}' has no form", template.name))
        })?;

        Ok(FormEditor::new(
            *instance_id,
            Arc::new(form),
            view.instance.form_data,
            actor.role.clone(),
            self.cfg.debounce(),
            Arc::new(LocalFieldSink {
                service: self.clone(),
                actor: actor.clone(),
            }),
        ))
    }
}

/// Persists editor deliveries through a [`FormInstanceService`].
pub struct LocalFieldSink {
    service: FormInstanceService,
    actor: Actor,
}

#[async_trait]
impl FieldSink for LocalFieldSink {
    async fn persist(
        &self,
        instance_id: RecordId,
        field_name: &str,
        value: FieldValue,
    ) -> GrantsResult<()> {
        self.service
            .patch_field(&self.actor, &instance_id, field_name, value)
            .await
            .map(|_| ())
            .map_err(|e| GrantsError::Persistence {
                field: field_name.to_owned(),
                message: e.to_string(),
            })
    }
}
