//! File-backed form instance storage.
//!
//! ## Storage Layout
//!
//! ```text
//! instances/
//!   <s1>/<s2>/<id>/instance.json
//! links/
//!   <parent-id>        # contains the id of the parent's linked child
//! ```
//!
//! A linked child is written first and then claims its parent's link marker with an exclusive
//! create. Only the claim winner keeps its child, so a parent has one linked child even when
//! several processes approve it at once, and a marker always names a child that was already
//! on disk when the marker appeared.

use super::shared::{create_exclusive, list_record_files, read_record, record_path, write_atomic};
use super::{InstanceStore, LinkOutcome};
use crate::config::CoreConfig;
use crate::constants::INSTANCE_FILENAME;
use crate::error::{GrantsError, GrantsResult, RecordKind};
use crate::instance::FormInstance;
use grants_uuid::RecordId;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct FileInstanceStore {
    cfg: Arc<CoreConfig>,
}

impl FileInstanceStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn path(&self, id: &RecordId) -> PathBuf {
        record_path(&self.cfg.instances_dir(), id, INSTANCE_FILENAME)
    }

    fn link_path(&self, parent_id: &RecordId) -> PathBuf {
        self.cfg.links_dir().join(parent_id.to_string())
    }

    fn write(&self, instance: &FormInstance) -> GrantsResult<()> {
        let json = serde_json::to_vec_pretty(instance).map_err(GrantsError::Serialization)?;
        write_atomic(&self.path(&instance.id), &json)
    }

    fn remove(&self, id: &RecordId) -> GrantsResult<()> {
        let path = self.path(id);
        fs::remove_file(&path).map_err(GrantsError::FileWrite)?;
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir(dir);
        }
        Ok(())
    }

    /// Claims the parent's link marker for an already stored `child`. A losing child is
    /// deleted again.
    fn claim_link(&self, parent_id: &RecordId, child: &FormInstance) -> GrantsResult<LinkOutcome> {
        let claimed = match create_exclusive(
            &self.link_path(parent_id),
            child.id.to_string().as_bytes(),
        ) {
            Ok(claimed) => claimed,
            Err(e) => {
                let _ = self.remove(&child.id);
                return Err(e);
            }
        };
        if claimed {
            return Ok(LinkOutcome::Created);
        }

        self.remove(&child.id)?;
        let existing = self.read_link(parent_id)?.ok_or_else(|| {
            GrantsError::InvalidInput(format!("link marker for {parent_id} vanished"))
        })?;
        Ok(LinkOutcome::AlreadyLinked(existing))
    }

    fn read_link(&self, parent_id: &RecordId) -> GrantsResult<Option<RecordId>> {
        match fs::read_to_string(self.link_path(parent_id)) {
            Ok(contents) => Ok(Some(RecordId::parse(contents.trim())?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GrantsError::FileRead(e)),
        }
    }
}

impl InstanceStore for FileInstanceStore {
    fn load(&self, id: &RecordId) -> GrantsResult<FormInstance> {
        let json = read_record(&self.path(id), RecordKind::Instance, id)?;
        serde_json::from_str(&json).map_err(GrantsError::Deserialization)
    }

    fn save(&self, instance: &FormInstance) -> GrantsResult<()> {
        if !self.path(&instance.id).is_file() {
            return Err(GrantsError::not_found(RecordKind::Instance, instance.id));
        }
        self.write(instance)
    }

    fn create(&self, instance: &FormInstance) -> GrantsResult<()> {
        if self.path(&instance.id).exists() {
            return Err(GrantsError::InvalidInput(format!(
                "form instance {} already exists",
                instance.id
            )));
        }
        self.write(instance)
    }

    fn list_for_organisation(&self, organisation_id: &RecordId) -> GrantsResult<Vec<FormInstance>> {
        let mut instances = Vec::new();
        for path in list_record_files(&self.cfg.instances_dir(), INSTANCE_FILENAME)? {
            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                // A child that lost its link claim is removed again.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(GrantsError::FileRead(e)),
            };
            let instance: FormInstance =
                serde_json::from_str(&json).map_err(GrantsError::Deserialization)?;
            if instance.local_development_agency_id == *organisation_id {
                instances.push(instance);
            }
        }
        instances.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(instances)
    }

    fn find_linked_child(&self, parent_id: &RecordId) -> GrantsResult<Option<FormInstance>> {
        let Some(child_id) = self.read_link(parent_id)? else {
            return Ok(None);
        };
        match self.load(&child_id) {
            Ok(child) => Ok(Some(child)),
            Err(GrantsError::NotFound { .. }) => {
                tracing::warn!(
                    parent_id = %parent_id,
                    child_id = %child_id,
                    "link marker names a missing child; removing it"
                );
                fs::remove_file(self.link_path(parent_id)).map_err(GrantsError::FileWrite)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn create_linked_child(&self, child: &FormInstance) -> GrantsResult<LinkOutcome> {
        let parent_id = child.linked_form_id.ok_or_else(|| {
            GrantsError::InvalidInput(format!("instance {} has no linkedFormId", child.id))
        })?;

        if let Some(existing) = self.read_link(&parent_id)? {
            return Ok(LinkOutcome::AlreadyLinked(existing));
        }

        self.create(child)?;
        self.claim_link(&parent_id, child)
    }
}
