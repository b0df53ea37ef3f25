//! File-backed form template storage.
//!
//! Templates are stored as YAML documents at `templates/<s1>/<s2>/<id>/template.yaml`,
//! in the same format administrators author them in.

use super::shared::{list_record_files, read_record, record_path, write_atomic};
use super::TemplateStore;
use crate::config::CoreConfig;
use crate::constants::TEMPLATE_FILENAME;
use crate::error::{GrantsError, GrantsResult, RecordKind};
use forms::{FormTemplate, Template};
use grants_uuid::RecordId;
use std::fs;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct FileTemplateStore {
    cfg: Arc<CoreConfig>,
}

impl FileTemplateStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }
}

impl TemplateStore for FileTemplateStore {
    fn load(&self, id: &RecordId) -> GrantsResult<FormTemplate> {
        let path = record_path(&self.cfg.templates_dir(), id, TEMPLATE_FILENAME);
        let yaml = read_record(&path, RecordKind::Template, id)?;
        let template = Template::parse_yaml(&yaml)?;
        if template.id != *id {
            return Err(GrantsError::InvalidInput(format!(
                "template stored under {id} declares id {}",
                template.id
            )));
        }
        Ok(template)
    }

    fn save(&self, template: &FormTemplate) -> GrantsResult<()> {
        let yaml = Template::render_yaml(template)?;
        let path = record_path(&self.cfg.templates_dir(), &template.id, TEMPLATE_FILENAME);
        write_atomic(&path, yaml.as_bytes())
    }

    fn list(&self) -> GrantsResult<Vec<FormTemplate>> {
        list_record_files(&self.cfg.templates_dir(), TEMPLATE_FILENAME)?
            .into_iter()
            .map(|path| {
                let yaml = fs::read_to_string(&path).map_err(GrantsError::FileRead)?;
                Ok(Template::parse_yaml(&yaml)?)
            })
            .collect()
    }
}
