//! File-backed organisation storage (`organisations/<s1>/<s2>/<id>/organisation.yaml`).

use super::shared::{read_record, record_path, write_atomic};
use super::OrganisationStore;
use crate::config::CoreConfig;
use crate::constants::ORGANISATION_FILENAME;
use crate::error::{GrantsError, GrantsResult, RecordKind};
use crate::organisation::Organisation;
use grants_uuid::RecordId;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct FileOrganisationStore {
    cfg: Arc<CoreConfig>,
}

impl FileOrganisationStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }
}

impl OrganisationStore for FileOrganisationStore {
    fn load(&self, id: &RecordId) -> GrantsResult<Organisation> {
        let path = record_path(&self.cfg.organisations_dir(), id, ORGANISATION_FILENAME);
        let yaml = read_record(&path, RecordKind::Organisation, id)?;
        serde_yaml::from_str(&yaml).map_err(GrantsError::YamlDeserialization)
    }

    fn save(&self, organisation: &Organisation) -> GrantsResult<()> {
        let yaml = serde_yaml::to_string(organisation).map_err(GrantsError::YamlSerialization)?;
        let path = record_path(
            &self.cfg.organisations_dir(),
            &organisation.id,
            ORGANISATION_FILENAME,
        );
        write_atomic(&path, yaml.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organisation::tests::sample_organisation;
    use tempfile::TempDir;

    #[test]
    fn organisation_round_trips_through_yaml_file() {
        let temp = TempDir::new().unwrap();
        let cfg = Arc::new(CoreConfig::with_defaults(temp.path().to_path_buf()).unwrap());
        let store = FileOrganisationStore::new(cfg);

        let org = sample_organisation();
        store.save(&org).unwrap();
        assert_eq!(store.load(&org.id).unwrap(), org);
    }
}
