//! Form instances.
//!
//! A form instance is one organisation's copy of a template: its answers, status and the
//! attributes the editor sidebar manages. Instances are stored as JSON documents.

use crate::status::FormStatus;
use chrono::{DateTime, NaiveDate, Utc};
use forms::{FieldValue, FormData};
use grants_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInstance {
    pub id: RecordId,
    pub title: String,
    pub form_template_id: RecordId,
    pub local_development_agency_id: RecordId,
    pub form_status: FormStatus,
    #[serde(default)]
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_end: Option<NaiveDate>,
    /// Set on a child instance; names the parent whose approval created it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_form_id: Option<RecordId>,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormInstance {
    /// A fresh `Draft` instance with no answers.
    pub fn draft(
        title: String,
        form_template_id: RecordId,
        local_development_agency_id: RecordId,
        created_by_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            title,
            form_template_id,
            local_development_agency_id,
            form_status: FormStatus::Draft,
            form_data: FormData::new(),
            due_date: None,
            submitted: None,
            approved: None,
            amount: None,
            funding_start: None,
            funding_end: None,
            linked_form_id: None,
            created_by_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_some()
    }

    /// Merges one answer, replacing any previous value under `key`.
    pub fn set_answer(&mut self, key: impl Into<String>, value: FieldValue) {
        self.form_data.insert(key.into(), value);
    }
}

/// Default title for a new instance of template `template_name`.
pub fn default_title(template_name: &str, now: DateTime<Utc>) -> String {
    format!("{} - {}", template_name, now.format("%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn title_uses_the_current_year() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert_eq!(default_title("Annual Report", now), "Annual Report - 2026");
    }

    #[test]
    fn json_uses_camel_case_and_omits_unset_attributes() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut instance = FormInstance::draft(
            "Application - 2026".into(),
            RecordId::new(),
            RecordId::new(),
            "user-1".into(),
            now,
        );
        instance.set_answer("project_name", FieldValue::from("Water"));

        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["formStatus"], "Draft");
        assert_eq!(json["formData"]["project_name"], "Water");
        assert!(json.get("linkedFormId").is_none());
        assert!(json.get("submitted").is_none());

        let back: FormInstance = serde_json::from_value(json).unwrap();
        assert_eq!(back, instance);
    }
}
