//! Request and response types.
//!
//! Request types carry raw strings as clients send them; the `into_*` helpers validate them
//! into core inputs. Responses that are core records are wrapped so the OpenAPI document can
//! describe them without the core crates depending on `utoipa`.

use chrono::NaiveDate;
use forms::FieldValue;
use grants_core::{
    AttributePatch, FormInstance, FormStatus, GrantsError, GrantsResult, InstanceView,
    NewInstance, Organisation, PatchOutcome, RecordId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRes {
    /// Machine-readable kind: `validation`, `permission_denied`, `not_found`, `consistency`,
    /// `unauthorized`, `bad_request` or `internal`.
    pub error: String,
    pub message: String,
    /// Set for `consistency` errors: the instance that was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Set for `consistency` errors when the linked instance already existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormStatusRes {
    pub label: String,
    pub icon: String,
}

impl From<FormStatus> for FormStatusRes {
    fn from(status: FormStatus) -> Self {
        Self {
            label: status.label().to_owned(),
            icon: status.icon().to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateInstanceReq {
    pub form_template_id: String,
    pub local_development_agency_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub due_date: Option<String>,
}

impl CreateInstanceReq {
    pub fn into_new_instance(self) -> GrantsResult<NewInstance> {
        Ok(NewInstance {
            form_template_id: parse_id("formTemplateId", &self.form_template_id)?,
            local_development_agency_id: parse_id(
                "localDevelopmentAgencyId",
                &self.local_development_agency_id,
            )?,
            title: self.title,
            due_date: parse_date("dueDate", self.due_date.as_deref())?,
        })
    }
}

/// `PATCH /instances/{id}` body: one answer (`fieldName` + `fieldValue`), any of the sidebar
/// attributes, or both in one change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchInstanceReq {
    #[serde(default)]
    pub field_name: Option<String>,
    /// A string, or a list of `{name, gender, position?}` rows.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub field_value: Option<serde_json::Value>,
    #[serde(default)]
    pub form_status_label: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub funding_start: Option<String>,
    #[serde(default)]
    pub funding_end: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// A validated `PATCH /instances/{id}` body.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchCommand {
    Field { key: String, value: FieldValue },
    Attributes(AttributePatch),
    FieldAndAttributes {
        key: String,
        value: FieldValue,
        attributes: AttributePatch,
    },
}

impl PatchInstanceReq {
    pub fn into_command(self) -> GrantsResult<PatchCommand> {
        let attributes = AttributePatch {
            form_status: self
                .form_status_label
                .as_deref()
                .map(str::parse::<FormStatus>)
                .transpose()?,
            amount: self.amount,
            funding_start: parse_date("fundingStart", self.funding_start.as_deref())?,
            funding_end: parse_date("fundingEnd", self.funding_end.as_deref())?,
            due_date: parse_date("dueDate", self.due_date.as_deref())?,
        };

        match (self.field_name, self.field_value) {
            (Some(key), Some(value)) => {
                let value: FieldValue = serde_json::from_value(value).map_err(|e| {
                    GrantsError::Validation(format!("invalid value for field '{key}': {e}"))
                })?;
                if attributes.is_empty() {
                    Ok(PatchCommand::Field { key, value })
                } else {
                    Ok(PatchCommand::FieldAndAttributes {
                        key,
                        value,
                        attributes,
                    })
                }
            }
            (Some(key), None) => Err(GrantsError::Validation(format!(
                "fieldValue is required with fieldName '{key}'"
            ))),
            (None, Some(_)) => Err(GrantsError::Validation(
                "fieldName is required with fieldValue".into(),
            )),
            (None, None) if attributes.is_empty() => {
                Err(GrantsError::Validation("nothing to update".into()))
            }
            (None, None) => Ok(PatchCommand::Attributes(attributes)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmitReq {
    pub submitted: bool,
}

/// A form instance record.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct InstanceRes(#[schema(value_type = Object)] pub FormInstance);

/// A materialised instance with `progress` and, for linked children, `linkedFormData`.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct InstanceViewRes(#[schema(value_type = Object)] pub InstanceView);

/// The updated instance, plus `createdLinkedInstance` when the change created one.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PatchInstanceRes(#[schema(value_type = Object)] pub PatchOutcome);

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListInstancesRes {
    #[schema(value_type = Vec<Object>)]
    pub instances: Vec<FormInstance>,
}

/// A form template document (same shape as the YAML templates are authored in).
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TemplateRes(#[schema(value_type = Object)] pub forms::FormTemplate);

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct OrganisationRes(#[schema(value_type = Object)] pub Organisation);

fn parse_id(name: &str, value: &str) -> GrantsResult<RecordId> {
    RecordId::parse(value.trim())
        .map_err(|e| GrantsError::Validation(format!("{name}: {e}")))
}

fn parse_date(name: &str, value: Option<&str>) -> GrantsResult<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|e| {
                GrantsError::Validation(format!("{name} must be YYYY-MM-DD, got '{v}': {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(value: serde_json::Value) -> PatchInstanceReq {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn field_patch_accepts_text_and_people() {
        let cmd = req(json!({"fieldName": "budget_amount", "fieldValue": "1500"}))
            .into_command()
            .unwrap();
        assert_eq!(
            cmd,
            PatchCommand::Field {
                key: "budget_amount".into(),
                value: FieldValue::from("1500"),
            }
        );

        let cmd = req(json!({
            "fieldName": "board",
            "fieldValue": [{"name": "Bo Ng", "gender": "M"}]
        }))
        .into_command()
        .unwrap();
        assert!(matches!(
            cmd,
            PatchCommand::Field {
                value: FieldValue::People(_),
                ..
            }
        ));
    }

    #[test]
    fn attribute_patch_parses_status_label_and_dates() {
        let cmd = req(json!({"formStatusLabel": "Pending", "dueDate": "2027-03-31"}))
            .into_command()
            .unwrap();
        let PatchCommand::Attributes(patch) = cmd else {
            panic!("expected attributes");
        };
        assert_eq!(patch.form_status, Some(FormStatus::UnderReview));
        assert_eq!(patch.due_date, NaiveDate::from_ymd_opt(2027, 3, 31));
    }

    #[test]
    fn answer_and_attributes_combine_in_one_patch() {
        let cmd = req(json!({
            "fieldName": "project_name",
            "fieldValue": "Water",
            "formStatusLabel": "Approved",
            "amount": 3.0
        }))
        .into_command()
        .unwrap();
        let PatchCommand::FieldAndAttributes {
            key,
            value,
            attributes,
        } = cmd
        else {
            panic!("expected an answer with attributes");
        };
        assert_eq!(key, "project_name");
        assert_eq!(value, FieldValue::from("Water"));
        assert_eq!(attributes.form_status, Some(FormStatus::Approved));
        assert_eq!(attributes.amount, Some(3.0));
    }

    #[test]
    fn malformed_patches_are_validation_errors() {
        for body in [
            json!({}),
            json!({"fieldName": "a"}),
            json!({"fieldName": "a", "fieldValue": 42}),
            json!({"fundingStart": "01/04/2026"}),
        ] {
            assert!(
                matches!(req(body.clone()).into_command(), Err(GrantsError::Validation(_))),
                "{body}"
            );
        }
        assert!(matches!(
            req(json!({"formStatusLabel": "Archived"})).into_command(),
            Err(GrantsError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<PatchInstanceReq, _> =
            serde_json::from_value(json!({"fieldName": "a", "colour": "red"}));
        assert!(parsed.is_err());
    }
}
