//! Form template wire models and translation helpers.
//!
//! Responsibilities:
//! - Define a strict wire model for YAML/JSON (de)serialisation
//! - Translate the wire model into the domain types in [`crate::schema`]
//! - Enforce structural rules the wire shape cannot: one nesting level, unique data keys,
//!   non-blank names, valid ids and role names
//!
//! Notes:
//! - The wire shape uses the same camelCase keys as the web client (`templateType`,
//!   `linkedFormTemplateId`, ...) except for `editable_by`, which has always been snake case.
//! - `value` and `isValid` are runtime-only keys that clients sometimes echo back. They are
//!   accepted and dropped.

use crate::prefill::{PrefillRule, PrefillWire};
use crate::schema::{
    compose_key, Field, FieldType, Form, FormTemplate, GroupField, LeafField, Section,
    SidebarConfig, TemplateType,
};
use crate::{FormsError, FormsResult};
use grants_types::{NonEmptyText, RoleName};
use grants_uuid::RecordId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

// ============================================================================
// Public Template operations
// ============================================================================

/// Template document operations.
///
/// This is a zero-sized type used for namespacing template parsing and rendering.
pub struct Template;

impl Template {
    /// Parse a template from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::Translation`] naming the failing path when the YAML does not
    /// match the wire schema, and the structural errors listed on [`FormsError`] when it does
    /// but describes an invalid form.
    pub fn parse_yaml(yaml_text: &str) -> FormsResult<FormTemplate> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = match serde_path_to_error::deserialize::<_, FormTemplateWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => return Err(schema_mismatch(err.path().to_string(), err.into_inner())),
        };
        wire_to_domain(wire)
    }

    /// Parse a template from JSON text.
    pub fn parse_json(json_text: &str) -> FormsResult<FormTemplate> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire =
            match serde_path_to_error::deserialize::<_, FormTemplateWire>(&mut deserializer) {
                Ok(parsed) => parsed,
                Err(err) => return Err(schema_mismatch(err.path().to_string(), err.into_inner())),
            };
        wire_to_domain(wire)
    }

    /// Render a template as YAML text.
    pub fn render_yaml(template: &FormTemplate) -> FormsResult<String> {
        Ok(serde_yaml::to_string(&domain_to_wire(template))?)
    }

    /// Render a template as JSON text.
    pub fn render_json(template: &FormTemplate) -> FormsResult<String> {
        Ok(serde_json::to_string_pretty(&domain_to_wire(template))?)
    }
}

fn schema_mismatch(path: String, source: impl std::fmt::Display) -> FormsError {
    let path = if path.is_empty() { "<root>".to_string() } else { path };
    FormsError::Translation(format!("Template schema mismatch at {path}: {source}"))
}

impl Serialize for FormTemplate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        domain_to_wire(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FormTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = FormTemplateWire::deserialize(deserializer)?;
        wire_to_domain(wire).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct FormTemplateWire {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    template_type: TemplateType,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form: Option<FormWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linked_form_template_id: Option<String>,
    #[serde(default)]
    sidebar_config: SidebarConfig,
    #[serde(default)]
    include_admin_feedback: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct FormWire {
    title: String,
    #[serde(default)]
    sections: Vec<SectionWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SectionWire {
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
    #[serde(default)]
    fields: Vec<FieldWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    editable_by: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct FieldWire {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    label: String,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefill: Option<PrefillWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldWire>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing)]
    value: Option<serde_json::Value>,
    #[serde(default, skip_serializing)]
    is_valid: Option<serde_json::Value>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn parse_id(value: &str, what: &str) -> FormsResult<RecordId> {
    RecordId::parse(value).map_err(|e| FormsError::InvalidId(format!("{what}: {e}")))
}

fn require_name(value: &str, what: &str) -> FormsResult<String> {
    NonEmptyText::new(value)
        .map(NonEmptyText::into_inner)
        .map_err(|_| FormsError::InvalidInput(format!("{what} cannot be empty")))
}

fn wire_to_domain(wire: FormTemplateWire) -> FormsResult<FormTemplate> {
    let id = parse_id(&wire.id, "template id")?;
    let linked_form_template_id = wire
        .linked_form_template_id
        .as_deref()
        .map(|raw| parse_id(raw, "linkedFormTemplateId"))
        .transpose()?;

    if linked_form_template_id == Some(id) {
        return Err(FormsError::InvalidInput(
            "a template cannot link to itself".into(),
        ));
    }

    let form = wire.form.map(form_to_domain).transpose()?;

    Ok(FormTemplate {
        id,
        name: require_name(&wire.name, "template name")?,
        description: wire.description,
        template_type: wire.template_type,
        active: wire.active,
        form,
        linked_form_template_id,
        sidebar_config: wire.sidebar_config,
        include_admin_feedback: wire.include_admin_feedback,
    })
}

fn form_to_domain(wire: FormWire) -> FormsResult<Form> {
    let sections = wire
        .sections
        .into_iter()
        .map(section_to_domain)
        .collect::<FormsResult<Vec<_>>>()?;

    let form = Form {
        title: wire.title,
        sections,
    };
    ensure_unique_keys(&form)?;
    Ok(form)
}

fn section_to_domain(wire: SectionWire) -> FormsResult<Section> {
    let editable_by = wire
        .editable_by
        .map(|roles| {
            roles
                .iter()
                .map(|r| {
                    RoleName::new(r).map_err(|e| {
                        FormsError::InvalidInput(format!("invalid role '{r}' in editable_by: {e}"))
                    })
                })
                .collect::<FormsResult<Vec<_>>>()
        })
        .transpose()?;

    let fields = wire
        .fields
        .into_iter()
        .map(field_to_domain)
        .collect::<FormsResult<Vec<_>>>()?;

    Ok(Section {
        title: wire.title,
        description: wire.description,
        notice: wire.notice,
        fields,
        editable_by,
    })
}

fn field_to_domain(wire: FieldWire) -> FormsResult<Field> {
    let name = require_name(&wire.name, "field name")?;

    match wire.fields {
        None => Ok(Field::Leaf(LeafField {
            name,
            field_type: wire.field_type,
            label: wire.label,
            required: wire.required,
            prefill: wire.prefill.map(PrefillRule::from),
            options: wire.options,
            placeholder: wire.placeholder,
            description: wire.description,
        })),
        Some(children) => {
            let subfields = children
                .into_iter()
                .map(|child| subfield_to_domain(&name, child))
                .collect::<FormsResult<Vec<_>>>()?;
            Ok(Field::Group(GroupField {
                name,
                field_type: wire.field_type,
                label: wire.label,
                required: wire.required,
                prefill: wire.prefill.map(PrefillRule::from),
                description: wire.description,
                subfields,
            }))
        }
    }
}

fn subfield_to_domain(parent: &str, wire: FieldWire) -> FormsResult<LeafField> {
    let name = require_name(&wire.name, "subfield name")?;
    if wire.fields.is_some() {
        return Err(FormsError::NestingTooDeep {
            field: compose_key(parent, &name),
        });
    }

    Ok(LeafField {
        name,
        field_type: wire.field_type,
        label: wire.label,
        required: wire.required,
        prefill: wire.prefill.map(PrefillRule::from),
        options: wire.options,
        placeholder: wire.placeholder,
        description: wire.description,
    })
}

/// Answers share one flat map, so every name and composed key must be distinct form-wide.
fn ensure_unique_keys(form: &Form) -> FormsResult<()> {
    let mut seen = HashSet::new();
    for section in &form.sections {
        for field in &section.fields {
            if !seen.insert(field.name().to_string()) {
                return Err(FormsError::DuplicateKey(field.name().to_string()));
            }
            if let Field::Group(group) = field {
                for (key, _) in group.keyed_subfields() {
                    if !seen.insert(key.clone()) {
                        return Err(FormsError::DuplicateKey(key));
                    }
                }
            }
        }
    }
    Ok(())
}

fn leaf_to_wire(leaf: &LeafField) -> FieldWire {
    FieldWire {
        name: leaf.name.clone(),
        field_type: leaf.field_type.clone(),
        label: leaf.label.clone(),
        required: leaf.required,
        prefill: leaf.prefill.as_ref().map(PrefillWire::from),
        fields: None,
        options: leaf.options.clone(),
        placeholder: leaf.placeholder.clone(),
        description: leaf.description.clone(),
        value: None,
        is_valid: None,
    }
}

fn field_to_wire(field: &Field) -> FieldWire {
    match field {
        Field::Leaf(leaf) => leaf_to_wire(leaf),
        Field::Group(group) => FieldWire {
            name: group.name.clone(),
            field_type: group.field_type.clone(),
            label: group.label.clone(),
            required: group.required,
            prefill: group.prefill.as_ref().map(PrefillWire::from),
            fields: Some(group.subfields.iter().map(leaf_to_wire).collect()),
            options: vec![],
            placeholder: None,
            description: group.description.clone(),
            value: None,
            is_valid: None,
        },
    }
}

fn domain_to_wire(template: &FormTemplate) -> FormTemplateWire {
    FormTemplateWire {
        id: template.id.to_string(),
        name: template.name.clone(),
        description: template.description.clone(),
        template_type: template.template_type,
        active: template.active,
        form: template.form.as_ref().map(|form| FormWire {
            title: form.title.clone(),
            sections: form
                .sections
                .iter()
                .map(|section| SectionWire {
                    title: section.title.clone(),
                    description: section.description.clone(),
                    notice: section.notice.clone(),
                    fields: section.fields.iter().map(field_to_wire).collect(),
                    editable_by: section
                        .editable_by
                        .as_ref()
                        .map(|roles| roles.iter().map(|r| r.as_str().to_owned()).collect()),
                })
                .collect(),
        }),
        linked_form_template_id: template.linked_form_template_id.map(|id| id.to_string()),
        sidebar_config: template.sidebar_config,
        include_admin_feedback: template.include_admin_feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefill::{OrganisationField, StaffList};

    const APPLICATION_YAML: &str = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Grant application"
templateType: APPLICATION
linkedFormTemplateId: "a4f91c6d3b2e4c5f9d7a1e8b6c0a9f12"
sidebarConfig:
  amount: true
  status: true
form:
  title: "Grant application"
  sections:
    - title: "Organisation"
      fields:
        - name: organisation_name
          type: text
          label: "Organisation name"
          required: true
          prefill: { source: organisation, path: name }
        - name: organisation_board_members
          type: table
          label: "Board"
          prefill: { source: organisation_staff, path: organisation_board_members }
    - title: "Budget"
      editable_by: []
      fields:
        - name: budget
          type: group
          label: "Budget"
          required: true
          fields:
            - { name: amount, type: currency, label: "Amount", required: true }
            - { name: notes, type: textarea, label: "Notes" }
"#;

    #[test]
    fn parses_sample_application() {
        let template = Template::parse_yaml(APPLICATION_YAML).expect("parse yaml");
        assert_eq!(template.template_type, TemplateType::Application);
        assert!(template.active);
        assert!(template.sidebar_config.amount);
        assert!(!template.sidebar_config.due_date);

        let form = template.form.as_ref().expect("form present");
        assert_eq!(form.sections.len(), 2);
        assert_eq!(
            form.sections[0].fields[0].prefill(),
            Some(&PrefillRule::Organisation(OrganisationField::Name))
        );
        assert_eq!(
            form.sections[0].fields[1].prefill(),
            Some(&PrefillRule::Staff(StaffList::BoardMembers))
        );
        assert_eq!(form.sections[1].editable_by, Some(vec![]));
        assert!(matches!(form.sections[1].fields[0], Field::Group(_)));
    }

    #[test]
    fn yaml_render_then_json_parse_preserves_template() {
        let template = Template::parse_yaml(APPLICATION_YAML).expect("parse yaml");
        let yaml = Template::render_yaml(&template).expect("render yaml");
        assert_eq!(Template::parse_yaml(&yaml).expect("reparse yaml"), template);

        let json = Template::render_json(&template).expect("render json");
        assert!(json.contains("\"linkedFormTemplateId\""));
        assert!(json.contains("\"editable_by\""));
        assert_eq!(Template::parse_json(&json).expect("parse json"), template);
    }

    #[test]
    fn rejects_second_nesting_level() {
        let input = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Deep"
templateType: REPORT
form:
  title: "Deep"
  sections:
    - title: "S"
      fields:
        - name: outer
          type: group
          fields:
            - name: inner
              type: group
              fields:
                - { name: leaf, type: text }
"#;
        let err = Template::parse_yaml(input).expect_err("nesting must be rejected");
        match err {
            FormsError::NestingTooDeep { field } => assert_eq!(field, "outer_inner"),
            other => panic!("expected NestingTooDeep, got {other:?}"),
        }
    }

    #[test]
    fn rejects_colliding_composed_key() {
        let input = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Collide"
templateType: REPORT
form:
  title: "Collide"
  sections:
    - title: "A"
      fields:
        - { name: budget_amount, type: text }
    - title: "B"
      fields:
        - name: budget
          type: group
          fields:
            - { name: amount, type: text }
"#;
        let err = Template::parse_yaml(input).expect_err("collision must be rejected");
        assert!(matches!(err, FormsError::DuplicateKey(ref k) if k == "budget_amount"));
    }

    #[test]
    fn strict_validation_reports_path_of_unknown_key() {
        let input = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Typo"
templateType: REPORT
form:
  title: "Typo"
  sections:
    - title: "A"
      fields:
        - { name: x, type: text, requierd: true }
"#;
        let err = Template::parse_yaml(input).expect_err("unknown key must be rejected");
        match err {
            FormsError::Translation(msg) => {
                assert!(msg.contains("form.sections[0].fields[0]"), "{msg}");
                assert!(msg.contains("requierd"), "{msg}");
            }
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn runtime_only_keys_are_accepted_and_dropped() {
        let input = r#"{
            "id": "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88",
            "name": "Echo",
            "templateType": "REPORT",
            "form": {"title": "Echo", "sections": [{"title": "A", "fields": [
                {"name": "x", "type": "text", "label": "X", "value": "hi", "isValid": true}
            ]}]}
        }"#;
        let template = Template::parse_json(input).expect("runtime keys tolerated");
        let json = Template::render_json(&template).unwrap();
        assert!(!json.contains("isValid"));
    }

    #[test]
    fn unknown_field_type_survives_a_round_trip() {
        let input = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Types"
templateType: REPORT
form:
  title: "Types"
  sections:
    - title: "A"
      fields:
        - { name: where, type: map }
        - { name: pick, type: radio-group }
"#;
        let template = Template::parse_yaml(input).unwrap();
        let rendered = Template::render_yaml(&template).unwrap();
        assert!(rendered.contains("map"));
        assert!(rendered.contains("radio-group"));

        let reparsed = Template::parse_yaml(&rendered).unwrap();
        assert_eq!(reparsed, template);
        let form = reparsed.form.unwrap();
        match &form.sections[0].fields[0] {
            Field::Leaf(leaf) => assert_eq!(leaf.field_type, FieldType::Other("map".into())),
            other => panic!("expected leaf, got {other:?}"),
        }
        assert_eq!(form.sections[0].fields[1].name(), "pick");
    }

    #[test]
    fn known_field_types_use_lowercase_names() {
        assert_eq!(FieldType::from("currency".to_owned()), FieldType::Currency);
        assert_eq!(String::from(FieldType::Textarea), "textarea");
        assert_eq!(FieldType::Other("map".into()).as_str(), "map");
    }

    #[test]
    fn rejects_self_link_and_bad_ids() {
        let self_link = r#"id: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
name: "Loop"
templateType: APPLICATION
linkedFormTemplateId: "7f4c2e9d4b0a4f3a9a2c0e9a6b5d1c88"
"#;
        assert!(matches!(
            Template::parse_yaml(self_link),
            Err(FormsError::InvalidInput(_))
        ));

        let bad_id = "id: \"7f4c2e9d-4b0a\"\nname: \"x\"\ntemplateType: REPORT\n";
        assert!(matches!(
            Template::parse_yaml(bad_id),
            Err(FormsError::InvalidId(_))
        ));
    }
}
