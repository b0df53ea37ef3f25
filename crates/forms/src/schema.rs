//! Domain-level form template types.
//!
//! A template's `form` is an ordered list of sections, each an ordered list of fields. A field
//! is either a [`LeafField`] holding a value, or a [`GroupField`] whose subfields are leaves.
//! Nesting stops there: the type system has no way to express a group inside a group.
//!
//! Answers for a subfield are stored under the composed key `"{parent}_{child}"`
//! (see [`compose_key`]).

use crate::prefill::PrefillRule;
use grants_types::RoleName;
use grants_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Returns the data key for subfield `child` nested under `parent`.
pub fn compose_key(parent: &str, child: &str) -> String {
    format!("{parent}_{child}")
}

/// Whether a template describes an application or a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    Application,
    Report,
}

/// Which instance attributes the editor sidebar exposes for a template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidebarConfig {
    pub amount: bool,
    pub status: bool,
    pub start_date: bool,
    pub end_date: bool,
    pub due_date: bool,
}

/// Input widget kind of a field.
///
/// Kinds the engine does not know are kept verbatim in [`FieldType::Other`] so they survive
/// storage and are served back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Currency,
    Email,
    Phone,
    Date,
    Select,
    Radio,
    Checkbox,
    File,
    Group,
    Table,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::File => "file",
            FieldType::Group => "group",
            FieldType::Table => "table",
            FieldType::Other(raw) => raw,
        }
    }
}

impl From<String> for FieldType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "number" => FieldType::Number,
            "currency" => FieldType::Currency,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "file" => FieldType::File,
            "group" => FieldType::Group,
            "table" => FieldType::Table,
            _ => FieldType::Other(raw),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// A field that holds a value of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafField {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub prefill: Option<PrefillRule>,
    pub options: Vec<String>,
    pub placeholder: Option<String>,
    pub description: Option<String>,
}

/// A field whose validity derives entirely from its subfields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupField {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub prefill: Option<PrefillRule>,
    pub description: Option<String>,
    pub subfields: Vec<LeafField>,
}

impl GroupField {
    /// Subfields paired with their composed data keys.
    pub fn keyed_subfields(&self) -> impl Iterator<Item = (String, &LeafField)> {
        self.subfields
            .iter()
            .map(move |sub| (compose_key(&self.name, &sub.name), sub))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Leaf(LeafField),
    Group(GroupField),
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Leaf(leaf) => &leaf.name,
            Field::Group(group) => &group.name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Field::Leaf(leaf) => &leaf.label,
            Field::Group(group) => &group.label,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Field::Leaf(leaf) => leaf.required,
            Field::Group(group) => group.required,
        }
    }

    pub fn prefill(&self) -> Option<&PrefillRule> {
        match self {
            Field::Leaf(leaf) => leaf.prefill.as_ref(),
            Field::Group(group) => group.prefill.as_ref(),
        }
    }
}

/// An ordered group of fields with an optional role restriction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub description: Option<String>,
    pub notice: Option<String>,
    pub fields: Vec<Field>,
    /// `None`: anyone may edit. `Some(empty)`: nobody may edit.
    pub editable_by: Option<Vec<RoleName>>,
}

impl Section {
    /// Whether a user holding `role` may change answers in this section.
    pub fn is_editable_by(&self, role: &RoleName) -> bool {
        match &self.editable_by {
            None => true,
            Some(roles) => roles.contains(role),
        }
    }
}

/// Where a data key lives inside a form.
#[derive(Clone, Copy, Debug)]
pub struct FieldLocation<'a> {
    pub section_index: usize,
    pub section: &'a Section,
    pub field: &'a Field,
    /// Set when the key addresses a subfield of a group.
    pub subfield: Option<&'a LeafField>,
}

impl FieldLocation<'_> {
    /// True when the key addresses something that can hold a value.
    pub fn holds_value(&self) -> bool {
        self.subfield.is_some() || matches!(self.field, Field::Leaf(_))
    }
}

/// A form schema: a title and ordered sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Form {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Form {
    /// Finds the section/field a data key belongs to.
    pub fn locate(&self, key: &str) -> Option<FieldLocation<'_>> {
        for (section_index, section) in self.sections.iter().enumerate() {
            for field in &section.fields {
                if field.name() == key {
                    return Some(FieldLocation {
                        section_index,
                        section,
                        field,
                        subfield: None,
                    });
                }
                if let Field::Group(group) = field {
                    if let Some((_, sub)) = group.keyed_subfields().find(|(k, _)| k == key) {
                        return Some(FieldLocation {
                            section_index,
                            section,
                            field,
                            subfield: Some(sub),
                        });
                    }
                }
            }
        }
        None
    }

    /// Every key that can hold a value, in form order.
    pub fn value_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for section in &self.sections {
            for field in &section.fields {
                match field {
                    Field::Leaf(leaf) => keys.push(leaf.name.clone()),
                    Field::Group(group) => keys.extend(group.keyed_subfields().map(|(k, _)| k)),
                }
            }
        }
        keys
    }
}

/// A reusable, administrator-authored form definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormTemplate {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub template_type: TemplateType,
    pub active: bool,
    /// `None` for templates whose schema has not been authored yet.
    pub form: Option<Form>,
    /// Template to instantiate automatically when an instance of this one is approved.
    pub linked_form_template_id: Option<RecordId>,
    pub sidebar_config: SidebarConfig,
    pub include_admin_feedback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, required: bool) -> LeafField {
        LeafField {
            name: name.into(),
            field_type: FieldType::Text,
            label: name.into(),
            required,
            prefill: None,
            options: vec![],
            placeholder: None,
            description: None,
        }
    }

    fn sample_form() -> Form {
        Form {
            title: "Application".into(),
            sections: vec![
                Section {
                    title: "Project".into(),
                    description: None,
                    notice: None,
                    fields: vec![Field::Leaf(leaf("project_name", true))],
                    editable_by: None,
                },
                Section {
                    title: "Finance".into(),
                    description: None,
                    notice: None,
                    fields: vec![Field::Group(GroupField {
                        name: "budget".into(),
                        field_type: FieldType::Group,
                        label: "Budget".into(),
                        required: true,
                        prefill: None,
                        description: None,
                        subfields: vec![leaf("amount", true), leaf("notes", false)],
                    })],
                    editable_by: Some(vec![]),
                },
            ],
        }
    }

    #[test]
    fn locate_finds_subfields_by_composed_key() {
        let form = sample_form();
        let loc = form.locate("budget_amount").expect("composed key resolves");
        assert_eq!(loc.section_index, 1);
        assert_eq!(loc.subfield.map(|s| s.name.as_str()), Some("amount"));
        assert!(loc.holds_value());

        let group = form.locate("budget").expect("group name resolves");
        assert!(!group.holds_value());

        assert!(form.locate("amount").is_none());
    }

    #[test]
    fn value_keys_lists_leaves_and_composed_keys() {
        assert_eq!(
            sample_form().value_keys(),
            vec!["project_name", "budget_amount", "budget_notes"]
        );
    }

    #[test]
    fn editable_by_absent_empty_and_listed() {
        let admin = RoleName::new("ADMIN").unwrap();
        let user = RoleName::new("USER").unwrap();
        let mut section = sample_form().sections.remove(0);

        assert!(section.is_editable_by(&user));

        section.editable_by = Some(vec![]);
        assert!(!section.is_editable_by(&admin));

        section.editable_by = Some(vec![admin.clone()]);
        assert!(section.is_editable_by(&admin));
        assert!(!section.is_editable_by(&user));
    }
}
