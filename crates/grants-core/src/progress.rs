//! Field validity, section completion and the submission gate.
//!
//! Validity is computed from the answers alone and recomputed whenever they change:
//! - a leaf is valid when it is optional, or required and filled (non-blank after trimming)
//! - a group is valid when it is optional, or every required subfield is valid
//! - a section counts its valid required top-level fields against all of them
//!
//! Sections are evaluated independently; a form may be submitted only when every section
//! is valid.

use forms::{Field, Form, FormData, LeafField, Section};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProgress {
    pub key: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<FieldProgress>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub title: String,
    pub completed: usize,
    pub required: usize,
    pub is_valid: bool,
    pub fields: Vec<FieldProgress>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProgress {
    pub sections: Vec<SectionProgress>,
    pub can_submit: bool,
}

fn leaf_is_valid(leaf: &LeafField, key: &str, data: &FormData) -> bool {
    !leaf.required || data.get(key).is_some_and(|value| value.is_filled())
}

/// Validity of one top-level field, with its subfields for groups.
pub fn evaluate_field(field: &Field, data: &FormData) -> FieldProgress {
    match field {
        Field::Leaf(leaf) => FieldProgress {
            key: leaf.name.clone(),
            is_valid: leaf_is_valid(leaf, &leaf.name, data),
            subfields: Vec::new(),
        },
        Field::Group(group) => {
            let subfields: Vec<FieldProgress> = group
                .keyed_subfields()
                .map(|(key, sub)| FieldProgress {
                    is_valid: leaf_is_valid(sub, &key, data),
                    key,
                    subfields: Vec::new(),
                })
                .collect();
            // Optional subfields are always valid, so "all required valid" is "all valid".
            let is_valid = !group.required || subfields.iter().all(|s| s.is_valid);
            FieldProgress {
                key: group.name.clone(),
                is_valid,
                subfields,
            }
        }
    }
}

pub fn evaluate_section(section: &Section, data: &FormData) -> SectionProgress {
    let fields: Vec<FieldProgress> = section
        .fields
        .iter()
        .map(|field| evaluate_field(field, data))
        .collect();

    let (required, completed) = section
        .fields
        .iter()
        .zip(&fields)
        .filter(|(field, _)| field.required())
        .fold((0, 0), |(required, completed), (_, progress)| {
            (required + 1, completed + usize::from(progress.is_valid))
        });

    SectionProgress {
        title: section.title.clone(),
        completed,
        required,
        is_valid: required == 0 || completed == required,
        fields,
    }
}

/// True when every section is valid. A form with no sections can be submitted.
pub fn can_submit(sections: &[SectionProgress]) -> bool {
    sections.iter().all(|section| section.is_valid)
}

pub fn evaluate_form(form: &Form, data: &FormData) -> FormProgress {
    let sections: Vec<SectionProgress> = form
        .sections
        .iter()
        .map(|section| evaluate_section(section, data))
        .collect();
    let can_submit = can_submit(&sections);
    FormProgress {
        sections,
        can_submit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::tests::leaf;
    use forms::{FieldType, FieldValue, GroupField};

    fn section(fields: Vec<Field>) -> Section {
        Section {
            title: "Section".into(),
            description: None,
            notice: None,
            fields,
            editable_by: None,
        }
    }

    fn budget_group(required: bool) -> Field {
        Field::Group(GroupField {
            name: "budget".into(),
            field_type: FieldType::Group,
            label: "Budget".into(),
            required,
            prefill: None,
            description: None,
            subfields: vec![leaf("amount", true, None), leaf("notes", false, None)],
        })
    }

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn two_of_three_required_is_invalid() {
        let s = section(vec![
            Field::Leaf(leaf("a", true, None)),
            Field::Leaf(leaf("b", true, None)),
            Field::Leaf(leaf("c", true, None)),
            Field::Leaf(leaf("d", false, None)),
        ]);

        let progress = evaluate_section(&s, &data(&[("a", "x"), ("b", "y")]));
        assert_eq!((progress.completed, progress.required), (2, 3));
        assert!(!progress.is_valid);

        let progress = evaluate_section(&s, &data(&[("a", "x"), ("b", "y"), ("c", "z")]));
        assert!(progress.is_valid);
    }

    #[test]
    fn whitespace_does_not_satisfy_required() {
        let s = section(vec![Field::Leaf(leaf("a", true, None))]);
        assert!(!evaluate_section(&s, &data(&[("a", "   ")])).is_valid);
    }

    #[test]
    fn section_without_required_fields_is_valid() {
        let s = section(vec![Field::Leaf(leaf("a", false, None))]);
        let progress = evaluate_section(&s, &FormData::new());
        assert_eq!(progress.required, 0);
        assert!(progress.is_valid);
    }

    #[test]
    fn group_validity_follows_required_subfields() {
        let s = section(vec![budget_group(true)]);

        let empty = evaluate_section(&s, &FormData::new());
        assert!(!empty.fields[0].is_valid);
        assert_eq!(empty.fields[0].subfields[0].key, "budget_amount");

        let filled = evaluate_section(&s, &data(&[("budget_amount", "100")]));
        assert!(filled.fields[0].is_valid);
        assert!(filled.is_valid);

        let optional = evaluate_section(&section(vec![budget_group(false)]), &FormData::new());
        assert!(optional.fields[0].is_valid);
        assert_eq!(optional.required, 0);
    }

    #[test]
    fn filling_a_field_never_makes_a_section_less_complete() {
        let s = section(vec![
            Field::Leaf(leaf("a", true, None)),
            Field::Leaf(leaf("b", true, None)),
        ]);
        let mut answers = FormData::new();
        let mut last = evaluate_section(&s, &answers).completed;
        for key in ["a", "b"] {
            answers.insert(key.into(), FieldValue::from("done"));
            let next = evaluate_section(&s, &answers).completed;
            assert!(next >= last);
            last = next;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn gate_requires_every_section() {
        let form = Form {
            title: "F".into(),
            sections: vec![
                section(vec![Field::Leaf(leaf("a", true, None))]),
                section(vec![Field::Leaf(leaf("b", true, None))]),
            ],
        };
        assert!(!evaluate_form(&form, &data(&[("a", "1")])).can_submit);
        assert!(evaluate_form(&form, &data(&[("a", "1"), ("b", "2")])).can_submit);
        assert!(can_submit(&[]));
    }
}
