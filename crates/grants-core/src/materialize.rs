//! Server-side materialisation of form instances.
//!
//! Materialising walks a form in order and seeds every prefilled key that has no stored
//! answer yet. Stored answers always win. The result is returned to the caller and never
//! written back by this module.

use crate::organisation::Organisation;
use crate::prefill::resolve_prefill;
use forms::{Field, Form, FormData, PrefillRule};

/// Returns `form_data` with missing prefilled keys seeded.
///
/// With no form, or no organisation, the answers are returned unchanged.
pub fn materialize(
    form: Option<&Form>,
    form_data: &FormData,
    organisation: Option<&Organisation>,
    linked_form_data: Option<&FormData>,
) -> FormData {
    let mut data = form_data.clone();

    let (Some(form), Some(organisation)) = (form, organisation) else {
        return data;
    };

    let mut seed = |key: String, rule: Option<&PrefillRule>| {
        let Some(rule) = rule else { return };
        if data.contains_key(&key) {
            return;
        }
        match resolve_prefill(Some(organisation), rule, linked_form_data) {
            Some(value) if value.is_seedable() => {
                data.insert(key, value);
            }
            _ => tracing::debug!(key = %key, "prefill produced no value"),
        }
    };

    for section in &form.sections {
        for field in &section.fields {
            seed(field.name().to_owned(), field.prefill());
            if let Field::Group(group) = field {
                for (key, sub) in group.keyed_subfields() {
                    seed(key, sub.prefill.as_ref());
                }
            }
        }
    }

    data
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::organisation::tests::sample_organisation;
    use forms::{
        FieldType, FieldValue, GroupField, LeafField, OrganisationField, Section, StaffList,
    };

    pub(crate) fn leaf(name: &str, required: bool, prefill: Option<PrefillRule>) -> LeafField {
        LeafField {
            name: name.into(),
            field_type: FieldType::Text,
            label: name.into(),
            required,
            prefill,
            options: vec![],
            placeholder: None,
            description: None,
        }
    }

    fn prefilled_form() -> Form {
        Form {
            title: "Report".into(),
            sections: vec![Section {
                title: "About".into(),
                description: None,
                notice: None,
                fields: vec![
                    Field::Leaf(leaf(
                        "org_name",
                        true,
                        Some(PrefillRule::Organisation(OrganisationField::Name)),
                    )),
                    Field::Leaf(leaf(
                        "about",
                        false,
                        Some(PrefillRule::Organisation(OrganisationField::About)),
                    )),
                    Field::Leaf(leaf(
                        "board",
                        false,
                        Some(PrefillRule::Staff(StaffList::BoardMembers)),
                    )),
                    Field::Leaf(leaf(
                        "blank_default",
                        false,
                        Some(PrefillRule::DefaultValue(String::new())),
                    )),
                    Field::Group(GroupField {
                        name: "budget".into(),
                        field_type: FieldType::Group,
                        label: "Budget".into(),
                        required: false,
                        prefill: None,
                        description: None,
                        subfields: vec![leaf(
                            "amount",
                            false,
                            Some(PrefillRule::LinkedForm("budget_amount".into())),
                        )],
                    }),
                ],
                editable_by: None,
            }],
        }
    }

    #[test]
    fn seeds_missing_keys_including_composed_subfield_keys() {
        let form = prefilled_form();
        let org = sample_organisation();
        let mut parent = FormData::new();
        parent.insert("budget_amount".into(), FieldValue::from("900"));

        let data = materialize(Some(&form), &FormData::new(), Some(&org), Some(&parent));

        assert_eq!(data["org_name"], FieldValue::from("Ubuntu Care"));
        assert_eq!(data["budget_amount"], FieldValue::from("900"));
        assert!(matches!(data["board"], FieldValue::People(ref p) if p.len() == 1));
        assert!(!data.contains_key("about"));
        assert!(!data.contains_key("blank_default"));
    }

    #[test]
    fn empty_staff_lists_are_not_seeded() {
        let form = prefilled_form();
        let mut org = sample_organisation();
        org.staff_members.retain(|member| !member.is_committee);

        let data = materialize(Some(&form), &FormData::new(), Some(&org), None);

        assert_eq!(data["org_name"], FieldValue::from("Ubuntu Care"));
        assert!(!data.contains_key("board"));
    }

    #[test]
    fn stored_answers_are_never_overwritten() {
        let form = prefilled_form();
        let org = sample_organisation();
        let mut stored = FormData::new();
        stored.insert("org_name".into(), FieldValue::from(""));

        let data = materialize(Some(&form), &stored, Some(&org), None);
        assert_eq!(data["org_name"], FieldValue::from(""));
    }

    #[test]
    fn missing_form_or_organisation_leaves_answers_alone() {
        let form = prefilled_form();
        let mut stored = FormData::new();
        stored.insert("x".into(), FieldValue::from("1"));

        assert_eq!(materialize(None, &stored, Some(&sample_organisation()), None), stored);
        assert_eq!(materialize(Some(&form), &stored, None, None), stored);
    }
}
