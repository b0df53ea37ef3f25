//! Prefill resolution.
//!
//! Resolves a field's [`PrefillRule`] against the organisation the instance belongs to and,
//! for child instances, the parent instance's answers. Resolution is pure: the same inputs
//! always give the same value, and nothing here touches storage.

use crate::organisation::Organisation;
use forms::{FieldValue, FormData, PrefillRule};

/// Returns the value `rule` yields, or `None` when its source has nothing for it.
///
/// A missing organisation resolves organisation-backed rules to nothing. A missing
/// `organisationDetail` or `operations` object does the same for rules reading from it.
pub fn resolve_prefill(
    organisation: Option<&Organisation>,
    rule: &PrefillRule,
    linked_form_data: Option<&FormData>,
) -> Option<FieldValue> {
    match rule {
        PrefillRule::Organisation(field) => organisation
            .and_then(|org| org.field(*field))
            .map(FieldValue::Text),
        PrefillRule::OrganisationDetail(field) => organisation
            .and_then(|org| org.organisation_detail.as_ref())
            .and_then(|detail| detail.field(*field))
            .map(FieldValue::Text),
        PrefillRule::Operations(field) => organisation
            .and_then(|org| org.operations.as_ref())
            .and_then(|ops| ops.field(*field))
            .map(FieldValue::Text),
        PrefillRule::Staff(list) => organisation.map(|org| FieldValue::People(org.people(*list))),
        PrefillRule::LinkedForm(key) => linked_form_data.and_then(|data| data.get(key)).cloned(),
        PrefillRule::DefaultValue(value) => Some(FieldValue::Text(value.clone())),
        PrefillRule::Unsupported { .. } => None,
    }
}
