//! Prefill rules.
//!
//! A template field may carry a prefill rule `{source, path}` telling the engine where to
//! seed its initial value from. On the wire both halves are free strings; in the domain model
//! each source becomes its own variant carrying a statically known field of its backing
//! object, so resolution is an exhaustive `match` instead of property lookup by name.
//!
//! Rules that name an unknown source, or a path the source does not have, are kept as
//! [`PrefillRule::Unsupported`]. They round-trip unchanged and always resolve to nothing.

use serde::{Deserialize, Serialize};

macro_rules! path_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $path:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every field of this source, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire path naming this field.
            pub fn as_path(&self) -> &'static str {
                match self {
                    $($name::$variant => $path),+
                }
            }

            /// Looks a field up by its wire path.
            pub fn from_path(path: &str) -> Option<Self> {
                match path {
                    $($path => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

path_enum! {
    /// Top-level properties of an organisation (LDA).
    pub enum OrganisationField {
        Name => "name",
        About => "about",
        RegistrationStatus => "registrationStatus",
        RegistrationCode => "registrationCode",
        RegistrationDate => "registrationDate",
        FundingStart => "fundingStart",
        FundingEnd => "fundingEnd",
        TotalFunding => "totalFunding",
        AmountDisbursed => "amountDisbursed",
    }
}

path_enum! {
    /// Properties of an organisation's contact/address details.
    pub enum DetailField {
        ContactEmail => "contactEmail",
        ContactNumber => "contactNumber",
        Website => "website",
        PhysicalStreet => "physicalStreet",
        PhysicalComplexNumber => "physicalComplexNumber",
        PhysicalComplexName => "physicalComplexName",
        PhysicalCity => "physicalCity",
        PhysicalPostal => "physicalPostal",
        PhysicalProvince => "physicalProvince",
        PostalSameAsPhysical => "postalSameAsPhysical",
        PostalStreet => "postalStreet",
        PostalComplexNumber => "postalComplexNumber",
        PostalComplexName => "postalComplexName",
        PostalCity => "postalCity",
        PostalPostal => "postalPostal",
        PostalProvince => "postalProvince",
        Latitude => "latitude",
        Longitude => "longitude",
    }
}

path_enum! {
    /// Properties of an organisation's operations profile.
    pub enum OperationsField {
        Vision => "vision",
        Mission => "mission",
        MainActivities => "mainActivities",
        PrimaryActivity => "primaryActivity",
        PrimaryActivityPercentage => "primaryActivityPercentage",
        SecondaryActivity => "secondaryActivity",
        SecondaryActivityPercentage => "secondaryActivityPercentage",
        Approach => "approach",
    }
}

path_enum! {
    /// People lists derived from an organisation's staff.
    pub enum StaffList {
        StaffMembers => "organisation_staff_members",
        BoardMembers => "organisation_board_members",
    }
}

pub(crate) const SOURCE_ORGANISATION: &str = "organisation";
pub(crate) const SOURCE_ORGANISATION_DETAIL: &str = "organisation_detail";
pub(crate) const SOURCE_ORGANISATION_OPERATIONS: &str = "organisation_operations";
pub(crate) const SOURCE_ORGANISATION_STAFF: &str = "organisation_staff";
pub(crate) const SOURCE_LINKED_FORM: &str = "linkedForm";
pub(crate) const SOURCE_DEFAULT_VALUE: &str = "defaultValue";

/// Where a field's initial value comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrefillRule {
    Organisation(OrganisationField),
    OrganisationDetail(DetailField),
    Operations(OperationsField),
    Staff(StaffList),
    /// A key of the linked (parent) instance's answers.
    LinkedForm(String),
    /// A literal constant.
    DefaultValue(String),
    Unsupported { source: String, path: String },
}

impl PrefillRule {
    /// Builds a rule from its wire halves. Never fails; unknown combinations are
    /// [`PrefillRule::Unsupported`].
    pub fn from_parts(source: &str, path: &str) -> Self {
        let known = match source {
            SOURCE_ORGANISATION => OrganisationField::from_path(path).map(Self::Organisation),
            SOURCE_ORGANISATION_DETAIL => DetailField::from_path(path).map(Self::OrganisationDetail),
            SOURCE_ORGANISATION_OPERATIONS => {
                OperationsField::from_path(path).map(Self::Operations)
            }
            SOURCE_ORGANISATION_STAFF => StaffList::from_path(path).map(Self::Staff),
            SOURCE_LINKED_FORM => Some(Self::LinkedForm(path.to_owned())),
            SOURCE_DEFAULT_VALUE => Some(Self::DefaultValue(path.to_owned())),
            _ => None,
        };

        known.unwrap_or_else(|| Self::Unsupported {
            source: source.to_owned(),
            path: path.to_owned(),
        })
    }

    /// The wire `(source, path)` pair for this rule.
    pub fn to_parts(&self) -> (&str, &str) {
        match self {
            Self::Organisation(field) => (SOURCE_ORGANISATION, field.as_path()),
            Self::OrganisationDetail(field) => (SOURCE_ORGANISATION_DETAIL, field.as_path()),
            Self::Operations(field) => (SOURCE_ORGANISATION_OPERATIONS, field.as_path()),
            Self::Staff(list) => (SOURCE_ORGANISATION_STAFF, list.as_path()),
            Self::LinkedForm(path) => (SOURCE_LINKED_FORM, path),
            Self::DefaultValue(path) => (SOURCE_DEFAULT_VALUE, path),
            Self::Unsupported { source, path } => (source, path),
        }
    }
}

/// Wire representation of a prefill rule.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrefillWire {
    pub source: String,
    pub path: String,
}

impl From<PrefillWire> for PrefillRule {
    fn from(wire: PrefillWire) -> Self {
        PrefillRule::from_parts(&wire.source, &wire.path)
    }
}

impl From<&PrefillRule> for PrefillWire {
    fn from(rule: &PrefillRule) -> Self {
        let (source, path) = rule.to_parts();
        PrefillWire {
            source: source.to_owned(),
            path: path.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sources_map_to_typed_fields() {
        assert_eq!(
            PrefillRule::from_parts("organisation", "name"),
            PrefillRule::Organisation(OrganisationField::Name)
        );
        assert_eq!(
            PrefillRule::from_parts("organisation_detail", "contactEmail"),
            PrefillRule::OrganisationDetail(DetailField::ContactEmail)
        );
        assert_eq!(
            PrefillRule::from_parts("organisation_staff", "organisation_board_members"),
            PrefillRule::Staff(StaffList::BoardMembers)
        );
        assert_eq!(
            PrefillRule::from_parts("defaultValue", "N/A"),
            PrefillRule::DefaultValue("N/A".into())
        );
    }

    #[test]
    fn unknown_source_or_path_is_unsupported() {
        assert!(matches!(
            PrefillRule::from_parts("funder", "name"),
            PrefillRule::Unsupported { .. }
        ));
        assert!(matches!(
            PrefillRule::from_parts("organisation", "shoeSize"),
            PrefillRule::Unsupported { .. }
        ));
    }

    #[test]
    fn parts_survive_translation() {
        for field in OperationsField::ALL {
            let rule = PrefillRule::Operations(*field);
            let (source, path) = rule.to_parts();
            assert_eq!(PrefillRule::from_parts(source, path), rule);
        }

        let odd = PrefillRule::from_parts("funder", "name");
        assert_eq!(odd.to_parts(), ("funder", "name"));
    }
}
