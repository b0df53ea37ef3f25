//! Organisation (local development agency) records.
//!
//! Only the parts of an organisation that prefill rules can read are modelled here. Each
//! backing object exposes a `field` accessor keyed by the typed path enums from
//! [`forms::prefill`], returning the property's string form when it is present.

use chrono::NaiveDate;
use forms::{DetailField, OperationsField, OrganisationField, PersonEntry, StaffList};
use grants_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organisation {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub registration_status: Option<String>,
    #[serde(default)]
    pub registration_code: Option<String>,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub funding_start: Option<NaiveDate>,
    #[serde(default)]
    pub funding_end: Option<NaiveDate>,
    #[serde(default)]
    pub total_funding: Option<f64>,
    #[serde(default)]
    pub amount_disbursed: Option<f64>,
    #[serde(default)]
    pub organisation_detail: Option<OrganisationDetail>,
    #[serde(default)]
    pub operations: Option<Operations>,
    #[serde(default)]
    pub staff_members: Vec<StaffMember>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrganisationDetail {
    pub contact_email: Option<String>,
    pub contact_number: Option<String>,
    pub website: Option<String>,
    pub physical_street: Option<String>,
    pub physical_complex_number: Option<String>,
    pub physical_complex_name: Option<String>,
    pub physical_city: Option<String>,
    pub physical_postal: Option<String>,
    pub physical_province: Option<String>,
    pub postal_same_as_physical: Option<bool>,
    pub postal_street: Option<String>,
    pub postal_complex_number: Option<String>,
    pub postal_complex_name: Option<String>,
    pub postal_city: Option<String>,
    pub postal_postal: Option<String>,
    pub postal_province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operations {
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub main_activities: Option<String>,
    pub primary_activity: Option<String>,
    pub primary_activity_percentage: Option<f64>,
    pub secondary_activity: Option<String>,
    pub secondary_activity_percentage: Option<f64>,
    pub approach: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    #[serde(default)]
    pub position: Option<String>,
    /// Board/committee members are listed separately from staff.
    #[serde(default)]
    pub is_committee: bool,
}

fn text(value: &Option<String>) -> Option<String> {
    value.clone()
}

fn number(value: Option<f64>) -> Option<String> {
    value.map(|n| n.to_string())
}

fn date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

impl Organisation {
    pub fn field(&self, field: OrganisationField) -> Option<String> {
        match field {
            OrganisationField::Name => Some(self.name.clone()),
            OrganisationField::About => text(&self.about),
            OrganisationField::RegistrationStatus => text(&self.registration_status),
            OrganisationField::RegistrationCode => text(&self.registration_code),
            OrganisationField::RegistrationDate => date(self.registration_date),
            OrganisationField::FundingStart => date(self.funding_start),
            OrganisationField::FundingEnd => date(self.funding_end),
            OrganisationField::TotalFunding => number(self.total_funding),
            OrganisationField::AmountDisbursed => number(self.amount_disbursed),
        }
    }

    /// Staff or board members as prefill rows.
    ///
    /// Staff rows carry their position; board rows do not.
    pub fn people(&self, list: StaffList) -> Vec<PersonEntry> {
        let board = matches!(list, StaffList::BoardMembers);
        self.staff_members
            .iter()
            .filter(|member| member.is_committee == board)
            .map(|member| PersonEntry {
                name: format!("{} {}", member.first_name, member.last_name),
                gender: member.gender.clone(),
                position: if board {
                    None
                } else {
                    member.position.clone()
                },
            })
            .collect()
    }
}

impl OrganisationDetail {
    pub fn field(&self, field: DetailField) -> Option<String> {
        match field {
            DetailField::ContactEmail => text(&self.contact_email),
            DetailField::ContactNumber => text(&self.contact_number),
            DetailField::Website => text(&self.website),
            DetailField::PhysicalStreet => text(&self.physical_street),
            DetailField::PhysicalComplexNumber => text(&self.physical_complex_number),
            DetailField::PhysicalComplexName => text(&self.physical_complex_name),
            DetailField::PhysicalCity => text(&self.physical_city),
            DetailField::PhysicalPostal => text(&self.physical_postal),
            DetailField::PhysicalProvince => text(&self.physical_province),
            DetailField::PostalSameAsPhysical => self.postal_same_as_physical.map(|b| b.to_string()),
            DetailField::PostalStreet => text(&self.postal_street),
            DetailField::PostalComplexNumber => text(&self.postal_complex_number),
            DetailField::PostalComplexName => text(&self.postal_complex_name),
            DetailField::PostalCity => text(&self.postal_city),
            DetailField::PostalPostal => text(&self.postal_postal),
            DetailField::PostalProvince => text(&self.postal_province),
            DetailField::Latitude => number(self.latitude),
            DetailField::Longitude => number(self.longitude),
        }
    }
}

impl Operations {
    pub fn field(&self, field: OperationsField) -> Option<String> {
        match field {
            OperationsField::Vision => text(&self.vision),
            OperationsField::Mission => text(&self.mission),
            OperationsField::MainActivities => text(&self.main_activities),
            OperationsField::PrimaryActivity => text(&self.primary_activity),
            OperationsField::PrimaryActivityPercentage => number(self.primary_activity_percentage),
            OperationsField::SecondaryActivity => text(&self.secondary_activity),
            OperationsField::SecondaryActivityPercentage => {
                number(self.secondary_activity_percentage)
            }
            OperationsField::Approach => text(&self.approach),
        }
    }
}
