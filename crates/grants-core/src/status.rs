//! Form status registry.
//!
//! Statuses are stored and exchanged by their display label (`"Under Review"`, `"Approved"`,
//! ...). The legacy label `"Pending"` still parses, as `UnderReview`.

use crate::error::{GrantsError, RecordKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormStatus {
    Draft,
    #[serde(rename = "Under Review", alias = "Pending")]
    UnderReview,
    Paused,
    Approved,
    Rejected,
    Underway,
    Overdue,
    Upcoming,
}

impl FormStatus {
    const ALL: [FormStatus; 8] = [
        FormStatus::Draft,
        FormStatus::UnderReview,
        FormStatus::Paused,
        FormStatus::Approved,
        FormStatus::Rejected,
        FormStatus::Underway,
        FormStatus::Overdue,
        FormStatus::Upcoming,
    ];

    /// Every status, in workflow order.
    pub fn all() -> &'static [FormStatus] {
        &Self::ALL
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormStatus::Draft => "Draft",
            FormStatus::UnderReview => "Under Review",
            FormStatus::Paused => "Paused",
            FormStatus::Approved => "Approved",
            FormStatus::Rejected => "Rejected",
            FormStatus::Underway => "Underway",
            FormStatus::Overdue => "Overdue",
            FormStatus::Upcoming => "Upcoming",
        }
    }

    /// Icon name shown next to the label.
    pub fn icon(&self) -> &'static str {
        match self {
            FormStatus::Draft => "pencil",
            FormStatus::UnderReview => "hourglass",
            FormStatus::Paused => "pause",
            FormStatus::Approved => "check-circle",
            FormStatus::Rejected => "x-circle",
            FormStatus::Underway => "play",
            FormStatus::Overdue => "alert-triangle",
            FormStatus::Upcoming => "calendar",
        }
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormStatus {
    type Err = GrantsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label == "Pending" {
            return Ok(FormStatus::UnderReview);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.label() == label)
            .ok_or_else(|| GrantsError::not_found(RecordKind::FormStatus, label))
    }
}
