//! Status transitions.
//!
//! Planning a status change is pure: given the parent instance, the new status and (when the
//! parent's template declares a linked template) the current linked child, it returns the
//! records to write. Writing them, in order and under the per-parent lock, is the service's
//! job.
//!
//! | New status | No child                    | Child exists     |
//! |------------|-----------------------------|------------------|
//! | Approved   | create a `Draft` child      | child → `Draft`  |
//! | Rejected   | nothing                     | child → `Rejected` |
//! | other      | nothing                     | child → `Paused` |

use crate::config::ApprovalHistoryPolicy;
use crate::instance::{default_title, FormInstance};
use crate::status::FormStatus;
use chrono::{DateTime, Utc};
use forms::{FormData, FormTemplate};

/// The linked side of a transition: the template children are made from, and the parent's
/// current child if it has one.
#[derive(Clone, Copy, Debug)]
pub struct LinkedState<'a> {
    pub template: &'a FormTemplate,
    pub child: Option<&'a FormInstance>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildAction {
    /// No linked template, or nothing to do for this status.
    None,
    /// A new child to store.
    Create(FormInstance),
    /// The existing child with its status changed.
    Update(FormInstance),
    /// The existing child already has the target status.
    Unchanged(FormInstance),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransitionPlan {
    pub parent: FormInstance,
    pub child: ChildAction,
}

/// Status a linked child takes when its parent moves to `parent_status`.
pub fn child_status_for(parent_status: FormStatus) -> FormStatus {
    match parent_status {
        FormStatus::Approved => FormStatus::Draft,
        FormStatus::Rejected => FormStatus::Rejected,
        _ => FormStatus::Paused,
    }
}

/// Plans moving `parent` to `new_status`.
///
/// Re-applying a status is safe: an existing child is never duplicated, only re-statused.
pub fn plan_status_change(
    parent: &FormInstance,
    new_status: FormStatus,
    linked: Option<LinkedState<'_>>,
    acting_user_id: &str,
    now: DateTime<Utc>,
    approval_history: ApprovalHistoryPolicy,
) -> TransitionPlan {
    let mut updated = parent.clone();
    updated.form_status = new_status;
    updated.updated_at = now;

    match new_status {
        FormStatus::Approved => updated.approved = Some(now),
        FormStatus::Draft => updated.submitted = None,
        _ => {}
    }
    if new_status != FormStatus::Approved && approval_history == ApprovalHistoryPolicy::ClearOnLeave
    {
        updated.approved = None;
    }

    let child = match linked {
        None => ChildAction::None,
        Some(LinkedState {
            child: Some(existing),
            ..
        }) => {
            let target = child_status_for(new_status);
            if existing.form_status == target {
                ChildAction::Unchanged(existing.clone())
            } else {
                let mut child = existing.clone();
                child.form_status = target;
                child.updated_at = now;
                ChildAction::Update(child)
            }
        }
        Some(LinkedState {
            template,
            child: None,
        }) if new_status == FormStatus::Approved => {
            ChildAction::Create(new_child(parent, template, acting_user_id, now))
        }
        Some(_) => ChildAction::None,
    };

    TransitionPlan {
        parent: updated,
        child,
    }
}

fn new_child(
    parent: &FormInstance,
    template: &FormTemplate,
    acting_user_id: &str,
    now: DateTime<Utc>,
) -> FormInstance {
    let mut child = FormInstance::draft(
        default_title(&template.name, now),
        template.id,
        parent.local_development_agency_id,
        acting_user_id.to_owned(),
        now,
    );
    child.form_data = FormData::new();
    child.linked_form_id = Some(parent.id);
    child.due_date = parent.due_date;
    child.funding_start = parent.funding_start;
    child.funding_end = parent.funding_end;
    child
}
