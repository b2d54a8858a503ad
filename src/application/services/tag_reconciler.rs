//! Tag reconciler (§4.4 tail)
//!
//! After a start/stop action, reconciles tag sets: remove "stop tag" keys
//! when starting (unless the key is also in "start tags"), add "start
//! tags"; symmetric on stop. Keys present in both sets are updated to the
//! value appropriate for the action just taken.

use std::collections::BTreeMap;

use crate::domain::value_objects::RequestedAction;

pub struct TagPlan {
    pub keys_to_remove: Vec<String>,
    pub tags_to_set: BTreeMap<String, String>,
}

/// `start_tags`/`stop_tags` are operator-configured tag sets applied on
/// transition into the running/stopped state respectively.
pub fn reconcile(
    action: RequestedAction,
    start_tags: &BTreeMap<String, String>,
    stop_tags: &BTreeMap<String, String>,
) -> TagPlan {
    match action {
        RequestedAction::Start | RequestedAction::Hibernate => TagPlan {
            keys_to_remove: stop_tags
                .keys()
                .filter(|k| !start_tags.contains_key(*k))
                .cloned()
                .collect(),
            tags_to_set: start_tags.clone(),
        },
        RequestedAction::Stop => TagPlan {
            keys_to_remove: start_tags
                .keys()
                .filter(|k| !stop_tags.contains_key(*k))
                .cloned()
                .collect(),
            tags_to_set: stop_tags.clone(),
        },
        RequestedAction::Configure | RequestedAction::DoNothing => TagPlan {
            keys_to_remove: Vec::new(),
            tags_to_set: BTreeMap::new(),
        },
    }
}
