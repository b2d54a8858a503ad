//! Desired-state triple entity module
//!
//! Return value of the desired-state evaluator (C4, §4.3): the resolved
//! schedule state, the optional target instance/resource type, and the name
//! of the active period (or a sentinel for override/none), ported from the
//! `(state, target_type, period_name)` tuple returned throughout
//! `instance_scheduler.py`'s `get_desired_state_and_type`.

use crate::domain::value_objects::ScheduleState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredStateTriple {
    pub state: ScheduleState,
    pub target_type: Option<String>,
    pub active_period_name: Option<String>,
}

impl DesiredStateTriple {
    pub fn new(
        state: ScheduleState,
        target_type: Option<String>,
        active_period_name: Option<String>,
    ) -> Self {
        Self {
            state,
            target_type,
            active_period_name,
        }
    }

    pub fn stopped() -> Self {
        Self {
            state: ScheduleState::Stopped,
            target_type: None,
            active_period_name: None,
        }
    }

    pub fn override_to(state: ScheduleState) -> Self {
        Self {
            state,
            target_type: None,
            active_period_name: Some("override".to_string()),
        }
    }
}
