use chrono::{DateTime, Utc};

use crate::crd::common::Condition;

pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition status values
pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

/// Reason strings
pub const REASON_SCHEDULE_VALID: &str = "ScheduleValid";
pub const REASON_FAILED_VALIDATION: &str = "FailedValidation";
pub const REASON_BACKUP_TRIGGERED: &str = "BackupTriggered";

/// Create a new condition
pub fn new_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Condition {
    Condition {
        condition_type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(now),
    }
}

/// Set or update a condition in a conditions list.
/// If a condition with the same type exists and the status hasn't changed,
/// only the reason and message are updated (preserving lastTransitionTime).
pub fn set_condition(conditions: &mut Vec<Condition>, new_condition: Condition) {
    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.condition_type == new_condition.condition_type)
    {
        if existing.status != new_condition.status {
            *existing = new_condition;
        } else {
            existing.reason = new_condition.reason;
            existing.message = new_condition.message;
        }
    } else {
        conditions.push(new_condition);
    }
}

/// Find a condition by type
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
}

/// Create a Ready=True condition
pub fn ready(reason: &str, message: &str, now: DateTime<Utc>) -> Condition {
    new_condition(CONDITION_TYPE_READY, STATUS_TRUE, reason, message, now)
}

/// Create a Ready=False condition
pub fn not_ready(reason: &str, message: &str, now: DateTime<Utc>) -> Condition {
    new_condition(CONDITION_TYPE_READY, STATUS_FALSE, reason, message, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_set_condition_adds_new() {
        let mut conditions = vec![];
        set_condition(&mut conditions, ready("Test", "test message", now()));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].condition_type, CONDITION_TYPE_READY);
        assert_eq!(conditions[0].status, STATUS_TRUE);
    }

    #[test]
    fn test_set_condition_same_status_keeps_transition_time() {
        let mut conditions = vec![ready("OldReason", "old message", now())];
        let later = now() + Duration::hours(1);
        set_condition(&mut conditions, ready("NewReason", "new message", later));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason.as_deref(), Some("NewReason"));
        assert_eq!(conditions[0].message.as_deref(), Some("new message"));
        assert_eq!(conditions[0].last_transition_time, Some(now()));
    }

    #[test]
    fn test_set_condition_status_flip_replaces() {
        let mut conditions = vec![ready("OldReason", "old message", now())];
        let later = now() + Duration::hours(1);
        set_condition(&mut conditions, not_ready("NewReason", "new message", later));
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, STATUS_FALSE);
        assert_eq!(conditions[0].last_transition_time, Some(later));
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![not_ready(REASON_FAILED_VALIDATION, "bad cron", now())];
        let found = find_condition(&conditions, CONDITION_TYPE_READY).unwrap();
        assert_eq!(found.status, STATUS_FALSE);
        assert!(find_condition(&conditions, "NonExistent").is_none());
    }
}
