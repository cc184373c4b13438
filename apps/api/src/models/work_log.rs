use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Status;

/// One self-reported entry per employee per work day.
///
/// "One per day" is only a client-side convention: nothing here or in the
/// store rejects a second log for the same user and date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub task: String,
    pub response: String,
    pub supervisor_reply: Option<String>,
    pub supervisor_reply_at: Option<DateTime<Utc>>,
    pub completion_date: Option<NaiveDate>,
    pub time_spent: String,
    pub problems: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkLogDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub response: String,
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub time_spent: String,
    #[serde(default)]
    pub problems: String,
}

impl WorkLog {
    /// Every new log starts `pending`, whatever the draft says. Text fields are trimmed.
    pub fn from_draft(user_id: Uuid, draft: WorkLogDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            date: draft.date,
            task: draft.task.trim().to_string(),
            response: draft.response.trim().to_string(),
            supervisor_reply: None,
            supervisor_reply_at: None,
            completion_date: draft.completion_date,
            time_spent: draft.time_spent.trim().to_string(),
            problems: draft.problems.trim().to_string(),
            status: Status::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Admin review: sets status and/or the supervisor reply.
    /// A reply always refreshes `supervisor_reply_at`.
    pub fn review(&mut self, review: &WorkLogReview, now: DateTime<Utc>) {
        if let Some(status) = review.status {
            self.status = status;
        }
        if let Some(reply) = &review.supervisor_reply {
            self.supervisor_reply = Some(reply.clone());
            self.supervisor_reply_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Owner edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkLogPatch {
    pub date: Option<NaiveDate>,
    pub task: Option<String>,
    pub response: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub time_spent: Option<String>,
    pub problems: Option<String>,
    pub status: Option<Status>,
}

impl WorkLogPatch {
    pub fn apply(&self, log: &mut WorkLog, now: DateTime<Utc>) {
        if let Some(date) = self.date {
            log.date = date;
        }
        if let Some(task) = &self.task {
            log.task = task.trim().to_string();
        }
        if let Some(response) = &self.response {
            log.response = response.trim().to_string();
        }
        if let Some(completion_date) = self.completion_date {
            log.completion_date = Some(completion_date);
        }
        if let Some(time_spent) = &self.time_spent {
            log.time_spent = time_spent.trim().to_string();
        }
        if let Some(problems) = &self.problems {
            log.problems = problems.trim().to_string();
        }
        if let Some(status) = self.status {
            log.status = status;
        }
        log.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkLogReview {
    pub status: Option<Status>,
    pub supervisor_reply: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WorkLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub task: String,
    pub response: String,
    pub supervisor_reply: Option<String>,
    pub supervisor_reply_at: Option<DateTime<Utc>>,
    pub completion_date: Option<NaiveDate>,
    pub time_spent: String,
    pub problems: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WorkLogRow> for WorkLog {
    type Error = String;

    fn try_from(row: WorkLogRow) -> Result<Self, Self::Error> {
        Ok(WorkLog {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            task: row.task,
            response: row.response,
            supervisor_reply: row.supervisor_reply,
            supervisor_reply_at: row.supervisor_reply_at,
            completion_date: row.completion_date,
            time_spent: row.time_spent,
            problems: row.problems,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> WorkLogDraft {
        WorkLogDraft {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            task: "Fix invoice export".into(),
            response: "Done".into(),
            completion_date: None,
            time_spent: "3h".into(),
            problems: String::new(),
        }
    }

    #[test]
    fn test_new_log_starts_pending() {
        let log = WorkLog::from_draft(Uuid::new_v4(), draft(), Utc::now());
        assert_eq!(log.status, Status::Pending);
        assert!(log.supervisor_reply.is_none());
    }

    #[test]
    fn test_review_reply_stamps_time() {
        let now = Utc::now();
        let mut log = WorkLog::from_draft(Uuid::new_v4(), draft(), now);
        log.review(
            &WorkLogReview {
                status: None,
                supervisor_reply: Some("Thanks".into()),
            },
            now,
        );
        assert_eq!(log.supervisor_reply.as_deref(), Some("Thanks"));
        assert_eq!(log.supervisor_reply_at, Some(now));
        assert_eq!(log.status, Status::Pending);
    }

    #[test]
    fn test_draft_and_patch_text_is_trimmed() {
        let mut log = WorkLog::from_draft(
            Uuid::new_v4(),
            WorkLogDraft {
                task: "  Fix invoice export \n".into(),
                ..draft()
            },
            Utc::now(),
        );
        assert_eq!(log.task, "Fix invoice export");

        WorkLogPatch {
            problems: Some("  VPN down  ".into()),
            ..Default::default()
        }
        .apply(&mut log, Utc::now());
        assert_eq!(log.problems, "VPN down");
    }

    #[test]
    fn test_patch_does_not_touch_unset_fields() {
        let mut log = WorkLog::from_draft(Uuid::new_v4(), draft(), Utc::now());
        WorkLogPatch {
            status: Some(Status::Completed),
            ..Default::default()
        }
        .apply(&mut log, Utc::now());
        assert_eq!(log.status, Status::Completed);
        assert_eq!(log.task, "Fix invoice export");
        assert_eq!(log.time_spent, "3h");
    }
}
