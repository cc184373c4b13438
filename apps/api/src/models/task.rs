use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Status;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentFile {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    /// Inline-encoded payload (legacy uploads).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Hosted location in object storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResponse {
    pub id: Uuid,
    pub content: String,
    pub by: Uuid,
    pub by_name: String,
    pub created_at: DateTime<Utc>,
}

/// An issue assigned by an admin to one or more employees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub source: String,
    pub attachment: Option<String>,
    pub attachment_file: Option<AttachmentFile>,
    pub assigned_to: Vec<Uuid>,
    pub responses: Vec<TaskResponse>,
    pub completion_date: Option<NaiveDate>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write.
    pub revision: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    pub attachment: Option<String>,
    pub attachment_file: Option<AttachmentFile>,
    #[serde(default)]
    pub assigned_to: Vec<Uuid>,
    pub completion_date: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("a task with responses cannot return to pending")]
    PendingAfterResponse,
}

impl Task {
    /// New tasks are always `pending` with an empty response thread.
    pub fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        let mut assigned_to = Vec::with_capacity(draft.assigned_to.len());
        for id in draft.assigned_to {
            if !assigned_to.contains(&id) {
                assigned_to.push(id);
            }
        }
        Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            source: draft.source,
            attachment: draft.attachment,
            attachment_file: draft.attachment_file,
            assigned_to,
            responses: Vec::new(),
            completion_date: draft.completion_date,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }

    /// Appends to the thread.
    ///
    /// Post-conditions: the thread grew by exactly one and a `pending` task is
    /// now `processing`. `processing` and `completed` are left as they were.
    /// Returns the status before the append.
    pub fn append_response(&mut self, response: TaskResponse, now: DateTime<Utc>) -> Status {
        let previous = self.status;
        self.responses.push(response);
        if previous == Status::Pending {
            self.status = Status::Processing;
        }
        self.updated_at = now;
        previous
    }

    /// Explicit status change. Once a response exists there is no path back to `pending`.
    pub fn set_status(&mut self, target: Status, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if target == Status::Pending && !self.responses.is_empty() {
            return Err(TransitionError::PendingAfterResponse);
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}

/// Admin edit of task fields. Status and responses go through their own transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub attachment: Option<String>,
    pub attachment_file: Option<AttachmentFile>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub completion_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(source) = &self.source {
            task.source = source.clone();
        }
        if let Some(attachment) = &self.attachment {
            task.attachment = Some(attachment.clone());
        }
        if let Some(file) = &self.attachment_file {
            task.attachment_file = Some(file.clone());
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to.clear();
            for id in assigned_to {
                if !task.assigned_to.contains(id) {
                    task.assigned_to.push(*id);
                }
            }
        }
        if let Some(date) = self.completion_date {
            task.completion_date = Some(date);
        }
        task.updated_at = now;
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub source: String,
    pub attachment: Option<String>,
    pub attachment_file: Option<Json<AttachmentFile>>,
    pub assigned_to: Vec<Uuid>,
    pub responses: Json<Vec<TaskResponse>>,
    pub completion_date: Option<NaiveDate>,
    pub status: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = String;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            source: row.source,
            attachment: row.attachment,
            attachment_file: row.attachment_file.map(|f| f.0),
            assigned_to: row.assigned_to,
            responses: row.responses.0,
            completion_date: row.completion_date,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            revision: row.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_for(assignees: Vec<Uuid>) -> Task {
        Task::from_draft(
            TaskDraft {
                title: " Vendor invoice mismatch ".into(),
                description: "Check March totals".into(),
                source: "vendor".into(),
                attachment: None,
                attachment_file: None,
                assigned_to: assignees,
                completion_date: None,
            },
            Utc::now(),
        )
    }

    fn response(by: Uuid) -> TaskResponse {
        TaskResponse {
            id: Uuid::new_v4(),
            content: "On it".into(),
            by,
            by_name: "Wang".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_task_is_pending_without_responses() {
        let task = task_for(vec![Uuid::new_v4()]);
        assert_eq!(task.status, Status::Pending);
        assert!(task.responses.is_empty());
        assert_eq!(task.title, "Vendor invoice mismatch");
    }

    #[test]
    fn test_duplicate_assignees_are_collapsed() {
        let u1 = Uuid::new_v4();
        let task = task_for(vec![u1, u1]);
        assert_eq!(task.assigned_to, vec![u1]);
    }

    #[test]
    fn test_first_response_moves_pending_to_processing() {
        let u1 = Uuid::new_v4();
        let mut task = task_for(vec![u1]);
        let before = task.append_response(response(u1), Utc::now());
        assert_eq!(before, Status::Pending);
        assert_eq!(task.status, Status::Processing);
        assert_eq!(task.responses.len(), 1);
    }

    #[test]
    fn test_response_on_completed_task_keeps_status() {
        let u1 = Uuid::new_v4();
        let mut task = task_for(vec![u1]);
        task.set_status(Status::Completed, Utc::now()).unwrap();
        task.append_response(response(u1), Utc::now());
        assert_eq!(task.status, Status::Completed);
        assert_eq!(task.responses.len(), 1);
    }

    #[test]
    fn test_cannot_return_to_pending_after_response() {
        let u1 = Uuid::new_v4();
        let mut task = task_for(vec![u1]);
        task.append_response(response(u1), Utc::now());
        assert_eq!(
            task.set_status(Status::Pending, Utc::now()),
            Err(TransitionError::PendingAfterResponse)
        );
        assert_eq!(task.status, Status::Processing);
    }

    #[test]
    fn test_patch_replaces_assignees() {
        let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut task = task_for(vec![u1]);
        TaskPatch {
            assigned_to: Some(vec![u2, u2]),
            ..Default::default()
        }
        .apply(&mut task, Utc::now());
        assert_eq!(task.assigned_to, vec![u2]);
        assert_eq!(task.source, "vendor");
    }
}
