//! Task notification trigger.
//!
//! Task writes push a [`TaskEvent`] onto an unbounded channel; a spawned
//! worker turns each event into email. Delivery is fire-and-forget: a failed
//! recipient is logged and skipped, nothing is retried, and nothing flows
//! back to the request that caused the event.

pub mod mailer;
pub mod templates;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::task::{Task, TaskResponse};
use crate::notify::mailer::{Mailer, OutgoingEmail};
use crate::notify::templates::RenderedEmail;
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub enum TaskEvent {
    Created(Task),
    Updated { before: Task, after: Task },
}

/// Sending half handed to request handlers.
#[derive(Clone)]
pub struct TaskEvents {
    tx: UnboundedSender<TaskEvent>,
}

impl TaskEvents {
    pub fn emit(&self, event: TaskEvent) {
        if self.tx.send(event).is_err() {
            warn!("Notification worker is not running; event dropped");
        }
    }
}

pub fn channel() -> (TaskEvents, UnboundedReceiver<TaskEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskEvents { tx }, rx)
}

/// Outcome of one event, per recipient.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub delivered: Vec<Uuid>,
    /// Unknown user or no email on file.
    pub skipped: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

pub fn spawn_notifier(
    mut rx: UnboundedReceiver<TaskEvent>,
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    app_url: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let report = handle_event(store.as_ref(), mailer.as_ref(), &app_url, &event).await;
            info!(
                delivered = report.delivered.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Task notification processed"
            );
        }
        info!("Notification worker stopped");
    })
}

pub async fn handle_event(
    store: &dyn DocumentStore,
    mailer: &dyn Mailer,
    app_url: &str,
    event: &TaskEvent,
) -> DispatchReport {
    let (recipients, email) = match event {
        TaskEvent::Created(task) => {
            if task.assigned_to.is_empty() {
                debug!("Task {} has no assignees; nothing to send", task.id);
                return DispatchReport::default();
            }
            (task.assigned_to.clone(), templates::new_task(task, app_url))
        }
        TaskEvent::Updated { before, after } => {
            let Some(latest) = new_response(before, after) else {
                return DispatchReport::default();
            };
            let admin_ids: Vec<Uuid> = match store.list_admins().await {
                Ok(admins) => admins.into_iter().map(|u| u.id).collect(),
                Err(e) => {
                    error!("Could not load admins for task {}: {e}", after.id);
                    Vec::new()
                }
            };
            (
                response_recipients(&admin_ids, &after.assigned_to, latest.by),
                templates::task_response(after, latest, app_url),
            )
        }
    };

    let mut report = DispatchReport::default();
    for user_id in recipients {
        deliver(store, mailer, user_id, &email, &mut report).await;
    }
    report
}

/// The newest response, if the thread grew between `before` and `after`.
pub fn new_response<'a>(before: &Task, after: &'a Task) -> Option<&'a TaskResponse> {
    if after.responses.len() > before.responses.len() {
        after.responses.last()
    } else {
        None
    }
}

/// Admins then assignees, first occurrence wins, responder excluded.
pub fn response_recipients(admins: &[Uuid], assignees: &[Uuid], responder: Uuid) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    admins
        .iter()
        .chain(assignees.iter())
        .copied()
        .filter(|id| *id != responder && seen.insert(*id))
        .collect()
}

async fn deliver(
    store: &dyn DocumentStore,
    mailer: &dyn Mailer,
    user_id: Uuid,
    email: &RenderedEmail,
    report: &mut DispatchReport,
) {
    let user = match store.get_user(user_id).await {
        Ok(Some(user)) if !user.email.trim().is_empty() => user,
        Ok(_) => {
            debug!("No email on file for user {user_id}; skipping");
            report.skipped.push(user_id);
            return;
        }
        Err(e) => {
            error!("Could not load user {user_id}: {e}");
            report.failed.push(user_id);
            return;
        }
    };

    let outgoing = OutgoingEmail {
        to: user.email.clone(),
        subject: email.subject.clone(),
        html: email.html.clone(),
    };
    match mailer.send(&outgoing).await {
        Ok(()) => {
            info!("Notification sent to {}", user.email);
            report.delivered.push(user_id);
        }
        Err(e) => {
            error!("Notification to {} failed: {e}", user.email);
            report.failed.push(user_id);
        }
    }
}
