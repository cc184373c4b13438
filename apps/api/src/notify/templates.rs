use chrono::{DateTime, Utc};

use crate::models::task::{Task, TaskResponse};

const WRAPPER_STYLE: &str = "font-family: Arial, sans-serif; padding: 20px;";
const CARD_STYLE: &str = "background: #f5f5f5; padding: 15px; border-radius: 8px; margin: 15px 0;";

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        escape_html(value)
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn layout(heading: &str, title: &str, rows: &[(&str, String)], app_url: &str) -> String {
    let mut html = format!("<div style=\"{WRAPPER_STYLE}\">\n");
    html.push_str(&format!("<h2 style=\"color: #1a73e8;\">{heading}</h2>\n"));
    html.push_str(&format!("<div style=\"{CARD_STYLE}\">\n"));
    html.push_str(&format!("<h3 style=\"margin: 0 0 10px 0;\">{title}</h3>\n"));
    for (label, value) in rows {
        html.push_str(&format!("<p><strong>{label}:</strong> {value}</p>\n"));
    }
    html.push_str("</div>\n");
    html.push_str(&format!(
        "<p style=\"color: #666; font-size: 12px;\">Sign in to the <a href=\"{}\">work log system</a> for details.</p>\n",
        escape_html(app_url)
    ));
    html.push_str("</div>\n");
    html
}

/// Sent to every assignee when a task is created.
pub fn new_task(task: &Task, app_url: &str) -> RenderedEmail {
    let title = or_placeholder(&task.title, "Untitled");
    let rows = [
        ("Details", or_placeholder(&task.description, "No description")),
        ("Source", or_placeholder(&task.source, "Not specified")),
        ("Created", format_time(task.created_at)),
    ];
    RenderedEmail {
        subject: format!("[New task] {}", fallback_subject(&task.title)),
        html: layout("You have a new task", &title, &rows, app_url),
    }
}

/// Sent when a response is appended to the thread.
pub fn task_response(task: &Task, response: &TaskResponse, app_url: &str) -> RenderedEmail {
    let title = or_placeholder(&task.title, "Untitled");
    let completion = task
        .completion_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Not specified".to_string());
    let rows = [
        ("Reply from", or_placeholder(&response.by_name, "Unknown")),
        ("Reply", or_placeholder(&response.content, "None")),
        ("Completion date", completion),
        ("Status", task.status.label().to_string()),
        ("Replied at", format_time(response.created_at)),
    ];
    RenderedEmail {
        subject: format!("[Task reply] {}", fallback_subject(&task.title)),
        html: layout("A task has a new reply", &title, &rows, app_url),
    }
}

fn fallback_subject(title: &str) -> &str {
    let title = title.trim();
    if title.is_empty() {
        "Task notification"
    } else {
        title
    }
}
