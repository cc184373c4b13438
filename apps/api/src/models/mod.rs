pub mod announcement;
pub mod contract;
pub mod task;
pub mod user;
pub mod work_log;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle shared by work logs and tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Processing,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
        }
    }

    /// Human-readable label used in exports and notification mail.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Processing => "In progress",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "processing" => Ok(Status::Processing),
            "completed" => Ok(Status::Completed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}
