use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Id of the single organization-wide contract document.
pub const MAIN_CONTRACT_ID: &str = "main";

const DEFAULT_TITLE: &str = "Employment Contract";
const DEFAULT_CONTENT: &str = "<h2>Employment Contract</h2>\
<p>1. The employee agrees to perform the duties assigned by the company in good faith.</p>\
<p>2. Working hours, leave and compensation follow the company handbook in force.</p>\
<p>3. The employee keeps company information confidential during and after employment.</p>\
<p>4. Either party may terminate this contract with notice as required by law.</p>";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Contract {
    pub id: String,
    pub title: String,
    pub content: String,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractDraft {
    pub title: String,
    pub content: String,
}

impl Contract {
    /// What a store returns before any admin has saved a contract.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            id: MAIN_CONTRACT_ID.to_string(),
            title: DEFAULT_TITLE.to_string(),
            content: DEFAULT_CONTENT.to_string(),
            version: 1,
            updated_at: now,
        }
    }

    /// Next revision of this contract: version + 1 and an `updated_at`
    /// strictly later than the current one even when the clock has not moved.
    pub fn next(&self, draft: &ContractDraft, now: DateTime<Utc>) -> Contract {
        let floor = self.updated_at + Duration::milliseconds(1);
        Contract {
            id: self.id.clone(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            version: self.version + 1,
            updated_at: now.max(floor),
        }
    }
}
