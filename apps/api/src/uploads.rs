use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// Request bodies above this are rejected by the router.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Reads the `file` field of a multipart form.
pub async fn read_file_field(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(AppError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// Keeps a client-supplied file name safe for use inside an object key.
pub fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name_strips_paths() {
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\docs\\quote.pdf"), "quote.pdf");
    }

    #[test]
    fn test_safe_file_name_replaces_odd_chars() {
        assert_eq!(safe_file_name("報價 單.pdf"), "____.pdf");
        assert_eq!(safe_file_name("..."), "file");
    }
}
