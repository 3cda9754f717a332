//! Multipart form parsing with per-route upload limits

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{parse_date, parse_flag};

const MIB: usize = 1024 * 1024;

/// Size and type limits for the files of one route
#[derive(Debug, Clone, Copy)]
pub struct UploadRules {
    pub max_file_bytes: usize,
    /// Required MIME prefix, `image/` or `video/`
    pub mime_prefix: &'static str,
}

impl UploadRules {
    /// Speakers, gallery, partners, teams
    pub const IMAGE_5MB: UploadRules = UploadRules {
        max_file_bytes: 5 * MIB,
        mime_prefix: "image/",
    };

    /// Banners, publisher logos
    pub const IMAGE_10MB: UploadRules = UploadRules {
        max_file_bytes: 10 * MIB,
        mime_prefix: "image/",
    };

    /// About-event promo video
    pub const VIDEO_50MB: UploadRules = UploadRules {
        max_file_bytes: 50 * MIB,
        mime_prefix: "video/",
    };
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files of one multipart request
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedFile>>,
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::InvalidArgument(format!("Malformed multipart body: {}", e.body_text()))
    }
}

impl Form {
    /// Read every part. File parts are checked against `rules` as they
    /// arrive.
    pub async fn parse(mut multipart: Multipart, rules: UploadRules) -> Result<Self> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let text = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, text);
                continue;
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            if !content_type.starts_with(rules.mime_prefix) {
                let kind = rules.mime_prefix.trim_end_matches('/');
                return Err(Error::InvalidArgument(format!(
                    "Only {} files are allowed!",
                    kind
                )));
            }
            let bytes = field.bytes().await.map_err(multipart_error)?;
            if bytes.len() > rules.max_file_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "File '{}' exceeds {} MiB",
                    name,
                    rules.max_file_bytes / MIB
                )));
            }
            debug!(field = %name, size = bytes.len(), content_type = %content_type, "File received");
            form.files.entry(name).or_default().push(UploadedFile {
                content_type,
                bytes: bytes.to_vec(),
            });
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.text(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::InvalidArgument(format!("{} is required", name)))
    }

    /// `Some(true)` only for `"true"`; `None` when the field is absent
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.fields.get(name).map(|v| parse_flag(v))
    }

    pub fn date(&self, name: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        match self.fields.get(name).filter(|v| !v.trim().is_empty()) {
            Some(v) => parse_date(v).map(Some),
            None => Ok(None),
        }
    }

    /// First file of a field
    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        let files = self.files.get_mut(name)?;
        if files.is_empty() {
            None
        } else {
            Some(files.remove(0))
        }
    }

    pub fn files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessors() {
        let mut form = Form::default();
        form.fields.insert("name".into(), "Ana".into());
        form.fields.insert("isActive".into(), "yes".into());
        form.fields.insert("date".into(), "2025-02-14".into());
        form.files.insert(
            "images".into(),
            vec![
                UploadedFile {
                    content_type: "image/png".into(),
                    bytes: vec![1],
                },
                UploadedFile {
                    content_type: "image/png".into(),
                    bytes: vec![2],
                },
            ],
        );

        assert_eq!(form.require("name").unwrap(), "Ana");
        assert!(form.require("note").is_err());
        assert_eq!(form.flag("isActive"), Some(false));
        assert_eq!(form.flag("missing"), None);
        assert!(form.date("date").unwrap().is_some());
        assert_eq!(form.file("images").map(|f| f.bytes), Some(vec![1]));
        assert_eq!(form.files("images").len(), 1);
        assert!(form.file("images").is_none());
    }
}
