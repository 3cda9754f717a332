//! Entity types
//!
//! Each entity is a [`Record`] stored in its own table, plus a `*View` type
//! shaped for JSON responses (binary media rendered as data URLs).

pub mod content;
pub mod gallery;
pub mod publisher;
pub mod user;

pub use content::{AboutEvent, Banner, Event, Speaker, TeamMember};
pub use gallery::{GalleryImage, ImageView, PartnerImage};
pub use publisher::{Book, CartOrder, Publisher};
pub use user::{Role, User};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

pub const JPEG_MIME: &str = "image/jpeg";
pub const MP4_MIME: &str = "video/mp4";

macro_rules! impl_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl crate::storage::Record for $ty {
                fn id(&self) -> u32 {
                    self.id
                }

                fn set_id(&mut self, id: u32) {
                    self.id = id;
                }
            }
        )*
    };
}

pub(crate) use impl_record;

/// `data:<mime>;base64,<payload>`
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Render optional stored bytes as a data URL
pub fn optional_data_url(mime: &str, bytes: &Option<Vec<u8>>) -> Option<String> {
    bytes.as_deref().map(|b| data_url(mime, b))
}

/// Form flags arrive as strings; only `"true"` counts as set
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::InvalidArgument(format!("Invalid date '{}'", value)))
}

/// Binary payloads stored as base64 strings in table snapshots
pub(crate) mod blob {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&BASE64.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|s| BASE64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Booth numbers arrive as either JSON strings or numbers
pub fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(d)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// `true`, `"true"` are set; anything else present is unset
pub fn optional_flag<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<bool>, D::Error> {
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(raw.map(|v| match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => parse_flag(&s),
        _ => false,
    }))
}

/// Id lists whose items may be numbers or numeric strings
pub fn optional_ids<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<Vec<u32>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(u32),
        Text(String),
    }

    let raw: Option<Vec<RawId>> = Option::deserialize(d)?;
    raw.map(|ids| {
        ids.into_iter()
            .map(|id| match id {
                RawId::Int(n) => Ok(n),
                RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            })
            .collect()
    })
    .transpose()
}
