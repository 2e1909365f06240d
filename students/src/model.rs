//! The student record in its three shapes: API input, stored record, and API output.
//!
//! The stored shape keeps `dob` as a BSON date and the timestamps as epoch
//! milliseconds. The output shape renders them as strings, matching the API schema.

use bson::DateTime;
use chrono::{NaiveDate, NaiveTime, SecondsFormat, Utc};
use itemlayer::document::Document;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::{ResolverError, ResolverResult};

pub const COLLECTION: &str = "students";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Picture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

/// `StudentInput` as sent by clients. Every field is optional.
///
/// `registered` and `modified` are accepted for schema compatibility but always
/// replaced by the resolver's clock.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentInput {
    #[serde(default)]
    pub name: Option<Name>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub picture: Option<Picture>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cell: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub gpa: Option<String>,
    #[serde(default)]
    pub registered: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub sid: Option<String>,
    #[serde(default)]
    pub modified: Option<f64>,
    #[serde(default)]
    pub modifiedby: Option<String>,
}

impl StudentInput {
    /// Builds a new record with a fresh id, registered and modified at `now`.
    pub fn into_record(self, sid: String, now: i64) -> ResolverResult<StudentRecord> {
        Ok(StudentRecord {
            sid,
            name: self.name,
            dob: self.dob.as_deref().map(parse_dob).transpose()?,
            picture: self.picture,
            location: self.location,
            phone: self.phone,
            cell: self.cell,
            email: self.email,
            major: self.major,
            gpa: self.gpa,
            registered: now,
            modified: now,
            modifiedby: self.modifiedby,
        })
    }

    /// Splits the input into the target id and the fields to overwrite.
    ///
    /// `sid` and `registered` are never part of a patch.
    pub fn into_patch(self, now: i64) -> ResolverResult<(String, StudentPatch)> {
        let sid = self
            .sid
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| ResolverError::InvalidInput("updateStudent requires input.sid".into()))?;

        Ok((sid, StudentPatch {
            name: self.name,
            dob: self.dob.as_deref().map(parse_dob).transpose()?,
            picture: self.picture,
            location: self.location,
            phone: self.phone,
            cell: self.cell,
            email: self.email,
            major: self.major,
            gpa: self.gpa,
            modified: now,
            modifiedby: self.modifiedby,
        }))
    }
}

/// A student as stored in the `students` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    pub registered: i64,
    pub modified: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifiedby: Option<String>,
}

impl Document for StudentRecord {
    fn id(&self) -> &str {
        &self.sid
    }

    fn collection_name() -> &'static str {
        COLLECTION
    }
}

/// The fields an update overwrites. Absent fields are not serialized, so the
/// stored values survive the merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    pub modified: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiedby: Option<String>,
}

/// `Student` as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub name: Option<Name>,
    pub dob: Option<String>,
    pub picture: Option<Picture>,
    pub location: Option<Location>,
    pub phone: Option<String>,
    pub cell: Option<String>,
    pub email: Option<String>,
    pub registered: Option<String>,
    pub major: Option<String>,
    pub gpa: Option<String>,
    pub sid: String,
    pub modified: Option<String>,
    pub modifiedby: Option<String>,
}

impl From<StudentRecord> for Student {
    fn from(record: StudentRecord) -> Self {
        Self {
            name: record.name,
            dob: record.dob.and_then(format_date),
            picture: record.picture,
            location: record.location,
            phone: record.phone,
            cell: record.cell,
            email: record.email,
            registered: Some(record.registered.to_string()),
            major: record.major,
            gpa: record.gpa,
            sid: record.sid,
            modified: Some(record.modified.to_string()),
            modifiedby: record.modifiedby,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteInput {
    #[serde(deserialize_with = "deserialize_id")]
    pub sid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

/// An `ID` argument: a string, or an integer literal taken as its decimal form.
struct IdLiteral(String);

impl<'de> Deserialize<'de> for IdLiteral {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl de::Visitor<'_> for IdVisitor {
            type Value = IdLiteral;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<IdLiteral, E> {
                Ok(IdLiteral(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<IdLiteral, E> {
                Ok(IdLiteral(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<IdLiteral, E> {
                Ok(IdLiteral(value.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<IdLiteral, E> {
                Ok(IdLiteral(value.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

pub fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    IdLiteral::deserialize(deserializer).map(|id| id.0)
}

pub fn deserialize_optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<IdLiteral>::deserialize(deserializer).map(|id| id.map(|id| id.0))
}

/// Normalizes a date of birth: `YYYY-MM-DD` (UTC midnight) or an RFC 3339 timestamp.
pub fn parse_dob(input: &str) -> ResolverResult<DateTime> {
    let input = input.trim();

    let millis = if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
    } else if let Ok(timestamp) = chrono::DateTime::parse_from_rfc3339(input) {
        timestamp.timestamp_millis()
    } else {
        return Err(ResolverError::InvalidInput(format!("dob {input:?} is not a date")));
    };

    Ok(DateTime::from_millis(millis))
}

fn format_date(date: DateTime) -> Option<String> {
    chrono::DateTime::<Utc>::from_timestamp_millis(date.timestamp_millis())
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}
