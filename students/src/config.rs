//! Service configuration, read from the environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `STUDENTS_STORE_URI` | MongoDB connection string; unset means in-memory | unset |
//! | `STUDENTS_DATABASE` | Database holding the `students` collection | `students` |

use std::str::FromStr;

pub const DEFAULT_DATABASE: &str = "students";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    pub store_uri: Option<String>,
    pub database: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { store_uri: None, database: DEFAULT_DATABASE.to_string() }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            store_uri: read_var::<String>(&lookup, "STUDENTS_STORE_URI"),
            database: read_var(&lookup, "STUDENTS_DATABASE").unwrap_or(defaults.database),
        }
    }
}

fn read_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
}
