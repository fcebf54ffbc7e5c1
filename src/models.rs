use super::schema::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One saved bookmark, as stored in the JSON list under the entries key.
///
/// Field names follow the camelCase layout of the browser app, so lists it
/// wrote can be read back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub text: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    pub created_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
}

/// The browser app treats a `null` category like a missing one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Entry {
    /// Title if one was fetched, empty otherwise.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn favicon_url(&self) -> &str {
        self.favicon_url.as_deref().unwrap_or("")
    }
}

#[derive(Queryable)]
pub struct StoredValue {
    pub key: String,
    pub value: String,
    pub revision: i64,
}

#[derive(Insertable)]
#[table_name = "local_storage"]
pub struct StoredValueToInsert<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub revision: i64,
}

#[derive(Identifiable, Queryable, Debug, Clone, PartialEq)]
#[table_name = "account"]
pub struct Account {
    pub id: i32,
    pub clerk_id: String,
    pub email: String,
    pub username: Option<String>,
    pub photo: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub created: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[table_name = "account"]
pub struct AccountToInsert<'a> {
    pub clerk_id: &'a str,
    pub email: &'a str,
    pub username: Option<&'a str>,
    pub photo: &'a str,
    pub firstname: Option<&'a str>,
    pub lastname: Option<&'a str>,
}
