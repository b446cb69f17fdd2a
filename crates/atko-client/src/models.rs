//! User and group resources
//!
//! Both wrap the JSON document returned by the API. The document is kept as-is apart from
//! hypermedia links and bookkeeping timestamps, so every attribute the org defines survives a
//! round trip to JSON or YAML output.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Common view over listed resources
pub trait Resource: Serialize {
    /// Column names of [`Resource::summary`]
    const SUMMARY_HEADERS: &'static [&'static str];

    /// The underlying JSON document
    fn data(&self) -> &Value;

    /// Okta id
    fn id(&self) -> &str {
        self.data().get("id").and_then(Value::as_str).unwrap_or_default()
    }

    /// Short tabular form
    fn summary(&self) -> Vec<String>;

    /// Profile attributes plus top-level identity fields, all as strings
    fn flatten(&self) -> BTreeMap<String, String>;
}

/// An Okta user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct User(Value);

impl User {
    /// Wrap a user document, dropping `_links`
    pub fn new(mut data: Value) -> Self {
        if let Some(object) = data.as_object_mut() {
            object.remove("_links");
        }
        Self(data)
    }

    /// Wrap a user document keeping only `id`, `status`, `profile.login` and the listed
    /// profile attributes
    ///
    /// `attr` is a comma-separated list; names the profile does not define are skipped.
    pub fn projected(data: Value, attr: &str) -> Self {
        let profile = data.get("profile").and_then(Value::as_object);
        let mut projected = Map::new();
        if let Some(login) = profile.and_then(|p| p.get("login")) {
            projected.insert("login".into(), login.clone());
        }
        for name in attr.split(',').map(str::trim) {
            if matches!(name, "" | "id" | "login" | "status") {
                continue;
            }
            if let Some(value) = profile.and_then(|p| p.get(name)) {
                projected.insert(name.to_string(), value.clone());
            }
        }

        let mut object = Map::new();
        object.insert("id".into(), data.get("id").cloned().unwrap_or(Value::Null));
        object.insert("status".into(), data.get("status").cloned().unwrap_or(Value::Null));
        object.insert("profile".into(), Value::Object(projected));
        Self(Value::Object(object))
    }

    /// [`User::projected`] when `attr` is set, [`User::new`] otherwise
    pub fn with_attr(data: Value, attr: Option<&str>) -> Self {
        match attr {
            Some(attr) => Self::projected(data, attr),
            None => Self::new(data),
        }
    }

    pub fn login(&self) -> &str {
        profile_str(&self.0, "login")
    }

    pub fn status(&self) -> &str {
        self.0.get("status").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Resource for User {
    const SUMMARY_HEADERS: &'static [&'static str] =
        &["login", "firstName", "lastName", "email", "status", "id"];

    fn data(&self) -> &Value {
        &self.0
    }

    fn summary(&self) -> Vec<String> {
        vec![
            self.login().to_string(),
            profile_str(&self.0, "firstName").to_string(),
            profile_str(&self.0, "lastName").to_string(),
            profile_str(&self.0, "email").to_string(),
            self.status().to_string(),
            self.id().to_string(),
        ]
    }

    fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = flatten_profile(&self.0);
        flat.insert("id".into(), self.id().to_string());
        flat.insert("status".into(), self.status().to_string());
        flat
    }
}

/// An Okta group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Group(Value);

impl Group {
    const DROPPED: &'static [&'static str] = &[
        "_links",
        "created",
        "lastUpdated",
        "lastMembershipUpdated",
        "objectClass",
    ];

    /// Wrap a group document, dropping links and bookkeeping timestamps
    pub fn new(mut data: Value) -> Self {
        if let Some(object) = data.as_object_mut() {
            for key in Self::DROPPED {
                object.remove(*key);
            }
        }
        Self(data)
    }

    pub fn name(&self) -> &str {
        profile_str(&self.0, "name")
    }

    /// `OKTA_GROUP`, `APP_GROUP` or `BUILT_IN`
    pub fn group_type(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Resource for Group {
    const SUMMARY_HEADERS: &'static [&'static str] = &["name", "description", "type", "id"];

    fn data(&self) -> &Value {
        &self.0
    }

    fn summary(&self) -> Vec<String> {
        vec![
            self.name().to_string(),
            profile_str(&self.0, "description").to_string(),
            self.group_type().to_string(),
            self.id().to_string(),
        ]
    }

    fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = flatten_profile(&self.0);
        flat.insert("id".into(), self.id().to_string());
        flat.insert("type".into(), self.group_type().to_string());
        flat
    }
}

fn profile_str<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get("profile")
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn flatten_profile(data: &Value) -> BTreeMap<String, String> {
    data.get("profile")
        .and_then(Value::as_object)
        .map(|profile| {
            profile
                .iter()
                .map(|(key, value)| (key.clone(), display_value(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// String form of a JSON value for tables and CSV; null is empty
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(";"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jane() -> Value {
        json!({
            "id": "00u1",
            "status": "ACTIVE",
            "created": "2024-01-01T00:00:00.000Z",
            "profile": {
                "login": "jane@example.com",
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "jane@example.com",
                "department": "R&D",
                "nickName": null,
                "emails": ["a@example.com", "b@example.com"]
            },
            "_links": {"self": {"href": "https://acme.okta.com/api/v1/users/00u1"}}
        })
    }

    #[test]
    fn user_drops_links_only() {
        let user = User::new(jane());
        assert!(user.data().get("_links").is_none());
        assert!(user.data().get("created").is_some());
        assert_eq!(
            user.summary(),
            ["jane@example.com", "Jane", "Doe", "jane@example.com", "ACTIVE", "00u1"]
        );
    }

    #[test]
    fn user_projection() {
        let user = User::projected(jane(), "department, id,missing");
        assert_eq!(
            user.into_value(),
            json!({
                "id": "00u1",
                "status": "ACTIVE",
                "profile": {"login": "jane@example.com", "department": "R&D"}
            })
        );
    }

    #[test]
    fn user_flattened_view() {
        let flat = User::new(jane()).flatten();
        assert_eq!(flat["department"], "R&D");
        assert_eq!(flat["nickName"], "");
        assert_eq!(flat["emails"], "a@example.com;b@example.com");
        assert_eq!(flat["status"], "ACTIVE");
        assert_eq!(flat["id"], "00u1");
    }

    #[test]
    fn group_drops_bookkeeping() {
        let group = Group::new(json!({
            "id": "00g1",
            "type": "OKTA_GROUP",
            "created": "2024-01-01T00:00:00.000Z",
            "lastUpdated": "2024-01-01T00:00:00.000Z",
            "lastMembershipUpdated": "2024-01-01T00:00:00.000Z",
            "objectClass": ["okta:user_group"],
            "profile": {"name": "Engineering", "description": null},
            "_links": {}
        }));
        assert_eq!(
            group.data(),
            &json!({"id": "00g1", "type": "OKTA_GROUP", "profile": {"name": "Engineering", "description": null}})
        );
        assert_eq!(group.summary(), ["Engineering", "", "OKTA_GROUP", "00g1"]);
        assert_eq!(group.flatten()["type"], "OKTA_GROUP");
    }
}
