//! Create payloads for users and groups entered on the command line

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

/// Credentials attached to created users
#[derive(Debug, Clone)]
pub enum Credential {
    Password(SecretString),
    ImportHook,
    None,
}

impl Credential {
    fn into_json(self) -> Option<Value> {
        match self {
            Self::Password(password) => {
                Some(json!({"password": {"value": password.expose_secret()}}))
            }
            Self::ImportHook => Some(json!({"password": {"hook": {"type": "default"}}})),
            Self::None => None,
        }
    }
}

/// New user document
pub fn user(login: &str, email: &str, first_name: &str, last_name: &str, credential: Credential) -> Value {
    let mut payload = json!({
        "profile": {
            "firstName": first_name,
            "lastName": last_name,
            "email": email,
            "login": login,
        }
    });
    if let Some(credentials) = credential.into_json() {
        payload["credentials"] = credentials;
    }
    payload
}

/// `count` users `<prefix>user<n>@<domain>`, numbered from 1
pub fn generated_users(count: usize, prefix: &str, domain: &str, credential: &Credential) -> Vec<Value> {
    (1..=count)
        .map(|n| {
            let name = format!("{prefix}user{n}");
            let login = format!("{name}@{domain}");
            user(&login, &login, &name, "atkogen", credential.clone())
        })
        .collect()
}

/// New group document
pub fn group(name: &str, description: &str) -> Value {
    json!({"profile": {"name": name, "description": description}})
}

/// `count` groups `<prefix>group_<n>`, numbered from 1
pub fn generated_groups(count: usize, prefix: &str) -> Vec<Value> {
    (1..=count)
        .map(|n| {
            let name = format!("{prefix}group_{n}");
            group(&name, &name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_logins() {
        let users = generated_users(2, "run_", "acme.com", &Credential::None);
        assert_eq!(users.len(), 2);
        assert_eq!(users[1]["profile"]["login"], "run_user2@acme.com");
        assert_eq!(users[1]["profile"]["firstName"], "run_user2");
        assert!(users[0].get("credentials").is_none());
    }

    #[test]
    fn credentials_by_kind() {
        let with_password = user(
            "a@acme.com",
            "a@acme.com",
            "A",
            "B",
            Credential::Password(SecretString::new("Secret1!".into())),
        );
        assert_eq!(with_password["credentials"]["password"]["value"], "Secret1!");

        let hooked = user("a@acme.com", "a@acme.com", "A", "B", Credential::ImportHook);
        assert_eq!(hooked["credentials"], json!({"password": {"hook": {"type": "default"}}}));
    }

    #[test]
    fn generated_group_names() {
        assert_eq!(
            generated_groups(1, "run_"),
            vec![json!({"profile": {"name": "run_group_1", "description": "run_group_1"}})]
        );
    }
}
