//! Common test utilities for CLI integration tests
//!
//! A scratch `~/.atko` directory, a wiremock-backed org and scripted prompt answers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use atko_cli::cli::OutputFormat;
use atko_cli::error::{CliError, CliResult};
use atko_cli::executor::CommandExecutor;
use atko_cli::formatter::Formatter;
use atko_cli::profile::{Profile, ProfileStore};
use atko_cli::prompt::Prompter;
use atko_cli::reports::ReportWriter;
use atko_cli::{Cli, Commands};
use clap::Parser;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::{MockServer, Request};

pub const API_TOKEN: &str = "00a-test-api-token";

/// Answers questions in order; an empty answer takes the default
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    answers: Arc<Mutex<VecDeque<String>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.iter().map(|a| a.to_string()).collect())),
            asked: Arc::default(),
        }
    }

    /// Questions asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str, default: Option<&str>) -> CliResult<String> {
        self.asked.lock().unwrap().push(question.to_string());
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CliError::Cancelled)?;
        Ok(if answer.is_empty() {
            default.unwrap_or_default().to_string()
        } else {
            answer
        })
    }
}

/// Scratch profile directory, report directory and mock org
pub struct Workspace {
    pub home: TempDir,
    pub server: MockServer,
}

impl Workspace {
    pub async fn start() -> Self {
        Self {
            home: TempDir::new().expect("tempdir"),
            server: MockServer::start().await,
        }
    }

    /// Store over the scratch directory, isolated from the process environment
    pub fn store(&self) -> ProfileStore {
        ProfileStore::at(self.home.path().join(".atko")).with_env(config::Map::new())
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.home.path().to_path_buf()
    }

    /// Save a token-mode `default` profile pointing at the mock org
    pub fn configure_token_profile(&self) {
        let mut profile = Profile::new("default");
        profile.set("base_url", self.server.uri()).unwrap();
        profile.set("api_token", API_TOKEN).unwrap();
        self.store().save(&profile).unwrap();
    }

    pub fn executor(&self, format: OutputFormat, prompter: ScriptedPrompter) -> CommandExecutor {
        CommandExecutor::new(
            Formatter::new(format, false),
            self.store(),
            "default",
            0,
            ReportWriter::new(self.reports_dir(), true),
        )
        .with_prompter(prompter)
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Report files whose name starts with `prefix`
    pub fn reports(&self, prefix: &str) -> Vec<Value> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(self.reports_dir()).unwrap() {
            let path = entry.unwrap().path();
            let is_match = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix));
            if is_match {
                let text = std::fs::read_to_string(&path).unwrap();
                found.push(serde_json::from_str(&text).unwrap());
            }
        }
        found
    }
}

/// Parse a command line the way the binary does
pub fn command(args: &[&str]) -> Commands {
    let argv = std::iter::once("atko").chain(args.iter().copied());
    Cli::try_parse_from(argv).expect("valid command line").command
}

pub fn user(id: &str, login: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "profile": {
            "login": login,
            "email": login,
            "firstName": login.split('@').next().unwrap_or_default(),
            "lastName": "Tester"
        },
        "_links": {}
    })
}

pub fn group(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "type": "OKTA_GROUP",
        "profile": {"name": name, "description": name},
        "_links": {}
    })
}

pub fn service_error(code: &str, summary: &str) -> Value {
    json!({
        "errorCode": code,
        "errorSummary": summary,
        "errorLink": code,
        "errorId": "oae1",
        "errorCauses": []
    })
}

/// Matches list requests whose `search` parameter contains `needle`
pub fn search_contains(needle: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        request
            .url
            .query_pairs()
            .any(|(key, value)| key == "search" && value.contains(needle))
    }
}
