//! Command execution against the configured org

use std::collections::BTreeSet;

use atko_auth::{AuthError, CacheKey, OAuthFlow, ResourceKind, TokenCache, TokenLifecycleManager};
use atko_client::import::{load_groups, load_users};
use atko_client::{BulkResult, DeepSearch, ListQuery, OktaClient, PasswordMode, Resource};
use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use crate::cli::{
    AuthCommands, CacheCommands, Commands, ConfigCommands, CreateGroupArgs, CreateUserArgs,
    GroupCommands, InitArgs, SearchArgs, TargetArgs, UserCommands,
};
use crate::error::{CliError, CliResult};
use crate::filters::{
    ACTIVATABLE, DEACTIVATABLE, DELETABLE, Subject, lookup_criteria, split_values, target_criteria,
};
use crate::formatter::Formatter;
use crate::payloads::{self, Credential};
use crate::profile::{ApiMode, Profile, ProfileStore};
use crate::prompt::{Prompter, Terminal, ask_count};
use crate::reports::ReportWriter;

const DEFAULT_ORG_URL: &str = "https://example.okta.com";

/// Execute CLI commands
pub struct CommandExecutor {
    pub formatter: Formatter,
    store: ProfileStore,
    profile: String,
    verbose: u8,
    reports: ReportWriter,
    prompter: Box<dyn Prompter>,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(
        formatter: Formatter,
        store: ProfileStore,
        profile: &str,
        verbose: u8,
        reports: ReportWriter,
    ) -> Self {
        Self {
            formatter,
            store,
            profile: profile.to_lowercase(),
            verbose,
            reports,
            prompter: Box::new(Terminal),
        }
    }

    /// Answer questions with `prompter` instead of the terminal
    #[must_use]
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    /// Display an error with rich formatting
    pub fn display_error(&self, error: &CliError) {
        self.formatter.display_error(error);
    }

    /// Execute a command
    pub async fn execute(&self, command: Commands) -> CliResult<()> {
        match command {
            Commands::Config(cmd) => self.execute_config_command(cmd),
            Commands::Users(cmd) => self.execute_user_command(cmd).await,
            Commands::Groups(cmd) => self.execute_group_command(cmd).await,
            Commands::Auth(cmd) => self.execute_auth_command(cmd).await,
            Commands::Cache(cmd) => self.execute_cache_command(cmd),
        }
    }

    // Profile commands

    fn execute_config_command(&self, command: ConfigCommands) -> CliResult<()> {
        match command {
            ConfigCommands::Init(args) => self.init_profile(&args),

            ConfigCommands::List => {
                let profiles = self
                    .store
                    .load_all()?
                    .into_iter()
                    .map(|(name, profile)| (name, profile.masked()))
                    .collect();
                self.formatter.display_profiles(&profiles, self.verbose > 0)
            }

            ConfigCommands::Show => {
                let profile = self.store.load(&self.profile)?;
                self.formatter.display_settings(&profile.name, &profile.masked())
            }

            ConfigCommands::Remove => {
                self.store.remove(&self.profile)?;
                let mut cache = TokenCache::load(self.store.cache_path())?;
                cache.remove(&CacheKey {
                    profile: self.profile.clone(),
                    resource: None,
                    field: None,
                })?;
                self.formatter
                    .print_success(&format!("Profile '{}' removed", self.profile));
                Ok(())
            }
        }
    }

    fn init_profile(&self, args: &InitArgs) -> CliResult<()> {
        let mut profile = self.store.load_or_new(&self.profile)?;
        let mode = match args.api_mode {
            Some(mode) => ApiMode::from(mode),
            None => profile.api_mode()?,
        };
        for (key, value) in args.settings() {
            profile.set(key, value)?;
        }
        profile.set("api_mode", mode.as_str())?;

        if profile.get("base_url").is_none() {
            let url = self.prompter.ask("Enter Okta Org URL", Some(DEFAULT_ORG_URL))?;
            profile.set("base_url", url)?;
        }
        profile.base_url()?;

        match mode {
            ApiMode::Token => {
                if profile.get("api_token").is_none() {
                    let token = self.prompter.ask("Enter API Token", None)?;
                    if token.is_empty() {
                        return Err(CliError::InvalidArguments(
                            "an API token is required in token mode".to_string(),
                        ));
                    }
                    profile.set("api_token", token)?;
                }
            }
            ApiMode::OAuth => {
                if profile.get("oauth_flow").is_none() {
                    let flow = self.prompter.ask("Enter OAuth flow", Some("pkce"))?;
                    profile.set("oauth_flow", flow)?;
                }
                // Reject incomplete flow settings before they are saved
                profile.oauth_config()?;
            }
        }

        self.store.save(&profile)?;
        self.formatter.print_success(&format!(
            "Profile '{}' saved to {}",
            profile.name,
            self.store.dir().display()
        ));
        Ok(())
    }

    // User commands

    async fn execute_user_command(&self, command: UserCommands) -> CliResult<()> {
        let client = self.connect()?;
        let users = client.users();

        match command {
            UserCommands::Current { attr } => {
                let me = users.current(attr.as_deref()).await?;
                self.formatter.display_resources(&[me], true, None)
            }

            UserCommands::Get {
                query,
                lookup,
                listing,
                attr,
            } => {
                let found = match lookup_criteria(Subject::User, &query, &lookup)? {
                    None => vec![users.get(&query, attr.as_deref()).await?],
                    Some(criteria) => {
                        users
                            .list(
                                &list_query(&criteria.search, listing.count),
                                attr.as_deref(),
                                &DeepSearch::parse(&criteria.patterns)?,
                            )
                            .await?
                    }
                };
                self.formatter
                    .display_resources(&found, listing.all, listing.file.as_deref())
            }

            UserCommands::Find {
                search,
                listing,
                attr,
            } => {
                let found = users
                    .list(
                        &find_query(&search, listing.count),
                        attr.as_deref(),
                        &pattern_search(search.pattern.as_deref())?,
                    )
                    .await?;
                self.formatter
                    .display_resources(&found, listing.all, listing.file.as_deref())
            }

            UserCommands::Create(args) => self.create_users(&client, &args).await,

            UserCommands::Activate { query, targets } => {
                let ids = user_ids(&client, &query, &targets, ACTIVATABLE).await?;
                if !self.confirm_targets(ids.len(), "user", "activated", targets.yes)? {
                    return Ok(());
                }
                let result = users.activate_many(&ids, targets.notify).await;
                self.report("user", "activate", "activated", &result)
            }

            UserCommands::Deactivate { query, targets } => {
                let ids = user_ids(&client, &query, &targets, DEACTIVATABLE).await?;
                if !self.confirm_targets(ids.len(), "user", "deactivated", targets.yes)? {
                    return Ok(());
                }
                let result = users.deactivate_many(&ids, targets.notify).await;
                self.report("user", "deactivate", "deactivated", &result)
            }

            UserCommands::Delete { query, targets } => {
                self.delete_users(&client, &query, &targets).await
            }
        }
    }

    async fn create_users(&self, client: &OktaClient, args: &CreateUserArgs) -> CliResult<()> {
        let payloads = if let Some(file) = &args.file {
            load_users(file, &password_mode(args))?
        } else if args.multiple {
            let count = match args.count {
                Some(count) => count,
                None => ask_count(self.prompter.as_ref(), "Enter number of users", 5)?,
            };
            let domain = self.answer(args.domain.as_deref(), "Email domain", Some("example.com"))?;
            let prefix = self.answer(args.prefix.as_deref(), "Login prefix", Some("testrun_"))?;
            let credential = self.credential(args, "Default password")?;
            payloads::generated_users(count, &prefix, &domain, &credential)
        } else {
            let login = self.prompter.ask("Login", Some("testuser@example.com"))?;
            let email = self.prompter.ask("Email", Some(&login))?;
            let first_name = self.prompter.ask("First Name", None)?;
            let last_name = self.prompter.ask("Last Name", None)?;
            let credential = self.credential(args, "Password")?;
            vec![payloads::user(&login, &email, &first_name, &last_name, credential)]
        };

        if payloads.is_empty() {
            self.formatter.print_info("No users to create.");
            return Ok(());
        }
        debug!(count = payloads.len(), "creating users");
        // Imported passwords are verified on first sign-in, which needs an inactive user
        let activate = args.activate && !args.import_password;
        let result = client.users().create_many(payloads, activate).await;
        self.report("user", "create", "created", &result)
    }

    async fn delete_users(&self, client: &OktaClient, query: &str, targets: &TargetArgs) -> CliResult<()> {
        let active = user_ids(client, query, targets, DEACTIVATABLE).await?;
        let deprovisioned = user_ids(client, query, targets, DELETABLE).await?;
        let total = active.iter().chain(&deprovisioned).collect::<BTreeSet<_>>().len();
        if !self.confirm_targets(total, "user", "deleted", targets.yes)? {
            return Ok(());
        }

        let deactivated = client.users().deactivate_many(&active, false).await;
        if !deactivated.failure.is_empty() {
            self.report(
                "user",
                "delete_deactivation",
                "deactivated",
                &BulkResult {
                    success: Vec::new(),
                    ..deactivated.clone()
                },
            )?;
        }

        let mut ids: Vec<String> = deactivated
            .success
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .chain(deprovisioned)
            .collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }
        let result = client.users().delete_many(&ids, targets.notify).await;
        self.report("user", "delete", "deleted", &result)
    }

    fn credential(&self, args: &CreateUserArgs, question: &str) -> CliResult<Credential> {
        if args.no_password {
            return Ok(Credential::None);
        }
        if args.import_password {
            return Ok(Credential::ImportHook);
        }
        let password = match &args.default_password {
            Some(password) => password.clone(),
            None => self.prompter.ask(question, None)?,
        };
        Ok(if password.is_empty() {
            Credential::None
        } else {
            Credential::Password(SecretString::new(password))
        })
    }

    // Group commands

    async fn execute_group_command(&self, command: GroupCommands) -> CliResult<()> {
        let client = self.connect()?;
        let groups = client.groups();

        match command {
            GroupCommands::Get {
                query,
                lookup,
                listing,
            } => {
                let found = match lookup_criteria(Subject::Group, &query, &lookup)? {
                    None => vec![groups.get(&query).await?],
                    Some(criteria) => {
                        groups
                            .list(
                                &list_query(&criteria.search, listing.count),
                                &DeepSearch::parse(&criteria.patterns)?,
                            )
                            .await?
                    }
                };
                self.formatter
                    .display_resources(&found, listing.all, listing.file.as_deref())
            }

            GroupCommands::Find { search, listing } => {
                let found = groups
                    .list(
                        &find_query(&search, listing.count),
                        &pattern_search(search.pattern.as_deref())?,
                    )
                    .await?;
                self.formatter
                    .display_resources(&found, listing.all, listing.file.as_deref())
            }

            GroupCommands::Create(args) => self.create_groups(&client, &args).await,

            GroupCommands::Delete { query, targets } => {
                let ids = match target_criteria(Subject::Group, &query, &targets, &[])? {
                    None => Vec::new(),
                    Some(criteria) => groups
                        .list(
                            &list_query(&criteria.search, 0),
                            &DeepSearch::parse(&criteria.patterns)?,
                        )
                        .await?
                        .iter()
                        .map(|group| group.id().to_string())
                        .collect(),
                };
                if !self.confirm_targets(ids.len(), "group", "deleted", targets.yes)? {
                    return Ok(());
                }
                let result = groups.delete_many(&ids).await;
                self.report("group", "delete", "deleted", &result)
            }
        }
    }

    async fn create_groups(&self, client: &OktaClient, args: &CreateGroupArgs) -> CliResult<()> {
        let payloads = if let Some(file) = &args.file {
            load_groups(file)?
        } else if args.multiple {
            let count = match args.count {
                Some(count) => count,
                None => ask_count(self.prompter.as_ref(), "Enter number of groups", 5)?,
            };
            let prefix = self.answer(args.prefix.as_deref(), "Group name prefix", Some("testrun_"))?;
            payloads::generated_groups(count, &prefix)
        } else {
            let name = self.answer(args.name.as_deref(), "Group name", Some("testgroup"))?;
            let description = self.answer(args.description.as_deref(), "Description", Some(&name))?;
            vec![payloads::group(&name, &description)]
        };

        if payloads.is_empty() {
            self.formatter.print_info("No groups to create.");
            return Ok(());
        }
        let result = client.groups().create_many(payloads).await;
        self.report("group", "create", "created", &result)
    }

    // OAuth commands

    async fn execute_auth_command(&self, command: AuthCommands) -> CliResult<()> {
        match command {
            AuthCommands::Login {
                resource,
                no_browser,
            } => {
                let manager = self.manager(no_browser)?;
                let kind = ResourceKind::from(resource.resource);
                manager.ensure_authenticated(kind).await?;
                self.formatter.print_success(&format!(
                    "Profile '{}' holds a valid {kind} token ({} flow)",
                    manager.profile(),
                    manager.flow()
                ));
                Ok(())
            }

            AuthCommands::Url { resource } => {
                let url = self
                    .out_of_band_manager()?
                    .authorization_url(resource.resource.into())
                    .await?;
                println!("{url}");
                Ok(())
            }

            AuthCommands::Code { code, resource } => {
                let kind = ResourceKind::from(resource.resource);
                self.out_of_band_manager()?
                    .authenticate_with_code(kind, &code)
                    .await?;
                self.formatter
                    .print_success(&format!("Exchanged the authorization code for a {kind} token"));
                Ok(())
            }

            AuthCommands::Refresh { resource } => {
                let kind = ResourceKind::from(resource.resource);
                self.manager(true)?.refresh(kind).await?;
                self.formatter.print_success(&format!("Refreshed the {kind} token"));
                Ok(())
            }

            AuthCommands::Seed {
                token,
                refresh_token,
                no_verify,
                resource,
            } => {
                let kind = ResourceKind::from(resource.resource);
                self.manager(true)?
                    .seed_token(kind, &token, refresh_token.as_deref().unwrap_or_default(), !no_verify)
                    .await?;
                self.formatter.print_success(&format!("Stored the {kind} token"));
                Ok(())
            }
        }
    }

    // Cache commands

    fn execute_cache_command(&self, command: CacheCommands) -> CliResult<()> {
        let mut cache = TokenCache::load(self.store.cache_path())?;
        match command {
            CacheCommands::Show { key: None } => self.formatter.display(cache.entries()),

            CacheCommands::Show { key: Some(key) } => {
                let parsed: CacheKey = key.parse()?;
                match cache.select(&parsed) {
                    Some(Value::String(token)) => {
                        println!("{token}");
                        Ok(())
                    }
                    Some(value) => self.formatter.display(&value),
                    None => Err(CliError::Other(format!("Nothing is cached under '{key}'"))),
                }
            }

            CacheCommands::Remove { key } => {
                if cache.remove(&key.parse()?)? {
                    self.formatter.print_success(&format!("Removed '{key}' from the cache"));
                } else {
                    self.formatter
                        .print_warning(&format!("Nothing is cached under '{key}'"));
                }
                Ok(())
            }
        }
    }

    // Shared helpers

    fn connect(&self) -> CliResult<OktaClient> {
        let profile = self.store.load(&self.profile)?;
        self.store.connect(&profile, self.verbose > 0)
    }

    fn manager(&self, print_url: bool) -> CliResult<TokenLifecycleManager> {
        let profile = self.oauth_profile()?;
        self.store.manager(&profile, print_url)
    }

    /// Manager for `auth url` and `auth code`, which run as separate processes
    ///
    /// The PKCE verifier never leaves the process that built the URL, so `pkce` profiles
    /// have to complete the flow with `auth login`.
    fn out_of_band_manager(&self) -> CliResult<TokenLifecycleManager> {
        let manager = self.manager(true)?;
        if manager.flow() == OAuthFlow::Pkce {
            return Err(AuthError::Configuration(format!(
                "profile '{}' uses the pkce flow, which cannot be completed out of band; \
                 run `atko auth login` instead",
                manager.profile()
            ))
            .into());
        }
        Ok(manager)
    }

    fn oauth_profile(&self) -> CliResult<Profile> {
        let profile = self.store.load(&self.profile)?;
        if profile.api_mode()? != ApiMode::OAuth {
            return Err(CliError::InvalidArguments(format!(
                "profile '{}' uses an API token; auth commands need api_mode oauth",
                profile.name
            )));
        }
        Ok(profile)
    }

    /// `given`, or the answer to `question`
    fn answer(&self, given: Option<&str>, question: &str, default: Option<&str>) -> CliResult<String> {
        match given {
            Some(value) => Ok(value.to_string()),
            None => self.prompter.ask(question, default),
        }
    }

    /// Whether to go ahead with `count` targets
    fn confirm_targets(&self, count: usize, subject: &str, past: &str, yes: bool) -> CliResult<bool> {
        if count == 0 {
            self.formatter
                .print_info(&format!("No target {subject}(s) to be {past}."));
            return Ok(false);
        }
        if yes
            || self
                .prompter
                .confirm(&format!("{count} {subject}(s) are going to be {past}. Proceed?"))?
        {
            return Ok(true);
        }
        self.formatter.print_info("Cancelled.");
        Ok(false)
    }

    fn report(&self, subject: &str, action: &str, past: &str, result: &BulkResult) -> CliResult<()> {
        if !result.success.is_empty() {
            self.formatter.print_success(&format!(
                "{} {subject}(s) successfully {past}.",
                result.success.len()
            ));
        }
        if !result.failure.is_empty() {
            self.formatter.print_warning(&format!(
                "{} {subject}(s) could not be {past}.",
                result.failure.len()
            ));
        }
        for path in self.reports.write(subject, action, result)? {
            self.formatter
                .print_status(&format!("Saved {}", path.display()));
        }
        Ok(())
    }
}

/// Ids of the users selected by a lifecycle command
async fn user_ids(
    client: &OktaClient,
    query: &str,
    targets: &TargetArgs,
    statuses: &[&str],
) -> CliResult<Vec<String>> {
    let Some(criteria) = target_criteria(Subject::User, query, targets, statuses)? else {
        return Ok(Vec::new());
    };
    let found = client
        .users()
        .list(
            &list_query(&criteria.search, 0),
            None,
            &DeepSearch::parse(&criteria.patterns)?,
        )
        .await?;
    Ok(found.iter().map(|user| user.id().to_string()).collect())
}

fn list_query(search: &str, count: usize) -> ListQuery {
    let query = if search.is_empty() {
        ListQuery::default()
    } else {
        ListQuery::search(search)
    };
    query.with_threshold(count)
}

fn find_query(args: &SearchArgs, count: usize) -> ListQuery {
    let query = if let Some(q) = &args.query {
        ListQuery::q(q)
    } else if let Some(filter) = &args.filter {
        ListQuery::filter(filter)
    } else if let Some(search) = &args.search {
        ListQuery::search(search)
    } else {
        ListQuery::default()
    };
    query.with_threshold(count)
}

fn pattern_search(pattern: Option<&str>) -> CliResult<DeepSearch> {
    match pattern {
        Some(pattern) => Ok(DeepSearch::parse(&split_values(pattern))?),
        None => Ok(DeepSearch::default()),
    }
}

fn password_mode(args: &CreateUserArgs) -> PasswordMode {
    if args.hashed_password {
        PasswordMode::Hashed
    } else if let Some(password) = &args.default_password {
        PasswordMode::Default(SecretString::new(password.clone()))
    } else if args.no_password {
        PasswordMode::NoPassword
    } else if args.import_password {
        PasswordMode::ImportHook
    } else {
        PasswordMode::FromFile
    }
}
