//! CLI argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "atko",
    version,
    about = "Manage Okta users and groups with API tokens or OAuth",
    long_about = "atko manages the users and groups of an Okta org.\n\
                  Profiles in ~/.atko/config.yaml select the org and the authentication mode:\n\
                  an API token, or OAuth access tokens acquired through one of the supported\n\
                  flows (password, client_credentials, pkce, authorization_code, implicit,\n\
                  manual) and cached in ~/.atko/cache.json."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Profile to use
    #[arg(
        long,
        short = 'p',
        global = true,
        env = "ATKO_PROFILE",
        default_value = "default"
    )]
    pub profile: String,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Verbose output; repeat for more (-vv). Prints requests as curl commands
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Trace logging and error log files for bulk operations
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// User operations
    #[command(subcommand)]
    Users(UserCommands),

    /// Group operations
    #[command(subcommand)]
    Groups(GroupCommands),

    /// OAuth token acquisition
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Token cache inspection
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Profile commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create or update the selected profile
    Init(InitArgs),

    /// List configured profiles (-v for details)
    List,

    /// Show the selected profile
    Show,

    /// Remove the selected profile
    Remove,
}

/// Settings accepted by `config init`
#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Okta org URL, e.g. https://acme.okta.com
    #[arg(long)]
    pub base_url: Option<String>,

    /// Authentication mode
    #[arg(long, value_enum)]
    pub api_mode: Option<ApiModeArg>,

    /// API token (token mode)
    #[arg(long)]
    pub api_token: Option<String>,

    /// OAuth flow (oauth mode)
    #[arg(long)]
    pub oauth_flow: Option<String>,

    /// Custom authorization server id
    #[arg(long)]
    pub auth_server_id: Option<String>,

    #[arg(long)]
    pub client_id: Option<String>,

    #[arg(long)]
    pub client_secret: Option<String>,

    #[arg(long)]
    pub redirect_uri: Option<String>,

    /// Username for the password flow
    #[arg(long)]
    pub userid: Option<String>,

    /// Password for the password flow
    #[arg(long)]
    pub password: Option<String>,

    /// PEM file with the client_credentials signing key
    #[arg(long)]
    pub private_key: Option<String>,

    /// RS256, RS384, RS512, ES256 or ES384
    #[arg(long)]
    pub signing_algorithm: Option<String>,

    /// Key id placed in the assertion header
    #[arg(long)]
    pub key_id: Option<String>,
}

impl InitArgs {
    /// Profile keys given on the command line, `api_mode` excluded
    pub fn settings(&self) -> Vec<(&'static str, &str)> {
        [
            ("base_url", &self.base_url),
            ("api_token", &self.api_token),
            ("oauth_flow", &self.oauth_flow),
            ("auth_server_id", &self.auth_server_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("userid", &self.userid),
            ("password", &self.password),
            ("private_key", &self.private_key),
            ("signing_algorithm", &self.signing_algorithm),
            ("key_id", &self.key_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// Authentication modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiModeArg {
    Token,
    Oauth,
}

/// User commands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Show the authenticated user
    Current {
        /// Comma-separated profile attributes to keep
        #[arg(long)]
        attr: Option<String>,
    },

    /// Get users by id or login, several values, or conditions
    Get {
        /// Id or login; a comma-separated list with --multiple; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        lookup: LookupArgs,

        #[command(flatten)]
        listing: ListingArgs,

        /// Comma-separated profile attributes to keep
        #[arg(long)]
        attr: Option<String>,
    },

    /// Find users with a query, filter or search expression
    Find {
        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        listing: ListingArgs,

        /// Comma-separated profile attributes to keep
        #[arg(long)]
        attr: Option<String>,
    },

    /// Create users from a file or from prompts
    Create(CreateUserArgs),

    /// Activate staged users
    Activate {
        /// Values of --field; a CSV file path with --file; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        targets: TargetArgs,
    },

    /// Deactivate users
    Deactivate {
        /// Values of --field; a CSV file path with --file; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        targets: TargetArgs,
    },

    /// Delete users, deactivating them first when needed
    Delete {
        /// Values of --field; a CSV file path with --file; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        targets: TargetArgs,
    },
}

/// Group commands
#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Get groups by id, several values, or conditions
    Get {
        /// Id; a comma-separated list with --multiple; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        lookup: LookupArgs,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Find groups with a query, filter or search expression
    Find {
        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Create groups from a file, flags or prompts
    Create(CreateGroupArgs),

    /// Delete groups
    Delete {
        /// Values of --field; a CSV file path with --file; key:value pairs with --conditions
        query: String,

        #[command(flatten)]
        targets: TargetArgs,
    },
}

/// How `get` interprets its query
#[derive(Args, Debug, Clone, Default)]
pub struct LookupArgs {
    /// Treat the query as a comma-separated list of --field prefixes
    #[arg(long, short = 'm', conflicts_with = "conditions")]
    pub multiple: bool,

    /// Attribute matched by --multiple (users default to login, groups to id)
    #[arg(long, requires = "multiple")]
    pub field: Option<String>,

    /// Treat the query as comma-separated key:value conditions
    #[arg(long, short = 'c')]
    pub conditions: bool,

    /// Match the conditions as regular expressions on the client instead of the server
    #[arg(long, short = 'e', requires = "conditions")]
    pub pattern: bool,
}

/// Server-side search options for `find`
#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Simple lookup on names and email
    #[arg(long, short = 'q', conflicts_with_all = ["filter", "search"])]
    pub query: Option<String>,

    /// Filter expression, e.g. status eq "ACTIVE"
    #[arg(long, short = 'f', conflicts_with = "search")]
    pub filter: Option<String>,

    /// Search expression, e.g. profile.department eq "Sales"
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Comma-separated key:value regular expressions matched on the client
    #[arg(long, short = 'e')]
    pub pattern: Option<String>,
}

/// Listing limits and output file
#[derive(Args, Debug, Clone, Default)]
pub struct ListingArgs {
    /// Maximum number of records to return (0 for no limit)
    #[arg(long, default_value_t = 0)]
    pub count: usize,

    /// Show every record in table output
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Write the output to this file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// How lifecycle commands select their targets
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Attribute the query values are matched against
    #[arg(long, default_value = "id", conflicts_with = "conditions")]
    pub field: String,

    /// Match values as prefixes instead of exact values
    #[arg(long)]
    pub prefix: bool,

    /// The query is a header-based CSV file; --field names its column
    #[arg(long, conflicts_with = "conditions")]
    pub file: bool,

    /// Treat the query as comma-separated key:value conditions
    #[arg(long, short = 'c')]
    pub conditions: bool,

    /// Match the conditions as regular expressions on the client instead of the server
    #[arg(long, short = 'e', requires = "conditions")]
    pub pattern: bool,

    /// Send notification emails
    #[arg(long)]
    pub notify: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// `users create` options
#[derive(Args, Debug, Clone, Default)]
pub struct CreateUserArgs {
    /// CSV or JSON file with the users to create
    #[arg(long, short = 'f', conflicts_with = "multiple")]
    pub file: Option<PathBuf>,

    /// Generate several users from a prefix and a domain
    #[arg(long, short = 'm')]
    pub multiple: bool,

    /// Number of users to generate
    #[arg(long, requires = "multiple")]
    pub count: Option<usize>,

    /// Login prefix of generated users
    #[arg(long, requires = "multiple")]
    pub prefix: Option<String>,

    /// Login domain of generated users
    #[arg(long, requires = "multiple")]
    pub domain: Option<String>,

    /// Password for every created user
    #[arg(long, conflicts_with_all = ["no_password", "import_password", "hashed_password"])]
    pub default_password: Option<String>,

    /// Create users without credentials
    #[arg(long, conflicts_with_all = ["import_password", "hashed_password"])]
    pub no_password: bool,

    /// Defer passwords to the password import inline hook
    #[arg(long, conflicts_with = "hashed_password")]
    pub import_password: bool,

    /// The file's password column holds BCRYPT hashes
    #[arg(long, requires = "file")]
    pub hashed_password: bool,

    /// Activate the users on creation
    #[arg(long)]
    pub activate: bool,
}

/// `groups create` options
#[derive(Args, Debug, Clone, Default)]
pub struct CreateGroupArgs {
    /// CSV or JSON file with the groups to create
    #[arg(long, short = 'f', conflicts_with_all = ["multiple", "name"])]
    pub file: Option<PathBuf>,

    /// Generate several groups from a prefix
    #[arg(long, short = 'm', conflicts_with = "name")]
    pub multiple: bool,

    /// Number of groups to generate
    #[arg(long, requires = "multiple")]
    pub count: Option<usize>,

    /// Name prefix of generated groups
    #[arg(long, requires = "multiple")]
    pub prefix: Option<String>,

    /// Group name
    #[arg(long)]
    pub name: Option<String>,

    /// Group description
    #[arg(long, requires = "name")]
    pub description: Option<String>,
}

/// OAuth commands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Obtain a valid access token, refreshing or re-authorizing as needed
    Login {
        #[command(flatten)]
        resource: ResourceArg,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Print the authorization URL of an `implicit` or `authorization_code` flow
    ///
    /// `pkce` profiles keep their code verifier in memory and must use `auth login`.
    Url {
        #[command(flatten)]
        resource: ResourceArg,
    },

    /// Exchange an authorization code obtained out of band (`authorization_code` only)
    Code {
        /// Authorization code
        code: String,

        #[command(flatten)]
        resource: ResourceArg,
    },

    /// Refresh the cached access token
    Refresh {
        #[command(flatten)]
        resource: ResourceArg,
    },

    /// Store an access token obtained elsewhere
    Seed {
        /// Access token
        token: String,

        /// Refresh token stored alongside
        #[arg(long)]
        refresh_token: Option<String>,

        /// Skip the introspection check
        #[arg(long)]
        no_verify: bool,

        #[command(flatten)]
        resource: ResourceArg,
    },
}

/// Management resource selector
#[derive(Args, Debug, Clone, Copy)]
pub struct ResourceArg {
    /// Management resource the token is for
    #[arg(long, short = 'r', value_enum, default_value = "users")]
    pub resource: ResourceChoice,
}

/// Management resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceChoice {
    Users,
    Groups,
}

impl From<ResourceChoice> for atko_auth::ResourceKind {
    fn from(choice: ResourceChoice) -> Self {
        match choice {
            ResourceChoice::Users => Self::Users,
            ResourceChoice::Groups => Self::Groups,
        }
    }
}

/// Token cache commands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cached tokens: profile[:resource[:field]]
    Show {
        /// Cache key; the whole cache when omitted
        key: Option<String>,
    },

    /// Remove cached tokens: profile[:resource[:field]]
    Remove {
        /// Cache key
        key: String,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rounded table of summary columns
    Table,
    /// Pretty JSON
    Json,
    /// YAML
    Yaml,
    /// CSV of every attribute
    Csv,
    /// Comma-separated ids
    Id,
    /// Comma-separated logins (users) or names (groups)
    Login,
}
