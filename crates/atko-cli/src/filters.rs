//! Filter expressions built from command-line queries

use std::path::Path;

use crate::cli::{LookupArgs, TargetArgs};
use crate::error::{CliError, CliResult};

/// User attributes addressed without the `profile.` prefix
const CORE_ATTRIBUTES: &[&str] = &["id", "status", "type.id"];

/// Statuses `users activate` applies to
pub const ACTIVATABLE: &[&str] = &["STAGED", "PROVISIONED"];

/// Statuses `users deactivate` applies to: everything but `DEPROVISIONED`
pub const DEACTIVATABLE: &[&str] = &[
    "STAGED",
    "PROVISIONED",
    "ACTIVE",
    "RECOVERY",
    "LOCKED_OUT",
    "PASSWORD_EXPIRED",
    "SUSPENDED",
];

/// Statuses `users delete` removes without deactivating first
pub const DELETABLE: &[&str] = &["DEPROVISIONED"];

/// Comparison used when matching query values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    StartsWith,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::StartsWith => "sw",
        }
    }
}

/// Which attribute namespace a query addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    /// Users: core attributes as-is, everything else under `profile.`
    User,
    /// Groups: `id` and `type` as-is, everything else under `profile.`
    Group,
}

impl Subject {
    /// Operator for `--multiple` and `--conditions` lookups
    pub fn lookup_operator(self) -> Operator {
        match self {
            Self::User => Operator::StartsWith,
            Self::Group => Operator::Equals,
        }
    }

    /// Attribute `--multiple` matches when `--field` is not given
    pub fn default_field(self) -> &'static str {
        match self {
            Self::User => "login",
            Self::Group => "id",
        }
    }

    /// Filter attribute path for `key`
    pub fn attribute(self, key: &str) -> String {
        let core = match self {
            Self::User => CORE_ATTRIBUTES.contains(&key),
            Self::Group => matches!(key, "id" | "type"),
        };
        if core || key.starts_with("profile.") {
            key.to_string()
        } else {
            format!("profile.{key}")
        }
    }
}

/// Split `a:1,b:2` into `[(a, 1), (b, 2)]`
///
/// # Errors
///
/// [`CliError::InvalidArguments`] when a part is not a single `key:value` pair.
pub fn parse_conditions(query: &str) -> CliResult<Vec<(String, String)>> {
    query
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut pieces = part.split(':');
            match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(key), Some(value), None) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(CliError::InvalidArguments(format!(
                    "condition '{part}' must be key:value"
                ))),
            }
        })
        .collect()
}

/// Split a comma-separated value list
pub fn split_values(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// `attr op "v1" or attr op "v2" ...`
pub fn any_of(subject: Subject, field: &str, values: &[String], op: Operator) -> String {
    let attribute = subject.attribute(field);
    values
        .iter()
        .map(|v| format!("{attribute} {} {}", op.as_str(), quote(v)))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// `k1 op "v1" and k2 op "v2" ...`
pub fn all_of(subject: Subject, conditions: &[(String, String)], op: Operator) -> String {
    conditions
        .iter()
        .map(|(k, v)| format!("{} {} {}", subject.attribute(k), op.as_str(), quote(v)))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// `(status eq "A" or status eq "B")`
pub fn status_filter(statuses: &[&str]) -> String {
    let parts: Vec<String> = statuses
        .iter()
        .map(|s| format!("status eq {}", quote(s)))
        .collect();
    format!("({})", parts.join(" or "))
}

/// `criteria` restricted to `statuses`; either side may be empty
pub fn with_statuses(criteria: &str, statuses: &[&str]) -> String {
    match (criteria.is_empty(), statuses.is_empty()) {
        (_, true) => criteria.to_string(),
        (true, false) => status_filter(statuses),
        (false, false) => format!("({criteria}) and {}", status_filter(statuses)),
    }
}

/// Server-side search expression plus client-side `key:value` patterns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub search: String,
    pub patterns: Vec<String>,
}

impl Criteria {
    fn from_conditions(
        subject: Subject,
        conditions: &[(String, String)],
        pattern: bool,
        statuses: &[&str],
    ) -> Self {
        if pattern {
            Self {
                search: with_statuses("", statuses),
                patterns: conditions.iter().map(|(k, v)| format!("{k}:{v}")).collect(),
            }
        } else {
            Self {
                search: with_statuses(&all_of(subject, conditions, subject.lookup_operator()), statuses),
                patterns: Vec::new(),
            }
        }
    }
}

/// Criteria for `get`; `None` means a direct lookup by id or login
///
/// # Errors
///
/// Malformed conditions.
pub fn lookup_criteria(subject: Subject, query: &str, args: &LookupArgs) -> CliResult<Option<Criteria>> {
    if args.conditions {
        let conditions = parse_conditions(query)?;
        return Ok(Some(Criteria::from_conditions(subject, &conditions, args.pattern, &[])));
    }
    if args.multiple {
        let field = args.field.as_deref().unwrap_or(subject.default_field());
        let values = split_values(query);
        return Ok(Some(Criteria {
            search: any_of(subject, field, &values, subject.lookup_operator()),
            patterns: Vec::new(),
        }));
    }
    Ok(None)
}

/// Criteria selecting lifecycle targets restricted to `statuses`; `None` when the query names
/// nothing
///
/// # Errors
///
/// Malformed conditions, an unreadable target file or one without the `--field` column.
pub fn target_criteria(
    subject: Subject,
    query: &str,
    args: &TargetArgs,
    statuses: &[&str],
) -> CliResult<Option<Criteria>> {
    if args.conditions {
        let conditions = parse_conditions(query)?;
        if conditions.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Criteria::from_conditions(subject, &conditions, args.pattern, statuses)));
    }

    let values = if args.file {
        column_values(Path::new(query), &args.field)?
    } else {
        split_values(query)
    };
    if values.is_empty() {
        return Ok(None);
    }
    let op = if args.prefix {
        Operator::StartsWith
    } else {
        Operator::Equals
    };
    Ok(Some(Criteria {
        search: with_statuses(&any_of(subject, &args.field, &values, op), statuses),
        patterns: Vec::new(),
    }))
}

/// Non-empty values of `column` in a header-based CSV file
///
/// # Errors
///
/// I/O and CSV errors; [`CliError::InvalidArguments`] when the column is missing.
pub fn column_values(path: &Path, column: &str) -> CliResult<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            CliError::InvalidArguments(format!(
                "{} has no '{column}' column",
                path.display()
            ))
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        if let Some(value) = record?.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_prefix_for_custom_attributes() {
        assert_eq!(Subject::User.attribute("status"), "status");
        assert_eq!(Subject::User.attribute("type.id"), "type.id");
        assert_eq!(Subject::User.attribute("department"), "profile.department");
        assert_eq!(Subject::User.attribute("profile.login"), "profile.login");
        assert_eq!(Subject::Group.attribute("type"), "type");
        assert_eq!(Subject::Group.attribute("name"), "profile.name");
    }

    #[test]
    fn multiple_values_are_alternatives() {
        let values = split_values("ann, bob,");
        assert_eq!(
            any_of(Subject::User, "login", &values, Operator::StartsWith),
            r#"profile.login sw "ann" or profile.login sw "bob""#
        );
    }

    #[test]
    fn conditions_are_conjunctions() {
        let conditions = parse_conditions("status:ACTIVE,department:Sales").unwrap();
        assert_eq!(
            all_of(Subject::User, &conditions, Operator::StartsWith),
            r#"status sw "ACTIVE" and profile.department sw "Sales""#
        );
    }

    #[test]
    fn malformed_conditions() {
        assert!(parse_conditions("status").is_err());
        assert!(parse_conditions("a:b:c").is_err());
        assert!(parse_conditions(":b").is_err());
    }

    #[test]
    fn status_restriction() {
        assert_eq!(
            with_statuses(r#"id eq "00u1""#, DELETABLE),
            r#"(id eq "00u1") and (status eq "DEPROVISIONED")"#
        );
        assert_eq!(
            with_statuses("", ACTIVATABLE),
            r#"(status eq "STAGED" or status eq "PROVISIONED")"#
        );
        assert_eq!(with_statuses("x", &[]), "x");
    }

    #[test]
    fn quotes_are_escaped() {
        let values = vec![r#"O"Brien"#.to_string()];
        assert_eq!(
            any_of(Subject::User, "lastName", &values, Operator::Equals),
            r#"profile.lastName eq "O\"Brien""#
        );
    }

    #[test]
    fn lookup_modes() {
        let direct = lookup_criteria(Subject::User, "ann@acme.com", &LookupArgs::default()).unwrap();
        assert!(direct.is_none());

        let multiple = LookupArgs {
            multiple: true,
            ..LookupArgs::default()
        };
        let criteria = lookup_criteria(Subject::Group, "00g1,00g2", &multiple).unwrap().unwrap();
        assert_eq!(criteria.search, r#"id eq "00g1" or id eq "00g2""#);

        let patterns = LookupArgs {
            conditions: true,
            pattern: true,
            ..LookupArgs::default()
        };
        let criteria = lookup_criteria(Subject::User, "email:acme", &patterns).unwrap().unwrap();
        assert_eq!(criteria.search, "");
        assert_eq!(criteria.patterns, ["email:acme"]);
    }

    #[test]
    fn deactivation_targets_by_prefix() {
        let args = TargetArgs {
            field: "login".into(),
            prefix: true,
            ..TargetArgs::default()
        };
        let criteria = target_criteria(Subject::User, "test.", &args, DELETABLE).unwrap().unwrap();
        assert_eq!(
            criteria.search,
            r#"(profile.login sw "test.") and (status eq "DEPROVISIONED")"#
        );
    }

    #[test]
    fn pattern_targets_keep_the_status_restriction() {
        let args = TargetArgs {
            field: "id".into(),
            conditions: true,
            pattern: true,
            ..TargetArgs::default()
        };
        let criteria = target_criteria(Subject::User, "department:Sal", &args, ACTIVATABLE)
            .unwrap()
            .unwrap();
        assert_eq!(criteria.search, r#"(status eq "STAGED" or status eq "PROVISIONED")"#);
        assert_eq!(criteria.patterns, ["department:Sal"]);
    }

    #[test]
    fn targets_from_a_csv_column() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("targets.csv");
        std::fs::write(&file, "login,id\nann@acme.com,00u1\nbob@acme.com,\n").unwrap();

        assert_eq!(column_values(&file, "id").unwrap(), ["00u1"]);
        assert!(column_values(&file, "email").is_err());

        let args = TargetArgs {
            field: "login".into(),
            file: true,
            ..TargetArgs::default()
        };
        let query = file.to_string_lossy();
        let criteria = target_criteria(Subject::User, &query, &args, &[]).unwrap().unwrap();
        assert_eq!(
            criteria.search,
            r#"profile.login eq "ann@acme.com" or profile.login eq "bob@acme.com""#
        );
    }

    #[test]
    fn empty_queries_select_nothing() {
        let args = TargetArgs {
            field: "id".into(),
            ..TargetArgs::default()
        };
        assert!(target_criteria(Subject::User, " , ", &args, DEACTIVATABLE).unwrap().is_none());
    }
}
