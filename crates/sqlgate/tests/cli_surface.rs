use std::path::Path;

use clap::Parser;
use sqlgate::cli::app::{Cli, Command};

#[test]
fn parses_global_runtime_flags_for_query() {
    let cli = Cli::parse_from([
        "sqlgate",
        "--db",
        "/srv/leads.db",
        "--policy",
        "policy.json",
        "--cache-ttl-secs",
        "60",
        "--cwd",
        "/work/bot",
        "query",
        "SELECT id FROM leads WHERE project_code = ?",
        "--params",
        "[\"[LR166]\"]",
        "--row-cap",
        "50",
    ]);

    assert_eq!(cli.runtime.db_path.as_deref(), Some(Path::new("/srv/leads.db")));
    assert_eq!(cli.runtime.policy_path.as_deref(), Some(Path::new("policy.json")));
    assert_eq!(cli.runtime.cache_ttl_secs, Some(60));
    assert_eq!(cli.runtime.cwd.as_deref(), Some(Path::new("/work/bot")));

    let overrides = cli.runtime.overrides();
    assert_eq!(overrides.cache_ttl_secs, Some(60));

    match cli.command {
        Command::Query(args) => {
            assert_eq!(args.sql, "SELECT id FROM leads WHERE project_code = ?");
            assert_eq!(args.params.as_deref(), Some("[\"[LR166]\"]"));
            assert_eq!(args.row_cap, 50);
        }
        other => panic!("expected query command, got {other:?}"),
    }
}

#[test]
fn global_flags_are_accepted_after_the_subcommand() {
    let cli = Cli::parse_from(["sqlgate", "check", "SELECT 1", "--db", "leads.db"]);
    assert_eq!(cli.runtime.db_path.as_deref(), Some(Path::new("leads.db")));
    assert_eq!(cli.command.name(), "check");
}

#[test]
fn query_defaults_row_cap() {
    let cli = Cli::parse_from(["sqlgate", "query", "SELECT id FROM leads"]);
    match cli.command {
        Command::Query(args) => {
            assert_eq!(args.row_cap, 1_000);
            assert!(args.params.is_none());
        }
        other => panic!("expected query command, got {other:?}"),
    }
}

#[test]
fn parses_resolver_commands() {
    match Cli::parse_from(["sqlgate", "resolve", "leads for lake residence"]).command {
        Command::Resolve(args) => assert_eq!(args.text, "leads for lake residence"),
        other => panic!("expected resolve command, got {other:?}"),
    }
    match Cli::parse_from(["sqlgate", "tag", "LR166"]).command {
        Command::Tag(args) => assert_eq!(args.code, "LR166"),
        other => panic!("expected tag command, got {other:?}"),
    }
    match Cli::parse_from(["sqlgate", "mapping"]).command {
        Command::Mapping(args) => assert_eq!(args.max_items, 200),
        other => panic!("expected mapping command, got {other:?}"),
    }
    match Cli::parse_from(["sqlgate", "policy", "--schema"]).command {
        Command::Policy(args) => assert!(args.schema),
        other => panic!("expected policy command, got {other:?}"),
    }
}

#[test]
fn missing_sql_is_a_usage_error() {
    let error = Cli::try_parse_from(["sqlgate", "check"]).expect_err("sql is required");
    assert_eq!(
        error.kind(),
        clap::error::ErrorKind::MissingRequiredArgument
    );
}
