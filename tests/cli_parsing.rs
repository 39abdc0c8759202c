use clap::Parser;
use flagstate::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_parse_list() {
    let cli = Cli::try_parse_from(["flagstate", "list"]).unwrap();
    assert_eq!(cli.command, Commands::List);
    assert!(!cli.json);
    assert!(cli.config.is_none());
}

#[test]
fn test_parse_create_defaults_to_disabled() {
    let cli = Cli::try_parse_from(["flagstate", "create", "beta"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Create {
            name: "beta".to_string(),
            enabled: false,
        }
    );
}

#[test]
fn test_parse_create_enabled() {
    let cli = Cli::try_parse_from(["flagstate", "create", "dark-mode", "--enabled"]).unwrap();
    match cli.command {
        Commands::Create { name, enabled } => {
            assert_eq!(name, "dark-mode");
            assert!(enabled);
        }
        other => panic!("Wrong command: {other:?}"),
    }
}

#[test]
fn test_parse_update_with_explicit_state() {
    let cli =
        Cli::try_parse_from(["flagstate", "update", "3", "beta", "--enabled", "true"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Update {
            id: 3,
            name: "beta".to_string(),
            enabled: true,
        }
    );
}

#[test]
fn test_update_requires_explicit_state() {
    assert!(Cli::try_parse_from(["flagstate", "update", "3", "beta"]).is_err());
    assert!(Cli::try_parse_from(["flagstate", "update", "3", "beta", "--enabled"]).is_err());
}

#[test]
fn test_parse_delete() {
    let cli = Cli::try_parse_from(["flagstate", "delete", "42"]).unwrap();
    assert_eq!(cli.command, Commands::Delete { id: 42 });
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "flagstate",
        "list",
        "--json",
        "--config",
        "/etc/flagstate.yaml",
    ])
    .unwrap();
    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("/etc/flagstate.yaml")));
}

#[test]
fn test_rejects_non_numeric_id() {
    assert!(Cli::try_parse_from(["flagstate", "delete", "beta"]).is_err());
}

#[test]
fn test_rejects_missing_subcommand() {
    assert!(Cli::try_parse_from(["flagstate"]).is_err());
}
