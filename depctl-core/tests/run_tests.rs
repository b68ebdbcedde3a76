//! End-to-end runs of the orchestrator and snapshots against a scripted host.

use depctl_core::backends::Manager;
use depctl_core::environment::{Environment, InstallMethod, Platform};
use depctl_core::orchestrator::{run_requirements, RunSummary, Session};
use depctl_core::policy::Status;
use depctl_core::report::{load_report, Outcome};
use depctl_core::requirements::{parse_requirements, Policy, Requirement};
use depctl_core::settings::Settings;
use depctl_core::snapshot::{backup_packages, load_snapshot, restore_packages};
use depctl_core::DepctlError;
use depctl_host::{FakeHost, FakeResponse};
use std::path::Path;
use tempfile::tempdir;

const PY: &str = "/venv/bin/python";
const PIP_LIST: &[&str] = &["-m", "pip", "list", "--format=json", "--disable-pip-version-check"];
const PIP_INSTALL: &[&str] = &["-m", "pip", "install", "--disable-pip-version-check", "--no-input"];

fn settings(dir: &Path) -> Settings {
    Settings {
        pip_index_url: String::new(),
        backup_path: dir.join("packages.backup.json"),
        legacy_backup_path: dir.join("packages.backup.txt"),
        ..Settings::default()
    }
}

fn pip_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args: Vec<&str> = PIP_INSTALL.to_vec();
    args.extend_from_slice(extra);
    args
}

fn index_args(package: &str) -> Vec<&str> {
    vec![
        "-m",
        "pip",
        "index",
        "versions",
        package,
        "--disable-pip-version-check",
    ]
}

const REQUIREMENTS: &str = r#"[
    {"package": "pytest", "version": {"target": "7.4.0", "policy": "exact"}},
    {"package": "black", "version": {"target": "22.0", "policy": "min"}},
    {"package": "requests", "version": {"policy": "latest"}},
    {"package": "nope", "version": "0.0.1"}
]"#;

#[test]
fn mixed_policies_install_what_is_needed_and_record_failures() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(
            r#"[{"name": "pytest", "version": "7.3.0"}, {"name": "Black", "version": "23.1.0"}]"#,
        ),
    );
    host.respond(
        PY,
        &index_args("requests"),
        FakeResponse::ok("requests (2.31.0)\nAvailable versions: 2.31.0, 2.30.0\n"),
    );
    host.respond(
        PY,
        &pip_args(&["nope==0.0.1"]),
        FakeResponse::fail(1, "ERROR: No matching distribution found for nope==0.0.1"),
    );

    let config = dir.path().join("requirements.json");
    let output = dir.path().join("installed.json");
    let reqs = parse_requirements(REQUIREMENTS, &config).unwrap();
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        false,
    );
    let summary = run_requirements(&session, &reqs, &config, &output).unwrap();

    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());

    let lines = host.command_lines();
    assert!(lines.contains(&format!("{PY} {} --upgrade pytest==7.4.0", PIP_INSTALL.join(" "))));
    assert!(lines.contains(&format!("{PY} {} requests", PIP_INSTALL.join(" "))));
    assert!(!lines.iter().any(|l| l.ends_with("black>=22.0")));

    let report = load_report(&output).unwrap();
    let status: Vec<(&str, Status, Outcome)> = report
        .iter()
        .map(|r| (r.package.as_str(), r.status, r.outcome))
        .collect();
    assert_eq!(
        status,
        vec![
            ("pytest", Status::Upgrading, Outcome::Applied),
            ("black", Status::Matched, Outcome::Unchanged),
            ("requests", Status::Installing, Outcome::Applied),
            ("nope", Status::Installing, Outcome::Failed),
        ]
    );
    assert_eq!(report[2].latest_version.as_deref(), Some("2.31.0"));
    assert!(report[3]
        .error
        .as_deref()
        .unwrap()
        .contains("No matching distribution"));
}

#[test]
fn installed_version_is_refreshed_after_install() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(r#"[{"name": "pytest", "version": "7.3.0"}]"#),
    );
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(r#"[{"name": "pytest", "version": "7.4.0"}]"#),
    );
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        false,
    );
    let reqs =
        parse_requirements(r#"{"pytest": "7.4.0"}"#, Path::new("requirements.json")).unwrap();
    let record = session.process(&reqs[0], false);
    assert_eq!(record.status, Status::Upgrading);
    assert_eq!(record.outcome, Outcome::Applied);
    assert_eq!(record.installed_version.as_deref(), Some("7.4.0"));
}

#[test]
fn force_reinstalls_matched_packages() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(r#"[{"name": "pytest", "version": "7.4.0"}]"#),
    );
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        true,
    );
    let reqs =
        parse_requirements(r#"{"pytest": "7.4.0"}"#, Path::new("requirements.json")).unwrap();
    let record = session.process(&reqs[0], true);
    assert_eq!(record.status, Status::Matched);
    assert_eq!(record.outcome, Outcome::Applied);
    assert!(host.ran(&format!(
        "{PY} {} --force-reinstall pytest==7.4.0",
        PIP_INSTALL.join(" ")
    )));
}

#[test]
fn config_error_leaves_no_report_and_runs_nothing() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    let env = Environment {
        install_method: InstallMethod::Brew,
        brew_available: true,
        brew_prefix: Some("/opt/homebrew".into()),
        python: "/opt/homebrew/bin/python3".into(),
        platform: Platform::Macos,
    };
    let config = dir.path().join("requirements.json");
    let output = dir.path().join("installed.json");
    let reqs = parse_requirements(
        r#"[{"package": "pytest", "version": "7.4.0", "manager": "pip"}]"#,
        &config,
    )
    .unwrap();
    let session = Session::new(&host, settings(dir.path()), env, false, false);

    let err = run_requirements(&session, &reqs, &config, &output).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DepctlError>(),
        Some(DepctlError::Config { .. })
    ));
    assert!(!output.exists());
    assert!(host.commands().is_empty());
}

#[test]
fn backup_then_restore_is_a_no_op() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(
            r#"[{"name": "pytest", "version": "7.4.0"}, {"name": "six", "version": "1.16.0"}]"#,
        ),
    );
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        false,
    );

    let snapshot = backup_packages(&session).unwrap();
    assert_eq!(snapshot.packages.len(), 2);
    let written = load_snapshot(&session.settings().backup_path, InstallMethod::System).unwrap();
    assert_eq!(written, snapshot);

    host.clear();
    let records = restore_packages(&session, &session.settings().backup_path).unwrap();
    assert!(records
        .iter()
        .all(|r| r.status == Status::Matched && r.outcome == Outcome::Unchanged));
    assert!(records.iter().all(|r| r.policy == Policy::Exact));
    assert!(!host.ran(&format!("{PY} -m pip install")));
    assert!(!host.ran(&format!("{PY} -m pip index")));
}

#[test]
fn restore_downgrades_drifted_packages() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(r#"[{"name": "six", "version": "1.17.0"}]"#),
    );
    let snap = dir.path().join("snap.txt");
    std::fs::write(&snap, "six==1.16.0\n").unwrap();
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        false,
    );
    let records = restore_packages(&session, &snap).unwrap();
    assert_eq!(records[0].status, Status::Downgrading);
    assert_eq!(records[0].manager, Manager::Pip);
    assert!(host.ran(&format!("{PY} {} six==1.16.0", PIP_INSTALL.join(" "))));
}

fn brew_env() -> Environment {
    Environment {
        install_method: InstallMethod::Brew,
        brew_available: true,
        brew_prefix: Some("/opt/homebrew".into()),
        python: "/opt/homebrew/bin/python3".into(),
        platform: Platform::Macos,
    }
}

#[test]
fn restore_records_failures_and_continues() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        PY,
        PIP_LIST,
        FakeResponse::ok(
            r#"[{"name": "six", "version": "1.17.0"}, {"name": "idna", "version": "3.6"}]"#,
        ),
    );
    host.respond(
        PY,
        &pip_args(&["six==1.16.0"]),
        FakeResponse::fail(1, "ERROR: Could not install packages due to an OSError"),
    );
    let snap = dir.path().join("snap.txt");
    std::fs::write(&snap, "six==1.16.0\nidna==3.7\n").unwrap();
    let session = Session::new(
        &host,
        settings(dir.path()),
        Environment::standalone(PY),
        false,
        false,
    );

    let summary = RunSummary::new(restore_packages(&session, &snap).unwrap());
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
    assert_eq!(summary.records[0].package, "six");
    assert_eq!(summary.records[0].outcome, Outcome::Failed);
    assert!(summary.records[0]
        .error
        .as_deref()
        .unwrap()
        .contains("OSError"));
    assert_eq!(summary.records[1].package, "idna");
    assert_eq!(summary.records[1].status, Status::Upgrading);
    assert_eq!(summary.records[1].outcome, Outcome::Applied);
    assert!(host.ran(&format!("{PY} {} --upgrade idna==3.7", PIP_INSTALL.join(" "))));
}

#[test]
fn brew_exact_pin_below_stable_is_not_upgraded_past() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        "brew",
        &["info", "--json=v2", "jq"],
        FakeResponse::ok(
            r#"{"formulae": [{"name": "jq", "versions": {"stable": "1.7.1"},
                "installed": [{"version": "1.6"}], "linked_keg": "1.6"}], "casks": []}"#,
        ),
    );
    let session = Session::new(&host, settings(dir.path()), brew_env(), false, false);
    let req = Requirement::new("jq", "1.7", Policy::Exact);

    let record = session.process(&req, true);
    assert_eq!(record.status, Status::Upgrading);
    assert_eq!(record.outcome, Outcome::Failed);
    assert!(record.error.as_deref().unwrap().contains("1.7.1"));
    assert_eq!(record.installed_version.as_deref(), Some("1.6"));
    assert!(!host.ran("brew upgrade"));
    assert!(!host.ran("brew install"));
}

#[test]
fn brew_exact_pin_matching_stable_upgrades() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    host.respond(
        "brew",
        &["info", "--json=v2", "jq"],
        FakeResponse::ok(
            r#"{"formulae": [{"name": "jq", "versions": {"stable": "1.7.1"},
                "installed": [{"version": "1.6"}], "linked_keg": "1.6"}], "casks": []}"#,
        ),
    );
    let session = Session::new(&host, settings(dir.path()), brew_env(), false, false);
    let record = session.process(&Requirement::new("jq", "1.7.1", Policy::Exact), true);
    assert_eq!(record.outcome, Outcome::Applied);
    assert!(host.ran("brew upgrade jq"));
}

#[test]
fn restoring_pip_entries_into_brew_environment_is_config_error() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    let snap = dir.path().join("snap.txt");
    std::fs::write(&snap, "six==1.16.0\n").unwrap();
    let session = Session::new(&host, settings(dir.path()), brew_env(), false, false);

    let err = restore_packages(&session, &snap).unwrap_err();
    assert!(matches!(err, DepctlError::Config { .. }));
    assert!(err.to_string().contains("six"));
    assert!(host.commands().is_empty());
}

#[test]
fn brew_backup_includes_formulae() {
    let dir = tempdir().unwrap();
    let host = FakeHost::new();
    let env = brew_env();
    host.respond(
        "/opt/homebrew/bin/python3",
        PIP_LIST,
        FakeResponse::ok(r#"[{"name": "six", "version": "1.16.0"}]"#),
    );
    host.respond(
        "brew",
        &["info", "--json=v2", "--installed"],
        FakeResponse::ok(
            r#"{"formulae": [{"name": "jq", "versions": {"stable": "1.7.1"},
                "installed": [{"version": "1.7.1"}], "linked_keg": "1.7.1"}], "casks": []}"#,
        ),
    );
    let session = Session::new(&host, settings(dir.path()), env, false, false);
    let snapshot = backup_packages(&session).unwrap();
    assert_eq!(snapshot.install_method, InstallMethod::Brew);
    assert!(snapshot
        .packages
        .iter()
        .any(|e| e.package == "jq" && e.version == "1.7.1" && e.manager == Manager::Brew));
    assert!(snapshot.packages.iter().all(|e| e.manager == Manager::Brew));
    assert!(!host.ran("/opt/homebrew/bin/python3"));

    // The snapshot restores cleanly into the same environment.
    host.respond(
        "brew",
        &["info", "--json=v2", "jq"],
        FakeResponse::ok(
            r#"{"formulae": [{"name": "jq", "versions": {"stable": "1.7.1"},
                "installed": [{"version": "1.7.1"}], "linked_keg": "1.7.1"}], "casks": []}"#,
        ),
    );
    host.clear();
    let records = restore_packages(&session, &session.settings().backup_path).unwrap();
    assert!(records.iter().all(|r| r.outcome == Outcome::Unchanged));
}
