use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use chefsync_core::{config, SyncConfig};
use tempfile::TempDir;

struct Fixture {
    home: TempDir,
    repo: TempDir,
    server: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            home: TempDir::new().expect("home"),
            repo: TempDir::new().expect("repo"),
            server: TempDir::new().expect("server"),
        };
        let repo = fixture.repo.path();
        write(repo, "vendor/apt/metadata.rb", "name 'apt'");
        write(repo, "vendor/apt/recipes/default.rb", "execute 'apt-get update'");
        write(repo, "vendor/nginx/metadata.rb", "name 'nginx'");
        write(repo, "data_bags/users/alice.json", r#"{"id":"alice"}"#);
        write(repo, "roles/web.json", r#"{"name":"web"}"#);

        let mut cfg = SyncConfig::new(
            "https://chef01.example.com/organizations/ops",
            repo.join("vendor"),
            fixture.server.path().to_path_buf(),
        );
        cfg.lockfile = fixture.home.path().join("sync.lock");
        cfg.node_name = Some("jenkins".to_string());
        cfg.origin_timeout_secs = 1;
        cfg.lock_warning_delay_secs = 0;
        config::save_at(fixture.home.path(), &cfg).expect("save config");
        fixture
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chefsync"));
        cmd.env("HOME", self.home.path())
            .env("USERPROFILE", self.home.path())
            .env("NO_COLOR", "1")
            .current_dir(self.repo.path());
        cmd
    }

    fn server_cookbooks(&self) -> Vec<String> {
        let dir = self.server.path().join("cookbooks");
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

/// Commit the whole repo onto `master` and check it out.
fn commit_all(repo: &Path) -> String {
    let git = git2::Repository::init(repo).expect("git init");
    let sig = git2::Signature::now("test", "test@example.com").expect("sig");
    let mut index = git.index().expect("index");
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .expect("add");
    let tree_id = index.write_tree().expect("tree");
    let tree = git.find_tree(tree_id).expect("find tree");
    let oid = git
        .commit(Some("refs/heads/master"), &sig, &sig, "vendor cookbooks", &tree, &[])
        .expect("commit");
    git.set_head("refs/heads/master").expect("checkout master");
    oid.to_string()
}

/// Add an empty commit on a new `feature` branch and check it out.
fn checkout_feature_branch(repo: &Path) -> String {
    let git = git2::Repository::open(repo).expect("git open");
    let sig = git2::Signature::now("test", "test@example.com").expect("sig");
    let parent = git
        .head()
        .expect("head")
        .peel_to_commit()
        .expect("head commit");
    let tree = parent.tree().expect("tree");
    let oid = git
        .commit(Some("refs/heads/feature"), &sig, &sig, "wip", &tree, &[&parent])
        .expect("commit");
    git.set_head("refs/heads/feature").expect("checkout feature");
    oid.to_string()
}

#[test]
fn why_run_reports_plan_and_leaves_server_untouched() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["sync", "--why-run", "--yes"])
        .assert()
        .success()
        .stdout(contains("Would perform pre-sync checks"))
        .stdout(contains("Would Upload all cookbooks"))
        .stdout(contains("[why-run]"));

    assert!(fixture.server_cookbooks().is_empty());
    assert!(!fixture.server.path().join("data_bags").exists());
    assert!(!fixture.home.path().join("sync.lock").exists());
}

#[test]
fn sync_populates_server_and_releases_lock() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["sync", "--yes"])
        .assert()
        .success()
        .stdout(contains("2 added"));

    assert_eq!(fixture.server_cookbooks(), vec!["apt", "nginx"]);
    assert!(fixture
        .server
        .path()
        .join("data_bags/users/alice.json")
        .exists());
    assert!(fixture.server.path().join("roles/web.json").exists());
    assert!(!fixture.home.path().join("sync.lock").exists());

    fixture
        .cmd()
        .args(["sync", "--yes"])
        .assert()
        .success()
        .stdout(contains("already in sync"));
}

#[test]
fn sync_records_commit_shown_by_status() {
    let fixture = Fixture::new();
    let head = commit_all(fixture.repo.path());

    fixture.cmd().args(["sync", "--yes"]).assert().success();

    let assert = fixture.cmd().args(["status", "--json"]).assert().success();
    let status: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("status json");
    assert_eq!(status["last_synced_commit"], serde_json::json!(head));
    assert!(status["lock"].is_null());
}

#[test]
fn commit_marker_tracks_the_standard_branch() {
    let fixture = Fixture::new();
    let master = commit_all(fixture.repo.path());
    let feature = checkout_feature_branch(fixture.repo.path());
    assert_ne!(master, feature);

    fixture.cmd().args(["sync", "--yes"]).assert().success();

    let assert = fixture.cmd().args(["status", "--json"]).assert().success();
    let status: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("status json");
    assert_eq!(status["last_synced_commit"], serde_json::json!(master));
}

#[test]
fn failed_sync_warns_exits_non_zero_and_releases_lock() {
    let fixture = Fixture::new();
    write(
        fixture.server.path(),
        "cookbooks/broken/manifest.json",
        "{ not json",
    );

    fixture
        .cmd()
        .args(["sync", "--yes", "--force-lock"])
        .assert()
        .failure()
        .stdout(contains("lock obtained"))
        .stdout(contains("removing lockfile"))
        .stderr(contains("WARNING: sync failed"))
        .stderr(contains("broken"));

    assert!(!fixture.home.path().join("sync.lock").exists());
    assert_eq!(fixture.server_cookbooks(), vec!["broken"]);
}

#[test]
fn forced_lock_is_held_during_sync_and_released_after() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["sync", "--yes", "--force-lock"])
        .assert()
        .success()
        .stdout(contains("lock obtained"))
        .stdout(contains("removing lockfile"));

    assert!(!fixture.home.path().join("sync.lock").exists());
    assert_eq!(fixture.server_cookbooks(), vec!["apt", "nginx"]);
}

#[test]
fn status_shows_current_lock_holder() {
    let fixture = Fixture::new();
    let ts = chrono::Utc::now().timestamp() - 30;
    fs::write(
        fixture.home.path().join("sync.lock"),
        format!(r#"{{"user":"alice","ts":{ts}}}"#),
    )
    .expect("lockfile");

    let assert = fixture.cmd().args(["status", "--json"]).assert().success();
    let status: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("status json");
    assert_eq!(status["lock"]["user"], "alice");
    assert!(status["lock"]["held_for_secs"].as_u64().expect("secs") >= 30);
    assert!(status["last_synced_commit"].is_null());
}

#[test]
fn diff_json_classifies_cookbooks() {
    let fixture = Fixture::new();
    fixture.cmd().args(["sync", "--yes"]).assert().success();

    write(fixture.repo.path(), "vendor/apt/recipes/default.rb", "changed");
    fs::remove_dir_all(fixture.repo.path().join("vendor/nginx")).expect("rm nginx");
    write(fixture.repo.path(), "vendor/redis/metadata.rb", "name 'redis'");

    let assert = fixture.cmd().args(["diff", "--json"]).assert().success();
    let diff: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("diff json");
    assert_eq!(diff["new"], serde_json::json!(["redis"]));
    assert_eq!(diff["stale"], serde_json::json!(["nginx"]));
    assert_eq!(diff["updated"], serde_json::json!(["apt"]));
    assert_eq!(
        diff["diffs"]["apt"]["recipes"],
        serde_json::json!(["recipes/default.rb"])
    );
}

#[test]
fn restore_conflicts_with_why_run() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["sync", "--restore", "--why-run"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn missing_config_points_at_init() {
    let home = TempDir::new().expect("home");
    Command::new(assert_cmd::cargo::cargo_bin!("chefsync"))
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .args(["status"])
        .assert()
        .failure()
        .stderr(contains("chefsync init"));
}
