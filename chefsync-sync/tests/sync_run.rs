//! End-to-end runs against the directory-backed server.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chefsync_core::{CookbookName, MemoryReporter};
use chefsync_sync::{
    metadata, Converge, DataBagStore, DirectoryServer, IgnoreList, ManifestSource,
    RepoLayout, SyncRun,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn repo() -> TempDir {
    let repo = TempDir::new().expect("repo");
    write(repo.path(), "vendor/apt/metadata.rb", "name 'apt'");
    write(repo.path(), "vendor/apt/recipes/default.rb", "execute 'apt-get update'");
    write(repo.path(), "vendor/nginx/metadata.rb", "name 'nginx'");
    write(repo.path(), "vendor/nginx/recipes/default.rb", "package 'nginx'");
    write(repo.path(), "data_bags/users/alice.json", r#"{"id":"alice"}"#);
    write(repo.path(), "environments/production.json", r#"{"name":"production"}"#);
    write(repo.path(), "roles/web.json", r#"{"name":"web"}"#);
    repo
}

fn layout(repo: &Path) -> RepoLayout {
    RepoLayout {
        vendor_dir: repo.join("vendor"),
        data_bag_dir: repo.join("data_bags"),
        environment_dir: repo.join("environments"),
        role_dir: repo.join("roles"),
    }
}

fn names(list: &[&str]) -> Vec<CookbookName> {
    list.iter().map(|n| CookbookName::from(*n)).collect()
}

#[test]
fn first_run_bootstraps_and_second_run_is_a_noop() {
    let repo = repo();
    let root = TempDir::new().expect("server");
    let server = DirectoryServer::new(root.path(), "https://chef01.example.com");
    let converge = Converge::new(false, Arc::new(MemoryReporter::new()));
    let ignore = IgnoreList::empty();
    let run = SyncRun::new(layout(repo.path()), &server, &converge, &ignore);

    let first = run.run().expect("first run");
    assert_eq!(first.added, names(&["apt", "nginx"]));
    assert_eq!(server.cookbook_names().expect("list"), names(&["apt", "nginx"]));
    assert_eq!(server.data_bags().expect("bags"), vec!["users".to_string()]);
    assert_eq!(server.roles().expect("roles"), vec!["web.json".to_string()]);
    assert_eq!(
        server.environments().expect("envs"),
        vec!["production.json".to_string()]
    );

    let second = run.run().expect("second run");
    assert!(second.is_empty(), "unchanged repo must not alter cookbooks: {second:?}");
}

#[test]
fn edited_added_and_removed_cookbooks_are_reconciled() {
    let repo = repo();
    let root = TempDir::new().expect("server");
    let server = DirectoryServer::new(root.path(), "https://chef01.example.com");
    let converge = Converge::new(false, Arc::new(MemoryReporter::new()));
    let ignore = IgnoreList::empty();
    let run = SyncRun::new(layout(repo.path()), &server, &converge, &ignore);
    run.run().expect("bootstrap");

    write(repo.path(), "vendor/nginx/recipes/default.rb", "package 'nginx-full'");
    write(repo.path(), "vendor/ntp/recipes/default.rb", "package 'ntp'");
    fs::remove_dir_all(repo.path().join("vendor/apt")).expect("remove apt");

    let altered = run.run().expect("reconcile");
    assert_eq!(altered.added, names(&["ntp"]));
    assert_eq!(altered.deleted, names(&["apt"]));
    assert_eq!(altered.updated, names(&["nginx"]));
    assert_eq!(server.cookbook_names().expect("list"), names(&["nginx", "ntp"]));

    let stored = fs::read_to_string(
        root.path()
            .join("cookbooks/nginx/files/recipes/default.rb"),
    )
    .expect("uploaded file");
    assert_eq!(stored, "package 'nginx-full'");
}

#[test]
fn why_run_leaves_the_server_untouched() {
    let repo = repo();
    let root = TempDir::new().expect("server");
    let server = DirectoryServer::new(root.path(), "https://chef01.example.com");
    let reporter = Arc::new(MemoryReporter::new());
    let converge = Converge::new(true, reporter.clone());
    let ignore = IgnoreList::empty();

    let altered = SyncRun::new(layout(repo.path()), &server, &converge, &ignore)
        .run()
        .expect("why-run");

    assert_eq!(altered.added, names(&["apt", "nginx"]));
    assert!(server.cookbook_names().expect("list").is_empty());
    assert!(server.data_bags().expect("bags").is_empty());
    assert!(reporter.contains("Would Upload all cookbooks"));
    assert!(reporter.contains("Would Create role from"));
}

#[test]
fn restore_empties_the_server_so_the_next_run_bootstraps() {
    let repo = repo();
    let root = TempDir::new().expect("server");
    let server = DirectoryServer::new(root.path(), "https://chef01.example.com");
    let converge = Converge::new(false, Arc::new(MemoryReporter::new()));
    let ignore = IgnoreList::empty();
    let run = SyncRun::new(layout(repo.path()), &server, &converge, &ignore);
    run.run().expect("bootstrap");

    run.restore().expect("restore");
    assert!(server.cookbook_names().expect("list").is_empty());

    let altered = run.run().expect("rebuild");
    assert_eq!(altered.added, names(&["apt", "nginx"]));
}

#[test]
fn commit_marker_survives_between_runs() {
    let root = TempDir::new().expect("server");
    let server = DirectoryServer::new(root.path(), "https://chef01.example.com");
    let converge = Converge::new(false, Arc::new(MemoryReporter::new()));

    assert_eq!(metadata::last_synced_commit(&server).expect("read"), None);
    metadata::record_commit(&server, &converge, "9d1c0ffee").expect("record");

    let reopened = DirectoryServer::new(root.path(), "https://chef01.example.com");
    assert_eq!(
        metadata::last_synced_commit(&reopened).expect("read").as_deref(),
        Some("9d1c0ffee")
    );
}
