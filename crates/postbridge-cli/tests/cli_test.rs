//! Tests for postbridge CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn postbridge() -> Command {
    let mut cmd = Command::cargo_bin("postbridge").unwrap();
    for var in [
        "POSTBRIDGE_CONFIG",
        "GITHUB_TOKEN",
        "GITHUB_OWNER",
        "GITHUB_REPO",
        "POSTBRIDGE_API_KEY",
        "POSTBRIDGE_WEBHOOK_SECRET",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_post(dir: &Path, name: &str, title: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let post = serde_json::json!({
        "title": title,
        "description": "A post",
        "author": "Jane",
        "date": "2024-01-15",
        "content": "Hello there"
    });
    fs::write(&path, post.to_string()).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    postbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("catalog"))
        .stdout(predicate::str::contains("publish"));
}

#[test]
fn test_slug_command() {
    postbridge()
        .args(["slug", "Hello,", "World!"])
        .assert()
        .success()
        .stdout("hello-world\n");
}

#[test]
fn test_slug_without_usable_characters_fails() {
    postbridge()
        .args(["slug", "!!!"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("usable slug"));
}

#[test]
fn test_render_prints_frontmatter_document() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "Hello World");

    postbridge()
        .arg("render")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\ntitle: Hello World\n"))
        .stdout(predicate::str::contains("author: Jane"))
        .stdout(predicate::str::contains("published: true"))
        .stdout(predicate::str::ends_with("---\n\nHello there\n"));
}

#[test]
fn test_render_writes_files_to_out_dir() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "Hello World");
    let out = dir.path().join("out");

    postbridge()
        .arg("render")
        .arg(&file)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello-world.md"));

    let written = fs::read_to_string(out.join("hello-world.md")).unwrap();
    assert!(written.starts_with("---\ntitle: Hello World\n"));
}

#[test]
fn test_render_out_rejects_duplicate_slugs() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("posts.json");
    let post = |title: &str| {
        serde_json::json!({
            "title": title,
            "date": "2024-01-15",
            "content": format!("Body of {}", title)
        })
    };
    let posts = serde_json::json!([post("Hello World"), post("Hello, World!")]);
    fs::write(&file, posts.to_string()).unwrap();
    let out = dir.path().join("out");

    postbridge()
        .arg("render")
        .arg(&file)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate slug 'hello-world'"));

    assert!(!out.join("hello-world.md").exists());
}

#[test]
fn test_render_rejects_invalid_post() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "   ");

    postbridge()
        .arg("render")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title cannot be empty"));
}

#[test]
fn test_catalog_reports_duplicates() {
    let dir = TempDir::new().unwrap();
    let markdown_dir = dir.path().join("md");
    let json_dir = dir.path().join("json");
    fs::create_dir_all(&markdown_dir).unwrap();
    fs::create_dir_all(&json_dir).unwrap();

    fs::write(
        markdown_dir.join("hello-world.md"),
        "---\ntitle: Hello World\ndate: 2024-01-15\n---\n\nBody\n",
    )
    .unwrap();
    write_post(&json_dir, "hello.json", "Hello, World!");
    write_post(&json_dir, "other.json", "Another Post");

    postbridge()
        .arg("catalog")
        .arg("--markdown-dir")
        .arg(&markdown_dir)
        .arg("--json-dir")
        .arg(&json_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello-world\tmarkdown\tHello World"))
        .stdout(predicate::str::contains("another-post\tjson\tAnother Post"))
        .stdout(predicate::str::contains("duplicate: hello-world"));
}

#[test]
fn test_catalog_json_output() {
    let dir = TempDir::new().unwrap();
    write_post(dir.path(), "one.json", "One");

    let output = postbridge()
        .arg("catalog")
        .arg("--json-dir")
        .arg(dir.path())
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["entries"][0]["slug"], "one");
    assert_eq!(value["entries"][0]["source"], "json");
    assert_eq!(value["duplicates"].as_array().unwrap().len(), 0);
}

#[test]
fn test_catalog_empty() {
    let dir = TempDir::new().unwrap();

    postbridge()
        .arg("catalog")
        .arg("--markdown-dir")
        .arg(dir.path().join("missing"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No posts found"));
}

#[test]
fn test_publish_requires_repository_config() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "Hello World");

    postbridge()
        .arg("publish")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("github.owner is required"));
}

#[test]
fn test_publish_requires_token() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "Hello World");
    let config = dir.path().join("postbridge.yaml");
    fs::write(&config, "github:\n  owner: acme\n  repo: site\n").unwrap();

    postbridge()
        .arg("--config")
        .arg(&config)
        .arg("publish")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("github.token is required"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = write_post(dir.path(), "post.json", "Hello World");

    postbridge()
        .arg("--config")
        .arg(dir.path().join("nope.yaml"))
        .arg("publish")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}
