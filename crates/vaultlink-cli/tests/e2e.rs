//! End-to-end tests for the vaultlink CLI.
//!
//! Tests invoke the `vaultlink` binary as a subprocess against a temporary
//! vault and verify stdout.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn vaultlink() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vaultlink"))
}

fn vaultlink_in(dir: &Path) -> Command {
    let mut cmd = vaultlink();
    cmd.current_dir(dir);
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let output = vaultlink_in(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    serde_json::from_slice(&run(dir, args).stdout).unwrap()
}

fn sample_vault() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("Research")).unwrap();
    fs::create_dir_all(root.join("Clippings")).unwrap();
    fs::create_dir_all(root.join("Projects/Alpha")).unwrap();
    fs::create_dir_all(root.join(".obsidian")).unwrap();
    fs::write(root.join("Research/article.md"), "# Article\n").unwrap();
    fs::write(root.join("Clippings/Shane Parrish - Article.md"), "# Clip\n").unwrap();
    fs::write(root.join(".obsidian/app.json"), "{}").unwrap();
    fs::write(
        root.join("Projects/Alpha/index.md"),
        "---\nmode: thinking\ninstructions: Ask questions only.\nstage: exploration\n---\n# Alpha\n",
    )
    .unwrap();
    fs::write(
        root.join("Projects/Alpha/notes.md"),
        "See [[../../Research/article.md|the article]] and `Clippings/Shane Parrish - Article.md`.\n",
    )
    .unwrap();
    dir
}

fn read_file(dir: &Path, path: &str) -> String {
    fs::read_to_string(dir.join(path)).unwrap()
}

// === Read path ===

#[test]
fn e2e_read_shows_banner_before_content() {
    let dir = sample_vault();
    let output = run(dir.path(), &["read", "Projects/Alpha/index.md"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.starts_with(&"=".repeat(80)));
    assert!(stdout.contains("🎯 MODE: THINKING"));
    assert!(stdout.contains("Ask questions only."));
    assert!(stdout.contains("📊 STAGE: exploration"));
    assert!(stdout.ends_with("---\n# Alpha\n"));
}

#[test]
fn e2e_read_plain_file_is_verbatim() {
    let dir = sample_vault();
    let output = run(dir.path(), &["read", "Projects/Alpha/notes.md"]);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        read_file(dir.path(), "Projects/Alpha/notes.md")
    );
}

#[test]
fn e2e_read_batch_reports_missing_files() {
    let dir = sample_vault();
    let output = run(dir.path(), &["read", "Research/article.md", "nope.md"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FILE: Research/article.md"));
    assert!(stdout.contains("FILE: nope.md"));
    assert!(stdout.contains("Error reading file: "));
}

#[test]
fn e2e_read_missing_file_fails() {
    let dir = sample_vault();
    let output = vaultlink_in(dir.path())
        .args(["read", "nope.md"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.md"));
}

// === Write path ===

#[test]
fn e2e_write_normalizes_links() {
    let dir = sample_vault();
    let result = run_json(
        dir.path(),
        &[
            "write",
            "Daily/today.md",
            "--content",
            "Read `Shane Parrish - Article.md` and [[Research/article.md#Intro]]",
        ],
    );
    assert_eq!(result["path"], "Daily/today.md");
    assert_eq!(result["created"], true);
    assert_eq!(result["body"]["rewritten"], 2);
    assert_eq!(
        read_file(dir.path(), "Daily/today.md"),
        "Read [[Shane Parrish - Article]] and [[article#Intro]]"
    );
}

#[test]
fn e2e_write_leaves_unknown_targets() {
    let dir = sample_vault();
    let result = run_json(
        dir.path(),
        &["write", "x.md", "--content", "[[Nowhere/ghost.md]] `ghost.md`"],
    );
    assert_eq!(result["body"]["rewritten"], 0);
    assert_eq!(read_file(dir.path(), "x.md"), "[[Nowhere/ghost.md]] `ghost.md`");
}

#[test]
fn e2e_write_reads_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let dir = sample_vault();
    let mut child = vaultlink_in(dir.path())
        .args(["write", "piped.md"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"[[Research/article.md|Article]]\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(read_file(dir.path(), "piped.md"), "[[article|Article]]\n");
}

#[test]
fn e2e_write_rejects_escaping_paths() {
    let dir = sample_vault();
    let output = vaultlink_in(dir.path())
        .args(["write", "../escape.md", "--content", "x"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!dir.path().parent().unwrap().join("escape.md").exists());
}

#[test]
fn e2e_append_creates_then_extends() {
    let dir = sample_vault();
    run(dir.path(), &["append", "log.md", "--content", "one\n"]);
    run(
        dir.path(),
        &["append", "log.md", "--content", "two [[Research/article.md]]\n"],
    );
    assert_eq!(read_file(dir.path(), "log.md"), "one\ntwo [[article]]\n");
}

// === Links and normalization ===

#[test]
fn e2e_links_reports_status() {
    let dir = sample_vault();
    let links = run_json(dir.path(), &["links", "Projects/Alpha/notes.md"]);
    let links = links.as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["status"], "resolved");
    assert_eq!(links[0]["path"], "Research/article.md");
    assert_eq!(links[0]["display"], "the article");
}

#[test]
fn e2e_write_keeps_commands_and_prose_mentioning_paths() {
    let dir = sample_vault();
    let content = "Run `git mv drafts/x.md Research/article.md` first.\n\n> ~~~md\n> [[Research/article.md]]\n> ~~~\n";
    run(dir.path(), &["write", "howto.md", "--content", content]);
    assert_eq!(read_file(dir.path(), "howto.md"), content);
}

#[test]
fn e2e_backlinks_lists_linking_files() {
    let dir = sample_vault();
    let backlinks = run_json(dir.path(), &["backlinks", "Research/article.md"]);
    let backlinks = backlinks.as_array().unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0]["source"], "Projects/Alpha/notes.md");
    assert_eq!(backlinks[0]["links"][0]["display"], "the article");
}

#[test]
fn e2e_update_links_after_a_move() {
    let dir = sample_vault();
    fs::rename(
        dir.path().join("Research/article.md"),
        dir.path().join("Research/paper.md"),
    )
    .unwrap();
    let report = run_json(
        dir.path(),
        &["update-links", "Research/article.md", "Research/paper.md"],
    );
    assert_eq!(report["target"], "paper");
    assert_eq!(report["links"], 1);
    assert_eq!(report["files"][0], "Projects/Alpha/notes.md");
    assert_eq!(
        read_file(dir.path(), "Projects/Alpha/notes.md"),
        "See [[paper|the article]] and [[Shane Parrish - Article]].\n"
    );

    let backlinks = run_json(dir.path(), &["backlinks", "Research/paper.md"]);
    assert_eq!(backlinks.as_array().unwrap().len(), 1);
}

#[test]
fn e2e_check_fails_until_normalized() {
    let dir = sample_vault();
    let output = vaultlink_in(dir.path()).arg("check").output().unwrap();
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["changed"], 1);
    assert_eq!(report["files"][0]["path"], "Projects/Alpha/notes.md");

    let report = run_json(dir.path(), &["normalize"]);
    assert_eq!(report["changed"], 1);
    assert_eq!(
        read_file(dir.path(), "Projects/Alpha/notes.md"),
        "See [[article|the article]] and [[Shane Parrish - Article]].\n"
    );

    let report = run_json(dir.path(), &["check"]);
    assert_eq!(report["changed"], 0);
}

#[test]
fn e2e_normalize_single_file_dry_run() {
    let dir = sample_vault();
    let before = read_file(dir.path(), "Projects/Alpha/notes.md");
    let report = run_json(
        dir.path(),
        &["normalize", "Projects/Alpha/notes.md", "--dry-run"],
    );
    assert_eq!(report["changed"], true);
    assert_eq!(read_file(dir.path(), "Projects/Alpha/notes.md"), before);
}

#[test]
fn e2e_vault_flag_works_from_elsewhere() {
    let dir = sample_vault();
    let elsewhere = TempDir::new().unwrap();
    let vault = dir.path().to_str().unwrap();
    let links = run_json(
        elsewhere.path(),
        &["links", "Projects/Alpha/notes.md", "--vault", vault],
    );
    assert_eq!(links[0]["status"], "resolved");
}

// === Front matter ===

#[test]
fn e2e_frontmatter_set_get_delete() {
    let dir = sample_vault();
    run(
        dir.path(),
        &[
            "frontmatter",
            "set",
            "Projects/Alpha/index.md",
            "status=active",
            "priority=2",
            "related=[[Research/article.md]]",
        ],
    );

    let fm = run_json(dir.path(), &["frontmatter", "get", "Projects/Alpha/index.md"]);
    assert_eq!(fm["mode"], "thinking");
    assert_eq!(fm["status"], "active");
    assert_eq!(fm["priority"], 2);
    assert_eq!(fm["related"], "[[article]]");

    let result = run_json(
        dir.path(),
        &["frontmatter", "delete", "Projects/Alpha/index.md", "priority"],
    );
    assert_eq!(result["removed"], true);
    let fm = run_json(dir.path(), &["fm", "get", "Projects/Alpha/index.md"]);
    assert!(fm.get("priority").is_none());
    assert!(read_file(dir.path(), "Projects/Alpha/index.md").ends_with("---\n# Alpha\n"));
}

#[test]
fn e2e_frontmatter_set_rejects_bare_words() {
    let dir = sample_vault();
    let output = vaultlink_in(dir.path())
        .args(["frontmatter", "set", "Research/article.md", "oops"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// === Templates ===

#[test]
fn e2e_project_research_template() {
    let dir = sample_vault();
    let created = run_json(dir.path(), &["project", "Beta"]);
    assert_eq!(created["files"][1], "Projects/Beta/index.md");
    assert!(dir.path().join("Projects/Beta/Daily Progress/.placeholder").exists());

    let output = run(dir.path(), &["read", "Projects/Beta/index.md"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("🎯 MODE: THINKING"));
    assert!(stdout.contains("📌 STATUS: active"));
}

#[test]
fn e2e_project_simple_template() {
    let dir = sample_vault();
    let created = run_json(dir.path(), &["project", "Quick", "--template", "simple"]);
    assert_eq!(created["folders"].as_array().unwrap().len(), 0);
    assert!(read_file(dir.path(), "Projects/Quick/index.md").starts_with("# Projects/Quick\n"));
}

#[test]
fn e2e_daily_note_with_date() {
    let dir = sample_vault();
    let result = run_json(dir.path(), &["daily", "Alpha", "--date", "2025-03-14"]);
    assert_eq!(
        result["path"],
        "Projects/Alpha/Daily Progress/daily_progress_2025_03_14.md"
    );
    let text = read_file(
        dir.path(),
        "Projects/Alpha/Daily Progress/daily_progress_2025_03_14.md",
    );
    assert!(text.contains("type: daily_progress"));
    assert!(text.contains("# Daily Progress - [[2025-03-14]]"));
}

#[test]
fn e2e_daily_rejects_bad_date() {
    let dir = sample_vault();
    let output = vaultlink_in(dir.path())
        .args(["daily", "Alpha", "--date", "14/03/2025"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid input"));
}

// === Config ===

#[test]
fn e2e_config_disables_mentions() {
    let dir = sample_vault();
    fs::write(dir.path().join(".vaultlink.toml"), "[links]\nmentions = false\n").unwrap();
    run(
        dir.path(),
        &[
            "write",
            "m.md",
            "--content",
            "`Research/article.md` [[Research/article.md]]",
        ],
    );
    assert_eq!(
        read_file(dir.path(), "m.md"),
        "`Research/article.md` [[article]]"
    );
}

#[test]
fn e2e_config_unknown_key_fails() {
    let dir = sample_vault();
    fs::write(dir.path().join("custom.toml"), "[links]\nmention = false\n").unwrap();
    let output = vaultlink_in(dir.path())
        .args(["check", "--config", "custom.toml"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config error"));
}

#[test]
fn e2e_config_ignores_directories() {
    let dir = sample_vault();
    fs::create_dir_all(dir.path().join("Archive")).unwrap();
    fs::write(dir.path().join("Archive/article.md"), "# Old\n").unwrap();

    // Two article.md files: ambiguous, left alone.
    let links = run_json(dir.path(), &["links", "Projects/Alpha/notes.md"]);
    assert_eq!(links[0]["status"], "ambiguous");

    fs::write(dir.path().join(".vaultlink.toml"), "[vault]\nignore = [\"Archive\"]\n").unwrap();
    let links = run_json(dir.path(), &["links", "Projects/Alpha/notes.md"]);
    assert_eq!(links[0]["status"], "resolved");
}

// === Misc ===

#[test]
fn e2e_completions_bash() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["completions", "bash"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("vaultlink"));
}

#[test]
fn e2e_missing_vault_fails() {
    let dir = TempDir::new().unwrap();
    let output = vaultlink_in(dir.path())
        .args(["links", "a.md", "--vault", "does-not-exist"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("vault directory not found"));
}
