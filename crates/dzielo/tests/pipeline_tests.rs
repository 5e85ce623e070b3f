//! End-to-end runs over scratch repositories
//!
//! History comes from real git2 repositories, rewriting goes to a local
//! mockito server speaking the chat-completions protocol.

use chrono::{NaiveDate, TimeZone, Utc};
use dzielo::{Pipeline, PipelineConfig};
use dzielo_git::{GitRepo, PeriodSelector};
use dzielo_rewrite::{OpenAiService, PromptBuilder, RetryPolicy, Rewriter, RewriterConfig};
use git2::{Repository, Signature, Time};
use mockito::Matcher;
use serde_json::json;
use similar_asserts::assert_eq;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const ANNA: (&str, &str) = ("Anna Nowak", "anna@example.com");
const PIOTR: (&str, &str) = ("Piotr Kowal", "piotr@example.com");

fn commit_at(
    repo: &Repository,
    file: &str,
    content: &str,
    message: &str,
    (name, email): (&str, &str),
    (y, m, d): (i32, u32, u32),
) {
    let workdir = repo.workdir().expect("non-bare repo");
    fs::write(workdir.join(file), content).expect("write file");

    let mut index = repo.index().expect("index");
    index.add_path(Path::new(file)).expect("add path");
    index.write().expect("write index");
    let tree = repo
        .find_tree(index.write_tree().expect("write tree"))
        .expect("find tree");

    let secs = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap().timestamp();
    let sig = Signature::new(name, email, &Time::new(secs, 0)).expect("signature");
    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("head commit")],
        Err(_) => vec![],
    };
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .expect("commit");
}

fn scratch_repo() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let repo = Repository::init(dir.path()).expect("init repo");
    commit_at(&repo, "a.txt", "one\n", "February setup", ANNA, (2024, 2, 20));
    commit_at(&repo, "a.txt", "one\ntwo\n", "Merged PR 101: feat(cart): totals", ANNA, (2024, 3, 5));
    commit_at(&repo, "b.txt", "other\n", "Colleague change", PIOTR, (2024, 3, 8));
    commit_at(&repo, "c.txt", "invoice\n", "Merged PR 102: fix: invoices", ANNA, (2024, 3, 28));
    commit_at(&repo, "a.txt", "four\n", "April follow-up", ANNA, (2024, 4, 2));
    dir
}

fn completion(content: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
}

fn rewriter(server: &mockito::Server) -> Rewriter<OpenAiService> {
    let service = OpenAiService::new("sk-test")
        .with_endpoint(format!("{}/v1", server.url()))
        .with_timeout(Duration::from_secs(5));
    Rewriter::new(
        service,
        RewriterConfig::new("gpt-4o-mini").with_retry(RetryPolicy::immediate(2)),
    )
}

fn pipeline(output: &Path, selector: PeriodSelector) -> Pipeline {
    Pipeline::new(
        PipelineConfig {
            author: ANNA.1.to_string(),
            selector,
            output_dir: output.to_path_buf(),
            subject_prefix: None,
            all_branches: false,
        },
        PromptBuilder::default(),
    )
}

fn april_2() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 2).expect("date")
}

#[test]
fn test_previous_month_report() {
    let repo_dir = scratch_repo();
    let out = TempDir::new().expect("out dir");
    let mut server = mockito::Server::new();
    let first = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "system"}, {"role": "user", "content": "Merged PR 101: feat(cart): totals"}]
        })))
        .with_status(200)
        .with_body(completion("Usprawniono sumowanie koszyka."))
        .create();
    let second = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "system"}, {"role": "user", "content": "Merged PR 102: fix: invoices"}]
        })))
        .with_status(200)
        .with_body(completion("\"Poprawiono wystawianie faktur.\""))
        .create();

    let repo = GitRepo::open(repo_dir.path()).expect("open");
    let summary = pipeline(out.path(), PeriodSelector::PreviousMonth)
        .run(&repo, &rewriter(&server), april_2())
        .expect("run");

    first.assert();
    second.assert();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.rewritten, 2);
    assert_eq!(
        summary.bundle.descriptions_path,
        out.path().join("2024_03_opis_zmian.txt")
    );

    let descriptions = fs::read_to_string(&summary.bundle.descriptions_path).expect("read");
    assert_eq!(
        descriptions,
        "1. Usprawniono sumowanie koszyka.\n2. Poprawiono wystawianie faktur.\n"
    );

    let overview = fs::read_to_string(&summary.bundle.diff_overview_path).expect("read");
    assert_eq!(
        overview.lines().filter(|line| line.starts_with("commit ")).count(),
        2
    );
    assert!(overview.contains("+two"));
    assert!(overview.contains("+invoice"));
    assert!(!overview.contains("Colleague change"));
    assert!(!overview.contains("April follow-up"));
    assert!(overview.find("feat(cart)").unwrap() < overview.find("fix: invoices").unwrap());

    assert_eq!(summary.bundle.archive_path, out.path().join("dzielo_anna_2024_03.zip"));
    let mut archive =
        zip::ZipArchive::new(fs::File::open(&summary.bundle.archive_path).expect("open zip"))
            .expect("read zip");
    let mut archived = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("2024_03_opis_zmian.txt").expect("entry"),
        &mut archived,
    )
    .expect("read entry");
    assert_eq!(archived, descriptions);
    assert!(archive.by_name("2024_03_zmiany.txt").is_ok());
}

#[test]
fn test_unauthorized_key_still_writes_complete_list() {
    let repo_dir = scratch_repo();
    let out = TempDir::new().expect("out dir");
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .expect(1)
        .create();

    let repo = GitRepo::open(repo_dir.path()).expect("open");
    let summary = pipeline(out.path(), PeriodSelector::Explicit { month: 3, year: 2024 })
        .run(&repo, &rewriter(&server), april_2())
        .expect("run");

    mock.assert();
    assert_eq!(summary.failed, 2);
    let descriptions = fs::read_to_string(&summary.bundle.descriptions_path).expect("read");
    let lines: Vec<&str> = descriptions.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("1. [opis niedostępny]"));
    assert!(lines[0].ends_with("Merged PR 101: feat(cart): totals"));
    assert!(lines[1].starts_with("2. [opis niedostępny]"));
}

#[test]
fn test_empty_month_writes_empty_files_without_requests() {
    let repo_dir = scratch_repo();
    let out = TempDir::new().expect("out dir");
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create();

    let repo = GitRepo::open(repo_dir.path()).expect("open");
    let summary = pipeline(out.path(), PeriodSelector::Explicit { month: 1, year: 2024 })
        .run(&repo, &rewriter(&server), april_2())
        .expect("run");

    mock.assert();
    assert_eq!(summary.records, 0);
    assert_eq!(fs::read_to_string(&summary.bundle.descriptions_path).expect("read"), "");
    assert_eq!(fs::read_to_string(&summary.bundle.diff_overview_path).expect("read"), "");
}

#[test]
fn test_rerun_replaces_outputs() {
    let repo_dir = scratch_repo();
    let out = TempDir::new().expect("out dir");
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(completion("Wprowadzono usprawnienie."))
        .create();

    let repo = GitRepo::open(repo_dir.path()).expect("open");
    let run = || {
        pipeline(out.path(), PeriodSelector::PreviousMonth)
            .run(&repo, &rewriter(&server), april_2())
            .expect("run")
    };

    let first = run();
    let first_descriptions = fs::read_to_string(&first.bundle.descriptions_path).expect("read");
    let first_overview = fs::read_to_string(&first.bundle.diff_overview_path).expect("read");

    let second = run();
    assert_eq!(
        fs::read_to_string(&second.bundle.descriptions_path).expect("read"),
        first_descriptions
    );
    assert_eq!(
        fs::read_to_string(&second.bundle.diff_overview_path).expect("read"),
        first_overview
    );
    assert_eq!(fs::read_dir(out.path()).expect("read dir").count(), 3);
}

#[test]
fn test_subject_prefix_limits_report() {
    let repo_dir = scratch_repo();
    let out = TempDir::new().expect("out dir");
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(completion("Opis."))
        .expect(2)
        .create();

    let pipeline = Pipeline::new(
        PipelineConfig {
            author: ANNA.0.to_string(),
            selector: PeriodSelector::Explicit { month: 3, year: 2024 },
            output_dir: out.path().to_path_buf(),
            subject_prefix: Some("Merged PR".to_string()),
            all_branches: false,
        },
        PromptBuilder::default(),
    );
    let repo = GitRepo::open(repo_dir.path()).expect("open");
    let summary = pipeline
        .run(&repo, &rewriter(&server), april_2())
        .expect("run");

    mock.assert();
    assert_eq!(summary.records, 2);
}
