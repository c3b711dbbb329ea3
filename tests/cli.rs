use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const DIALECTS: &str = r#"[
  {"id": 1, "dialect": "miền Tây", "text": "xỉn quắc cần câu", "norm": "say", "meaning": "say rượu rất nặng"},
  {"id": 2, "dialect": "Huế", "text": "mô rứa", "norm": "đâu vậy"}
]"#;

const LAWS: &str = r#"[
  {"Source": "Nghị định 100/2019/NĐ-CP, Điều 5", "text": "Phạt tiền người điều khiển xe ô tô mà trong máu hoặc hơi thở có nồng độ cồn", "Type": "Nghị định"},
  {"Source": "Bộ luật Dân sự 2015, Điều 1", "text": "Bộ luật này quy định địa vị pháp lý của cá nhân, pháp nhân", "Type": "Bộ luật", "extra": "ignored"}
]"#;

fn setup_test_env(dialects: &str, laws: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("data.json"), dialects).unwrap();
    fs::write(data_dir.join("law_data.json"), laws).unwrap();

    let config_content = format!(
        r#"[corpus]
dialect_path = "{root}/data/data.json"
law_path = "{root}/data/law_data.json"

[embedding]
provider = "hash"
dims = 256
batch_size = 2

[generation]
provider = "disabled"

[retrieval]
answer_k = 10
preview_k = 3

[server]
bind = "127.0.0.1:7861"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("vilaw.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_vilaw(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_vilaw");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run vilaw binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_check_prints_counts() {
    let (_tmp, config_path) = setup_test_env(DIALECTS, LAWS);

    let (stdout, stderr, success) = run_vilaw(&config_path, &["check"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("dialect"));
    let total = stdout
        .lines()
        .find(|l| l.starts_with("total"))
        .expect("total line");
    assert!(total.trim_end().ends_with('4'), "unexpected total: {}", total);
}

#[test]
fn test_search_ranks_matching_law_first() {
    let (_tmp, config_path) = setup_test_env(DIALECTS, LAWS);

    let (stdout, stderr, success) = run_vilaw(
        &config_path,
        &["search", "người điều khiển xe ô tô có nồng độ cồn"],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let first = stdout.lines().next().unwrap_or_default();
    assert!(first.starts_with("1. "), "unexpected output: {}", stdout);
    assert!(first.contains("law / Nghị định 100/2019/NĐ-CP, Điều 5"));
    // preview_k = 3
    assert!(stdout.contains("3. "));
    assert!(!stdout.contains("4. "));
}

#[test]
fn test_search_limit() {
    let (_tmp, config_path) = setup_test_env(DIALECTS, LAWS);

    let (stdout, _, success) = run_vilaw(&config_path, &["search", "mô rứa", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("1. "));
    assert!(!stdout.contains("2. "));
}

#[test]
fn test_ask_with_generation_disabled_apologizes() {
    let (_tmp, config_path) = setup_test_env(DIALECTS, LAWS);

    let (stdout, stderr, success) = run_vilaw(&config_path, &["ask", "Uống rượu lái xe bị phạt gì?"]);
    assert!(success, "ask failed: stderr={}", stderr);
    assert_eq!(stdout.trim(), "Xin lỗi, mình gặp lỗi khi xử lý câu hỏi của bạn.");
}

#[test]
fn test_ask_with_empty_corpus_has_no_data() {
    let (_tmp, config_path) = setup_test_env("[]", "[]");

    let (stdout, stderr, success) = run_vilaw(&config_path, &["ask", "Luật đất đai?"]);
    assert!(success, "ask failed: stderr={}", stderr);
    assert_eq!(stdout.trim(), "Xin lỗi, mình chưa có dữ liệu để trả lời câu hỏi này.");
}

#[test]
fn test_invalid_record_aborts_startup() {
    let bad_laws = r#"[{"text": "thiếu nguồn"}]"#;
    let (_tmp, config_path) = setup_test_env(DIALECTS, bad_laws);

    let (_, stderr, success) = run_vilaw(&config_path, &["search", "nguồn"]);
    assert!(!success);
    assert!(stderr.contains("Source"), "stderr={}", stderr);
}

#[test]
fn test_malformed_json_fails_check() {
    let (_tmp, config_path) = setup_test_env("{not json", LAWS);

    let (_, _, success) = run_vilaw(&config_path, &["check"]);
    assert!(!success);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, _, success) = run_vilaw(&tmp.path().join("nope.toml"), &["check"]);
    assert!(!success);
}
