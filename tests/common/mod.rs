#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    /// Parse every non-empty stdout line as JSON.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).unwrap_or_else(|e| {
                    panic!("invalid JSON line {line:?}: {e}; log: {}", self.log_path.display())
                })
            })
            .collect()
    }

    /// Last JSON line on stdout (the command summary).
    pub fn summary(&self) -> serde_json::Value {
        self.json_lines()
            .pop()
            .unwrap_or_else(|| panic!("no JSON output; log: {}", self.log_path.display()))
    }
}

/// Isolated HOME plus activity-log location for one test case.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create sandbox dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn activity_log(&self) -> PathBuf {
        self.dir.path().join("activity.jsonl")
    }

    /// Write a file inside the sandbox and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write sandbox file");
        path
    }

    pub fn activity_events(&self) -> Vec<serde_json::Value> {
        fs::read_to_string(self.activity_log())
            .unwrap_or_default()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("activity line is JSON"))
            .collect()
    }
}

/// Root with a solution child (1) and a failed sibling (2).
pub const THREE_NODE_TREE: &str = r#"{
  "id": "three-node",
  "solAncestorIds": [0, 1],
  "nodes": [
    {"id": 0, "parentId": null, "label": "root", "childCount": 2, "isSolution": false, "descCount": 2},
    {"id": 1, "parentId": 0, "label": "x = 1", "childCount": 0, "isSolution": true, "isLeftChild": true},
    {"id": 2, "parentId": 0, "label": "x != 1", "childCount": 0, "isSolution": false}
  ]
}"#;

/// Root is its own parent's child: no root at all.
pub const ORPHAN_TREE: &str = r#"{
  "id": "orphan",
  "nodes": [
    {"id": 0, "parentId": 1, "childCount": 1},
    {"id": 1, "parentId": 0, "childCount": 1}
  ]
}"#;

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_stx") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "stx.exe" } else { "stx" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve stx binary path for integration test"),
    }
}

/// Run `stx` inside `sandbox` with JSON output and no extra environment.
pub fn run_cli_case(case_name: &str, sandbox: &Sandbox, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, sandbox, args, &[], None)
}

/// Run `stx` with extra env vars and optional stdin.
pub fn run_cli_case_with(
    case_name: &str,
    sandbox: &Sandbox,
    args: &[&str],
    env: &[(&str, &str)],
    stdin: Option<&str>,
) -> CmdResult {
    let root = std::env::temp_dir().join("stx-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", sandbox.path())
        .env("STX_LOG_PATH", sandbox.activity_log())
        .env("STX_OUTPUT_FORMAT", "json")
        .env("RUST_BACKTRACE", "1")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().expect("spawn stx command");
    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().expect("stdin piped");
        pipe.write_all(input.as_bytes()).expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for stx command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
