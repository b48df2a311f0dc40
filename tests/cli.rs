//! End-to-end tests for the `vault2pass` binary.

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXPORT: &str = "url,username,password,extra,name,grouping,fav,id,attachpresent\n\
                      https://bank.example,alice,s3cret,,My Bank,Finance,0,101,0\n\
                      ,bob,hunter2,\"first line\nsecond, line\",Mail,,0,102,0\n\
                      ,,,,,,0,103,0\n";

fn vault2pass() -> Command {
    let mut cmd = Command::cargo_bin("vault2pass").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("PASSWORD_STORE_DIR")
        .env_remove("VAULT2PASS_CONFIG");
    cmd
}

/// A scratch environment with a store directory, an export file and a
/// stand-in `pass` that keeps entries as plain files.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new(export: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("store")).unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("export.csv"), export).unwrap();
        install_fake_pass(&dir.path().join("bin"));
        Self { dir }
    }

    fn store(&self) -> std::path::PathBuf {
        self.dir.path().join("store")
    }

    fn command(&self) -> Command {
        let path = std::env::var("PATH").unwrap_or_default();
        let mut cmd = vault2pass();
        cmd.env(
            "PATH",
            format!("{}:{path}", self.dir.path().join("bin").display()),
        )
        .arg("--store-dir")
        .arg(self.store())
        .arg("--export-file")
        .arg(self.dir.path().join("export.csv"))
        .arg("--config")
        .arg(self.dir.path().join("config.json"));
        cmd
    }

    fn entry(&self, identifier: &str) -> Option<String> {
        fs::read_to_string(self.store().join(format!("{identifier}.gpg"))).ok()
    }
}

#[cfg(unix)]
fn install_fake_pass(bin: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let script = bin.join("pass");
    fs::write(
        &script,
        "#!/bin/sh\n\
         set -e\n\
         cmd=\"$1\"; shift\n\
         case \"$cmd\" in\n\
           show) cat \"$PASSWORD_STORE_DIR/$1.gpg\" ;;\n\
           insert) shift 2; cat > \"$PASSWORD_STORE_DIR/$1.gpg\" ;;\n\
           *) exit 1 ;;\n\
         esac\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
fn install_fake_pass(_bin: &Path) {}

#[test]
fn test_help_exits_zero() {
    vault2pass().arg("--help").assert().success();
}

#[test]
fn test_unknown_option_exits_two() {
    vault2pass().arg("--frobnicate").assert().code(2);
}

#[test]
fn test_version() {
    let output = vault2pass().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("vault2pass version "));
}

#[test]
fn test_version_json_reports_tools() {
    let output = vault2pass().args(["--json", "version"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    let tools = json["tools"].as_object().unwrap();
    for tool in ["lpass", "pass", "gopass", "gpg", "git"] {
        let path = &tools[tool];
        assert!(path.is_null() || path.is_string(), "{tool}: {path}");
    }
}

#[test]
fn test_normalize() {
    vault2pass()
        .args(["normalize", "My Bank, Inc.", "example.com", "Work/VPN"])
        .assert()
        .success()
        .stdout("my-bank,-inc\nexample\nwork_vpn\n");
}

#[test]
fn test_normalize_json() {
    let output = vault2pass()
        .args(["--json", "normalize", "Mail", ".hidden", "..x"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["identifier"], "mail");
    assert_eq!(json[0]["usable"], true);
    assert_eq!(json[1]["identifier"], "");
    assert_eq!(json[1]["usable"], false);
    assert_eq!(json[2]["identifier"], ".");
    assert_eq!(json[2]["usable"], false);
}

#[test]
fn test_normalize_prints_blank_line_for_skipped_names() {
    vault2pass()
        .args(["normalize", "Mail", "...", "Bank"])
        .assert()
        .success()
        .stdout("mail\n\nbank\n");
}

#[test]
fn test_missing_store_dir_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    vault2pass()
        .arg("--store-dir")
        .arg(temp_dir.path().join("missing"))
        .arg("--config")
        .arg(temp_dir.path().join("config.json"))
        .assert()
        .code(7);
}

#[test]
fn test_missing_store_dir_json_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = vault2pass()
        .arg("--json")
        .arg("--store-dir")
        .arg(temp_dir.path().join("missing"))
        .arg("--config")
        .arg(temp_dir.path().join("config.json"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7));
    // Log lines come first; the error object is the last line
    let stderr = String::from_utf8(output.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let json: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(json["error"]["code"], "CONFIG_ERROR");
}

#[cfg(unix)]
#[test]
fn test_import_then_rerun_writes_nothing() {
    let sandbox = Sandbox::new(EXPORT);

    sandbox.command().assert().success();
    assert_eq!(
        sandbox.entry("my-bank").as_deref(),
        Some("s3cret\nusername: alice\nurl: https://bank.example\n")
    );
    assert_eq!(
        sandbox.entry("mail").as_deref(),
        Some("hunter2\nusername: bob\nextra: first line\nsecond, line\n")
    );

    let output = sandbox.command().arg("--json").output().unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["stats"]["total"], 3);
    assert_eq!(summary["stats"]["written"], 0);
    assert_eq!(summary["stats"]["unchanged"], 2);
    assert_eq!(summary["stats"]["skipped_blank"], 1);
    assert_eq!(summary["commit"], "untracked");
}

#[cfg(unix)]
#[test]
fn test_dry_run_writes_nothing() {
    let sandbox = Sandbox::new(EXPORT);

    let output = sandbox.command().args(["--test", "--json"]).output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["stats"]["written"], 2);
    assert!(sandbox.entry("my-bank").is_none());
    assert_eq!(fs::read_dir(sandbox.store()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_malformed_export_exits_five() {
    let sandbox = Sandbox::new("url,username,password\nhttps://a,b,c\n");
    sandbox.command().assert().code(5);
    assert_eq!(fs::read_dir(sandbox.store()).unwrap().count(), 0);
}

/// Polls `child` until it exits or `timeout` passes.
#[cfg(unix)]
fn wait_for_exit(
    child: &mut std::process::Child,
    timeout: std::time::Duration,
) -> Option<std::process::ExitStatus> {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    None
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[cfg(unix)]
#[test]
fn test_second_signal_cleans_up_before_exit() {
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    if which::which("git").is_err() {
        return;
    }

    let sandbox = Sandbox::new(EXPORT);
    let tmp = sandbox.dir.path().join("tmp");
    fs::create_dir(&tmp).unwrap();
    fs::create_dir(sandbox.store().join(".git")).unwrap();

    // A pass that hangs on the first insert
    let marker = sandbox.dir.path().join("inserting");
    let script = sandbox.dir.path().join("bin").join("pass");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\n\
             case \"$1\" in\n\
               show) exit 1 ;;\n\
               insert) touch '{}'; sleep 10 ;;\n\
             esac\n",
            marker.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let path = std::env::var("PATH").unwrap_or_default();
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("vault2pass"))
        .env_remove("RUST_LOG")
        .env_remove("PASSWORD_STORE_DIR")
        .env_remove("VAULT2PASS_CONFIG")
        .env("TMPDIR", &tmp)
        .env(
            "PATH",
            format!("{}:{path}", sandbox.dir.path().join("bin").display()),
        )
        .arg("--store-dir")
        .arg(sandbox.store())
        .arg("--export-file")
        .arg(sandbox.dir.path().join("export.csv"))
        .arg("--config")
        .arg(sandbox.dir.path().join("config.json"))
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(20);
    while !marker.exists() {
        assert!(std::time::Instant::now() < deadline, "import never reached an insert");
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(sandbox.store().join(".git.vault2pass-suspended").is_dir());
    assert_eq!(fs::read_dir(&tmp).unwrap().count(), 1);

    send_sigterm(child.id());
    std::thread::sleep(Duration::from_millis(500));
    send_sigterm(child.id());

    let status = wait_for_exit(&mut child, Duration::from_secs(20));
    if status.is_none() {
        let _ = child.kill();
    }
    assert_eq!(status.and_then(|s| s.code()), Some(130));

    assert!(sandbox.store().join(".git").is_dir());
    assert!(!sandbox.store().join(".git.vault2pass-suspended").exists());
    let leftovers: Vec<_> = fs::read_dir(&tmp)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "scratch left behind: {leftovers:?}");
}
