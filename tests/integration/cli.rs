use std::io::Write;
use std::process::Command;

fn platform_bin() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_yaoxiang-platform"));
    command
        .env_remove("YAOXIANG_PLATFORM_THREADS")
        .env_remove("YAOXIANG_PLATFORM_LOG")
        .current_dir(env!("CARGO_MANIFEST_DIR"));
    command
}

#[test]
fn test_info_reports_resolved_size() {
    let output = platform_bin()
        .args(["--threads", "3", "info"])
        .output()
        .expect("Failed to spawn yaoxiang-platform");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("requested pool size:  3"), "{}", stdout);
    assert!(stdout.contains("resolved pool size:   3"), "{}", stdout);
}

#[test]
fn test_info_reads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "thread_pool_size = 2").unwrap();
    writeln!(file, "thread_name_prefix = \"from-file\"").unwrap();

    let output = platform_bin()
        .arg("--config")
        .arg(file.path())
        .arg("info")
        .output()
        .expect("Failed to spawn yaoxiang-platform");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("resolved pool size:   2"), "{}", stdout);
    assert!(stdout.contains("from-file"), "{}", stdout);
}

#[test]
fn test_env_overrides_config() {
    let output = platform_bin()
        .env("YAOXIANG_PLATFORM_THREADS", "5")
        .arg("info")
        .output()
        .expect("Failed to spawn yaoxiang-platform");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("requested pool size:  5"), "{}", stdout);
}

#[test]
fn test_negative_threads_rejected() {
    let output = platform_bin()
        .args(["--threads", "-2", "info"])
        .output()
        .expect("Failed to spawn yaoxiang-platform");
    assert!(!output.status.success());
}

#[test]
fn test_run_workload_drains_everything() {
    let output = platform_bin()
        .args([
            "--threads",
            "2",
            "run",
            "--background",
            "8",
            "--contexts",
            "2",
            "--foreground",
            "3",
            "--delayed",
            "2",
            "--delay-ms",
            "5",
        ])
        .output()
        .expect("Failed to spawn yaoxiang-platform");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("background tasks finished: 8/8"), "{}", stdout);
    assert!(stdout.contains("foreground tasks pumped:   10"), "{}", stdout);
    assert!(stdout.contains("disposed at teardown:      0"), "{}", stdout);
}
