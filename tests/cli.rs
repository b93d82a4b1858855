use assert_cmd::Command;

#[test]
fn help_lists_commands() {
    let output = Command::cargo_bin("filehub")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["list", "search", "upload", "delete", "stats", "download", "interactive"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn invalid_api_url_fails() {
    Command::cargo_bin("filehub")
        .unwrap()
        .args(["--api-url", "ftp://example.com", "list"])
        .env_remove("FILEHUB_API_URL")
        .assert()
        .failure();
}
