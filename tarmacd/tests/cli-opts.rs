use assert_cmd::Command;

const BIN: &str = "tarmacd";

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-h").assert().success();
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-V").assert().success();
}

#[test]
fn test_unknown_flag() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("--blah").assert().failure();
}

#[test]
fn test_list_airports() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    let out = cmd.arg("-L").assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("LFRS"));
    assert!(stdout.contains("NTE"));
}

#[test]
fn test_bad_config_file() {
    let mut cmd = Command::cargo_bin(BIN).unwrap();
    cmd.arg("-c").arg("/nonexistent/tarmac.hcl").assert().failure();
}
