use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const ROUTER: &str = r#"prompt="r> ";
show version, echo("1.0");
set mtu <mtu:uint16 range[576:9216]>("MTU"), print();
interface <name:string choice:eth0|eth1>, hide;

treename="config";
hostname <name:string>, echo("renamed");
"#;

fn file_with(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn grammar() -> NamedTempFile {
    file_with(ROUTER, ".cli")
}

#[test]
fn list_trees() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .arg("--list-trees")
        .assert()
        .success()
        .stdout("main\nconfig\n");
}

#[test]
fn print_full_and_brief() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .arg("--print")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("prompt=\"r> \";\ntreename=\"main\";\n")
                .and(predicate::str::contains(
                    "set mtu <mtu:uint16 range[576:9216]>(\"MTU\"), print();\n",
                ))
                .and(predicate::str::contains(
                    "interface <name:string choice:eth0|eth1>, hide;\n",
                )),
        );
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .arg("--brief")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("set mtu <mtu>;\n")
                .and(predicate::str::contains("interface (eth0|eth1);\n")),
        );
}

#[test]
fn dump_structure() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .arg("--dump")
        .assert()
        .success()
        .stdout(predicate::str::contains("pt main [3]\n   co show\n   pt [1]\n      co version\n"));
}

#[test]
fn match_reports_path_and_vars() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .args(["--match", "set mtu 1500"])
        .assert()
        .success()
        .stdout("set mtu <mtu>\n  0 : cmd = set mtu 1500\n  1 : mtu = 1500\n");
}

#[test]
fn failed_match_exits_with_error() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .args(["--match", "set mtu 10"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn completion_as_json() {
    let grammar = grammar();
    let output = cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .args(["--complete", "sh", "--complete", "", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["status"], "completed");
    assert_eq!(reports[0]["word_start"], 0);
    assert_eq!(reports[0]["candidates"][0]["text"], "show");
    assert_eq!(reports[0]["candidates"][0]["kind"], "keyword");
    let texts: Vec<&str> = reports[1]["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["show", "set", "interface"]);
}

#[test]
fn match_as_json() {
    let grammar = grammar();
    let output = cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .args(["--match", "show version", "--match", "show nothing", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["status"], "matched");
    assert_eq!(reports[0]["callbacks"][0], "echo");
    assert_eq!(reports[0]["vars"][0]["type"], "rest");
    assert_eq!(reports[1]["status"], "failed");
    assert_eq!(reports[1]["position"], 5);
}

#[test]
fn script_mode_runs_callbacks() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .write_stdin("show version\n# a comment\n\nset mtu 1500\n")
        .assert()
        .success()
        .stdout("r> show version\n1.0\nr> set mtu 1500\n0 : cmd = set mtu 1500\n1 : mtu = 1500\n");
}

#[test]
fn script_mode_reports_failed_lines() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .write_stdin("show version\nshow clock\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("1.0"))
        .stderr(predicate::str::contains("line 2: no match for `clock`"));
}

#[test]
fn tree_from_config_and_flag() {
    let grammar = grammar();
    let config = file_with("[session]\ntree = \"config\"\nprompt = \"ignored> \"\n", ".toml");
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .arg("--config")
        .arg(config.path())
        .write_stdin("hostname core1\n")
        .assert()
        .success()
        .stdout("r> hostname core1\nrenamed\n");
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .args(["--tree", "config", "--match", "hostname core1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("hostname <name>\n"));
}

#[test]
fn environment_selects_tree_and_matching() {
    let grammar = grammar();
    cargo_bin_cmd!("cligram")
        .arg(grammar.path())
        .env("CLIGRAM_SESSION__TREE", "config")
        .env("CLIGRAM_MATCHING__CASE_INSENSITIVE", "true")
        .args(["--match", "HOSTNAME core1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("hostname <name>\n"));
}

#[test]
fn compile_errors_point_at_the_source() {
    let bad = file_with("show <n:nope>;\n", ".cli");
    cargo_bin_cmd!("cligram")
        .arg(bad.path())
        .arg("--list-trees")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown variable type `nope`"));
}
