use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use unity_style_guard::{AnalysisOptions, SourceScanner, StyleValidator};

const PLAYER: &str = "\
public class Player : MonoBehaviour
{
    private int health;
    private const int MAXHEALTH = 100;
}
";

const ENEMY: &str = "\
public class Enemy : MonoBehaviour
{
    private int _health;
    private const int MAX_HEALTH = 100;
    public float MoveSpeed;

    void Update()
    {
        if (_target != null)
        {
            _health -= 1;
        }
    }
}
";

struct TestProject {
    dir: TempDir,
}

impl TestProject {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("Assets/Scripts")).unwrap();
        Self { dir }
    }

    fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_checkstyle"))
            .args(args)
            .current_dir(self.root())
            .env_remove("CHECKSTYLE_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run checkstyle")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn reports_violations_and_exits_with_one() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Player.cs", PLAYER).write("Assets/Scripts/Enemy.cs", ENEMY);

    let output = project.run(&["Assets"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "Assets/Scripts/Player.cs:3: private-field-naming expected _camelCase, found health\n\
         Assets/Scripts/Player.cs:4: constant-naming expected UPPER_SNAKE_CASE, found MAXHEALTH\n"
    );
}

#[test]
fn clean_project_exits_with_zero() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Enemy.cs", ENEMY);

    let output = project.run(&["Assets"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());
}

#[test]
fn scan_errors_are_reported_without_failing_the_run() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Broken.cs", "public class Broken\n{\n}\n}\n");

    let output = project.run(&["Assets"]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "Assets/Scripts/Broken.cs:4: scan-error: unmatched `}`\n");
}

#[test]
fn ignore_files_and_default_exclusions_are_honored() {
    let project = TestProject::new();
    project
        .write("Assets/Scripts/Enemy.cs", ENEMY)
        .write("Assets/Generated/Bad.cs", PLAYER)
        .write("Assets/Plugins/Library/Vendor.cs", PLAYER)
        .write(".styleignore", "Generated/\n");

    let output = project.run(&["Assets"]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));

    let output = project.run(&["check", "--no-ignore", "Assets"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("Assets/Generated/Bad.cs:3:"));
    assert!(!stdout(&output).contains("Vendor.cs"));
}

#[test]
fn invalid_configuration_is_fatal() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Enemy.cs", ENEMY).write(
        "checkstyle.yaml",
        "version: \"1.0\"\nrules:\n  naming:\n    severity: warning\n    rules:\n      - id: broken\n        applies_to: field\n        pattern: kebab-case\n",
    );

    let output = project.run(&["Assets"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken"));
}

#[test]
fn discovered_configuration_replaces_builtin_rules() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Enemy.cs", ENEMY).write(
        "checkstyle.yaml",
        "version: \"1.0\"\nrules:\n  fields:\n    severity: error\n    rules:\n      - id: member-prefix\n        applies_to: field\n        visibility: [private]\n        pattern: \"regex:m_[A-Za-z]+\"\n        expected: m_Name\n",
    );

    let output = project.run(&["Assets"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output),
        "Assets/Scripts/Enemy.cs:3: member-prefix expected m_Name, found _health\n"
    );
}

#[test]
fn json_output_from_check_subcommand() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Player.cs", PLAYER);

    let output = project.run(&["check", "--format", "json", "--no-parallel", "Assets"]);
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let violations = json["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0]["rule_id"], "private-field-naming");
    assert_eq!(violations[0]["suggested_fix"], "_health");
    assert_eq!(json["summary"]["total_files"], 1);
}

#[test]
fn explain_and_rules_subcommands() {
    let project = TestProject::new();

    let output = project.run(&["explain", "constant-naming"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("UPPER_SNAKE_CASE"));

    let output = project.run(&["explain", "no-such-rule"]);
    assert_eq!(output.status.code(), Some(1));

    let output = project.run(&["rules", "--category", "unity"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("tag-comparison"));
}

#[test]
fn library_and_cli_agree() {
    let project = TestProject::new();
    project.write("Assets/Scripts/Player.cs", PLAYER).write("Assets/Scripts/Enemy.cs", ENEMY);

    let validator = StyleValidator::with_defaults().unwrap();
    let report = validator
        .validate_paths(&[project.root().join("Assets")], &AnalysisOptions::default())
        .unwrap();

    assert_eq!(report.summary.total_files, 2);
    assert_eq!(report.violations.len(), 2);
    assert!(report.violations.iter().all(|v| v.file_path.ends_with("Player.cs")));
}

#[test]
fn scanning_is_idempotent() {
    let scanner = SourceScanner::default();
    let first: Vec<_> = scanner.scan(ENEMY).collect();
    let second: Vec<_> = scanner.scan(ENEMY).collect();

    assert_eq!(first, second);
    assert!(first.iter().any(|identifier| identifier.name == "MoveSpeed"));
}
