//! Integration tests for the `vitrine` binary.
//!
//! These tests write fixtures and sources to a temp dir, run the binary and
//! check its output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn vitrine_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vitrine"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(vitrine_binary())
        .args(args)
        // keep a stray vitrine.toml in the workspace from leaking in
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run vitrine")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test input");
    path.to_string_lossy().to_string()
}

/// `alice/button` depends on `alice/icon`; both have a default demo.
fn registry_fixture(dir: &Path) -> String {
    let fixture = serde_json::json!({
        "listings": [
            {
                "component": {
                    "author": "alice",
                    "component_slug": "button",
                    "name": "Button",
                    "code": "mem://alice/button/code.tsx",
                    "dependencies": { "react": "^18.2.0", "clsx": "^2.1.1" },
                    "direct_registry_dependencies": ["alice/icon"],
                    "downloads_count": 12,
                    "likes_count": 3
                },
                "demo": {
                    "name": "Default",
                    "demo_code": "mem://alice/button/default/demo.tsx"
                }
            },
            {
                "component": {
                    "author": "alice",
                    "component_slug": "icon",
                    "name": "Icon",
                    "code": "mem://alice/icon/code.tsx",
                    "dependencies": { "react": "^17.0.0", "lucide-react": "^0.460.0" }
                },
                "demo": {
                    "name": "Default",
                    "demo_code": "mem://alice/icon/default/demo.tsx"
                }
            }
        ],
        "files": {
            "mem://alice/button/code.tsx": "import { Icon } from \"@/components/ui/icon\";\nexport function Button() { return <button><Icon /></button> }\n",
            "mem://alice/button/default/demo.tsx": "import { Button } from \"@/components/ui/button\";\nexport function ButtonDemo() { return <Button /> }\n",
            "mem://alice/icon/code.tsx": "export function Icon() { return <svg /> }\n",
            "mem://alice/icon/default/demo.tsx": "export default function IconDemo() { return null }\n"
        }
    });
    write(dir, "fixture.json", &fixture.to_string())
}

// ============================================================================
// scan / check
// ============================================================================

#[test]
fn test_scan_json() {
    let dir = TempDir::new().unwrap();
    let input = write(
        dir.path(),
        "button.tsx",
        concat!(
            "import * as React from \"react\";\n",
            "import { cn } from \"@/lib/utils\";\n",
            "import { Icon } from \"@/components/ui/icon\";\n",
            "export function Button() {}\n",
            "export default Button;\n",
        ),
    );

    let output = run(dir.path(), &["scan", &input, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["exports"], serde_json::json!(["Button"]));
    assert_eq!(value["has_default_export"], true);
    assert_eq!(value["dependencies"]["react"], "^18.2.0");
    assert!(value["dependencies"].get("@/lib/utils").is_none());
    assert_eq!(
        value["internal_dependencies"]["@/components/ui/icon"],
        "components/ui/icon"
    );
}

#[test]
fn test_scan_with_package_json_versions() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "a.tsx", "import clsx from \"clsx\";\nexport const A = 1;\n");
    let package = write(
        dir.path(),
        "package.json",
        r#"{ "dependencies": { "clsx": "^1.2.1" } }"#,
    );

    let output = run(dir.path(), &["scan", &input, "--package-json", &package, "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["dependencies"]["clsx"], "^1.2.1");
}

#[test]
fn test_check_warns_and_fails_on_unrenderable_demo() {
    let dir = TempDir::new().unwrap();
    let code = write(dir.path(), "code.tsx", "export function Button() {}\n");
    let demo = write(
        dir.path(),
        "demo.tsx",
        "import { Button } from \"@/components/ui/button\";\nexport function Demo() { return <Button /> }\n",
    );

    let output = run(dir.path(), &["check", "--code", &code, "--demo", &demo]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("W0001"));
    assert!(stdout(&output).contains("1 warning(s)"));

    let bad = write(dir.path(), "bad.tsx", "const nothing = 1;\n");
    let output = run(dir.path(), &["check", "--code", &code, "--demo", &bad]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("E0002"));
}

#[test]
fn test_check_accepts_mappings() {
    let dir = TempDir::new().unwrap();
    let code = write(
        dir.path(),
        "code.tsx",
        "import { Icon } from \"@/components/ui/icon\";\nexport function Button() {}\n",
    );
    let demo = write(dir.path(), "demo.tsx", "export default function Demo() {}\n");

    let output = run(dir.path(), &["check", "--code", &code, "--demo", &demo]);
    assert!(stderr(&output).contains("W0002"));

    let output = run(
        dir.path(),
        &["check", "--code", &code, "--demo", &demo, "--map", "@/components/ui/icon=alice/icon"],
    );
    assert!(output.status.success());
    assert!(!stderr(&output).contains("W0002"));
    assert!(stdout(&output).contains("0 warning(s)"));
}

// ============================================================================
// resolve / bundle / catalog
// ============================================================================

#[test]
fn test_resolve_from_fixture() {
    let dir = TempDir::new().unwrap();
    let fixture = registry_fixture(dir.path());

    let output = run(dir.path(), &["resolve", "alice/button", "--fixture", &fixture]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let tree: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let files = tree["files_with_registry"].as_object().unwrap();
    let paths: Vec<&String> = files.keys().collect();
    assert_eq!(paths, vec!["/components/ui/button.tsx", "/components/ui/icon.tsx"]);
    assert_eq!(tree["npm_dependencies"]["react"], "^18.2.0");
    assert_eq!(tree["npm_dependencies"]["lucide-react"], "^0.460.0");
    assert_eq!(tree["resolved"], serde_json::json!(["alice/button", "alice/icon"]));
}

#[test]
fn test_resolve_missing_component_fails() {
    let dir = TempDir::new().unwrap();
    let fixture = registry_fixture(dir.path());

    let output = run(
        dir.path(),
        &["resolve", "alice/button", "ghost/none", "--fixture", &fixture],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("ghost/none"));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_bundle_from_fixture() {
    let dir = TempDir::new().unwrap();
    let fixture = registry_fixture(dir.path());

    let output = run(dir.path(), &["bundle", "alice/button", "--fixture", &fixture]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let bundle: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(bundle["entry"], "/App.tsx");
    assert!(bundle["files"]["/App.tsx"]
        .as_str()
        .unwrap()
        .contains("<ButtonDemo />"));
    assert!(bundle["files"]["/Demo.tsx"]
        .as_str()
        .unwrap()
        .starts_with("import { Button } from \"./Component\";"));
    assert!(bundle["files"].get("/components/ui/icon.tsx").is_some());
    assert_eq!(bundle["dependencies"]["react"], "^18.2.0");
    assert_eq!(
        bundle["external_resources"],
        serde_json::json!(["https://cdn.tailwindcss.com"])
    );
}

#[test]
fn test_catalog_from_fixture() {
    let dir = TempDir::new().unwrap();
    let fixture = registry_fixture(dir.path());

    let output = run(dir.path(), &["catalog", "--fixture", &fixture]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("all: 2"));
    assert!(text.contains("most_downloaded: 1"));

    let lines: Vec<&str> = text.lines().skip(2).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("alice/button/default"));
    assert!(lines[0].contains("downloads=12"));

    let output = run(
        dir.path(),
        &["catalog", "--filter", "most_downloaded", "--fixture", &fixture],
    );
    assert_eq!(stdout(&output).lines().skip(2).count(), 1);
}

#[test]
fn test_config_page_size() {
    let dir = TempDir::new().unwrap();
    let fixture = registry_fixture(dir.path());
    let config = write(dir.path(), "vitrine.toml", "[catalog]\npage_size = 1\n");

    let output = run(dir.path(), &["catalog", "--config", &config, "--fixture", &fixture]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).lines().skip(2).count(), 1);
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "bad.toml", "[store]\nkind = \"rest\"\n");

    let output = run(dir.path(), &["catalog", "--config", &config]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("store.url is required"));
}
