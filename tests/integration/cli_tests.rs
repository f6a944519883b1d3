use neuter::cli::CliHandler;
use neuter::utils::config_loader::{parse_define, CliOverrides};
use neuter::NeuterError;
use std::fs;
use std::path::Path;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

#[tokio::test]
async fn test_build_writes_artifacts_to_outdir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cwd = temp_dir.path();
    write(cwd, "src/main.js", "require('./lib/util');\nvar v = '<%= version %>';\n");
    write(cwd, "src/lib/util.js", "function util() {}\n");

    let overrides = CliOverrides {
        entries: vec!["src/main.js".to_string()],
        base_path: Some("src".to_string()),
        output_name: Some("app.js".to_string()),
        map_name: Some("app.js.map".to_string()),
        defines: vec![parse_define("version=\"1.0.0\"").unwrap()],
        outdir: Some("dist".to_string()),
        ..Default::default()
    };

    let outputs = CliHandler::new()
        .handle_build_command(cwd, None, overrides)
        .await
        .unwrap();
    assert_eq!(outputs.len(), 1);

    let code = fs::read_to_string(cwd.join("dist/app.js")).unwrap();
    assert_eq!(
        code,
        "function util() {}\n\nvar v = '1.0.0';\n\n//# sourceMappingURL=app.js.map"
    );
    assert!(cwd.join("dist/app.js.map").exists());
}

#[tokio::test]
async fn test_config_file_is_merged_with_flags() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cwd = temp_dir.path();
    write(cwd, "a.js", "require('./shared');\na();\n");
    write(cwd, "b.js", "require('./shared');\nb();\n");
    write(cwd, "shared.js", "shared();\n");
    write(
        cwd,
        "neuter.config.json",
        r#"{"entries": ["a.js", "b.js"], "separator": "\n;\n", "outdir": "from-config"}"#,
    );

    let overrides = CliOverrides {
        outdir: Some("out".to_string()),
        ..Default::default()
    };
    CliHandler::new()
        .handle_build_command(cwd, None, overrides)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(cwd.join("out/a.js")).unwrap(), "shared();\n\n;\na();\n");
    assert_eq!(fs::read_to_string(cwd.join("out/b.js")).unwrap(), "shared();\n\n;\nb();\n");
    assert!(!cwd.join("from-config").exists());
}

#[tokio::test]
async fn test_explicit_config_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cwd = temp_dir.path();
    write(cwd, "main.js", "var vendor = require('./vendor');\nmain(vendor);\n");
    write(cwd, "vendor.js", "vendor();\n");
    write(cwd, "configs/custom.json", r#"{"entries": ["main.js"], "skipPaths": ["vendor.js"]}"#);

    CliHandler::new()
        .handle_build_command(cwd, Some(Path::new("configs/custom.json")), CliOverrides::default())
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(cwd.join("dist/main.js")).unwrap(), "main(vendor);\n");
}

#[tokio::test]
async fn test_unreadable_config_is_a_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = CliHandler::new()
        .handle_build_command(temp_dir.path(), Some(Path::new("missing.json")), CliOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NeuterError::Config(_)));
}

#[tokio::test]
async fn test_shared_output_name_for_several_entries_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cwd = temp_dir.path();
    write(cwd, "a.js", "a();\n");
    write(cwd, "b.js", "b();\n");

    let overrides = CliOverrides {
        entries: vec!["a.js".to_string(), "b.js".to_string()],
        output_name: Some("bundle.js".to_string()),
        map_name: Some("bundle.map".to_string()),
        ..Default::default()
    };
    let err = CliHandler::new()
        .handle_build_command(cwd, None, overrides)
        .await
        .unwrap_err();

    assert!(matches!(err, NeuterError::Config(_)));
}
