use neuter::core::{BundleOptions, BundleOutput, BundleService, CanonicalPath, NeuterBuildService, ProcessOption, ScanCache};
use neuter::infrastructure::{MemorySourceProvider, TokioFileSystemService};
use neuter::utils::BoxError;
use neuter::NeuterError;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Bundle `tests/fixtures/<entry>` with paths taken relative to the crate root.
async fn bundle_fixture(entry: &str, options: BundleOptions) -> BundleOutput {
    let provider = TokioFileSystemService::new(manifest_dir());
    let service = NeuterBuildService::new(Arc::new(provider), options);
    service
        .bundle(&CanonicalPath::new(&format!("tests/fixtures/{}", entry)))
        .await
        .unwrap()
}

/// Bundle with `tests/fixtures` as the base path.
async fn bundle_from_base(entry: &str, options: BundleOptions) -> BundleOutput {
    let base = manifest_dir().join("tests/fixtures");
    let provider = TokioFileSystemService::new(&base);
    let service = NeuterBuildService::new(Arc::new(provider), options.with_base_path(base));
    service.bundle(&CanonicalPath::new(entry)).await.unwrap()
}

#[tokio::test]
async fn test_combines_in_require_order() {
    let output = bundle_fixture("simple_require_statements.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar second = first + 1;\n\n\nvar simple = true;\n"
    );
    assert_eq!(output.code.path.as_str(), "simple_require_statements.js");
    assert!(output.map.is_none());
}

#[tokio::test]
async fn test_skipped_files_are_left_out() {
    let options = BundleOptions::default().with_skip_path("tests/fixtures/lib/commonjs.js");
    let output = bundle_fixture("ignores_files_when_told.js", options).await;

    assert_eq!(output.code.content, "var first = 1;\n\nvar told = true;\n");
    assert!(!output
        .inclusion_order
        .contains(&CanonicalPath::new("tests/fixtures/lib/commonjs.js")));
}

#[tokio::test]
async fn test_requires_in_comments_and_strings_are_ignored() {
    let output = bundle_fixture("comment_out_require.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\n// require('./lib/first.js');\n/* require('./lib/second.js'); */\nvar s = \"require('./lib/first.js')\";\n"
    );
}

#[tokio::test]
async fn test_local_require_functions_are_ignored() {
    let output = bundle_fixture("local_require_definitions.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "function require(name) { return name; }\nvar x = require(name);\nvar y = loader.require('./lib/first.js');\n"
    );
    assert_eq!(output.inclusion_order.len(), 1);
}

#[tokio::test]
async fn test_optional_semicolons() {
    let output = bundle_fixture("optional_semicolons.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar second = first + 1;\n\na()\n"
    );
}

#[tokio::test]
async fn test_specifier_rewrite() {
    let options =
        BundleOptions::default().with_specifier_rewrite(|raw: &str| format!("tests/fixtures/{}", raw));
    let output = bundle_fixture("simple_require_filepath_transforms.js", options).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar third = 3;\n\nvar transformed = true;\n"
    );
}

#[tokio::test]
async fn test_base_path_resolves_bare_specifiers() {
    let output =
        bundle_from_base("simple_require_filepath_transforms.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar third = 3;\n\nvar transformed = true;\n"
    );
    assert_eq!(
        output.inclusion_order,
        vec![
            CanonicalPath::new("lib/first.js"),
            CanonicalPath::new("lib/third.js"),
            CanonicalPath::new("simple_require_filepath_transforms.js"),
        ]
    );
}

#[tokio::test]
async fn test_repeated_requires_are_included_once() {
    let output = bundle_fixture("duplicate_require_statements.js", BundleOptions::default()).await;

    assert_eq!(output.code.content, "var first = 1;\n\nvar dup = true;\n");
}

#[tokio::test]
async fn test_circular_requires() {
    let output = bundle_fixture("circular_require_statements.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var b = 'b';\n\nvar a = 'a';\n\nvar circ = true;\n"
    );
    assert_eq!(
        output.cycle_breaks,
        vec![(
            CanonicalPath::new("tests/fixtures/circular/b.js"),
            CanonicalPath::new("tests/fixtures/circular/a.js"),
        )]
    );
}

#[tokio::test]
async fn test_relative_requires() {
    let output = bundle_fixture("relative_require_statements.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var shallow = 1;\n\nvar deep = 2;\n\nvar rel = true;\n"
    );
}

#[tokio::test]
async fn test_relative_requires_with_base_path() {
    let output =
        bundle_from_base("relative_requires_with_basepath.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var shallow = 1;\n\nvar deep = 2;\n\nvar first = 1;\n\nvar based = true;\n"
    );
}

#[tokio::test]
async fn test_custom_separator() {
    let options = BundleOptions::default().with_separator("!!!!");
    let output = bundle_fixture("simple_require_statements.js", options).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n!!!!var second = first + 1;\n!!!!\nvar simple = true;\n"
    );
}

#[tokio::test]
async fn test_code_between_requires_keeps_its_order() {
    let output =
        bundle_fixture("respects_code_order_between_requires.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar shallow = 1;\n\nvar before = 0;\nvar between = 1;\nvar after = 2;\n"
    );
}

#[tokio::test]
async fn test_glob_requires_whole_directory() {
    let output = bundle_fixture("glob_require.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var globA = 'a';\n\nvar globB = 'b';\n\nvar globbed = true;\n"
    );
}

#[tokio::test]
async fn test_spaces_within_require() {
    let output =
        bundle_fixture("spaces_allowed_within_require_statement.js", BundleOptions::default()).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar shallow = 1;\n\nvar spaced = true;\n"
    );
}

#[tokio::test]
async fn test_extension_is_optional() {
    let output = bundle_fixture("optional_dotjs.js", BundleOptions::default()).await;

    assert_eq!(output.code.content, "var first = 1;\n\nvar dotless = true;\n");
}

#[tokio::test]
async fn test_process_as_template() {
    let values = json!({"foo": 5, "bar": "baz"});
    let options = BundleOptions::default().with_process(ProcessOption::from_value(values).unwrap());
    let output = bundle_fixture("process_as_template.js", options).await;

    assert_eq!(
        output.code.content,
        "var first = 1;\n\nvar foo = 5;\nvar bar = 'baz';\n"
    );
}

#[tokio::test]
async fn test_process_with_function() {
    let options = BundleOptions::default().with_process(ProcessOption::function(
        |path: &CanonicalPath, content: &str| -> Result<String, BoxError> {
            Ok(format!("// Source for: {}\n{}", path, content))
        },
    ));
    let output = bundle_fixture("simple_require.js", options).await;

    assert_eq!(
        output.code.content,
        "// Source for: tests/fixtures/lib/first.js\nvar first = 1;\n\n// Source for: tests/fixtures/simple_require.js\nvar simple = 'require';\n"
    );
}

#[tokio::test]
async fn test_unknown_template_value_fails() {
    let options = BundleOptions::default().with_process(ProcessOption::from_value(json!({"foo": 5})).unwrap());
    let provider = TokioFileSystemService::new(manifest_dir());
    let service = NeuterBuildService::new(Arc::new(provider), options);

    let err = service
        .bundle(&CanonicalPath::new("tests/fixtures/process_as_template.js"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bar"));
    assert!(matches!(err, NeuterError::Processing { .. }));
}

#[tokio::test]
async fn test_missing_entry() {
    let provider = TokioFileSystemService::new(manifest_dir());
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());

    let err = service
        .bundle(&CanonicalPath::new("tests/fixtures/does_not_exist.js"))
        .await
        .unwrap_err();

    assert!(matches!(err, NeuterError::MissingEntry(_)));
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let options = || {
        BundleOptions::default().with_output("circular.js", Some("circular.js.map".to_string()))
    };
    let first = bundle_fixture("circular_require_statements.js", options()).await;
    let second = bundle_fixture("circular_require_statements.js", options()).await;

    assert_eq!(first.code, second.code);
    assert_eq!(first.inclusion_order, second.inclusion_order);
    assert!(first.map.is_some());
    assert_eq!(first.map, second.map);
}

#[tokio::test]
async fn test_concurrent_runs_share_cache_not_state() {
    let provider = MemorySourceProvider::from_files([
        ("one.js", "require('./shared');\nrequire('./one_only');\none();\n"),
        ("two.js", "require('./shared');\ntwo();\n"),
        ("shared.js", "shared();\n"),
        ("one_only.js", "oneOnly();\n"),
    ]);
    let cache = Arc::new(ScanCache::new());
    let service = Arc::new(
        NeuterBuildService::new(Arc::new(provider), BundleOptions::default())
            .with_scan_cache(Arc::clone(&cache)),
    );

    let handles: Vec<_> = ["one.js", "two.js", "one.js", "two.js"]
        .into_iter()
        .map(|entry| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.bundle(&CanonicalPath::new(entry)).await })
        })
        .collect();

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outputs[0].code.content, "shared();\n\noneOnly();\n\none();\n");
    assert_eq!(outputs[1].code.content, "shared();\n\ntwo();\n");
    assert_eq!(outputs[0].code, outputs[2].code);
    assert_eq!(outputs[1].code, outputs[3].code);
    assert_eq!(cache.len(), 4);
}

#[tokio::test]
async fn test_declaration_line_removed_dependency_first() {
    let provider = MemorySourceProvider::from_files([
        ("a.js", "var b = require('./b');\nconsole.log('a');"),
        ("b.js", "console.log('b');"),
    ]);
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());
    let output = service.bundle(&CanonicalPath::new("a.js")).await.unwrap();

    assert_eq!(output.code.content, "console.log('b');\nconsole.log('a');");
}

#[tokio::test]
async fn test_code_sharing_the_line_is_preserved() {
    let provider = MemorySourceProvider::from_files([
        ("a.js", "foo(); require('./b'); bar();\nvar n = require('./b').length;\n"),
        ("b.js", "b();"),
    ]);
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());
    let output = service.bundle(&CanonicalPath::new("a.js")).await.unwrap();

    assert_eq!(output.code.content, "b();\nfoo(); bar();\nvar n = .length;\n");
}

#[tokio::test]
async fn test_skipped_module_required_twice() {
    let provider = MemorySourceProvider::from_files([
        ("main.js", "require('./a');\nvar v = require('./vendor');\nmain(v);\n"),
        ("a.js", "require('./vendor');\na();\n"),
        ("vendor.js", "vendor();\n"),
    ]);
    let options = BundleOptions::default().with_skip_path("vendor.js");
    let service = NeuterBuildService::new(Arc::new(provider), options);
    let output = service.bundle(&CanonicalPath::new("main.js")).await.unwrap();

    assert_eq!(output.code.content, "a();\n\nmain(v);\n");
    assert!(!output.code.content.contains("vendor"));
    assert!(!output.inclusion_order.contains(&CanonicalPath::new("vendor.js")));
}

#[tokio::test]
async fn test_byte_order_mark_does_not_hide_requires() {
    let provider = MemorySourceProvider::from_files([
        ("a.js", "\u{FEFF}require('./b');\na();\n"),
        ("b.js", "b();\n"),
    ]);
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());
    let output = service.bundle(&CanonicalPath::new("a.js")).await.unwrap();

    assert_eq!(
        output.inclusion_order,
        vec![CanonicalPath::new("b.js"), CanonicalPath::new("a.js")]
    );
    assert_eq!(output.code.content, "b();\n\na();\n");
}

#[tokio::test]
async fn test_malformed_pattern_is_left_in_place() {
    let provider = MemorySourceProvider::from_files([("main.js", "var x = require('./data[');\nmain();\n")]);
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());
    let output = service.bundle(&CanonicalPath::new("main.js")).await.unwrap();

    assert_eq!(output.code.content, "var x = require('./data[');\nmain();\n");
}

#[tokio::test]
async fn test_glob_skips_sibling_input_maps() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("gen")).unwrap();
    std::fs::write(root.join("main.js"), "require('./gen/*');\nmain();\n").unwrap();
    std::fs::write(root.join("gen/a.js"), "a();\n").unwrap();
    std::fs::write(
        root.join("gen/a.js.map"),
        r#"{"version":3,"sources":["a.ts"],"names":[],"mappings":"AAAA"}"#,
    )
    .unwrap();

    let service = NeuterBuildService::new(
        Arc::new(TokioFileSystemService::new(root)),
        BundleOptions::default(),
    );
    let output = service.bundle(&CanonicalPath::new("main.js")).await.unwrap();

    assert_eq!(
        output.inclusion_order,
        vec![CanonicalPath::new("gen/a.js"), CanonicalPath::new("main.js")]
    );
    assert_eq!(output.code.content, "a();\n\nmain();\n");
}
