use neuter::core::{BundleOptions, BundleService, CanonicalPath, NeuterBuildService};
use neuter::infrastructure::{MemorySourceProvider, TokioFileSystemService};
use neuter::core::SourceFile;
use neuter::NeuterError;
use std::path::PathBuf;
use std::sync::Arc;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[tokio::test]
async fn test_source_map_generated() {
    let options = BundleOptions::default()
        .with_output("source_maps.js", Some("source_maps.map".to_string()));
    let provider = TokioFileSystemService::new(manifest_dir());
    let service = NeuterBuildService::new(Arc::new(provider), options);

    let output = service
        .bundle(&CanonicalPath::new("tests/fixtures/glob_require.js"))
        .await
        .unwrap();

    assert_eq!(
        output.code.content,
        "var globA = 'a';\n\nvar globB = 'b';\n\nvar globbed = true;\n\n//# sourceMappingURL=source_maps.map"
    );
    let names: Vec<&str> = output.artifacts().map(|a| a.path.as_str()).collect();
    assert_eq!(names, vec!["source_maps.js", "source_maps.map"]);

    let map_file = output.map.unwrap();
    let map = sourcemap::SourceMap::from_slice(map_file.content.as_bytes()).unwrap();

    assert_eq!(map.get_file(), Some("source_maps.js"));
    let sources: Vec<&str> = map.sources().collect();
    assert_eq!(
        sources,
        vec![
            "tests/fixtures/glob/a.js",
            "tests/fixtures/glob/b.js",
            "tests/fixtures/glob_require.js",
        ]
    );

    let token = map.lookup_token(4, 0).unwrap();
    assert_eq!(token.get_source(), Some("tests/fixtures/glob_require.js"));
    assert_eq!((token.get_src_line(), token.get_src_col()), (1, 0));

    let token = map.lookup_token(2, 4).unwrap();
    assert_eq!(token.get_source(), Some("tests/fixtures/glob/b.js"));
    assert_eq!(token.get_src_line(), 0);
}

#[tokio::test]
async fn test_map_composes_through_sibling_map_on_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("build")).unwrap();
    std::fs::write(root.join("main.js"), "require('./build/gen');\nmain();\n").unwrap();
    std::fs::write(root.join("build/gen.js"), "one();\ntwo();\n").unwrap();
    std::fs::write(
        root.join("build/gen.js.map"),
        r#"{"version":3,"sources":["../src/gen.ts"],"sourcesContent":["// ts"],"names":[],"mappings":"AAAA;AAEA"}"#,
    )
    .unwrap();

    let options = BundleOptions::default().with_output("out/app.js", Some("out/app.js.map".to_string()));
    let service = NeuterBuildService::new(Arc::new(TokioFileSystemService::new(root)), options);
    let output = service.bundle(&CanonicalPath::new("main.js")).await.unwrap();

    assert!(output.code.content.ends_with("\n//# sourceMappingURL=app.js.map"));

    let map_file = output.map.unwrap();
    let map = sourcemap::SourceMap::from_slice(map_file.content.as_bytes()).unwrap();
    let token = map.lookup_token(1, 0).unwrap();
    assert_eq!(token.get_source(), Some("src/gen.ts"));
    assert_eq!(token.get_src_line(), 2);

    let token = map.lookup_token(3, 0).unwrap();
    assert_eq!(token.get_source(), Some("main.js"));
    assert_eq!(token.get_src_line(), 1);
}

#[tokio::test]
async fn test_malformed_input_map_is_reported() {
    let mut provider = MemorySourceProvider::new();
    provider.insert_file(SourceFile::new(CanonicalPath::new("main.js"), "main();").with_input_map("{oops"));

    let options = BundleOptions::default().with_output("out.js", Some("out.map".to_string()));
    let service = NeuterBuildService::new(Arc::new(provider), options);
    let err = service.bundle(&CanonicalPath::new("main.js")).await.unwrap_err();

    assert!(matches!(err, NeuterError::SourceMap { .. }));
}

#[tokio::test]
async fn test_no_map_without_names() {
    let provider = MemorySourceProvider::from_files([("main.js", "main();\n")]);
    let service = NeuterBuildService::new(Arc::new(provider), BundleOptions::default());
    let output = service.bundle(&CanonicalPath::new("main.js")).await.unwrap();

    assert!(output.map.is_none());
    assert!(!output.code.content.contains("sourceMappingURL"));
    assert_eq!(output.artifacts().count(), 1);
}
