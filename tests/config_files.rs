// tests/config_files.rs

use std::fs;
use std::io::Write;

use tempfile::{tempdir, NamedTempFile};

use docpipe::config::{
    bootstrap, load_and_validate, resolve_source, ConfigSource, Template, CONFIG_FILENAMES,
};
use docpipe::errors::DocpipeError;
use docpipe::pipeline::{LoaderConfig, RendererConfig};

#[test]
fn test_full_file_loads_with_origin() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[loaders]]
type = "python"
modules = ["pkg.a"]
search_path = ["src"]

[[processors]]
type = "filter"
exclude = ["*._*"]

[renderer]
type = "hugo"
port = 4000

[renderer.markdown]
filename = "reference.md"
render_toc = true
"#
    )
    .unwrap();

    let loaded = load_and_validate(&ConfigSource::File(file.path().to_path_buf())).unwrap();

    assert_eq!(loaded.origin.as_deref(), Some(file.path()));
    assert_eq!(loaded.pipeline.processors.len(), 1);
    match &loaded.pipeline.loaders[0] {
        LoaderConfig::Python(l) => assert_eq!(l.modules, vec!["pkg.a"]),
        other => panic!("Expected python loader, got: {:?}", other),
    }
    match &loaded.pipeline.renderer {
        RendererConfig::Hugo(h) => {
            assert_eq!(h.port, 4000);
            assert!(h.markdown.render_toc);
            assert_eq!(h.markdown.filename.to_str(), Some("reference.md"));
        }
        other => panic!("Expected hugo renderer, got: {:?}", other),
    }
}

#[test]
fn test_unknown_stage_type_is_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[renderer]\ntype = \"sphinx\"\n").unwrap();

    match load_and_validate(&ConfigSource::File(file.path().to_path_buf())) {
        Err(DocpipeError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_module_name_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[loaders]]
type = "python"
modules = ["pkg..a"]
"#
    )
    .unwrap();

    match load_and_validate(&ConfigSource::File(file.path().to_path_buf())) {
        Err(DocpipeError::ConfigError(msg)) => assert!(msg.contains("pkg..a")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_file_returns_config_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    match load_and_validate(&ConfigSource::File(missing)) {
        Err(DocpipeError::ConfigError(msg)) => assert!(msg.contains("absent.toml")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_inline_table_has_no_origin() {
    let source = resolve_source(
        Some(r#"{ renderer = { type = "listing" } }"#),
        true,
        std::path::Path::new("/nonexistent"),
    )
    .unwrap();
    assert!(matches!(source, ConfigSource::Inline(_)));

    let loaded = load_and_validate(&source).unwrap();
    assert_eq!(loaded.origin, None);
    assert_eq!(loaded.pipeline.renderer.kind(), "listing");
    // Omitted sections keep their defaults.
    assert_eq!(loaded.pipeline.loaders.len(), 1);
}

#[test]
fn test_discovery_precedence() {
    let dir = tempdir().unwrap();

    match resolve_source(None, true, dir.path()) {
        Err(DocpipeError::ConfigNotFound(tried)) => assert_eq!(tried.len(), 2),
        other => panic!("Expected ConfigNotFound, got: {:?}", other),
    }

    fs::write(dir.path().join(CONFIG_FILENAMES[1]), "").unwrap();
    assert_eq!(
        resolve_source(None, true, dir.path()).unwrap(),
        ConfigSource::File(dir.path().join(".docpipe.toml"))
    );

    fs::write(dir.path().join(CONFIG_FILENAMES[0]), "").unwrap();
    assert_eq!(
        resolve_source(None, true, dir.path()).unwrap(),
        ConfigSource::File(dir.path().join("docpipe.toml"))
    );

    // Loader overrides skip discovery entirely.
    assert_eq!(
        resolve_source(None, false, dir.path()).unwrap(),
        ConfigSource::Default
    );
}

#[test]
fn test_bootstrap_writes_loadable_config_once() {
    let dir = tempdir().unwrap();

    let path = bootstrap(dir.path(), Template::Mkdocs).unwrap();
    assert_eq!(path, dir.path().join("docpipe.toml"));

    let loaded = load_and_validate(&ConfigSource::File(path.clone())).unwrap();
    assert_eq!(loaded.pipeline.renderer.kind(), "mkdocs");

    match bootstrap(dir.path(), Template::Default) {
        Err(DocpipeError::ConfigError(msg)) => assert!(msg.contains("already exists")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_bootstrap_refuses_when_hidden_config_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".docpipe.toml"), "").unwrap();
    assert!(bootstrap(dir.path(), Template::Hugo).is_err());
    assert!(!dir.path().join("docpipe.toml").exists());
}
