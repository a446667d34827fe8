//! Integration tests for identity resolution across libraries.
//!
//! Builds library trees on disk and checks:
//! - Priority between libraries and tiers
//! - Hierarchy levels overriding shallower ones
//! - `$merge`, `$replace`, `$unset` and `@env` annotations in files
//! - Fatal format and command errors

use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::Path;
use tierconf::cache::{ConfigCache, DEFAULT_POOL};
use tierconf::config::{AdapterError, AdapterRegistry, FormatAdapter, Libraries, Library, Tier};
use tierconf::error::ConfigError;
use tierconf::store::{ConfigStore, MemoryStore};
use tempfile::TempDir;

/// Write `content` to `dir/name`, creating `dir`.
fn write(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

/// Library named `name` rooted at `root/name` with an `identities` config dir.
fn library(root: &Path, name: &str, tier: Tier) -> Library {
    Library::new(name, root.join(name))
        .with_config("{library}/identities")
        .with_tier(tier)
}

fn identities(root: &Path, name: &str) -> std::path::PathBuf {
    root.join(name).join("identities")
}

fn store(libraries: Libraries, environment: &str) -> ConfigStore {
    ConfigStore::with_json(libraries).with_backing(MemoryStore::new(environment))
}

#[test]
fn test_higher_priority_library_wins_at_same_depth() {
    let temp = TempDir::new().unwrap();
    write(
        &identities(temp.path(), "vendor"),
        "properties.json",
        r#"{"service": "unknown"}"#,
    );
    write(
        &identities(temp.path(), "app"),
        "properties.json",
        r#"{"service": "configured"}"#,
    );

    let libraries = Libraries::new()
        .with(library(temp.path(), "app", Tier::Default))
        .with(library(temp.path(), "vendor", Tier::Normal));
    let mut store = store(libraries, "test");
    store.init(Some("IPFTest")).unwrap();

    assert_eq!(
        store.get("properties.service", Value::Null, None).unwrap(),
        json!("configured")
    );
}

#[test]
fn test_deeper_level_overrides_shallower() {
    let temp = TempDir::new().unwrap();
    let base = identities(temp.path(), "app");
    write(
        &base.join("X"),
        "settings.json",
        r#"{"shared": "from X", "only_x": true}"#,
    );
    write(
        &base.join("X/Y"),
        "settings.json",
        r#"{"shared": "from X/Y", "only_y": true}"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("X.Y")).unwrap();

    let settings = store.get("settings", Value::Null, None).unwrap();
    assert_eq!(
        settings,
        json!({"shared": "from X/Y", "only_x": true, "only_y": true})
    );
}

#[test]
fn test_missing_level_stops_descent() {
    let temp = TempDir::new().unwrap();
    let base = identities(temp.path(), "app");
    write(&base, "root.json", r#"{"level": 0}"#);
    write(&base.join("Other/B"), "deep.json", r#"{"level": 2}"#);

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("A.B")).unwrap();

    let tree = store.snapshot(None).unwrap();
    assert_eq!(Value::Object(tree), json!({"root": {"level": 0}}));
}

#[test]
fn test_library_load_order() {
    let temp = TempDir::new().unwrap();
    for name in ["deferred", "normal", "second", "app"] {
        write(
            &identities(temp.path(), name),
            "loaded.json",
            &format!(r#"{{"by": "{name}"}}"#),
        );
    }

    let registered = || {
        Libraries::new()
            .with(library(temp.path(), "deferred", Tier::Deferred))
            .with(library(temp.path(), "normal", Tier::Normal))
            .with(library(temp.path(), "second", Tier::Normal))
            .with(library(temp.path(), "app", Tier::Default))
    };

    let mut all = store(registered(), "test");
    assert_eq!(all.get("loaded.by", Value::Null, None).unwrap(), json!("app"));

    let mut libraries = registered();
    libraries.remove("app");
    let mut without_default = store(libraries, "test");
    assert_eq!(
        without_default.get("loaded.by", Value::Null, None).unwrap(),
        json!("normal")
    );

    let mut libraries = registered();
    libraries.remove("app");
    libraries.remove("normal");
    libraries.remove("second");
    let mut deferred_only = store(libraries, "test");
    assert_eq!(
        deferred_only.get("loaded.by", Value::Null, None).unwrap(),
        json!("deferred")
    );
}

#[test]
fn test_commands_across_levels() {
    let temp = TempDir::new().unwrap();
    let base = identities(temp.path(), "app");
    write(
        &base.join("Level1"),
        "team.json",
        r#"{
            "developers": ["ana", "bo"],
            "owners": ["carl"],
            "retired": {"name": "dee"},
            "limits": {"cpu": 1, "memory": 512}
        }"#,
    );
    write(
        &base.join("Level1/Level2"),
        "team.json",
        r#"{
            "developers$merge": ["cy"],
            "owners": ["eve"],
            "limits$replace": {"cpu": 4}
        }"#,
    );
    write(
        &base.join("Level1/Level2/Level3"),
        "team.json",
        r#"{"retired$unset": null}"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("Level1.Level2.Level3")).unwrap();

    assert_eq!(
        store.get("team", Value::Null, None).unwrap(),
        json!({
            "developers": ["ana", "bo", "cy"],
            "owners": ["eve"],
            "limits": {"cpu": 4}
        })
    );
}

#[test]
fn test_environment_annotations() {
    let temp = TempDir::new().unwrap();
    let base = identities(temp.path(), "app");
    write(
        &base,
        "connections.json",
        r#"{
            "default": {"host": "localhost"},
            "default@production": {"host": "db.internal"},
            "replica@production": {"host": "replica.internal"}
        }"#,
    );
    write(&base, "debug@development.json", r#"{"enabled": true}"#);

    let registered = || Libraries::new().with(library(temp.path(), "app", Tier::Default));

    let mut production = store(registered(), "production");
    production.init(Some("App")).unwrap();
    assert_eq!(
        production
            .get("connections.default.host", Value::Null, None)
            .unwrap(),
        json!("db.internal")
    );
    assert_eq!(
        production
            .get("connections.replica.host", Value::Null, None)
            .unwrap(),
        json!("replica.internal")
    );
    assert_eq!(
        production.get("debug", json!("off"), None).unwrap(),
        json!("off")
    );

    let mut development = store(registered(), "development");
    development.init(Some("App")).unwrap();
    let connections = development.get("connections", Value::Null, None).unwrap();
    assert_eq!(connections, json!({"default": {"host": "localhost"}}));
    assert_eq!(
        development.get("debug.enabled", Value::Null, None).unwrap(),
        json!(true)
    );
}

#[test]
fn test_backslashes_read_as_written() {
    let temp = TempDir::new().unwrap();
    write(
        &identities(temp.path(), "app"),
        "classes.json",
        r#"{"handler": "app\controllers\Main", "quote": "say \"hi\""}"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("App")).unwrap();

    assert_eq!(
        store.get("classes.handler", Value::Null, None).unwrap(),
        json!(r"app\controllers\Main")
    );
    assert_eq!(
        store.get("classes.quote", Value::Null, None).unwrap(),
        json!("say \"hi\"")
    );
}

#[test]
fn test_scalar_file_is_format_error() {
    for content in ["\"just a string\"", "true"] {
        let temp = TempDir::new().unwrap();
        let dir = identities(temp.path(), "app");
        write(&dir, "broken.json", content);

        let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
        let mut store = store(libraries, "test");

        match store.init(Some("App")) {
            Err(ConfigError::Format { format, path }) => {
                assert_eq!(format, "JSON");
                assert_eq!(path, dir.join("broken.json"));
            }
            other => panic!("expected format error, got {other:?}"),
        }
        assert!(!store.is_initialized());
    }
}

/// Claims `.json` files but cannot read any of them.
struct LockedJson;

impl FormatAdapter for LockedJson {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn is_supported(&self, filename: &str) -> bool {
        filename.ends_with(".json")
    }

    fn read(&self, _path: &Path) -> Result<Value, AdapterError> {
        Err(AdapterError::ReadFailed(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }
}

#[test]
fn test_unreadable_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let dir = identities(temp.path(), "app");
    write(&dir, "locked.json", r#"{"secret": true}"#);

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = ConfigStore::new(libraries, AdapterRegistry::new().with(LockedJson))
        .with_backing(MemoryStore::new("test"));

    let err = store.init(Some("App")).unwrap_err();
    match &err {
        ConfigError::Io { path, source } => {
            assert_eq!(*path, dir.join("locked.json"));
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected io error, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        format!("Could not load identity from '{}'", dir.join("locked.json").display())
    );
    assert!(!store.is_initialized());
    assert!(store.cache().read(DEFAULT_POOL, "test@App").is_none());
}

#[cfg(unix)]
#[test]
fn test_permission_denied_file_is_io_error() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let dir = identities(temp.path(), "app");
    write(&dir, "locked.json", r#"{"secret": true}"#);
    let path = dir.join("locked.json");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
    // Privileged users read through the mode bits.
    if fs::read(&path).is_ok() {
        return;
    }

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    match store.init(Some("App")) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
    assert!(!store.is_initialized());
}

#[test]
fn test_invalid_utf8_file_is_format_error() {
    let temp = TempDir::new().unwrap();
    let dir = identities(temp.path(), "app");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("binary.json"), b"{\"a\": \"\xff\xfe\"}").unwrap();

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    match store.init(Some("App")) {
        Err(ConfigError::Format { format, path }) => {
            assert_eq!(format, "JSON");
            assert_eq!(path, dir.join("binary.json"));
        }
        other => panic!("expected format error, got {other:?}"),
    }
}

#[test]
fn test_annotated_key_before_plain_twin() {
    let temp = TempDir::new().unwrap();
    let base = identities(temp.path(), "app");
    write(&base, "team.json", r#"{"developers": ["ana"], "owners": ["bo"]}"#);
    write(
        &base.join("App"),
        "team.json",
        r#"{
            "developers$merge": ["cy"],
            "developers": ["dee"],
            "owners": ["eve"],
            "owners$merge": ["fay"]
        }"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("App")).unwrap();

    let team = store.get("team", Value::Null, None).unwrap();
    assert_eq!(team, json!({"developers": ["dee"], "owners": ["eve", "fay"]}));
}

#[test]
fn test_trailing_backslashes_resolve() {
    let temp = TempDir::new().unwrap();
    write(
        &identities(temp.path(), "app"),
        "paths.json",
        r#"{"bare": "C:\temp\", "doubled": "C:\\temp\\"}"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("App")).unwrap();

    assert_eq!(store.get("paths.bare", Value::Null, None).unwrap(), json!(r"C:\temp\"));
    assert_eq!(store.get("paths.doubled", Value::Null, None).unwrap(), json!(r"C:\temp\"));
}

#[test]
fn test_empty_containers_are_valid() {
    let temp = TempDir::new().unwrap();
    let dir = identities(temp.path(), "app");
    write(&dir, "empty.json", "{}");
    write(&dir, "list.json", "[]");

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("App")).unwrap();

    assert_eq!(store.get("empty", Value::Null, None).unwrap(), json!({}));
    assert_eq!(store.get("list", Value::Null, None).unwrap(), json!([]));
}

#[test]
fn test_unknown_command_aborts_init() {
    let temp = TempDir::new().unwrap();
    write(
        &identities(temp.path(), "app"),
        "team.json",
        r#"{"developers$frobnicate": ["ana"]}"#,
    );

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");

    let err = store.init(Some("App")).unwrap_err();
    match &err {
        ConfigError::UnknownCommand { command, key } => {
            assert_eq!(command, "frobnicate");
            assert_eq!(key, "developers");
        }
        other => panic!("expected unknown command, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Unknown command `frobnicate` provided for `developers` key"
    );
}

#[test]
fn test_files_without_adapter_are_ignored() {
    let temp = TempDir::new().unwrap();
    let dir = identities(temp.path(), "app");
    write(&dir, "notes.txt", "not configuration");
    write(&dir, "app.json", r#"{"name": "demo"}"#);
    fs::create_dir_all(dir.join("nested.json")).unwrap();

    let libraries = Libraries::new().with(library(temp.path(), "app", Tier::Default));
    let mut store = store(libraries, "test");
    store.init(Some("App")).unwrap();

    assert_eq!(
        Value::Object(store.snapshot(None).unwrap()),
        json!({"app": {"name": "demo"}})
    );
}
