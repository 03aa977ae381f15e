use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const META: &str = r#"{"packages":[{"name":"jq","version":"1.7","description":"JSON processor"},{"name":"yq"}],"sha256":"abc123","file_size":4096,"arch":"x86_64"}"#;

const ENV_VARS: &[&str] = &[
    "S3_BUCKET",
    "S3_PREFIX",
    "CDN_BASE",
    "OUTPUT_FILE",
    "CATALOG_POLICY",
    "FETCH_TIMEOUT_SECS",
];

fn put(root: &Path, key: &str, body: &str) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Bucket mirror with two bintools builds and one rpmtools OS version; everything else missing.
fn mirror() -> TempDir {
    let dir = tempdir().unwrap();
    put(dir.path(), "packages/bintools/20240101-0000/metadata.json", META);
    put(dir.path(), "packages/bintools/20240301-1200/metadata.json", META);
    put(dir.path(), "packages/rpmtools/9/b7/metadata.json", META);
    dir
}

fn write_config(dir: &Path, mirror: &Path) -> std::path::PathBuf {
    let path = dir.join("pkg-catalog.yaml");
    let yaml = format!(
        "cdn_base: https://cdn.example.com/packages\nstore:\n  type: local\n  root: {}\ndocs:\n  dir: {}\n",
        mirror.display(),
        dir.join("docs").display()
    );
    fs::write(&path, yaml).unwrap();
    path
}

fn pkg_catalog() -> Command {
    let mut cmd = Command::cargo_bin("pkg-catalog").expect("Binary exists");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn index_writes_catalog_despite_missing_tools() {
    let mirror = mirror();
    let work = tempdir().unwrap();
    let config = write_config(work.path(), mirror.path());
    let output = work.path().join("out").join("packages.json");

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("index")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("with 2 tool(s)"))
        .stdout(predicate::str::contains("bintools: 2 build(s)"));

    let catalog: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let tools = catalog["tools"].as_object().unwrap();
    assert_eq!(tools.keys().collect::<Vec<_>>(), vec!["bintools", "rpmtools"]);
    assert_eq!(catalog["cdn_base"], "https://cdn.example.com/packages");
    assert!(catalog["generated_at"].is_string());

    let builds = tools["bintools"]["builds"].as_array().unwrap();
    assert_eq!(builds[0]["version"], "20240301-1200");
    assert_eq!(
        builds[0]["download_url"],
        "https://cdn.example.com/packages/bintools/20240301-1200/bintools-20240301-1200"
    );
    assert_eq!(builds[0]["file_size"], 4096);
    assert_eq!(
        tools["rpmtools"]["os_versions"]["9"]["builds"][0]["build"],
        "b7"
    );
}

#[test]
fn index_with_latest_policy_keeps_one_build() {
    let mirror = mirror();
    let work = tempdir().unwrap();
    let config = write_config(work.path(), mirror.path());
    let output = work.path().join("packages.json");

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("index")
        .arg("--policy")
        .arg("latest")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("bintools: 1 build(s)"));
}

#[test]
fn empty_bucket_fails_without_writing() {
    let mirror = tempdir().unwrap();
    let work = tempdir().unwrap();
    let config = write_config(work.path(), mirror.path());
    let output = work.path().join("packages.json");

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("index")
        .arg("--output")
        .arg(&output)
        .assert()
        .failure();

    assert!(!output.exists());
}

#[test]
fn publish_splices_marked_pages_and_leaves_others_alone() {
    let mirror = mirror();
    let work = tempdir().unwrap();
    let config = write_config(work.path(), mirror.path());
    let output = work.path().join("packages.json");
    let docs = work.path().join("docs");
    fs::create_dir_all(&docs).unwrap();

    let bintools_page = "# bintools\n\nIntro\n\n<!-- CONTENT_START -->\nstale\n<!-- CONTENT_END -->\n\nFooter\n";
    let rpmtools_page = "# rpmtools\n\nNo markers here.\n";
    fs::write(docs.join("bintools.md"), bintools_page).unwrap();
    fs::write(docs.join("rpmtools.md"), rpmtools_page).unwrap();

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("publish")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 1 page(s), skipped 1"));

    let page = fs::read_to_string(docs.join("bintools.md")).unwrap();
    assert!(page.starts_with("# bintools\n\nIntro\n\n<!-- CONTENT_START -->\n**Build:** `20240301-1200`"));
    assert!(page.contains("| jq | 1.7 | JSON processor |"));
    assert!(page.contains("| yq | - | - |"));
    assert!(page.contains("## Previous builds"));
    assert!(page.ends_with("<!-- CONTENT_END -->\n\nFooter\n"));
    assert!(!page.contains("stale"));

    assert_eq!(fs::read_to_string(docs.join("rpmtools.md")).unwrap(), rpmtools_page);
}

#[test]
fn docs_reads_existing_catalog() {
    let mirror = mirror();
    let work = tempdir().unwrap();
    let config = write_config(work.path(), mirror.path());
    let output = work.path().join("packages.json");

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("index")
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let docs = work.path().join("site");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("rpmtools.md"),
        "<!-- CONTENT_START -->\n<!-- CONTENT_END -->\n",
    )
    .unwrap();

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("docs")
        .arg("--catalog")
        .arg(&output)
        .arg("--docs-dir")
        .arg(&docs)
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 1 page(s)"));

    let page = fs::read_to_string(docs.join("rpmtools.md")).unwrap();
    assert!(page.contains("| 9 | `b7` |"));
    assert!(page.contains("Example for OS version 9:"));
    assert!(page.contains("### 9"));
}

#[test]
fn bad_config_is_a_hard_error() {
    let work = tempdir().unwrap();
    let config = work.path().join("broken.yaml");
    fs::write(&config, "policy: sometimes\n").unwrap();

    pkg_catalog()
        .arg("--config")
        .arg(&config)
        .arg("index")
        .assert()
        .failure()
        .stderr(predicate::str::contains("policy"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use pkg_catalog::cli::{run, Cli, Commands};

    let cli = Cli {
        config: Some(std::path::PathBuf::from("dummy.yaml")),
        command: Commands::Docs {
            catalog: None,
            docs_dir: None,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
