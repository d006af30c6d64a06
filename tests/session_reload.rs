// tests/session_reload.rs

mod common;
use crate::common::{init_tracing, wait_until, with_timeout};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::{tempdir, TempDir};

use docpipe::config::{load_and_validate, ConfigSource, OverrideSet};
use docpipe::engine::{BuildPipeline, LoopEvent, RenderSession, ServeLoop, ServeOptions};
use docpipe::errors::{DocpipeError, Result};
use docpipe::pipeline::{LoaderConfig, PipelineRunner, PreviewServer};
use docpipe::watch::WatchSet;
use docpipe_test_utils::fakes::{FakePreviewServer, FakeWatcher};

/// A project on disk: `good.py`, `other.py` and a `docpipe.toml`.
struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("good.py"), "\"\"\"Good module.\"\"\"\n").unwrap();
        fs::write(root.join("other.py"), "\"\"\"Other module.\"\"\"\n").unwrap();
        Self { _dir: dir, root }
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("docpipe.toml")
    }

    fn write_config(&self, modules: &str, renderer: &str) {
        let root = self.root.display();
        fs::write(
            self.config_path(),
            format!(
                "[[loaders]]\ntype = \"python\"\nmodules = {modules}\nsearch_path = ['{root}']\n\n\
                 [renderer]\n{renderer}\n"
            ),
        )
        .unwrap();
    }

    fn markdown(&self) -> String {
        format!("type = \"markdown\"\nfilename = '{}'", self.root.join("api.md").display())
    }

    fn session(&self, overrides: &OverrideSet) -> RenderSession {
        let loaded = load_and_validate(&ConfigSource::File(self.config_path())).unwrap();
        RenderSession::new(loaded, overrides, PipelineRunner::default()).unwrap()
    }

    fn watch_set(&self, files: &[&str]) -> WatchSet {
        files.iter().map(|f| self.root.join(f)).collect()
    }
}

fn modules_of(session: &RenderSession) -> Vec<String> {
    match &session.config().pipeline.loaders[0] {
        LoaderConfig::Python(l) => l.modules.clone(),
        other => panic!("Expected python loader, got: {:?}", other),
    }
}

#[test]
fn fixed_config_is_picked_up_after_failed_first_render() {
    init_tracing();
    let project = Project::new();
    project.write_config("[\"typo\"]", &project.markdown());
    let mut session = project.session(&OverrideSet::default());

    let err = session.render().unwrap_err();
    assert!(err.is_recoverable(), "got {:?}", err);
    assert_eq!(session.fallback_watch_set(), project.watch_set(&["docpipe.toml"]));

    project.write_config("[\"good\"]", &project.markdown());
    let watch_set = session.render().unwrap();

    assert_eq!(watch_set, project.watch_set(&["docpipe.toml", "good.py"]));
    let out = fs::read_to_string(project.root.join("api.md")).unwrap();
    assert!(out.contains("Good module."));
}

#[test]
fn broken_edit_keeps_previous_config_and_module_change_drops_old_files() {
    init_tracing();
    let project = Project::new();
    project.write_config("[\"good\"]", &project.markdown());
    let mut session = project.session(&OverrideSet::default());

    assert_eq!(
        session.render().unwrap(),
        project.watch_set(&["docpipe.toml", "good.py"])
    );

    fs::write(project.config_path(), "[[loaders]\nthis is not toml").unwrap();
    match session.render() {
        Err(DocpipeError::ConfigReloadFailure { path, source }) => {
            assert_eq!(path, project.config_path());
            assert!(matches!(*source, DocpipeError::TomlError(_)), "got {:?}", source);
        }
        other => panic!("Expected ConfigReloadFailure, got: {:?}", other),
    }
    assert_eq!(modules_of(&session), vec!["good"]);

    project.write_config("[\"other\"]", &project.markdown());
    let watch_set = session.render().unwrap();
    assert_eq!(watch_set, project.watch_set(&["docpipe.toml", "other.py"]));
    assert!(!watch_set.contains(&project.root.join("good.py")));
}

#[test]
fn overrides_are_reapplied_to_every_reload() {
    init_tracing();
    let project = Project::new();
    project.write_config("[\"typo\"]", &project.markdown());
    let overrides = OverrideSet {
        target_modules: vec!["good".into()],
        render_toc: Some(true),
        ..OverrideSet::default()
    };
    let mut session = project.session(&overrides);
    session.render().unwrap();

    // The file still names the wrong module; the override keeps winning.
    project.write_config("[\"typo\", \"other\"]", &project.markdown());
    assert_eq!(
        session.render().unwrap(),
        project.watch_set(&["docpipe.toml", "good.py"])
    );
    assert_eq!(modules_of(&session), vec!["good"]);

    // A renderer without a TOC cannot take the override any more.
    project.write_config("[\"good\"]", "type = \"listing\"");
    match session.render() {
        Err(DocpipeError::ConfigReloadFailure { source, .. }) => {
            assert!(
                matches!(*source, DocpipeError::MissingCapableStage { .. }),
                "got {:?}",
                source
            );
        }
        other => panic!("Expected ConfigReloadFailure, got: {:?}", other),
    }
    assert_eq!(session.config().pipeline.renderer.kind(), "markdown");
}

/// A real session whose output is "served" by a fake preview server.
struct ServedSession {
    session: RenderSession,
    server: FakePreviewServer,
}

impl BuildPipeline for ServedSession {
    fn render(&mut self) -> Result<WatchSet> {
        self.session.render()
    }

    fn fallback_watch_set(&self) -> WatchSet {
        self.session.fallback_watch_set()
    }

    fn renderer_kind(&self) -> &str {
        self.session.renderer_kind()
    }

    fn preview_server(&self) -> Option<&dyn PreviewServer> {
        Some(&self.server)
    }
}

#[tokio::test]
async fn serve_loop_recovers_once_the_config_file_is_fixed() {
    init_tracing();
    let project = Project::new();
    project.write_config("[\"typo\"]", &project.markdown());

    let server = FakePreviewServer::new();
    let server_handle = server.handle();
    let pipeline = ServedSession {
        session: project.session(&OverrideSet::default()),
        server,
    };
    let watcher = FakeWatcher::new();
    let watcher_handle = watcher.handle();
    let options = ServeOptions {
        poll_interval: Duration::from_millis(10),
        ..ServeOptions::default()
    };

    let serve_loop = ServeLoop::new(pipeline, watcher, options).unwrap();
    let tx = serve_loop.sender();
    let config_path = project.config_path();
    let fixed = project.markdown();

    let driver = tokio::spawn({
        let watcher_handle = watcher_handle.clone();
        let server_handle = server_handle.clone();
        async move {
            with_timeout(wait_until(|| watcher_handle.registrations() == 1)).await;
            assert_eq!(server_handle.starts(), 0);

            let root = config_path.parent().map(Path::to_path_buf).unwrap();
            fs::write(
                &config_path,
                format!(
                    "[[loaders]]\ntype = \"python\"\nmodules = [\"good\"]\nsearch_path = ['{}']\n\n[renderer]\n{fixed}\n",
                    root.display()
                ),
            )
            .unwrap();
            watcher_handle.emit(&config_path.display().to_string());

            with_timeout(wait_until(|| server_handle.is_running())).await;
            tx.send(LoopEvent::ShutdownRequested).await.unwrap();
        }
    });

    with_timeout(serve_loop.run()).await.unwrap();
    driver.await.unwrap();

    assert_eq!(
        watcher_handle.watched(),
        vec![
            project.watch_set(&["docpipe.toml"]),
            project.watch_set(&["docpipe.toml", "good.py"]),
        ]
    );
    assert_eq!(server_handle.starts(), 1);
    assert_eq!(server_handle.terminations(), 1);
}
