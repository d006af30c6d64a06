#![allow(dead_code)]

use std::sync::Arc;

use docpipe::fs::mock::MockFileSystem;
use docpipe::pipeline::PipelineRunner;

pub use docpipe_test_utils::{init_tracing, wait_until, with_timeout};

/// A small Python source tree under `/proj/src`:
///
/// ```text
/// /proj/src/pkg/__init__.py
/// /proj/src/pkg/a.py
/// /proj/src/pkg/b.py
/// /proj/src/tool.py
/// ```
pub fn python_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/pkg/__init__.py", "\"\"\"The package. See #pkg.a.\"\"\"\n");
    fs.add_file("/proj/src/pkg/a.py", "\"\"\"Module A.\"\"\"\n\ndef f():\n    pass\n");
    fs.add_file("/proj/src/pkg/b.py", "\"\"\"Module B.\"\"\"\n");
    fs.add_file("/proj/src/tool.py", "\"\"\"A tool.\"\"\"\n");
    fs
}

pub fn runner_for(fs: &MockFileSystem) -> PipelineRunner {
    PipelineRunner::new(Arc::new(fs.clone()))
}
