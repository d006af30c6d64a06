// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::{OverrideSet, Template};

/// Command-line arguments for `docpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "docpipe",
    version,
    about = "Build API documentation through a load / process / render pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Config file path, or an inline TOML document.
    ///
    /// Default: `docpipe.toml`, then `.docpipe.toml` in the current
    /// directory.
    #[arg(value_name = "CONFIG")]
    pub config: Option<String>,

    /// Module to document (repeatable). Replaces the loader's module list.
    #[arg(short = 'm', long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Directory to search for modules (repeatable).
    #[arg(short = 'I', long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Read sources in legacy mode (lossy decoding).
    #[arg(long, overrides_with = "no_legacy_syntax")]
    pub legacy_syntax: bool,

    #[arg(long, overrides_with = "legacy_syntax", hide = true)]
    pub no_legacy_syntax: bool,

    /// Emit a table of contents in the Markdown output.
    #[arg(long, overrides_with = "no_render_toc")]
    pub render_toc: bool,

    /// Do not emit a table of contents.
    #[arg(long, overrides_with = "render_toc")]
    pub no_render_toc: bool,

    /// Render, then keep watching sources and serve a live preview.
    #[arg(short = 'w', long = "watch-and-serve")]
    pub watch_and_serve: bool,

    /// Open the preview in a browser (requires --watch-and-serve).
    #[arg(short = 'o', long)]
    pub open: bool,

    /// Write a starter `docpipe.toml` in the current directory.
    #[arg(long)]
    pub bootstrap: bool,

    /// Write a starter `docpipe.toml` for MkDocs.
    #[arg(long)]
    pub bootstrap_mkdocs: bool,

    /// Write a starter `docpipe.toml` for Hugo.
    #[arg(long)]
    pub bootstrap_hugo: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short = 'v', long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `-v`/`-q`, `DOCPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load, apply overrides and validate, then print the effective
    /// configuration without rendering.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// The requested starter template, if any bootstrap flag was given.
    ///
    /// Returns an error message when more than one was given.
    pub fn bootstrap_template(&self) -> Result<Option<Template>, String> {
        let requested: Vec<Template> = [
            (self.bootstrap, Template::Default),
            (self.bootstrap_mkdocs, Template::Mkdocs),
            (self.bootstrap_hugo, Template::Hugo),
        ]
        .into_iter()
        .filter_map(|(set, t)| set.then_some(t))
        .collect();

        match requested.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => Err("only one of --bootstrap, --bootstrap-mkdocs, --bootstrap-hugo may be given".into()),
        }
    }

    /// True when any option other than a bootstrap flag or logging was given.
    pub fn has_pipeline_options(&self) -> bool {
        self.config.is_some()
            || !self.overrides().is_empty()
            || self.watch_and_serve
            || self.open
            || self.dry_run
    }

    pub fn legacy_syntax(&self) -> Option<bool> {
        tri_state(self.legacy_syntax, self.no_legacy_syntax)
    }

    pub fn render_toc(&self) -> Option<bool> {
        tri_state(self.render_toc, self.no_render_toc)
    }

    /// Command-line overrides as a single value, applied once after load.
    pub fn overrides(&self) -> OverrideSet {
        OverrideSet {
            target_modules: self.modules.clone(),
            search_paths: self.search_paths.clone(),
            legacy_syntax: self.legacy_syntax(),
            render_toc: self.render_toc(),
        }
    }
}

fn tri_state(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("docpipe").chain(list.iter().copied())).unwrap()
    }

    #[test]
    fn toggles_are_tri_state() {
        assert_eq!(args(&[]).render_toc(), None);
        assert_eq!(args(&["--render-toc"]).render_toc(), Some(true));
        assert_eq!(args(&["--no-render-toc"]).render_toc(), Some(false));
        assert_eq!(args(&["--render-toc", "--no-render-toc"]).render_toc(), Some(false));
        assert_eq!(args(&["--legacy-syntax"]).legacy_syntax(), Some(true));
    }

    #[test]
    fn repeated_module_and_search_path_flags_build_overrides() {
        let a = args(&["-m", "pkg.a", "-m", "pkg.b", "-I", "src", "--render-toc"]);
        let o = a.overrides();
        assert_eq!(o.target_modules, vec!["pkg.a", "pkg.b"]);
        assert_eq!(o.search_paths, vec![PathBuf::from("src")]);
        assert_eq!(o.render_toc, Some(true));
        assert!(o.touches_loader());
    }

    #[test]
    fn bootstrap_flags_are_exclusive() {
        assert_eq!(args(&["--bootstrap-hugo"]).bootstrap_template(), Ok(Some(Template::Hugo)));
        assert!(args(&["--bootstrap", "--bootstrap-mkdocs"]).bootstrap_template().is_err());
        assert!(!args(&["--bootstrap", "-v"]).has_pipeline_options());
        assert!(args(&["--bootstrap", "-w"]).has_pipeline_options());
    }
}
