//! Readable error reports built from captured backtraces.
//!
//! Rendering is a pure function of an [`ErrorReport`]; capturing is the only
//! part that touches the runtime. Frames from the standard library, the
//! toolchain and registry dependencies are filtered out so a report shows
//! the caller's own code.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;
use std::path::Path;

/// Returned by [`format_error`] when there is nothing to report
pub const NO_ACTIVE_ERROR: &str = "No active error";

/// Path fragments that mark toolchain or dependency sources
const SYSTEM_PATH_MARKERS: &[&str] = &[
    "/rustc/",
    "\\rustc\\",
    "/library/std/",
    "/library/core/",
    "/library/alloc/",
    "/.cargo/registry/",
    "\\.cargo\\registry\\",
    "/.cargo/git/",
    "/.rustup/",
    "\\.rustup\\",
];

/// Function prefixes of runtime and unwinding machinery
const SYSTEM_FUNCTION_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "anyhow::",
    "<anyhow::",
    "test::",
    "__rust",
    "rust_begin_unwind",
    "__libc_start",
    "_start",
];

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Source text of `line`, when already known
    pub source: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The frame's source text, reading it from disk when not already set.
    pub fn source_text(&self) -> Option<String> {
        if let Some(source) = &self.source {
            return Some(source.trim().to_string());
        }
        read_source_line(Path::new(&self.file), self.line)
    }
}

/// Parse the `Display` rendering of a [`Backtrace`] into frames.
///
/// Symbols without an `at file:line` location are dropped.
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut function: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let (Some(name), Some((file, lineno))) = (&function, parse_location(location)) {
                frames.push(Frame::new(file, lineno, name.clone()));
            }
            continue;
        }

        // "12: path::to::function", or an inlined symbol without an index
        let name = match line.split_once(": ") {
            Some((index, rest)) if index.chars().all(|c| c.is_ascii_digit()) => rest,
            _ => line,
        };
        function = Some(name.to_string());
    }

    frames
}

/// Split `file:line[:column]`, tolerating colons inside the file part.
fn parse_location(location: &str) -> Option<(String, u32)> {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next()?;
    let middle = parts.next()?;

    match (middle.parse::<u32>(), parts.next()) {
        // file:line:column
        (Ok(line), Some(file)) if last.parse::<u32>().is_ok() => Some((file.to_string(), line)),
        // file:line
        _ => {
            let line = last.parse::<u32>().ok()?;
            let file = location.rsplit_once(':')?.0;
            Some((file.to_string(), line))
        }
    }
}

/// Whether a frame belongs to the toolchain, a dependency or the runtime.
pub fn is_system_frame(frame: &Frame) -> bool {
    SYSTEM_PATH_MARKERS
        .iter()
        .any(|marker| frame.file.contains(marker))
        || SYSTEM_FUNCTION_PREFIXES
            .iter()
            .any(|prefix| frame.function.starts_with(prefix))
}

/// Frames of the capture helpers in this module.
fn is_capture_frame(frame: &Frame) -> bool {
    frame.function.starts_with(module_path!()) && !frame.function.contains("::tests::")
}

fn user_frames(backtrace: &Backtrace) -> Vec<Frame> {
    parse_backtrace(&backtrace.to_string())
        .into_iter()
        .filter(|frame| !is_system_frame(frame) && !is_capture_frame(frame))
        .collect()
}

fn read_source_line(path: &Path, line: u32) -> Option<String> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().nth(index).map(|text| text.trim().to_string())
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// An error together with the user frames that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Innermost first
    pub frames: Vec<Frame>,
    pub type_name: String,
    pub message: String,
    /// Messages of the `source()` chain, outermost first
    pub causes: Vec<String>,
}

impl ErrorReport {
    pub fn from_parts(
        frames: Vec<Frame>,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            frames,
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture a report for `err` at the current call site.
    pub fn capture<E>(err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            frames: user_frames(&Backtrace::force_capture()),
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            message: err.to_string(),
            causes,
        }
    }

    /// Build a report from an `anyhow::Error`, preferring the backtrace it
    /// captured at construction.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let own = err.backtrace();
        let frames = if own.status() == BacktraceStatus::Captured {
            user_frames(own)
        } else {
            user_frames(&Backtrace::force_capture())
        };

        Self {
            frames,
            type_name: "Error".to_string(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// Line number of the innermost user frame.
    pub fn line(&self) -> Option<u32> {
        self.frames.first().map(|frame| frame.line)
    }

    /// Multi-line report: frames, then causes, then `{type}: {message}`.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.frames.is_empty() {
            out.push_str("Stack (innermost first):\n");
            for frame in &self.frames {
                let _ = writeln!(
                    out,
                    "  at {}:{} in {}",
                    frame.file, frame.line, frame.function
                );
                if let Some(source) = frame.source_text() {
                    let _ = writeln!(out, "      {}", source);
                }
            }
        }

        for cause in &self.causes {
            let _ = writeln!(out, "caused by: {}", cause);
        }

        let _ = write!(out, "{}: {}", self.type_name, self.message);
        out
    }
}

/// Render `err`, or [`NO_ACTIVE_ERROR`] when there is none.
pub fn format_error(err: Option<&anyhow::Error>) -> String {
    match err {
        Some(err) => ErrorReport::from_anyhow(err).render(),
        None => NO_ACTIVE_ERROR.to_string(),
    }
}

/// Short `"{line}: {message}"` summary; the line is `?` when unknown.
pub fn error_info(err: &anyhow::Error) -> String {
    let line = ErrorReport::from_anyhow(err)
        .line()
        .map_or_else(|| "?".to_string(), |line| line.to_string());
    format!("{}: {}", line, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use thiserror::Error;

    const SAMPLE: &str = "\
   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::create
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/std/src/backtrace.rs:331:13
   2: era5_ingest::load::read_month
             at ./src/load.rs:42:9
   3: serde_json::de::from_str
             at /home/dev/.cargo/registry/src/index.crates.io-6f17d22bba15001f/serde_json-1.0.128/src/de.rs:2670:5
   4: era5_ingest::main
             at ./src/main.rs:7:5
   5: core::ops::function::FnOnce::call_once
             at /rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/ops/function.rs:250:5
   6: main
   7: __libc_start_main
";

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[test]
    fn test_parse_backtrace_drops_unlocated_symbols() {
        let frames = parse_backtrace(SAMPLE);
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[2], Frame::new("./src/load.rs", 42, "era5_ingest::load::read_month"));
        assert!(frames.iter().all(|f| f.function != "main"));
    }

    #[test]
    fn test_system_frames_are_filtered() {
        let user: Vec<_> = parse_backtrace(SAMPLE)
            .into_iter()
            .filter(|f| !is_system_frame(f))
            .collect();
        let names: Vec<_> = user.iter().map(|f| f.function.as_str()).collect();
        assert_eq!(names, vec!["era5_ingest::load::read_month", "era5_ingest::main"]);
    }

    #[test]
    fn test_parse_location_variants() {
        assert_eq!(parse_location("./src/a.rs:10:3"), Some(("./src/a.rs".into(), 10)));
        assert_eq!(parse_location("./src/a.rs:10"), Some(("./src/a.rs".into(), 10)));
        assert_eq!(
            parse_location("C:\\work\\src\\a.rs:8:1"),
            Some(("C:\\work\\src\\a.rs".into(), 8))
        );
        assert_eq!(parse_location("no-location"), None);
    }

    #[test]
    fn test_render_reads_source_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fn first() {{}}").unwrap();
        writeln!(file, "    let value = parse(raw)?;").unwrap();
        let path = file.path().display().to_string();

        let report = ErrorReport::from_parts(
            vec![Frame::new(&path, 2, "app::parse_row")],
            "ParseIntError",
            "invalid digit found in string",
        );
        let rendered = report.render();

        assert!(rendered.contains(&format!("at {}:2 in app::parse_row", path)));
        assert!(rendered.contains("let value = parse(raw)?;"));
        assert!(rendered.ends_with("ParseIntError: invalid digit found in string"));
    }

    #[test]
    fn test_render_prefers_known_source() {
        let report = ErrorReport::from_parts(
            vec![Frame::new("/nonexistent.rs", 9, "app::run").with_source("  run()?;  ")],
            "Error",
            "boom",
        );
        assert!(report.render().contains("      run()?;\n"));
    }

    #[test]
    fn test_capture_records_type_and_causes() {
        let report = ErrorReport::capture(&Outer(Inner));
        assert_eq!(report.type_name, "Outer");
        assert_eq!(report.message, "outer");
        assert_eq!(report.causes, vec!["inner".to_string()]);

        let rendered = report.render();
        assert!(rendered.contains("caused by: inner\n"));
        assert!(rendered.ends_with("Outer: outer"));
    }

    #[test]
    fn test_format_error_without_error() {
        assert_eq!(format_error(None), NO_ACTIVE_ERROR);
    }

    #[test]
    fn test_format_error_with_context_chain() {
        let err = anyhow::Error::new(Inner).context("loading grid");
        let rendered = format_error(Some(&err));
        assert!(rendered.contains("caused by: inner"));
        assert!(rendered.ends_with("Error: loading grid"));
    }

    #[test]
    fn test_error_info_format() {
        let err = anyhow::anyhow!("boom");
        let info = error_info(&err);
        let (line, message) = info.split_once(": ").unwrap();
        assert_eq!(message, "boom");
        assert!(line == "?" || line.parse::<u32>().is_ok(), "{info}");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Outer"), "Outer");
        assert_eq!(short_type_name("a::Wrapper<b::C>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
