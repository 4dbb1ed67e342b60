//! Scripted `ffmpeg` / `ffprobe` stand-ins for driving the media components
//! end to end in tests.
//!
//! The stub `ffmpeg` logs its arguments, replays canned stderr for analysis
//! runs (output `-`), and otherwise copies its input to its output and emits
//! a final progress block. The stub `ffprobe` answers duration queries and,
//! for JSON requests, replays a canned stream description.

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard};

/// PATH is process-wide; installs are serialized.
static PATH_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

const FFMPEG_SCRIPT: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$*" >> "$dir/calls.log"
input=""
output=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-i" ]; then input="$arg"; fi
    prev="$arg"
    output="$arg"
done
if [ "$output" = "-" ]; then
    cat "$dir/analysis.txt" >&2
    exit 0
fi
code="$(cat "$dir/render_exit")"
if [ "$code" != "0" ]; then
    echo "Conversion failed!" >&2
    exit "$code"
fi
cp "$input" "$output" || exit 1
printf 'out_time_us=%s\nprogress=end\n' "$(cat "$dir/out_time_us")" >&2
exit 0
"#;

const FFPROBE_SCRIPT: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
code="$(cat "$dir/ffprobe_exit")"
if [ "$code" != "0" ]; then
    exit "$code"
fi
case "$*" in
    *json*) cat "$dir/streams.json" ;;
    *) cat "$dir/duration" ;;
esac
"#;

/// Builder for a stub tool directory.
pub(crate) struct StubTools {
    analysis_stderr: String,
    duration: String,
    streams_json: String,
    render_exit: i32,
    ffprobe_exit: i32,
    out_time_us: u64,
}

impl StubTools {
    pub(crate) fn new() -> Self {
        Self {
            analysis_stderr: String::new(),
            duration: "10.0".to_string(),
            streams_json: r#"{"format": {}, "streams": []}"#.to_string(),
            render_exit: 0,
            ffprobe_exit: 0,
            out_time_us: 0,
        }
    }

    /// Stderr replayed by analysis runs.
    pub(crate) fn analysis_stderr(mut self, text: impl Into<String>) -> Self {
        self.analysis_stderr = text.into();
        self
    }

    /// Container duration reported by `ffprobe`, in seconds.
    pub(crate) fn duration(mut self, seconds: f64) -> Self {
        self.duration = format!("{:.6}\n", seconds);
        self
    }

    /// JSON replayed for `-print_format json` queries.
    pub(crate) fn streams_json(mut self, json: impl Into<String>) -> Self {
        self.streams_json = json.into();
        self
    }

    /// Exit code for render runs.
    pub(crate) fn render_exit(mut self, code: i32) -> Self {
        self.render_exit = code;
        self
    }

    /// Exit code for every `ffprobe` call.
    pub(crate) fn ffprobe_exit(mut self, code: i32) -> Self {
        self.ffprobe_exit = code;
        self
    }

    /// `out_time_us` of the final progress block of a render.
    pub(crate) fn out_time_us(mut self, micros: u64) -> Self {
        self.out_time_us = micros;
        self
    }

    /// Write the stubs and put them first on PATH until the guard drops.
    pub(crate) async fn install(self) -> InstalledTools {
        let lock = PATH_LOCK.lock().await;
        let dir = TempDir::new().unwrap();

        write_script(dir.path(), "ffmpeg", FFMPEG_SCRIPT);
        write_script(dir.path(), "ffprobe", FFPROBE_SCRIPT);
        let files = [
            ("analysis.txt", self.analysis_stderr),
            ("duration", self.duration),
            ("streams.json", self.streams_json),
            ("render_exit", self.render_exit.to_string()),
            ("ffprobe_exit", self.ffprobe_exit.to_string()),
            ("out_time_us", self.out_time_us.to_string()),
        ];
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }

        let old_path = std::env::var_os("PATH");
        let mut paths = vec![dir.path().to_path_buf()];
        if let Some(old) = &old_path {
            paths.extend(std::env::split_paths(old));
        }
        std::env::set_var("PATH", std::env::join_paths(paths).unwrap());

        InstalledTools {
            dir,
            old_path,
            _lock: lock,
        }
    }
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Installed stubs; restores PATH on drop.
pub(crate) struct InstalledTools {
    dir: TempDir,
    old_path: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl InstalledTools {
    /// Scratch directory for test media, separate from the stubs.
    pub(crate) fn media_dir(&self) -> PathBuf {
        let media = self.dir.path().join("media");
        std::fs::create_dir_all(&media).unwrap();
        media
    }

    /// Argument lines of every `ffmpeg` invocation so far.
    pub(crate) fn ffmpeg_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Drop for InstalledTools {
    fn drop(&mut self) {
        match self.old_path.take() {
            Some(old) => std::env::set_var("PATH", old),
            None => std::env::remove_var("PATH"),
        }
    }
}
