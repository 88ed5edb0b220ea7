//! Patch generation and application
//!
//! Unified diffs are produced and applied by GNU `diff` and `patch`. The
//! engine's job is orchestration: find the tools, refuse BSD variants
//! (their flags and output differ), interpret exit codes, and make the
//! generated patches deterministic by dropping the timestamps `diff`
//! writes into the `---`/`+++` header lines.
//!
//! Callers go through [`PatchEngine`] so a native implementation can
//! replace the subprocess one without touching them.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{CoreError, Result};
use crate::fs::write_file;

/// Patterns never included in generated patches
pub const DIFF_EXCLUDES: &[&str] = &["*.tgz", "*.lock"];

/// Vendor markers of diff/patch builds that are not GNU
const INCOMPATIBLE_VARIANTS: &[&str] = &["Apple", "FreeBSD"];

/// Generate and apply unified-diff patches between chart trees
pub trait PatchEngine {
    /// Write the patch turning `src` into `dst` to `patch_path`
    ///
    /// Returns `false` (and writes nothing) when the trees are identical.
    fn generate(&self, src: &Path, dst: &Path, patch_path: &Path) -> Result<bool>;

    /// Apply the patch at `patch_path` inside `dest_dir`
    ///
    /// There is no rollback: on failure `dest_dir` may be partially patched.
    fn apply(&self, patch_path: &Path, dest_dir: &Path) -> Result<()>;
}

/// Locates external tools and reports their `--version` output
pub trait ToolProbe {
    /// Resolve a tool name to an executable path
    fn locate(&self, tool: &str) -> Result<PathBuf>;

    /// Output of `<path> --version`
    fn version(&self, path: &Path) -> Result<String>;
}

/// Probe backed by `PATH` and real subprocesses
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn locate(&self, tool: &str) -> Result<PathBuf> {
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        locate_in(tool, &path_var)
    }

    fn version(&self, path: &Path) -> Result<String> {
        let output = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(CoreError::SubprocessFailure {
                tool: path.display().to_string(),
                code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Find `tool` in the directories of a `PATH`-style variable
pub fn locate_in(tool: &str, path_var: &OsStr) -> Result<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| CoreError::ToolUnavailable {
            tool: tool.to_string(),
        })
}

/// Reject Apple/FreeBSD builds based on their `--version` output
pub fn ensure_gnu_variant(tool: &str, path: &Path, version_output: &str) -> Result<()> {
    if INCOMPATIBLE_VARIANTS
        .iter()
        .any(|marker| version_output.contains(marker))
    {
        return Err(CoreError::IncompatibleToolVariant {
            tool: tool.to_string(),
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Patch engine running GNU `diff` and `patch`
///
/// Source and destination paths are resolved against `root`, which is also
/// the working directory of `diff`; patch headers therefore carry paths
/// relative to it.
#[derive(Debug, Clone)]
pub struct GnuPatchEngine<P = SystemProbe> {
    root: PathBuf,
    probe: P,
}

impl GnuPatchEngine<SystemProbe> {
    /// Create an engine rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            probe: SystemProbe,
        }
    }
}

impl<P: ToolProbe> GnuPatchEngine<P> {
    /// Create an engine with a custom tool probe
    pub fn with_probe(root: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            root: root.into(),
            probe,
        }
    }

    /// Root every relative path is resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_tool(&self, tool: &str) -> Result<PathBuf> {
        let path = self.probe.locate(tool)?;
        let version = self.probe.version(&path)?;
        ensure_gnu_variant(tool, &path, &version)?;
        Ok(path)
    }
}

impl<P: ToolProbe> PatchEngine for GnuPatchEngine<P> {
    fn generate(&self, src: &Path, dst: &Path, patch_path: &Path) -> Result<bool> {
        let diff = self.resolve_tool("diff")?;

        let mut cmd = Command::new(&diff);
        cmd.arg("-uN");
        for pattern in DIFF_EXCLUDES {
            cmd.arg("-x").arg(pattern);
        }
        let output = cmd
            .arg(src)
            .arg(dst)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()?;

        match output.status.code() {
            Some(0) => return Ok(false),
            // 1 means differences were found
            Some(1) => {}
            code => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(
                    src = %src.display(),
                    dst = %dst.display(),
                    "unable to generate patch\n{}{}",
                    stdout,
                    stderr
                );
                return Err(CoreError::SubprocessFailure {
                    tool: "diff".to_string(),
                    code,
                    output: format!("{}{}", stdout, stderr),
                });
            }
        }

        if output.stdout.is_empty() {
            return Ok(false);
        }

        let patch_path = self.root.join(patch_path);
        write_file(&patch_path, strip_timestamps(&output.stdout))?;
        tracing::info!(patch = %patch_path.display(), "generated patch");
        Ok(true)
    }

    fn apply(&self, patch_path: &Path, dest_dir: &Path) -> Result<()> {
        let patch_path = self.root.join(patch_path);
        let dest_dir = self.root.join(dest_dir);
        tracing::info!(
            patch = %patch_path.display(),
            dest = %dest_dir.display(),
            "applying patch"
        );

        let patch = self.resolve_tool("patch")?;
        let input = File::open(&patch_path)?;

        let output = Command::new(&patch)
            .args(["-E", "-p1"])
            .current_dir(&dest_dir)
            .stdin(input)
            .output()?;

        if !output.status.success() {
            let text = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            tracing::error!(patch = %patch_path.display(), "unable to apply patch\n{}", text);
            return Err(CoreError::SubprocessFailure {
                tool: "patch".to_string(),
                code: output.status.code(),
                output: text,
            });
        }
        Ok(())
    }
}

/// Drop timestamps from the file header lines of a unified diff
///
/// `--- a/Chart.yaml\t2024-05-01 10:00:00.000 +0000` becomes
/// `--- a/Chart.yaml`. Hunk bodies are tracked by their line counts so a
/// removed line that happens to start with `-- ` is left alone. Works on
/// raw bytes: every other line is copied as is, whatever its encoding or
/// line ending.
pub fn strip_timestamps(diff: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(diff.len());
    let mut old_left: usize = 0;
    let mut new_left: usize = 0;

    for line in diff.split_inclusive(|&b| b == b'\n') {
        let body = line.strip_suffix(b"\n").unwrap_or(line);
        if old_left == 0 && new_left == 0 {
            if let Some(header) = file_header(body) {
                out.extend_from_slice(header);
                out.push(b'\n');
                continue;
            }
            if let Some((old, new)) = std::str::from_utf8(body).ok().and_then(parse_hunk_header) {
                old_left = old;
                new_left = new;
            }
        } else {
            match body.first() {
                Some(b'-') => old_left = old_left.saturating_sub(1),
                Some(b'+') => new_left = new_left.saturating_sub(1),
                Some(b'\\') => {}
                _ => {
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
            }
        }
        out.extend_from_slice(line);
    }

    out
}

/// `--- path<TAB>stamp` -> `--- path`
fn file_header(line: &[u8]) -> Option<&[u8]> {
    if !(line.starts_with(b"--- ") || line.starts_with(b"+++ ")) {
        return None;
    }
    let rest = &line[4..];
    let path_len = match rest.iter().position(|&b| b == b'\t') {
        Some(tab) => rest[..tab].trim_ascii_end().len(),
        None => rest
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(rest.len()),
    };
    Some(&line[..4 + path_len])
}

/// `@@ -1,4 +1,5 @@` -> (4, 5); a missing count means 1
fn parse_hunk_header(line: &str) -> Option<(usize, usize)> {
    let body = line.strip_prefix("@@ ")?;
    let (ranges, _) = body.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    Some((
        range_len(old.strip_prefix('-')?)?,
        range_len(new.strip_prefix('+')?)?,
    ))
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((_, len)) => len.parse().ok(),
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct StubProbe {
        version: &'static str,
    }

    impl ToolProbe for StubProbe {
        fn locate(&self, tool: &str) -> Result<PathBuf> {
            Ok(PathBuf::from(format!("/usr/bin/{}", tool)))
        }

        fn version(&self, _path: &Path) -> Result<String> {
            Ok(self.version.to_string())
        }
    }

    fn gnu_tools_available() -> bool {
        let probe = SystemProbe;
        ["diff", "patch"].iter().all(|tool| {
            probe
                .locate(tool)
                .and_then(|p| probe.version(&p).map(|v| (p, v)))
                .and_then(|(p, v)| ensure_gnu_variant(tool, &p, &v))
                .is_ok()
        })
    }

    fn write(root: &Path, rel: &str, content: &str) {
        write_file(&root.join(rel), content).unwrap();
    }

    #[test]
    fn test_gnu_variant_accepted() {
        ensure_gnu_variant("diff", Path::new("/usr/bin/diff"), "diff (GNU diffutils) 3.8\n").unwrap();
    }

    #[test]
    fn test_apple_variant_rejected() {
        let err = ensure_gnu_variant(
            "diff",
            Path::new("/usr/bin/diff"),
            "Apple diff (based on FreeBSD diff)",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::IncompatibleToolVariant { .. }));
    }

    #[test]
    fn test_stub_probe_blocks_generation() {
        let temp = TempDir::new().unwrap();
        let engine = GnuPatchEngine::with_probe(
            temp.path(),
            StubProbe {
                version: "patch 2.0-12u11-Apple",
            },
        );
        let err = engine
            .generate(Path::new("a"), Path::new("b"), Path::new("x.patch"))
            .unwrap_err();
        assert!(matches!(err, CoreError::IncompatibleToolVariant { .. }));
        assert!(!temp.path().join("x.patch").exists());
    }

    #[test]
    fn test_locate_in_empty_path() {
        let err = locate_in("diff", OsStr::new("")).unwrap_err();
        assert!(matches!(err, CoreError::ToolUnavailable { .. }));
    }

    #[test]
    fn test_strip_timestamps() {
        let diff = [
            "diff -uN -x '*.tgz' -x '*.lock' charts-original/Chart.yaml charts/Chart.yaml",
            "--- charts-original/Chart.yaml\t2024-05-01 10:00:00.000000000 +0000",
            "+++ charts/Chart.yaml\t2024-05-02 11:00:00.000000000 +0000",
            "@@ -1,3 +1,3 @@",
            " name: nginx",
            "--- removed yaml separator",
            "+version: 1.2.1",
            " appVersion: 1.25",
            "",
        ]
        .join("\n");
        let expected = [
            "diff -uN -x '*.tgz' -x '*.lock' charts-original/Chart.yaml charts/Chart.yaml",
            "--- charts-original/Chart.yaml",
            "+++ charts/Chart.yaml",
            "@@ -1,3 +1,3 @@",
            " name: nginx",
            "--- removed yaml separator",
            "+version: 1.2.1",
            " appVersion: 1.25",
            "",
        ]
        .join("\n");
        assert_eq!(strip_timestamps(diff.as_bytes()), expected.as_bytes());
    }

    #[test]
    fn test_strip_timestamps_keeps_raw_bytes() {
        let mut diff = b"--- a/values.yaml\t2024-05-01 10:00:00 +0000\r\n".to_vec();
        diff.extend_from_slice(b"+++ b/values.yaml\t2024-05-02 10:00:00 +0000\n");
        diff.extend_from_slice(b"@@ -1 +1 @@\n");
        diff.extend_from_slice(b"-name: caf\xe9\r\n");
        diff.extend_from_slice(b"+name: caf\xe8\r\n");

        let stripped = strip_timestamps(&diff);
        let mut expected = b"--- a/values.yaml\n+++ b/values.yaml\n@@ -1 +1 @@\n".to_vec();
        expected.extend_from_slice(b"-name: caf\xe9\r\n+name: caf\xe8\r\n");
        assert_eq!(stripped, expected);
    }

    #[test]
    fn test_parse_hunk_header() {
        assert_eq!(parse_hunk_header("@@ -1,4 +1,5 @@"), Some((4, 5)));
        assert_eq!(parse_hunk_header("@@ -0,0 +1 @@ name"), Some((0, 1)));
        assert_eq!(parse_hunk_header(" name"), None);
    }

    #[test]
    fn test_identical_trees_write_nothing() {
        if !gnu_tools_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/Chart.yaml", "name: nginx\n");
        write(temp.path(), "b/Chart.yaml", "name: nginx\n");

        let engine = GnuPatchEngine::new(temp.path());
        let written = engine
            .generate(Path::new("a"), Path::new("b"), Path::new("out/a.patch"))
            .unwrap();

        assert!(!written);
        assert!(!temp.path().join("out/a.patch").exists());
    }

    #[test]
    fn test_generation_is_deterministic_and_applies() {
        if !gnu_tools_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        write(temp.path(), "charts-original/Chart.yaml", "name: nginx\nversion: 1.0.0\n");
        write(temp.path(), "charts-original/nginx.tgz", "binary");
        write(temp.path(), "charts/Chart.yaml", "name: nginx\nversion: 1.0.1\n");
        write(temp.path(), "charts/templates/cm.yaml", "kind: ConfigMap\n");

        let engine = GnuPatchEngine::new(temp.path());
        assert!(engine
            .generate(Path::new("charts-original"), Path::new("charts"), Path::new("p/1.patch"))
            .unwrap());
        std::thread::sleep(std::time::Duration::from_millis(20));
        write(temp.path(), "charts/Chart.yaml", "name: nginx\nversion: 1.0.1\n");
        assert!(engine
            .generate(Path::new("charts-original"), Path::new("charts"), Path::new("p/2.patch"))
            .unwrap());

        let first = std::fs::read(temp.path().join("p/1.patch")).unwrap();
        let second = std::fs::read(temp.path().join("p/2.patch")).unwrap();
        assert_eq!(first, second);
        assert!(!String::from_utf8_lossy(&first).contains("nginx.tgz"));

        engine
            .apply(Path::new("p/1.patch"), Path::new("charts-original"))
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("charts-original/Chart.yaml")).unwrap(),
            "name: nginx\nversion: 1.0.1\n"
        );
        assert!(temp.path().join("charts-original/templates/cm.yaml").exists());
    }

    #[test]
    fn test_latin1_file_patch_applies() {
        if !gnu_tools_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("a/notes.txt"), b"caf\xe9\nline\n".as_slice()).unwrap();
        write_file(&temp.path().join("b/notes.txt"), b"caf\xe9 au lait\nline\n".as_slice()).unwrap();
        write_file(&temp.path().join("c/notes.txt"), b"caf\xe9\nline\n".as_slice()).unwrap();

        let engine = GnuPatchEngine::new(temp.path());
        assert!(engine
            .generate(Path::new("a"), Path::new("b"), Path::new("x.patch"))
            .unwrap());
        engine.apply(Path::new("x.patch"), Path::new("c")).unwrap();
        assert_eq!(
            std::fs::read(temp.path().join("c/notes.txt")).unwrap(),
            b"caf\xe9 au lait\nline\n"
        );
    }

    #[test]
    fn test_apply_mismatched_patch_fails() {
        if !gnu_tools_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/Chart.yaml", "name: nginx\n");
        write(temp.path(), "b/Chart.yaml", "name: redis\n");
        write(temp.path(), "c/Chart.yaml", "name: something-else\n");

        let engine = GnuPatchEngine::new(temp.path());
        engine
            .generate(Path::new("a"), Path::new("b"), Path::new("x.patch"))
            .unwrap();
        let err = engine.apply(Path::new("x.patch"), Path::new("c")).unwrap_err();
        assert!(matches!(err, CoreError::SubprocessFailure { .. }));
    }
}
