//! Lifecycle log files under `logs/`
//!
//! Each file opens with a header block, then a series of sections: a
//! `[LEVEL] title` line, one `[LEVEL] chart: v1, v2` line per chart and an
//! `[END]` sentinel.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::asset::AssetsMap;
use crate::error::Result;
use crate::status::Status;

pub const CURRENT_BRANCH_LOG: &str = "current-branch.log";
pub const PRODUCTION_DEVELOPMENT_LOG: &str = "production-x-development.log";
pub const RELEASE_FORWARD_PORT_LOG: &str = "released-x-forward-ported.log";

const RULE: &str = "==================================================================";

/// Severity of a log section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Context printed at the top of every log file
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub branch_version: String,
    pub development_branch: String,
    pub production_branch: String,
    /// Chart the report was filtered to
    pub chart: Option<String>,
    pub generated: DateTime<Utc>,
}

struct LogWriter {
    out: String,
}

impl LogWriter {
    fn new(title: &str, header: &ReportHeader) -> Self {
        let mut writer = Self { out: String::new() };
        writer
            .raw(RULE)
            .raw(title)
            .raw(&format!(
                "Generated at: {}",
                header.generated.format("%Y-%m-%d %H:%M:%S UTC")
            ))
            .raw(&format!("Branch version: {}", header.branch_version))
            .raw(&format!("Development branch: {}", header.development_branch))
            .raw(&format!("Production branch: {}", header.production_branch));
        if let Some(chart) = &header.chart {
            writer.raw(&format!("Chart: {}", chart));
        }
        writer.raw(RULE);
        writer
    }

    fn raw(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self.out.push('\n');
        self
    }

    fn line(&mut self, level: Level, text: &str) -> &mut Self {
        self.raw(&format!("[{}] {}", level.as_str(), text))
    }

    fn versions(&mut self, level: Level, assets: &AssetsMap) -> &mut Self {
        for (chart, versions) in assets {
            let list = versions
                .iter()
                .map(|a| a.version.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.raw(&format!("[{}] {}: {}", level.as_str(), chart, list));
        }
        self
    }

    fn end(&mut self) -> &mut Self {
        self.out.push_str("[END]\n");
        self
    }

    fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

/// Current-branch versions against the lifecycle window
pub fn render_current_branch(status: &Status, header: &ReportHeader) -> String {
    LogWriter::new("Assets versions vs the lifecycle rules in the current branch", header)
        .line(Level::Info, "Versions INSIDE the lifecycle in the current branch")
        .versions(Level::Info, &status.in_lifecycle_current_branch)
        .end()
        .line(Level::Warn, "Versions OUTSIDE the lifecycle in the current branch")
        .versions(Level::Warn, &status.out_lifecycle_current_branch)
        .end()
        .finish()
}

/// Released versions against development versions
pub fn render_production_development(status: &Status, header: &ReportHeader) -> String {
    let at_prod = format!("At the production branch: {}", header.production_branch);
    let at_dev = format!("At the development branch: {}", header.development_branch);

    LogWriter::new("Released assets vs development assets with lifecycle rules", header)
        .line(Level::Info, "Assets RELEASED and Inside the lifecycle")
        .line(Level::Info, &at_prod)
        .versions(Level::Info, &status.released_in_lifecycle)
        .end()
        .line(Level::Info, "Assets NOT released and Out of the lifecycle")
        .line(Level::Info, &at_dev)
        .versions(Level::Info, &status.not_released_out_lifecycle)
        .end()
        .line(Level::Warn, "Assets NOT released and Inside the lifecycle")
        .line(Level::Warn, &at_dev)
        .versions(Level::Warn, &status.not_released_in_lifecycle)
        .end()
        .line(Level::Error, "Assets released and Out of the lifecycle")
        .line(Level::Error, &at_prod)
        .versions(Level::Error, &status.released_out_lifecycle)
        .end()
        .finish()
}

/// Versions to release now against versions to forward-port
pub fn render_release_forward_port(status: &Status, header: &ReportHeader) -> String {
    LogWriter::new("Assets to be released vs forward ported", header)
        .line(Level::Info, "Assets to be RELEASED")
        .versions(Level::Info, &status.to_be_released)
        .end()
        .line(Level::Info, "Assets to be FORWARD-PORTED")
        .versions(Level::Info, &status.to_be_forward_ported)
        .end()
        .finish()
}

/// Write the three log files into `logs_dir`, replacing previous runs
pub fn write_logs(logs_dir: &Path, status: &Status, header: &ReportHeader) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(logs_dir)?;
    let files = [
        (CURRENT_BRANCH_LOG, render_current_branch(status, header)),
        (PRODUCTION_DEVELOPMENT_LOG, render_production_development(status, header)),
        (RELEASE_FORWARD_PORT_LOG, render_release_forward_port(status, header)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = logs_dir.join(name);
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "wrote lifecycle log");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::assets_from;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn header(chart: Option<&str>) -> ReportHeader {
        ReportHeader {
            branch_version: "2.9".to_string(),
            development_branch: "dev-v2.9".to_string(),
            production_branch: "release-v2.9".to_string(),
            chart: chart.map(String::from),
            generated: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
        }
    }

    fn status() -> Status {
        Status {
            released_in_lifecycle: assets_from([("fleet", vec!["104.0.0", "103.1.0"])]),
            not_released_in_lifecycle: assets_from([
                ("fleet", vec!["104.1.0"]),
                ("rancher-monitoring", vec!["104.0.0+up45.31.1"]),
            ]),
            released_out_lifecycle: assets_from([("cis", vec!["101.0.0"])]),
            to_be_released: assets_from([("fleet", vec!["104.1.0"])]),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_production_development() {
        let rendered = render_production_development(&status(), &header(None));
        insta::assert_snapshot!(rendered, @r"
        ==================================================================
        Released assets vs development assets with lifecycle rules
        Generated at: 2024-05-01 10:30:00 UTC
        Branch version: 2.9
        Development branch: dev-v2.9
        Production branch: release-v2.9
        ==================================================================
        [INFO] Assets RELEASED and Inside the lifecycle
        [INFO] At the production branch: release-v2.9
        [INFO] fleet: 104.0.0, 103.1.0
        [END]
        [INFO] Assets NOT released and Out of the lifecycle
        [INFO] At the development branch: dev-v2.9
        [END]
        [WARN] Assets NOT released and Inside the lifecycle
        [WARN] At the development branch: dev-v2.9
        [WARN] fleet: 104.1.0
        [WARN] rancher-monitoring: 104.0.0+up45.31.1
        [END]
        [ERROR] Assets released and Out of the lifecycle
        [ERROR] At the production branch: release-v2.9
        [ERROR] cis: 101.0.0
        [END]
        ");
    }

    #[test]
    fn test_render_release_forward_port_with_chart_filter() {
        let rendered = render_release_forward_port(&status(), &header(Some("fleet")));
        assert!(rendered.contains("Chart: fleet\n"));
        assert!(rendered.contains("[INFO] Assets to be RELEASED\n[INFO] fleet: 104.1.0\n[END]\n"));
        assert!(rendered.ends_with("[INFO] Assets to be FORWARD-PORTED\n[END]\n"));
    }

    #[test]
    fn test_write_logs() {
        let temp = TempDir::new().unwrap();
        let logs = temp.path().join("logs");
        let written = write_logs(&logs, &status(), &header(None)).unwrap();

        assert_eq!(written.len(), 3);
        let current = std::fs::read_to_string(logs.join(CURRENT_BRANCH_LOG)).unwrap();
        assert!(current.contains("[WARN] Versions OUTSIDE the lifecycle in the current branch\n"));
        assert_eq!(current.matches("[END]").count(), 2);
    }
}
