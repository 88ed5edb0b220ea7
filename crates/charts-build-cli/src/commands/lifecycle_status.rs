//! Lifecycle status command
//!
//! Reads the index of the current, production and development branches,
//! classifies every chart version against the lifecycle window and writes
//! the report under `logs/`. A run that fails part-way still writes what
//! it computed before failing.

use charts_build_core::layout::LOGS_DIR;
use charts_build_lifecycle::{
    AssetsMap, Branches, ReportHeader, Status, StatusError, StatusReporter, VersionRules,
    read_index_assets, save_report,
};
use charts_build_repo::GitRepo;
use chrono::Utc;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(
    root: &Path,
    rules_file: &Path,
    chart: Option<String>,
    branch_version: Option<&str>,
    dev_branch: Option<String>,
    prod_branch: Option<String>,
) -> Result<()> {
    let mut git = GitRepo::open(root)?;
    let rules = VersionRules::load_for(&root.join(rules_file), branch_version)?
        .with_branches(dev_branch, prod_branch);

    println!(
        "{} branch line {} ({} / {})",
        style("Checking").cyan().bold(),
        rules.branch_version,
        rules.dev_branch,
        rules.prod_branch
    );
    println!(
        "  {} majors {} to {}",
        style("Window").dim(),
        rules.min_major,
        rules.max_major.saturating_sub(1)
    );

    let branches = Branches {
        production: rules.prod_branch.clone(),
        development: rules.dev_branch.clone(),
    };
    let header = ReportHeader {
        branch_version: rules.branch_version.clone(),
        development_branch: rules.dev_branch.clone(),
        production_branch: rules.prod_branch.clone(),
        chart,
        generated: Utc::now(),
    };

    let outcome = StatusReporter::new(&mut git, &rules, branches, read_index_assets).status();
    let logs_dir = root.join(LOGS_DIR);

    match outcome {
        Ok(status) => {
            let saved = save_report(&logs_dir, status, &header)?;
            print_summary(&saved);
            println!("  {} {}", style("Report").green().bold(), logs_dir.display());
            Ok(())
        }
        Err(StatusError { status, source }) => {
            tracing::error!(error = %source, "lifecycle status failed, saving partial report");
            match save_report(&logs_dir, *status, &header) {
                Ok(saved) => {
                    print_summary(&saved);
                    println!(
                        "  {} {}",
                        style("Partial report").yellow().bold(),
                        logs_dir.display()
                    );
                }
                Err(save) => tracing::error!(error = %save, "failed to save partial report"),
            }
            Err(source.into())
        }
    }
}

fn print_summary(status: &Status) {
    let count = |map: &AssetsMap| map.values().map(Vec::len).sum::<usize>();
    let rows = [
        ("In lifecycle", count(&status.in_lifecycle_current_branch)),
        ("Out of lifecycle", count(&status.out_lifecycle_current_branch)),
        ("Released, in lifecycle", count(&status.released_in_lifecycle)),
        ("Not released, out of lifecycle", count(&status.not_released_out_lifecycle)),
        ("Not released, in lifecycle", count(&status.not_released_in_lifecycle)),
        ("Released, out of lifecycle", count(&status.released_out_lifecycle)),
        ("To be released", count(&status.to_be_released)),
        ("To be forward-ported", count(&status.to_be_forward_ported)),
    ];
    for (label, n) in rows {
        println!("  {:<32} {}", style(label).dim(), n);
    }
    if !status.released_out_lifecycle.is_empty() {
        println!(
            "  {} versions released outside the lifecycle",
            style("Error").red().bold()
        );
    }
}
