//! Patch command - regenerate generated-changes/ from the working directory

use charts_build_core::GnuPatchEngine;
use charts_build_repo::Package;
use console::style;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub async fn run(root: &Path, name: &str) -> Result<()> {
    let package = Package::load(root, name)?;

    if package.is_local() {
        println!(
            "{} {} is a local chart, nothing to patch",
            style("Skipping").yellow().bold(),
            package.name
        );
        return Ok(());
    }

    println!("{} {}", style("Patching").cyan().bold(), package.name);

    let engine = GnuPatchEngine::new(&package.dir);
    let summary = package.generate_patch(&engine).await?;

    if summary.is_empty() {
        println!("  {} no changes from upstream", style("Clean").green().bold());
        return Ok(());
    }

    print_paths("Patched", &summary.patched);
    print_paths("Overlaid", &summary.overlaid);
    print_paths("Excluded", &summary.excluded);
    Ok(())
}

fn print_paths(label: &str, paths: &[PathBuf]) {
    for path in paths {
        println!("  {} {}", style(label).green().bold(), path.display());
    }
}
