//! Prepare command - pull an upstream chart and apply generated changes

use charts_build_core::GnuPatchEngine;
use charts_build_repo::Package;
use console::style;
use std::path::Path;

use crate::error::Result;

pub async fn run(root: &Path, name: &str) -> Result<()> {
    let package = Package::load(root, name)?;

    println!("{} {}", style("Preparing").cyan().bold(), package.name);
    match &package.options.url {
        Some(url) => println!("  {} {}", style("Upstream").dim(), url),
        None => println!("  {} local chart", style("Upstream").dim()),
    }

    let engine = GnuPatchEngine::new(&package.dir);
    package.prepare(&engine).await?;

    println!(
        "  {} {}",
        style("Ready").green().bold(),
        package.working_dir().display()
    );
    Ok(())
}
