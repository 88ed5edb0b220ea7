//! Standardize command

use charts_build_repo::restructure_charts_and_assets;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(root: &Path) -> Result<()> {
    println!(
        "{} {}",
        style("Standardizing").cyan().bold(),
        root.display()
    );

    let count = restructure_charts_and_assets(root)?;

    println!("  {} {} chart version(s)", style("Restructured").green().bold(), count);
    Ok(())
}
