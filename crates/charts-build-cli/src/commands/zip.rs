//! Zip command - archive charts/ into assets/

use charts_build_repo::archive_charts;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(root: &Path, chart: Option<&str>) -> Result<()> {
    println!(
        "{} {}",
        style("Zipping").cyan().bold(),
        chart.unwrap_or("all charts")
    );

    let archives = archive_charts(root, chart)?;
    for archive in &archives {
        let shown = archive.strip_prefix(root).unwrap_or(archive);
        println!("  {} {}", style("Archived").green().bold(), shown.display());
    }
    println!("  {} {} archive(s) updated", style("Done").dim(), archives.len());
    Ok(())
}
