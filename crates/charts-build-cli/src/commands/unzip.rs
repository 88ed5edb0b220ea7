//! Unzip command - dump assets/ back into charts/

use charts_build_repo::dump_assets;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(root: &Path, asset: Option<&str>) -> Result<()> {
    println!(
        "{} {}",
        style("Unzipping").cyan().bold(),
        asset.unwrap_or("all assets")
    );

    let charts = dump_assets(root, asset)?;
    for chart in &charts {
        let shown = chart.strip_prefix(root).unwrap_or(chart);
        println!("  {} {}", style("Extracted").green().bold(), shown.display());
    }
    Ok(())
}
