//! Index command - regenerate index.yaml from assets/

use charts_build_core::layout::HELM_INDEX_FILE;
use charts_build_repo::create_or_update_index;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(root: &Path) -> Result<()> {
    let index = create_or_update_index(root)?;

    let versions: usize = index.entries.values().map(Vec::len).sum();
    println!(
        "{} {} ({} chart(s), {} version(s))",
        style("Indexed").green().bold(),
        root.join(HELM_INDEX_FILE).display(),
        index.entries.len(),
        versions
    );
    Ok(())
}
