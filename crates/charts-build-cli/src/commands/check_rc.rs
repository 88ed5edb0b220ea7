//! Check-rc command - release candidate image tags in charts to release

use charts_build_core::layout::RELEASE_OPTIONS_FILE;
use charts_build_repo::{ReleaseOptions, check_rc_tags};
use console::style;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(root: &Path, ignore: &[String]) -> Result<()> {
    let ignore = parse_ignore(ignore)?;
    let release = ReleaseOptions::load(&root.join(RELEASE_OPTIONS_FILE))?;

    if release.is_empty() {
        println!(
            "{} no charts listed in {}",
            style("Skipping").yellow().bold(),
            RELEASE_OPTIONS_FILE
        );
        return Ok(());
    }

    println!("{} release candidate tags", style("Checking").cyan().bold());
    let rc = check_rc_tags(root, &release, &ignore)?;

    if rc.is_empty() {
        println!("  {} no release candidate tags", style("OK").green().bold());
        return Ok(());
    }

    for (image, tags) in &rc {
        println!("  {} {}: {}", style("RC").red().bold(), image, tags.join(", "));
    }
    Err(CliError::RcTags { count: rc.len() })
}

/// `chart=tag` pairs into a chart → tag map
fn parse_ignore(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((chart, tag)) if !chart.is_empty() && !tag.is_empty() => {
                Ok((chart.to_string(), tag.to_string()))
            }
            _ => Err(CliError::usage(format!(
                "invalid --ignore value '{}', expected <chart>=<tag>",
                pair
            ))),
        })
        .collect()
}
