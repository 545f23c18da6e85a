//! `devreload check` command implementation

use std::path::Path;

use colored::Colorize;
use devreload_kernel::{ArtifactCategory, ArtifactSet, ManifestReader};
use devreload_runtime::LineManifestReader;

use crate::CliError;

/// Execute the `devreload check` command
pub fn run(file: &Path, json: bool) -> Result<(), CliError> {
    let descriptors = LineManifestReader::new().read(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    let Some(set) = ArtifactSet::from_descriptors(descriptors) else {
        println!("{} {} lists no artifacts", "!".yellow(), file.display());
        return Ok(());
    };

    println!("{} {}", "Manifest:".bold(), file.display());
    for descriptor in set.iter() {
        let exists = descriptor.location().exists();
        let marker = if exists { "✓".green() } else { "✗".red() };
        println!(
            "  {} {:<10} {}",
            marker,
            descriptor.category().tag(),
            descriptor.location().display()
        );
    }
    println!(
        "{} archive(s), {} auxiliary director(ies), {} resource fragment(s)",
        set.count(ArtifactCategory::Archive),
        set.count(ArtifactCategory::AuxiliaryDirectory),
        set.count(ArtifactCategory::ResourceFragment)
    );
    Ok(())
}
