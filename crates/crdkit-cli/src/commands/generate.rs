//! Generate command - complete every configured CRD and render the manifests

use std::path::Path;

use crdkit_core::{GenerationConfig, RenderOptions, render_all};

use crate::display::{ProgressReporter, pluralize};
use crate::error::{CliError, Result};

pub fn run(
    config_path: &Path,
    output: Option<&Path>,
    strip_generated: bool,
    verbose: bool,
) -> Result<()> {
    if !config_path.exists() {
        return Err(CliError::config_with_help(
            format!("config file not found: {}", config_path.display()),
            "pass the config file with `-c <path>`",
        ));
    }

    let progress = ProgressReporter::new().verbose(verbose);
    let config = GenerationConfig::load_from(config_path)?;

    progress.step(&format!(
        "Completing {} {} from {}",
        config.crds.len(),
        pluralize(config.crds.len(), "CRD", "CRDs"),
        config_path.display()
    ));

    let mut crds = Vec::with_capacity(config.crds.len());
    for entry in &config.crds {
        let (crd, report) = config.complete_entry(entry)?;
        progress.completion(&report);
        crds.push(crd);
    }

    let options = RenderOptions {
        strip_generated: strip_generated || config.render_options().strip_generated,
    };
    let rendered = render_all(&crds, options)?;

    // -o wins over the config's output path
    let output_path = output.map(Path::to_path_buf).or_else(|| config.output_path());
    match output_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| CliError::io_at(parent, e))?;
            }
            std::fs::write(&path, rendered).map_err(|e| CliError::io_at(&path, e))?;
            progress.success(&format!(
                "Wrote {} in {:.2?}",
                path.display(),
                progress.elapsed()
            ));
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
