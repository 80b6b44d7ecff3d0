//! Check command - run the structural schema rules over existing CRD manifests

use std::path::PathBuf;

use console::style;
use crdkit_core::{CustomResourceDefinition, load_crds, validate_structural};

use crate::display::CheckReport;
use crate::error::{CliError, Result};

pub fn run(files: &[PathBuf]) -> Result<()> {
    let mut report = CheckReport::new();

    for file in files {
        let crds = load_crds(file)?;
        let file_name = file.display().to_string();

        for crd in &crds {
            check_crd(&mut report, &file_name, crd);
        }
    }

    if report.has_violations() {
        report.display();
        println!();
        report.print_summary();
        return Err(CliError::check_failed(
            report.violations.len(),
            report.failed_versions(),
        ));
    }

    report.print_summary();
    Ok(())
}

fn check_crd(report: &mut CheckReport, file: &str, crd: &CustomResourceDefinition) {
    let name = crd.metadata.name.as_deref().unwrap_or_default();

    for version in &crd.spec.versions {
        let schema = version
            .schema
            .as_ref()
            .and_then(|validation| validation.open_api_v3_schema.as_ref());

        let Some(schema) = schema else {
            println!(
                "  {} {} {}: no schema, skipped",
                style("⚠").yellow(),
                name,
                version.name
            );
            continue;
        };

        tracing::debug!(crd = %name, version = %version.name, "checking structural rules");
        let errors = match validate_structural(schema) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.into_inner(),
        };
        report.add_version(file, name, &version.name, errors);
    }
}
