use crate::error::LoadError;
use crate::extract::extract_dashboard;
use crate::schema::ReportSchema;
use crate::types::DashboardModel;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub bytes: usize,
    pub sections_found: usize,
    pub sections_missing: Vec<&'static str>,
}

/// Only files with an `.xml` extension are accepted.
pub fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Extract a model from report text already in memory.
pub fn load_from_str(
    xml: &str,
    schema: &ReportSchema,
) -> Result<(DashboardModel, LoadReport), LoadError> {
    let model = extract_dashboard(xml, schema)?;
    let sections_missing = model.missing_sections();
    for section in &sections_missing {
        log::warn!("Report section {section} not found; leaving it out of the dashboard");
    }
    let total = DashboardModel::default().missing_sections().len();
    let report = LoadReport {
        bytes: xml.len(),
        sections_found: total - sections_missing.len(),
        sections_missing,
    };
    Ok((model, report))
}

pub fn load_report(
    path: &Path,
    schema: &ReportSchema,
) -> Result<(DashboardModel, LoadReport), LoadError> {
    if !is_xml_file(path) {
        return Err(LoadError::NotXml(path.to_path_buf()));
    }
    let xml = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Read {} ({} bytes)", path.display(), xml.len());

    let (model, report) = load_from_str(&xml, schema).inspect_err(|e| {
        log::error!("Extraction failed for {}: {e}", path.display());
    })?;
    log::info!(
        "Extracted {} of {} sections from {}",
        report.sections_found,
        report.sections_found + report.sections_missing.len(),
        path.display()
    );
    Ok((model, report))
}
