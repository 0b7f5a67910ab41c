use crate::reports;
use crate::types::{DashboardExport, DashboardModel};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows", rows.len() - max_rows);
    }
    println!();
}

/// Write one CSV per populated section and print its preview.
fn export_section<T>(
    dir: &Path,
    file: &str,
    title: &str,
    rows: &[T],
    preview_rows: usize,
    written: &mut Vec<PathBuf>,
) -> Result<(), Box<dyn Error>>
where
    T: Serialize + Tabled + Clone,
{
    let path = dir.join(file);
    write_csv(&path, rows)?;
    preview_table(title, rows, preview_rows);
    log::debug!("Wrote {} rows to {}", rows.len(), path.display());
    written.push(path);
    Ok(())
}

/// Write the full dashboard: `dashboard.json` plus one CSV per section.
///
/// Returns the paths written, JSON first.
pub fn export_dashboard(
    model: &DashboardModel,
    source: &str,
    dir: &Path,
    preview_rows: usize,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let json_path = dir.join("dashboard.json");
    let export = DashboardExport {
        generated_at: chrono::Local::now().to_rfc3339(),
        source: source.to_string(),
        total_cases: model.total_cases(),
        model,
    };
    write_json(&json_path, &export)?;
    written.push(json_path);

    let headline = reports::headline_rows(model);
    export_section(dir, "headline.csv", "Headline", &headline, headline.len(), &mut written)?;

    for (name, dist) in model.distributions() {
        let rows = reports::distribution_rows(dist);
        export_section(dir, &format!("{name}.csv"), name, &rows, preview_rows, &mut written)?;
    }
    if let Some(issues) = &model.presenting_issues {
        let groups = reports::group_presenting_issues(issues);
        let rows = reports::issue_rows(&groups);
        export_section(
            dir,
            "presentingIssues.csv",
            "presentingIssues",
            &rows,
            preview_rows,
            &mut written,
        )?;
    }
    if let Some(education) = &model.education {
        let rows = reports::education_rows(education);
        export_section(dir, "education.csv", "education", &rows, preview_rows, &mut written)?;
    }
    if let Some(urgency) = &model.urgency {
        let rows = reports::urgency_rows(urgency);
        export_section(dir, "urgency.csv", "urgency", &rows, preview_rows, &mut written)?;
    }
    for (name, breakdown) in [
        ("casesOpened", &model.cases_opened),
        ("casesClosed", &model.cases_closed),
    ] {
        if let Some(breakdown) = breakdown {
            let rows = reports::case_breakdown_rows(breakdown);
            export_section(dir, &format!("{name}.csv"), name, &rows, 2, &mut written)?;
        }
    }

    log::info!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}
