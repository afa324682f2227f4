use std::path::Path;

use anyhow::Context;

use crate::report::RunReport;

pub fn to_json(report: &RunReport) -> anyhow::Result<String> {
    let mut v = serde_json::to_value(report)?;
    v["summary"] = serde_json::to_value(report.summary())?;
    Ok(serde_json::to_string_pretty(&v)?)
}

pub fn write_json(report: &RunReport, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, to_json(report)?)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RunReport, TaskReport, REPORT_SCHEMA_VERSION};

    #[test]
    fn test_write_json_includes_summary() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reports/run.json");
        let report = RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: "2026-01-01T00:00:00Z".into(),
            provider: "fake".into(),
            dry_run: true,
            tables_fetched: 2,
            tasks: vec![TaskReport::new("fields Customers").finish(None)],
        };

        write_json(&report, &path)?;

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(v["summary"]["up_to_date"], 1);
        assert_eq!(v["tasks"][0]["status"], "up_to_date");
        assert_eq!(v["dry_run"], true);
        Ok(())
    }
}
