// src/job.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

use crate::awk::AwkInterpreter;
use crate::compute::Compute;
use crate::connector::ConnectorStore;
use crate::pipeline::{ComputeContext, ComputePipeline};
use crate::table::SourceTable;

fn default_source_key() -> String {
    "source(1)".to_string()
}

fn default_hostname() -> String {
    "localhost".to_string()
}

/// One source result plus the directives to run on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub connector: String,
    #[serde(default = "default_source_key")]
    pub source_key: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default)]
    pub table: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub raw_data: Option<String>,
    /// Read into `rawData`, relative to the job file.
    #[serde(default)]
    pub raw_data_file: Option<PathBuf>,
    #[serde(default)]
    pub computes: Vec<Compute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    pub source_key: String,
    pub table: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl JobFile {
    /// Parse a job file and resolve every `rawDataFile` against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading jobs {:?}", path))?;
        let mut file: JobFile =
            serde_yaml::from_str(&text).with_context(|| format!("parsing jobs {:?}", path))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for job in &mut file.jobs {
            if let Some(raw) = job.raw_data_file.as_mut() {
                if raw.is_relative() {
                    *raw = base.join(&*raw);
                }
            }
        }
        Ok(file)
    }
}

impl Job {
    /// Initial table: inline rows and raw text, with `rawDataFile` taking
    /// precedence over `rawData`.
    pub fn source_table(&self) -> Result<SourceTable> {
        let raw_data = match &self.raw_data_file {
            Some(path) => Some(
                fs::read_to_string(path).with_context(|| format!("reading rawData {:?}", path))?,
            ),
            None => self.raw_data.clone(),
        };
        Ok(SourceTable {
            table: self.table.clone().unwrap_or_default(),
            raw_data,
        })
    }

    pub fn run(
        &self,
        store: &dyn ConnectorStore,
        awk: &dyn AwkInterpreter,
        awk_timeout: Duration,
    ) -> Result<JobOutput> {
        let mut table = self.source_table()?;
        let ctx = ComputeContext {
            connector_id: &self.connector,
            source_key: &self.source_key,
            hostname: &self.hostname,
            store,
            awk,
            awk_timeout,
        };

        let report = ComputePipeline::new(self.computes.clone()).run(&mut table, &ctx);
        info!(
            source = %self.source_key,
            host = %self.hostname,
            applied = report.applied,
            skipped = report.skipped,
            rows = table.table.len(),
            "pipeline done"
        );

        Ok(JobOutput {
            source_key: self.source_key.clone(),
            table: table.table,
            raw_data: table.raw_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awk::testing::FakeAwk;
    use crate::connector::InMemoryConnectorStore;
    use crate::test_support::{init_test_logging, rows};
    use tempfile::tempdir;

    #[test]
    fn loads_and_runs_jobs() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(dir.path().join("fans.json"), r#"{"fans":[{"id":"f1","rpm":1200}]}"#)?;
        let jobs = dir.path().join("jobs.yaml");
        fs::write(
            &jobs,
            r#"
jobs:
  - connector: Fans
    sourceKey: "${source::fans.source(1)}"
    rawDataFile: fans.json
    computes:
      - type: json2Csv
        entryKey: /fans
        properties: id;rpm
  - connector: Fans
    table: [["ID1", "500", "2"]]
    computes:
      - type: add
        column: 2
        value: "$3"
"#,
        )?;

        let file = JobFile::load(&jobs)?;
        assert_eq!(file.jobs.len(), 2);

        let store = InMemoryConnectorStore::default();
        let awk = FakeAwk::returning("");
        let timeout = Duration::from_secs(1);

        let first = file.jobs[0].run(&store, &awk, timeout)?;
        assert_eq!(first.raw_data.as_deref(), Some("/fans[0];f1;1200;\n"));

        let second = file.jobs[1].run(&store, &awk, timeout)?;
        assert_eq!(second.source_key, "source(1)");
        assert_eq!(second.table, rows(&[&["ID1", "502.0", "2"]]));
        Ok(())
    }

    #[test]
    fn missing_raw_data_file_fails_the_job() {
        let job = Job {
            connector: "X".into(),
            source_key: default_source_key(),
            hostname: default_hostname(),
            table: None,
            raw_data: None,
            raw_data_file: Some(PathBuf::from("/nonexistent/raw.txt")),
            computes: Vec::new(),
        };
        let store = InMemoryConnectorStore::default();
        let awk = FakeAwk::returning("");
        assert!(job.run(&store, &awk, Duration::from_secs(1)).is_err());
    }
}
