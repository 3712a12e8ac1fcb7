use anyhow::{bail, Context, Result};
use source_compute::{
    job::{JobFile, JobOutput},
    AwkCommand, EngineConfig, InMemoryConnectorStore,
};
use std::{path::PathBuf, sync::Arc};
use tokio::{sync::Semaphore, task::JoinHandle, time::Instant};
use tracing::{error, info};

const USAGE: &str = "usage: source-compute <job.yaml> [--config <engine.yaml>]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(PathBuf, Option<PathBuf>)> {
    let mut jobs = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = Some(PathBuf::from(args.next().context(USAGE)?));
            }
            "--help" | "-h" => bail!(USAGE),
            _ if jobs.is_none() => jobs = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {:?}\n{}", arg, USAGE),
        }
    }
    Ok((jobs.context(USAGE)?, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config + logging ─────────────────────────────────────────
    let (jobs_path, config_path) = parse_args(std::env::args().skip(1))?;
    let config = EngineConfig::load(config_path.as_deref())?;
    config.init_tracing();
    info!("startup");

    // ─── 2) connectors (read-only from here on) ──────────────────────
    let store = Arc::new(InMemoryConnectorStore::load_dir(&config.connectors_dir)?);
    let awk = Arc::new(AwkCommand::new(config.awk_command.clone()));
    let awk_timeout = config.awk_timeout();

    // ─── 3) jobs ─────────────────────────────────────────────────────
    let jobs = JobFile::load(&jobs_path)?.jobs;
    if jobs.is_empty() {
        info!("no jobs in {}; exit", jobs_path.display());
        return Ok(());
    }
    info!("{} job(s) to run", jobs.len());

    // ─── 4) one pipeline per job on the blocking pool ────────────────
    let sem = Arc::new(Semaphore::new(config.max_concurrent_pipelines));
    let mut handles: Vec<(String, JoinHandle<Result<JobOutput>>)> = Vec::with_capacity(jobs.len());

    for job in jobs {
        let permit = Arc::clone(&sem).acquire_owned().await?;
        let store = Arc::clone(&store);
        let awk = Arc::clone(&awk);
        let name = format!("{}/{}", job.connector, job.source_key);

        handles.push((
            name,
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let start = Instant::now();
                let out = job.run(store.as_ref(), awk.as_ref(), awk_timeout);
                info!(source = %job.source_key, elapsed = ?start.elapsed(), "job finished");
                out
            }),
        ));
    }

    // ─── 5) print results in job order ───────────────────────────────
    let mut failed = 0usize;
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(output)) => println!("{}", serde_json::to_string(&output)?),
            Ok(Err(e)) => {
                failed += 1;
                error!("{} failed: {:#}", name, e);
            }
            Err(e) => {
                failed += 1;
                error!("{} panicked: {}", name, e);
            }
        }
    }

    info!("done ({} failed)", failed);
    Ok(())
}
