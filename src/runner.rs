//! CI entry points: benchmark and integration runs.
//!
//! The rerun policy lives here and only here. Scenario and test failures of
//! any kind are retried uniformly; the verifier and the transport never
//! retry on their own.

use crate::backend::s3::{S3Backend, S3Config};
use crate::bucket::BucketManager;
use crate::config::{ENV_RESULT_KEY, ENV_RESULT_URL, ENV_RESULTS_BUCKET, HarnessConfig};
use crate::scenarios;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const RERUN_ATTEMPTS: u32 = 3;
pub const RERUN_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    pub commit: String,
    pub recorded_at: String,
    pub results: Vec<ScenarioTiming>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioTiming {
    pub name: String,
    pub attempts: u32,
    pub elapsed_ms: u64,
}

/// Current commit hash from the version-control CLI.
pub fn current_commit() -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .context("Failed to run git rev-parse")?;
    if !output.status.success() {
        bail!("git rev-parse exited with status: {}", output.status);
    }
    let commit = String::from_utf8(output.stdout)
        .context("git rev-parse produced non-UTF-8 output")?
        .trim()
        .to_string();
    if commit.is_empty() {
        bail!("git rev-parse produced no output");
    }
    Ok(commit)
}

/// Run an operation under the rerun policy: after a failure, rerun up to
/// [`RERUN_ATTEMPTS`] more times with a fixed delay in between, so the
/// budget is the initial run plus that many reruns. Returns the value
/// together with the number of executions spent.
pub async fn run_with_reruns<T, F, Fut>(operation: F, operation_name: &str) -> Result<(T, u32)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if attempt <= RERUN_ATTEMPTS => {
                warn!("{operation_name} failed (rerun {attempt}/{RERUN_ATTEMPTS} pending): {e:#}");
                tokio::time::sleep(RERUN_DELAY).await;
            }
            Err(e) => {
                return Err(e.context(format!(
                    "{operation_name} failed after {RERUN_ATTEMPTS} reruns"
                )));
            }
        }
    }
}

/// Run the remote scenario suite, timing each scenario, then upload the
/// report to the results bucket with the cloud-storage CLI.
pub async fn benchmark(config: &HarnessConfig) -> Result<()> {
    if !config.secure_vars {
        warn!("secure variables unavailable; skipping benchmark run");
        return Ok(());
    }

    let commit = current_commit()?;
    let backend = build_backend(config).await?;
    let keys = config.keyspace();

    let mut results = Vec::new();
    for name in scenarios::SCENARIO_NAMES {
        let started = Instant::now();
        let ((), attempts) =
            run_with_reruns(|| scenarios::run_scenario(name, &backend, &keys), name).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(scenario = %name, attempts, elapsed_ms, "scenario completed");
        results.push(ScenarioTiming {
            name: name.to_string(),
            attempts,
            elapsed_ms,
        });
    }

    let report = BenchmarkReport {
        commit,
        recorded_at: Utc::now().to_rfc3339(),
        results,
    };
    let path = write_report(&report).context("Failed to write benchmark report")?;
    upload_report(config, &path)
}

/// Run the local test suite through the test-runner CLI, then the remote
/// scenario suite when credentials allow.
pub async fn integration(config: &HarnessConfig) -> Result<()> {
    run_local_tests().await?;

    if !config.secure_vars {
        warn!("secure variables unavailable; skipping remote scenario suite");
        return Ok(());
    }
    let backend = build_backend(config).await?;
    let keys = config.keyspace();
    for name in scenarios::SCENARIO_NAMES {
        run_with_reruns(|| scenarios::run_scenario(name, &backend, &keys), name).await?;
    }
    Ok(())
}

/// Delete everything under the configured key namespace.
pub async fn clear(config: &HarnessConfig) -> Result<()> {
    let backend = build_backend(config).await?;
    BucketManager::new(&backend, config.keyspace()).clear().await
}

async fn run_local_tests() -> Result<()> {
    let ((), _attempts) = run_with_reruns(
        || async {
            let status = Command::new("cargo")
                .args(["test", "--quiet"])
                .status()
                .context("Failed to run cargo test")?;
            if !status.success() {
                bail!("cargo test exited with status: {status}");
            }
            Ok(())
        },
        "cargo test",
    )
    .await?;
    Ok(())
}

async fn build_backend(config: &HarnessConfig) -> Result<S3Backend> {
    let s3_config = match &config.endpoint_url {
        Some(endpoint) => S3Config::compatible(endpoint.clone(), config.bucket.clone()),
        None => S3Config::aws(config.bucket.clone()),
    };
    S3Backend::new(s3_config).await
}

fn write_report(report: &BenchmarkReport) -> Result<PathBuf> {
    let dir = Path::new(".benchmarks");
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", report.commit));
    std::fs::write(&path, serde_json::to_vec_pretty(report)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn upload_report(config: &HarnessConfig, path: &Path) -> Result<()> {
    let destination = match (
        &config.result_url,
        &config.results_bucket,
        &config.results_key,
    ) {
        (Some(url), _, _) => url.clone(),
        (None, Some(bucket), Some(key)) => format!("s3://{bucket}/{key}"),
        _ => bail!(
            "please set {ENV_RESULT_URL} or both {ENV_RESULTS_BUCKET} and {ENV_RESULT_KEY}"
        ),
    };
    let status = Command::new("aws")
        .arg("s3")
        .arg("cp")
        .arg(path)
        .arg(&destination)
        .status()
        .context("Failed to run aws s3 cp")?;
    if !status.success() {
        bail!("aws s3 cp exited with status: {status}");
    }
    info!("uploaded benchmark report to {destination}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn rerun_policy_returns_first_success() {
        let ((), attempts) = run_with_reruns(|| async { Ok(()) }, "noop").await.unwrap();
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_policy_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let ((), attempts) = run_with_reruns(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                    bail!("transient")
                }
                Ok(())
            },
            "flaky",
        )
        .await
        .unwrap();
        assert_eq!(attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_policy_allows_three_reruns_after_first_failure() {
        // initial run fails three times; the third rerun must still pass
        let calls = AtomicU32::new(0);
        let ((), attempts) = run_with_reruns(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                    bail!("transient")
                }
                Ok(())
            },
            "stubborn",
        )
        .await
        .unwrap();
        assert_eq!(attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rerun_policy_gives_up_after_rerun_budget() {
        let calls = AtomicU32::new(0);
        let err = run_with_reruns::<(), _, _>(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                bail!("always broken")
            },
            "broken",
        )
        .await
        .unwrap_err();
        // one initial run plus the full rerun budget
        assert_eq!(calls.load(Ordering::SeqCst), RERUN_ATTEMPTS + 1);
        assert!(err.to_string().contains("failed after 3 reruns"));
    }
}
