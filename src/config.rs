//! Harness configuration drawn from the CI environment.
//!
//! Secret availability is resolved once here into an explicit `secure_vars`
//! flag; nothing else in the harness looks at the environment.

use crate::keyspace::KeySpace;
use anyhow::{Context, Result};
use std::env;

pub const ENV_BUCKET_NAME: &str = "SO_BUCKET_NAME";
pub const ENV_KEY_NAMESPACE: &str = "SO_KEY";
pub const ENV_RESULT_URL: &str = "SO_S3_URL";
pub const ENV_RESULTS_BUCKET: &str = "SO_BUCKET";
pub const ENV_RESULT_KEY: &str = "SO_RESULT_KEY";
pub const ENV_SECURE_VARS: &str = "SO_SECURE_VARS";
pub const ENV_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Bucket under test.
    pub bucket: String,
    /// Key namespace root inside the bucket; the harness owns and clears it.
    pub key_namespace: String,
    /// Optional destination URL for the benchmark report, overriding the
    /// results bucket/key pair.
    pub result_url: Option<String>,
    /// Results bucket for benchmark artifacts.
    pub results_bucket: Option<String>,
    /// Results object key for benchmark artifacts.
    pub results_key: Option<String>,
    /// Whether secret credentials are available in this run. Remote-only
    /// paths are skipped when false.
    pub secure_vars: bool,
    /// S3-compatible endpoint override (e.g. a local MinIO).
    pub endpoint_url: Option<String>,
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. `from_env` wires
    /// this to the process environment; tests pass a closure over a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).with_context(|| format!("please set the {name} environment variable"))
        };
        Ok(Self {
            bucket: required(ENV_BUCKET_NAME)?,
            key_namespace: required(ENV_KEY_NAMESPACE)?,
            result_url: lookup(ENV_RESULT_URL),
            results_bucket: lookup(ENV_RESULTS_BUCKET),
            results_key: lookup(ENV_RESULT_KEY),
            secure_vars: lookup(ENV_SECURE_VARS).is_some_and(|v| truthy(&v)),
            endpoint_url: lookup(ENV_ENDPOINT_URL),
        })
    }

    pub fn keyspace(&self) -> KeySpace {
        KeySpace::new(&self.bucket, &self.key_namespace)
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_bucket_name_is_fatal_and_names_the_variable() {
        let err = HarnessConfig::from_lookup(lookup_from(&[("SO_KEY", "ns")])).unwrap_err();
        assert!(err.to_string().contains("SO_BUCKET_NAME"));
    }

    #[test]
    fn missing_namespace_is_fatal() {
        let err =
            HarnessConfig::from_lookup(lookup_from(&[("SO_BUCKET_NAME", "b")])).unwrap_err();
        assert!(err.to_string().contains("SO_KEY"));
    }

    #[test]
    fn full_environment_parses() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            ("SO_BUCKET_NAME", "bucket"),
            ("SO_KEY", "ci/ns"),
            ("SO_BUCKET", "results"),
            ("SO_RESULT_KEY", "report.json"),
            ("SO_SECURE_VARS", "true"),
            ("AWS_ENDPOINT_URL", "http://minio:9000"),
        ]))
        .unwrap();
        assert_eq!(config.bucket, "bucket");
        assert_eq!(config.key_namespace, "ci/ns");
        assert_eq!(config.results_bucket.as_deref(), Some("results"));
        assert_eq!(config.results_key.as_deref(), Some("report.json"));
        assert!(config.secure_vars);
        assert_eq!(config.endpoint_url.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.keyspace().root(), "ci/ns");
    }

    #[test]
    fn secure_vars_defaults_to_false_and_accepts_truthy_spellings() {
        let base = [("SO_BUCKET_NAME", "b"), ("SO_KEY", "ns")];
        let config = HarnessConfig::from_lookup(lookup_from(&base)).unwrap();
        assert!(!config.secure_vars);

        for spelling in ["1", "true", "YES", "On"] {
            let mut pairs = base.to_vec();
            pairs.push(("SO_SECURE_VARS", spelling));
            let config = HarnessConfig::from_lookup(lookup_from(&pairs)).unwrap();
            assert!(config.secure_vars, "{spelling} should be truthy");
        }

        let mut pairs = base.to_vec();
        pairs.push(("SO_SECURE_VARS", "false"));
        assert!(!HarnessConfig::from_lookup(lookup_from(&pairs)).unwrap().secure_vars);
    }
}
