//! Key composition for the bucket namespace under test.
//!
//! A full storage key is `{namespace}/{run prefix}/{file name}`. The run
//! prefix carries a random suffix minted once per test run, so concurrent
//! history in the bucket never collides with a fresh run.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct KeySpace {
    /// Bucket under test.
    pub bucket: String,
    /// Root prefix owned by the harness; everything under it is deleted on
    /// initialize/clear.
    pub namespace: String,
}

impl KeySpace {
    pub fn new(bucket: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            namespace: namespace.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.namespace
    }

    /// Mint a unique run prefix under the namespace.
    pub fn fresh_run_prefix(&self) -> String {
        format!(
            "{}/test-write-key-{}",
            self.namespace,
            Uuid::new_v4().simple()
        )
    }
}

/// Full object key for a file inside a run prefix.
pub fn object_key(run_prefix: &str, file_name: &str) -> String {
    format!("{run_prefix}/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_prefix_lives_under_namespace() {
        let keys = KeySpace::new("bucket", "ci/harness");
        let prefix = keys.fresh_run_prefix();
        assert!(prefix.starts_with("ci/harness/test-write-key-"));
    }

    #[test]
    fn run_prefixes_are_unique() {
        let keys = KeySpace::new("bucket", "ns");
        assert_ne!(keys.fresh_run_prefix(), keys.fresh_run_prefix());
    }

    #[test]
    fn object_key_joins_prefix_and_file() {
        assert_eq!(object_key("ns/run-1", "sanity.txt"), "ns/run-1/sanity.txt");
    }
}
