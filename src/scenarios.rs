//! Round-trip scenario suite run against a storage backend.
//!
//! Every scenario mints a fresh run prefix, performs one round trip, clears
//! the namespace, and fails on any byte difference. The suite is the same
//! whether it runs against S3 or the local mock backend.

use crate::backend::{ObjectBackend, SERVER_SIDE_ENCRYPTION, TransportOptions};
use crate::bucket::BucketManager;
use crate::keyspace::{self, KeySpace};
use crate::verify::{self, Payload};
use anyhow::{Result, bail, ensure};

const ONE_MIB: usize = 1024 * 1024;

// Non-ASCII text keeps the UTF-8 path honest.
const SANITY_TEXT: &str = "zażółć gęślą jaźń";

/// Scenario names in suite order.
pub const SCENARIO_NAMES: &[&str] = &[
    "readwrite_text",
    "readwrite_text_gzip",
    "readwrite_binary",
    "readwrite_binary_gzip",
    "performance_1mib",
    "performance_1mib_gzip",
    "performance_small_reads",
    "encrypted_text",
];

/// Run a single named scenario.
pub async fn run_scenario(name: &str, backend: &dyn ObjectBackend, keys: &KeySpace) -> Result<()> {
    let bucket = BucketManager::new(backend, keys.clone());
    match name {
        "readwrite_text" => roundtrip(backend, &bucket, "sanity.txt", text_payload(), None).await,
        "readwrite_text_gzip" => {
            roundtrip(backend, &bucket, "sanity.txt.gz", text_payload(), None).await
        }
        "readwrite_binary" => {
            roundtrip(backend, &bucket, "sanity.bin", binary_payload(), None).await
        }
        "readwrite_binary_gzip" => {
            roundtrip(backend, &bucket, "sanity.bin.gz", binary_payload(), None).await
        }
        "performance_1mib" => {
            roundtrip(backend, &bucket, "performance.bin", one_mib_payload(), None).await
        }
        "performance_1mib_gzip" => {
            roundtrip(backend, &bucket, "performance.bin.gz", one_mib_payload(), None).await
        }
        "performance_small_reads" => small_reads(backend, &bucket).await,
        "encrypted_text" => {
            let mut options = TransportOptions::new();
            options.insert(SERVER_SIDE_ENCRYPTION.to_string(), "AES256".to_string());
            roundtrip(backend, &bucket, "sanity.txt", text_payload(), Some(options)).await
        }
        other => bail!("unknown scenario '{other}'"),
    }
}

/// Run the whole suite in order, stopping at the first failure.
pub async fn run_all(backend: &dyn ObjectBackend, keys: &KeySpace) -> Result<()> {
    for name in SCENARIO_NAMES {
        run_scenario(name, backend, keys).await?;
    }
    Ok(())
}

fn text_payload() -> Payload {
    Payload::Text(SANITY_TEXT.to_string())
}

fn binary_payload() -> Payload {
    Payload::Binary(b"this is a test".to_vec())
}

fn one_mib_payload() -> Payload {
    Payload::Binary(b"01234567".repeat(ONE_MIB / 8))
}

async fn roundtrip(
    backend: &dyn ObjectBackend,
    bucket: &BucketManager<'_>,
    file_name: &str,
    payload: Payload,
    options: Option<TransportOptions>,
) -> Result<()> {
    let prefix = bucket.initialize().await?;
    let key = keyspace::object_key(&prefix, file_name);
    let options = options.unwrap_or_default();
    let actual = verify::write_read(backend, &key, &payload, &options).await?;
    bucket.clear().await?;
    ensure!(actual == payload, "round trip mismatch at '{key}'");
    Ok(())
}

async fn small_reads(backend: &dyn ObjectBackend, bucket: &BucketManager<'_>) -> Result<()> {
    let prefix = bucket.initialize().await?;
    let key = keyspace::object_key(&prefix, "many_reads_performance.bin");

    // ~1 MiB of length-prefixed messages: \x0f then 15 body bytes, repeated.
    let mut message = vec![0x0f];
    message.extend_from_slice(b"0123456789abcde");
    let mut framed = Vec::with_capacity(ONE_MIB + message.len());
    while framed.len() < ONE_MIB {
        framed.extend_from_slice(&message);
    }

    backend
        .put_object(&key, &framed, &TransportOptions::new())
        .await?;
    let actual = verify::read_length_prefixed_messages(backend, &key).await?;
    bucket.clear().await?;
    ensure!(actual == framed, "framed round trip mismatch at '{key}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::localfs::LocalFsBackend;

    #[tokio::test]
    async fn unknown_scenario_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = LocalFsBackend::new(dir.path());
        let keys = KeySpace::new("bucket", "ns");
        assert!(run_scenario("no_such_thing", &backend, &keys).await.is_err());
    }

    #[tokio::test]
    async fn every_named_scenario_passes_on_localfs() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = LocalFsBackend::new(dir.path());
        let keys = KeySpace::new("bucket", "ns");
        run_all(&backend, &keys).await.unwrap();
    }
}
