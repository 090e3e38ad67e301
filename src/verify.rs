//! Round-trip verification through a storage transport.
//!
//! `write_read` uploads a payload under a key and downloads it again; the
//! caller compares the result with the original. Keys ending in `.gz` get a
//! transparent gzip codec, so the bytes on the wire are compressed while the
//! comparison still sees the original payload. Failures are never retried
//! here; the CI runner owns the rerun policy.

use crate::backend::{ObjectBackend, TransportOptions};
use anyhow::{Context, Result, ensure};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};

/// Payload for a round trip: UTF-8 text or raw bytes. Immutable for the
/// duration of the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    fn encode(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    /// Decode read-back bytes in the same mode this payload was written in.
    fn decode_like(&self, data: Vec<u8>) -> Result<Payload> {
        match self {
            Payload::Text(_) => Ok(Payload::Text(
                String::from_utf8(data).context("object read back is not valid UTF-8")?,
            )),
            Payload::Binary(_) => Ok(Payload::Binary(data)),
        }
    }
}

fn is_gzip_key(key: &str) -> bool {
    key.ends_with(".gz")
}

fn gzip_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gzip_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .context("gzip decode failed")?;
    Ok(out)
}

/// Write `payload` under `key`, read it back, and return the read payload.
pub async fn write_read(
    backend: &dyn ObjectBackend,
    key: &str,
    payload: &Payload,
    options: &TransportOptions,
) -> Result<Payload> {
    let bytes = if is_gzip_key(key) {
        gzip_encode(payload.encode())?
    } else {
        payload.encode().to_vec()
    };
    backend.put_object(key, &bytes, options).await?;
    let raw = fetch(backend, key).await?;
    payload.decode_like(raw)
}

async fn fetch(backend: &dyn ObjectBackend, key: &str) -> Result<Vec<u8>> {
    let raw = backend
        .get_object(key)
        .await?
        .with_context(|| format!("no object found at key '{key}'"))?;
    if is_gzip_key(key) {
        gzip_decode(&raw)
    } else {
        Ok(raw)
    }
}

/// Read back a stream of length-prefixed messages: one prefix byte giving
/// the body length, then the body, repeated until end of stream. Returns the
/// concatenation of all prefix+body segments, which reproduces a well-formed
/// framed byte sequence exactly.
///
/// A body shorter than its prefix announces is an error, not a silent
/// truncation.
pub async fn read_length_prefixed_messages(
    backend: &dyn ObjectBackend,
    key: &str,
) -> Result<Vec<u8>> {
    let raw = fetch(backend, key).await?;
    parse_framed(&raw)
}

fn parse_framed(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some((&length_byte, tail)) = rest.split_first() {
        let len = length_byte as usize;
        ensure!(
            tail.len() >= len,
            "truncated framed message: prefix announces {len} bytes but only {} remain",
            tail.len()
        );
        out.push(length_byte);
        out.extend_from_slice(&tail[..len]);
        rest = &tail[len..];
    }
    Ok(out)
}
