//! Disk writer and reader
//!
//! Timed chunk loops against a single file: the writer lays down the pattern
//! buffer until the target size is reached, the reader pulls chunks back and
//! can verify each one against the same pattern.

use std::path::Path;

use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::error;

use crate::config::Termination;
use crate::pattern::{pattern_buffer, verify_chunk};
use crate::report::{SessionCounters, TransferReport};

/// Write `ceil(target_bytes / chunk_size)` pattern chunks to a new file.
///
/// Partial writes are tolerated silently; the report reflects bytes actually
/// written, not bytes requested.
pub async fn write_file(
    path: &Path,
    chunk_size: usize,
    target_bytes: u64,
) -> anyhow::Result<TransferReport> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("opening output file [{}]", path.display()))?;

    let buffer = pattern_buffer(chunk_size);
    let n_blocks = target_bytes.div_ceil(chunk_size as u64);
    let mut counters = SessionCounters::start();

    for _ in 0..n_blocks {
        match file.write(&buffer).await {
            Ok(n) => counters.add_written(n as u64),
            Err(e) => {
                error!("Write error on [{}]: {}", path.display(), e);
                break;
            }
        }
    }
    file.flush().await?;

    Ok(TransferReport::sent(&counters, None))
}

/// Read a file in chunks, optionally verifying each against the pattern.
///
/// With [`Termination::UntilEof`] the loop ends at the first short read,
/// after processing that final partial chunk. [`Termination::FixedSize`]
/// bounds the loop at `ceil(target / chunk_size)` chunks instead.
/// Verification counts one error per mismatching chunk, not per byte.
pub async fn read_file(
    path: &Path,
    chunk_size: usize,
    termination: Termination,
    verify: bool,
) -> anyhow::Result<TransferReport> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("opening input file [{}]", path.display()))?;

    let reference = verify.then(|| pattern_buffer(chunk_size));
    let mut buffer = vec![0u8; chunk_size];
    let mut counters = SessionCounters::start();

    let max_blocks = match termination {
        Termination::UntilEof => u64::MAX,
        Termination::FixedSize(target) => target.div_ceil(chunk_size as u64),
    };

    let mut blocks = 0u64;
    while blocks < max_blocks {
        let n = read_full_chunk(&mut file, &mut buffer).await?;
        blocks += 1;
        counters.add_read(n as u64);

        if let Some(ref reference) = reference
            && !verify_chunk(&buffer[..n], reference)
        {
            counters.add_error();
        }

        // Short read signals end-of-file; the partial chunk above was the
        // last one.
        if n < chunk_size {
            break;
        }
    }

    Ok(TransferReport::read(&counters, verify))
}

/// Read until the buffer is full or end-of-file, returning bytes filled.
async fn read_full_chunk(file: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
