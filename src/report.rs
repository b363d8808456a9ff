//! Session counters and throughput reports
//!
//! Every session owns one [`SessionCounters`] accumulator, created when the
//! transfer clock starts and consumed when the report line is produced.
//! Rates are decimal: 1 MB = 1_000_000 bytes, Mb/s = MB/s * 8.

use std::time::Instant;

use serde::Serialize;

/// Per-session mutable accumulators. Exclusively owned by one session.
#[derive(Debug)]
pub struct SessionCounters {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub errors: u64,
    start: Instant,
}

impl SessionCounters {
    pub fn start() -> Self {
        Self {
            bytes_read: 0,
            bytes_written: 0,
            errors: 0,
            start: Instant::now(),
        }
    }

    pub fn add_read(&mut self, n: u64) {
        self.bytes_read += n;
    }

    pub fn add_written(&mut self, n: u64) {
        self.bytes_written += n;
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Byte loss relative to an expected total, absolute and as a percentage.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LostBytes {
    pub bytes: u64,
    pub percent: f64,
}

impl LostBytes {
    pub fn against(expected: u64, actual: u64) -> Self {
        let bytes = expected.saturating_sub(actual);
        let percent = if expected > 0 {
            (bytes as f64 * 100.0) / expected as f64
        } else {
            0.0
        };
        Self { bytes, percent }
    }
}

/// End-of-session report. One per session, printed and discarded.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// Operation label: "written", "read", "verified" or "read/written".
    pub label: &'static str,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub duration_secs: f64,
    /// Throughput in MB/s; Mb/s in the report line is this times 8.
    pub rate_mbps: f64,
    /// Sender-side shortfall: requested total minus bytes actually written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_bytes: Option<u64>,
    /// Receiver-side loss against the nominal transfer size (UDP server).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_read: Option<LostBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_written: Option<LostBytes>,
    /// Verification mismatch count (reader with -v).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    /// Observed peer address (server modes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1_000_000.0
}

fn rate(mb: f64, secs: f64) -> f64 {
    if secs > 0.0 { mb / secs } else { 0.0 }
}

impl TransferReport {
    /// Sender-side report (disk writer, TCP/UDP client).
    ///
    /// `requested` enables the lost-bytes line when the write loop may have
    /// fallen short of the target.
    pub fn sent(counters: &SessionCounters, requested: Option<u64>) -> Self {
        let secs = counters.elapsed_secs();
        Self {
            label: "written",
            bytes_read: 0,
            bytes_written: counters.bytes_written,
            duration_secs: secs,
            rate_mbps: rate(bytes_to_mb(counters.bytes_written), secs),
            lost_bytes: requested.map(|r| r.saturating_sub(counters.bytes_written)),
            lost_read: None,
            lost_written: None,
            errors: None,
            peer: None,
        }
    }

    /// Disk reader report; label differs when verification ran.
    pub fn read(counters: &SessionCounters, verified: bool) -> Self {
        let secs = counters.elapsed_secs();
        Self {
            label: if verified { "verified" } else { "read" },
            bytes_read: counters.bytes_read,
            bytes_written: 0,
            duration_secs: secs,
            rate_mbps: rate(bytes_to_mb(counters.bytes_read), secs),
            lost_bytes: None,
            lost_read: None,
            lost_written: None,
            errors: (counters.errors > 0).then_some(counters.errors),
            peer: None,
        }
    }

    /// Receiver-side report (TCP/UDP server sessions).
    ///
    /// `loss_baseline` is the nominal transfer size the UDP server accounts
    /// losses against; TCP passes None since the byte stream is reliable.
    pub fn received(
        counters: &SessionCounters,
        peer: Option<String>,
        loss_baseline: Option<u64>,
    ) -> Self {
        let secs = counters.elapsed_secs();
        Self {
            label: "read/written",
            bytes_read: counters.bytes_read,
            bytes_written: counters.bytes_written,
            duration_secs: secs,
            rate_mbps: rate(bytes_to_mb(counters.bytes_read), secs),
            lost_bytes: None,
            lost_read: loss_baseline.map(|b| LostBytes::against(b, counters.bytes_read)),
            lost_written: loss_baseline.map(|b| LostBytes::against(b, counters.bytes_written)),
            errors: None,
            peer,
        }
    }

    /// Render the single-line plain report.
    pub fn plain(&self) -> String {
        let mut line = match self.label {
            "read/written" => format!(
                "read/written {:.2}/{:.2} MB in {:.3} s, {:.2} MB/s, {:.2} Mb/s",
                bytes_to_mb(self.bytes_read),
                bytes_to_mb(self.bytes_written),
                self.duration_secs,
                self.rate_mbps,
                self.rate_mbps * 8.0,
            ),
            "written" => format!(
                "written {:.2} MB in {:.3} s, {:.2} MB/s, {:.2} Mb/s",
                bytes_to_mb(self.bytes_written),
                self.duration_secs,
                self.rate_mbps,
                self.rate_mbps * 8.0,
            ),
            _ => format!(
                "{} {:.2} MB in {:.3} s, {:.2} MB/s, {:.2} Mb/s",
                self.label,
                bytes_to_mb(self.bytes_read),
                self.duration_secs,
                self.rate_mbps,
                self.rate_mbps * 8.0,
            ),
        };

        if let Some(lost) = self.lost_bytes {
            line.push_str(&format!(", lost {}", lost));
        }
        if let Some(lost) = self.lost_read {
            line.push_str(&format!(", lostRead {} ({:.2}%)", lost.bytes, lost.percent));
        }
        if let Some(lost) = self.lost_written {
            line.push_str(&format!(
                ", lostWrite {} ({:.2}%)",
                lost.bytes, lost.percent
            ));
        }
        if let Some(ref peer) = self.peer {
            line.push_str(&format!(", client {}", peer));
        }

        line
    }

    /// Render the report as a JSON object.
    pub fn json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
