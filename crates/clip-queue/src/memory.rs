//! Memory-based concurrency adaptation.
//!
//! The scheduler sizes its concurrency cap from an estimate of available
//! device memory. The estimate is taken on observable lifecycle events
//! (construction, an explicit refresh when the process regains the
//! foreground) — never by continuous polling.

pub const GIB: u64 = 1 << 30;

/// Fallback estimate when the platform offers no memory figure.
const DEFAULT_AVAILABLE: u64 = 4 * GIB;

/// Source of an available-memory estimate.
pub trait MemoryProbe: Send + Sync {
    fn available_bytes(&self) -> u64;
}

/// Reads `MemAvailable` from /proc/meminfo on Linux; conservative default
/// elsewhere or when the file is unreadable.
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn available_bytes(&self) -> u64 {
        read_meminfo_available().unwrap_or(DEFAULT_AVAILABLE)
    }
}

#[cfg(target_os = "linux")]
fn read_meminfo_available() -> Option<u64> {
    let raw = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("MemAvailable:") {
            let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn read_meminfo_available() -> Option<u64> {
    None
}

/// Fixed estimate for tests and simulations.
pub struct FixedMemoryProbe(pub u64);

impl MemoryProbe for FixedMemoryProbe {
    fn available_bytes(&self) -> u64 {
        self.0
    }
}

/// Concurrency slots for an available-memory estimate.
pub fn slots_for(available_bytes: u64) -> usize {
    if available_bytes <= 2 * GIB {
        1
    } else if available_bytes <= 4 * GIB {
        2
    } else if available_bytes <= 8 * GIB {
        3
    } else {
        4
    }
}
