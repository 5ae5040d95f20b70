//! Platform service traits and their Linux desktop implementations.

use std::path::{Path, PathBuf};

use chrono::Timelike;

use g15_types::error::{G15Error, Result};

// ---------------------------------------------------------------------------
// Time service
// ---------------------------------------------------------------------------

/// Local wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallTime {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// `HH:MM`
    pub fn hm(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// 12-hour clock with an AM/PM suffix.
    pub fn twelve_hour(&self, with_seconds: bool) -> String {
        let suffix = if self.hour < 12 { "AM" } else { "PM" };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        if with_seconds {
            format!("{hour}:{:02}:{:02} {suffix}", self.minute, self.second)
        } else {
            format!("{hour}:{:02} {suffix}", self.minute)
        }
    }
}

impl std::fmt::Display for WallTime {
    /// `HH:MM:SS`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Abstraction over the wall clock.
pub trait TimeService {
    fn now(&self) -> Result<WallTime>;
}

/// The system's local time zone clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeService for LocalClock {
    fn now(&self) -> Result<WallTime> {
        let now = chrono::Local::now();
        Ok(WallTime::new(
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        ))
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock(pub WallTime);

impl TimeService for FixedClock {
    fn now(&self) -> Result<WallTime> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// System statistics
// ---------------------------------------------------------------------------

/// One sample of host load and memory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemStats {
    pub load: [f32; 3],
    pub mem_total_kb: u64,
    pub mem_available_kb: u64,
    pub uptime_secs: u64,
}

impl SystemStats {
    pub fn mem_used_kb(&self) -> u64 {
        self.mem_total_kb.saturating_sub(self.mem_available_kb)
    }

    /// Memory in use, 0-100.
    pub fn mem_used_percent(&self) -> u8 {
        if self.mem_total_kb == 0 {
            return 0;
        }
        (self.mem_used_kb() * 100 / self.mem_total_kb).min(100) as u8
    }
}

/// Abstraction over host statistics.
pub trait StatsService {
    fn sample(&self) -> Result<SystemStats>;
}

/// Reads `/proc` (or a directory laid out like it).
#[derive(Debug, Clone)]
pub struct ProcStats {
    root: PathBuf,
}

impl Default for ProcStats {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcStats {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn read(&self, file: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.root.join(file))?)
    }
}

impl StatsService for ProcStats {
    fn sample(&self) -> Result<SystemStats> {
        let load = parse_loadavg(&self.read("loadavg")?)?;
        let (mem_total_kb, mem_available_kb) = parse_meminfo(&self.read("meminfo")?)?;
        let uptime_secs = parse_uptime(&self.read("uptime")?)?;
        Ok(SystemStats {
            load,
            mem_total_kb,
            mem_available_kb,
            uptime_secs,
        })
    }
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(text: &str) -> Result<[f32; 3]> {
    let mut fields = text.split_whitespace().map(str::parse::<f32>);
    let mut load = [0.0; 3];
    for slot in &mut load {
        *slot = fields
            .next()
            .and_then(|r| r.ok())
            .ok_or_else(|| G15Error::Platform("malformed loadavg".into()))?;
    }
    Ok(load)
}

/// `(MemTotal, MemAvailable)` in kB. Falls back to `MemFree` on old kernels.
pub fn parse_meminfo(text: &str) -> Result<(u64, u64)> {
    let field = |key: &str| {
        text.lines()
            .find_map(|l| l.strip_prefix(key))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|v| v.parse::<u64>().ok())
    };
    let total = field("MemTotal").ok_or_else(|| G15Error::Platform("no MemTotal".into()))?;
    let available = field("MemAvailable")
        .or_else(|| field("MemFree"))
        .ok_or_else(|| G15Error::Platform("no MemAvailable".into()))?;
    Ok((total, available))
}

/// Whole seconds from `/proc/uptime`.
pub fn parse_uptime(text: &str) -> Result<u64> {
    text.split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| G15Error::Platform("malformed uptime".into()))
}

/// `3d 04:05` style uptime.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}")
    } else {
        format!("{hours:02}:{minutes:02}")
    }
}
