//! External process launching.
//!
//! Launched processes are tracked in a [`ProcessTable`] shared between the
//! control thread (which publishes entries) and per-process reaper threads
//! (which log output and remove the entry once the process is done). The
//! control thread never blocks on a child.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use g15_types::error::{G15Error, Result};

/// Split an argument string on spaces, keeping quoted groups together.
///
/// A token starting with `"` opens a group that runs until a token ending
/// with `"`; the group is joined back with single spaces and its outer
/// quotes removed. An unterminated group runs to the end of the input.
pub fn split_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut group: Option<String> = None;
    for token in args.split(' ') {
        match group.as_mut() {
            Some(open) => {
                open.push(' ');
                open.push_str(token);
                if token.ends_with('"') {
                    if let Some(done) = group.take() {
                        out.push(strip_quotes(&done));
                    }
                }
            },
            None if token.starts_with('"') => {
                if token.len() > 1 && token.ends_with('"') {
                    out.push(strip_quotes(token));
                } else {
                    group = Some(token.to_string());
                }
            },
            None if token.is_empty() => {},
            None => out.push(token.to_string()),
        }
    }
    if let Some(open) = group {
        out.push(strip_quotes(&open));
    }
    out
}

fn strip_quotes(s: &str) -> String {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s).to_string()
}

/// Opaque identifier of a launched process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessHandle(String);

impl ProcessHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spawns external commands without waiting for them.
pub trait ProcessLauncher {
    /// Start `program` with `args`.
    fn launch(&self, program: &str, args: &[String]) -> Result<ProcessHandle>;

    /// Whether the process is still tracked as running.
    fn is_alive(&self, handle: &ProcessHandle) -> bool;

    /// Kill the process. Returns false if it was not running.
    fn terminate(&self, handle: &ProcessHandle) -> bool;
}

// ---------------------------------------------------------------------------
// Process table
// ---------------------------------------------------------------------------

/// Metadata kept for a running process.
#[derive(Debug)]
pub struct ProcessDetails {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub pid: u32,
    pub started: Instant,
    child: Child,
}

/// Running processes keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: Arc<Mutex<HashMap<String, ProcessDetails>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProcessDetails>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: &ProcessHandle) -> bool {
        self.lock().contains_key(handle.as_str())
    }

    /// Pid of a running process.
    pub fn pid(&self, handle: &ProcessHandle) -> Option<u32> {
        self.lock().get(handle.as_str()).map(|d| d.pid)
    }

    pub fn handles(&self) -> Vec<ProcessHandle> {
        let mut handles: Vec<_> = self.lock().keys().cloned().map(ProcessHandle).collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }

    /// Insert under `<name>-<millis>`, adding `-<i>` until the key is free.
    fn insert(&self, details: ProcessDetails) -> ProcessHandle {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let base = format!("{}-{millis}", details.name);
        let mut entries = self.lock();
        let mut key = base.clone();
        let mut i = 1;
        while entries.contains_key(&key) {
            key = format!("{base}-{i}");
            i += 1;
        }
        entries.insert(key.clone(), details);
        ProcessHandle(key)
    }

    fn remove(&self, key: &str) -> Option<ProcessDetails> {
        self.lock().remove(key)
    }

    fn kill(&self, key: &str) -> bool {
        match self.lock().get_mut(key) {
            Some(details) => match details.child.kill() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("failed to kill {key}: {e}");
                    false
                },
            },
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Std launcher
// ---------------------------------------------------------------------------

/// Launcher backed by `std::process`.
#[derive(Debug, Clone, Default)]
pub struct StdProcessLauncher {
    table: ProcessTable,
}

impl StdProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }
}

/// Log every line of `stream` as `[name||label] line`.
fn log_lines<R: Read>(stream: R, name: &str, label: &str) {
    for line in BufReader::new(stream).lines() {
        match line {
            Ok(line) => log::info!("[{name}||{label}] {line}"),
            Err(_) => break,
        }
    }
}

impl ProcessLauncher for StdProcessLauncher {
    fn launch(&self, program: &str, args: &[String]) -> Result<ProcessHandle> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| G15Error::Process(format!("failed to start {program}: {e}")))?;

        let name = std::path::Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string());
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let pid = child.id();

        let handle = self.table.insert(ProcessDetails {
            name: name.clone(),
            program: program.to_string(),
            args: args.to_vec(),
            pid,
            started: Instant::now(),
            child,
        });
        log::info!("started {handle} (pid {pid})");

        let table = self.table.clone();
        let key = handle.as_str().to_string();
        std::thread::Builder::new()
            .name(format!("reap-{name}"))
            .spawn(move || {
                let err_name = name.clone();
                let err_thread = stderr.map(|s| {
                    std::thread::spawn(move || log_lines(s, &err_name, "stderr"))
                });
                if let Some(s) = stdout {
                    log_lines(s, &name, "stdout");
                }
                if let Some(t) = err_thread {
                    let _ = t.join();
                }
                if let Some(mut details) = table.remove(&key) {
                    match details.child.wait() {
                        Ok(status) => log::info!("{key} exited: {status}"),
                        Err(e) => log::warn!("{key} wait failed: {e}"),
                    }
                }
            })?;

        Ok(handle)
    }

    fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.table.contains(handle)
    }

    fn terminate(&self, handle: &ProcessHandle) -> bool {
        self.table.kill(handle.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        false
    }

    #[test]
    fn split_plain_tokens() {
        assert_eq!(split_args("-a -b value"), vec!["-a", "-b", "value"]);
    }

    #[test]
    fn split_quoted_group() {
        assert_eq!(
            split_args("-e \"top -d 1\" --x"),
            vec!["-e", "top -d 1", "--x"]
        );
    }

    #[test]
    fn split_single_token_quotes() {
        assert_eq!(split_args("\"one\" two"), vec!["one", "two"]);
    }

    #[test]
    fn split_unterminated_group_runs_to_end() {
        assert_eq!(split_args("-t \"a b c"), vec!["-t", "a b c"]);
    }

    #[test]
    fn split_keeps_inner_spacing() {
        assert_eq!(split_args("\"a  b\""), vec!["a  b"]);
    }

    #[test]
    fn split_empty_and_extra_spaces() {
        assert!(split_args("").is_empty());
        assert_eq!(split_args("  a   b "), vec!["a", "b"]);
    }

    #[test]
    fn split_lone_quote() {
        assert_eq!(split_args("\" x\""), vec![" x"]);
    }

    #[test]
    fn launch_missing_program_fails() {
        let launcher = StdProcessLauncher::new();
        let err = launcher
            .launch("/nonexistent/definitely-not-here", &[])
            .unwrap_err();
        assert!(matches!(err, G15Error::Process(_)));
        assert!(launcher.table().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn finished_process_is_reaped() {
        let launcher = StdProcessLauncher::new();
        let handle = launcher
            .launch("sh", &["-c".into(), "echo hello; echo oops >&2".into()])
            .unwrap();
        assert!(handle.as_str().starts_with("sh-"));
        assert!(wait_until(|| !launcher.is_alive(&handle)));
    }

    #[cfg(unix)]
    #[test]
    fn terminate_kills_running_process() {
        let launcher = StdProcessLauncher::new();
        let handle = launcher.launch("sleep", &["30".into()]).unwrap();
        assert!(launcher.is_alive(&handle));
        assert!(launcher.table().pid(&handle).is_some());
        assert!(launcher.terminate(&handle));
        assert!(wait_until(|| !launcher.is_alive(&handle)));
        assert!(!launcher.terminate(&handle));
    }

    #[cfg(unix)]
    #[test]
    fn colliding_names_get_suffixes() {
        let launcher = StdProcessLauncher::new();
        let a = launcher.launch("sleep", &["30".into()]).unwrap();
        let b = launcher.launch("sleep", &["30".into()]).unwrap();
        assert_ne!(a, b);
        assert_eq!(launcher.table().handles().len(), 2);
        launcher.terminate(&a);
        launcher.terminate(&b);
        assert!(wait_until(|| launcher.table().is_empty()));
    }
}
