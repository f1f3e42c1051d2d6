//! Registry of external processes spawned by the UI automation bridge
//!
//! Bridge calls register their child while it runs. On shutdown the server calls
//! [`kill_all`] so scripts stuck on an unresponsive window do not outlive it.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ChildProcessInfo {
    pub pid: u32,
    pub label: String,
    pub started_at: Instant,
}

static CHILD_PROCESSES: OnceLock<RwLock<HashMap<u32, ChildProcessInfo>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<u32, ChildProcessInfo>> {
    CHILD_PROCESSES.get_or_init(|| RwLock::new(HashMap::new()))
}

pub fn register(pid: u32, label: &str) {
    if let Ok(mut registry) = get_registry().write() {
        debug!("Registering child process PID {} ({})", pid, label);
        registry.insert(
            pid,
            ChildProcessInfo {
                pid,
                label: label.to_string(),
                started_at: Instant::now(),
            },
        );
    }
}

pub fn unregister(pid: u32) {
    if let Ok(mut registry) = get_registry().write() {
        if let Some(info) = registry.remove(&pid) {
            debug!(
                "Unregistered child process PID {} after {:?}",
                pid,
                info.started_at.elapsed()
            );
        }
    }
}

pub fn is_registered(pid: u32) -> bool {
    get_registry()
        .read()
        .map(|r| r.contains_key(&pid))
        .unwrap_or(false)
}

pub fn active_count() -> usize {
    get_registry().read().map(|r| r.len()).unwrap_or(0)
}

/// Unregisters the child when dropped, whichever way the bridge call ends.
#[derive(Debug)]
pub struct Registration {
    pid: Option<u32>,
}

impl Registration {
    pub fn new(pid: Option<u32>, label: &str) -> Self {
        if let Some(pid) = pid {
            register(pid, label);
        }
        Self { pid }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(pid) = self.pid {
            unregister(pid);
        }
    }
}

pub fn kill_all() {
    let children: Vec<ChildProcessInfo> = match get_registry().write() {
        Ok(mut r) => r.drain().map(|(_, info)| info).collect(),
        Err(e) => {
            warn!("Failed to acquire child process registry lock: {}", e);
            return;
        }
    };
    if children.is_empty() {
        debug!("No child processes to clean up");
        return;
    }
    info!("Cleaning up {} child process(es) on shutdown", children.len());

    let pids: Vec<Pid> = children.iter().map(|c| Pid::from_u32(c.pid)).collect();
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&pids), true);
    for child in children {
        match system.process(Pid::from_u32(child.pid)) {
            Some(process) if process.kill() => {
                info!("Terminated child process PID {} ({})", child.pid, child.label)
            }
            Some(_) => warn!("Failed to terminate child process PID {}", child.pid),
            None => debug!("Child process PID {} already exited", child.pid),
        }
    }
}
