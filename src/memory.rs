use sysinfo::{ProcessExt, System, SystemExt};

/// Resident set size of this process in bytes, or 0 when it cannot be read.
pub fn resident_memory() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut sys = System::new();
    if !sys.refresh_process(pid) {
        return 0;
    }
    sys.process(pid).map(|p| p.memory()).unwrap_or(0)
}
