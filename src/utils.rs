use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Pushes timestamped lines into the log vector rendered by the GUI panel.
pub struct Logger {
    log_messages: Arc<Mutex<Vec<String>>>,
}

impl Logger {
    pub fn new(log_messages: Arc<Mutex<Vec<String>>>) -> Self {
        Logger { log_messages }
    }

    pub fn log(&self, message: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        self.log_messages
            .lock()
            .push(format!("[{}] {}", timestamp, message));
    }
}

pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}

pub fn get_memory_usage() -> String {
    if let Ok(mem_info) = sys_info::mem_info() {
        format!(
            "Memory: Total: {} MB, Free: {} MB, Used: {} MB",
            mem_info.total / 1024,
            mem_info.free / 1024,
            (mem_info.total - mem_info.free) / 1024
        )
    } else {
        "Unable to get memory info".to_string()
    }
}
