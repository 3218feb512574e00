//! Warning and error reporting
//!
//! Subsystems never log directly; they report through an [`Output`] so the
//! runtime can tell when a fatal error has made continuing unsafe.

use std::sync::atomic::{AtomicBool, Ordering};

pub trait Output: Send + Sync {
    /// Something was wrong but has been corrected
    fn warning(&self, sender: &str, message: &str);

    /// Something failed. A fatal error stops the runtime.
    fn error(&self, sender: &str, message: &str, fatal: bool);

    /// False once a fatal error has been reported
    fn is_safe(&self) -> bool;
}

/// Reports through `tracing`
#[derive(Debug)]
pub struct TracingOutput {
    safe: AtomicBool,
}

impl TracingOutput {
    pub fn new() -> Self {
        Self {
            safe: AtomicBool::new(true),
        }
    }
}

impl Default for TracingOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for TracingOutput {
    fn warning(&self, sender: &str, message: &str) {
        tracing::warn!(sender, "{}", message);
    }

    fn error(&self, sender: &str, message: &str, fatal: bool) {
        tracing::error!(sender, fatal, "{}", message);
        if fatal {
            self.safe.store(false, Ordering::SeqCst);
        }
    }

    fn is_safe(&self) -> bool {
        self.safe.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Output;
    use std::sync::Mutex;

    /// Keeps every report so tests can count them
    #[derive(Default)]
    pub struct Recorder {
        pub warnings: Mutex<Vec<(String, String)>>,
        pub errors: Mutex<Vec<(String, String, bool)>>,
    }

    impl Recorder {
        pub fn warning_count(&self) -> usize {
            self.warnings.lock().unwrap().len()
        }

        pub fn error_count(&self) -> usize {
            self.errors.lock().unwrap().len()
        }
    }

    impl Output for Recorder {
        fn warning(&self, sender: &str, message: &str) {
            self.warnings
                .lock()
                .unwrap()
                .push((sender.to_owned(), message.to_owned()));
        }

        fn error(&self, sender: &str, message: &str, fatal: bool) {
            self.errors
                .lock()
                .unwrap()
                .push((sender.to_owned(), message.to_owned(), fatal));
        }

        fn is_safe(&self) -> bool {
            !self.errors.lock().unwrap().iter().any(|e| e.2)
        }
    }
}
