// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains helpers for the thread which runs the control cycle.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exception::{HiqpException, HiqpResult};

/// Used to decide whether to enforce realtime mode for the control cycle thread.
/// see [`prepare_control_thread`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        RealtimeConfig::Enforce
    }
}

/// Determines whether the current OS kernel is a realtime kernel.
///
/// On Linux, this checks for the existence of `/sys/kernel/realtime`.
pub fn has_realtime_kernel() -> bool {
    Path::new("/sys/kernel/realtime").exists()
}

/// Sets the current thread to the highest possible scheduler priority and locks the memory of
/// the process.
///
/// # Errors
/// * RealTimeException if realtime priority cannot be set for the current thread.
///
/// If the method returns an Error please check your /etc/security/limits.conf file
/// There should be a line like this:
/// ```text
///marco            -       rtprio          99
/// ```
pub fn set_current_thread_to_highest_scheduler_priority() -> HiqpResult<()> {
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(HiqpException::RealTimeException {
                message: "hiqp: unable to get maximum possible thread priority".to_string(),
            });
        }
        let thread_param = libc::sched_param {
            // one below the maximum, leaving the top priority to kernel threads
            sched_priority: max_priority - 1,
        };
        if libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &thread_param) != 0 {
            return Err(HiqpException::RealTimeException {
                message: "hiqp: unable to set realtime scheduling".to_string(),
            });
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(HiqpException::RealTimeException {
                message: "hiqp: unable to lock memory".to_string(),
            });
        }
    }
    debug!("control thread runs with realtime priority");
    Ok(())
}

/// Prepares the calling thread to run the control cycle.
///
/// With [`RealtimeConfig::Enforce`] the thread is switched to realtime scheduling, with
/// [`RealtimeConfig::Ignore`] nothing happens.
///
/// # Errors
/// * RealTimeException if realtime mode is enforced but the kernel has no realtime
/// capabilities or the priority cannot be set.
pub fn prepare_control_thread(config: RealtimeConfig) -> HiqpResult<()> {
    match config {
        RealtimeConfig::Ignore => Ok(()),
        RealtimeConfig::Enforce => {
            if !has_realtime_kernel() {
                warn!("realtime mode is enforced but the kernel is not a realtime kernel");
                return Err(HiqpException::RealTimeException {
                    message: "hiqp: Running kernel does not have realtime capabilities."
                        .to_string(),
                });
            }
            set_current_thread_to_highest_scheduler_priority()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::control_tools::{has_realtime_kernel, prepare_control_thread, RealtimeConfig};
    use crate::exception::{status_code, HiqpException};

    #[test]
    fn ignoring_realtime_always_succeeds() {
        assert!(prepare_control_thread(RealtimeConfig::Ignore).is_ok());
    }

    #[test]
    fn enforcing_realtime_needs_a_realtime_kernel() {
        if has_realtime_kernel() {
            return;
        }
        let result = prepare_control_thread(RealtimeConfig::Enforce);
        assert!(matches!(
            result,
            Err(HiqpException::RealTimeException { .. })
        ));
        assert_eq!(status_code(&result), -4);
    }
}
