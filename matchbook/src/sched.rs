//! Best-effort real-time scheduling for matcher threads.
//!
//! Matching is prioritized over session I/O by asking for round-robin
//! scheduling one notch below the maximum. On Linux this needs rtprio
//! privileges; when the request is denied (or on other platforms) the
//! thread silently keeps the default policy.

#[cfg(target_os = "linux")]
pub(crate) fn elevate_matcher_priority() {
    use tracing::debug;

    unsafe {
        let max = libc::sched_get_priority_max(libc::SCHED_RR);
        if max < 0 {
            return;
        }
        let param = libc::sched_param {
            sched_priority: max - 1,
        };
        let rc = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_RR, &param);
        if rc != 0 {
            debug!(rc, "real-time scheduling unavailable, keeping default priority");
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn elevate_matcher_priority() {}
