//! Per-chunk decode planning.
//!
//! Every chunk arrival asks one question: has enough new audio accumulated
//! (and enough time passed) to justify one more partial decode?
//! [`plan_decode`] answers it as a pure function over the session's numbers,
//! so the policy is testable without sessions, locks or an engine.
//!
//! The policy trades completeness for latency, deliberately:
//!
//! * the planned window is always the **newest** `window_samples` of the
//!   buffer, not the oldest undecided span — older skipped audio is
//!   recovered at finalization from the full buffer;
//! * at most one decode attempt per chunk arrival — under load the rate
//!   limit throttles decoding instead of letting catch-up decodes queue.

use std::time::Duration;

use crate::config::StreamConfig;

// ---------------------------------------------------------------------------
// DecodePlan
// ---------------------------------------------------------------------------

/// One planned partial-decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodePlan {
    /// Start index of the decode window in the session buffer.
    pub window_start: usize,
    /// End index (exclusive) of the decode window — the buffer end.
    pub window_end: usize,
    /// Buffer length the plan was computed against; recorded as
    /// `last_decode_total_samples` when the decode runs.
    pub buffer_len: usize,
    /// Cursor value to apply after the attempt, leaving only the overlap
    /// tail undecided.  Applied whether or not the energy gate lets the
    /// decode run.
    pub next_cursor: usize,
}

/// Decide whether this chunk arrival should trigger a partial decode.
///
/// A plan is produced when all of the following hold:
///
/// * the configured window and step are positive (`window_ms > overlap_ms`),
/// * at least `window_samples` of audio sit past `decode_cursor`,
/// * `elapsed_since_last` is `None` (no decode yet) or at least the
///   configured minimum inter-decode interval.
///
/// The window covers the newest `window_samples`; `next_cursor` is
/// `buffer_len - overlap_samples` (floored at zero).
pub fn plan_decode(
    cfg: &StreamConfig,
    buffer_len: usize,
    decode_cursor: usize,
    elapsed_since_last: Option<Duration>,
) -> Option<DecodePlan> {
    let window = cfg.window_samples();
    let overlap = cfg.overlap_samples();
    if window == 0 || window <= overlap {
        return None;
    }

    if buffer_len.saturating_sub(decode_cursor) < window {
        return None;
    }

    if let Some(elapsed) = elapsed_since_last {
        if elapsed < Duration::from_millis(cfg.min_decode_interval_ms) {
            return None;
        }
    }

    let window_start = decode_cursor.max(buffer_len - window);
    Some(DecodePlan {
        window_start,
        window_end: buffer_len,
        buffer_len,
        next_cursor: buffer_len.saturating_sub(overlap),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
