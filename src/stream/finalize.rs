//! Finalization: turning a stopped session into its best final transcript.
//!
//! Runs once per session, over a snapshot drained from the store.  The
//! fallback chain is an explicit ordered list of stages, each a function
//! from the snapshot to `Option<String>`; stages after the first run only
//! while the result is still empty.
//!
//! ```text
//! 1. full-accuracy pass   one decode of the whole buffer (≤ 30 s only) —
//!                         supersedes the stitched committed text
//! 2. tail reconciliation  bounded decode of the newest audio, merged into
//!                         the committed text
//! 3. full-buffer fallback last-resort decode of everything
//! 4. rescue retry         full decode on the alternate model
//! 5. fast_punctuate       whitespace / capital / terminal punctuation
//! ```
//!
//! A stage's decode failure is caught and logged where it happens and
//! surfaces as empty text for the next stage — no failure here ever
//! propagates to the transport.

use std::time::Instant;

use crate::audio::has_speech;
use crate::config::StreamConfig;
use crate::session::StreamSession;
use crate::stt::SttEngine;
use crate::text::{fast_punctuate, merge_transcript};

// ---------------------------------------------------------------------------
// FinalizeInput
// ---------------------------------------------------------------------------

/// Snapshot of a stopped session, drained from the store before any decode
/// work starts.  Once this exists the session id is already free; late
/// chunks for it are silent no-ops.
#[derive(Debug)]
pub struct FinalizeInput {
    pub session_id: String,
    pub audio: Vec<f32>,
    pub language: String,
    pub model: String,
    pub committed_text: String,
    pub last_decode_total_samples: usize,
}

impl FinalizeInput {
    /// Build the snapshot from a session removed from the store.
    pub fn from_session(session: StreamSession) -> Self {
        Self {
            session_id: session.id,
            audio: session.audio,
            language: session.language,
            model: session.model,
            committed_text: session.committed_text,
            last_decode_total_samples: session.last_decode_total_samples,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full fallback chain and return the finished (punctuated) final
/// transcript.  Empty output means every stage came up dry — a valid result
/// for silence-only sessions.
pub fn finalize(
    engine: &dyn SttEngine,
    cfg: &StreamConfig,
    rescue_model: &str,
    input: &FinalizeInput,
) -> String {
    type Stage<'a> = (&'static str, Box<dyn Fn() -> Option<String> + 'a>);

    let stages: Vec<Stage<'_>> = vec![
        ("full-accuracy", Box::new(|| full_accuracy(engine, cfg, input))),
        ("tail-reconcile", Box::new(|| reconcile_tail(engine, cfg, input))),
        ("full-fallback", Box::new(|| full_fallback(engine, input))),
        ("rescue", Box::new(|| rescue_retry(engine, rescue_model, input))),
    ];

    let mut text = String::new();
    for (name, stage) in stages {
        if !text.trim().is_empty() {
            break;
        }
        if let Some(t) = stage() {
            log::info!(
                "finalize stage {name} produced text ({}) chars={}",
                input.session_id,
                t.len()
            );
            text = t;
        }
    }

    fast_punctuate(&text)
}

/// Stage 1: one full-buffer decode for utterances short enough to afford it.
///
/// Window merging can drop or mis-stitch middle words; a single full decode
/// is more reliable, so its (non-empty) result supersedes the committed
/// text outright.
fn full_accuracy(
    engine: &dyn SttEngine,
    cfg: &StreamConfig,
    input: &FinalizeInput,
) -> Option<String> {
    if input.audio.is_empty() {
        return None;
    }
    let duration = input.audio.len() as f32 / cfg.model_sample_rate.max(1) as f32;
    if duration > cfg.full_finalize_max_secs {
        return None;
    }

    let t0 = Instant::now();
    match engine.decode(&input.audio, &input.language, &input.model) {
        Ok(text) => {
            log::info!(
                "stream full-final decoded ({}) len={} dur_s={:.2} took_ms={}",
                input.session_id,
                input.audio.len(),
                duration,
                t0.elapsed().as_millis()
            );
            non_empty(text)
        }
        Err(e) => {
            log::error!("stream full-final decode failed ({}): {e}", input.session_id);
            None
        }
    }
}

/// Stage 2: bounded tail decode merged into the committed text.
///
/// Only audio newer than the last partial decode can add words.  When that
/// amount is below the configured floor, or the recent window fails even
/// the relaxed energy gate, the decode is skipped and the committed text
/// stands as-is.  A failed tail decode likewise falls back to the committed
/// text — stitched partials are never thrown away here.
fn reconcile_tail(
    engine: &dyn SttEngine,
    cfg: &StreamConfig,
    input: &FinalizeInput,
) -> Option<String> {
    if input.audio.is_empty() {
        return None;
    }

    let new_since = input
        .audio
        .len()
        .saturating_sub(input.last_decode_total_samples);
    let tiny_tail = cfg.ms_to_samples(cfg.skip_tail_below_ms);
    if new_since < tiny_tail {
        log::info!(
            "stream tail skipped ({}) new_since_last_decode={new_since}",
            input.session_id
        );
        return non_empty(input.committed_text.clone());
    }

    let max_tail = cfg.ms_to_samples(cfg.max_tail_decode_ms);
    let recent = if input.audio.len() > max_tail && max_tail > 0 {
        &input.audio[input.audio.len() - max_tail..]
    } else {
        &input.audio[..]
    };

    if !has_speech(recent, cfg.vad_rms_relaxed) {
        log::info!(
            "stream tail skipped ({}) below relaxed energy gate",
            input.session_id
        );
        return non_empty(input.committed_text.clone());
    }

    let t0 = Instant::now();
    let tail_text = match engine.decode(recent, &input.language, &input.model) {
        Ok(text) => {
            log::info!(
                "stream reconcile decoded ({}) len={} took_ms={}",
                input.session_id,
                recent.len(),
                t0.elapsed().as_millis()
            );
            text
        }
        Err(e) => {
            log::error!("stream reconcile decode failed ({}): {e}", input.session_id);
            String::new()
        }
    };

    non_empty(merge_transcript(&input.committed_text, &tail_text))
}

/// Stage 3: full-buffer decode as the safety net for short or quiet clips
/// every earlier stage judged not worth decoding.
fn full_fallback(engine: &dyn SttEngine, input: &FinalizeInput) -> Option<String> {
    if input.audio.is_empty() {
        return None;
    }

    let t0 = Instant::now();
    match engine.decode(&input.audio, &input.language, &input.model) {
        Ok(text) => {
            log::info!(
                "stream full fallback decoded ({}) len={} took_ms={}",
                input.session_id,
                input.audio.len(),
                t0.elapsed().as_millis()
            );
            non_empty(text)
        }
        Err(e) => {
            log::error!("stream fallback decode failed ({}): {e}", input.session_id);
            None
        }
    }
}

/// Stage 4: retry the full buffer on the designated rescue model, unless the
/// session already ran on it.
fn rescue_retry(engine: &dyn SttEngine, rescue_model: &str, input: &FinalizeInput) -> Option<String> {
    if input.audio.is_empty() || input.model == rescue_model {
        return None;
    }

    let t0 = Instant::now();
    match engine.decode(&input.audio, &input.language, rescue_model) {
        Ok(text) => {
            log::info!(
                "stream rescue decoded ({}) len={} took_ms={}",
                input.session_id,
                input.audio.len(),
                t0.elapsed().as_millis()
            );
            non_empty(text)
        }
        Err(e) => {
            log::error!("stream rescue decode failed ({}): {e}", input.session_id);
            None
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{MockSttEngine, SttError, DEFAULT_MODEL_ID, RESCUE_MODEL_ID};

    fn cfg() -> StreamConfig {
        StreamConfig::default()
    }

    fn input(audio: Vec<f32>, committed: &str, last_total: usize) -> FinalizeInput {
        FinalizeInput {
            session_id: "s1".into(),
            audio,
            language: "en".into(),
            model: DEFAULT_MODEL_ID.into(),
            committed_text: committed.into(),
            last_decode_total_samples: last_total,
        }
    }

    /// One second of loud audio — passes both energy gates.
    fn loud(secs: usize) -> Vec<f32> {
        vec![0.5_f32; 16_000 * secs]
    }

    // ---- stage 1: full accuracy -------------------------------------------

    #[test]
    fn short_utterance_full_decode_supersedes_committed_text() {
        let engine = MockSttEngine::ok("full transcript");
        let inp = input(loud(2), "stitched partial words", 16_000);

        let text = finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "Full transcript.");
        // Only the one full decode — the non-empty result stops the chain.
        assert_eq!(engine.call_count(), 1);
        assert_eq!(engine.calls()[0].samples, inp.audio.len());
    }

    #[test]
    fn over_ceiling_utterance_skips_the_full_pass() {
        let mut c = cfg();
        c.full_finalize_max_secs = 1.0; // make 3 s of audio "long"
        let engine = MockSttEngine::ok("tail words");
        let inp = input(loud(3), "committed words", 0);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        // Stage 2 ran: tail decode merged into the committed text.
        assert_eq!(text, "Committed words tail words.");
        assert_eq!(engine.call_count(), 1);
        // The decoded window is capped at max_tail_decode_ms.
        assert_eq!(engine.calls()[0].samples, c.ms_to_samples(c.max_tail_decode_ms));
    }

    #[test]
    fn empty_buffer_decodes_nothing_and_finishes_empty() {
        let engine = MockSttEngine::ok("should never be called");
        let inp = input(Vec::new(), "", 0);

        let text = finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "");
        assert_eq!(engine.call_count(), 0);
    }

    // ---- stage 2: tail reconciliation -------------------------------------

    #[test]
    fn tiny_tail_is_skipped_and_committed_text_stands() {
        let mut c = cfg();
        c.full_finalize_max_secs = 0.5; // force past stage 1
        let engine = MockSttEngine::ok("unexpected");
        // Only 100 new samples since the last decode — below the 120 ms floor.
        let audio = loud(1);
        let last_total = audio.len() - 100;
        let inp = input(audio, "all committed", last_total);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "All committed.");
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn quiet_tail_below_relaxed_gate_keeps_committed_text() {
        let mut c = cfg();
        c.full_finalize_max_secs = 0.5;
        let engine = MockSttEngine::ok("unexpected");
        // Plenty of new audio, but all of it silent.
        let inp = input(vec![0.0_f32; 16_000], "kept words", 0);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "Kept words.");
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn failed_tail_decode_falls_back_to_committed_text() {
        let mut c = cfg();
        c.full_finalize_max_secs = 0.5;
        let engine = MockSttEngine::err(SttError::Transcription("backend down".into()));
        let inp = input(loud(1), "partial result", 0);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        // merge(committed, "") == committed; later stages never run.
        assert_eq!(text, "Partial result.");
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn tail_merge_collapses_window_overlap() {
        let mut c = cfg();
        c.full_finalize_max_secs = 0.5;
        let engine = MockSttEngine::ok("brown fox jumps");
        let inp = input(loud(1), "the quick brown", 0);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "The quick brown fox jumps.");
    }

    // ---- stage 3: full-buffer fallback ------------------------------------

    #[test]
    fn quiet_clip_with_no_committed_text_reaches_full_fallback() {
        let mut c = cfg();
        c.full_finalize_max_secs = 0.5;
        // Stage 1 skipped (duration), stage 2 skipped (silent tail, empty
        // committed) → stage 3 decodes the whole buffer.
        let engine = MockSttEngine::ok("barely audible words");
        let inp = input(vec![0.0_f32; 16_000], "", 0);

        let text = finalize(&engine, &c, RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "Barely audible words.");
        assert_eq!(engine.call_count(), 1);
        assert_eq!(engine.calls()[0].samples, 16_000);
    }

    // ---- stage 4: rescue retry --------------------------------------------

    #[test]
    fn rescue_model_runs_when_everything_else_is_empty() {
        // Stage 1 decodes empty, stage 2 merges empty onto empty committed,
        // stage 3 decodes empty, stage 4 succeeds on the rescue model.
        let engine = MockSttEngine::scripted(
            vec![Ok(String::new()), Ok(String::new()), Ok(String::new())],
            Ok("rescued words".into()),
        );
        let inp = input(loud(2), "", 0);

        let text = finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "Rescued words.");

        let calls = engine.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[..3].iter().all(|c| c.model_id == DEFAULT_MODEL_ID));
        assert_eq!(calls[3].model_id, RESCUE_MODEL_ID);
    }

    #[test]
    fn rescue_is_skipped_when_session_already_ran_on_it() {
        let engine = MockSttEngine::ok(String::new());
        let mut inp = input(loud(2), "", 0);
        inp.model = RESCUE_MODEL_ID.into();

        let text = finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "");
        // Stages 1-3 decode (all empty); stage 4 must not add a fourth call.
        assert_eq!(engine.call_count(), 3);
    }

    #[test]
    fn all_stages_failing_yields_empty_text_not_a_panic() {
        let engine = MockSttEngine::err(SttError::Transcription("down".into()));
        let inp = input(loud(2), "", 0);

        let text = finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp);
        assert_eq!(text, "");
        assert_eq!(engine.call_count(), 4); // every stage tried and failed
    }

    // ---- stage 5: punctuation ---------------------------------------------

    #[test]
    fn final_text_is_punctuated() {
        let engine = MockSttEngine::ok("it works");
        let inp = input(loud(1), "", 0);
        assert_eq!(finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp), "It works.");
    }

    #[test]
    fn existing_terminal_punctuation_is_not_doubled() {
        let engine = MockSttEngine::ok("is it done?");
        let inp = input(loud(1), "", 0);
        assert_eq!(finalize(&engine, &cfg(), RESCUE_MODEL_ID, &inp), "Is it done?");
    }
}
