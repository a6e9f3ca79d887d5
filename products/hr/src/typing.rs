//! Typing-speed assessment.
//!
//! A [`TypingTest`] is driven by the caller's clock: every call carries the
//! time elapsed since the test started, so a recorded session can be replayed
//! and scored identically on the server.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spacing of the WPM trend samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypingError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("time limit must be positive")]
    ZeroTimeLimit,
}

/// One point of the WPM trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WpmSample {
    pub second: u64,
    pub wpm: f64,
}

/// Final record of a finished test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingResult {
    pub wpm: u32,
    pub accuracy: u32,
    pub elapsed_ms: u64,
}

/// Words typed per elapsed minute. Zero elapsed time yields 0.
pub fn words_per_minute(typed: &str, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    typed.split_whitespace().count() as f64 / minutes
}

/// Percentage of typed characters matching the prompt position by position.
/// Characters typed past the end of the prompt count as mismatches. Empty
/// input yields 100.
pub fn accuracy(prompt: &str, typed: &str) -> f64 {
    let typed_chars = typed.chars().count();
    if typed_chars == 0 {
        return 100.0;
    }
    let mut expected = prompt.chars();
    let mismatched = typed
        .chars()
        .filter(|actual| expected.next() != Some(*actual))
        .count();
    let pct = (typed_chars - mismatched) as f64 / typed_chars as f64 * 100.0;
    pct.clamp(0.0, 100.0)
}

#[derive(Debug, Clone)]
pub struct TypingTest {
    prompt: String,
    prompt_len: usize,
    time_limit: Duration,
    typed: String,
    elapsed: Duration,
    next_sample: Duration,
    samples: Vec<WpmSample>,
    result: Option<TypingResult>,
}

impl TypingTest {
    pub fn new(prompt: impl Into<String>, time_limit: Duration) -> Result<Self, TypingError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(TypingError::EmptyPrompt);
        }
        if time_limit.is_zero() {
            return Err(TypingError::ZeroTimeLimit);
        }
        Ok(Self {
            prompt_len: prompt.chars().count(),
            prompt,
            time_limit,
            typed: String::new(),
            elapsed: Duration::ZERO,
            next_sample: SAMPLE_INTERVAL,
            samples: Vec::new(),
            result: None,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn remaining(&self) -> Duration {
        self.time_limit.saturating_sub(self.elapsed)
    }

    pub fn samples(&self) -> &[WpmSample] {
        &self.samples
    }

    pub fn result(&self) -> Option<TypingResult> {
        self.result
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    /// Running WPM at the current clock.
    pub fn wpm(&self) -> f64 {
        words_per_minute(&self.typed, self.elapsed)
    }

    /// Running accuracy of the current input.
    pub fn accuracy(&self) -> f64 {
        accuracy(&self.prompt, &self.typed)
    }

    /// Replaces the input box contents as of `at`. Input is capped at the
    /// prompt length; anything arriving at or after the time limit, or
    /// stamped before the current clock, is dropped.
    pub fn input(&mut self, text: &str, at: Duration) {
        if at < self.elapsed {
            return;
        }
        self.advance(at);
        if self.is_finished() {
            return;
        }
        self.typed = text.chars().take(self.prompt_len).collect();
    }

    /// Moves the clock forward, recording trend samples for every interval
    /// boundary crossed. Finalizes the test once the limit is reached.
    pub fn advance(&mut self, at: Duration) {
        if self.is_finished() || at < self.elapsed {
            return;
        }
        let target = at.min(self.time_limit);
        while self.next_sample <= target {
            let wpm = words_per_minute(&self.typed, self.next_sample);
            self.samples.push(WpmSample {
                second: self.next_sample.as_secs(),
                wpm: (wpm * 10.0).round() / 10.0,
            });
            self.next_sample += SAMPLE_INTERVAL;
        }
        self.elapsed = target;
        if at >= self.time_limit {
            self.finish();
        }
    }

    /// Finishes early (or returns the existing result when already done).
    pub fn submit(&mut self, at: Duration) -> TypingResult {
        self.advance(at);
        self.finish()
    }

    fn finish(&mut self) -> TypingResult {
        if let Some(result) = self.result {
            return result;
        }
        let result = TypingResult {
            wpm: self.wpm().round() as u32,
            accuracy: self.accuracy().round() as u32,
            elapsed_ms: self.elapsed.as_millis() as u64,
        };
        self.result = Some(result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "the quick brown fox jumps over the lazy dog";

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn zero_elapsed_is_zero_wpm() {
        assert_eq!(words_per_minute("hello world", Duration::ZERO), 0.0);
    }

    #[test]
    fn empty_input_is_fully_accurate() {
        assert_eq!(accuracy(PROMPT, ""), 100.0);
    }

    #[test]
    fn wpm_counts_words_per_minute() {
        assert_eq!(words_per_minute("one two three four", secs(30)), 8.0);
    }

    #[test]
    fn mismatches_and_overflow_reduce_accuracy() {
        assert_eq!(accuracy("abcd", "abxd"), 75.0);
        assert_eq!(accuracy("ab", "abcd"), 50.0);
        assert_eq!(accuracy("ab", "zz"), 0.0);
    }

    #[test]
    fn bounds_hold_for_arbitrary_inputs() {
        let prompts = ["a", "hello world", PROMPT, "ünïcödé text"];
        let typed = ["", " ", "x", "hello", "hello world and more", "ünï", "     "];
        let clocks = [0u64, 1, 59, 60, 600];
        for prompt in prompts {
            for text in typed {
                let acc = accuracy(prompt, text);
                assert!((0.0..=100.0).contains(&acc), "{prompt:?}/{text:?} -> {acc}");
                for ms in clocks {
                    let wpm = words_per_minute(text, Duration::from_millis(ms * 100));
                    assert!(wpm >= 0.0);
                }
            }
        }
    }

    #[test]
    fn verbatim_prompt_scores_full_accuracy() {
        let mut test = TypingTest::new(PROMPT, secs(60)).unwrap();
        test.input(&PROMPT[..10], secs(3));
        test.input(PROMPT, secs(12));
        let result = test.submit(secs(12));
        assert_eq!(result.accuracy, 100);
        // 9 words in 12 seconds
        assert_eq!(result.wpm, 45);
        assert_eq!(result.elapsed_ms, 12_000);
    }

    #[test]
    fn samples_every_two_seconds() {
        let mut test = TypingTest::new(PROMPT, secs(60)).unwrap();
        test.input("the quick", secs(1));
        test.advance(secs(5));
        let seconds: Vec<u64> = test.samples().iter().map(|s| s.second).collect();
        assert_eq!(seconds, vec![2, 4]);
        assert_eq!(test.samples()[0].wpm, 60.0);
        assert_eq!(test.samples()[1].wpm, 30.0);
    }

    #[test]
    fn timer_expiry_finalizes_and_drops_late_input() {
        let mut test = TypingTest::new(PROMPT, secs(10)).unwrap();
        test.input("the quick brown", secs(5));
        test.input("the quick brown fox jumps", secs(11));
        assert!(test.is_finished());
        assert_eq!(test.typed(), "the quick brown");
        let result = test.result().unwrap();
        assert_eq!(result.elapsed_ms, 10_000);
        assert_eq!(result.wpm, 18);
        assert_eq!(test.samples().len(), 5);
        assert_eq!(test.remaining(), Duration::ZERO);
    }

    #[test]
    fn input_is_capped_at_prompt_length() {
        let mut test = TypingTest::new("abc", secs(30)).unwrap();
        test.input("abcdef", secs(1));
        assert_eq!(test.typed(), "abc");
        assert_eq!(test.accuracy(), 100.0);
    }

    #[test]
    fn stale_input_is_ignored() {
        let mut test = TypingTest::new(PROMPT, secs(30)).unwrap();
        test.input("the quick", secs(5));
        test.input("th", secs(3));
        assert_eq!(test.typed(), "the quick");
        assert_eq!(test.elapsed(), secs(5));
        test.input("the quick b", secs(5));
        assert_eq!(test.typed(), "the quick b");
    }

    #[test]
    fn submit_is_idempotent() {
        let mut test = TypingTest::new(PROMPT, secs(30)).unwrap();
        test.input("the", secs(2));
        let first = test.submit(secs(3));
        let second = test.submit(secs(20));
        assert_eq!(first, second);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut test = TypingTest::new(PROMPT, secs(30)).unwrap();
        test.advance(secs(6));
        test.advance(secs(2));
        assert_eq!(test.elapsed(), secs(6));
        assert_eq!(test.samples().len(), 3);
    }

    #[test]
    fn rejects_degenerate_setup() {
        assert_eq!(
            TypingTest::new("  ", secs(10)).unwrap_err(),
            TypingError::EmptyPrompt
        );
        assert_eq!(
            TypingTest::new(PROMPT, Duration::ZERO).unwrap_err(),
            TypingError::ZeroTimeLimit
        );
    }
}
