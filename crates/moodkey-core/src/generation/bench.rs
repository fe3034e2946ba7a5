use std::time::{Duration, Instant};

/// Timing and memory figures for the generation service.
///
/// `init_time_ms` is set once by model initialization and carried over into
/// every later record; the remaining fields describe the last completed
/// streaming generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkData {
    pub init_time_ms: u64,
    pub prompt_length: usize,
    pub ttft_ms: u64,
    pub response_length: usize,
    pub total_time_ms: u64,
    pub tokens_per_second: f64,
    pub memory_before_mb: f64,
    pub memory_after_mb: f64,
    pub memory_peak_mb: f64,
    pub total_input_tokens: usize,
}

/// Resident memory of this process in MiB. 0.0 where it cannot be read.
pub fn resident_memory_mb() -> f64 {
    if cfg!(any(target_os = "linux", target_os = "android")) {
        let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
            return 0.0;
        };
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                if let Some(kb) = rest
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    return kb as f64 / 1024.0;
                }
            }
        }
    }
    0.0
}

/// Accumulates one streaming generation.
pub struct StreamRecorder {
    start: Instant,
    prompt_length: usize,
    input_tokens: usize,
    memory_before_mb: f64,
    memory_peak_mb: f64,
    first_token: Option<Duration>,
    chunks: usize,
    text: String,
    sample_memory: fn() -> f64,
}

impl StreamRecorder {
    pub fn new(prompt: &str, input_tokens: usize) -> Self {
        Self::with_memory_sampler(prompt, input_tokens, resident_memory_mb)
    }

    pub fn with_memory_sampler(prompt: &str, input_tokens: usize, sampler: fn() -> f64) -> Self {
        let before = sampler();
        Self {
            start: Instant::now(),
            prompt_length: prompt.chars().count(),
            input_tokens,
            memory_before_mb: before,
            memory_peak_mb: before,
            first_token: None,
            chunks: 0,
            text: String::new(),
            sample_memory: sampler,
        }
    }

    /// Record one partial chunk.
    pub fn record(&mut self, chunk: &str) {
        if !chunk.is_empty() {
            if self.first_token.is_none() {
                self.first_token = Some(self.start.elapsed());
            }
            self.chunks += 1;
            self.text.push_str(chunk);
        }
        self.memory_peak_mb = self.memory_peak_mb.max((self.sample_memory)());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Close the record. `init_time_ms` is carried over from initialization.
    pub fn finish(self, init_time_ms: u64) -> (String, BenchmarkData) {
        let total = self.start.elapsed();
        let secs = total.as_secs_f64();
        let tokens_per_second = if secs > 0.0 {
            self.chunks as f64 / secs
        } else {
            0.0
        };
        let bench = BenchmarkData {
            init_time_ms,
            prompt_length: self.prompt_length,
            ttft_ms: self.first_token.map_or(0, |d| d.as_millis() as u64),
            response_length: self.text.chars().count(),
            total_time_ms: total.as_millis() as u64,
            tokens_per_second,
            memory_before_mb: self.memory_before_mb,
            memory_after_mb: (self.sample_memory)(),
            memory_peak_mb: self.memory_peak_mb,
            total_input_tokens: self.input_tokens,
        };
        (self.text, bench)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    static SAMPLE_STEP: AtomicU64 = AtomicU64::new(0);

    fn rising_sampler() -> f64 {
        let n = SAMPLE_STEP.fetch_add(1, Ordering::SeqCst);
        100.0 + 50.0 * n as f64
    }

    #[test]
    fn recorder_accumulates_text_and_peak_memory() {
        SAMPLE_STEP.store(0, Ordering::SeqCst);
        let mut rec = StreamRecorder::with_memory_sampler("prompt", 7, rising_sampler);
        rec.record("Hel");
        rec.record("");
        rec.record("lo");
        assert_eq!(rec.text(), "Hello");

        let (text, bench) = rec.finish(42);
        assert_eq!(text, "Hello");
        assert_eq!(bench.init_time_ms, 42);
        assert_eq!(bench.prompt_length, 6);
        assert_eq!(bench.response_length, 5);
        assert_eq!(bench.total_input_tokens, 7);
        assert_eq!(bench.memory_before_mb, 100.0);
        // One sample at start, one per chunk, one at finish.
        assert_eq!(bench.memory_peak_mb, 250.0);
        assert_eq!(bench.memory_after_mb, 300.0);
    }

    #[test]
    fn no_tokens_means_zero_ttft() {
        let rec = StreamRecorder::with_memory_sampler("p", 0, || 0.0);
        let (text, bench) = rec.finish(0);
        assert!(text.is_empty());
        assert_eq!(bench.ttft_ms, 0);
        assert_eq!(bench.response_length, 0);
    }

    #[test]
    fn resident_memory_is_non_negative() {
        assert!(resident_memory_mb() >= 0.0);
    }
}
