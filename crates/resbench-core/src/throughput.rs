//! Steady-state throughput extraction from training logs.
//!
//! A training log interleaves `step = N` progress lines with
//! `global_step/sec: X` rate lines. Rates reported while the job is still
//! warming up are ignored; the remaining rates are averaged and scaled by the
//! batch size to give records per second.

use crate::error::{BenchError, BenchResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static STEP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"step = ([0-9]+)").expect("step regex should be valid"));

static RATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"global_step/sec:\s*([0-9.]*)").expect("global_step/sec regex should be valid")
});

/// Parameters for a single extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    /// First step number considered past warm-up.
    pub warmup_steps: u64,
    /// Records per step; multiplies the averaged step rate.
    pub batch_size: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { warmup_steps: 1, batch_size: 32 }
    }
}

/// Read `path` and extract its average throughput.
pub fn fetch_throughput_from_log(path: &Path, options: &ExtractOptions) -> BenchResult<f64> {
    if !path.exists() {
        return Err(BenchError::MissingLog(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    extract_throughput(&text, path, options)
}

/// Extract the average throughput from log text.
///
/// `source` only names the log in errors. The warm-up state is sampled at the
/// start of each line, so a line that both crosses the threshold and reports a
/// rate does not contribute that rate.
pub fn extract_throughput(text: &str, source: &Path, options: &ExtractOptions) -> BenchResult<f64> {
    let mut warming_up = true;
    let mut total = 0.0_f64;
    let mut count = 0_u64;

    for (idx, line) in split_lines(text).enumerate() {
        let counted = !warming_up;

        if let Some(step) = first_capture(&STEP_REGEX, line) {
            // Only digits are captured, so a parse failure means overflow.
            let step = step.parse::<u64>().unwrap_or(u64::MAX);
            if warming_up && step >= options.warmup_steps {
                debug!(line = idx + 1, step, "warm-up finished");
                warming_up = false;
            }
        }

        if !counted {
            continue;
        }
        if let Some(raw) = first_capture(&RATE_REGEX, line) {
            let rate = raw.parse::<f64>().map_err(|_| BenchError::MalformedRate {
                path: source.to_path_buf(),
                line: idx + 1,
                value: raw.to_string(),
            })?;
            total += rate;
            count += 1;
        }
    }

    if count == 0 {
        return Err(BenchError::MetricNotFound(source.to_path_buf()));
    }

    debug!(source = %source.display(), samples = count, "averaged throughput samples");
    Ok(total * f64::from(options.batch_size) / count as f64)
}

/// Split `text` at every line boundary a log may contain.
///
/// Besides `\n` this breaks on a lone `\r`, the vertical tab, form feed,
/// the file, group and record separators, NEL and the Unicode line and
/// paragraph separators. `\r\n` is one break. A trailing break does not
/// produce an empty final line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let (line, tail) = match rest.find(is_line_break) {
            Some(pos) => {
                let tail = &rest[pos..];
                let width = if tail.starts_with("\r\n") { 2 } else { tail.chars().next().map_or(1, char::len_utf8) };
                (&rest[..pos], &tail[width..])
            }
            None => (rest, ""),
        };
        rest = tail;
        Some(line)
    })
}

const fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn first_capture<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    regex.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}
