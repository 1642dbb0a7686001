//! Aggregation of per-log throughput into a summary table.

use crate::error::BenchResult;
use crate::throughput::{fetch_throughput_from_log, ExtractOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Inputs for a gather run.
#[derive(Debug, Clone)]
pub struct GatherOptions {
    /// Directory searched for logs.
    pub dir: PathBuf,
    /// File-name glob matched inside `dir`.
    pub pattern: String,
    /// Destination of the summary table.
    pub output: PathBuf,
    pub extract: ExtractOptions,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            pattern: "*.stderr".to_string(),
            output: PathBuf::from("results.csv"),
            extract: ExtractOptions::default(),
        }
    }
}

/// Throughput per log, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputTable {
    entries: BTreeMap<String, f64>,
}

impl ThroughputTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, returning the previous value for `name` if any.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.entries.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Name a result after its log file: the file name without its last extension.
pub fn result_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Find log files matching `pattern` directly inside `dir`, sorted by path.
///
/// Wildcards do not match a leading dot, so hidden files are only found by a
/// pattern that starts with a literal `.`.
pub fn discover_logs(dir: &Path, pattern: &str) -> BenchResult<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let mut out = Vec::new();
    let options = glob::MatchOptions { require_literal_leading_dot: true, ..glob::MatchOptions::default() };
    for entry in glob::glob_with(&full, options)? {
        let path = entry?;
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Extract throughput from every discovered log. The first failure aborts the run.
pub fn gather_results(options: &GatherOptions) -> BenchResult<ThroughputTable> {
    let logs = discover_logs(&options.dir, &options.pattern)?;
    if logs.is_empty() {
        warn!(dir = %options.dir.display(), pattern = %options.pattern, "no log files matched");
    }

    let mut table = ThroughputTable::new();
    for log in &logs {
        let value = fetch_throughput_from_log(log, &options.extract)?;
        let name = result_name(log);
        debug!(log = %log.display(), %name, value, "extracted throughput");
        if table.insert(name.clone(), value).is_some() {
            warn!(%name, "duplicate result name, keeping the later log");
        }
    }

    info!(count = table.len(), "gathered throughput results");
    Ok(table)
}

/// Write `name,value` rows without a header, overwriting `path`.
pub fn write_results(path: &Path, table: &ThroughputTable) -> BenchResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;

    for (name, value) in table.iter() {
        writer.write_record([name, format_value(value).as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Shortest round-trip digits laid out like Python's `repr`.
///
/// Decimal exponents from -4 to 15 print positionally with at least one
/// fractional digit (`40.0`, `0.0001`). Anything else uses a signed exponent of
/// at least two digits (`1e+16`, `2.5e-07`).
fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = mantissa.strip_prefix('-').map_or(("", mantissa), |m| ("-", m));

    if !(-4..16).contains(&exp) {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.unsigned_abs());
    }

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    match usize::try_from(exp) {
        Ok(exp) => {
            let point = exp + 1;
            if digits.len() <= point {
                format!("{sign}{digits}{}.0", "0".repeat(point - digits.len()))
            } else {
                format!("{sign}{}.{}", &digits[..point], &digits[point..])
            }
        }
        Err(_) => {
            let zeros = "0".repeat(exp.unsigned_abs() as usize - 1);
            format!("{sign}0.{zeros}{digits}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_result_name_strips_last_extension() {
        assert_eq!(result_name(Path::new("run-8gpu.stderr")), "run-8gpu");
        assert_eq!(result_name(Path::new("/logs/a.b.stderr")), "a.b");
        assert_eq!(result_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_format_value_keeps_decimal_point() {
        assert_eq!(format_value(40.0), "40.0");
        assert_eq!(format_value(1234.5), "1234.5");
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(0.001_25), "0.00125");
        assert_eq!(format_value(1e15), "1000000000000000.0");
    }

    #[test]
    fn test_format_value_exponent_matches_python_repr() {
        assert_eq!(format_value(1e16), "1e+16");
        assert_eq!(format_value(1.5e20), "1.5e+20");
        assert_eq!(format_value(2.5e-7), "2.5e-07");
        assert_eq!(format_value(-1e-5), "-1e-05");
        assert_eq!(format_value(1e300), "1e+300");
        assert_eq!(format_value(f64::INFINITY), "inf");
        assert_eq!(format_value(f64::NAN), "nan");
    }

    #[test]
    fn test_discover_logs_is_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        for name in ["c.stderr", "a.stderr", "b.stdout", "b.stderr", ".hidden.stderr"] {
            std::fs::write(temp.path().join(name), "").unwrap();
        }
        std::fs::create_dir(temp.path().join("dir.stderr")).unwrap();

        let found = discover_logs(temp.path(), "*.stderr").unwrap();
        let names: Vec<_> = found.iter().map(|p| result_name(p)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let hidden = discover_logs(temp.path(), ".*.stderr").unwrap();
        assert_eq!(hidden, vec![temp.path().join(".hidden.stderr")]);
    }

    #[test]
    fn test_write_results_has_no_header() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("results.csv");
        let mut table = ThroughputTable::new();
        table.insert("zeta", 2.0);
        table.insert("alpha", 1.5);

        write_results(&out, &table).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, "alpha,1.5\nzeta,2.0\n");
    }

    #[test]
    fn test_write_results_overwrites() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("results.csv");
        std::fs::write(&out, "stale,1.0\nstale2,2.0\n").unwrap();

        let mut table = ThroughputTable::new();
        table.insert("fresh", 3.0);
        write_results(&out, &table).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "fresh,3.0\n");
    }
}
