//! In-process metrics registry.
//!
//! Counter/float-counter/gauge/histogram families with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic ordering.
//! Every write is a single atomic op (or a CAS loop for float sums), so
//! overlapping requests never lose increments.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use faultline_core::error::{FaultlineError, Result};

/// Content type of the text exposition format rendered by [`MetricsRegistry::export`].
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".into() } else { "-Inf".into() }
    } else {
        v.to_string()
    }
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{}{{{}}}", name, labels)
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(name: &str) -> bool {
    valid_name(name) && !name.contains(':') && !name.starts_with("__")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map.get(&label_key(labels)).map(|c| c.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) -> std::fmt::Result {
        let mut rows: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (labels, val) in rows {
            writeln!(out, "{} {}", series(name, &labels), val)?;
        }
        Ok(())
    }
}

/// Gauges hold an `f64` stored as raw bits.
#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let gauge = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        gauge.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map
            .get(&label_key(labels))
            .map(|g| f64::from_bits(g.load(Ordering::Relaxed)))
    }

    fn render(&self, name: &str, out: &mut String) -> std::fmt::Result {
        let mut rows: Vec<(String, f64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (labels, val) in rows {
            writeln!(out, "{} {}", series(name, &labels), fmt_float(val))?;
        }
        Ok(())
    }
}

/// Float counters sampled from an absolute, monotonic source (CPU time).
/// A sample below the current value is ignored, so the series never decreases.
#[derive(Default)]
pub struct TotalVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl TotalVec {
    pub fn set_total(&self, labels: &[(&str, &str)], v: f64) {
        let total = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0f64.to_bits()));
        let _ = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            (v > f64::from_bits(bits)).then(|| v.to_bits())
        });
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map
            .get(&label_key(labels))
            .map(|t| f64::from_bits(t.load(Ordering::Relaxed)))
    }

    fn render(&self, name: &str, out: &mut String) -> std::fmt::Result {
        let mut rows: Vec<(String, f64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), f64::from_bits(r.value().load(Ordering::Relaxed))))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        for (labels, val) in rows {
            writeln!(out, "{} {}", series(name, &labels), fmt_float(val))?;
        }
        Ok(())
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    sum_bits: AtomicU64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(len: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            buckets: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

pub struct HistogramVec {
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    fn new(bounds: Vec<f64>) -> Self {
        Self {
            bounds,
            map: DashMap::new(),
        }
    }

    /// Observe a value (seconds) and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], v: f64) {
        let len = self.bounds.len();
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicHistogram::new(len));

        hist.count.fetch_add(1, Ordering::Relaxed);
        let _ = hist.sum_bits.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + v).to_bits())
        });

        // Cumulative buckets: increment every bucket whose bound is >= v.
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of observations for a label set.
    pub fn count(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) -> std::fmt::Result {
        let mut keys: Vec<(String, LabelKey)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.key().clone()))
            .collect();
        keys.sort();

        for (labels, key) in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in self.bounds.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, fmt_float(le), count)?;
            }
            let count = hist.count.load(Ordering::Relaxed);
            writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count)?;

            let sum = f64::from_bits(hist.sum_bits.load(Ordering::Relaxed));
            let sum_series = format!("{}_sum", name);
            let count_series = format!("{}_count", name);
            writeln!(out, "{} {}", series(&sum_series, &labels), fmt_float(sum))?;
            writeln!(out, "{} {}", series(&count_series, &labels), count)?;
        }
        Ok(())
    }
}

enum Collector {
    Counter(CounterVec),
    Total(TotalVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

impl Collector {
    fn kind(&self) -> &'static str {
        match self {
            Collector::Counter(_) | Collector::Total(_) => "counter",
            Collector::Gauge(_) => "gauge",
            Collector::Histogram(_) => "histogram",
        }
    }
}

struct Family {
    seq: usize,
    help: String,
    label_names: Vec<String>,
    collector: Collector,
}

impl Family {
    fn check_labels(&self, name: &str, labels: &[(&str, &str)]) -> Result<()> {
        let mut got: Vec<String> = labels.iter().map(|(k, _)| k.to_string()).collect();
        got.sort();
        if got != self.label_names {
            return Err(FaultlineError::LabelMismatch {
                name: name.to_string(),
                expected: self.label_names.clone(),
                got,
            });
        }
        Ok(())
    }
}

/// Process-wide metric families, rendered in registration order.
#[derive(Default)]
pub struct MetricsRegistry {
    families: DashMap<String, Family>,
    next_seq: AtomicUsize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<()> {
        self.register(name, help, label_names, Collector::Counter(CounterVec::default()))
    }

    /// Register a float counter fed by [`MetricsRegistry::set_total`].
    pub fn register_float_counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<()> {
        self.register(name, help, label_names, Collector::Total(TotalVec::default()))
    }

    pub fn register_gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<()> {
        self.register(name, help, label_names, Collector::Gauge(GaugeVec::default()))
    }

    /// Register a histogram. `buckets` are upper bounds; `+Inf` is implicit.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<()> {
        if buckets.is_empty() {
            return Err(FaultlineError::BadRequest(format!("{name}: buckets must not be empty")));
        }
        if buckets.iter().any(|b| !b.is_finite()) || buckets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FaultlineError::BadRequest(format!(
                "{name}: buckets must be finite and strictly increasing"
            )));
        }
        if label_names.contains(&"le") {
            return Err(FaultlineError::BadRequest(format!("{name}: label `le` is reserved")));
        }
        self.register(
            name,
            help,
            label_names,
            Collector::Histogram(HistogramVec::new(buckets.to_vec())),
        )
    }

    fn register(&self, name: &str, help: &str, label_names: &[&str], collector: Collector) -> Result<()> {
        if !valid_name(name) {
            return Err(FaultlineError::BadRequest(format!("invalid metric name: {name:?}")));
        }
        if let Some(bad) = label_names.iter().find(|l| !valid_label_name(l)) {
            return Err(FaultlineError::BadRequest(format!("{name}: invalid label name {bad:?}")));
        }
        let mut names: Vec<String> = label_names.iter().map(|s| s.to_string()).collect();
        names.sort();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(FaultlineError::BadRequest(format!("{name}: duplicate label names")));
        }

        match self.families.entry(name.to_string()) {
            Entry::Occupied(_) => Err(FaultlineError::DuplicateMetric(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Family {
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                    help: help.to_string(),
                    label_names: names,
                    collector,
                });
                Ok(())
            }
        }
    }

    fn family(&self, name: &str) -> Result<dashmap::mapref::one::Ref<'_, String, Family>> {
        self.families
            .get(name)
            .ok_or_else(|| FaultlineError::UnknownMetric(name.to_string()))
    }

    fn kind_error(name: &str, expected: &'static str, family: &Family) -> FaultlineError {
        FaultlineError::MetricKind {
            name: name.to_string(),
            expected,
            actual: family.collector.kind(),
        }
    }

    /// Add 1 to a counter.
    pub fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<()> {
        self.add(name, labels, 1)
    }

    /// Add `v` to a counter.
    pub fn add(&self, name: &str, labels: &[(&str, &str)], v: u64) -> Result<()> {
        let family = self.family(name)?;
        family.check_labels(name, labels)?;
        match &family.collector {
            Collector::Counter(c) => {
                c.add(labels, v);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "counter", &family)),
        }
    }

    /// Raise a float counter to `v`; lower samples are ignored.
    pub fn set_total(&self, name: &str, labels: &[(&str, &str)], v: f64) -> Result<()> {
        let family = self.family(name)?;
        family.check_labels(name, labels)?;
        match &family.collector {
            Collector::Total(t) => {
                t.set_total(labels, v);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "float counter", &family)),
        }
    }

    /// Overwrite a gauge.
    pub fn set(&self, name: &str, labels: &[(&str, &str)], v: f64) -> Result<()> {
        let family = self.family(name)?;
        family.check_labels(name, labels)?;
        match &family.collector {
            Collector::Gauge(g) => {
                g.set(labels, v);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "gauge", &family)),
        }
    }

    /// Record one histogram observation (seconds).
    pub fn observe(&self, name: &str, labels: &[(&str, &str)], v: f64) -> Result<()> {
        let family = self.family(name)?;
        family.check_labels(name, labels)?;
        match &family.collector {
            Collector::Histogram(h) => {
                h.observe(labels, v);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "histogram", &family)),
        }
    }

    /// Current value of a counter series, if it has been written.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        match &self.families.get(name)?.collector {
            Collector::Counter(c) => c.get(labels),
            _ => None,
        }
    }

    pub fn float_counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        match &self.families.get(name)?.collector {
            Collector::Total(t) => t.get(labels),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        match &self.families.get(name)?.collector {
            Collector::Gauge(g) => g.get(labels),
            _ => None,
        }
    }

    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        match &self.families.get(name)?.collector {
            Collector::Histogram(h) => h.count(labels),
            _ => None,
        }
    }

    /// Render every family in Prometheus text exposition format.
    ///
    /// Returns the whole body or an error; never a partial body.
    pub fn export(&self) -> Result<String> {
        let mut order: Vec<(usize, String)> = self
            .families
            .iter()
            .map(|r| (r.value().seq, r.key().clone()))
            .collect();
        order.sort();

        let mut out = String::new();
        for (_, name) in order {
            let Some(family) = self.families.get(&name) else { continue };
            Self::render_family(&name, &family, &mut out)
                .map_err(|e| FaultlineError::Internal(format!("render {name} failed: {e}")))?;
        }
        Ok(out)
    }

    fn render_family(name: &str, family: &Family, out: &mut String) -> std::fmt::Result {
        writeln!(out, "# HELP {} {}", name, escape_help(&family.help))?;
        writeln!(out, "# TYPE {} {}", name, family.collector.kind())?;
        match &family.collector {
            Collector::Counter(c) => c.render(name, out),
            Collector::Total(t) => t.render(name, out),
            Collector::Gauge(g) => g.render(name, out),
            Collector::Histogram(h) => h.render(name, out),
        }
    }
}
