use std::sync::LazyLock;

use prometheus::*;

use crate::maintainer::IndexOutcome;

static METRIC_SEARCH_COUNT: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("lookalike_search_count", "count of visual searches").unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "lookalike_search_duration",
        "duration of the visual search in seconds, including backfill"
    )
    .unwrap()
});

static METRIC_FINGERPRINT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "lookalike_fingerprint_count",
        "count of catalog fingerprints computed by backfill or reindex",
        &["result"]
    )
    .unwrap()
});

/// 记录一次搜索
pub fn inc_search(duration: f32) {
    METRIC_SEARCH_COUNT.inc();
    METRIC_SEARCH_DURATION.observe(duration as f64);
}

/// 记录一次指纹计算结果
pub fn inc_fingerprint(outcome: &IndexOutcome) {
    let result = match outcome {
        IndexOutcome::Updated(_) => "updated",
        IndexOutcome::Skipped(e) => e.kind(),
        IndexOutcome::Superseded => "superseded",
    };
    METRIC_FINGERPRINT.with_label_values(&[result]).inc();
}

/// 以文本格式导出所有指标
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather()).unwrap_or_default()
}
