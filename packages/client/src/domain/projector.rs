//! ARR projection and currency formatting.

use std::collections::BTreeMap;

use super::model::{ProductMetric, Timestamp};

/// Julian year in seconds (365.25 * 24 * 3600)
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Project a metric's value at `now`
///
/// Returns `None` while the metric is not loaded (zero base value and zero
/// sync time). Negative growth rates decrease the projection and are not
/// clamped.
pub fn project(metric: &ProductMetric, now: Timestamp) -> Option<f64> {
    if metric.base_value == 0.0 && metric.last_synced_at == 0 {
        return None;
    }
    if now == metric.last_synced_at {
        return Some(metric.base_value);
    }

    let per_second = metric.base_value * metric.annual_growth_rate / SECONDS_PER_YEAR;
    let elapsed_secs = (now - metric.last_synced_at) as f64 / 1000.0;
    Some(metric.base_value + per_second * elapsed_secs)
}

/// Sum of every loaded product's projection, `None` when nothing is loaded
pub fn project_total(metrics: &BTreeMap<String, ProductMetric>, now: Timestamp) -> Option<f64> {
    metrics
        .values()
        .filter_map(|metric| project(metric, now))
        .fold(None, |total, value| Some(total.unwrap_or(0.0) + value))
}

/// Format as US dollars with thousands separators and two decimals
///
/// From one million upwards cents are truncated rather than rounded so the
/// displayed figure never runs ahead of the projection.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }

    let (sign, dollars, cents) = if value >= 1_000_000.0 {
        let dollars = value.floor();
        let cents = ((value - dollars) * 100.0).floor() as u64;
        ("", dollars as u64, cents.min(99))
    } else {
        let total_cents = (value.abs() * 100.0).round() as u64;
        let sign = if value < 0.0 && total_cents > 0 { "-" } else { "" };
        (sign, total_cents / 100, total_cents % 100)
    };

    format!("{}${}.{:02}", sign, group_thousands(dollars), cents)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Timestamp = 1_700_000_000_000;

    fn metric(base_value: f64, annual_growth_rate: f64) -> ProductMetric {
        ProductMetric {
            base_value,
            annual_growth_rate,
            month_delta: 0.0,
            last_synced_at: T0,
        }
    }

    #[test]
    fn test_project_at_sync_time_returns_base_exactly() {
        // テスト項目: 同期時刻での投影値はベース値と完全に一致する
        // given (前提条件):
        let metric = metric(108_000_000.0, 0.30);

        // when (操作):
        let value = project(&metric, T0);

        // then (期待する結果):
        assert_eq!(value, Some(108_000_000.0));
    }

    #[test]
    fn test_project_one_julian_year() {
        // テスト項目: 1 ユリウス年後に成長率分だけ増える
        // given (前提条件):
        let metric = metric(1_000_000.0, 0.10);
        let one_year_later = T0 + 31_557_600 * 1000;

        // when (操作):
        let value = project(&metric, one_year_later);

        // then (期待する結果):
        let value = value.unwrap_or_default();
        assert!((value - 1_100_000.0).abs() < 1e-6, "got {}", value);
    }

    #[test]
    fn test_project_is_monotonic_for_positive_growth() {
        // テスト項目: 成長率が正なら時間に対して単調増加する
        // given (前提条件):
        let metric = metric(5_000_000.0, 0.25);

        // when (操作):
        let values: Vec<f64> = (0..10)
            .map(|i| project(&metric, T0 + i * 1_000).unwrap_or_default())
            .collect();

        // then (期待する結果):
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_project_decreases_for_negative_growth() {
        // テスト項目: 成長率が負なら減少し、クランプされない
        // given (前提条件):
        let metric = metric(1_000_000.0, -0.50);

        // when (操作):
        let later = project(&metric, T0 + 3 * 31_557_600 * 1000).unwrap_or_default();

        // then (期待する結果):
        assert!((later - (-500_000.0)).abs() < 1e-6, "got {}", later);
    }

    #[test]
    fn test_project_unloaded_metric_is_none() {
        // テスト項目: 未ロードのメトリクスは None を返す
        // given (前提条件):
        let metric = ProductMetric::default();

        // when (操作):
        let value = project(&metric, T0);

        // then (期待する結果):
        assert_eq!(value, None);
    }

    #[test]
    fn test_project_total_skips_unloaded() {
        // テスト項目: 合計は未ロードの製品を除外して計算される
        // given (前提条件):
        let mut metrics = BTreeMap::new();
        metrics.insert("lemlist".to_string(), metric(1_000.0, 0.0));
        metrics.insert("claap".to_string(), metric(500.0, 0.0));
        metrics.insert("taplio".to_string(), ProductMetric::default());

        // when (操作):
        let total = project_total(&metrics, T0);
        let empty = project_total(&BTreeMap::new(), T0);

        // then (期待する結果):
        assert_eq!(total, Some(1_500.0));
        assert_eq!(empty, None);
    }

    #[test]
    fn test_format_currency_truncates_cents_above_one_million() {
        // テスト項目: 100 万以上ではセントを切り捨てる
        // given (前提条件):
        let value = 108_123_456.789;

        // when (操作):
        let formatted = format_currency(value);

        // then (期待する結果):
        assert_eq!(formatted, "$108,123,456.78");
    }

    #[test]
    fn test_format_currency_rounds_below_one_million() {
        // テスト項目: 100 万未満では小数 2 桁に丸める
        // given (前提条件):
        let values = [999.0, 1_000.0, 12_345.678, 0.0];

        // when (操作):
        let formatted: Vec<String> = values.iter().map(|v| format_currency(*v)).collect();

        // then (期待する結果):
        assert_eq!(formatted, vec!["$999.00", "$1,000.00", "$12,345.68", "$0.00"]);
    }

    #[test]
    fn test_format_currency_negative() {
        // テスト項目: 負の値は符号付きで表示される
        // given (前提条件):
        let value = -1_234.5;

        // when (操作):
        let formatted = format_currency(value);

        // then (期待する結果):
        assert_eq!(formatted, "-$1,234.50");
    }
}
