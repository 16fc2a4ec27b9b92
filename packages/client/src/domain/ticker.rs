//! Scrolling ticker engine.
//!
//! The engine scrolls one loop of content (`render_list`) at a fixed speed
//! and wraps seamlessly. New content is parked in `pending_list` and only
//! swapped in at the wrap boundary, when the scroll is back at its logical
//! start, so the visible strip never jumps.

use super::model::TickerItem;

/// Text placed between ticker items
pub const ITEM_SEPARATOR: &str = "  •  ";

/// Measures the width of one full content loop
pub trait Measure<T> {
    fn measure(&self, items: &[T]) -> f64;
}

/// Terminal measurement: one column per character
#[derive(Debug, Clone, Copy, Default)]
pub struct CharMeasure;

/// Text of one ticker item as drawn, separator included
pub fn ticker_segment(item: &TickerItem) -> String {
    format!("{}: {}{}", item.author_name, item.content, ITEM_SEPARATOR)
}

impl Measure<TickerItem> for CharMeasure {
    fn measure(&self, items: &[TickerItem]) -> f64 {
        items
            .iter()
            .map(|item| ticker_segment(item).chars().count())
            .sum::<usize>() as f64
    }
}

impl Measure<String> for CharMeasure {
    fn measure(&self, items: &[String]) -> f64 {
        items.iter().map(|item| item.chars().count()).sum::<usize>() as f64
    }
}

/// Per-instance scroll state
#[derive(Debug, Clone)]
pub struct TickerEngine<T> {
    render_list: Vec<T>,
    pending_list: Vec<T>,
    offset: f64,
    content_width: f64,
    needs_measure: bool,
    /// px per second
    speed: f64,
    paused: bool,
    last_frame_ms: Option<f64>,
}

impl<T: Clone + PartialEq> TickerEngine<T> {
    pub fn new(speed: f64) -> Self {
        Self {
            render_list: Vec::new(),
            pending_list: Vec::new(),
            offset: 0.0,
            content_width: 0.0,
            needs_measure: false,
            speed,
            paused: false,
            last_frame_ms: None,
        }
    }

    pub fn render_list(&self) -> &[T] {
        &self.render_list
    }

    pub fn pending_list(&self) -> &[T] {
        &self.pending_list
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn content_width(&self) -> f64 {
        self.content_width
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freeze or resume the offset; frames keep flowing either way
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Width must be measured before the next advance counts
    pub fn needs_measure(&self) -> bool {
        self.needs_measure
    }

    /// Replace the pending content; seeds the render list while it is empty
    pub fn set_content(&mut self, items: Vec<T>) {
        self.pending_list = items;
        if self.render_list.is_empty() && !self.pending_list.is_empty() {
            self.render_list = self.pending_list.clone();
            self.offset = 0.0;
            self.needs_measure = true;
        }
    }

    /// Drop all content and scroll state
    pub fn reset(&mut self, items: Vec<T>) {
        self.render_list = Vec::new();
        self.pending_list = Vec::new();
        self.offset = 0.0;
        self.content_width = 0.0;
        self.last_frame_ms = None;
        self.set_content(items);
    }

    pub fn set_content_width(&mut self, width: f64) {
        self.content_width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.needs_measure = false;
    }

    /// Re-measure the render list with `measure`
    pub fn measure_with<M: Measure<T> + ?Sized>(&mut self, measure: &M) {
        let width = measure.measure(&self.render_list);
        self.set_content_width(width);
    }

    /// Advance by `elapsed_secs`; returns true when the render list was swapped
    pub fn advance(&mut self, elapsed_secs: f64) -> bool {
        if self.paused || self.content_width <= 0.0 || !(elapsed_secs > 0.0) {
            return false;
        }

        self.offset += self.speed * elapsed_secs;

        let mut swapped = false;
        while self.content_width > 0.0 && self.offset >= self.content_width {
            self.offset -= self.content_width;
            // wrap boundary: the only place new content may appear
            if !self.pending_list.is_empty() && self.pending_list != self.render_list {
                self.render_list = self.pending_list.clone();
                self.needs_measure = true;
                swapped = true;
                // the old width no longer applies to the new list
                break;
            }
        }
        swapped
    }

    /// Animation-frame callback; the first frame only sets the baseline
    pub fn on_frame(&mut self, timestamp_ms: f64) -> bool {
        let Some(last) = self.last_frame_ms.replace(timestamp_ms) else {
            return false;
        };
        self.advance((timestamp_ms - last) / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_three_and_a_half_seconds_wraps_once_and_swaps() {
        // テスト項目: 300px / 100px/s で 3.5 秒後は offset 50 で、3.0 秒の折り返しで内容が入れ替わる
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["a", "b", "c"]));
        engine.set_content_width(300.0);

        // when (操作):
        let mut swap_times = Vec::new();
        for frame in 1..=35 {
            if frame == 12 {
                engine.set_content(items(&["a", "b", "c", "d"]));
            }
            if engine.advance(0.1) {
                swap_times.push(frame);
            }
        }

        // then (期待する結果):
        assert!((engine.offset() - 50.0).abs() < 1e-9, "offset {}", engine.offset());
        assert_eq!(swap_times, vec![30]);
        assert_eq!(engine.render_list(), items(&["a", "b", "c", "d"]).as_slice());
    }

    #[test]
    fn test_render_list_never_changes_mid_scroll() {
        // テスト項目: 0 < offset < width の間は表示内容が変わらない
        // given (前提条件):
        let mut engine = TickerEngine::new(60.0);
        engine.set_content(items(&["first"]));
        engine.set_content_width(200.0);

        // when (操作):
        let mut violations = 0;
        for step in 0..600 {
            if step % 7 == 0 {
                let name = format!("n{}", step);
                engine.set_content(items(&["first", name.as_str()]));
            }
            let before = engine.render_list().to_vec();
            let previous_offset = engine.offset();
            let swapped = engine.advance(1.0 / 60.0);
            let wrapped = engine.offset() < previous_offset;
            if engine.render_list() != before.as_slice() && !(swapped && wrapped) {
                violations += 1;
            }
        }

        // then (期待する結果):
        assert_eq!(violations, 0);
    }

    #[test]
    fn test_no_advance_without_width() {
        // テスト項目: 幅が未計測 (0) の間は進まない
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["a"]));

        // when (操作):
        let swapped = engine.advance(1.0);

        // then (期待する結果):
        assert!(!swapped);
        assert_eq!(engine.offset(), 0.0);
        assert!(engine.needs_measure());
    }

    #[test]
    fn test_pause_freezes_offset_but_keeps_frame_baseline() {
        // テスト項目: 一時停止中は offset が止まり、再開時にジャンプしない
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["a"]));
        engine.set_content_width(1_000.0);
        engine.on_frame(0.0);
        engine.on_frame(100.0);

        // when (操作):
        engine.set_paused(true);
        engine.on_frame(5_000.0);
        let paused_offset = engine.offset();
        engine.set_paused(false);
        engine.on_frame(5_100.0);

        // then (期待する結果):
        assert!((paused_offset - 10.0).abs() < 1e-9);
        assert!((engine.offset() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_frame_sets_baseline_only() {
        // テスト項目: 最初のフレームは基準時刻を記録するだけで進まない
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["a"]));
        engine.set_content_width(500.0);

        // when (操作):
        engine.on_frame(123_456.0);

        // then (期待する結果):
        assert_eq!(engine.offset(), 0.0);
    }

    #[test]
    fn test_set_content_does_not_replace_render_list() {
        // テスト項目: 表示中は set_content で render_list が即座に変わらない
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["a"]));

        // when (操作):
        engine.set_content(items(&["b"]));

        // then (期待する結果):
        assert_eq!(engine.render_list(), items(&["a"]).as_slice());
        assert_eq!(engine.pending_list(), items(&["b"]).as_slice());
    }

    #[test]
    fn test_long_frame_stops_wrapping_after_swap() {
        // テスト項目: 長いフレームでも入れ替え後は旧幅で折り返さず、再計測後の幅で進む
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["old"]));
        engine.set_content_width(100.0);
        engine.set_content(items(&["new", "longer"]));

        // when (操作):
        let swapped = engine.advance(2.5);
        let offset_after_swap = engine.offset();
        engine.set_content_width(400.0);
        let swapped_again = engine.advance(0.1);

        // then (期待する結果):
        assert!(swapped);
        assert!((offset_after_swap - 150.0).abs() < 1e-9);
        assert!(!swapped_again);
        assert!((engine.offset() - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_swap_requires_remeasure() {
        // テスト項目: 入れ替え後は幅の再計測が必要になる
        // given (前提条件):
        let mut engine = TickerEngine::new(100.0);
        engine.set_content(items(&["ab"]));
        engine.measure_with(&CharMeasure);
        engine.set_content(items(&["abcd"]));

        // when (操作):
        let swapped = engine.advance(0.02);
        engine.measure_with(&CharMeasure);

        // then (期待する結果):
        assert!(swapped);
        assert_eq!(engine.content_width(), 4.0);
        assert!(!engine.needs_measure());
    }

    #[test]
    fn test_char_measure_counts_rendered_segment() {
        // テスト項目: ティッカー項目の幅は描画文字数になる
        // given (前提条件):
        let item = TickerItem {
            id: "m1".to_string(),
            author_name: "Bo".to_string(),
            content: "hi".to_string(),
            is_breaking_news: false,
        };

        // when (操作):
        let width = CharMeasure.measure(&[item]);

        // then (期待する結果):
        // "Bo: hi" + separator
        assert_eq!(width, 6.0 + ITEM_SEPARATOR.chars().count() as f64);
    }
}
