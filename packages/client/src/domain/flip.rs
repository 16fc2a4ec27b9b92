//! Flip-display state for the animated counter.
//!
//! Old and new strings are aligned by their right edge so that when a value
//! grows a digit (`$999` to `$1,000`) only the characters that really changed
//! start a new flip animation.

/// One character cell of the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipCell {
    pub ch: char,
    /// Bumped every time the character at this position changes
    pub generation: u64,
    /// Flip animation in progress
    pub flipping: bool,
    /// Digits render as flip panels, separators render flat
    pub is_panel: bool,
}

/// Per-instance counter state `{ previous, generations }`
#[derive(Debug, Clone, Default)]
pub struct FlipDisplay {
    previous: Vec<char>,
    cells: Vec<FlipCell>,
}

impl FlipDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `value` without animating it in
    pub fn with_initial(value: &str) -> Self {
        let chars: Vec<char> = value.chars().collect();
        let cells = chars
            .iter()
            .map(|ch| FlipCell {
                ch: *ch,
                generation: 0,
                flipping: false,
                is_panel: ch.is_ascii_digit(),
            })
            .collect();
        Self {
            previous: chars,
            cells,
        }
    }

    /// Show `value`, returning the new cells
    pub fn update(&mut self, value: &str) -> &[FlipCell] {
        let chars: Vec<char> = value.chars().collect();
        let shift = chars.len() as isize - self.previous.len() as isize;

        let cells: Vec<FlipCell> = chars
            .iter()
            .enumerate()
            .map(|(i, ch)| {
                let prev_index = i as isize - shift;
                let previous = usize::try_from(prev_index)
                    .ok()
                    .and_then(|index| self.previous.get(index).zip(self.cells.get(index)));

                match previous {
                    Some((prev_ch, prev_cell)) if prev_ch == ch => FlipCell {
                        ch: *ch,
                        generation: prev_cell.generation,
                        flipping: prev_cell.flipping,
                        is_panel: ch.is_ascii_digit(),
                    },
                    Some((_, prev_cell)) => FlipCell {
                        ch: *ch,
                        generation: prev_cell.generation + 1,
                        flipping: true,
                        is_panel: ch.is_ascii_digit(),
                    },
                    None => FlipCell {
                        ch: *ch,
                        generation: 1,
                        flipping: true,
                        is_panel: ch.is_ascii_digit(),
                    },
                }
            })
            .collect();

        self.previous = chars;
        self.cells = cells;
        &self.cells
    }

    /// End the flip animation of one cell
    pub fn finish_flip(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.flipping = false;
        }
    }

    /// End every running flip animation
    pub fn finish_all(&mut self) {
        self.cells.iter_mut().for_each(|cell| cell.flipping = false);
    }

    pub fn cells(&self) -> &[FlipCell] {
        &self.cells
    }

    /// Currently displayed text
    pub fn text(&self) -> String {
        self.previous.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generations(cells: &[FlipCell]) -> Vec<u64> {
        cells.iter().map(|cell| cell.generation).collect()
    }

    #[test]
    fn test_growing_value_aligns_by_suffix() {
        // テスト項目: "$999" から "$1,000" への変化で新しい先頭文字が変化扱いになる
        // given (前提条件):
        let mut display = FlipDisplay::new();
        display.update("$999");
        display.finish_all();
        let before = generations(display.cells());

        // when (操作):
        let cells = display.update("$1,000").to_vec();

        // then (期待する結果):
        assert_eq!(before, vec![1, 1, 1, 1]);
        // "$1" has no counterpart, ",000" lands on "$999"
        assert_eq!(generations(&cells), vec![1, 1, 2, 2, 2, 2]);
        assert!(cells.iter().all(|cell| cell.flipping));
    }

    #[test]
    fn test_unchanged_suffix_keeps_generation() {
        // テスト項目: 値が変わらない右寄せ位置の世代は維持される
        // given (前提条件):
        let mut display = FlipDisplay::new();
        display.update("$1,000");
        display.finish_all();

        // when (操作):
        let cells = display.update("$21,000").to_vec();

        // then (期待する結果):
        // "$" is new, "2" lands on "$", "1,000" is unchanged
        assert_eq!(generations(&cells), vec![1, 2, 1, 1, 1, 1, 1]);
        assert!(cells[0].flipping);
        assert!(cells[1].flipping);
        assert!(cells[2..].iter().all(|cell| !cell.flipping));
    }

    #[test]
    fn test_changed_digit_bumps_generation() {
        // テスト項目: 変化した桁だけ世代が上がる
        // given (前提条件):
        let mut display = FlipDisplay::with_initial("$1,234.56");

        // when (操作):
        let cells = display.update("$1,234.57").to_vec();

        // then (期待する結果):
        assert_eq!(generations(&cells), vec![0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(cells[8].flipping);
        assert!(!cells[7].flipping);
    }

    #[test]
    fn test_panels_are_digits_only() {
        // テスト項目: 数字のみがパネル、区切り文字はパネルでない
        // given (前提条件):
        let mut display = FlipDisplay::new();

        // when (操作):
        let panels: Vec<bool> = display
            .update("$1,0.5")
            .iter()
            .map(|cell| cell.is_panel)
            .collect();

        // then (期待する結果):
        assert_eq!(panels, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn test_finish_flip_stops_single_cell() {
        // テスト項目: finish_flip は指定セルのアニメーションのみ終了する
        // given (前提条件):
        let mut display = FlipDisplay::new();
        display.update("12");

        // when (操作):
        display.finish_flip(0);
        display.finish_flip(99);

        // then (期待する結果):
        assert!(!display.cells()[0].flipping);
        assert!(display.cells()[1].flipping);
        assert_eq!(display.text(), "12");
    }
}
