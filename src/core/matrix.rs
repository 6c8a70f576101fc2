//! 7th CPC pay matrix: level 1-18 columns, step indices 1-40.
//!
//! Cells are seeded from the commission's entry pay per level and compound
//! at 3% per step, rounded to the nearest 100, which is how the published
//! matrix is constructed. A pay-commission revision multiplies every cell
//! in place via `apply_fitment`.

pub const MAX_LEVEL: u32 = 18;
pub const MAX_INDEX: u32 = 40;

const STEP_RATE: f64 = 0.03;

const ENTRY_PAY: [f64; MAX_LEVEL as usize] = [
    18_000.0, 19_900.0, 21_700.0, 25_500.0, 29_200.0, 35_400.0, 44_900.0, 47_600.0, 53_100.0,
    56_100.0, 67_700.0, 78_800.0, 123_100.0, 144_200.0, 182_200.0, 205_400.0, 225_000.0, 250_000.0,
];

#[derive(Debug, Clone)]
pub struct PayMatrix {
    cells: Vec<Vec<f64>>,
}

impl PayMatrix {
    pub fn seventh_cpc() -> Self {
        let cells = ENTRY_PAY
            .iter()
            .map(|&entry| {
                let mut column = Vec::with_capacity(MAX_INDEX as usize);
                let mut amount = entry;
                column.push(amount);
                for _ in 1..MAX_INDEX {
                    amount = round_to_hundred(amount * (1.0 + STEP_RATE));
                    column.push(amount);
                }
                column
            })
            .collect();

        Self { cells }
    }

    /// Basic pay for a level and step index. Levels and indices outside the
    /// matrix are clamped to the nearest valid cell; a step past the top of
    /// a level pays the top-of-level amount.
    pub fn lookup(&self, level: u32, index: u32) -> f64 {
        let column = &self.cells[level.clamp(1, MAX_LEVEL) as usize - 1];
        let index = index.clamp(1, column.len() as u32) as usize - 1;
        column[index]
    }

    pub fn max_index(&self, level: u32) -> u32 {
        self.cells[level.clamp(1, MAX_LEVEL) as usize - 1].len() as u32
    }

    /// Pay-commission revision: multiply every cell in place.
    pub fn apply_fitment(&mut self, factor: f64) {
        for column in &mut self.cells {
            for amount in column {
                *amount *= factor;
            }
        }
    }
}

impl Default for PayMatrix {
    fn default() -> Self {
        Self::seventh_cpc()
    }
}

fn round_to_hundred(amount: f64) -> f64 {
    (amount / 100.0).round() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_pay_matches_published_matrix() {
        let matrix = PayMatrix::seventh_cpc();
        assert_eq!(matrix.lookup(1, 1), 18_000.0);
        assert_eq!(matrix.lookup(10, 1), 56_100.0);
        assert_eq!(matrix.lookup(18, 1), 250_000.0);
    }

    #[test]
    fn steps_compound_at_three_percent_rounded() {
        let matrix = PayMatrix::seventh_cpc();
        assert_eq!(matrix.lookup(10, 2), 57_800.0);
        assert_eq!(matrix.lookup(10, 3), 59_500.0);
        assert_eq!(matrix.lookup(1, 2), 18_500.0);
    }

    #[test]
    fn amounts_are_strictly_increasing_within_each_level() {
        let matrix = PayMatrix::seventh_cpc();
        for level in 1..=MAX_LEVEL {
            for index in 2..=matrix.max_index(level) {
                assert!(
                    matrix.lookup(level, index) > matrix.lookup(level, index - 1),
                    "level {level} index {index} not increasing"
                );
            }
        }
    }

    #[test]
    fn lookup_clamps_step_index_to_level_maximum() {
        let matrix = PayMatrix::seventh_cpc();
        let top = matrix.lookup(5, matrix.max_index(5));
        assert_eq!(matrix.lookup(5, MAX_INDEX + 7), top);
        assert_eq!(matrix.lookup(5, 0), matrix.lookup(5, 1));
    }

    #[test]
    fn apply_fitment_scales_every_cell() {
        let mut matrix = PayMatrix::seventh_cpc();
        let before = matrix.lookup(7, 12);
        matrix.apply_fitment(2.0);
        assert_eq!(matrix.lookup(7, 12), before * 2.0);
        assert_eq!(matrix.lookup(1, 1), 36_000.0);
    }
}
