//! Logical grid to physical LED index mapping
//!
//! The lamp is a hex-packed LED panel sampled by a coarser rectangular grid: only every other
//! cell of a row is populated, and consecutive rows are offset by one column. Cells without an
//! LED hold the [`UNADDRESSED`] sentinel.

use thiserror::Error;

/// Width of the reference logical grid
pub const GRID_WIDTH: usize = 15;
/// Height of the reference logical grid
pub const GRID_HEIGHT: usize = 16;
/// Number of physical LEDs on the reference panel
pub const LED_COUNT: usize = 96;

/// Sentinel value for a grid cell with no LED
pub const UNADDRESSED: i16 = -1;

const X: i16 = UNADDRESSED;

#[rustfmt::skip]
const HEX_PANEL_TABLE: [i16; GRID_WIDTH * GRID_HEIGHT] = [
     X, X, X, X, 0, X, 1, X, 2, X, 3, X, X, X, X,
     X, X, X, 8, X, 7, X, 6, X, 5, X, 4, X, X, X,
     X, X, X, 9, X,10, X,11, X,12, X,13, X, X, X,
     X, X,19, X,18, X,17, X,16, X,15, X,14, X, X,
     X, X,20, X,21, X,22, X,23, X,24, X,25, X, X,
     X,32, X,31, X,30, X,29, X,28, X,27, X,26, X,
     X,33, X,34, X,35, X,36, X,37, X,38, X,39, X,
    47, X,46, X,45, X,44, X,43, X,42, X,41, X,40,
    48, X,49, X,50, X,51, X,52, X,53, X,54, X,55,
     X,62, X,61, X,60, X,59, X,58, X,57, X,56, X,
     X,63, X,64, X,65, X,66, X,67, X,68, X,69, X,
     X, X,75, X,74, X,73, X,72, X,71, X,70, X, X,
     X, X,76, X,77, X,78, X,79, X,80, X,81, X, X,
     X, X, X,86, X,85, X,84, X,83, X,82, X, X, X,
     X, X, X,87, X,88, X,89, X,90, X,91, X, X, X,
     X, X, X, X,95, X,94, X,93, X,92, X, X, X, X,
];

const _: () = assert!(is_bijection(&HEX_PANEL_TABLE, LED_COUNT));

static HEX_PANEL: [i16; GRID_WIDTH * GRID_HEIGHT] = HEX_PANEL_TABLE;

/// Check that the non-sentinel entries of `table` are exactly `0..led_count`, each once
const fn is_bijection(table: &[i16], led_count: usize) -> bool {
    let mut seen = 0;
    let mut i = 0;
    while i < table.len() {
        let value = table[i];
        if value != UNADDRESSED {
            if value < 0 || value as usize >= led_count {
                return false;
            }

            let mut j = i + 1;
            while j < table.len() {
                if table[j] == value {
                    return false;
                }
                j += 1;
            }

            seen += 1;
        }
        i += 1;
    }

    seen == led_count
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("table has {actual} cells, expected {width} x {height}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("table entries are not a one-to-one mapping onto 0..{led_count}")]
    NotBijective { led_count: usize },
}

/// Static lookup table from logical grid cells to physical LED indices
#[derive(Debug, Clone, Copy)]
pub struct AddressMap {
    width: usize,
    height: usize,
    led_count: usize,
    table: &'static [i16],
}

impl AddressMap {
    /// The 96-LED hexagonal panel, sampled by a 15 x 16 grid
    pub fn hex_panel() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            led_count: LED_COUNT,
            table: &HEX_PANEL,
        }
    }

    /// Build a map from a row-major table, checking that it covers `0..led_count` exactly once
    pub fn new(
        width: usize,
        height: usize,
        led_count: usize,
        table: &'static [i16],
    ) -> Result<Self, MappingError> {
        if table.len() != width * height {
            return Err(MappingError::InvalidDimensions {
                width,
                height,
                actual: table.len(),
            });
        }

        if !is_bijection(table, led_count) {
            return Err(MappingError::NotBijective { led_count });
        }

        Ok(Self {
            width,
            height,
            led_count,
            table,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Physical LED index of a logical cell, `None` for sentinel cells and out-of-grid coordinates
    pub fn physical_index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }

        match self.table[y * self.width + x] {
            UNADDRESSED => None,
            index => Some(index as usize),
        }
    }

    /// Iterate over all addressed cells as `(x, y, led_index)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let width = self.width;
        self.table
            .iter()
            .enumerate()
            .filter(|(_, &index)| index != UNADDRESSED)
            .map(move |(cell, &index)| (cell % width, cell / width, index as usize))
    }
}

impl Default for AddressMap {
    fn default() -> Self {
        Self::hex_panel()
    }
}
