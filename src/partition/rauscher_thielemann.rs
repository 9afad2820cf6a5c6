//! The Rauscher-Thielemann tabulated partition function: a fixed 24-point
//! T9 grid with per-isotope normalised-g values, linearly interpolated.

use std::collections::HashMap;

use super::PartitionFunction;

/// The standard Rauscher-Thielemann (2000) T9 grid, in units of 10^9 K.
pub const T9_GRID: [f64; 24] = [
    0.01, 0.15, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5,
    5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
];

#[derive(Debug, Clone, Copy)]
struct Entry {
    ground_state_spin_j: f64,
    normalized_g: [f64; 24],
}

#[derive(Debug, Clone, Default)]
pub struct RauscherThielemannTable {
    entries: HashMap<(u16, u16), Entry>,
}

impl RauscherThielemannTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, z: u16, a: u16, ground_state_spin_j: f64, normalized_g: [f64; 24]) {
        self.entries.insert(
            (z, a),
            Entry {
                ground_state_spin_j,
                normalized_g,
            },
        );
    }

    /// Parses a contiguous, unpadded blob of records:
    /// `uint32 z, uint32 a, float64 ground_state_spin, float64 partition_function (unused), float64 normalized_g[24]`.
    pub fn from_blob(blob: &[u8]) -> crate::error::Result<Self> {
        const RECORD_WIDTH: usize = 4 + 4 + 8 + 8 + 8 * 24;
        if blob.len() % RECORD_WIDTH != 0 {
            return Err(crate::error::NetworkError::MalformedRecord {
                offset: blob.len() - (blob.len() % RECORD_WIDTH),
                detail: format!(
                    "partition blob length {} is not a multiple of the record width {}",
                    blob.len(),
                    RECORD_WIDTH
                ),
            });
        }
        let mut table = Self::new();
        for chunk in blob.chunks_exact(RECORD_WIDTH) {
            let mut cursor = 0usize;
            let z = u32::from_le_bytes(chunk[cursor..cursor + 4].try_into().unwrap()) as u16;
            cursor += 4;
            let a = u32::from_le_bytes(chunk[cursor..cursor + 4].try_into().unwrap()) as u16;
            cursor += 4;
            let ground_state_spin_j = f64::from_le_bytes(chunk[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
            cursor += 8; // partition_function: unused by the engine, retained for round-trip.
            let mut normalized_g = [0.0_f64; 24];
            for g in &mut normalized_g {
                *g = f64::from_le_bytes(chunk[cursor..cursor + 8].try_into().unwrap());
                cursor += 8;
            }
            table.insert(z, a, ground_state_spin_j, normalized_g);
        }
        Ok(table)
    }

    fn interpolate(entry: &Entry, t9: f64) -> (f64, f64) {
        if t9 <= T9_GRID[0] {
            return (entry.normalized_g[0], 0.0);
        }
        if t9 >= T9_GRID[T9_GRID.len() - 1] {
            return (entry.normalized_g[entry.normalized_g.len() - 1], 0.0);
        }
        let upper = T9_GRID.partition_point(|&grid_t9| grid_t9 <= t9);
        let lower = upper - 1;
        let t_lo = T9_GRID[lower];
        let t_hi = T9_GRID[upper];
        let g_lo = entry.normalized_g[lower];
        let g_hi = entry.normalized_g[upper];
        let slope = (g_hi - g_lo) / (t_hi - t_lo);
        let value = g_lo + slope * (t9 - t_lo);
        (value, slope)
    }
}

impl PartitionFunction for RauscherThielemannTable {
    fn supports(&self, z: u16, a: u16) -> bool {
        self.entries.contains_key(&(z, a))
    }

    fn evaluate(&self, z: u16, a: u16, t9: f64) -> f64 {
        let Some(entry) = self.entries.get(&(z, a)) else {
            return 1.0;
        };
        let (g_norm, _) = Self::interpolate(entry, t9);
        g_norm * (2.0 * entry.ground_state_spin_j + 1.0)
    }

    fn evaluate_derivative(&self, z: u16, a: u16, t9: f64) -> f64 {
        let Some(entry) = self.entries.get(&(z, a)) else {
            return 0.0;
        };
        let (_, slope) = Self::interpolate(entry, t9);
        slope * (2.0 * entry.ground_state_spin_j + 1.0)
    }
}
