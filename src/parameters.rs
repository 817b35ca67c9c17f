use serde::{Deserialize, Serialize};
use std::io::Write;

fn default_lmr_table() -> [[u8; 64]; 64] {
    [[0; 64]; 64]
}

/// Heuristic search constants. Everything here is tunable; the defaults
/// are the shipping values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchParameters {
    // Aspiration
    pub aspiration_window: i32,
    pub aspiration_min_depth: u8,

    // Razoring
    pub razor_depth: u8,
    pub razor_margin: i32,

    // Reverse futility
    pub rfp_depth: u8,
    pub rfp_margin: i32,

    // Null move
    pub nmp_min_depth: u8,
    pub nmp_base: u8,
    pub nmp_divisor: u8,

    // Internal iterative reduction
    pub iir_min_depth: u8,

    // Singular extension
    pub singular_min_depth: u8,

    // Futility
    pub futility_depth: u8,
    pub futility_margin: i32,

    // LMR shape
    pub lmr_base: f64,
    pub lmr_divisor: f64,

    // Quiescence SEE pruning
    pub see_prune_margin: i32,

    // History
    pub history_clamp: i32,

    // Precomputed LMR reductions, rebuilt after deserialization
    #[serde(skip, default = "default_lmr_table")]
    pub lmr_table: [[u8; 64]; 64],
}

impl Default for SearchParameters {
    fn default() -> Self {
        let mut params = Self {
            aspiration_window: 50,
            aspiration_min_depth: 4,

            razor_depth: 3,
            razor_margin: 300,

            rfp_depth: 7,
            rfp_margin: 90,

            nmp_min_depth: 3,
            nmp_base: 2,
            nmp_divisor: 6,

            iir_min_depth: 4,

            singular_min_depth: 8,

            futility_depth: 3,
            futility_margin: 250,

            lmr_base: 0.0,
            lmr_divisor: 1.5,

            see_prune_margin: -100,

            history_clamp: 10000,

            lmr_table: [[0; 64]; 64],
        };
        params.recalculate_tables();
        params
    }
}

impl SearchParameters {
    pub fn recalculate_tables(&mut self) {
        for d in 1..64 {
            for m in 1..64 {
                let lmr =
                    self.lmr_base + (d as f64).ln() * (m as f64).ln() / self.lmr_divisor;
                self.lmr_table[d][m] = lmr.max(0.0) as u8;
            }
        }
    }

    /// LMR reduction for (depth, move number), clamped to [1, depth-1].
    #[inline(always)]
    pub fn lmr_reduction(&self, depth: u8, move_number: usize) -> u8 {
        let d = (depth as usize).min(63);
        let m = move_number.min(63);
        let r = self.lmr_table[d][m];
        r.clamp(1, depth.saturating_sub(1).max(1))
    }

    pub fn save_to_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn load_from_json(path: &str) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut params: SearchParameters = serde_json::from_reader(reader)?;
        params.recalculate_tables();
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lmr_table_shape() {
        let params = SearchParameters::default();
        // ln(8)*ln(8)/1.5 ~ 2.88
        assert_eq!(params.lmr_table[8][8], 2);
        // Reductions grow with depth and move number
        assert!(params.lmr_table[32][32] >= params.lmr_table[8][8]);
    }

    #[test]
    fn test_lmr_reduction_clamped() {
        let params = SearchParameters::default();
        // Never reduces past depth-1
        assert!(params.lmr_reduction(3, 60) <= 2);
        assert!(params.lmr_reduction(2, 60) >= 1);
        // And always reduces at least one ply when asked
        assert!(params.lmr_reduction(20, 4) >= 1);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = std::env::temp_dir().join("quartz_params_test.json");
        let path = dir.to_str().unwrap();

        let mut params = SearchParameters::default();
        params.rfp_margin = 123;
        params.save_to_json(path).unwrap();

        let loaded = SearchParameters::load_from_json(path).unwrap();
        assert_eq!(loaded.rfp_margin, 123);
        // Derived table is rebuilt, not serialized
        assert_eq!(loaded.lmr_table[8][8], params.lmr_table[8][8]);

        let _ = std::fs::remove_file(path);
    }
}
