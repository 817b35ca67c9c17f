#![allow(non_upper_case_globals)]

use crate::bitboard;
use crate::state::{GameState, Move, K, NO_EP, NO_PIECE, P};
use std::sync::atomic::{AtomicU64, Ordering};

pub const FLAG_EXACT: u8 = 1;
pub const FLAG_ALPHA: u8 = 2; // upper bound
pub const FLAG_BETA: u8 = 3; // lower bound

const SCORE_BIAS: i32 = 32000;

// Entry data layout:
//   bits 0-21  packed move
//   bits 22-37 score + SCORE_BIAS
//   bits 38-45 depth
//   bits 46-47 flag
const MOVE_MASK: u64 = 0x3F_FFFF;

/// One slot. The key field holds key ^ data, so a reader that observes a
/// mismatched pair fails the XOR check instead of trusting a torn record.
pub struct TTEntry {
    pub key: AtomicU64,
    pub data: AtomicU64,
}

impl TTEntry {
    fn new() -> Self {
        Self {
            key: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    fn encode(score: i32, mv: Option<Move>, depth: u8, flag: u8) -> u64 {
        let move_bits = mv.map_or(0, |m| m.raw() as u64) & MOVE_MASK;
        let score_bits = (score.clamp(-SCORE_BIAS, SCORE_BIAS) + SCORE_BIAS) as u64;
        move_bits | (score_bits << 22) | ((depth as u64) << 38) | ((flag as u64 & 0x3) << 46)
    }

    fn decode(data: u64) -> (i32, u8, u8, Option<Move>) {
        let move_bits = (data & MOVE_MASK) as u32;
        let score = ((data >> 22) & 0xFFFF) as i32 - SCORE_BIAS;
        let depth = ((data >> 38) & 0xFF) as u8;
        let flag = ((data >> 46) & 0x3) as u8;
        let mv = if move_bits != 0 {
            Some(Move::from_raw(move_bits))
        } else {
            None
        };
        (score, depth, flag, mv)
    }
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize,
}

impl TranspositionTable {
    pub fn new(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TTEntry>();
        let desired_bytes = mb.max(1) * 1024 * 1024;

        // Power-of-two count for masked indexing
        let mut count = 1;
        while count * 2 * entry_size <= desired_bytes {
            count *= 2;
        }

        let entries = (0..count).map(|_| TTEntry::new()).collect();

        log::info!(
            "TT: {} MB requested, {} entries ({} KB)",
            mb,
            count,
            count * entry_size / 1024
        );

        Self {
            entries,
            mask: count - 1,
        }
    }

    pub fn clear(&self) {
        for entry in &self.entries {
            entry.data.store(0, Ordering::Relaxed);
            entry.key.store(0, Ordering::Relaxed);
        }
    }

    /// Bound-aware probe. A hit must match the full key and carry at least
    /// the requested depth.
    pub fn probe(&self, hash: u64, alpha: i32, beta: i32, depth: u8) -> Option<i32> {
        let (score, d, flag, _) = self.probe_data(hash)?;
        if d < depth {
            return None;
        }
        match flag {
            FLAG_EXACT => Some(score),
            FLAG_ALPHA if score <= alpha => Some(alpha),
            FLAG_BETA if score >= beta => Some(beta),
            _ => None,
        }
    }

    pub fn probe_data(&self, hash: u64) -> Option<(i32, u8, u8, Option<Move>)> {
        let entry = &self.entries[(hash as usize) & self.mask];
        let data = entry.data.load(Ordering::Relaxed);
        let stored_key = entry.key.load(Ordering::Acquire);

        // Verify integrity: decoding garbage is prevented by the XOR check
        if data == 0 || (stored_key ^ data) != hash {
            return None;
        }
        Some(TTEntry::decode(data))
    }

    pub fn get_move(&self, hash: u64) -> Option<Move> {
        self.probe_data(hash).and_then(|(_, _, _, m)| m)
    }

    pub fn store(&self, hash: u64, score: i32, best_move: Option<Move>, depth: u8, flag: u8) {
        let entry = &self.entries[(hash as usize) & self.mask];
        let old_data = entry.data.load(Ordering::Relaxed);
        let old_key = entry.key.load(Ordering::Acquire);

        if old_data != 0 && (old_key ^ old_data) != hash {
            // Depth-preferring replacement: keep a clearly deeper entry
            // belonging to another position
            let (_, old_depth, _, _) = TTEntry::decode(old_data);
            if old_depth > depth + 2 {
                return;
            }
        }

        // Keep the old move when the new search produced none
        let mv = if best_move.is_some() {
            best_move
        } else if old_data != 0 && (old_key ^ old_data) == hash {
            TTEntry::decode(old_data).3
        } else {
            None
        };

        let data = TTEntry::encode(score, mv, depth, flag);
        // Payload first, key last: the key store publishes the entry
        entry.data.store(data, Ordering::Release);
        entry.key.store(hash ^ data, Ordering::Release);
    }

    /// Permil of sampled slots in use, for `info hashfull`.
    pub fn hashfull(&self) -> usize {
        let sample = self.entries.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let used = self.entries[..sample]
            .iter()
            .filter(|e| e.data.load(Ordering::Relaxed) != 0)
            .count();
        used * 1000 / sample
    }

    /// Sanity filter for moves recovered from the table. Collisions can
    /// surface a move from a different position; replaying one would
    /// corrupt the board.
    pub fn is_pseudo_legal(&self, state: &GameState, mv: Move) -> bool {
        let from = mv.source();
        let to = mv.target();
        let side = state.side_to_move;

        if from == to {
            return false;
        }

        let piece = mv.piece() + 6 * side;
        if state.piece_at(from) != piece {
            return false;
        }

        let target_piece = state.piece_at(to);

        if mv.is_castling() {
            let home = if side == 0 { 4u8 } else { 60 };
            if from != home || mv.piece() != K {
                return false;
            }
            let (right, path): (u8, &[u8]) = match to {
                6 => (crate::state::CASTLE_WK, &[5, 6]),
                2 => (crate::state::CASTLE_WQ, &[1, 2, 3]),
                62 => (crate::state::CASTLE_BK, &[61, 62]),
                58 => (crate::state::CASTLE_BQ, &[57, 58, 59]),
                _ => return false,
            };
            return state.castling_rights & right != 0
                && path.iter().all(|&sq| state.piece_at(sq) == NO_PIECE);
        }

        if mv.is_en_passant() {
            return mv.piece() == P
                && state.en_passant != NO_EP
                && to == state.en_passant;
        }

        if mv.is_capture() {
            // Must capture an enemy non-king piece
            if target_piece == NO_PIECE {
                return false;
            }
            let target_side = target_piece / 6;
            if target_side == side || target_piece % 6 == K {
                return false;
            }
        } else if target_piece != NO_PIECE {
            return false;
        }

        let occ = state.occupancies[crate::state::BOTH];
        match mv.piece() {
            P => {
                let (push, double_start, promo_rank) = if side == 0 {
                    (8i16, 1u8, 7u8)
                } else {
                    (-8, 6, 0)
                };
                let diff = to as i16 - from as i16;
                if mv.promotion().is_some() != (to / 8 == promo_rank) {
                    return false;
                }
                if mv.is_capture() {
                    return (diff == push - 1 || diff == push + 1)
                        && (from % 8).abs_diff(to % 8) == 1;
                }
                if diff == push {
                    return true;
                }
                if diff == 2 * push {
                    let mid = (from as i16 + push) as u8;
                    return from / 8 == double_start
                        && mv.is_double_push()
                        && state.piece_at(mid) == NO_PIECE;
                }
                false
            }
            K => bitboard::mask_king_attacks(from).get_bit(to),
            crate::state::N => bitboard::mask_knight_attacks(from).get_bit(to),
            crate::state::B => bitboard::get_bishop_attacks(from, occ).get_bit(to),
            crate::state::R => bitboard::get_rook_attacks(from, occ).get_bit(to),
            crate::state::Q => bitboard::get_queen_attacks(from, occ).get_bit(to),
            _ => false,
        }
    }
}
