#![allow(non_upper_case_globals)]
use crate::bitboard::{self, Bitboard};
use crate::state::{
    b, k, n, p, q, r, GameState, Move, B, BLACK, BOTH, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ,
    FLAG_CAPTURE, FLAG_CASTLING, FLAG_DOUBLE_PUSH, FLAG_EN_PASSANT, K, N, NO_EP, P, Q, R, WHITE,
};
use std::sync::OnceLock;

// --- SAFE GLOBAL TABLES ---
static KNIGHT_TABLE: OnceLock<[Bitboard; 64]> = OnceLock::new();
static KING_TABLE: OnceLock<[Bitboard; 64]> = OnceLock::new();

pub fn init_move_tables() {
    KNIGHT_TABLE.get_or_init(|| {
        let mut table = [Bitboard(0); 64];
        for (square, entry) in table.iter_mut().enumerate() {
            *entry = bitboard::mask_knight_attacks(square as u8);
        }
        table
    });

    KING_TABLE.get_or_init(|| {
        let mut table = [Bitboard(0); 64];
        for (square, entry) in table.iter_mut().enumerate() {
            *entry = bitboard::mask_king_attacks(square as u8);
        }
        table
    });
}

// --- ACCESSORS ---

#[inline(always)]
pub fn get_knight_attacks(sq: u8) -> Bitboard {
    KNIGHT_TABLE.get().expect("Move tables not initialized")[sq as usize]
}

#[inline(always)]
pub fn get_king_attacks(sq: u8) -> Bitboard {
    KING_TABLE.get().expect("Move tables not initialized")[sq as usize]
}

#[derive(Clone, Copy)]
pub struct MoveList {
    pub moves: [Move; 256],
    pub count: usize,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            moves: [Move::default(); 256],
            count: 0,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, m: Move) {
        if self.count < 256 {
            self.moves[self.count] = m;
            self.count += 1;
        }
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MoveGenerator {
    pub list: MoveList,
}

impl MoveGenerator {
    pub fn new() -> Self {
        Self {
            list: MoveList::new(),
        }
    }

    #[inline(always)]
    fn add_move(&mut self, source: u8, target: u8, piece: usize, promotion: Option<usize>, flags: u32) {
        self.list.push(Move::new(source, target, piece, promotion, flags));
    }

    #[inline(always)]
    fn add_promotions(&mut self, source: u8, target: u8, flags: u32) {
        self.add_move(source, target, P, Some(Q), flags);
        self.add_move(source, target, P, Some(R), flags);
        self.add_move(source, target, P, Some(B), flags);
        self.add_move(source, target, P, Some(N), flags);
    }

    /// Collects every pseudo-legal move for the side to move. King safety
    /// and castling attack squares are checked later by make_move.
    pub fn generate_moves(&mut self, state: &GameState) {
        let side = state.side_to_move;
        let enemy = 1 - side;
        let occupancy_all = state.occupancies[BOTH];
        let occupancy_friendly = state.occupancies[side];

        // Never generate king captures
        let enemy_king_bb = state.bitboards[if enemy == WHITE { K } else { k }];
        let occupancy_enemy = state.occupancies[enemy] & !enemy_king_bb;

        // PAWNS
        let (pawn_type, start_rank, promo_rank, direction) = if side == WHITE {
            (P, 1, 7, 1i8)
        } else {
            (p, 6, 0, -1)
        };

        let mut pawns = state.bitboards[pawn_type];
        while !pawns.is_empty() {
            let src = pawns.pop_lsb();
            let rank = src / 8;

            let target = (src as i8 + 8 * direction) as u8;
            // Quiet pushes
            if !occupancy_all.get_bit(target) {
                if target / 8 == promo_rank {
                    self.add_promotions(src, target, 0);
                } else {
                    self.add_move(src, target, P, None, 0);
                    if rank == start_rank {
                        let double = (src as i8 + 16 * direction) as u8;
                        if !occupancy_all.get_bit(double) {
                            self.add_move(src, double, P, None, FLAG_DOUBLE_PUSH);
                        }
                    }
                }
            }

            // Captures, with edge-file guards against wrap-around
            let file = src % 8;
            for offset in [-1i8, 1] {
                if (file == 0 && offset == -1) || (file == 7 && offset == 1) {
                    continue;
                }
                let t = (src as i8 + 8 * direction + offset) as u8;
                if occupancy_enemy.get_bit(t) {
                    if t / 8 == promo_rank {
                        self.add_promotions(src, t, FLAG_CAPTURE);
                    } else {
                        self.add_move(src, t, P, None, FLAG_CAPTURE);
                    }
                } else if state.en_passant != NO_EP && t == state.en_passant {
                    self.add_move(src, t, P, None, FLAG_CAPTURE | FLAG_EN_PASSANT);
                }
            }
        }

        // KNIGHTS
        let knight_type = if side == WHITE { N } else { n };
        let mut knights = state.bitboards[knight_type];
        while !knights.is_empty() {
            let src = knights.pop_lsb();
            let mut attacks = get_knight_attacks(src) & !occupancy_friendly & !enemy_king_bb;
            while !attacks.is_empty() {
                let t = attacks.pop_lsb();
                let flags = if occupancy_enemy.get_bit(t) { FLAG_CAPTURE } else { 0 };
                self.add_move(src, t, N, None, flags);
            }
        }

        // BISHOPS
        let bishop_type = if side == WHITE { B } else { b };
        let mut bishops = state.bitboards[bishop_type];
        while !bishops.is_empty() {
            let src = bishops.pop_lsb();
            let mut attacks =
                bitboard::get_bishop_attacks(src, occupancy_all) & !occupancy_friendly & !enemy_king_bb;
            while !attacks.is_empty() {
                let t = attacks.pop_lsb();
                let flags = if occupancy_enemy.get_bit(t) { FLAG_CAPTURE } else { 0 };
                self.add_move(src, t, B, None, flags);
            }
        }

        // ROOKS
        let rook_type = if side == WHITE { R } else { r };
        let mut rooks = state.bitboards[rook_type];
        while !rooks.is_empty() {
            let src = rooks.pop_lsb();
            let mut attacks =
                bitboard::get_rook_attacks(src, occupancy_all) & !occupancy_friendly & !enemy_king_bb;
            while !attacks.is_empty() {
                let t = attacks.pop_lsb();
                let flags = if occupancy_enemy.get_bit(t) { FLAG_CAPTURE } else { 0 };
                self.add_move(src, t, R, None, flags);
            }
        }

        // QUEENS
        let queen_type = if side == WHITE { Q } else { q };
        let mut queens = state.bitboards[queen_type];
        while !queens.is_empty() {
            let src = queens.pop_lsb();
            let mut attacks =
                bitboard::get_queen_attacks(src, occupancy_all) & !occupancy_friendly & !enemy_king_bb;
            while !attacks.is_empty() {
                let t = attacks.pop_lsb();
                let flags = if occupancy_enemy.get_bit(t) { FLAG_CAPTURE } else { 0 };
                self.add_move(src, t, Q, None, flags);
            }
        }

        // KING
        let king_type = if side == WHITE { K } else { k };
        let king = state.bitboards[king_type];
        if !king.is_empty() {
            let src = king.get_lsb_index() as u8;
            let mut attacks = get_king_attacks(src) & !occupancy_friendly & !enemy_king_bb;
            while !attacks.is_empty() {
                let t = attacks.pop_lsb();
                let flags = if occupancy_enemy.get_bit(t) { FLAG_CAPTURE } else { 0 };
                self.add_move(src, t, K, None, flags);
            }

            // CASTLING: rights + empty through-squares + king at home.
            // Attacked-square legality is make_move's job.
            if side == WHITE && src == 4 {
                if state.castling_rights & CASTLE_WK != 0
                    && !occupancy_all.get_bit(5)
                    && !occupancy_all.get_bit(6)
                {
                    self.add_move(4, 6, K, None, FLAG_CASTLING);
                }
                if state.castling_rights & CASTLE_WQ != 0
                    && !occupancy_all.get_bit(1)
                    && !occupancy_all.get_bit(2)
                    && !occupancy_all.get_bit(3)
                {
                    self.add_move(4, 2, K, None, FLAG_CASTLING);
                }
            } else if side == BLACK && src == 60 {
                if state.castling_rights & CASTLE_BK != 0
                    && !occupancy_all.get_bit(61)
                    && !occupancy_all.get_bit(62)
                {
                    self.add_move(60, 62, K, None, FLAG_CASTLING);
                }
                if state.castling_rights & CASTLE_BQ != 0
                    && !occupancy_all.get_bit(57)
                    && !occupancy_all.get_bit(58)
                    && !occupancy_all.get_bit(59)
                {
                    self.add_move(60, 58, K, None, FLAG_CASTLING);
                }
            }
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_square_attacked(state: &GameState, square: u8, attacker_side: usize) -> bool {
    if square >= 64 {
        return false;
    }

    if attacker_side == WHITE {
        if square >= 8 {
            if square % 8 > 0 && state.bitboards[P].get_bit(square - 9) {
                return true;
            }
            if square % 8 < 7 && state.bitboards[P].get_bit(square - 7) {
                return true;
            }
        }
    } else if square < 56 {
        if square % 8 > 0 && state.bitboards[p].get_bit(square + 7) {
            return true;
        }
        if square % 8 < 7 && state.bitboards[p].get_bit(square + 9) {
            return true;
        }
    }

    let knights = if attacker_side == WHITE {
        state.bitboards[N]
    } else {
        state.bitboards[n]
    };
    if !(get_knight_attacks(square) & knights).is_empty() {
        return true;
    }

    let king = if attacker_side == WHITE {
        state.bitboards[K]
    } else {
        state.bitboards[k]
    };
    if !(get_king_attacks(square) & king).is_empty() {
        return true;
    }

    let occupancy = state.occupancies[BOTH];
    let rooks = if attacker_side == WHITE {
        state.bitboards[R] | state.bitboards[Q]
    } else {
        state.bitboards[r] | state.bitboards[q]
    };
    if !(bitboard::get_rook_attacks(square, occupancy) & rooks).is_empty() {
        return true;
    }

    let bishops = if attacker_side == WHITE {
        state.bitboards[B] | state.bitboards[Q]
    } else {
        state.bitboards[b] | state.bitboards[q]
    };
    if !(bitboard::get_bishop_attacks(square, occupancy) & bishops).is_empty() {
        return true;
    }

    false
}
