// src/search.rs
use crate::bitboard::{self, Bitboard};
use crate::eval::{self, PIECE_VALUES};
use crate::history::ContinuationHistory;
use crate::movegen::{self, MoveGenerator};
use crate::parameters::SearchParameters;
use crate::state::{GameState, Move, B, BOTH, K, N, P, Q, R};
use crate::time::TimeManager;
use crate::tt::{TranspositionTable, FLAG_ALPHA, FLAG_BETA, FLAG_EXACT};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub const MAX_PLY: usize = 128;
pub const INFINITY: i32 = 32000;
pub const MATE_VALUE: i32 = 31000;
pub const MATE_SCORE: i32 = 30000;

const CHECK_EXT_MAX_PLY: usize = 40;

#[derive(Clone, Copy)]
pub enum Limits {
    Infinite,
    FixedDepth(u8),
    FixedNodes(u64),
    FixedTime(TimeManager),
}

/// Per-thread move ordering state. Killers, counters and continuation
/// history reset between searches; plain history ages instead.
pub struct SearchData {
    pub killers: [[Option<Move>; 2]; MAX_PLY + 1],
    /// Indexed by (piece code, target square), clamped by the parameters.
    pub history: [[i32; 64]; 12],
    pub counter_moves: [[Option<Move>; 64]; 12],
    pub cont_history: ContinuationHistory,
}

impl SearchData {
    pub fn new() -> Self {
        Self {
            killers: [[None; 2]; MAX_PLY + 1],
            history: [[0; 64]; 12],
            counter_moves: [[None; 64]; 12],
            cont_history: ContinuationHistory::new(),
        }
    }

    pub fn clear(&mut self) {
        self.killers = [[None; 2]; MAX_PLY + 1];
        self.history = [[0; 64]; 12];
        self.counter_moves = [[None; 64]; 12];
        self.cont_history.clear();
    }

    /// Carries aged history into the next search, drops the rest.
    pub fn new_search(&mut self) {
        self.killers = [[None; 2]; MAX_PLY + 1];
        self.counter_moves = [[None; 64]; 12];
        self.cont_history.clear();
        for row in self.history.iter_mut() {
            for entry in row.iter_mut() {
                *entry = *entry * 9 / 10;
            }
        }
    }
}

impl Default for SearchData {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SearchInfo<'a> {
    pub data: &'a mut SearchData,
    pub nodes: u64,
    pub seldepth: u8,
    pub limits: Limits,
    pub stop_signal: Arc<AtomicBool>,
    pub stopped: bool,
    pub tt: &'a TranspositionTable,
    pub main_thread: bool,
    pub params: &'a SearchParameters,
    /// Root moves excluded from this pass (MultiPV accumulation).
    pub root_exclusions: Vec<Move>,
    // Triangular PV storage
    pv_table: Vec<[Move; MAX_PLY]>,
    pv_len: [usize; MAX_PLY + 1],
}

impl<'a> SearchInfo<'a> {
    pub fn new(
        data: &'a mut SearchData,
        limits: Limits,
        stop: Arc<AtomicBool>,
        tt: &'a TranspositionTable,
        main: bool,
        params: &'a SearchParameters,
    ) -> Self {
        Self {
            data,
            nodes: 0,
            seldepth: 0,
            limits,
            stop_signal: stop,
            stopped: false,
            tt,
            main_thread: main,
            params,
            root_exclusions: Vec::new(),
            pv_table: vec![[Move::default(); MAX_PLY]; MAX_PLY],
            pv_len: [0; MAX_PLY + 1],
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.nodes % 1024 != 0 {
            return;
        }
        if self.stop_signal.load(Ordering::Relaxed) {
            self.stopped = true;
            return;
        }

        match &self.limits {
            Limits::FixedNodes(limit) => {
                if self.nodes >= *limit {
                    self.stopped = true;
                    self.stop_signal.store(true, Ordering::Relaxed);
                }
            }
            Limits::FixedTime(tm) => {
                if self.main_thread && tm.check_hard_limit() {
                    self.stopped = true;
                    self.stop_signal.store(true, Ordering::Relaxed);
                }
            }
            Limits::FixedDepth(_) | Limits::Infinite => {
                // Only a manual stop terminates these modes
            }
        }
    }

    fn reset_pv(&mut self, ply: usize) {
        self.pv_len[ply] = 0;
    }

    fn update_pv(&mut self, ply: usize, mv: Move) {
        self.pv_table[ply][0] = mv;
        let child_len = if ply + 1 < MAX_PLY {
            self.pv_len[ply + 1].min(MAX_PLY - 1 - ply)
        } else {
            0
        };
        if child_len > 0 {
            // split_at_mut keeps the borrows of the two rows disjoint
            let (head, tail) = self.pv_table.split_at_mut(ply + 1);
            head[ply][1..=child_len].copy_from_slice(&tail[0][..child_len]);
        }
        self.pv_len[ply] = child_len + 1;
    }

    pub fn pv_line(&self) -> Vec<Move> {
        self.pv_table[0][..self.pv_len[0]].to_vec()
    }
}

// --- SEE (Static Exchange Evaluation, simplified) ---
// A defended victim costs the attacker; an undefended one is free. Only a
// pruning guard for quiescence, not a full swap-off.
pub fn see(state: &GameState, mv: Move) -> i32 {
    let attacker_value = PIECE_VALUES[mv.piece()];
    let victim_value = if mv.is_en_passant() {
        PIECE_VALUES[P]
    } else {
        PIECE_VALUES[state.piece_at(mv.target()) % 6]
    };

    // Look through the attacker's square so stacked defenders count
    let occ = Bitboard(state.occupancies[BOTH].0 & !(1u64 << mv.source()));
    if square_defended(state, mv.target(), 1 - state.side_to_move, occ) {
        victim_value - attacker_value
    } else {
        victim_value
    }
}

fn square_defended(state: &GameState, sq: u8, defender: usize, occ: Bitboard) -> bool {
    let base = 6 * defender;

    let pawns = state.bitboards[P + base];
    if !(bitboard::pawn_attacks(pawns, defender) & Bitboard(1u64 << sq)).is_empty() {
        return true;
    }
    if !(movegen::get_knight_attacks(sq) & state.bitboards[N + base]).is_empty() {
        return true;
    }
    if !(movegen::get_king_attacks(sq) & state.bitboards[K + base]).is_empty() {
        return true;
    }
    let rooks = state.bitboards[R + base] | state.bitboards[Q + base];
    if !(bitboard::get_rook_attacks(sq, occ) & rooks).is_empty() {
        return true;
    }
    let bishops = state.bitboards[B + base] | state.bitboards[Q + base];
    if !(bitboard::get_bishop_attacks(sq, occ) & bishops).is_empty() {
        return true;
    }
    false
}

// --- MOVE ORDERING ---
fn score_move(
    mv: Move,
    tt_move: Option<Move>,
    info: &SearchInfo,
    ply: usize,
    state: &GameState,
    prev_move: Option<Move>,
) -> i32 {
    let promo_bonus = mv.promotion().map_or(0, |pt| PIECE_VALUES[pt]);

    if let Some(tm) = tt_move {
        if mv.matches(tm) {
            return 20000;
        }
    }

    if !mv.is_capture() {
        if let Some(pm) = prev_move {
            let prev_piece = pm.piece() + 6 * (1 - state.side_to_move);
            if let Some(cm) = info.data.counter_moves[prev_piece][pm.target() as usize] {
                if mv.matches(cm) {
                    return 15000;
                }
            }
        }
    }

    if mv.is_capture() {
        let victim = if mv.is_en_passant() {
            PIECE_VALUES[P]
        } else {
            PIECE_VALUES[state.piece_at(mv.target()) % 6]
        };
        return 10000 + victim - PIECE_VALUES[mv.piece()] + promo_bonus;
    }

    if ply <= MAX_PLY {
        if let Some(k1) = info.data.killers[ply][0] {
            if mv.matches(k1) {
                return 9000 + promo_bonus;
            }
        }
        if let Some(k2) = info.data.killers[ply][1] {
            if mv.matches(k2) {
                return 8000 + promo_bonus;
            }
        }
    }

    let piece = mv.piece() + 6 * state.side_to_move;
    let mut score = info.data.history[piece][mv.target() as usize];
    if let Some(pm) = prev_move {
        score += info.data.cont_history.get(
            pm.piece(),
            pm.target(),
            mv.piece(),
            mv.target(),
        );
    }
    score.clamp(-info.params.history_clamp, info.params.history_clamp) + promo_bonus
}

fn bump_history(entry: &mut i32, bonus: i32, clamp: i32) {
    *entry = (*entry + bonus).clamp(-clamp, clamp);
}

fn update_quiet_stats(
    info: &mut SearchInfo,
    mv: Move,
    prev_move: Option<Move>,
    state: &GameState,
    depth: u8,
    ply: usize,
    searched_quiets: &[Move],
) {
    let bonus = (depth as i32) * (depth as i32);
    let clamp = info.params.history_clamp;
    let side = state.side_to_move;

    // Killer slots: demote the primary unless the move already holds it
    if info.data.killers[ply][0].map_or(true, |k1| !k1.matches(mv)) {
        info.data.killers[ply][1] = info.data.killers[ply][0];
        info.data.killers[ply][0] = Some(mv);
    }

    let piece = mv.piece() + 6 * side;
    bump_history(&mut info.data.history[piece][mv.target() as usize], bonus, clamp);

    if let Some(pm) = prev_move {
        let prev_piece = pm.piece() + 6 * (1 - side);
        info.data.counter_moves[prev_piece][pm.target() as usize] = Some(mv);
        info.data
            .cont_history
            .update(pm.piece(), pm.target(), mv.piece(), mv.target(), bonus);
    }

    // The quiets searched before the cutoff get the matching penalty
    for &other in searched_quiets {
        if other.matches(mv) {
            continue;
        }
        let other_piece = other.piece() + 6 * side;
        bump_history(
            &mut info.data.history[other_piece][other.target() as usize],
            -bonus,
            clamp,
        );
        if let Some(pm) = prev_move {
            info.data.cont_history.update(
                pm.piece(),
                pm.target(),
                other.piece(),
                other.target(),
                -bonus,
            );
        }
    }
}

// --- QUIESCENCE ---
fn quiescence(state: &GameState, mut alpha: i32, beta: i32, info: &mut SearchInfo, ply: usize) -> i32 {
    if ply > info.seldepth as usize {
        info.seldepth = ply as u8;
    }
    if ply >= MAX_PLY {
        return eval::evaluate(state);
    }

    info.nodes += 1;
    info.check_time();
    if info.stopped {
        return alpha;
    }

    let stand_pat = eval::evaluate(state);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);
    let mut scores = [0; 256];
    for i in 0..generator.list.count {
        scores[i] = score_move(generator.list.moves[i], None, info, ply, state, None);
    }

    for i in 0..generator.list.count {
        let mut best_idx = i;
        for j in (i + 1)..generator.list.count {
            if scores[j] > scores[best_idx] {
                best_idx = j;
            }
        }
        scores.swap(i, best_idx);
        generator.list.moves.swap(i, best_idx);
        let mv = generator.list.moves[i];

        if !mv.is_capture() {
            continue;
        }
        // Losing-capture prune
        if see(state, mv) < info.params.see_prune_margin {
            continue;
        }

        let Some(next_state) = state.make_move(mv) else {
            continue;
        };

        let score = -quiescence(&next_state, -beta, -alpha, info, ply + 1);
        if info.stopped {
            return alpha;
        }

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

// --- NEGAMAX ---
#[allow(clippy::too_many_arguments)]
fn negamax(
    state: &GameState,
    mut depth: u8,
    mut alpha: i32,
    beta: i32,
    info: &mut SearchInfo,
    ply: usize,
    is_pv: bool,
    path: &mut Vec<u64>,
    prev_move: Option<Move>,
    excluded_move: Option<Move>,
) -> i32 {
    if is_pv {
        info.reset_pv(ply);
    }

    if ply > 0 {
        if state.halfmove_clock >= 100 {
            return 0;
        }
        if path.iter().any(|&h| h == state.hash) {
            return 0;
        }

        // Mate distance pruning
        let mate_bound = MATE_VALUE - ply as i32;
        if alpha < -mate_bound {
            alpha = -mate_bound;
        }
        if alpha >= beta {
            return alpha;
        }
    }

    if ply >= MAX_PLY {
        return eval::evaluate(state);
    }

    info.nodes += 1;
    if ply > info.seldepth as usize {
        info.seldepth = ply as u8;
    }
    info.check_time();
    if info.stopped {
        return alpha;
    }

    // TT probe
    let mut tt_move = None;
    let mut tt_score = -INFINITY;
    let mut tt_depth = 0;
    let mut tt_flag = FLAG_ALPHA;
    if let Some((score, d, flag, mv)) = info.tt.probe_data(state.hash) {
        tt_score = score;
        tt_depth = d;
        tt_flag = flag;
        tt_move = mv.filter(|&m| info.tt.is_pseudo_legal(state, m));

        if ply > 0 && !is_pv && excluded_move.is_none() && d >= depth {
            match flag {
                FLAG_EXACT => return score,
                FLAG_ALPHA if score <= alpha => return alpha,
                FLAG_BETA if score >= beta => return beta,
                _ => {}
            }
        }
    }

    let in_check = is_in_check(state);

    // Frontier: check extension, otherwise quiescence
    if depth == 0 {
        if in_check && ply < CHECK_EXT_MAX_PLY {
            depth = 1;
        } else {
            return quiescence(state, alpha, beta, info, ply);
        }
    }

    let static_eval = if in_check { -INFINITY } else { eval::evaluate(state) };

    // Razoring: hopeless static eval at low depth falls through to qsearch
    if !is_pv
        && !in_check
        && excluded_move.is_none()
        && depth <= info.params.razor_depth
        && static_eval + info.params.razor_margin * (depth as i32) < alpha
    {
        let v = quiescence(state, alpha, beta, info, ply);
        if v < alpha {
            return v;
        }
    }

    // Reverse futility / static null move
    if !is_pv
        && !in_check
        && excluded_move.is_none()
        && depth <= info.params.rfp_depth
        && static_eval - info.params.rfp_margin * depth as i32 >= beta
    {
        return static_eval - info.params.rfp_margin * depth as i32;
    }

    // Null move pruning: forfeit the move and search reduced
    if !is_pv
        && !in_check
        && excluded_move.is_none()
        && ply > 0
        && depth >= info.params.nmp_min_depth
        && static_eval >= beta
        && state.has_non_pawn_material(state.side_to_move)
    {
        let reduction = info.params.nmp_base + depth / info.params.nmp_divisor;
        let null_state = state.make_null_move();
        path.push(state.hash);
        let score = -negamax(
            &null_state,
            depth.saturating_sub(1 + reduction),
            -beta,
            -beta + 1,
            info,
            ply + 1,
            false,
            path,
            None,
            None,
        );
        path.pop();
        if info.stopped {
            return alpha;
        }
        if score >= beta {
            return beta;
        }
    }

    // Internal iterative reduction: a PV node without a TT move searches
    // one ply shallower rather than paying for a full-width miss
    if is_pv && tt_move.is_none() && depth >= info.params.iir_min_depth {
        depth -= 1;
    }

    // Singular extension: is the TT move uniquely best?
    let mut singular_extension: u8 = 0;
    if ply > 0
        && depth >= info.params.singular_min_depth
        && !in_check
        && excluded_move.is_none()
        && tt_move.is_some()
        && tt_depth >= depth.saturating_sub(3)
        && tt_flag != FLAG_ALPHA
        && tt_score.abs() < MATE_SCORE
    {
        let singular_beta = tt_score - depth as i32;
        let score = negamax(
            state,
            depth / 2,
            singular_beta - 1,
            singular_beta,
            info,
            ply,
            false,
            path,
            prev_move,
            tt_move,
        );
        if info.stopped {
            return alpha;
        }
        if score < singular_beta {
            singular_extension = 1;
        }
    }

    // Futility precomputation: skip quiets once one legal move exists
    let futility_prune = !is_pv
        && !in_check
        && depth <= info.params.futility_depth
        && static_eval + info.params.futility_margin * (depth as i32) < alpha;

    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);
    let mut scores = [0; 256];
    for i in 0..generator.list.count {
        scores[i] = score_move(generator.list.moves[i], tt_move, info, ply, state, prev_move);
    }

    let original_alpha = alpha;
    let mut best_score = -INFINITY;
    let mut best_move = None;
    let mut legal_moves: usize = 0;
    let mut searched_quiets: Vec<Move> = Vec::new();

    path.push(state.hash);

    for i in 0..generator.list.count {
        let mut best_idx = i;
        for j in (i + 1)..generator.list.count {
            if scores[j] > scores[best_idx] {
                best_idx = j;
            }
        }
        scores.swap(i, best_idx);
        generator.list.moves.swap(i, best_idx);
        let mv = generator.list.moves[i];

        if let Some(excl) = excluded_move {
            if mv.matches(excl) {
                continue;
            }
        }
        if ply == 0 && info.root_exclusions.iter().any(|m| m.matches(mv)) {
            continue;
        }

        let is_quiet = !mv.is_capture() && mv.promotion().is_none();

        if futility_prune && legal_moves >= 1 && is_quiet {
            continue;
        }

        let Some(next_state) = state.make_move(mv) else {
            continue;
        };
        legal_moves += 1;

        let is_tt_move = tt_move.map_or(false, |tm| mv.matches(tm));
        let extension = if is_tt_move { singular_extension } else { 0 };

        let mut score;
        if legal_moves == 1 {
            score = -negamax(
                &next_state,
                depth - 1 + extension,
                -beta,
                -alpha,
                info,
                ply + 1,
                is_pv,
                path,
                Some(mv),
                None,
            );
        } else {
            // Late move reduction for quiet non-promotions
            let reduction = if is_quiet {
                info.params.lmr_reduction(depth, legal_moves)
            } else {
                0
            };

            score = -negamax(
                &next_state,
                depth.saturating_sub(1 + reduction),
                -alpha - 1,
                -alpha,
                info,
                ply + 1,
                false,
                path,
                Some(mv),
                None,
            );

            // Reduced null-window search beat alpha: retry at full depth
            if score > alpha && reduction > 0 && !info.stopped {
                score = -negamax(
                    &next_state,
                    depth - 1,
                    -alpha - 1,
                    -alpha,
                    info,
                    ply + 1,
                    false,
                    path,
                    Some(mv),
                    None,
                );
            }
            // PVS re-search with the full window
            if score > alpha && score < beta && !info.stopped {
                score = -negamax(
                    &next_state,
                    depth - 1 + extension,
                    -beta,
                    -alpha,
                    info,
                    ply + 1,
                    true,
                    path,
                    Some(mv),
                    None,
                );
            }
        }

        if info.stopped {
            path.pop();
            return alpha;
        }

        if is_quiet && searched_quiets.len() < 64 {
            searched_quiets.push(mv);
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            if score > alpha {
                alpha = score;
                // A fail-high child never re-searched as PV; its line is stale
                if is_pv && score < beta {
                    info.update_pv(ply, mv);
                }
            }
        }

        if alpha >= beta {
            if is_quiet && ply < MAX_PLY {
                update_quiet_stats(info, mv, prev_move, state, depth, ply, &searched_quiets);
            }
            break;
        }
    }

    path.pop();

    // Terminal nodes: mate prefers the shorter distance via the ply offset
    if legal_moves == 0 {
        if excluded_move.is_some() {
            // Everything was excluded; report a fail-low instead of mate
            return alpha;
        }
        if in_check {
            return -MATE_VALUE + ply as i32;
        }
        return 0;
    }

    if !info.stopped && excluded_move.is_none() {
        let flag = if best_score <= original_alpha {
            FLAG_ALPHA
        } else if best_score >= beta {
            FLAG_BETA
        } else {
            FLAG_EXACT
        };
        info.tt.store(state.hash, best_score, best_move, depth, flag);
    }

    best_score
}

// --- ROOT DRIVER ---
pub struct SearchReport {
    pub score: i32,
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
}

#[allow(clippy::too_many_arguments)]
pub fn search(
    state: &GameState,
    limits: Limits,
    tt: &TranspositionTable,
    stop_signal: Arc<AtomicBool>,
    main_thread: bool,
    game_history: &[u64],
    data: &mut SearchData,
    params: &SearchParameters,
    multipv: usize,
) -> SearchReport {
    let max_depth = match limits {
        Limits::FixedDepth(d) => d.clamp(1, MAX_PLY as u8 - 1),
        _ => MAX_PLY as u8 - 1,
    };

    data.new_search();

    let start_time = std::time::Instant::now();
    let mut info = SearchInfo::new(data, limits, stop_signal, tt, main_thread, params);

    let legal_root_moves = collect_legal_moves(state);
    if legal_root_moves.is_empty() {
        if main_thread {
            println!("bestmove (none)");
        }
        let score = if is_in_check(state) { -MATE_VALUE } else { 0 };
        return SearchReport {
            score,
            best_move: None,
            ponder_move: None,
        };
    }
    let multipv = multipv.clamp(1, legal_root_moves.len());

    let mut best_move = legal_root_moves[0];
    let mut ponder_move = None;
    let mut last_score = 0;
    let mut prev_scores = vec![0i32; multipv];

    'deepening: for depth in 1..=max_depth {
        info.root_exclusions.clear();

        for pv_index in 0..multipv {
            info.seldepth = 0;

            // Aspiration window around the previous score for this line
            let mut alpha = -INFINITY;
            let mut beta = INFINITY;
            if depth >= params.aspiration_min_depth {
                alpha = prev_scores[pv_index] - params.aspiration_window;
                beta = prev_scores[pv_index] + params.aspiration_window;
            }

            let mut path = game_history.to_vec();
            // The current position's own hash sits last in the game history;
            // the repetition scan must not see it twice
            path.pop();

            let mut score;
            loop {
                score = negamax(state, depth, alpha, beta, &mut info, 0, true, &mut path, None, None);
                if info.stopped {
                    break;
                }
                if score <= alpha {
                    alpha = -INFINITY;
                } else if score >= beta {
                    beta = INFINITY;
                } else {
                    break;
                }
            }

            if info.stopped {
                break 'deepening;
            }

            prev_scores[pv_index] = score;
            let line = info.pv_line();

            if pv_index == 0 {
                last_score = score;
                if let Some(&first) = line.first() {
                    best_move = first;
                    ponder_move = line.get(1).copied();
                }
            }
            if let Some(&first) = line.first() {
                info.root_exclusions.push(first);
            }

            if main_thread {
                print_info_line(
                    depth,
                    info.seldepth,
                    pv_index,
                    multipv,
                    score,
                    info.nodes,
                    info.tt.hashfull(),
                    &start_time,
                    &line,
                );
            }
        }

        // Between iterations: explicit stop or the soft deadline
        if info.stop_signal.load(Ordering::Relaxed) {
            break;
        }
        if let Limits::FixedTime(ref tm) = info.limits {
            if main_thread && tm.check_soft_limit() {
                info.stop_signal.store(true, Ordering::Relaxed);
                break;
            }
        }
    }

    if main_thread {
        print!("bestmove {}", format_move_uci(best_move));
        if let Some(pm) = ponder_move {
            print!(" ponder {}", format_move_uci(pm));
        }
        println!();
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    SearchReport {
        score: last_score,
        best_move: Some(best_move),
        ponder_move,
    }
}

#[allow(clippy::too_many_arguments)]
fn print_info_line(
    depth: u8,
    seldepth: u8,
    pv_index: usize,
    multipv: usize,
    score: i32,
    nodes: u64,
    hashfull: usize,
    start_time: &std::time::Instant,
    line: &[Move],
) {
    let elapsed = start_time.elapsed();
    let millis = elapsed.as_millis().max(1);
    let nps = nodes as u128 * 1000 / millis;

    let score_str = if score > MATE_SCORE {
        format!("mate {}", (MATE_VALUE - score + 1) / 2)
    } else if score < -MATE_SCORE {
        format!("mate -{}", (MATE_VALUE + score + 1) / 2)
    } else {
        format!("cp {}", score)
    };

    let multipv_str = if multipv > 1 {
        format!(" multipv {}", pv_index + 1)
    } else {
        String::new()
    };

    let pv_str = line
        .iter()
        .map(|&m| format_move_uci(m))
        .collect::<Vec<_>>()
        .join(" ");

    println!(
        "info depth {}{} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        depth, multipv_str, seldepth, score_str, nodes, nps, hashfull, millis, pv_str
    );
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// Lazy SMP: helper threads run the same search silently on board copies,
/// sharing only the TT and the stop flag. Odd helpers search one ply
/// shallower for diversity.
#[allow(clippy::too_many_arguments)]
pub fn run_search_threads(
    state: GameState,
    limits: Limits,
    tt: Arc<TranspositionTable>,
    stop_signal: Arc<AtomicBool>,
    threads: usize,
    multipv: usize,
    params: SearchParameters,
    game_history: Vec<u64>,
) -> SearchReport {
    let threads = threads.max(1);
    let mut helpers = Vec::with_capacity(threads - 1);

    for helper_id in 1..threads {
        let helper_state = state;
        let helper_tt = Arc::clone(&tt);
        let helper_stop = Arc::clone(&stop_signal);
        let helper_params = params.clone();
        let helper_history = game_history.clone();
        let helper_limits = match limits {
            Limits::FixedDepth(d) if helper_id % 2 == 1 => {
                Limits::FixedDepth(d.saturating_sub(1).max(1))
            }
            other => other,
        };

        let handle = thread::Builder::new()
            .name(format!("search-{helper_id}"))
            .stack_size(32 * 1024 * 1024)
            .spawn(move || {
                let mut helper_data = SearchData::new();
                search(
                    &helper_state,
                    helper_limits,
                    &helper_tt,
                    helper_stop,
                    false,
                    &helper_history,
                    &mut helper_data,
                    &helper_params,
                    1,
                );
            })
            .expect("failed to spawn search helper");
        helpers.push(handle);
    }

    let mut main_data = SearchData::new();
    let report = search(
        &state,
        limits,
        &tt,
        Arc::clone(&stop_signal),
        true,
        &game_history,
        &mut main_data,
        &params,
        multipv,
    );

    // Helpers must be drained before the result is considered final
    stop_signal.store(true, Ordering::Relaxed);
    for handle in helpers {
        let _ = handle.join();
    }

    report
}

// --- HELPERS ---
pub fn collect_legal_moves(state: &GameState) -> Vec<Move> {
    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);
    (0..generator.list.count)
        .map(|i| generator.list.moves[i])
        .filter(|&mv| state.make_move(mv).is_some())
        .collect()
}

pub fn is_check(state: &GameState, side: usize) -> bool {
    let king_sq = state.king_square(side);
    movegen::is_square_attacked(state, king_sq, 1 - side)
}

pub fn is_in_check(state: &GameState) -> bool {
    is_check(state, state.side_to_move)
}

pub fn square_to_coord(s: u8) -> String {
    let file = (b'a' + (s % 8)) as char;
    let rank = (b'1' + (s / 8)) as char;
    format!("{}{}", file, rank)
}

pub fn format_move_uci(mv: Move) -> String {
    let mut s = format!(
        "{}{}",
        square_to_coord(mv.source()),
        square_to_coord(mv.target())
    );
    if let Some(promo) = mv.promotion() {
        let c = match promo {
            Q => 'q',
            R => 'r',
            B => 'b',
            N => 'n',
            _ => '?',
        };
        s.push(c);
    }
    s
}
