use crate::movegen::MoveGenerator;
use crate::nnue;
use crate::parameters::SearchParameters;
use crate::search::{self, Limits};
use crate::state::{GameState, Move};
use crate::time::{self, TimeControl, TimeManager};
use crate::tt::TranspositionTable;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub const ENGINE_NAME: &str = "Quartz";
pub const ENGINE_AUTHOR: &str = "the Quartz authors";
pub const DEFAULT_EVAL_FILE: &str = "nn-c0ae49f08b40.nnue";

pub struct EngineOptions {
    pub hash_mb: usize,
    pub eval_file: String,
    pub move_overhead_ms: u64,
    pub multipv: usize,
    pub ponder: bool,
    pub threads: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash_mb: 64,
            eval_file: DEFAULT_EVAL_FILE.to_string(),
            move_overhead_ms: 10,
            multipv: 1,
            ponder: false,
            threads: 1,
        }
    }
}

pub fn uci_loop() {
    let stdin = io::stdin();
    let mut buffer = String::new();

    let mut options = EngineOptions::default();
    let mut tt = Arc::new(TranspositionTable::new(options.hash_mb));
    let mut params = SearchParameters::default();
    let mut game_state = GameState::startpos();
    let mut game_history = vec![game_state.hash];

    let stop_signal = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<()>> = None;

    nnue::init_nnue(&options.eval_file);
    game_state.refresh_accumulators();

    loop {
        buffer.clear();
        match stdin.lock().read_line(&mut buffer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let cmd = buffer.trim();
        if cmd.is_empty() {
            continue;
        }

        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts[0] {
            "uci" => {
                println!("id name {}", ENGINE_NAME);
                println!("id author {}", ENGINE_AUTHOR);
                println!("option name Hash type spin default 64 min 1 max 1024");
                println!(
                    "option name EvalFile type string default {}",
                    DEFAULT_EVAL_FILE
                );
                println!("option name Move Overhead type spin default 10 min 0 max 5000");
                println!("option name MultiPV type spin default 1 min 1 max 500");
                println!("option name Ponder type check default false");
                println!("option name Threads type spin default 1 min 1 max 512");
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                stop_search(&stop_signal, &mut search_thread);
                game_state = GameState::startpos();
                game_history = vec![game_state.hash];
                tt.clear();
            }
            "position" => {
                stop_search(&stop_signal, &mut search_thread);
                if let Some((state, history)) = handle_position(&parts) {
                    game_state = state;
                    game_history = history;
                }
            }
            "go" => {
                stop_search(&stop_signal, &mut search_thread);
                stop_signal.store(false, Ordering::Relaxed);

                let (limits, ponder) = parse_go(&game_state, &options, &parts);
                time::set_pondering(ponder && options.ponder);

                let state_clone = game_state;
                let tt_clone = Arc::clone(&tt);
                let stop_clone = Arc::clone(&stop_signal);
                let params_clone = params.clone();
                let history_clone = game_history.clone();
                let threads = options.threads;
                let multipv = options.multipv;

                search_thread = Some(
                    thread::Builder::new()
                        .name("search-master".into())
                        .stack_size(32 * 1024 * 1024)
                        .spawn(move || {
                            search::run_search_threads(
                                state_clone,
                                limits,
                                tt_clone,
                                stop_clone,
                                threads,
                                multipv,
                                params_clone,
                                history_clone,
                            );
                        })
                        .expect("failed to spawn search thread"),
                );
            }
            "ponderhit" => {
                // Deadlines resume against the already-running search
                time::set_pondering(false);
            }
            "stop" => {
                stop_search(&stop_signal, &mut search_thread);
            }
            "setoption" => {
                handle_setoption(
                    &parts,
                    &mut options,
                    &mut tt,
                    &mut params,
                    &mut game_state,
                );
            }
            "quit" => {
                stop_search(&stop_signal, &mut search_thread);
                break;
            }
            _ => {
                log::info!("ignoring unknown command: {}", cmd);
            }
        }

        let _ = io::stdout().flush();
    }
}

fn stop_search(stop_signal: &Arc<AtomicBool>, search_thread: &mut Option<thread::JoinHandle<()>>) {
    stop_signal.store(true, Ordering::Relaxed);
    time::set_pondering(false);
    if let Some(handle) = search_thread.take() {
        let _ = handle.join();
    }
}

fn handle_position(parts: &[&str]) -> Option<(GameState, Vec<u64>)> {
    if parts.len() < 2 {
        return None;
    }

    let mut move_index = None;
    let mut state = if parts[1] == "startpos" {
        if parts.len() > 2 && parts[2] == "moves" {
            move_index = Some(3);
        }
        GameState::startpos()
    } else if parts[1] == "fen" {
        let mut fen = String::new();
        let mut i = 2;
        while i < parts.len() && parts[i] != "moves" {
            fen.push_str(parts[i]);
            fen.push(' ');
            i += 1;
        }
        if i < parts.len() && parts[i] == "moves" {
            move_index = Some(i + 1);
        }
        match GameState::parse_fen(fen.trim()) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("position rejected: {}", e);
                return None;
            }
        }
    } else {
        return None;
    };

    let mut history = vec![state.hash];
    if let Some(start) = move_index {
        for move_str in &parts[start..] {
            // Malformed or illegal move strings are dropped silently
            let Some(mv) = parse_move(&state, move_str) else {
                log::warn!("dropping unparseable move '{}'", move_str);
                break;
            };
            let Some(next) = state.make_move(mv) else {
                log::warn!("dropping illegal move '{}'", move_str);
                break;
            };
            state = next;
            history.push(state.hash);
        }
    }

    Some((state, history))
}

/// Resolves a long-algebraic move string against the generated move list.
pub fn parse_move(state: &GameState, move_str: &str) -> Option<Move> {
    let bytes = move_str.as_bytes();
    if bytes.len() < 4 || bytes.len() > 5 {
        return None;
    }
    if !(b'a'..=b'h').contains(&bytes[0])
        || !(b'1'..=b'8').contains(&bytes[1])
        || !(b'a'..=b'h').contains(&bytes[2])
        || !(b'1'..=b'8').contains(&bytes[3])
    {
        return None;
    }

    let src = (bytes[1] - b'1') * 8 + (bytes[0] - b'a');
    let tgt = (bytes[3] - b'1') * 8 + (bytes[2] - b'a');
    let promo = if bytes.len() == 5 {
        match bytes[4] {
            b'q' => Some(crate::state::Q),
            b'r' => Some(crate::state::R),
            b'b' => Some(crate::state::B),
            b'n' => Some(crate::state::N),
            _ => return None,
        }
    } else {
        None
    };

    let mut generator = MoveGenerator::new();
    generator.generate_moves(state);
    (0..generator.list.count)
        .map(|i| generator.list.moves[i])
        .find(|mv| mv.source() == src && mv.target() == tgt && mv.promotion() == promo)
}

fn parse_go(state: &GameState, options: &EngineOptions, parts: &[&str]) -> (Limits, bool) {
    let mut depth: Option<u8> = None;
    let mut nodes: Option<u64> = None;
    let mut movetime: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: Option<u64> = None;
    let mut binc: Option<u64> = None;
    let mut movestogo: Option<u32> = None;
    let mut infinite = false;
    let mut ponder = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                depth = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "nodes" => {
                nodes = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "movetime" => {
                movetime = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "wtime" => {
                wtime = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "btime" => {
                btime = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "winc" => {
                winc = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "binc" => {
                binc = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "movestogo" => {
                movestogo = parts.get(i + 1).and_then(|v| v.parse().ok());
                i += 1;
            }
            "infinite" => infinite = true,
            "ponder" => ponder = true,
            _ => {}
        }
        i += 1;
    }

    let limits = if infinite {
        Limits::Infinite
    } else if let Some(d) = depth {
        Limits::FixedDepth(d)
    } else if let Some(n) = nodes {
        Limits::FixedNodes(n)
    } else if let Some(mt) = movetime {
        Limits::FixedTime(TimeManager::new(
            TimeControl::MoveTime(mt),
            state.side_to_move,
            options.move_overhead_ms,
        ))
    } else if wtime.is_some() || btime.is_some() {
        Limits::FixedTime(TimeManager::new(
            TimeControl::GameTime {
                wtime: wtime.unwrap_or(0),
                btime: btime.unwrap_or(0),
                winc: winc.unwrap_or(0),
                binc: binc.unwrap_or(0),
                movestogo,
            },
            state.side_to_move,
            options.move_overhead_ms,
        ))
    } else {
        Limits::Infinite
    };

    (limits, ponder)
}

fn handle_setoption(
    parts: &[&str],
    options: &mut EngineOptions,
    tt: &mut Arc<TranspositionTable>,
    _params: &mut SearchParameters,
    game_state: &mut GameState,
) {
    // setoption name <possibly multi-word name> value <rest>
    let name_start = match parts.iter().position(|&t| t == "name") {
        Some(idx) => idx + 1,
        None => return,
    };
    let value_pos = parts.iter().position(|&t| t == "value");
    let name_end = value_pos.unwrap_or(parts.len());
    let name = parts[name_start..name_end].join(" ");
    let value = value_pos
        .map(|idx| parts[idx + 1..].join(" "))
        .unwrap_or_default();

    match name.as_str() {
        "Hash" => {
            if let Ok(mb) = value.parse::<usize>() {
                let mb = mb.clamp(1, 1024);
                options.hash_mb = mb;
                *tt = Arc::new(TranspositionTable::new(mb));
            }
        }
        "EvalFile" => {
            options.eval_file = value.clone();
            nnue::init_nnue(&value);
            game_state.refresh_accumulators();
        }
        "Move Overhead" => {
            if let Ok(ms) = value.parse::<u64>() {
                options.move_overhead_ms = ms.min(5000);
            }
        }
        "MultiPV" => {
            if let Ok(count) = value.parse::<usize>() {
                options.multipv = count.clamp(1, 500);
            }
        }
        "Ponder" => {
            options.ponder = value.eq_ignore_ascii_case("true");
        }
        "Threads" => {
            if let Ok(count) = value.parse::<usize>() {
                options.threads = count.clamp(1, 512);
            }
        }
        other => {
            log::info!("ignoring unknown option '{}'", other);
        }
    }
}
