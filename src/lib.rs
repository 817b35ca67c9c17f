pub mod bitboard;
pub mod eval;
pub mod history;
pub mod logging;
pub mod movegen;
pub mod nnue;
pub mod parameters;
pub mod perft;
pub mod search;
pub mod state;
#[cfg(test)]
mod tests;
pub mod time;
pub mod tt;
pub mod uci;
pub mod zobrist;

use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

pub fn run_cli() {
    logging::init_logging();

    // 1. Initialize Global Tables
    zobrist::init_zobrist();
    bitboard::init_magic_tables();
    movegen::init_move_tables();
    eval::init_eval();

    // 2. Check for arguments (CLI Mode)
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 {
        if args[1] == "perft" {
            perft::run_perft_suite();
            return;
        }

        if args[1] == "bench" {
            let depth = args
                .get(2)
                .and_then(|d| d.parse().ok())
                .unwrap_or(12u8);
            let state = state::GameState::startpos();
            let tt = Arc::new(tt::TranspositionTable::new(16));
            let stop = Arc::new(AtomicBool::new(false));
            let mut data = search::SearchData::new();
            let params = parameters::SearchParameters::default();

            println!("Running Benchmark: Startpos Depth {}", depth);
            search::search(
                &state,
                search::Limits::FixedDepth(depth),
                &tt,
                stop,
                true,
                &[state.hash],
                &mut data,
                &params,
                1,
            );
            return;
        }
    }

    // 3. Normal Mode: Launch UCI
    let builder = thread::Builder::new()
        .name("uci_thread".into())
        .stack_size(32 * 1024 * 1024);

    let handler = builder
        .spawn(|| {
            uci::uci_loop();
        })
        .expect("failed to spawn uci thread");

    handler.join().expect("uci thread panicked");
}
