// src/zobrist.rs
use std::sync::OnceLock;

// Safe globals
pub static PIECE_KEYS: OnceLock<[[u64; 64]; 12]> = OnceLock::new();
pub static CASTLING_KEYS: OnceLock<[u64; 16]> = OnceLock::new();
pub static EN_PASSANT_KEYS: OnceLock<[u64; 64]> = OnceLock::new();
pub static SIDE_KEY: OnceLock<u64> = OnceLock::new();

// Simple PRNG struct local to this module
struct Prng {
    state: u64,
}

impl Prng {
    fn new(seed: u64) -> Self {
        Prng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

pub fn init_zobrist() {
    if PIECE_KEYS.get().is_some() {
        return;
    }

    let mut rng = Prng::new(0x1070_372E_51AB_1E0D);

    let mut p_keys = [[0; 64]; 12];
    for piece in 0..12 {
        for square in 0..64 {
            p_keys[piece][square] = rng.next_u64();
        }
    }
    let _ = PIECE_KEYS.set(p_keys);

    let mut c_keys = [0; 16];
    for key in c_keys.iter_mut() {
        *key = rng.next_u64();
    }
    let _ = CASTLING_KEYS.set(c_keys);

    let mut ep_keys = [0; 64];
    for key in ep_keys.iter_mut() {
        *key = rng.next_u64();
    }
    let _ = EN_PASSANT_KEYS.set(ep_keys);

    let _ = SIDE_KEY.set(rng.next_u64());
}

// Accessors
#[inline(always)]
pub fn piece_key(piece: usize, sq: usize) -> u64 {
    PIECE_KEYS.get().expect("Zobrist not init")[piece][sq]
}

#[inline(always)]
pub fn castling_key(rights: u8) -> u64 {
    CASTLING_KEYS.get().expect("Zobrist not init")[rights as usize]
}

#[inline(always)]
pub fn en_passant_key(sq: u8) -> u64 {
    EN_PASSANT_KEYS.get().expect("Zobrist not init")[sq as usize]
}

#[inline(always)]
pub fn side_key() -> u64 {
    *SIDE_KEY.get().expect("Zobrist not init")
}
