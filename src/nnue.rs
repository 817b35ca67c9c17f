// src/nnue.rs
use std::env;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::RwLock;

use crate::state::{GameState, BLACK, K, NO_PIECE, WHITE};

// Architecture Constants. The loader validates the file against these and
// refuses anything else; evaluation then falls back to HCE.
pub const HIDDEN: usize = 256;
/// Oriented piece-color planes per king square: own P/N/B/R/Q then enemy
/// P/N/B/R/Q/K. The perspective's own king is the bucket, not a feature.
pub const PLANES: usize = 11;
pub const STRIDE: usize = PLANES * 64;
pub const NUM_FEATURES: usize = 64 * STRIDE;
pub const L2: usize = 32;

pub const QA: i32 = 127;
pub const WEIGHT_SCALE: i32 = 64;
pub const EVAL_SCALE: i32 = 16;

pub const NNUE_VERSION: u32 = 0x51A0_0100;

const LEB128_MAGIC: &[u8; 17] = b"COMPRESSED_LEB128";

// GLOBAL
pub static NNUE: RwLock<Option<Network>> = RwLock::new(None);

#[derive(Clone, Copy, Debug)]
pub struct Accumulator {
    pub v: [i16; HIDDEN],
}

impl Default for Accumulator {
    fn default() -> Self {
        Accumulator { v: [0; HIDDEN] }
    }
}

impl Accumulator {
    fn add_feature(&mut self, idx: usize, net: &Network) {
        let column = &net.feature_weights[idx * HIDDEN..(idx + 1) * HIDDEN];
        for (acc, w) in self.v.iter_mut().zip(column) {
            *acc = acc.wrapping_add(*w);
        }
    }

    fn sub_feature(&mut self, idx: usize, net: &Network) {
        let column = &net.feature_weights[idx * HIDDEN..(idx + 1) * HIDDEN];
        for (acc, w) in self.v.iter_mut().zip(column) {
            *acc = acc.wrapping_sub(*w);
        }
    }
}

pub struct Network {
    pub feature_biases: Vec<i16>,  // [HIDDEN]
    pub feature_weights: Vec<i16>, // [NUM_FEATURES * HIDDEN], column per feature
    pub l1_biases: Vec<i32>,       // [L2]
    pub l1_weights: Vec<i8>,       // [L2 * 2 * HIDDEN]
    pub l2_biases: Vec<i32>,       // [L2]
    pub l2_weights: Vec<i8>,       // [L2 * L2]
    pub out_bias: i32,
    pub out_weights: Vec<i8>, // [L2]
}

/// HalfKA feature index for one perspective. Returns None for the
/// perspective's own king, which is the bucket key rather than a feature.
#[inline(always)]
pub fn feature_index(perspective: usize, king_sq: u8, piece: usize, sq: u8) -> Option<usize> {
    let flip = if perspective == WHITE { 0 } else { 56 };
    let oriented_sq = (sq ^ flip) as usize;
    let oriented_king = (king_sq ^ flip) as usize;

    let piece_color = if piece < 6 { WHITE } else { BLACK };
    let piece_type = piece % 6;

    let plane = if piece_color == perspective {
        if piece_type == K {
            return None;
        }
        piece_type
    } else {
        5 + piece_type
    };

    Some(oriented_king * STRIDE + plane * 64 + oriented_sq)
}

pub fn is_initialized() -> bool {
    NNUE.read().map(|g| g.is_some()).unwrap_or(false)
}

pub fn install_network(net: Option<Network>) {
    if let Ok(mut guard) = NNUE.write() {
        *guard = net;
    }
}

/// Rebuilds one perspective from scratch: bias vector plus the weight
/// column of every active feature.
pub fn refresh_perspective(state: &GameState, perspective: usize, net: &Network) -> Accumulator {
    let mut acc = Accumulator::default();
    acc.v.copy_from_slice(&net.feature_biases);

    let king_sq = state.king_square(perspective);
    for piece in 0..12 {
        let mut bb = state.bitboards[piece];
        while !bb.is_empty() {
            let sq = bb.pop_lsb();
            if let Some(idx) = feature_index(perspective, king_sq, piece, sq) {
                acc.add_feature(idx, net);
            }
        }
    }
    acc
}

pub fn refresh_both(state: &mut GameState) {
    if let Ok(guard) = NNUE.read() {
        if let Some(net) = guard.as_ref() {
            let white = refresh_perspective(state, WHITE, net);
            let black = refresh_perspective(state, BLACK, net);
            state.accumulators[WHITE] = white;
            state.accumulators[BLACK] = black;
        }
    }
}

/// Incrementally tracks a made move on both accumulators of the post-move
/// state `ns`. The perspective whose king moved is rebuilt from scratch
/// (its bucket changed); the other is patched with feature deltas.
#[allow(clippy::too_many_arguments)]
pub fn apply_move(
    ns: &mut GameState,
    piece: usize,
    final_piece: usize,
    src: u8,
    tgt: u8,
    captured: usize,
    captured_sq: u8,
    rook_move: Option<(usize, u8, u8)>,
) {
    let guard = match NNUE.read() {
        Ok(g) => g,
        Err(_) => return,
    };
    let Some(net) = guard.as_ref() else {
        return;
    };

    let king_moved = piece % 6 == K;
    let mover = piece / 6;

    for perspective in [WHITE, BLACK] {
        if king_moved && perspective == mover {
            let fresh = refresh_perspective(ns, perspective, net);
            ns.accumulators[perspective] = fresh;
            continue;
        }

        let king_sq = ns.king_square(perspective);
        let mut acc = ns.accumulators[perspective];

        if let Some(idx) = feature_index(perspective, king_sq, piece, src) {
            acc.sub_feature(idx, net);
        }
        if let Some(idx) = feature_index(perspective, king_sq, final_piece, tgt) {
            acc.add_feature(idx, net);
        }
        if captured != NO_PIECE {
            if let Some(idx) = feature_index(perspective, king_sq, captured, captured_sq) {
                acc.sub_feature(idx, net);
            }
        }
        if let Some((rook_piece, rook_from, rook_to)) = rook_move {
            if let Some(idx) = feature_index(perspective, king_sq, rook_piece, rook_from) {
                acc.sub_feature(idx, net);
            }
            if let Some(idx) = feature_index(perspective, king_sq, rook_piece, rook_to) {
                acc.add_feature(idx, net);
            }
        }

        ns.accumulators[perspective] = acc;
    }
}

// --- FORWARD PASS ---

#[inline(always)]
fn clipped(x: i32) -> i32 {
    x.clamp(0, QA)
}

pub fn forward(acc_us: &Accumulator, acc_them: &Accumulator, net: &Network) -> i32 {
    // Layer 1: 2*HIDDEN clipped inputs -> L2
    let mut l1_out = [0i32; L2];
    for (o, out) in l1_out.iter_mut().enumerate() {
        let row = &net.l1_weights[o * 2 * HIDDEN..(o + 1) * 2 * HIDDEN];
        let mut sum = net.l1_biases[o];
        for i in 0..HIDDEN {
            sum += clipped(acc_us.v[i] as i32) * row[i] as i32;
        }
        for i in 0..HIDDEN {
            sum += clipped(acc_them.v[i] as i32) * row[HIDDEN + i] as i32;
        }
        *out = clipped(sum / WEIGHT_SCALE);
    }

    // Layer 2: L2 -> L2
    let mut l2_out = [0i32; L2];
    for (o, out) in l2_out.iter_mut().enumerate() {
        let row = &net.l2_weights[o * L2..(o + 1) * L2];
        let mut sum = net.l2_biases[o];
        for (i, &w) in row.iter().enumerate() {
            sum += l1_out[i] * w as i32;
        }
        *out = clipped(sum / WEIGHT_SCALE);
    }

    // Output neuron
    let mut sum = net.out_bias;
    for (i, &w) in net.out_weights.iter().enumerate() {
        sum += l2_out[i] * w as i32;
    }
    sum / EVAL_SCALE
}

/// Centipawns from the side to move, or None when no network is loaded.
pub fn evaluate_state(state: &GameState) -> Option<i32> {
    let guard = NNUE.read().ok()?;
    let net = guard.as_ref()?;
    let us = state.side_to_move;
    Some(forward(
        &state.accumulators[us],
        &state.accumulators[1 - us],
        net,
    ))
}

// --- LOADER ---

pub fn init_nnue(filename: &str) {
    let path = resolve_path(filename);

    match load_network(&path) {
        Ok(net) => {
            install_network(Some(net));
            log::info!("NNUE loaded from {:?} ({}x2->{}->{}->1)", path, HIDDEN, L2, L2);
        }
        Err(e) => {
            install_network(None);
            log::warn!("NNUE load failed ({:?}): {}. Falling back to HCE.", path, e);
        }
    }
}

fn resolve_path(filename: &str) -> PathBuf {
    let path = PathBuf::from(filename);
    if path.exists() {
        return path;
    }
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let alt_path = exe_dir.join(filename);
            if alt_path.exists() {
                return alt_path;
            }
        }
    }
    path
}

fn bad_data(msg: String) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> io::Result<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            return Err(bad_data(format!(
                "unexpected end of file at offset {} (wanted {} bytes)",
                self.pos, len
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    #[allow(dead_code)]
    fn read_uleb128(&mut self) -> io::Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.take(1)?[0];
            if shift >= 64 {
                return Err(bad_data("unsigned LEB128 overflows 64 bits".into()));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    fn read_sleb128(&mut self) -> io::Result<i64> {
        let mut result: i64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.take(1)?[0];
            if shift >= 64 {
                return Err(bad_data("signed LEB128 overflows 64 bits".into()));
            }
            result |= i64::from(byte & 0x7F) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                // Explicit sign extension for the signed form
                if shift < 64 && byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ElementType {
    I8,
    I16,
}

impl ElementType {
    fn name(self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
        }
    }

    fn size(self) -> usize {
        match self {
            ElementType::I8 => 1,
            ElementType::I16 => 2,
        }
    }
}

enum Encoding {
    Leb128,
    Native(ElementType),
}

/// Reads a layer block marker: either the literal `COMPRESSED_LEB128` or a
/// length-prefixed ASCII element-type name.
fn read_marker(reader: &mut Reader) -> io::Result<Encoding> {
    let head = reader.take(4)?;
    if head == &LEB128_MAGIC[..4] {
        let tail = reader.take(LEB128_MAGIC.len() - 4)?;
        if tail != &LEB128_MAGIC[4..] {
            return Err(bad_data("corrupt COMPRESSED_LEB128 marker".into()));
        }
        return Ok(Encoding::Leb128);
    }

    let len = u32::from_le_bytes(head.try_into().unwrap()) as usize;
    if len == 0 || len > 16 {
        return Err(bad_data(format!("implausible type-name length {}", len)));
    }
    let name = reader.take(len)?;
    match name {
        b"i8" => Ok(Encoding::Native(ElementType::I8)),
        b"i16" => Ok(Encoding::Native(ElementType::I16)),
        other => Err(bad_data(format!(
            "unknown layer type marker {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// One layer block: 4-byte layer hash, marker, then biases followed by
/// weights. Bias elements are i32 for dense layers and the weight element
/// type for the feature transformer.
struct LayerSpec {
    bias_count: usize,
    bias_is_i32: bool,
    weight_count: usize,
    weight_type: ElementType,
}

fn read_layer(
    reader: &mut Reader,
    spec: &LayerSpec,
) -> io::Result<(Vec<i64>, Vec<i64>)> {
    let _layer_hash = reader.read_u32()?;
    let encoding = read_marker(reader)?;

    let mut biases = Vec::with_capacity(spec.bias_count);
    let mut weights = Vec::with_capacity(spec.weight_count);

    match encoding {
        Encoding::Leb128 => {
            for _ in 0..spec.bias_count {
                biases.push(reader.read_sleb128()?);
            }
            for _ in 0..spec.weight_count {
                weights.push(reader.read_sleb128()?);
            }
        }
        Encoding::Native(ty) => {
            if ty != spec.weight_type {
                return Err(bad_data(format!(
                    "layer declares {} weights, architecture expects {}",
                    ty.name(),
                    spec.weight_type.name()
                )));
            }
            for _ in 0..spec.bias_count {
                let v = if spec.bias_is_i32 {
                    i32::from_le_bytes(reader.take(4)?.try_into().unwrap()) as i64
                } else {
                    read_native_element(reader, ty)?
                };
                biases.push(v);
            }
            for _ in 0..spec.weight_count {
                weights.push(read_native_element(reader, ty)?);
            }
        }
    }

    Ok((biases, weights))
}

fn read_native_element(reader: &mut Reader, ty: ElementType) -> io::Result<i64> {
    let bytes = reader.take(ty.size())?;
    Ok(match ty {
        ElementType::I8 => bytes[0] as i8 as i64,
        ElementType::I16 => i16::from_le_bytes(bytes.try_into().unwrap()) as i64,
    })
}

fn narrow_i16(values: Vec<i64>, what: &str) -> io::Result<Vec<i16>> {
    values
        .into_iter()
        .map(|v| {
            i16::try_from(v).map_err(|_| bad_data(format!("{} element {} exceeds i16", what, v)))
        })
        .collect()
}

fn narrow_i8(values: Vec<i64>, what: &str) -> io::Result<Vec<i8>> {
    values
        .into_iter()
        .map(|v| {
            i8::try_from(v).map_err(|_| bad_data(format!("{} element {} exceeds i8", what, v)))
        })
        .collect()
}

fn narrow_i32(values: Vec<i64>, what: &str) -> io::Result<Vec<i32>> {
    values
        .into_iter()
        .map(|v| {
            i32::try_from(v).map_err(|_| bad_data(format!("{} element {} exceeds i32", what, v)))
        })
        .collect()
}

pub fn load_network(path: &PathBuf) -> io::Result<Network> {
    let data = fs::read(path)?;
    parse_network(&data)
}

pub fn parse_network(data: &[u8]) -> io::Result<Network> {
    let mut reader = Reader::new(data);

    let version = reader.read_u32()?;
    if version != NNUE_VERSION {
        return Err(bad_data(format!(
            "version {:#x} does not match supported {:#x}",
            version, NNUE_VERSION
        )));
    }
    let _file_hash = reader.read_u32()?;
    let desc_len = reader.read_u32()? as usize;
    if desc_len > 4096 {
        return Err(bad_data(format!("implausible description length {}", desc_len)));
    }
    let _description = reader.take(desc_len)?;

    // Feature transformer
    let (ft_biases, ft_weights) = read_layer(
        &mut reader,
        &LayerSpec {
            bias_count: HIDDEN,
            bias_is_i32: false,
            weight_count: NUM_FEATURES * HIDDEN,
            weight_type: ElementType::I16,
        },
    )?;

    // Dense layer 1
    let (l1_biases, l1_weights) = read_layer(
        &mut reader,
        &LayerSpec {
            bias_count: L2,
            bias_is_i32: true,
            weight_count: L2 * 2 * HIDDEN,
            weight_type: ElementType::I8,
        },
    )?;

    // Dense layer 2
    let (l2_biases, l2_weights) = read_layer(
        &mut reader,
        &LayerSpec {
            bias_count: L2,
            bias_is_i32: true,
            weight_count: L2 * L2,
            weight_type: ElementType::I8,
        },
    )?;

    // Output neuron
    let (out_biases, out_weights) = read_layer(
        &mut reader,
        &LayerSpec {
            bias_count: 1,
            bias_is_i32: true,
            weight_count: L2,
            weight_type: ElementType::I8,
        },
    )?;

    if reader.pos != data.len() {
        return Err(bad_data(format!(
            "{} trailing bytes after output layer",
            data.len() - reader.pos
        )));
    }

    Ok(Network {
        feature_biases: narrow_i16(ft_biases, "feature bias")?,
        feature_weights: narrow_i16(ft_weights, "feature weight")?,
        l1_biases: narrow_i32(l1_biases, "l1 bias")?,
        l1_weights: narrow_i8(l1_weights, "l1 weight")?,
        l2_biases: narrow_i32(l2_biases, "l2 bias")?,
        l2_weights: narrow_i8(l2_weights, "l2 weight")?,
        out_bias: narrow_i32(out_biases, "output bias")?[0],
        out_weights: narrow_i8(out_weights, "output weight")?,
    })
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that install or rely on the absence of the global
    /// network.
    pub static NNUE_TEST_LOCK: Mutex<()> = Mutex::new(());

    /// Deterministic toy network with non-trivial weights.
    pub fn tiny_network(seed: u64) -> Network {
        let mut s = seed | 1;
        let mut next = move || {
            s ^= s << 13;
            s ^= s >> 7;
            s ^= s << 17;
            s
        };

        let feature_biases = (0..HIDDEN).map(|_| (next() % 17) as i16 - 8).collect();
        let feature_weights = (0..NUM_FEATURES * HIDDEN)
            .map(|_| (next() % 9) as i16 - 4)
            .collect();
        let l1_biases = (0..L2).map(|_| (next() % 65) as i32 - 32).collect();
        let l1_weights = (0..L2 * 2 * HIDDEN)
            .map(|_| (next() % 7) as i8 - 3)
            .collect();
        let l2_biases = (0..L2).map(|_| (next() % 65) as i32 - 32).collect();
        let l2_weights = (0..L2 * L2).map(|_| (next() % 7) as i8 - 3).collect();
        let out_weights = (0..L2).map(|_| (next() % 7) as i8 - 3).collect();

        Network {
            feature_biases,
            feature_weights,
            l1_biases,
            l1_weights,
            l2_biases,
            l2_weights,
            out_bias: 10,
            out_weights,
        }
    }
}
