//! LZARI, the LZSS + adaptive arithmetic coder by Haruhiko Okumura.
//!
//! MAX saves store their payload with this exact coder, so the model,
//! the window initialisation and the bit order all follow the classic
//! implementation. Streams start with the decoded length as a
//! little-endian `u32`.

use crate::{Error, Result};

const N: usize = 4096;
const F: usize = 60;
const THRESHOLD: usize = 2;
const NIL: usize = N;

const M: u32 = 15;
const Q1: u64 = 1 << M;
const Q2: u64 = 2 * Q1;
const Q3: u64 = 3 * Q1;
const Q4: u64 = 4 * Q1;
const MAX_CUM: u32 = (Q1 - 1) as u32;

const N_CHAR: usize = 256 - THRESHOLD + F;

/// Input bytes the decoder may consume past the end of the stream, reading
/// zeroes, before the stream is considered truncated.
const MAX_OVERRUN: usize = 4;

struct Model {
    char_to_sym: [usize; N_CHAR],
    sym_to_char: [usize; N_CHAR + 1],
    sym_freq: [u32; N_CHAR + 1],
    sym_cum: [u32; N_CHAR + 1],
    position_cum: Vec<u32>,
}

impl Model {
    fn new() -> Self {
        let mut model = Self {
            char_to_sym: [0; N_CHAR],
            sym_to_char: [0; N_CHAR + 1],
            sym_freq: [0; N_CHAR + 1],
            sym_cum: [0; N_CHAR + 1],
            position_cum: vec![0; N + 1],
        };

        for sym in (1..=N_CHAR).rev() {
            let ch = sym - 1;
            model.char_to_sym[ch] = sym;
            model.sym_to_char[sym] = ch;
            model.sym_freq[sym] = 1;
            model.sym_cum[sym - 1] = model.sym_cum[sym] + 1;
        }
        for i in (1..=N).rev() {
            model.position_cum[i - 1] = model.position_cum[i] + 10000 / (i as u32 + 200);
        }
        model
    }

    fn update(&mut self, sym: usize) {
        if self.sym_cum[0] >= MAX_CUM {
            let mut cum = 0;
            for i in (1..=N_CHAR).rev() {
                self.sym_cum[i] = cum;
                self.sym_freq[i] = (self.sym_freq[i] + 1) >> 1;
                cum += self.sym_freq[i];
            }
            self.sym_cum[0] = cum;
        }

        let mut i = sym;
        while self.sym_freq[i] == self.sym_freq[i - 1] {
            i -= 1;
        }
        if i < sym {
            let ch_i = self.sym_to_char[i];
            let ch_sym = self.sym_to_char[sym];
            self.sym_to_char[i] = ch_sym;
            self.sym_to_char[sym] = ch_i;
            self.char_to_sym[ch_i] = sym;
            self.char_to_sym[ch_sym] = i;
        }
        self.sym_freq[i] += 1;
        for cum in &mut self.sym_cum[..i] {
            *cum += 1;
        }
    }

    fn search_sym(&self, x: u64) -> usize {
        let (mut i, mut j) = (1, N_CHAR);
        while i < j {
            let k = (i + j) / 2;
            if u64::from(self.sym_cum[k]) > x {
                i = k + 1;
            } else {
                j = k;
            }
        }
        i
    }

    fn search_pos(&self, x: u64) -> usize {
        let (mut i, mut j) = (1, N);
        while i < j {
            let k = (i + j) / 2;
            if u64::from(self.position_cum[k]) > x {
                i = k + 1;
            } else {
                j = k;
            }
        }
        i - 1
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buffer: u8,
    mask: u8,
    overrun: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            mask: 0,
            overrun: 0,
        }
    }

    fn bit(&mut self) -> Result<u64> {
        self.mask >>= 1;
        if self.mask == 0 {
            match self.data.get(self.pos) {
                Some(&byte) => self.buffer = byte,
                None => {
                    self.overrun += 1;
                    if self.overrun > MAX_OVERRUN {
                        return Err(Error::truncated("LZARI stream ended early"));
                    }
                    self.buffer = 0;
                }
            }
            self.pos += 1;
            self.mask = 0x80;
        }
        Ok(u64::from(self.buffer & self.mask != 0))
    }
}

struct Decoder<'a> {
    model: Model,
    bits: BitReader<'a>,
    low: u64,
    high: u64,
    value: u64,
}

impl<'a> Decoder<'a> {
    fn new(stream: &'a [u8]) -> Result<Self> {
        let mut decoder = Self {
            model: Model::new(),
            bits: BitReader::new(stream),
            low: 0,
            high: Q4,
            value: 0,
        };
        for _ in 0..M + 2 {
            decoder.value = 2 * decoder.value + decoder.bits.bit()?;
        }
        Ok(decoder)
    }

    fn range(&self) -> Result<u64> {
        if self.value < self.low || self.value >= self.high {
            return Err(Error::truncated("LZARI code value out of range"));
        }
        Ok(self.high - self.low)
    }

    fn renormalize(&mut self) -> Result<()> {
        loop {
            if self.low >= Q2 {
                self.value -= Q2;
                self.low -= Q2;
                self.high -= Q2;
            } else if self.low >= Q1 && self.high <= Q3 {
                self.value -= Q1;
                self.low -= Q1;
                self.high -= Q1;
            } else if self.high > Q2 {
                return Ok(());
            }
            self.low += self.low;
            self.high += self.high;
            self.value = 2 * self.value + self.bits.bit()?;
        }
    }

    fn decode_char(&mut self) -> Result<usize> {
        let range = self.range()?;
        let total = u64::from(self.model.sym_cum[0]);
        let sym = self
            .model
            .search_sym(((self.value - self.low + 1) * total - 1) / range);
        self.high = self.low + range * u64::from(self.model.sym_cum[sym - 1]) / total;
        self.low += range * u64::from(self.model.sym_cum[sym]) / total;
        self.renormalize()?;

        let ch = self.model.sym_to_char[sym];
        self.model.update(sym);
        Ok(ch)
    }

    fn decode_position(&mut self) -> Result<usize> {
        let range = self.range()?;
        let total = u64::from(self.model.position_cum[0]);
        let position = self
            .model
            .search_pos(((self.value - self.low + 1) * total - 1) / range);
        self.high = self.low + range * u64::from(self.model.position_cum[position]) / total;
        self.low += range * u64::from(self.model.position_cum[position + 1]) / total;
        self.renormalize()?;
        Ok(position)
    }
}

/// Reads the decoded length stored at the start of a stream.
pub fn declared_size(input: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = input
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::truncated("LZARI stream shorter than its length field"))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Decodes `input` into `output`, never writing past `output.len()`.
///
/// Returns the number of bytes produced: the declared length, or the size of
/// `output` if that is smaller.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize> {
    let declared = declared_size(input)? as usize;
    let target = declared.min(output.len());
    if target == 0 {
        return Ok(0);
    }

    let mut decoder = Decoder::new(&input[4..])?;
    let mut window = [b' '; N];
    let mut r = N - F;
    let mut count = 0;

    while count < target {
        let c = decoder.decode_char()?;
        if c < 256 {
            output[count] = c as u8;
            window[r] = c as u8;
            r = (r + 1) & (N - 1);
            count += 1;
        } else {
            let start = (r + N - decoder.decode_position()? - 1) & (N - 1);
            let len = c - 255 + THRESHOLD;
            for k in 0..len {
                if count == target {
                    break;
                }
                let byte = window[(start + k) & (N - 1)];
                output[count] = byte;
                window[r] = byte;
                r = (r + 1) & (N - 1);
                count += 1;
            }
        }
    }

    Ok(count)
}

struct BitWriter {
    out: Vec<u8>,
    buffer: u8,
    mask: u8,
}

impl BitWriter {
    fn put(&mut self, bit: bool) {
        if bit {
            self.buffer |= self.mask;
        }
        self.mask >>= 1;
        if self.mask == 0 {
            self.out.push(self.buffer);
            self.buffer = 0;
            self.mask = 0x80;
        }
    }

    fn flush(&mut self) {
        for _ in 0..7 {
            self.put(false);
        }
    }
}

struct Encoder {
    model: Model,
    bits: BitWriter,
    low: u64,
    high: u64,
    shifts: u32,
    text: Vec<u8>,
    lson: Vec<usize>,
    rson: Vec<usize>,
    dad: Vec<usize>,
    match_position: usize,
    match_length: usize,
}

impl Encoder {
    fn new(out: Vec<u8>) -> Self {
        Self {
            model: Model::new(),
            bits: BitWriter {
                out,
                buffer: 0,
                mask: 0x80,
            },
            low: 0,
            high: Q4,
            shifts: 0,
            text: vec![0; N + F - 1],
            lson: vec![NIL; N + 257],
            rson: vec![NIL; N + 257],
            dad: vec![NIL; N + 257],
            match_position: 0,
            match_length: 0,
        }
    }

    fn insert_node(&mut self, r: usize) {
        let mut cmp: i32 = 1;
        let mut p = N + 1 + self.text[r] as usize;
        self.rson[r] = NIL;
        self.lson[r] = NIL;
        self.match_length = 0;

        loop {
            if cmp >= 0 {
                if self.rson[p] != NIL {
                    p = self.rson[p];
                } else {
                    self.rson[p] = r;
                    self.dad[r] = p;
                    return;
                }
            } else if self.lson[p] != NIL {
                p = self.lson[p];
            } else {
                self.lson[p] = r;
                self.dad[r] = p;
                return;
            }

            let mut i = 1;
            while i < F {
                cmp = i32::from(self.text[r + i]) - i32::from(self.text[p + i]);
                if cmp != 0 {
                    break;
                }
                i += 1;
            }
            if i > THRESHOLD {
                let distance = (r + N - p) & (N - 1);
                if i > self.match_length {
                    self.match_position = distance;
                    self.match_length = i;
                    if i >= F {
                        break;
                    }
                } else if i == self.match_length && distance < self.match_position {
                    self.match_position = distance;
                }
            }
        }

        // Full-length match: r replaces p in the tree.
        self.dad[r] = self.dad[p];
        self.lson[r] = self.lson[p];
        self.rson[r] = self.rson[p];
        let (left, right) = (self.lson[p], self.rson[p]);
        self.dad[left] = r;
        self.dad[right] = r;
        let parent = self.dad[p];
        if self.rson[parent] == p {
            self.rson[parent] = r;
        } else {
            self.lson[parent] = r;
        }
        self.dad[p] = NIL;
    }

    fn delete_node(&mut self, p: usize) {
        if self.dad[p] == NIL {
            return;
        }
        let q = if self.rson[p] == NIL {
            self.lson[p]
        } else if self.lson[p] == NIL {
            self.rson[p]
        } else {
            let mut q = self.lson[p];
            if self.rson[q] != NIL {
                while self.rson[q] != NIL {
                    q = self.rson[q];
                }
                let (parent, left) = (self.dad[q], self.lson[q]);
                self.rson[parent] = left;
                self.dad[left] = parent;
                self.lson[q] = self.lson[p];
                let left = self.lson[p];
                self.dad[left] = q;
            }
            self.rson[q] = self.rson[p];
            let right = self.rson[p];
            self.dad[right] = q;
            q
        };
        self.dad[q] = self.dad[p];
        let parent = self.dad[p];
        if self.rson[parent] == p {
            self.rson[parent] = q;
        } else {
            self.lson[parent] = q;
        }
        self.dad[p] = NIL;
    }

    fn output(&mut self, bit: bool) {
        self.bits.put(bit);
        while self.shifts > 0 {
            self.bits.put(!bit);
            self.shifts -= 1;
        }
    }

    fn renormalize(&mut self) {
        loop {
            if self.high <= Q2 {
                self.output(false);
            } else if self.low >= Q2 {
                self.output(true);
                self.low -= Q2;
                self.high -= Q2;
            } else if self.low >= Q1 && self.high <= Q3 {
                self.shifts += 1;
                self.low -= Q1;
                self.high -= Q1;
            } else {
                return;
            }
            self.low += self.low;
            self.high += self.high;
        }
    }

    fn encode_char(&mut self, ch: usize) {
        let sym = self.model.char_to_sym[ch];
        let range = self.high - self.low;
        let total = u64::from(self.model.sym_cum[0]);
        self.high = self.low + range * u64::from(self.model.sym_cum[sym - 1]) / total;
        self.low += range * u64::from(self.model.sym_cum[sym]) / total;
        self.renormalize();
        self.model.update(sym);
    }

    fn encode_position(&mut self, position: usize) {
        let range = self.high - self.low;
        let total = u64::from(self.model.position_cum[0]);
        self.high = self.low + range * u64::from(self.model.position_cum[position]) / total;
        self.low += range * u64::from(self.model.position_cum[position + 1]) / total;
        self.renormalize();
    }

    fn encode_end(mut self) -> Vec<u8> {
        self.shifts += 1;
        self.output(self.low >= Q1);
        self.bits.flush();
        self.bits.out
    }
}

/// Encodes `data` as an LZARI stream, length prefix included.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 16);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    if data.is_empty() {
        return out;
    }

    let mut enc = Encoder::new(out);
    let mut input = data.iter().copied();
    let mut s = 0;
    let mut r = N - F;
    enc.text[..r].fill(b' ');

    let mut len = 0;
    while len < F {
        match input.next() {
            Some(byte) => enc.text[r + len] = byte,
            None => break,
        }
        len += 1;
    }
    for i in 1..=F {
        enc.insert_node(r - i);
    }
    enc.insert_node(r);

    while len > 0 {
        if enc.match_length > len {
            enc.match_length = len;
        }
        if enc.match_length <= THRESHOLD {
            enc.match_length = 1;
            let ch = enc.text[r] as usize;
            enc.encode_char(ch);
        } else {
            enc.encode_char(255 - THRESHOLD + enc.match_length);
            enc.encode_position(enc.match_position - 1);
        }

        let last_match_length = enc.match_length;
        let mut i = 0;
        while i < last_match_length {
            let Some(byte) = input.next() else {
                break;
            };
            enc.delete_node(s);
            enc.text[s] = byte;
            if s < F - 1 {
                enc.text[s + N] = byte;
            }
            s = (s + 1) & (N - 1);
            r = (r + 1) & (N - 1);
            enc.insert_node(r);
            i += 1;
        }
        while i < last_match_length {
            enc.delete_node(s);
            s = (s + 1) & (N - 1);
            r = (r + 1) & (N - 1);
            len -= 1;
            if len > 0 {
                enc.insert_node(r);
            }
            i += 1;
        }
    }

    enc.encode_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..400u32 {
            data.extend_from_slice(format!("entry {i:04} BESLES-12345 icon.sys ").as_bytes());
            data.push((i * 7) as u8);
        }
        data
    }

    const REFERENCE_TEXT: &[u8] =
        b"BESLES-12345 icon.sys BESLES-12345 icon.sys BESLES-12345 icon.sys    ABABABABABABAB!";

    /// `REFERENCE_TEXT` as encoded by Okumura's LZARI.C.
    const REFERENCE_STREAM: [u8; 36] = [
        0x54, 0x00, 0x00, 0x00, 0xCA, 0x01, 0xFC, 0x68, 0x5A, 0xCB, 0x07, 0xD7, 0x18, 0x33, 0x92,
        0x04, 0xA3, 0xC5, 0x24, 0x6A, 0x2B, 0x85, 0x46, 0x7B, 0x7B, 0x0A, 0x89, 0x99, 0xF6, 0x7F,
        0x23, 0xA7, 0xE2, 0xB3, 0x7C, 0x40,
    ];

    #[test]
    fn decodes_reference_stream() {
        let mut out = vec![0u8; REFERENCE_TEXT.len()];
        assert_eq!(
            decompress(&REFERENCE_STREAM, &mut out).unwrap(),
            REFERENCE_TEXT.len()
        );
        assert_eq!(out, REFERENCE_TEXT);
    }

    #[test]
    fn encodes_like_the_reference_coder() {
        assert_eq!(compress(REFERENCE_TEXT), REFERENCE_STREAM);
    }

    #[test]
    fn decodes_what_it_encodes() {
        for data in [b"a".to_vec(), b"   leading spaces".to_vec(), sample_text()] {
            let stream = compress(&data);
            assert_eq!(declared_size(&stream).unwrap() as usize, data.len());

            let mut out = vec![0u8; data.len()];
            assert_eq!(decompress(&stream, &mut out).unwrap(), data.len());
            assert_eq!(out, data);
        }
    }

    #[test]
    fn repetitive_input_shrinks() {
        let data = vec![0xABu8; 16 * 1024];
        assert!(compress(&data).len() < data.len() / 10);
    }

    #[test]
    fn output_buffer_is_a_hard_ceiling() {
        let data = sample_text();
        let stream = compress(&data);

        let mut out = vec![0u8; 100];
        assert_eq!(decompress(&stream, &mut out).unwrap(), 100);
        assert_eq!(&out[..], &data[..100]);
    }

    #[test]
    fn understated_length_stops_early() {
        let data = sample_text();
        let mut stream = compress(&data);
        stream[..4].copy_from_slice(&10u32.to_le_bytes());

        let mut out = vec![0u8; data.len()];
        assert_eq!(decompress(&stream, &mut out).unwrap(), 10);
        assert_eq!(&out[..10], &data[..10]);
        assert!(out[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let data = sample_text();
        let stream = compress(&data);

        let mut out = vec![0u8; data.len()];
        assert!(decompress(&stream[..stream.len() / 2], &mut out).is_err());
        assert!(decompress(&stream[..3], &mut out).is_err());
    }

    #[test]
    fn empty_stream() {
        let stream = compress(&[]);
        assert_eq!(stream, vec![0, 0, 0, 0]);
        assert_eq!(decompress(&stream, &mut []).unwrap(), 0);
    }
}
