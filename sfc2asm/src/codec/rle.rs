//! Word-header run length codec and its even/odd interleaved variant.
//!
//! Each packet starts with a 16-bit big-endian header: top bit set means
//! "repeat the next byte", clear means "copy the following bytes"; the low
//! 15 bits hold length-1. `0xFFFF` terminates. Runs of `0xFF` split at 0x80
//! so a repeat packet can never be mistaken for the terminator.
use crate::common::uint::U16Ext;

pub fn rle1_compress(data: &[u8]) -> Vec<u8> {
    compress_stream(data, true)
}

pub fn rle1_decompress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 2 <= data.len() {
        let header = (data[i] as u16) << 8 | data[i + 1] as u16;
        i += 2;
        if header == 0xFFFF {
            break;
        }
        let count = (header & 0x7FFF) as usize + 1;
        if header & 0x8000 != 0 {
            if i >= data.len() {
                break;
            }
            out.extend(std::iter::repeat(data[i]).take(count));
            i += 1;
        } else {
            let end = (i + count).min(data.len());
            out.extend_from_slice(&data[i..end]);
            i += count;
        }
    }
    out
}

/// Interleaved variant: the even-indexed and odd-indexed bytes compress as
/// two concatenated unterminated streams.
pub fn rle2_compress(data: &[u8]) -> Vec<u8> {
    let evens: Vec<u8> = data.iter().step_by(2).copied().collect();
    let odds: Vec<u8> = data.iter().skip(1).step_by(2).copied().collect();
    let mut out = compress_stream(&evens, false);
    out.extend(compress_stream(&odds, false));
    out
}

pub fn rle2_decompress(data: &[u8]) -> Vec<u8> {
    let decoded = rle1_decompress(data);
    let half = decoded.len().div_ceil(2);
    let (evens, odds) = decoded.split_at(half);
    let mut out = Vec::with_capacity(decoded.len());
    for i in 0..odds.len() {
        out.push(evens[i]);
        out.push(odds[i]);
    }
    if evens.len() > odds.len() {
        out.push(evens[odds.len()]);
    }
    out
}

fn compress_stream(data: &[u8], terminate: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut direct: Vec<u8> = Vec::new();

    let mut i = 0;
    while i < data.len() {
        let val = data[i];
        let mut count = 1;
        while i + count < data.len() && data[i + count] == val {
            count += 1;
        }
        if count > 1 {
            flush_direct(&mut out, &mut direct);
            let step = if val == 0xFF { 0x80 } else { 0x8000 };
            let mut rem = count;
            while rem > 0 {
                let n = rem.min(step);
                let len = (n - 1) as u16;
                out.push(0x80 | len.high_byte());
                out.push(len.low_byte());
                out.push(val);
                rem -= n;
            }
        } else {
            direct.push(val);
        }
        i += count;
    }
    flush_direct(&mut out, &mut direct);

    if terminate {
        out.extend([0xFF, 0xFF]);
    }
    out
}

fn flush_direct(out: &mut Vec<u8>, direct: &mut Vec<u8>) {
    for chunk in direct.chunks(0x8000) {
        let len = (chunk.len() - 1) as u16;
        out.push(len.high_byte());
        out.push(len.low_byte());
        out.extend_from_slice(chunk);
    }
    direct.clear();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rle1_known_streams() {
        let data = b"aaaaaaaaaaaaaaca1aaaaa".to_vec();
        assert_eq!(
            rle1_compress(&data),
            vec![0x80, 13, 97, 0, 2, 99, 97, 49, 0x80, 4, 97, 0xFF, 0xFF]
        );
        assert_eq!(rle1_decompress(&rle1_compress(&data)), data);

        assert_eq!(
            rle1_compress(b"aaz"),
            vec![0x80, 1, 97, 0, 0, 122, 0xFF, 0xFF]
        );
        assert_eq!(
            rle1_compress(b"azz"),
            vec![0, 0, 97, 0x80, 1, 122, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_rle1_ff_runs_split_early() {
        let data = vec![0xFFu8; 0xFF];
        assert_eq!(
            rle1_compress(&data),
            vec![0x80, 0x7F, 0xFF, 0x80, 0x7E, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(rle1_decompress(&rle1_compress(&data)), data);
    }

    #[test]
    fn test_rle2_round_trip() {
        let data = b"abababababXYXYXY".to_vec();
        assert_eq!(rle2_decompress(&rle2_compress(&data)), data);

        let odd = b"abababa".to_vec();
        assert_eq!(rle2_decompress(&rle2_compress(&odd)), odd);

        assert_eq!(rle2_decompress(&rle2_compress(&[])), Vec::<u8>::new());
    }
}
