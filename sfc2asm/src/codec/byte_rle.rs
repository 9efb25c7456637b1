//! Byte-tagged run length codec.
//!
//! The stream starts with a tag byte chosen to be absent from the payload.
//! Runs of three or more encode as `[value, tag, count-1]`, everything else
//! is literal. `[tag, 0]` terminates.
use crate::error::CodecError;

pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let tag = (0u8..=255)
        .find(|t| !data.contains(t))
        .ok_or(CodecError::NoFreeTagByte)?;
    let mut out = vec![tag];

    let mut i = 0;
    while i < data.len() {
        let val = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == val && run < 256 {
            run += 1;
        }
        if run > 2 {
            out.extend([val, tag, (run - 1) as u8]);
        } else {
            out.extend(std::iter::repeat(val).take(run));
        }
        i += run;
    }

    out.extend([tag, 0]);
    Ok(out)
}

pub fn decompress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if data.is_empty() {
        return out;
    }
    let tag = data[0];
    let mut last = tag;
    let mut i = 1;
    while i < data.len() {
        let c = data[i];
        if c == tag {
            i += 1;
            if i >= data.len() {
                break;
            }
            let count = data[i];
            if count == 0 {
                break;
            }
            out.extend(std::iter::repeat(last).take(count as usize));
        } else {
            out.push(c);
            last = c;
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_round_trip() {
        let single = vec![53u8];
        assert_eq!(decompress(&compress(&single).unwrap()), single);

        let data = b"aaaaaaaaaaccaacccaaaa6ca7c712a6b2248dc409d34b82e58876".to_vec();
        assert_eq!(decompress(&compress(&data).unwrap()), data);
    }

    #[test]
    fn test_long_runs_split() {
        let data = vec![0x42u8; 700];
        assert_eq!(decompress(&compress(&data).unwrap()), data);
    }

    #[test]
    fn test_no_free_tag() {
        let data: Vec<u8> = (0u8..=255).collect();
        assert!(matches!(compress(&data), Err(CodecError::NoFreeTagByte)));
    }
}
