use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

/// `len` bytes at `offset`. Ranges past the end of the stream fail before
/// anything is allocated.
pub fn read_slice<R: Read + Seek + ?Sized>(r: &mut R, offset: u64, len: u64) -> io::Result<Vec<u8>> {
    let stream_end = r.seek(SeekFrom::End(0))?;
    if offset.checked_add(len).is_none_or(|end| end > stream_end) {
        return Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("{len} bytes at {offset:#x} run past end of stream ({stream_end:#x})"),
        ));
    }
    r.seek(SeekFrom::Start(offset))?;
    let mut v = vec![0u8; len as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk.iter().map(|b| {
            let c = *b;
            if (32..=126).contains(&c) { c as char } else { '.' }
        }).collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

/// Euclid's algorithm.
pub const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let h = a % b;
        a = b;
        b = h;
    }
    a
}

/// Extract `num_bits` bits starting at bit `first_bit` (MSB first) of `data`.
///
/// Returns `None` when the range runs past the end of `data` or asks for more
/// than 64 bits.
pub fn from_bits(data: &[u8], first_bit: usize, num_bits: usize) -> Option<u64> {
    if num_bits == 0 || num_bits > 64 {
        return None;
    }
    // skip whole leading bytes
    let first_byte = first_bit / 8;
    let first_bit = first_bit % 8;

    let last_bit = first_bit + num_bits - 1;
    let num_bytes = last_bit / 8 + 1;
    let trailing_bits = 7 - last_bit % 8;
    let bytes = data.get(first_byte..first_byte + num_bytes)?;

    let mut acc: u128 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let b = (if i == 0 { b & (0xff >> first_bit) } else { b }) as u128;
        let shift = 8 * (num_bytes - 1 - i) as i64 - trailing_bits as i64;
        acc |= if shift >= 0 { b << shift } else { b >> -shift };
    }
    Some(acc as u64)
}
