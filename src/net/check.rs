use byteorder::{
    ByteOrder,
    NetworkEndian,
};

/// Calculates the Internet Checksum from [RFC1071](https://tools.ietf.org/html/rfc1071).
///
/// Used for the header checksum of serialized IPv4 packets. Verifying a header
/// with its checksum field filled in yields zero.
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    let words = buffer.chunks_exact(2);
    let odd = words.remainder().first().map(|byte| u32::from(*byte) << 8);

    let mut acc = words
        .map(|word| u32::from(NetworkEndian::read_u16(word)))
        .chain(odd)
        .sum::<u32>();

    while acc > 0xFFFF {
        acc = (acc & 0xFFFF) + (acc >> 16);
    }

    !(acc as u16)
}
