//! CRC16-CCITT (polynomial 0x1021, MSB-first, non-reflected, init 0xFFFF).

/// Generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Accumulator seed.
pub const INITIAL: u16 = 0xFFFF;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC16 of `data`. Empty input returns [`INITIAL`].
pub fn crc16(data: &[u8]) -> u16 {
    crc16_update(INITIAL, data)
}

/// Continue a running CRC over another span.
pub fn crc16_update(crc: u16, data: &[u8]) -> u16 {
    data.iter().fold(crc, |crc, &byte| {
        (crc << 8) ^ TABLE[usize::from((crc >> 8) as u8 ^ byte)]
    })
}
