/*
    FluxTape

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/fec/crc.rs

    CRC16/MODBUS checksum stamped on every chunk payload.

*/

/// CRC16/MODBUS hasher. Reflected polynomial 0xA001 (0x8005 bit reversed), initial value 0xFFFF,
/// no final xor.
pub struct Crc16Hasher {
    crc: u16,
}

impl Crc16Hasher {
    pub fn new() -> Self {
        Self { crc: 0xFFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data.iter() {
            self.crc ^= byte as u16;
            for _ in 0..8 {
                if self.crc & 1 != 0 {
                    self.crc = (self.crc >> 1) ^ 0xA001;
                }
                else {
                    self.crc >>= 1;
                }
            }
        }
    }

    pub fn finalize(&self) -> u16 {
        self.crc
    }
}

impl Default for Crc16Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate the CRC16/MODBUS of a byte slice.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut hasher = Crc16Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_check_value() {
        assert_eq!(crc16_modbus(b"123456789"), 0x4B37);
        assert_eq!(crc16_modbus(b"HELLO"), 0xE165);
        assert_eq!(crc16_modbus(&[]), 0xFFFF);
    }

    #[test]
    fn crc16_incremental() {
        let mut hasher = Crc16Hasher::default();
        hasher.update(b"1234");
        hasher.update(b"56789");
        assert_eq!(hasher.finalize(), 0x4B37);
    }
}
