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

    src/framing/layout.rs

    Byte layouts of the sector header word and the sector info block.

*/

use crate::{framing::SECTOR_DATA_LEN, types::SectorFlags};

/// Sector format version stored in the low nibble of the info block flags.
pub const SECTOR_FORMAT_VERSION: u8 = 1;
pub const FILE_ID_LEN: usize = 8;
pub const SECTOR_INFO_LEN: usize = 13;
/// User data bytes carried by one sector.
pub const SECTOR_CAPACITY: usize = SECTOR_DATA_LEN - SECTOR_INFO_LEN;
pub const MAX_SECTOR_NUMBER: u16 = 0x3FFF;

const HEADER_RESERVED: u16 = 0x8000;
const HEADER_EOF: u16 = 0x4000;

/// The sector header, written three times in a row ahead of the sector data.
///
/// Header word layout (big endian on tape):
/// * bit 15: reserved, always zero
/// * bit 14: end of data
/// * bits 0-13: sector number
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorHeader {
    pub number: u16,
    pub eof: bool,
}

impl SectorHeader {
    pub fn new(number: u16, eof: bool) -> Self {
        Self { number, eof }
    }

    pub fn to_word(&self) -> u16 {
        (self.number & MAX_SECTOR_NUMBER) | if self.eof { HEADER_EOF } else { 0 }
    }

    /// Parse a voted header word. Words with the reserved bit set are never written and are rejected.
    pub fn from_word(word: u16) -> Option<Self> {
        if word & HEADER_RESERVED != 0 {
            return None;
        }
        Some(Self {
            number: word & MAX_SECTOR_NUMBER,
            eof: word & HEADER_EOF != 0,
        })
    }
}

/// The info block at the start of every sector's data area. Protected by the first chunk's CRC.
///
/// | offset | size | field                                       |
/// |--------|------|---------------------------------------------|
/// | 0      | 1    | flags: bit 7 EOF, bits 0-3 format version   |
/// | 1      | 2    | sector number, little endian                |
/// | 3      | 2    | user data length, little endian             |
/// | 5      | 8    | file id, zero padded                        |
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectorInfo {
    pub flags: SectorFlags,
    pub number: u16,
    pub data_len: u16,
    pub file_id: [u8; FILE_ID_LEN],
}

impl SectorInfo {
    pub fn new(number: u16, data_len: usize, eof: bool, file_id: [u8; FILE_ID_LEN]) -> Self {
        let mut flags = SectorFlags::from_bits_retain(SECTOR_FORMAT_VERSION);
        flags.set(SectorFlags::EOF, eof);
        Self {
            flags,
            number,
            data_len: data_len.min(SECTOR_CAPACITY) as u16,
            file_id,
        }
    }

    pub fn eof(&self) -> bool {
        self.flags.contains(SectorFlags::EOF)
    }

    pub fn header(&self) -> SectorHeader {
        SectorHeader::new(self.number, self.eof())
    }

    /// The file id as text, with zero padding removed.
    pub fn file_name(&self) -> String {
        let end = self.file_id.iter().position(|&b| b == 0).unwrap_or(FILE_ID_LEN);
        String::from_utf8_lossy(&self.file_id[..end]).into_owned()
    }

    /// Serialize into the first [SECTOR_INFO_LEN] bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0] = self.flags.bits();
        buf[1..3].copy_from_slice(&self.number.to_le_bytes());
        buf[3..5].copy_from_slice(&self.data_len.to_le_bytes());
        buf[5..SECTOR_INFO_LEN].copy_from_slice(&self.file_id);
    }

    /// Deserialize from the first [SECTOR_INFO_LEN] bytes of `buf`. Returns `None` if the block
    /// does not describe a sector this library could have written.
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        if buf.len() < SECTOR_INFO_LEN {
            return None;
        }
        let flags = SectorFlags::from_bits_retain(buf[0]);
        let number = u16::from_le_bytes([buf[1], buf[2]]);
        let data_len = u16::from_le_bytes([buf[3], buf[4]]);

        if flags.version() != SECTOR_FORMAT_VERSION
            || number > MAX_SECTOR_NUMBER
            || data_len as usize > SECTOR_CAPACITY
        {
            log::debug!(
                "SectorInfo::read_from(): rejecting info block: flags {:02X} number {} len {}",
                buf[0],
                number,
                data_len
            );
            return None;
        }

        let mut file_id = [0u8; FILE_ID_LEN];
        file_id.copy_from_slice(&buf[5..SECTOR_INFO_LEN]);
        Some(Self {
            flags,
            number,
            data_len,
            file_id,
        })
    }
}

/// Convert a name into a file id, truncating to [FILE_ID_LEN] bytes and zero padding.
pub fn file_id_from_str(name: &str) -> [u8; FILE_ID_LEN] {
    let mut id = [0u8; FILE_ID_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(FILE_ID_LEN);
    id[..len].copy_from_slice(&bytes[..len]);
    id
}
