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

    src/channel/image.rs

    A recorded tape: raw line samples and the channel parameters needed to read them back.

*/

//! Tape image file layout, little endian:
//!
//! | offset | size | field                                      |
//! |--------|------|--------------------------------------------|
//! | 0      | 4    | id, "FTAP"                                 |
//! | 4      | 1    | format version (1)                         |
//! | 5      | 1    | line code (0 = FM, 1 = MFM)                |
//! | 6      | 2    | samples per channel cell                   |
//! | 8      | 8    | sample count                               |
//! | 16     | ...  | samples, packed 8 per byte, MSB first      |

use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinWrite};
use bit_vec::BitVec;

use crate::{types::LineCode, TapeError};

pub const TAPE_IMAGE_ID: &[u8; 4] = b"FTAP";
pub const TAPE_IMAGE_VERSION: u8 = 1;

#[derive(Debug)]
#[binrw]
#[brw(little)]
struct TapeImageHeader {
    id: [u8; 4],
    version: u8,
    line_code: u8,
    bit_width: u16,
    sample_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TapeImage {
    pub line_code: LineCode,
    /// Samples per channel cell.
    pub bit_width: u32,
    samples: BitVec,
}

impl TapeImage {
    pub fn new(line_code: LineCode, bit_width: u32) -> Self {
        Self {
            line_code,
            bit_width,
            samples: BitVec::new(),
        }
    }

    pub fn from_samples(line_code: LineCode, bit_width: u32, samples: BitVec) -> Self {
        Self {
            line_code,
            bit_width,
            samples,
        }
    }

    pub fn samples(&self) -> &BitVec {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut BitVec {
        &mut self.samples
    }

    #[inline]
    pub fn push(&mut self, sample: bool) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check whether `image` starts with a tape image header.
    pub fn detect<R: Read + Seek>(mut image: R) -> bool {
        if image.seek(std::io::SeekFrom::Start(0)).is_err() {
            return false;
        }
        match TapeImageHeader::read(&mut image) {
            Ok(header) => &header.id == TAPE_IMAGE_ID,
            Err(_) => false,
        }
    }

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, TapeError> {
        let header = TapeImageHeader::read(reader)?;
        if &header.id != TAPE_IMAGE_ID {
            return Err(TapeError::FormatParseError("missing tape image id".to_string()));
        }
        if header.version != TAPE_IMAGE_VERSION {
            return Err(TapeError::FormatParseError(format!(
                "unsupported tape image version {}",
                header.version
            )));
        }
        let line_code = LineCode::from_u8(header.line_code)
            .ok_or_else(|| TapeError::FormatParseError(format!("invalid line code {}", header.line_code)))?;

        let sample_count = usize::try_from(header.sample_count)
            .map_err(|_| TapeError::FormatParseError("sample count too large".to_string()))?;
        // Never size a buffer from the header; read what the file actually holds.
        let packed_len = sample_count.div_ceil(8);
        let mut packed = Vec::new();
        reader.by_ref().take(packed_len as u64).read_to_end(&mut packed)?;
        if packed.len() != packed_len {
            return Err(TapeError::IoError(format!(
                "tape image truncated: expected {} sample bytes, found {}",
                packed_len,
                packed.len()
            )));
        }

        let mut samples = BitVec::from_bytes(&packed);
        samples.truncate(sample_count);

        log::debug!(
            "TapeImage::read(): {} samples, {} at {} samples per cell",
            sample_count,
            line_code,
            header.bit_width
        );
        Ok(Self {
            line_code,
            bit_width: header.bit_width as u32,
            samples,
        })
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), TapeError> {
        let bit_width = u16::try_from(self.bit_width)
            .map_err(|_| TapeError::ParameterError(format!("bit width {} too large", self.bit_width)))?;
        let header = TapeImageHeader {
            id: *TAPE_IMAGE_ID,
            version: TAPE_IMAGE_VERSION,
            line_code: self.line_code as u8,
            bit_width,
            sample_count: self.samples.len() as u64,
        };
        header.write(writer)?;
        writer.write_all(&self.samples.to_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout() {
        let mut image = TapeImage::new(LineCode::Fm, 8);
        for i in 0..11 {
            image.push(i % 3 == 0);
        }

        let mut cursor = Cursor::new(Vec::new());
        image.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(&bytes[0..4], b"FTAP");
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], 0);
        assert_eq!(&bytes[6..8], &[8, 0]);
        assert_eq!(&bytes[8..16], &[11, 0, 0, 0, 0, 0, 0, 0]);
        // 1001 0010 010x xxxx
        assert_eq!(&bytes[16..], &[0b1001_0010, 0b0100_0000]);

        let read_back = TapeImage::read(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(read_back, image);
        assert!(TapeImage::detect(Cursor::new(bytes)));
    }

    #[test]
    fn rejects_foreign_files() {
        let bytes = b"86BF\x0c\x02\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00".to_vec();
        assert!(!TapeImage::detect(Cursor::new(bytes.clone())));
        assert!(matches!(
            TapeImage::read(&mut Cursor::new(bytes)),
            Err(TapeError::FormatParseError(_))
        ));
    }

    #[test]
    fn truncated_samples_are_an_io_error() {
        let mut image = TapeImage::new(LineCode::Mfm, 8);
        for _ in 0..64 {
            image.push(true);
        }
        let mut cursor = Cursor::new(Vec::new());
        image.write(&mut cursor).unwrap();
        let mut bytes = cursor.into_inner();
        bytes.truncate(bytes.len() - 2);

        assert!(matches!(
            TapeImage::read(&mut Cursor::new(bytes)),
            Err(TapeError::IoError(_))
        ));
    }

    #[test]
    fn oversized_sample_count_is_rejected() {
        let mut bytes = b"FTAP\x01\x01\x08\x00".to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0xAA; 4]);

        assert!(matches!(
            TapeImage::read(&mut Cursor::new(bytes)),
            Err(TapeError::IoError(_)) | Err(TapeError::FormatParseError(_))
        ));
    }

    #[test]
    fn image_from_samples() {
        let samples = BitVec::from_bytes(&[0b1100_0011, 0b0101_1010]);
        let image = TapeImage::from_samples(LineCode::Mfm, 4, samples.clone());
        assert_eq!(image.len(), 16);
        assert_eq!(image.samples(), &samples);

        let mut cursor = Cursor::new(Vec::new());
        image.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), 18);
        assert_eq!(TapeImage::read(&mut Cursor::new(bytes)).unwrap(), image);
    }
}
