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

    src/types/enums.rs

    Defines common enum types

*/
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use strum::EnumIter;

/// The line code used to turn data bits into flux transitions on tape.
/// fluxtape supports two line codes:
/// * Fm: Frequency Modulation. Every bit cell carries a clock transition, and a `1` adds a second
///   transition in the middle of the cell. Simple and robust, at two transitions per bit worst case.
/// * Mfm: Modified Frequency Modulation. The clock transition is only written between two `0` bits,
///   so the worst case transition density is halved and the bit rate can be doubled for the same
///   magnetic bandwidth.
#[repr(u8)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineCode {
    #[doc = "Frequency Modulation. Every bit cell has a clock transition."]
    Fm = 0,
    #[default]
    #[doc = "Modified Frequency Modulation. Clock transitions are written only between two zero bits."]
    Mfm = 1,
}

impl LineCode {
    /// Return the [LineCode] stored in a tape image header, if valid.
    pub fn from_u8(value: u8) -> Option<LineCode> {
        match value {
            0 => Some(LineCode::Fm),
            1 => Some(LineCode::Mfm),
            _ => None,
        }
    }
}

impl Display for LineCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            LineCode::Fm => write!(f, "FM"),
            LineCode::Mfm => write!(f, "MFM"),
        }
    }
}

/// The states of the sector reading state machine.
///
/// The clock recovery loop does not interpret these states beyond two rules: in a resync state
/// the window handler is called for every recovered bit, and in a read state it is called once
/// per full 32-bit window.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum ReadState {
    /// Scanning every bit position for the sector sync word.
    ResyncSector,
    /// Decoding the repeated sector header words.
    ReadSectorHeader,
    /// Scanning every bit position for the data sync word.
    ResyncData,
    /// Decoding sector data into the raw staging buffer.
    ReadData,
    /// Terminal state. The read loop exits.
    Terminate,
}

impl ReadState {
    /// Returns true if the state is searching for a sync word bit by bit.
    pub fn is_resync(&self) -> bool {
        matches!(self, ReadState::ResyncSector | ReadState::ResyncData)
    }
}

impl Display for ReadState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ReadState::ResyncSector => write!(f, "ResyncSector"),
            ReadState::ReadSectorHeader => write!(f, "ReadSectorHeader"),
            ReadState::ResyncData => write!(f, "ResyncData"),
            ReadState::ReadData => write!(f, "ReadData"),
            ReadState::Terminate => write!(f, "Terminate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn line_code_from_u8() {
        for code in LineCode::iter() {
            assert_eq!(LineCode::from_u8(code as u8), Some(code));
        }
        assert_eq!(LineCode::from_u8(2), None);
    }

    #[test]
    fn resync_states() {
        let resync: Vec<ReadState> = ReadState::iter().filter(|s| s.is_resync()).collect();
        assert_eq!(resync, vec![ReadState::ResyncSector, ReadState::ResyncData]);
        assert_eq!(ReadState::iter().count(), 5);
    }
}
