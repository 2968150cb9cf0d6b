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

    src/read/mod.rs

    Implements the read command: decodes a tape image and writes out the recovered file.

*/
pub(crate) mod args;

use anyhow::{bail, Context, Error};

use crate::{args::GlobalOptions, print_report, read_file};
use fluxtape::prelude::*;

pub(crate) fn run(global: &GlobalOptions, params: &args::ReadParams) -> Result<(), Error> {
    let mut cursor = read_file(&params.in_file)
        .with_context(|| format!("Couldn't read tape image {}", params.in_file.display()))?;

    if !TapeImage::detect(&mut cursor) {
        bail!("{} is not a tape image", params.in_file.display());
    }
    cursor.set_position(0);
    let tape = TapeImage::read(&mut cursor)?;

    let mut line_code = tape.line_code;
    if params.fm && line_code != LineCode::Fm {
        log::warn!("run(): tape image was recorded with {}, decoding as FM anyway", line_code);
        line_code = LineCode::Fm;
    }
    let config = ChannelConfig::default()
        .with_line_code(line_code)
        .with_bit_width(tape.bit_width);

    if !global.silent {
        println!(
            "Reading {} samples of {} at {} samples per cell",
            tape.len(),
            line_code,
            tape.bit_width
        );
    }

    let mut session = ChannelSession::new(config)?;
    let report = session.read_stream(TapePlayback::new(tape), &CancelToken::new(), |msg| {
        if let ReaderMessage::SectorError(number, failed) = msg {
            log::warn!("run(): sector {:?} has {} failed chunks", number, failed);
        }
    })?;

    if !global.silent {
        print_report(&report);
    }

    if let Some(out_file) = &params.out_file {
        std::fs::write(out_file, &report.data)
            .with_context(|| format!("Couldn't write output file {}", out_file.display()))?;
    }

    if report.bad_sectors() > 0 {
        bail!("{} sectors could not be recovered", report.bad_sectors());
    }
    Ok(())
}
