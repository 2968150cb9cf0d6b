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

    src/write/mod.rs

    Implements the write command: records a file onto a simulated tape image.

*/
pub(crate) mod args;

use anyhow::{Context, Error};
use std::io::{BufWriter, Write};

use crate::args::{channel_config, GlobalOptions};
use fluxtape::{ChannelSession, TapeRecorder};

pub(crate) fn run(global: &GlobalOptions, params: &args::WriteParams) -> Result<(), Error> {
    let data = std::fs::read(&params.in_file)
        .with_context(|| format!("Couldn't read input file {}", params.in_file.display()))?;

    let file_id = match &params.file_id {
        Some(id) => id.clone(),
        None => params
            .in_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let mut session = ChannelSession::new(channel_config(params.fm, params.bit_width))?;
    let mut recorder = TapeRecorder::new(session.config()).with_impairments(params.impairments.impairments())?;
    let report = session.write_stream(&mut recorder, &data, &file_id)?;
    let tape = recorder.finish();

    let file = std::fs::File::create(&params.out_file)
        .with_context(|| format!("Couldn't create output file {}", params.out_file.display()))?;
    let mut writer = BufWriter::new(file);
    tape.write(&mut writer)?;
    writer.flush()?;

    if !global.silent {
        println!(
            "Wrote {} bytes as '{}' in {} {} sectors: {} code words, {} samples",
            report.bytes,
            file_id,
            report.sectors,
            session.config().line_code,
            report.words,
            tape.len()
        );
    }
    Ok(())
}
