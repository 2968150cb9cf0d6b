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

    src/loopback/mod.rs

    Implements the loopback command: writes a file to a simulated tape and reads it back in memory,
    optionally corrupting every chunk on the way.

*/
pub(crate) mod args;

use anyhow::{bail, Error};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    args::{channel_config, GlobalOptions},
    print_report,
    read_file,
};
use fluxtape::{
    fec::{inject_byte_errors, CHUNK_LEN},
    prelude::*,
};

pub(crate) fn run(global: &GlobalOptions, params: &args::LoopbackParams) -> Result<(), Error> {
    let data = read_file(&params.in_file)?.into_inner();
    let inject = params.inject.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(params.impairments.seed.unwrap_or(0) ^ 0x5EED);

    let mut session = ChannelSession::new(channel_config(params.fm, params.bit_width))?;
    let mut recorder = TapeRecorder::new(session.config()).with_impairments(params.impairments.impairments())?;
    let written = session.write_stream_with(&mut recorder, &data, "loopback", |_, staged| {
        if inject > 0 {
            for chunk in staged.chunks_exact_mut(CHUNK_LEN) {
                inject_byte_errors(chunk, inject, &mut rng);
            }
        }
    })?;

    if !global.silent {
        println!(
            "Wrote {} bytes in {} sectors, {} byte errors injected per chunk",
            written.bytes, written.sectors, inject
        );
    }

    let tape = recorder.finish();
    let report = session.read_stream(TapePlayback::new(tape), &CancelToken::new(), |_| {})?;

    if !global.silent {
        print_report(&report);
    }

    if report.data != data {
        bail!(
            "Recovered {} of {} bytes, data does not match",
            report.data.len(),
            data.len()
        );
    }
    if !global.silent {
        println!("Loopback ok");
    }
    Ok(())
}
