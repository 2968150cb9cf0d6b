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
*/
use crate::args::*;
use bpaf::{construct, long, Parser};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) struct LoopbackParams {
    pub(crate) in_file: PathBuf,
    pub(crate) fm: bool,
    pub(crate) bit_width: Option<u32>,
    pub(crate) impairments: ImpairmentParams,
    pub(crate) inject: Option<usize>,
}

fn inject_parser() -> impl Parser<usize> {
    long("inject")
        .argument::<usize>("BYTES")
        .help("Corrupt this many bytes in every chunk before recording")
        .guard(|&n| n <= 255, "A chunk is 255 bytes long")
}

pub(crate) fn loopback_parser() -> impl Parser<LoopbackParams> {
    let in_file = in_file_parser();
    let fm = fm_parser();
    let bit_width = bit_width_parser().optional();
    let impairments = impairment_parser();
    let inject = inject_parser().optional();

    construct!(LoopbackParams {
        in_file,
        fm,
        bit_width,
        impairments,
        inject
    })
}
