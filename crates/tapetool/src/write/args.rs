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
pub(crate) struct WriteParams {
    pub(crate) in_file: PathBuf,
    pub(crate) out_file: PathBuf,
    pub(crate) fm: bool,
    pub(crate) bit_width: Option<u32>,
    pub(crate) file_id: Option<String>,
    pub(crate) impairments: ImpairmentParams,
}

fn file_id_parser() -> impl Parser<String> {
    long("file-id")
        .argument::<String>("NAME")
        .help("File id recorded in every sector, up to 8 bytes. Defaults to the input file name")
}

pub(crate) fn write_parser() -> impl Parser<WriteParams> {
    let in_file = in_file_parser();
    let out_file = out_file_parser();
    let fm = fm_parser();
    let bit_width = bit_width_parser().optional();
    let file_id = file_id_parser().optional();
    let impairments = impairment_parser();

    construct!(WriteParams {
        in_file,
        out_file,
        fm,
        bit_width,
        file_id,
        impairments
    })
}
