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

    src/args.rs

    Command line argument parsing for tapetool.

*/
use bpaf::*;
use std::{fmt, fmt::Display, path::PathBuf};

use crate::{
    loopback::args::{loopback_parser, LoopbackParams},
    read::args::{read_parser, ReadParams},
    write::args::{write_parser, WriteParams},
};
use fluxtape::{ChannelConfig, Impairments, LineCode};

#[derive(Clone, Debug)]
pub enum Command {
    Version,
    Write(WriteParams),
    Read(ReadParams),
    Loopback(LoopbackParams),
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Version => write!(f, "version"),
            Command::Write(_) => write!(f, "write"),
            Command::Read(_) => write!(f, "read"),
            Command::Loopback(_) => write!(f, "loopback"),
        }
    }
}

#[derive(Debug)]
pub struct AppParams {
    pub global: GlobalOptions,
    pub command: Command,
}

#[derive(Debug)]
pub struct GlobalOptions {
    pub silent: bool,
}

/// Timing impairments applied when recording to a simulated tape.
#[derive(Clone, Debug)]
pub struct ImpairmentParams {
    pub jitter: Option<f64>,
    pub speed: Option<f64>,
    pub seed: Option<u64>,
}

impl ImpairmentParams {
    pub fn impairments(&self) -> Impairments {
        Impairments::default()
            .with_jitter(self.jitter.unwrap_or(0.0))
            .with_speed(self.speed.unwrap_or(1.0))
            .with_seed(self.seed.unwrap_or(0))
    }
}

pub fn global_options_parser() -> impl Parser<GlobalOptions> {
    let silent = long("silent")
        .help("Suppress all output except required output")
        .switch();

    construct!(GlobalOptions { silent })
}

pub(crate) fn in_file_parser() -> impl Parser<PathBuf> {
    long("in_file")
        .short('i')
        .argument::<PathBuf>("IN_FILE")
        .help("Path to input file")
}

pub(crate) fn out_file_parser() -> impl Parser<PathBuf> {
    long("out_file")
        .short('o')
        .argument::<PathBuf>("OUT_FILE")
        .help("Path to output file")
}

pub(crate) fn fm_parser() -> impl Parser<bool> {
    long("fm").help("Use the FM line code instead of MFM").switch()
}

pub(crate) fn bit_width_parser() -> impl Parser<u32> {
    long("bit-width")
        .argument::<u32>("SAMPLES")
        .help("Samples per channel cell")
        .guard(|&w| (2..=256).contains(&w), "Bit width must be between 2 and 256")
}

pub(crate) fn impairment_parser() -> impl Parser<ImpairmentParams> {
    let jitter = long("jitter")
        .argument::<f64>("SAMPLES")
        .help("Maximum random displacement of each transition, in samples")
        .guard(|&j| j >= 0.0, "Jitter must not be negative")
        .optional();
    let speed = long("speed")
        .argument::<f64>("FACTOR")
        .help("Cell duration multiplier, 1.0 for nominal tape speed")
        .guard(|&s| s > 0.0, "Speed must be positive")
        .optional();
    let seed = long("seed")
        .argument::<u64>("SEED")
        .help("Seed for the jitter generator")
        .optional();

    construct!(ImpairmentParams { jitter, speed, seed })
}

pub(crate) fn channel_config(fm: bool, bit_width: Option<u32>) -> ChannelConfig {
    let line_code = if fm { LineCode::Fm } else { LineCode::Mfm };
    let config = ChannelConfig::default().with_line_code(line_code);
    match bit_width {
        Some(width) => config.with_bit_width(width),
        None => config,
    }
}

pub(crate) fn command_parser() -> impl Parser<AppParams> {
    let global = global_options_parser();

    let version = pure(Command::Version)
        .to_options()
        .command("version")
        .help("Display version information and exit");

    let write = construct!(Command::Write(write_parser()))
        .to_options()
        .command("write")
        .help("Record a file onto a simulated tape image");
    let read = construct!(Command::Read(read_parser()))
        .to_options()
        .command("read")
        .help("Read a file back from a tape image");
    let loopback = construct!(Command::Loopback(loopback_parser()))
        .to_options()
        .command("loopback")
        .help("Write a file to tape and read it back in memory");

    let command = construct!([version, write, read, loopback]);

    construct!(AppParams { global, command })
}
