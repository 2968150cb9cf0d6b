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

    src/main.rs

    tapetool: write files to simulated cassette tape images, read them back and exercise the channel in
    memory.

*/

pub mod args;
pub mod loopback;
pub mod read;
pub mod write;

use anyhow::Error;
use bpaf::Parser;
use std::{io::Cursor, path::Path};

use crate::args::Command;
use args::command_parser;
use fluxtape::ReadReport;

fn main() -> Result<(), Error> {
    env_logger::init();

    let app_params = command_parser().run();

    let command_result = match &app_params.command {
        Command::Version => {
            println!("tapetool v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Write(params) => write::run(&app_params.global, params),
        Command::Read(params) => read::run(&app_params.global, params),
        Command::Loopback(params) => loopback::run(&app_params.global, params),
    };

    match command_result {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Command '{}' failed: {}", app_params.command, e);
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Cursor<Vec<u8>>, Error> {
    let buffer = std::fs::read(path)?;
    Ok(Cursor::new(buffer))
}

/// Print one line per sector read, followed by a summary.
pub(crate) fn print_report(report: &ReadReport) {
    println!("{:>6} {:>4} {:>5} {:>9} {:>6}  chunks", "sector", "eof", "bytes", "corrected", "status");
    for summary in &report.sectors {
        let number = summary
            .number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        let status = match (summary.ok, summary.out_of_sequence) {
            (true, false) => "ok",
            (true, true) => "seq",
            (false, _) => "BAD",
        };
        println!(
            "{:>6} {:>4} {:>5} {:>9} {:>6}  {:?}",
            number,
            if summary.eof { "*" } else { "" },
            summary.len,
            summary.corrected,
            status,
            summary.chunks
        );
    }

    println!(
        "{} sectors, {} bad, {} bytes recovered, {} bytes corrected",
        report.sectors.len(),
        report.bad_sectors(),
        report.data.len(),
        report.corrected_bytes()
    );
    if let Some(file_id) = &report.file_id {
        println!("File id: {}", file_id);
    }
    println!(
        "Stream {}; {} samples, {} bits recovered",
        if report.terminated {
            "complete"
        }
        else if report.cancelled {
            "cancelled"
        }
        else {
            "ended without an end of data sector"
        },
        report.stats.samples,
        report.stats.bits
    );
}
