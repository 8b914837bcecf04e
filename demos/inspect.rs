/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use ustar_scan::TarArchive;

/// Runs every query of the archive against one path.
#[derive(Debug, Parser)]
#[clap(name = "inspect")]
struct Args {
    /// Tar archive to open
    archive: PathBuf,
    /// Entry path inside the archive
    path: String,
    /// Byte offset for `read_file`
    #[clap(default_value_t = 0)]
    offset: u64,
}

/// Prints a hex dump with 16 bytes per line.
fn dump(bytes: &[u8]) {
    for (i, line) in bytes.chunks(16).enumerate() {
        let hex = line.iter().map(|b| format!("{b:02x} ")).collect::<String>();
        let text = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect::<String>();
        println!("{:04x}:  {hex:<48}{text}", i * 16);
    }
}

/// Usage: `cargo run --example inspect -- <archive.tar> <path> [offset]`
fn main() -> ExitCode {
    // log: not mandatory
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Args {
        archive,
        path,
        offset,
    } = Args::parse();

    let file = match File::open(&archive) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("open({}): {e}", archive.display());
            return ExitCode::FAILURE;
        }
    };
    let mut archive = TarArchive::new(file);
    println!("path = '{path}'");

    match archive.check_archive() {
        Ok(count) => println!("check_archive: {count} header(s)"),
        Err(e) => println!(
            "check_archive: {e} (code {})",
            e.header_error().map_or(0, |e| e.code())
        ),
    }
    println!("exists:     {:?}", archive.exists(&path));
    println!("is_dir:     {:?}", archive.is_dir(&path));
    println!("is_file:    {:?}", archive.is_file(&path));
    println!("is_symlink: {:?}", archive.is_symlink(&path));
    println!("metadata:   {:#?}", archive.metadata(&path));

    match archive.list(&path, 64) {
        Ok(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                println!("\tentry {i}: {entry}");
            }
            println!("list: {} entries", entries.len());
        }
        Err(e) => println!("list: {e}"),
    }

    let mut buf = [0_u8; 30];
    match archive.read_file(&path, offset, &mut buf) {
        Ok(outcome) => {
            println!(
                "read_file: {} byte(s) at offset {offset}, {} remaining",
                outcome.bytes_written, outcome.remaining
            );
            dump(&buf[..outcome.bytes_written]);
        }
        Err(e) => println!("read_file: {e}"),
    }

    ExitCode::SUCCESS
}
