
extern crate asm16;
extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;
extern crate thiserror;

use asm16::assembler::ast::Instruction;
use asm16::{Assembler, AssemblerOptions, AssemblyResult};
use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};
use thiserror::Error;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Error, Debug)]
enum CliError {
    #[error("unable to read input file `{0}`")]
    FileRead(String, #[source] std::io::Error),

    #[error("unable to create output file `{0}`")]
    FileCreate(String, #[source] std::io::Error),

    #[error("unable to write to output file `{0}`")]
    FileWrite(String, #[source] std::io::Error),

    #[error("input file `{0}` has no file name to derive an output name from")]
    NoOutputName(String),

    #[error("output file `{0}` would overwrite the input, pass -o to name it")]
    WouldOverwrite(String),

    #[error("stopped assembly due to {0} error(s)")]
    Assembly(usize),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum OutputFormat {
    Binary,
    Hex,
}

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tFormat: {}\n\tAllow partial: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity_filter(args.occurrences_of("verbose")),
        args.value_of("format").unwrap_or("bin"),
        args.is_present("allow-partial"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None"),
    );

    if let Err(err) = run(&args) {
        match std::error::Error::source(&err) {
            Some(cause) => error!("fatal: {}: {}", err, cause),
            None => error!("fatal: {}", err),
        }
        std::process::exit(1);
    }
}

fn run(args: &ArgMatches) -> Result<(), CliError> {
    // INPUT is a required argument, clap refuses to get this far without it.
    let ifile = args.value_of("INPUT").unwrap_or_default();
    let ipath = Path::new(ifile);

    let source = fs::read_to_string(ipath)
        .map_err(|e| CliError::FileRead(ipath.display().to_string(), e))?;

    let mut options = AssemblerOptions::default();
    if let Some(chars) = args.value_of("comment-chars") {
        options.comment_markers = chars.chars().collect();
    }

    let result = Assembler::new(options).assemble(&source);
    report(&result);

    if args.is_present("print-debug") {
        print_listing(&result);
    }

    if result.has_errors() && !args.is_present("allow-partial") {
        return Err(CliError::Assembly(result.error_count()));
    }

    let format = match args.value_of("format") {
        Some("hex") => OutputFormat::Hex,
        _ => OutputFormat::Binary,
    };
    let opath = output_path(ipath, args.value_of("output"), format)?;
    write_image(&opath, &result.words, format)?;

    info!("wrote {} word(s) to `{}`", result.words.len(), opath.display());
    Ok(())
}

fn report(result: &AssemblyResult) {
    for diag in result.diagnostics.iter() {
        if diag.is_fatal() {
            error!("{}", diag);
        } else {
            warn!("{}", diag);
        }
    }
}

fn print_listing(result: &AssemblyResult) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(2),
        direction:   Direction::LeftToRight,
    });

    for entry in result.listing.iter() {
        let disassembly = match Instruction::decode(entry.word) {
            Ok(ins) => ins.to_string(),
            Err(e) => e.to_string(),
        };
        grid.add(Cell::from(format!("0x{:04X}:", entry.address)));
        grid.add(Cell::from(format!("0x{:04X}", entry.word)));
        grid.add(Cell::from(format!("{:016b}", entry.word)));
        grid.add(Cell::from(format!("{:>4} | {}", entry.line_number, entry.source)));
        grid.add(Cell::from(format!("=> {}", disassembly)));
    }
    println!("{}", grid.fit_into_columns(5));

    if !result.symbols.is_empty() {
        let mut grid = Grid::new(GridOptions {
            filling:     Filling::Spaces(1),
            direction:   Direction::LeftToRight,
        });
        for label in result.symbols.sorted() {
            grid.add(Cell::from(format!("0x{:04X}", label.address)));
            grid.add(Cell::from(label.name.clone()));
        }
        println!("{}", grid.fit_into_columns(2));
    }
}

fn output_path(ipath: &Path, output: Option<&str>, format: OutputFormat) -> Result<PathBuf, CliError> {
    if let Some(filename) = output {
        return Ok(PathBuf::from(filename));
    }

    let stem = ipath
        .file_stem()
        .ok_or_else(|| CliError::NoOutputName(ipath.display().to_string()))?;
    let mut opath = PathBuf::from(stem);
    match format {
        OutputFormat::Hex => { opath.set_extension("hex"); },
        OutputFormat::Binary if ipath.extension().is_none() => { opath.set_extension("bin"); },
        OutputFormat::Binary => {},
    }

    // The derived name always lands in the working directory.
    let input_in_cwd = ipath.parent().map_or(true, |dir| dir.as_os_str().is_empty() || dir == Path::new("."));
    if input_in_cwd && opath.file_name() == ipath.file_name() {
        return Err(CliError::WouldOverwrite(opath.display().to_string()));
    }
    Ok(opath)
}

fn write_image(opath: &Path, words: &[u16], format: OutputFormat) -> Result<(), CliError> {
    let name = opath.display().to_string();
    let mut ofile = File::create(opath)
        .map_err(|e| CliError::FileCreate(name.clone(), e))?;

    for word in words.iter() {
        let written = match format {
            OutputFormat::Binary => ofile.write_all(&word.to_be_bytes()),
            OutputFormat::Hex => writeln!(ofile, "{:04X}", word),
        };
        written.map_err(|e| CliError::FileWrite(name.clone(), e))?;
    }
    Ok(())
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile"))
        .arg(Arg::with_name("format")
            .short("f")
            .long("format")
            .takes_value(true)
            .possible_values(&["bin", "hex"])
            .default_value("bin")
            .help("output big-endian binary words or one hex word per line"))
        .arg(Arg::with_name("comment-chars")
            .short("c")
            .long("comment-chars")
            .takes_value(true)
            .help("characters that start a comment (default: ;#)"))
        .arg(Arg::with_name("allow-partial")
            .long("allow-partial")
            .takes_value(false)
            .help("write the words that did assemble even if some lines failed"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .long("show")
            .alias("s")
            .takes_value(false)
            .help("prints a listing and the symbol table to STDOUT"))
        .get_matches()
}

fn verbosity_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity_filter(verbosity))
        .chain(std::io::stdout())
        .apply().ok();
}
