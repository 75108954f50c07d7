use clap::Parser;
use colorvm_core::image::{DecodeError, ProgramImage, VERSION_MAJOR, VERSION_MINOR};
use colorvm_core::listing;
use colorvm_core::vm::{Termination, Vm};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod console;
mod image_file;
mod stdio;

use config::Config;
use console::Console;

/// A stack VM whose program is a raster image: the R, G and B bytes of
/// each cell feed three lockstep threads that share an alpha rendezvous
/// stack.
#[derive(Parser)]
#[command(name = "colorvm", version)]
struct Cli {
    /// Program image to load.
    filename: PathBuf,

    /// No execution, just dump the byte arrays as text.
    #[arg(short = 'b', long)]
    bytedump: bool,

    /// No execution, just disassemble the program.
    #[arg(short = 'd', long)]
    disasm: bool,

    /// Silent run, no informational messages.
    #[arg(short = 's', long)]
    silent: bool,

    /// Display execution statistics after the VM terminates.
    #[arg(short = 't', long)]
    statistics: bool,

    /// Provide detailed debug output.
    #[arg(short = 'g', long)]
    debug: bool,
}

/// Front-end failures, each mapped to a stable exit code.
#[derive(Debug)]
enum AppError {
    FileNotFound(PathBuf),
    Image {
        path: PathBuf,
        source: png::DecodingError,
    },
    Decode(DecodeError),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound(path) => write!(f, "File {} not found.", path.display()),
            Self::Image { path, source } => {
                write!(f, "Cannot read image {}: {source}", path.display())
            }
            Self::Decode(e) => write!(f, "File rejected: {e}."),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image { source, .. } => Some(source),
            Self::Decode(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::FileNotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::FileNotFound(_) | Self::Io(_) => 1,
            Self::Image { .. } => 2,
            Self::Decode(DecodeError::UnsupportedVersion { .. }) => 3,
            Self::Decode(DecodeError::EmptyProgram) => 4,
            Self::Decode(DecodeError::ImageTooSmall { .. })
            | Self::Decode(DecodeError::InvalidCellSize) => 5,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (cfg, warning) = Config::load();
    let mut console = Console::new(cli.silent || cfg.silent, cli.debug);
    if let Some(warning) = warning {
        console.info(&warning);
    }

    match run(&cli, &cfg, &mut console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.info(&err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli, cfg: &Config, console: &mut Console) -> Result<(), AppError> {
    let image = image_file::load(&cli.filename)?;
    let program = ProgramImage::decode(&image).map_err(AppError::Decode)?;
    let header = program.header();
    console.debug(&format!(
        "Version: {}.{}, cellsize: {}",
        header.major, header.minor, header.cellsize
    ));
    console.debug(&format!("Program size: {}", program.len()));

    let name = cli.filename.display();
    if cli.bytedump {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Dumping {name}")?;
        writeln!(out, "ColorVM version: {VERSION_MAJOR}.{VERSION_MINOR}")?;
        writeln!(
            out,
            "Image file version: {}.{}, Cell size: {}\n",
            header.major, header.minor, header.cellsize
        )?;
        listing::write_byte_dump(&mut out, &program)?;
        return Ok(());
    }
    if cli.disasm {
        let mut out = std::io::stdout().lock();
        writeln!(out, "#Disassembling {name}")?;
        writeln!(out, "#ColorVM version: {VERSION_MAJOR}.{VERSION_MINOR}")?;
        writeln!(
            out,
            "#Image file version: {}.{}, Cell size: {}\n",
            header.major, header.minor, header.cellsize
        )?;
        listing::write_disassembly(&mut out, &program)?;
        return Ok(());
    }

    let mut vm = Vm::new(program);
    vm.set_stack_limit(cfg.stack_limit);
    let mut io = stdio::StdIo::new();
    let term = vm.run(&mut io, console);
    match term {
        Termination::Halted => console.info("Threads halted. Exiting."),
        Termination::Deadlock => console.info("Thread deadlock. Exiting."),
    }

    if cli.statistics {
        console.print_statistics(&vm)?;
    }
    Ok(())
}
