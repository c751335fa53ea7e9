use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use synacor::snapshot::Snapshot;
use synacor::{loader, Config, Machine, OperandPolicy, StdConsole};

const ROW: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "synacor", version, about = "Run a Synacor architecture program image")]
struct Cli {
    /// Program image: little-endian 16-bit words.
    #[arg(default_value = "challenge.bin")]
    image: PathBuf,

    /// Continue from a saved snapshot instead of booting the image.
    #[arg(long, value_name = "SNAPSHOT")]
    resume: Option<PathBuf>,

    /// Fault on operand values above the register range instead of wrapping them.
    #[arg(long)]
    strict: bool,

    /// Write a snapshot here when the machine stops.
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Print the loaded memory before running.
    #[arg(long)]
    dump_memory: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn dump_memory(memory: &[u16]) {
    for (i, row) in memory.chunks(ROW).enumerate() {
        let start = i * ROW;
        let cells: String = row.iter().map(|v| format!("  {:>7}", v)).collect();
        println!("  {:>5}-{:>5}:{}", start, start + ROW, cells);
    }
}

fn boot(cli: &Cli, config: Config) -> Result<Machine, synacor::ImageError> {
    match &cli.resume {
        Some(path) => Machine::restore(Snapshot::load(path)?, config),
        None => Machine::boot(&loader::load_file(&cli.image)?, config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = SimpleLogger::new().with_level(level(cli.verbose)).init() {
        eprintln!("failed to initialise logging: {}", err);
    }

    let config = Config {
        operand_policy: if cli.strict {
            OperandPolicy::Strict
        } else {
            OperandPolicy::Wrap
        },
    };

    let mut vm = match boot(&cli, config) {
        Ok(vm) => vm,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_memory {
        dump_memory(vm.memory());
    }

    let result = vm.run(&mut StdConsole::new());

    if let Some(path) = &cli.save {
        if let Err(err) = vm.snapshot().save(path) {
            log::error!("{}", err);
        }
    }

    match result {
        Ok(reason) => {
            log::info!("stopped: {:?}", reason);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error {}, halting...", err);
            ExitCode::FAILURE
        }
    }
}
