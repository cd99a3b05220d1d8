use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rv32i_sim::image::{self, ImageFormat};
use rv32i_sim::{HaltReason, Machine, report};

#[derive(Parser, Debug)]
#[command(version, about = "RV32I instruction-set simulator")]
struct Args {
    /// Program image to load at address 0
    image: PathBuf,

    /// Image file format
    #[arg(long, value_enum, default_value_t = ImageFormat::Raw)]
    format: ImageFormat,

    /// Stop after N instructions (0 = run until halted)
    #[arg(long, default_value_t = 0)]
    max_insns: u64,

    /// Enable instruction trace on stderr
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_filter = if args.trace { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut machine = Machine::new();
    if let Err(err) = image::load(&args.image, args.format, &mut machine) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    let halt = if args.max_insns == 0 {
        Some(machine.run())
    } else {
        run_bounded(&mut machine, args.max_insns)
    };

    match halt {
        // Out-of-range halts and the exit call stay silent.
        Some(HaltReason::UnknownInstruction { inst, .. }) => {
            println!("Unknown instruction: 0x{inst:08X}");
        }
        Some(reason) => log::info!("{reason}"),
        None => log::warn!("instruction limit of {} reached", args.max_insns),
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = report::write_register_dump(&mut out, &machine).and_then(|()| out.flush()) {
        eprintln!("Error: failed to write register dump: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_bounded(machine: &mut Machine, limit: u64) -> Option<HaltReason> {
    for _ in 0..limit {
        if let Err(reason) = machine.step() {
            return Some(reason);
        }
    }
    None
}
