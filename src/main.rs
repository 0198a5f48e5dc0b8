use std::num::ParseIntError;
use std::process;

use clap::{CommandFactory, Parser};

use rv32sim::hart::Hart;
use rv32sim::memory::Memory;

/// Simulate an RV32I program from a flat binary image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the binary image loaded at address 0
    infile: String,

    /// Memory size in hex bytes, rounded up to a multiple of 16
    #[arg(short = 'm', value_name = "HEX-MEM-SIZE", default_value = "10000",
          value_parser = parse_hex)]
    memory_size: u32,

    /// Maximum number of instructions to execute (0 = unlimited)
    #[arg(short = 'l', value_name = "EXEC-LIMIT", default_value_t = 0)]
    exec_limit: u64,

    /// Show a disassembly of memory before simulation begins
    #[arg(short = 'd')]
    disassemble: bool,

    /// Show instruction printing during execution
    #[arg(short = 'i')]
    show_instructions: bool,

    /// Show a dump of the hart status before each instruction
    #[arg(short = 'r')]
    show_registers: bool,

    /// Show a dump of the hart and memory after simulation
    #[arg(short = 'z')]
    final_dump: bool,
}

/// The memory size argument is hexadecimal, with or without a 0x
/// prefix.
fn parse_hex(arg: &str) -> Result<u32, ParseIntError> {
    let digits = arg.strip_prefix("0x").unwrap_or(arg);
    u32::from_str_radix(digits, 16)
}

fn usage() -> ! {
    let mut cmd = Args::command();
    eprint!("{}", cmd.render_help());
    process::exit(1);
}

fn main() {
    let args = Args::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        process::exit(1);
    });

    let mut mem = Memory::new(args.memory_size);
    if let Err(err) = mem.load_file(&args.infile) {
        eprintln!("{err}");
        usage();
    }

    {
        let mut sim = Hart::new(&mut mem);
        sim.set_show_registers(args.show_registers);

        if args.disassemble {
            sim.disasm();
            sim.reset();
        }

        sim.set_show_instructions(args.show_instructions);
        sim.run(args.exec_limit);

        if args.final_dump {
            sim.dump();
        }
    }

    if args.final_dump {
        mem.dump();
    }
}
