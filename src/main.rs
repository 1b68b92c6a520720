use clap::Parser;
use turner::{Engine, Heap, Outcome, StdDevice, fmt_num, program};

#[derive(Parser)]
#[command(name = "turner", version, about = "A combinator graph-reduction machine")]
struct Cli {
    /// Built-in program to run
    #[arg(value_enum, default_value_t = Program::Echo)]
    program: Program,

    /// Print every reduction step and collection to stderr
    #[arg(long)]
    trace: bool,

    /// Initial heap capacity in cells
    #[arg(long, default_value_t = 256)]
    heap_cells: usize,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Program {
    /// Copy stdin to stdout until end of input
    Echo,
    /// Print 42 and exit
    Answer,
}

fn main() {
    let cli = Cli::parse();

    let mut heap = Heap::with_capacity(cli.heap_cells);
    let root = match cli.program {
        Program::Echo => program::echo(&mut heap),
        Program::Answer => program::answer(&mut heap),
    };

    let mut engine = Engine::new(heap, root, StdDevice).with_trace(cli.trace);
    match engine.run() {
        Ok(Outcome::Exit) => {}
        Ok(Outcome::Value(v)) => println!("{}", fmt_num(v)),
        Err(e) => {
            eprintln!("turner: {e}");
            std::process::exit(1);
        }
    }
}
