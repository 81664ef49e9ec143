use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use cutplan::io::{load_params, write_result};
use cutplan::render;
use cutplan::types::{Method, SolveError, Unused};
use cutplan::{Pool, calculate};

#[derive(Parser)]
#[command(name = "cutplan", about = "2D guillotine cutting stock solver")]
struct Cli {
    /// Calculation method: greedy or forward_greedy
    #[arg(long, default_value = "forward_greedy", value_parser = parse_method)]
    method: Method,

    /// Parameters file (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Result file (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print an ASCII layout of each panel to stderr
    #[arg(long)]
    layout: bool,
}

fn parse_method(s: &str) -> Result<Method, String> {
    match s {
        "greedy" => Ok(Method::Greedy),
        "forward_greedy" | "forward-greedy" => Ok(Method::ForwardGreedy),
        _ => Err(format!(
            "invalid method '{}', expected: greedy or forward_greedy",
            s
        )),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let reader: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(File::open(path).unwrap_or_else(|e| {
            eprintln!("Error: cannot open {}: {}", path.display(), e);
            std::process::exit(1);
        })),
        None => Box::new(std::io::stdin()),
    };

    let params = load_params(reader).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let mut pool = Pool::<Unused>::new();
    let layout = match calculate(&mut pool, cli.method, &params) {
        Ok(layout) => layout,
        Err(SolveError::Unsolvable) => {
            // A normal outcome of the search, not a fault: its own exit code.
            eprintln!("unsolvable: no feasible placement for every item");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path).unwrap_or_else(|e| {
            eprintln!("Error: cannot create {}: {}", path.display(), e);
            std::process::exit(1);
        })),
        None => Box::new(std::io::stdout()),
    };

    if let Err(e) = write_result(writer, &params, &layout) {
        eprintln!("Error: cannot write result: {}", e);
        std::process::exit(1);
    }

    if cli.layout {
        for (pi, panel) in params.panels.iter().enumerate() {
            let rects = render::placements_on_panel(&params, &layout, pi);
            eprintln!("Panel {} ({}x{}):", panel.id, panel.width, panel.height);
            eprint!("{}", render::render_panel(panel.width, panel.height, &rects));
            eprintln!();
        }
    }
}
