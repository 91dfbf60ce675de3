use std::path::PathBuf;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use dieselc::{
    backend::{CodegenOptions, targets::Target},
    driver::{CompilerOptions, Session},
    samples::Sample,
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The bundled program to compile
    #[arg(long, short, default_value = "arithmetic")]
    sample: Sample,

    /// Where to write the generated assembly
    #[arg(long, short, default_value = "d.out")]
    output: PathBuf,

    #[arg(long, default_value_t = Target::default())]
    target: Target,

    /// Annotate the assembly with the quads it was generated from
    #[arg(long = "trace", short = 'b')]
    trace: bool,

    /// Print the quads of every body
    #[arg(long, short = 'q')]
    print_quads: bool,

    /// Print the AST of every body after optimization
    #[arg(long)]
    print_ast: bool,

    #[arg(long)]
    no_optimize: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let options = CompilerOptions {
        optimize: !args.no_optimize,
        print_ast: args.print_ast,
        print_quads: args.print_quads,
        codegen: CodegenOptions { trace: args.trace },
    };

    let mut session = Session::new(options, args.target);
    let program = args.sample.compile(&mut session);

    if session.error_count() > 0 {
        session.diagnostics().emit();
        eprintln!("{} error(s) found, no code written", session.error_count());
        std::process::exit(1);
    }

    let assembly = session.finish(program);

    if let Err(error) = std::fs::write(&args.output, assembly) {
        Args::command()
            .error(
                ErrorKind::Io,
                format!("Could not write '{}': {error}", args.output.display()),
            )
            .exit()
    }

    tracing::info!(output = %args.output.display(), "assembly written");
}
