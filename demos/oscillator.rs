//! Derive the equation of motion for a Wigner function.
//!
//! By default this uses the harmonic oscillator, `H = a† ⋆ a`.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use moyalstar::{
    moyal_equation, oscillator_hamiltonian, parse, star_unevaluated, Equation,
    Symbols,
};

#[derive(Debug, Parser)]
#[command(name = "oscillator", version, about)]
struct Cli {
    /// How the results should be printed
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Also show the star-products before the derivatives are evaluated
    #[arg(long)]
    unevaluated: bool,

    /// Use this Hamiltonian instead of the harmonic oscillator
    #[arg(long)]
    hamiltonian: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Latex,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let symbols = Symbols::new();

    let hamiltonian = match &cli.hamiltonian {
        Some(src) => parse(src, &symbols)
            .with_context(|| format!("Unable to parse \"{}\"", src))?,
        None => oscillator_hamiltonian(&symbols)
            .context("Unable to calculate the oscillator Hamiltonian")?,
    };
    let wigner = symbols.wigner();

    info!("Using the Hamiltonian H = {}", hamiltonian);

    if cli.unevaluated {
        let left = star_unevaluated(&hamiltonian, &wigner, &symbols)?;
        let right = star_unevaluated(&wigner, &hamiltonian, &symbols)?;

        print_expression("H ⋆ W", &left, cli.format);
        print_expression("W ⋆ H", &right, cli.format);
    }

    let equation = moyal_equation(&hamiltonian, &wigner, &symbols)
        .context("Unable to assemble the equation of motion")?
        .collected(symbols.w())?;

    print_equation(&equation, cli.format);

    Ok(())
}

fn print_expression(
    label: &str,
    expr: &moyalstar::Expression,
    format: Format,
) {
    match format {
        Format::Text => println!("{} = {}", label, expr),
        Format::Latex => println!("{}", expr.to_latex()),
    }
}

fn print_equation(equation: &Equation, format: Format) {
    match format {
        Format::Text => println!("{}", equation),
        Format::Latex => println!("{}", equation.to_latex()),
    }
}
