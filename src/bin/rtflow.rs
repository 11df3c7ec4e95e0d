use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rtflow::debug::{format_polar_vec, format_rect_vec};
use rtflow::{
    load_case, runpf, write_solution, DenseLU, PFOpt, PrintProgress, ProgressMonitor, SimParams,
    Simulation,
};
use std::fs;
use std::path::PathBuf;

/// Newton-Raphson power flow and voltage control simulation.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Power Flow
    #[clap(name = "pf")]
    PowerFlow(PfArgs),

    /// Voltage control simulation
    #[clap(name = "sim")]
    Simulate(SimArgs),
}

#[derive(Args)]
struct PfArgs {
    /// The input case file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file for the solution (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Termination tolerance on the largest Newton correction.
    #[arg(long)]
    pub tol: Option<f64>,

    /// Maximum number of iterations.
    #[arg(long)]
    pub max_it: Option<usize>,

    /// Print the correction of each iteration.
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

#[derive(Args)]
struct SimArgs {
    /// Number of time steps.
    #[arg(long, default_value_t = 200)]
    steps: usize,

    /// Time step (s).
    #[arg(long)]
    dt: Option<f64>,

    /// Initial voltage reference (p.u.).
    #[arg(long, default_value_t = 1.0)]
    vref: f64,

    /// Time at which the voltage reference steps (s).
    #[arg(long)]
    step_time: Option<f64>,

    /// Voltage reference after the step (p.u.).
    #[arg(long, default_value_t = 1.02)]
    step_vref: f64,

    /// Voltage controller proportional gain.
    #[arg(long)]
    kp: Option<f64>,

    /// Voltage controller integral gain.
    #[arg(long)]
    ki: Option<f64>,

    /// Plant time constant (s).
    #[arg(long)]
    tq: Option<f64>,

    /// Grid voltage noise (p.u.).
    #[arg(long)]
    noise: Option<f64>,

    /// Seed for the noise generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Output file for the samples (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(2);
        }
    }
}

fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::PowerFlow(args) => power_flow(args),
        Commands::Simulate(args) => simulate(args),
    }
}

fn power_flow(args: &PfArgs) -> Result<()> {
    let case = load_case(&args.input)?;
    let sys = case.to_bus_system()?;
    if let Some(name) = &case.name {
        log::info!("case {}: {} buses", name, sys.len());
    }

    let mut opt = PFOpt::default();
    if let Some(tol) = args.tol {
        opt.tolerance = tol;
    }
    if let Some(max_it) = args.max_it {
        opt.max_it = max_it;
    }

    let printer = PrintProgress {};
    let progress: Option<&dyn ProgressMonitor> = if args.progress {
        Some(&printer)
    } else {
        None
    };
    let sol = runpf(&sys, None, &opt, &DenseLU, progress)?;

    println!("V = {}", format_polar_vec(&sol.v));
    println!("S = {}", format_rect_vec(&sol.s));
    println!("Sgen = {}", format_rect_vec(&sol.sgen));

    if let Some(out_path) = &args.output {
        write_solution(out_path, &sol)?;
    }
    if !sol.solved() {
        return Err(anyhow::anyhow!(
            "power flow did not succeed ({:?} after {} iterations)",
            sol.status,
            sol.iterations
        ));
    }
    Ok(())
}

fn simulate(args: &SimArgs) -> Result<()> {
    let mut params = SimParams::default();
    if let Some(dt) = args.dt {
        params.dt = dt;
    }
    if let Some(kp) = args.kp {
        params.kp = kp;
    }
    if let Some(ki) = args.ki {
        params.ki = ki;
    }
    if let Some(tq) = args.tq {
        params.tq_plant = tq;
    }
    if let Some(noise) = args.noise {
        params.noise = noise;
    }
    let step_time = args.step_time.unwrap_or(10.0 * params.dt);

    let mut sim = Simulation::new(params, args.seed)?;
    let mut samples = Vec::with_capacity(args.steps);

    println!("  time     Vref        V     Qcmd        Q");
    for _ in 0..args.steps {
        let v_ref = if sim.time() + params.dt >= step_time {
            args.step_vref
        } else {
            args.vref
        };
        let s = sim.step(v_ref)?;
        println!(
            "{:6.2}  {:7.4}  {:7.4}  {:7.4}  {:7.4}{}",
            s.time,
            s.v_ref,
            s.v,
            s.q_ref,
            s.q,
            if s.converged { "" } else { "  *" }
        );
        samples.push(s);
    }

    if let Some(out_path) = &args.output {
        fs::write(out_path, serde_json::to_string_pretty(&samples)?)?;
    }
    Ok(())
}
