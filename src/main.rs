use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use branchflow::case::*;
use branchflow::impedance::{Impedance, ImpedanceForm, convert_impedance};
use branchflow::parse::read_case;
use branchflow::report::render_table;
use branchflow::server::{ServerConfig, run_server};

#[derive(Parser, Debug)]
#[command(author, version, about = "Two-bus / three-bus power flow calculator", long_about = None)]
struct Cli {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Write the log to this file instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flow on a single branch i-j
    TwoBus {
        #[arg(long, default_value_t = 345.0)]
        vi: f64,
        #[arg(long, default_value_t = 360.0)]
        vj: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        angle_vi: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        angle_vj: f64,
        /// Resistance (ohm)
        #[arg(short, long, default_value_t = 5.0, allow_negative_numbers = true)]
        r: f64,
        /// Reactance (ohm)
        #[arg(short, long, default_value_t = 40.0, allow_negative_numbers = true)]
        x: f64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Flow on the three branches of a triangle i-j-k
    ThreeBus {
        #[arg(long, default_value_t = 345.0)]
        vi: f64,
        #[arg(long, default_value_t = 360.0)]
        vj: f64,
        #[arg(long, default_value_t = 350.0)]
        vk: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        angle_vi: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        angle_vj: f64,
        #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
        angle_vk: f64,
        #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
        r_ij: f64,
        #[arg(long, default_value_t = 40.0, allow_negative_numbers = true)]
        x_ij: f64,
        #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
        r_ik: f64,
        #[arg(long, default_value_t = 40.0, allow_negative_numbers = true)]
        x_ik: f64,
        #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
        r_jk: f64,
        #[arg(long, default_value_t = 40.0, allow_negative_numbers = true)]
        x_jk: f64,
        /// Resistance for all three branches (with --x)
        #[arg(short, long, requires = "x", allow_negative_numbers = true)]
        r: Option<f64>,
        /// Reactance for all three branches (with --r)
        #[arg(short, long, requires = "r", allow_negative_numbers = true)]
        x: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Solve a case file
    Case {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Convert an impedance between rectangular and polar form
    Convert {
        #[command(subcommand)]
        form: ConvertForm,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
        /// Delay before returning results (ms)
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
enum ConvertForm {
    /// R and X (ohm) to magnitude and angle
    Rect {
        #[arg(allow_negative_numbers = true)]
        r: f64,
        #[arg(allow_negative_numbers = true)]
        x: f64,
    },
    /// Magnitude (ohm) and angle (degrees) to R and X
    Polar {
        #[arg(allow_negative_numbers = true)]
        magnitude: f64,
        #[arg(allow_negative_numbers = true)]
        angle_deg: f64,
    },
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.log_level).parse_default_env();
    if let Some(path) = &cli.log_file {
        let log_file = fs::File::create(path)
            .with_context(|| format!("could not create log file {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.init();
    Ok(())
}

fn print_solution(solution: &Solution, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(solution)?);
    } else {
        println!("{}", render_table(solution));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::TwoBus {
            vi,
            vj,
            angle_vi,
            angle_vj,
            r,
            x,
            json,
        } => {
            let case = TwoBusCase::new(
                BusVoltage::new(vi, angle_vi),
                BusVoltage::new(vj, angle_vj),
                Impedance::from_rectangular(r, x),
            );
            let solution = Case::TwoBus(case).solve()?;
            print_solution(&solution, json)?;
        }
        Commands::ThreeBus {
            vi,
            vj,
            vk,
            angle_vi,
            angle_vj,
            angle_vk,
            r_ij,
            x_ij,
            r_ik,
            x_ik,
            r_jk,
            x_jk,
            r,
            x,
            json,
        } => {
            let (vi, vj, vk) = (
                BusVoltage::new(vi, angle_vi),
                BusVoltage::new(vj, angle_vj),
                BusVoltage::new(vk, angle_vk),
            );
            let case = match (r, x) {
                (Some(r), Some(x)) => {
                    ThreeBusCase::with_shared_impedance(vi, vj, vk, Impedance::from_rectangular(r, x))
                }
                _ => ThreeBusCase::new(
                    vi,
                    vj,
                    vk,
                    Impedance::from_rectangular(r_ij, x_ij),
                    Impedance::from_rectangular(r_ik, x_ik),
                    Impedance::from_rectangular(r_jk, x_jk),
                ),
            };
            let solution = Case::ThreeBus(case).solve()?;
            print_solution(&solution, json)?;
        }
        Commands::Case { path, json } => {
            let case = read_case(&path)?;
            let solution = case.solve()?;
            print_solution(&solution, json)?;
        }
        Commands::Convert { form } => {
            let form = match form {
                ConvertForm::Rect { r, x } => ImpedanceForm::Rectangular { r, x },
                ConvertForm::Polar {
                    magnitude,
                    angle_deg,
                } => ImpedanceForm::Polar {
                    magnitude,
                    angle_deg,
                },
            };
            match convert_impedance(form)? {
                ImpedanceForm::Rectangular { r, x } => println!("R = {:.6} ohm  X = {:.6} ohm", r, x),
                ImpedanceForm::Polar {
                    magnitude,
                    angle_deg,
                } => println!("|Z| = {:.6} ohm  angle = {:.6} deg", magnitude, angle_deg),
            }
        }
        Commands::Serve { bind, delay_ms } => {
            info!("Beginning server...");
            let config = ServerConfig {
                bind,
                result_delay: Duration::from_millis(delay_ms),
            };
            run_server(config).await?;
        }
    }
    Ok(())
}
