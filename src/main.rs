use clap::{Parser, Subcommand};
use log::{error, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use timetable_solver::catalog::RawTimetable;
use timetable_solver::data::WeekPattern;
use timetable_solver::error::PlanError;
use timetable_solver::report::render_plan;
use timetable_solver::server::{self, AppState};
use timetable_solver::solver::{self, SolverConfig};

/// Choose one index per course without clashes, minimising campus days.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the timetable API over HTTP.
    Serve {
        /// JSON timetable with `lectures` and `indexes` tables.
        #[arg(long)]
        timetable: PathBuf,
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
        /// Solver time budget per request, in seconds.
        #[arg(long, default_value_t = 10.0)]
        time_limit: f64,
    },
    /// Solve one course selection and print the ranked timetables.
    Solve {
        #[arg(long)]
        timetable: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        pattern: WeekPattern,
        /// How many ranked timetables to print.
        #[arg(long, default_value_t = 3)]
        solutions: usize,
        #[arg(long, default_value_t = 10.0)]
        time_limit: f64,
        #[arg(required = true)]
        courses: Vec<String>,
    },
    /// List the course codes found in the timetable.
    Courses {
        #[arg(long)]
        timetable: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match args.command {
        Command::Serve {
            timetable,
            bind,
            time_limit,
        } => {
            let config = SolverConfig {
                time_limit,
                ..SolverConfig::default()
            };
            let state = AppState::new(RawTimetable::from_path(timetable)?, config);
            server::run_server(bind, state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Solve {
            timetable,
            pattern,
            solutions,
            time_limit,
            courses,
        } => {
            let load = RawTimetable::from_path(timetable)?.load_catalog(&courses, pattern);
            for row in &load.rejected {
                warn!("Skipped row: {row}");
            }
            let config = SolverConfig {
                time_limit,
                max_solutions: solutions,
                ..SolverConfig::default()
            };
            match solver::plan(&load.catalog, &courses, &config) {
                Ok(plan) => {
                    println!("{}", render_plan(&plan));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e @ PlanError::Infeasible { .. }) => {
                    eprintln!("{e}");
                    Ok(ExitCode::from(2))
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Courses { timetable } => {
            for course in RawTimetable::from_path(timetable)?.list_available_courses() {
                println!("{course}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
