use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use linprog_solver::{Solution, SolutionStatus, Solver, VariableKind};
use log::LevelFilter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "linprog")]
#[command(about = "Solve linear programs written in plain algebraic text", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a program and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
    /// Solve a program and output the optimal solution
    Solve {
        /// The file containing the program
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Print the tableau after every iteration
        #[arg(long)]
        steps: bool,
        /// Give up after this many iterations
        #[arg(long, default_value_t = 10000)]
        max_iterations: usize,
        /// Tolerance for comparisons against zero (0 compares exactly)
        #[arg(long, default_value_t = 1e-9)]
        tolerance: f64,
    },
    /// Check a program for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn read_source(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => fail(format!("Error reading file: {}", e)),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Error serializing output: {}", e)),
    }
}

fn print_solution(solution: &Solution, objective_name: &str) {
    match solution.status {
        SolutionStatus::Optimal => {
            println!("Status: OPTIMAL");
            if let Some(value) = solution.objective_value {
                println!("Objective: {} = {}", objective_name, value);
            }
            println!("Iterations: {}", solution.iterations);
            println!();
            println!("Variables:");
            for a in solution.assignment.iter().filter(|a| a.kind == VariableKind::Decision) {
                println!("  {:20} {:>12}", a.variable, a.value);
            }
            let mut slacks = solution
                .assignment
                .iter()
                .filter(|a| a.kind == VariableKind::Slack)
                .peekable();
            if slacks.peek().is_some() {
                println!("Slack:");
                for a in slacks {
                    println!("  {:20} {:>12}", a.variable, a.value);
                }
            }
        }
        SolutionStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
        }
        SolutionStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
        }
        SolutionStatus::NotConverged => {
            println!("Status: NOT CONVERGED");
            println!(
                "No optimum after {} iterations; try a larger --max-iterations.",
                solution.iterations
            );
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);

            match linprog_lang::Parser::parse(&source) {
                Ok(program) => match format {
                    Format::Json => print_json(&program),
                    Format::Pretty => println!("{:#?}", program),
                },
                Err(e) => fail(format!("Parse error: {}", e)),
            }
        }
        Commands::Solve {
            file,
            format,
            steps,
            max_iterations,
            tolerance,
        } => {
            let source = read_source(&file);

            let problem = match linprog_lang::Compiler::new().load(&source) {
                Ok(p) => p,
                Err(e) => fail(format!("Error: {}", e)),
            };

            let solver = Solver::new()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance);
            let result = if steps {
                solver.solve_with(&problem, |tableau| println!("{}", tableau))
            } else {
                solver.solve(&problem)
            };
            let solution = match result {
                Ok(s) => s,
                Err(e) => fail(format!("Solver error: {}", e)),
            };

            match format {
                Format::Json => print_json(&solution),
                Format::Pretty => print_solution(&solution, &problem.objective.name),
            }
            if !solution.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);

            match linprog_lang::Compiler::new().load(&source) {
                Ok(problem) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} constraints", problem.num_constraints());
                    println!("  {} variables", problem.decision_variables().len());
                    for constraint in problem.zero_rhs_inequalities() {
                        eprintln!(
                            "warning: `{}` is treated as `{} = 0`",
                            constraint, constraint.expression
                        );
                    }
                    println!();
                    print!("{}", problem);
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
