mod app;
mod config;
mod constants;
mod curve;
mod dsp;
mod error;
mod mixer;
mod state;
mod sync;

use clap::Parser;
use dialoguer::{Select, theme::ColorfulTheme};
use tracing::{Level, error};

fn list_controls(args: &config::ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let controls = mixer::control_names(&args.device)?;

    if controls.is_empty() {
        println!("No playback volume controls found on {}.", args.device);
        return Ok(());
    }

    // Interactive selection
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Select a mixer control on {}", args.device))
        .items(&controls)
        .default(0)
        .interact()?;

    println!("{}", controls[selection]);

    Ok(())
}

fn print_curve(args: &config::CurveArgs) -> Result<(), Box<dyn std::error::Error>> {
    config::validate_range(args.range)?;

    let mut percents: Vec<u8> = (0..=100).step_by(args.step as usize).collect();
    if percents.last() != Some(&100) {
        percents.push(100);
    }

    if !args.quiet {
        println!("Volume curve for a {} dB range:", args.range);
    }
    for percent in percents {
        let db = curve::percent_to_db(percent, args.range);
        if args.quiet {
            println!("{:.2}", db);
        } else {
            let mute = if curve::is_muted(db, args.range) { " (mute)" } else { "" };
            println!("{:>3}% {:>8.2} dB{}", percent, db, mute);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    use app::ExitCode;
    use config::{Args, Commands};

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Run(args.run)) {
        Commands::Run(run_args) => {
            init_logging(run_args.verbose);

            let config = match config::Config::from_run_args(run_args) {
                Ok(c) => c,
                Err(e) => {
                    error!("Configuration error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            };

            match app::App::new_with_config(config) {
                Ok(app) => {
                    let run_result = app.run().await;
                    match run_result.result {
                        Ok(_) => {
                            std::process::exit(run_result.exit_code as i32);
                        }
                        Err(e) => {
                            error!("Application error: {}", e);
                            std::process::exit(ExitCode::Error as i32);
                        }
                    }
                }
                Err(e) => {
                    error!("Setup error: {}", e);
                    std::process::exit(ExitCode::Error as i32);
                }
            }
        }
        Commands::List(list_args) => {
            if let Err(e) = list_controls(&list_args) {
                eprintln!("Error listing mixer controls: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }
        }
        Commands::Curve(curve_args) => {
            if let Err(e) = print_curve(&curve_args) {
                eprintln!("Configuration error: {}", e);
                std::process::exit(ExitCode::Error as i32);
            }
        }
    }
}
