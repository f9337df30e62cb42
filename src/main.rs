use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use galaxy_field::config::Config;
use galaxy_field::lifecycle::StartTrigger;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Interactive galaxy-shaped particle field
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// TOML file with field, camera and interaction parameters
  #[arg(short, long)]
  config: Option<PathBuf>,
  /// Seed for reproducible particle generation
  #[arg(short, long)]
  seed: Option<u64>,
  /// Skip the camera fly-in and start at the resting position
  #[arg(long, default_value_t = false)]
  no_fly_in: bool,
  /// Wait for a click, key press or touch before animating
  #[arg(long, default_value_t = false)]
  start_on_input: bool,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Number of frames to run in headless mode; runs until Ctrl-C when absent
  #[arg(long)]
  frames: Option<u64>,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn load_config(args: &Args) -> Result<Config, galaxy_field::error::GalaxyError> {
  let mut config = match &args.config {
    Some(path) => Config::load(path)?,
    None => Config::default(),
  };
  if let Some(seed) = args.seed {
    config.field.seed = Some(seed);
  }
  if args.no_fly_in {
    config.fly_in.enabled = false;
  }
  Ok(config)
}

fn main() -> ExitCode {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return ExitCode::SUCCESS;
  }

  env_logger::init();

  let config = match load_config(&args) {
    Ok(config) => config,
    Err(err) => {
      log::error!("{err}");
      return ExitCode::FAILURE;
    }
  };

  if args.headless {
    galaxy_field::headless::run(config, args.frames);
    return ExitCode::SUCCESS;
  }

  let trigger = if args.start_on_input {
    StartTrigger::FirstInteraction
  } else {
    StartTrigger::Immediate
  };
  match galaxy_field::state::run(config, trigger) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      log::error!("galaxy field failed to start: {err}");
      ExitCode::FAILURE
    }
  }
}
