use crate::{
    apple::{
        codesigning::{self, CodesigningError},
        sdk::XcodebuildSdks,
        simctl::{self, DeviceListError, SimctlCatalog},
        snapshot::{
            command_string, ConfigFragments, FragmentError, GenerateError, TestCommandGenerator,
        },
        NAME,
    },
    config::{self, Config},
    env::{Env, Error as EnvError, ExplicitEnv as _},
    opts::SigningStyle,
    util::cli::{self, Exec, GlobalFlags, Report, Reportable, TextWrapper},
    DuctExpressionExt,
};
use colored::Colorize as _;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(bin_name = cli::bin_name(NAME), settings = cli::SETTINGS)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, StructOpt)]
pub struct GenerateArgs {
    #[structopt(
        short = "d",
        long = "device",
        help = "Simulator to run on; repeat for several (overrides `devices`)",
        number_of_values = 1
    )]
    devices: Vec<String>,
    #[structopt(long = "ios-version", help = "OS version for every device (overrides `ios-version`)")]
    ios_version: Option<String>,
    #[structopt(long = "language", help = "Passed to the tests as `FASTLANE_LANGUAGE`")]
    language: Option<String>,
    #[structopt(long = "locale", help = "Passed to the tests as `FASTLANE_LOCALE`")]
    locale: Option<String>,
    #[structopt(
        long = "log-path",
        help = "File the raw `xcodebuild` output is teed to (overrides `log-path`)",
        parse(from_os_str)
    )]
    log_path: Option<PathBuf>,
}

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "command", about = "Prints the `xcodebuild` test command")]
    Print {
        #[structopt(flatten)]
        args: GenerateArgs,
    },
    #[structopt(name = "run", about = "Runs the `xcodebuild` test command")]
    Run {
        #[structopt(flatten)]
        args: GenerateArgs,
    },
    #[structopt(name = "list", about = "Lists available simulators")]
    List,
    #[structopt(
        name = "codesigning",
        about = "Sets `ProvisioningStyle` for every target in an Xcode project"
    )]
    Codesigning {
        #[structopt(
            long = "path",
            help = "Path to the `.xcodeproj` (not the workspace)",
            parse(from_os_str)
        )]
        path: PathBuf,
        #[structopt(
            long = "automatic",
            help = "Use automatic signing instead of manual",
            parse(from_flag = SigningStyle::from_flag),
        )]
        style: SigningStyle,
    },
}

#[derive(Debug)]
pub enum Error {
    EnvInitFailed(EnvError),
    ConfigFailed(config::LoadError),
    ConfigInvalid(config::Error),
    CurrentDirFailed(std::io::Error),
    FragmentsFailed(FragmentError),
    DeviceListFailed(DeviceListError),
    GenerateFailed(GenerateError),
    RunFailed(std::io::Error),
    TestsFailed { code: Option<i32> },
    CodesigningFailed(CodesigningError),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        match self {
            Self::EnvInitFailed(err) => err.report(),
            Self::ConfigFailed(err) => err.report(),
            Self::ConfigInvalid(err) => err.report(),
            Self::CurrentDirFailed(err) => {
                Report::error("Failed to get current working directory", err)
            }
            Self::FragmentsFailed(err) => {
                Report::error("Failed to build `xcodebuild` options", err)
            }
            Self::DeviceListFailed(err) => err.report(),
            Self::GenerateFailed(err) => err.report(),
            Self::RunFailed(err) => Report::error("Failed to run `xcodebuild`", err),
            Self::TestsFailed { code } => Report::error(
                "Tests failed",
                match code {
                    Some(code) => format!("`xcodebuild` exited with status {}.", code),
                    None => "`xcodebuild` was terminated by a signal.".to_owned(),
                },
            ),
            Self::CodesigningFailed(err) => err.report(),
        }
    }
}

fn load_config(args: &GenerateArgs) -> Result<Config, Error> {
    let cwd = std::env::current_dir().map_err(Error::CurrentDirFailed)?;
    let mut config = Config::load(&cwd).map_err(Error::ConfigFailed)?;
    config.override_devices(args.devices.clone());
    config.override_ios_version(args.ios_version.clone());
    config
        .override_log_path(args.log_path.clone(), &cwd)
        .map_err(Error::ConfigInvalid)?;
    Ok(config)
}

fn generate(config: &Config, env: &Env, args: &GenerateArgs) -> Result<Vec<String>, Error> {
    let fragments = ConfigFragments::new(config).map_err(Error::FragmentsFailed)?;
    let catalog = SimctlCatalog::detect(env).map_err(Error::DeviceListFailed)?;
    let latest = XcodebuildSdks::new(env);
    TestCommandGenerator::from_config(config, &fragments, &catalog, &latest)
        .generate(
            config.devices(),
            args.language.as_deref(),
            args.locale.as_deref(),
            config.log_path(),
        )
        .map_err(Error::GenerateFailed)
}

impl Exec for Input {
    type Report = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, wrapper: &TextWrapper) -> Result<(), Self::Report> {
        let Self {
            flags: GlobalFlags { noise_level },
            command,
        } = self;
        let env = Env::new().map_err(Error::EnvInitFailed)?;
        match command {
            Command::Print { args } => {
                let config = load_config(&args)?;
                println!("{}", command_string(&generate(&config, &env, &args)?));
                Ok(())
            }
            Command::Run { args } => {
                let config = load_config(&args)?;
                let parts = generate(&config, &env, &args)?;
                let command = command_string(&parts);
                if noise_level.pedantic() {
                    for part in &parts {
                        println!("  {}", part.dimmed());
                    }
                }
                if !noise_level.polite() {
                    println!("{} {}", "Running".bright_green().bold(), command);
                }
                // `set -o pipefail` needs a shell that knows about it.
                let output = duct::cmd("bash", ["-c", command.as_str()])
                    .dir(config.root_dir())
                    .vars(env.explicit_env())
                    .unchecked()
                    .run()
                    .map_err(Error::RunFailed)?;
                if output.status.success() {
                    Report::victory("Tests passed", "").print(wrapper);
                    Ok(())
                } else {
                    Err(Error::TestsFailed {
                        code: output.status.code(),
                    })
                }
            }
            Command::List => {
                let simulators = simctl::device_list(&env).map_err(Error::DeviceListFailed)?;
                if simulators.is_empty() {
                    println!("  -- none --");
                }
                for (index, simulator) in simulators.iter().enumerate() {
                    println!(
                        "  [{}] {} {}",
                        index.to_string().green(),
                        simulator,
                        simulator.state().dimmed()
                    );
                }
                Ok(())
            }
            Command::Codesigning { path, style } => {
                let count = codesigning::update_project_automatic_codesigning(&path, style)
                    .map_err(Error::CodesigningFailed)?;
                Report::victory(
                    format!("Successfully set `ProvisioningStyle` to {}", style),
                    format!("Updated {} target(s) in {:?}.", count, path),
                )
                .print(wrapper);
                Ok(())
            }
        }
    }
}
