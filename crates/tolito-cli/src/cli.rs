use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tolito",
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install packages by name or git URL
    #[command(short_flag = 'S', long_flag = "sync", arg_required_else_help = true)]
    Sync {
        /// Only install prebuilt packages from the configured repositories
        #[arg(short = 'r', long = "repo")]
        repo_only: bool,

        /// Package names or git URLs
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Remove packages along with their unneeded dependencies
    #[command(short_flag = 'R', long_flag = "remove", arg_required_else_help = true)]
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Show whether packages are installed and where they came from
    #[command(short_flag = 'Q', long_flag = "query", arg_required_else_help = true)]
    Query {
        /// Show the package manager's details for each package
        #[arg(short, long)]
        info: bool,

        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Check tracked packages for newer versions and install them
    #[clap(name = "update", visible_alias = "u")]
    Update {
        /// Only check this package
        package: Option<String>,
    },

    /// Clear the build directory and downloaded packages
    Clean,

    /// Print the configuration file to stdout
    Config,

    /// Generate a default config file
    #[clap(name = "defconfig")]
    DefConfig,
}
