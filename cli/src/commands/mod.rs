use std::path::PathBuf;

use clap::Subcommand;

mod init;
mod remote;
mod serve;

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Write a config file with application credentials
    Init {
        #[arg(long, env = "DISCORD_APPLICATION_ID")]
        application_id: Option<String>,
        #[arg(long, env = "DISCORD_PUBLIC_KEY")]
        public_key: Option<String>,
        #[arg(long, env = "DISCORD_BOT_TOKEN")]
        token: Option<String>,
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        force: bool,
    },

    /// Serve the interaction webhook with the built-in commands
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },

    /// Overwrite the remote command set with the built-in commands
    Sync {
        /// Sync guild commands instead of global ones
        #[arg(long)]
        guild: Option<String>,
    },

    /// Print the commands currently registered on the platform
    List {
        #[arg(long)]
        guild: Option<String>,
        #[arg(long, default_value_t = false)]
        with_localizations: bool,
    },

    /// Measure the round trip to the platform API
    Latency,
}

impl Commands {
    pub async fn run(self, config_path: Option<PathBuf>) -> Result<(), String> {
        let config_path = config_path.as_deref();
        match self {
            Commands::Init {
                application_id,
                public_key,
                token,
                bind,
                force,
            } => init::handle_init(config_path, application_id, public_key, token, bind, force),
            Commands::Serve { bind } => serve::handle_serve(config_path, bind).await,
            Commands::Sync { guild } => remote::handle_sync(config_path, guild).await,
            Commands::List {
                guild,
                with_localizations,
            } => remote::handle_list(config_path, guild, with_localizations).await,
            Commands::Latency => remote::handle_latency(config_path).await,
        }
    }
}
