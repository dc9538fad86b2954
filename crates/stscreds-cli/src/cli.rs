use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use stscreds_core::credentials::SessionField;

#[derive(Parser)]
#[command(name = "stscreds")]
#[command(version, about = "Keep MFA-backed AWS session credentials fresh")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Credentials profile to use
    #[arg(long, global = true, env = "STSCREDS_PROFILE")]
    pub profile: Option<String>,

    /// Requested session duration, e.g. 12h or 90m
    #[arg(long, global = true, value_parser = parse_duration)]
    pub expires: Option<Duration>,

    /// Region for the session-token service
    #[arg(long, global = true, env = "STSCREDS_REGION")]
    pub region: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialise stscreds. Creates ~/.stscreds/credentials.
    Init,

    /// Authenticates with AWS and requests a temporary session token.
    Auth(AuthArgs),

    /// Read a key from ~/.aws/credentials and print it to stdout, refreshing if expired.
    Read(ReadArgs),

    /// Print details about the current user and their MFA devices.
    Whoami,
}

#[derive(Args)]
pub struct TokenArgs {
    /// MFA code to use instead of prompting
    #[arg(long, env = "STSCREDS_MFA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args)]
pub struct AuthArgs {
    /// Additionally write environment variable exports to stdout
    #[arg(long)]
    pub output_env: bool,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args)]
pub struct ReadArgs {
    /// Key to read: aws_access_key_id, aws_secret_access_key, aws_session_token
    #[arg(value_parser = parse_field)]
    pub key: SessionField,

    #[command(flatten)]
    pub token: TokenArgs,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    stscreds_core::config::parse_duration(raw).map_err(|e| e.to_string())
}

fn parse_field(raw: &str) -> Result<SessionField, String> {
    raw.parse().map_err(|e: stscreds_core::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read_with_global_flags() {
        let cli = Cli::try_parse_from([
            "stscreds",
            "--profile",
            "work",
            "read",
            "aws_session_token",
            "--expires",
            "2h",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("work"));
        assert_eq!(cli.expires, Some(Duration::from_secs(7_200)));
        match cli.command {
            Commands::Read(args) => assert_eq!(args.key, SessionField::SessionToken),
            _ => panic!("expected read"),
        }
    }

    #[test]
    fn test_parse_auth_output_env() {
        let cli = Cli::try_parse_from(["stscreds", "auth", "--output-env"]).unwrap();
        match cli.command {
            Commands::Auth(args) => assert!(args.output_env),
            _ => panic!("expected auth"),
        }
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert!(Cli::try_parse_from(["stscreds", "read", "region"]).is_err());
        assert!(Cli::try_parse_from(["stscreds", "--expires", "soon", "whoami"]).is_err());
    }
}
