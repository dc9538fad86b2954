//! One function per subcommand.
//!
//! Prompts and progress go to stderr; stdout only carries the values a
//! command is defined to print.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use stscreds_core::credentials::{read_fresh_field, verify_keys, BootstrapKeys};
use stscreds_core::issuer::{
    AwsSessionIssuer, Identity, MfaDevice, PromptTokenSource, SessionIssuer, StaticTokenSource, TokenSource,
};
use stscreds_core::{Lifecycle, Settings};
use tracing::warn;

use crate::cli::{AuthArgs, ReadArgs, TokenArgs};

/// Environment variables that take precedence over the shared credentials file.
const OVERRIDING_ENV_VARS: [&str; 2] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"];

pub async fn init(settings: Settings) -> Result<()> {
    warn_on_environment_variables();

    let issuer = AwsSessionIssuer::new(&settings.region);
    let keys = read_keys_from_prompt().context("Failed to read AWS keys")?;
    let verified = verify_keys(&issuer, keys).await?;

    let bootstrap = settings.bootstrap();
    bootstrap.initialise(&verified)?;

    eprintln!(
        "Verified keys for {}. Successfully wrote {}",
        verified.identity().user_name,
        bootstrap.path().display()
    );
    Ok(())
}

pub async fn auth(settings: Settings, args: AuthArgs) -> Result<()> {
    let issuer = AwsSessionIssuer::new(&settings.region);
    let mut lifecycle = Lifecycle::new(settings, issuer, token_source(args.token));

    let credential = lifecycle.authenticate().await?;
    eprintln!("Wrote credentials to {}", lifecycle.session().path().display());

    if args.output_env {
        print!("{}", credential.export_statements());
    }
    Ok(())
}

pub async fn read(settings: Settings, args: ReadArgs) -> Result<()> {
    let issuer = AwsSessionIssuer::new(&settings.region);
    let mut lifecycle = Lifecycle::new(settings, issuer, token_source(args.token));

    let value = lifecycle
        .run(|bootstrap, session| read_fresh_field(bootstrap, session, args.key, Utc::now()))
        .await
        .with_context(|| format!("Failed to read {}", args.key))?;

    print!("{}", value);
    io::stdout().flush()?;
    Ok(())
}

pub async fn whoami(settings: Settings) -> Result<()> {
    let issuer = AwsSessionIssuer::new(&settings.region);
    let mut lifecycle = Lifecycle::new(settings, issuer, StaticTokenSource::default());

    let keys = lifecycle.bootstrap_keys()?;
    let identity = lifecycle.issuer().identify(&keys).await?;
    let devices = lifecycle.issuer().mfa_devices(&keys, &identity).await?;

    print!("{}", describe(&identity, &devices));
    Ok(())
}

fn token_source(args: TokenArgs) -> Box<dyn TokenSource> {
    match args.token {
        Some(token) => Box::new(StaticTokenSource::new(token)),
        None => Box::new(PromptTokenSource::stdio()),
    }
}

fn warn_on_environment_variables() {
    for name in OVERRIDING_ENV_VARS {
        if std::env::var_os(name).is_some_and(|v| !v.is_empty()) {
            warn!(
                "{} environment variable set, may override sts credentials in ~/.aws/credentials; \
                 it should probably be removed from your environment (check ~/.bash_profile etc.)",
                name
            );
        }
    }
}

fn read_keys_from_prompt() -> Result<BootstrapKeys> {
    eprint!("AWS Access Key: ");
    io::stderr().flush()?;
    let mut access_key = String::new();
    io::stdin().lock().read_line(&mut access_key)?;

    let secret_key = rpassword::prompt_password("AWS Secret Access Key: ")?;

    Ok(BootstrapKeys::new(
        access_key.trim_matches([' ', '\r', '\n']),
        secret_key.trim_matches([' ', '\r', '\n']),
    ))
}

fn describe(identity: &Identity, devices: &[MfaDevice]) -> String {
    let mut out = format!(
        "User: {}\nUser ID: {}\nARN: {}\n",
        identity.user_name, identity.user_id, identity.arn
    );
    if let Some(created) = identity.created_at {
        out.push_str(&format!("Created: {}\n", created.to_rfc3339()));
    }
    for device in devices {
        out.push_str(&format!("MFA device: {}", device.serial_number));
        if let Some(enabled) = device.enabled_at {
            out.push_str(&format!(" (enabled {})", enabled.to_rfc3339()));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_describe() {
        let identity = Identity {
            user_name: "alice".into(),
            user_id: "AIDAEXAMPLE".into(),
            arn: "arn:aws:iam::123456789012:user/alice".into(),
            created_at: None,
        };
        let devices = vec![MfaDevice {
            serial_number: "arn:aws:iam::123456789012:mfa/alice".into(),
            user_name: "alice".into(),
            enabled_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        }];

        let out = describe(&identity, &devices);
        assert!(out.starts_with("User: alice\n"));
        assert!(!out.contains("Created"));
        assert!(out.contains(
            "MFA device: arn:aws:iam::123456789012:mfa/alice (enabled 2024-01-02T03:04:05+00:00)\n"
        ));
    }
}
