use crate::cli::actions::Action;
use crate::cli::commands::{
    ARG_API_KEY, ARG_CREDENTIAL_FILE, ARG_PROVIDER, ARG_TEST_MODE, ARG_TOKEN, ARG_USER,
};
use crate::cli::globals::ServiceConfig;
use crate::provider::forms::FormInput;
use crate::provider::ProviderKind;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

fn username(matches: &clap::ArgMatches) -> Result<String> {
    matches
        .get_one::<String>(ARG_USER)
        .cloned()
        .context("missing required argument: --user")
}

fn provider(matches: &clap::ArgMatches) -> Result<ProviderKind> {
    matches
        .get_one::<ProviderKind>(ARG_PROVIDER)
        .copied()
        .context("missing required argument: --provider")
}

/// Collect the optional enrollment form fields into provider input.
fn enroll_input(matches: &clap::ArgMatches) -> FormInput {
    let mut input = FormInput::new();
    for (arg, field) in [
        ("secret", "secret"),
        ("email", "email"),
        ("country-code", "country_code"),
        ("phone", "phone"),
    ] {
        if let Some(value) = matches.get_one::<String>(arg) {
            input.set(field, value.clone());
        }
    }
    input
}

/// Build the service configuration and the requested action from parsed
/// arguments.
///
/// # Errors
/// Returns an error when a subcommand is missing an argument clap marks
/// required (defensively; clap enforces these upstream).
pub fn handler(matches: &clap::ArgMatches) -> Result<(ServiceConfig, Action)> {
    let config = ServiceConfig::new(
        SecretString::from(
            matches
                .get_one::<String>(ARG_API_KEY)
                .cloned()
                .unwrap_or_default(),
        ),
        matches.get_flag(ARG_TEST_MODE),
        matches.get_one::<PathBuf>(ARG_CREDENTIAL_FILE).cloned(),
    );

    let action = match matches.subcommand() {
        Some(("providers", _)) => Action::Providers,
        Some(("check-key", sub)) => Action::CheckKey {
            provider: provider(sub)?,
        },
        Some(("enroll", sub)) => Action::Enroll {
            username: username(sub)?,
            provider: provider(sub)?,
            input: enroll_input(sub),
        },
        Some(("verify", sub)) => Action::Verify {
            username: username(sub)?,
            token: sub
                .get_one::<String>(ARG_TOKEN)
                .cloned()
                .context("missing required argument: --token")?,
        },
        Some(("remove", sub)) => Action::Remove {
            username: username(sub)?,
        },
        Some(("status", sub)) => Action::Status {
            username: username(sub)?,
        },
        _ => anyhow::bail!("no subcommand provided"),
    };

    Ok((config, action))
}
