pub mod logging;

use crate::provider::ProviderKind;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub const ARG_API_KEY: &str = "api-key";
pub const ARG_TEST_MODE: &str = "test-mode";
pub const ARG_CREDENTIAL_FILE: &str = "credential-file";
pub const ARG_PROVIDER: &str = "provider";
pub const ARG_USER: &str = "user";
pub const ARG_TOKEN: &str = "token";

#[must_use]
pub fn validator_provider() -> ValueParser {
    ValueParser::from(
        move |id: &str| -> std::result::Result<ProviderKind, String> {
            ProviderKind::resolve(id).map_err(|e| e.to_string())
        },
    )
}

fn user_arg() -> Arg {
    Arg::new(ARG_USER)
        .short('u')
        .long("user")
        .help("Username the operation applies to")
        .required(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("twofactor")
        .about("Pluggable two-factor authentication")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_KEY)
                .short('k')
                .long("api-key")
                .help("Account API key for the remote verification service")
                .env("TWOFACTOR_API_KEY")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TEST_MODE)
                .long("test-mode")
                .help("Send remote verification traffic to the sandbox endpoint")
                .env("TWOFACTOR_TEST_MODE")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_CREDENTIAL_FILE)
                .short('f')
                .long("credential-file")
                .help("Path of the credential store; omit to disable the store")
                .env("TWOFACTOR_CREDENTIAL_FILE")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand(Command::new("providers").about("List the available second-factor providers"))
        .subcommand(
            Command::new("check-key")
                .about("Check the account prerequisites for a provider")
                .arg(
                    Arg::new(ARG_PROVIDER)
                        .short('p')
                        .long("provider")
                        .help("Provider id (totp or authy)")
                        .required(true)
                        .value_parser(validator_provider()),
                ),
        )
        .subcommand(
            Command::new("enroll")
                .about("Enroll a user with a provider")
                .arg(user_arg())
                .arg(
                    Arg::new(ARG_PROVIDER)
                        .short('p')
                        .long("provider")
                        .help("Provider id (totp or authy)")
                        .required(true)
                        .value_parser(validator_provider()),
                )
                .arg(
                    Arg::new("secret")
                        .long("secret")
                        .help("Base32 secret for time-based codes; omit to generate one"),
                )
                .arg(
                    Arg::new("email")
                        .long("email")
                        .help("Email address for push verification"),
                )
                .arg(
                    Arg::new("country-code")
                        .long("country-code")
                        .help("Phone country code for push verification"),
                )
                .arg(
                    Arg::new("phone")
                        .long("phone")
                        .help("Phone number for push verification"),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify a submitted token for a user")
                .arg(user_arg())
                .arg(
                    Arg::new(ARG_TOKEN)
                        .short('t')
                        .long("token")
                        .help("Token to verify")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Drop a user's enrollment")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Show a user's enrollment state")
                .arg(user_arg()),
        );

    logging::with_args(command)
}
