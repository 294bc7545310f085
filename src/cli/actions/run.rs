use crate::cli::actions::Action;
use crate::cli::globals::ServiceConfig;
use crate::service::TwoFactorService;
use anyhow::Result;

/// Execute the requested action against the orchestrator and print the
/// outcome for the operator.
///
/// # Errors
/// Propagates provider, store and orchestrator errors.
pub async fn handle(action: Action, config: &ServiceConfig) -> Result<()> {
    let service = TwoFactorService::new();

    match action {
        Action::Providers => {
            for descriptor in TwoFactorService::providers() {
                println!(
                    "{:<8} {} ({})",
                    descriptor.id, descriptor.display_name, descriptor.info_url
                );
            }
        }
        Action::CheckKey { provider } => {
            TwoFactorService::check_api_key(provider, config).await?;
            println!("{}: account check passed", provider.as_str());
        }
        Action::Enroll {
            username,
            provider,
            input,
        } => {
            let provisioning = service.enroll(&username, provider, &input, config).await?;
            println!("{username} enrolled with {}", provider.as_str());
            if let Some(provisioning) = provisioning {
                println!("secret:  {}", provisioning.secret);
                println!("uri:     {}", provisioning.otpauth_uri);
                println!("qr:      {}", provisioning.qr_image_url);
            }
        }
        Action::Verify { username, token } => {
            service.verify(&username, &token, config).await?;
            println!("token accepted for {username}");
        }
        Action::Remove { username } => {
            service.unenroll(&username, config).await?;
            println!("{username} is no longer enrolled");
        }
        Action::Status { username } => match service.status(&username, config).await? {
            Some(record) => {
                let provider = record
                    .provider
                    .map_or("unknown", crate::provider::ProviderKind::as_str);
                println!("{username} is enrolled with {provider}");
            }
            None => println!("{username} is not enrolled"),
        },
    }

    Ok(())
}
