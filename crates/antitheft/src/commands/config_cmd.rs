//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

fn prompt_secret(prompt: &str, field: &str) -> Result<String, CliError> {
    let value = rpassword::prompt_password(prompt)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(value)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = antitheft_config::config_path();
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = antitheft_config::load_config()?.redacted();
            let text = cfg.to_toml()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| text.clone(),
                |c| {
                    let mut names: Vec<_> = c.profiles.keys().cloned().collect();
                    names.sort();
                    names.join("\n")
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = antitheft_config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let password = prompt_secret("Service account password: ", "password")?;
            antitheft_config::store_password(&profile_name, &password)?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }

        ConfigCommand::SetDeviceToken { device } => {
            let cfg = antitheft_config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = prompt_secret("Device access token: ", "device token")?;
            antitheft_config::store_device_token(&profile_name, &device, &token)?;
            if !global.quiet {
                eprintln!("✓ Token for device {device} stored in system keyring");
            }
            Ok(())
        }
    }
}
