//! Config command handlers.

use std::io::IsTerminal;

use dialoguer::{Confirm, Input};

use bodyctl_config::{Config, Profile};
use bodyctl_core::DEFAULT_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

fn prompt_err(e: dialoguer::Error) -> CliError {
    CliError::Io(std::io::Error::other(e))
}

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("<unrenderable config: {e}>"))
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init (interactive wizard) ───────────────────────────────
        ConfigCommand::Init => {
            if !std::io::stdin().is_terminal() {
                return Err(CliError::NonInteractiveRequiresYes {
                    action: "config init".into(),
                });
            }

            let config_path = config::config_path();
            eprintln!("bodyctl setup\n");
            eprintln!("   Config will be written to {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("API root URL")
                .default(global.endpoint.clone().unwrap_or_else(|| DEFAULT_URL.into()))
                .validate_with(|input: &String| validate_url(input).map(|_| ()))
                .interact_text()
                .map_err(prompt_err)?;

            let insecure = url.starts_with("https")
                && Confirm::new()
                    .with_prompt("Accept self-signed TLS certificates?")
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?;

            let events = Confirm::new()
                .with_prompt("Subscribe to the push event stream in `watch`?")
                .default(true)
                .interact()
                .map_err(prompt_err)?;

            let profile = Profile {
                url,
                insecure: insecure.then_some(true),
                events: Some(events),
                ..Profile::default()
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: bodyctl health");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                c.profiles.keys().cloned().collect::<Vec<_>>().join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, &value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.profile_name(None);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: bodyctl config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if *name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── Path ───────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

fn validate_url(input: &str) -> Result<url::Url, String> {
    let url: url::Url = input.parse().map_err(|e| format!("invalid URL: {e}"))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(format!("unsupported scheme '{}'", url.scheme()))
    }
}

fn parse<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply one `config set` assignment to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: &str) -> Result<(), CliError> {
    const BOOL: &str = "'true' or 'false'";
    const NUMBER: &str = "a non-negative integer";

    match key {
        "url" | "endpoint" => {
            validate_url(value).map_err(|reason| CliError::Validation {
                field: "url".into(),
                reason,
            })?;
            profile.url = value.into();
        }
        "events_path" | "events-path" => profile.events_path = Some(value.into()),
        "events" => profile.events = Some(parse("events", value, BOOL)?),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse("insecure", value, BOOL)?),
        "timeout" => profile.timeout = Some(parse("timeout", value, NUMBER)?),
        "retries" => profile.retries = Some(parse("retries", value, NUMBER)?),
        "retry_delay_ms" | "retry-delay-ms" => {
            profile.retry_delay_ms = Some(parse("retry_delay_ms", value, NUMBER)?);
        }
        "reconnect_delay_ms" | "reconnect-delay-ms" => {
            profile.reconnect_delay_ms = Some(parse("reconnect_delay_ms", value, NUMBER)?);
        }
        "reconnect_max_delay_ms" | "reconnect-max-delay-ms" => {
            profile.reconnect_max_delay_ms =
                Some(parse("reconnect_max_delay_ms", value, NUMBER)?);
        }
        "reconnect_max_retries" | "reconnect-max-retries" => {
            profile.reconnect_max_retries = Some(parse("reconnect_max_retries", value, NUMBER)?);
        }
        "refresh_interval" | "refresh-interval" => {
            profile.refresh_interval = Some(parse("refresh_interval", value, NUMBER)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: url, events_path, events, \
                     ca_cert, insecure, timeout, retries, retry_delay_ms, reconnect_delay_ms, \
                     reconnect_max_delay_ms, reconnect_max_retries, refresh_interval"
                ),
            });
        }
    }
    Ok(())
}
