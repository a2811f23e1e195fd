//! Profile resolution with CLI flag overrides.
//!
//! Precedence: flags > `BODYCTL_*` env > profile > `[defaults]`.

use bodyctl_config::{Config, ConfigError, Profile, load_config, profile_to_controller_config};
use bodyctl_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use bodyctl_config::{config_path, load_config_or_default, save_config};

/// Name of the profile this invocation targets.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref())
}

/// Load the config file and resolve the active profile into a
/// `ControllerConfig`.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);
    let profile = cfg.profile(&profile_name).map_err(|e| match e {
        ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
            name,
            available: available_profiles(&cfg),
        },
        other => other.into(),
    })?;

    let profile = apply_overrides(profile, global);
    tracing::debug!(profile = %profile_name, url = %profile.url, "resolved profile");
    Ok(profile_to_controller_config(&profile, &cfg.defaults)?)
}

/// Layer `--endpoint`, `--insecure` and `--timeout` over a profile.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref endpoint) = global.endpoint {
        profile.url.clone_from(endpoint);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    names.join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["bodyctl"];
        argv.extend_from_slice(args);
        argv.push("info");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile_values() {
        let profile = Profile {
            url: "http://bench.local:8080/api".into(),
            timeout: Some(2),
            ..Profile::default()
        };
        let opts = global(&["--endpoint", "http://10.0.0.5/api", "-k", "--timeout", "9"]);
        let resolved = apply_overrides(profile, &opts);

        assert_eq!(resolved.url, "http://10.0.0.5/api");
        assert_eq!(resolved.insecure, Some(true));
        assert_eq!(resolved.timeout, Some(9));
    }

    #[test]
    fn absent_flags_keep_profile_values() {
        let profile = Profile {
            timeout: Some(2),
            ..Profile::default()
        };
        let resolved = apply_overrides(profile.clone(), &global(&[]));
        assert_eq!(resolved, profile);
    }

    #[test]
    fn available_profiles_are_sorted() {
        let mut cfg = Config::default();
        assert_eq!(available_profiles(&cfg), "(none)");
        cfg.profiles.insert("rig".into(), Profile::default());
        cfg.profiles.insert("bench".into(), Profile::default());
        assert_eq!(available_profiles(&cfg), "bench, rig");
    }
}
