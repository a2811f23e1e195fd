//! Clap derive structures for the `bodyctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared value types.
//! This file is also compiled by `build.rs` for man page generation, so it
//! only depends on clap, clap_complete and humantime.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bodyctl -- command-line client for vehicle body controllers
#[derive(Debug, Parser)]
#[command(
    name = "bodyctl",
    version,
    about = "Control vehicle doors, windows, lights and seat from the command line",
    long_about = "Command-line client for a vehicle body control service.\n\n\
        Sends commands over the HTTP command API (with retry and backoff)\n\
        and follows live state over the server-sent event stream.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "BODYCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile), e.g. http://localhost:8080/api
    #[arg(long, short = 'e', env = "BODYCTL_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BODYCTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BODYCTL_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds (overrides profile)
    #[arg(long, env = "BODYCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Shared value types ───────────────────────────────────────────────

/// A door or window position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    #[value(alias = "fl")]
    FrontLeft,
    #[value(alias = "fr")]
    FrontRight,
    #[value(alias = "rl")]
    RearLeft,
    #[value(alias = "rr")]
    RearRight,
}

/// A single door, or all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DoorTarget {
    #[value(alias = "fl")]
    FrontLeft,
    #[value(alias = "fr")]
    FrontRight,
    #[value(alias = "rl")]
    RearLeft,
    #[value(alias = "rr")]
    RearRight,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HeadlightArg {
    Off,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndicatorArg {
    Off,
    Left,
    Right,
    Hazard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnOffArg {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeatAxisArg {
    /// Fore/aft travel
    #[value(alias = "slide")]
    Translation,
    /// Backrest angle
    Recline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeatDirectionArg {
    #[value(alias = "positive")]
    Forward,
    #[value(alias = "negative")]
    Backward,
    Stop,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lock, unlock and inspect doors
    #[command(alias = "doors", alias = "d")]
    Door(DoorArgs),

    /// Move and inspect windows
    #[command(alias = "windows", alias = "w")]
    Window(WindowArgs),

    /// Switch headlights, indicators and position lights
    #[command(alias = "lights", alias = "l")]
    Light(LightArgs),

    /// Adjust the seat and its memory presets
    Seat(SeatArgs),

    /// Poll every door and window and show the reconciled state
    #[command(alias = "st")]
    Status,

    /// Show service name, version and endpoints
    Info,

    /// Check service health
    Health,

    /// Follow live state changes from the event stream
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DOORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DoorArgs {
    #[command(subcommand)]
    pub command: DoorCommand,
}

#[derive(Debug, Subcommand)]
pub enum DoorCommand {
    /// Lock a door (or all doors)
    Lock {
        /// Door to lock
        door: DoorTarget,
    },

    /// Unlock a door (or all doors)
    Unlock {
        /// Door to unlock
        door: DoorTarget,
    },

    /// Read lock state
    Status {
        /// Door to read (default: all)
        door: Option<PositionArg>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WINDOWS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WindowArgs {
    #[command(subcommand)]
    pub command: WindowCommand,
}

#[derive(Debug, Subcommand)]
pub enum WindowCommand {
    /// Move a window to an absolute position
    Set {
        window: PositionArg,

        /// Percent open (0 = closed, 100 = fully open)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        position: u8,
    },

    /// Start moving a window up
    Up { window: PositionArg },

    /// Start moving a window down
    Down { window: PositionArg },

    /// Stop a moving window
    Stop { window: PositionArg },

    /// Read window positions
    Status {
        /// Window to read (default: all)
        window: Option<PositionArg>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LIGHTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LightArgs {
    #[command(subcommand)]
    pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
    /// Set headlight mode
    #[command(alias = "head")]
    Headlight { mode: HeadlightArg },

    /// Set indicator mode
    #[command(alias = "blinker")]
    Indicator { mode: IndicatorArg },

    /// Switch position lights
    #[command(alias = "pos")]
    Position { mode: OnOffArg },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SEAT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SeatArgs {
    #[command(subcommand)]
    pub command: SeatCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeatCommand {
    /// Start or stop seat movement on one axis
    Move {
        axis: SeatAxisArg,
        direction: SeatDirectionArg,
    },

    /// Recall a memory preset
    Recall {
        /// Preset number (1-3)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        preset: u8,
    },

    /// Save the current position to a memory preset
    Save {
        /// Preset number (1-3)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        preset: u8,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this long (e.g. "30s", "5m"); default: until Ctrl-C
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Also poll every door and window at this interval (seconds)
    #[arg(long)]
    pub refresh: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (url, events_path, events, insecure, timeout, retries, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
