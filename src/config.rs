/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD, or the
/// data directories, whichever has it first.
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub start_level: usize,
}

/// Frame pacing and animation lengths, all in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub move_ms: u32,
    pub stairs_ms: u32,
    pub teleport_ms: u32,
    pub bump_ms: u32,
    pub message_ms: u32,
    pub sequence_step_ms: u32,
}

/// Portal/crate interaction policy. All four enabled is the canonical rule set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RulesConfig {
    /// Pushing the portal exit ignores depth differences.
    pub tp_exit_ignores_depth: bool,
    /// Crates may be pushed into the portal entry (and the exit onto a crate).
    pub can_tp_crate: bool,
    /// A crate sent through the portal reverses its direction.
    pub switch_tp_after_crate: bool,
    /// A teleported crate slides one more cell past the exit.
    pub extra_tp_crate_move: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            tp_exit_ignores_depth: true,
            can_tp_crate: true,
            switch_tp_after_crate: true,
            extra_tp_crate_move: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub undo: Vec<String>,
    pub reset: Vec<String>,
    pub confirm: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_move")]
    move_ms: u32,
    #[serde(default = "default_stairs")]
    stairs_ms: u32,
    #[serde(default = "default_teleport")]
    teleport_ms: u32,
    #[serde(default = "default_bump")]
    bump_ms: u32,
    #[serde(default = "default_message")]
    message_ms: u32,
    #[serde(default = "default_sequence_step")]
    sequence_step_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_true")]
    tp_exit_ignores_depth: bool,
    #[serde(default = "default_true")]
    can_tp_crate: bool,
    #[serde(default = "default_true")]
    switch_tp_after_crate: bool,
    #[serde(default = "default_true")]
    extra_tp_crate_move: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_undo")]
    undo: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    start_level: usize,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_move() -> u32 { 110 }
fn default_stairs() -> u32 { 450 }
fn default_teleport() -> u32 { 220 }
fn default_bump() -> u32 { 120 }
fn default_message() -> u32 { 2000 }
fn default_sequence_step() -> u32 { 1800 }
fn default_true() -> bool { true }

fn default_undo() -> Vec<String> { vec!["B".into(), "L1".into()] }
fn default_reset() -> Vec<String> { vec!["Y".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            move_ms: default_move(),
            stairs_ms: default_stairs(),
            teleport_ms: default_teleport(),
            bump_ms: default_bump(),
            message_ms: default_message(),
            sequence_step_ms: default_sequence_step(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            tp_exit_ignores_depth: true,
            can_tp_crate: true,
            switch_tp_after_crate: true,
            extra_tp_crate_move: true,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            undo: default_undo(),
            reset: default_reset(),
            confirm: default_confirm(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            start_level: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TomlTiming::default().into()
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms,
            move_ms: t.move_ms,
            stairs_ms: t.stairs_ms,
            teleport_ms: t.teleport_ms,
            bump_ms: t.bump_ms,
            message_ms: t.message_ms,
            sequence_step_ms: t.sequence_step_ms,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        // Resolve levels directory against the search dirs
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut cfg = GameConfig::from_toml(toml_cfg);
        cfg.levels_dir = levels_dir;
        cfg
    }

    /// Parse config text. Errors fall back to defaults with a warning.
    #[cfg(test)]
    pub fn from_str(text: &str) -> Self {
        GameConfig::from_toml(parse_toml(text))
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        GameConfig {
            timing: toml_cfg.timing.into(),
            rules: RulesConfig {
                tp_exit_ignores_depth: toml_cfg.rules.tp_exit_ignores_depth,
                can_tp_crate: toml_cfg.rules.can_tp_crate,
                switch_tp_after_crate: toml_cfg.rules.switch_tp_after_crate,
                extra_tp_crate_move: toml_cfg.rules.extra_tp_crate_move,
            },
            gamepad: GamepadConfig {
                undo: toml_cfg.gamepad.undo,
                reset: toml_cfg.gamepad.reset,
                confirm: toml_cfg.gamepad.confirm,
                quit: toml_cfg.gamepad.quit,
            },
            levels_dir: PathBuf::from(toml_cfg.general.levels_dir),
            start_level: toml_cfg.general.start_level,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    if let Some(xdg) = data_home() {
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/stairwell");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// `~/.local/share/stairwell`, if HOME is set.
pub fn data_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share/stairwell"))
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::info!("loaded config from {}", path.display());
                return parse_toml(&text);
            }
            Err(e) => {
                tracing::warn!("could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("config.toml parse error, using defaults: {e}");
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_str("");
        assert_eq!(cfg.timing, TimingConfig::default());
        assert_eq!(cfg.rules, RulesConfig::default());
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
        assert_eq!(cfg.start_level, 0);
        assert_eq!(cfg.gamepad.undo, vec!["B".to_string(), "L1".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_str(
            "[rules]\ncan_tp_crate = false\n\n[timing]\nmove_ms = 50\n\n[general]\nstart_level = 2\n",
        );
        assert!(!cfg.rules.can_tp_crate);
        assert!(cfg.rules.tp_exit_ignores_depth);
        assert!(cfg.rules.extra_tp_crate_move);
        assert_eq!(cfg.timing.move_ms, 50);
        assert_eq!(cfg.timing.stairs_ms, default_stairs());
        assert_eq!(cfg.start_level, 2);
    }

    #[test]
    fn broken_file_falls_back() {
        let cfg = GameConfig::from_str("[rules\nnot toml");
        assert_eq!(cfg.rules, RulesConfig::default());
    }
}
