//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use super::{Config, DeviceHint};

/// Interactive globe in the terminal.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tui-globe", about = "Spin a globe in your terminal")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the atlas, country names and cities.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Use the built-in coarse world instead of data files.
    #[arg(long)]
    pub builtin: bool,

    /// Device class for zoom bounds and layer thresholds.
    #[arg(long, value_enum)]
    pub device: Option<DeviceHint>,

    /// Start with the day/night overlay off.
    #[arg(long)]
    pub no_day_night: bool,

    /// Fly to a coordinate on start, given as LAT,LON.
    #[arg(long, value_parser = parse_lat_lon, allow_hyphen_values = true)]
    pub goto: Option<(f64, f64)>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Parse `"LAT,LON"` into degrees.
pub fn parse_lat_lon(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got `{s}`"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude `{lat}`: {e}"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude `{lon}`: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {lat},{lon}"));
    }
    Ok((lat, lon))
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.data_dir {
            self.data.data_dir = dir.clone();
        }
        if args.builtin {
            self.data.builtin = true;
        }
        if let Some(device) = args.device {
            self.view.device = device;
        }
        if args.no_day_night {
            self.view.day_night = false;
        }
        if let Some(ref level) = args.log_level {
            self.log.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs::parse_from([
            "tui-globe",
            "--data-dir",
            "/tmp/atlas",
            "--device",
            "mobile",
            "--no-day-night",
            "--goto",
            "-33.9,151.2",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.data.data_dir, PathBuf::from("/tmp/atlas"));
        assert_eq!(config.view.device, DeviceHint::Mobile);
        assert!(!config.view.day_night);
        assert_eq!(args.goto, Some((-33.9, 151.2)));
        // Non-overridden fields retain defaults
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_lat_lon() {
        assert_eq!(parse_lat_lon("48.85, 2.35"), Ok((48.85, 2.35)));
        assert!(parse_lat_lon("48.85").is_err());
        assert!(parse_lat_lon("91,0").is_err());
        assert!(parse_lat_lon("a,b").is_err());
    }
}
