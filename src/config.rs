use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use std::io::prelude::*;

pub const CONFIG_FILE_NAME: &'static str = "config.ron";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Gap in pixels between adjacent displayed regions
    pub inter_region_padding_width: f64,
    /// Regions narrower than this many pixels are elided
    pub minimum_block_width: f64,
    /// Static blocks extend this many viewport widths on either side
    pub overscan: f64,
    pub min_bp_per_px: f64,
    /// How much of the viewport the regions fill when fully zoomed out
    pub max_view_fraction: f64,
    pub width: f64,
}

impl std::default::Default for ViewConfig {
    fn default() -> Self {
        Self {
            inter_region_padding_width: 2.0,
            minimum_block_width: 3.0,
            overscan: crate::blocks::DEFAULT_OVERSCAN,
            min_bp_per_px: 1.0 / 50.0,
            max_view_fraction: 0.9,
            width: 800.0,
        }
    }
}

pub fn app_dir() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "", "LocView")
}

fn config_dir() -> anyhow::Result<std::path::PathBuf> {
    let app_dirs = app_dir().ok_or(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Could not find application config directory",
    ))?;
    Ok(app_dirs.config_dir().to_path_buf())
}

pub fn load_view_config() -> anyhow::Result<ViewConfig> {
    let mut cfg_path = config_dir()?;
    cfg_path.push(CONFIG_FILE_NAME);
    read_view_config(&cfg_path)
}

pub fn read_view_config(path: impl AsRef<std::path::Path>) -> anyhow::Result<ViewConfig> {
    let mut file = std::fs::File::open(path)?;
    let mut cfg_buf = String::new();
    let len = file.read_to_string(&mut cfg_buf)?;

    let cfg = ron::de::from_str(&cfg_buf[..len])?;

    Ok(cfg)
}

/// Saves to the user config directory, returning the file written
pub fn save_view_config(config: &ViewConfig) -> anyhow::Result<std::path::PathBuf> {
    let cfg_dir = config_dir()?;
    save_view_config_in(&cfg_dir, config)
}

pub fn save_view_config_in(
    cfg_dir: impl AsRef<std::path::Path>,
    config: &ViewConfig,
) -> anyhow::Result<std::path::PathBuf> {
    let mut cfg_path = cfg_dir.as_ref().to_path_buf();

    if !cfg_path.exists() {
        std::fs::create_dir_all(&cfg_path)?;
    }

    if !cfg_path.is_dir() {
        anyhow::bail!(
            "A file exists at the config directory path `{cfg_path:?}` but it is not a directory"
        );
    }

    cfg_path.push(CONFIG_FILE_NAME);
    write_view_config(&cfg_path, config)?;

    Ok(cfg_path)
}

pub fn write_view_config(
    path: impl AsRef<std::path::Path>,
    config: &ViewConfig,
) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;

    ron::ser::to_writer_pretty(&mut file, config, ron::ser::PrettyConfig::new())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: ViewConfig = ron::de::from_str("(width: 1200.0, overscan: 2.0)").unwrap();
        assert_eq!(cfg.width, 1200.0);
        assert_eq!(cfg.overscan, 2.0);
        assert_eq!(cfg.inter_region_padding_width, 2.0);
        assert_eq!(cfg.minimum_block_width, 3.0);
    }

    #[test]
    fn config_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "locview-config-{}-{}.ron",
            std::process::id(),
            rand::random::<u32>()
        ));

        let cfg = ViewConfig {
            width: 640.0,
            inter_region_padding_width: 0.0,
            ..Default::default()
        };
        write_view_config(&path, &cfg).unwrap();
        let loaded = read_view_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn save_creates_config_dir() {
        let root = std::env::temp_dir().join(format!(
            "locview-cfgdir-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        let cfg_dir = root.join("nested");

        let cfg = ViewConfig {
            overscan: 0.5,
            ..Default::default()
        };
        let path = save_view_config_in(&cfg_dir, &cfg).unwrap();
        assert_eq!(path, cfg_dir.join(CONFIG_FILE_NAME));
        assert_eq!(read_view_config(&path).unwrap(), cfg);

        // a plain file where the directory should be
        let blocked = root.join("blocked");
        std::fs::write(&blocked, "").unwrap();
        assert!(save_view_config_in(&blocked, &cfg).is_err());

        std::fs::remove_dir_all(&root).unwrap();
    }
}
