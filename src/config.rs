use serde::Deserialize;
use std::path::PathBuf;
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;
use tiny_skia::Color;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Where the panel is placed each time it opens.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowPosition {
    #[default]
    Center,
    Left,
    Right,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default)]
    pub position: WindowPosition,
    #[serde(default = "default_fade_factor")]
    pub fade_factor: f32,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_fade_factor() -> f32 { 0.05 }
fn default_title() -> String { "V.E.L.O.C.I.T.Y.".to_string() }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            position: WindowPosition::default(),
            fade_factor: default_fade_factor(),
            title: default_title(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_areas")]
    pub areas: Vec<u32>,
}

fn default_api_base() -> String { "https://api.guildwars2.com/v2".to_string() }
fn default_areas() -> Vec<u32> { vec![1, 2] }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            areas: default_areas(),
        }
    }
}

/// Panel geometry in surface pixels.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_header_height")]
    pub header_height: f32,
    #[serde(default = "default_item_height")]
    pub item_height: f32,
    #[serde(default = "default_max_height")]
    pub max_height: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_drag_zone")]
    pub drag_zone: f32,
    #[serde(default = "default_edge_offset")]
    pub edge_offset: f32,
}

fn default_width() -> f32 { 340.0 }
fn default_header_height() -> f32 { 110.0 }
fn default_item_height() -> f32 { 35.0 }
fn default_max_height() -> f32 { 500.0 }
fn default_margin() -> f32 { 10.0 }
fn default_drag_zone() -> f32 { 60.0 }
fn default_edge_offset() -> f32 { 100.0 }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            header_height: default_header_height(),
            item_height: default_item_height(),
            max_height: default_max_height(),
            margin: default_margin(),
            drag_zone: default_drag_zone(),
            edge_offset: default_edge_offset(),
        }
    }
}

fn positive_or(value: f32, fallback: f32, field: &str) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        log::warn!("Invalid layout.{} = {}, using {}", field, value, fallback);
        fallback
    }
}

fn non_negative_or(value: f32, fallback: f32, field: &str) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::warn!("Invalid layout.{} = {}, using {}", field, value, fallback);
        fallback
    }
}

impl LayoutConfig {
    /// Replaces sizes the panel cannot be drawn with by their defaults.
    pub fn sanitized(self) -> Self {
        Self {
            width: positive_or(self.width, default_width(), "width"),
            header_height: positive_or(self.header_height, default_header_height(), "header_height"),
            item_height: positive_or(self.item_height, default_item_height(), "item_height"),
            max_height: positive_or(self.max_height, default_max_height(), "max_height"),
            margin: non_negative_or(self.margin, default_margin(), "margin"),
            drag_zone: non_negative_or(self.drag_zone, default_drag_zone(), "drag_zone"),
            edge_offset: non_negative_or(self.edge_offset, default_edge_offset(), "edge_offset"),
        }
    }

    /// Tallest the results region may grow.
    pub fn max_results_height(&self) -> f32 {
        (self.max_height - self.header_height).max(0.0)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ThemeConfig {
    #[serde(default = "default_border_radius")]
    pub border_radius: f32,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default = "default_title_color")]
    pub title: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_input_background")]
    pub input_background: String,
    #[serde(default = "default_item_background")]
    pub item_background: String,
    #[serde(default = "default_selection_background")]
    pub selection_background: String,
    #[serde(default = "default_close_background")]
    pub close_background: String,
    #[serde(default = "default_error_text")]
    pub error_text: String,
}

fn default_border_radius() -> f32 { 6.0 }
fn default_background() -> String { "0a0a0ff0".to_string() }
fn default_border_color() -> String { "3c3c50ff".to_string() }
fn default_title_color() -> String { "add8e6ff".to_string() }
fn default_text() -> String { "e0e0e0ff".to_string() }
fn default_placeholder() -> String { "707070ff".to_string() }
fn default_input_background() -> String { "1e1e24ff".to_string() }
fn default_item_background() -> String { "282828c8".to_string() }
fn default_selection_background() -> String { "3c3c50ff".to_string() }
fn default_close_background() -> String { "800000ff".to_string() }
fn default_error_text() -> String { "e06464ff".to_string() }

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            border_radius: default_border_radius(),
            background: default_background(),
            border_color: default_border_color(),
            title: default_title_color(),
            text: default_text(),
            placeholder: default_placeholder(),
            input_background: default_input_background(),
            item_background: default_item_background(),
            selection_background: default_selection_background(),
            close_background: default_close_background(),
            error_text: default_error_text(),
        }
    }
}

impl ThemeConfig {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 8 || !hex.is_ascii() {
            return Color::BLACK;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        let a = u8::from_str_radix(&hex[6..8], 16).unwrap_or(255);

        Color::from_rgba8(r, g, b, a)
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "wayfinder", "wayfinder")
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content)?;
    config.layout = config.layout.sanitized();
    if !(config.general.fade_factor > 0.0 && config.general.fade_factor <= 1.0) {
        log::warn!("Invalid general.fade_factor = {}, using default", config.general.fade_factor);
        config.general.fade_factor = default_fade_factor();
    }
    Ok(config)
}

pub fn load_config() -> Result<Config> {
    let config_path = if let Some(dirs) = project_dirs() {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config.toml")
    };

    if !config_path.exists() {
        log::debug!("No config at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.general.position, WindowPosition::Center);
        assert_eq!(config.general.fade_factor, 0.05);
        assert_eq!(config.catalog.areas, vec![1, 2]);
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.layout.max_results_height(), 390.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [general]
            position = "right"

            [catalog]
            areas = [1]

            [layout]
            item_height = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(config.general.position, WindowPosition::Right);
        assert_eq!(config.general.title, "V.E.L.O.C.I.T.Y.");
        assert_eq!(config.catalog.areas, vec![1]);
        assert_eq!(config.catalog.api_base, "https://api.guildwars2.com/v2");
        assert_eq!(config.layout.item_height, 40.0);
        assert_eq!(config.layout.header_height, 110.0);
    }

    #[test]
    fn rejects_unknown_position() {
        assert!(parse_config("[general]\nposition = \"top\"\n").is_err());
    }

    #[test]
    fn unusable_sizes_fall_back_to_defaults() {
        let config = parse_config(
            r#"
            [general]
            fade_factor = 0.0

            [layout]
            item_height = 0.0
            max_height = -20.0
            margin = -1.0
            width = 400.0
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.item_height, 35.0);
        assert_eq!(config.layout.max_height, 500.0);
        assert_eq!(config.layout.margin, 10.0);
        assert_eq!(config.layout.width, 400.0);
        assert_eq!(config.general.fade_factor, 0.05);
    }

    #[test]
    fn parses_hex_colors() {
        let color = ThemeConfig::parse_color("#ff000080");
        assert_eq!(color.red(), 1.0);
        assert_eq!(color.green(), 0.0);
        assert!((color.alpha() - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(ThemeConfig::parse_color("nope"), Color::BLACK);
    }
}
