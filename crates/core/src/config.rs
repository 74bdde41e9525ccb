//! Gesture tuning configuration
//!
//! Slop distances, timeouts and handle sizes are product-tuning values rather
//! than correctness requirements, so they live here instead of being spread
//! as constants through the gesture code. Distances ending in `_dp` are
//! device-independent and are multiplied by `density` when converted to
//! screen pixels.
//!
//! Configuration can be created programmatically, read from `PDF_READER_*`
//! environment variables, or parsed from a small `key = value` file.

use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Tuning values for gesture disambiguation
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Screen density (pixels per dp)
    pub density: f32,
    /// Distance a pointer may travel before a press becomes a drag
    pub touch_slop_dp: f32,
    /// Maximum distance between two taps of a double tap
    pub double_tap_slop_dp: f32,
    /// Delay before a stationary press counts as a long-press
    pub long_press_timeout_ms: u64,
    /// Maximum interval between two taps of a double tap
    pub double_tap_timeout_ms: u64,
    /// Long-press delay multiplier for stylus input
    pub stylus_long_press_multiplier: u64,
    /// Delay between text selection attempts while text is loading
    pub selection_retry_interval_ms: u64,
    /// Number of selection attempts before giving up
    pub selection_retry_attempts: u32,
    /// Edge length of the probe box used to select text at a press point
    pub selection_probe_size_px: f32,
    /// Half edge of a corner resize handle
    pub corner_handle_half_dp: f32,
    /// Half edge of the move handle
    pub move_handle_half_dp: f32,
    /// Minimum edge length of a manipulated text annotation
    pub min_edge_dp: f32,
    /// Margin around a selected box that still grabs it
    pub grab_slop_dp: f32,
    /// Extra hit margin for text and free-text annotations
    pub text_hit_slop_dp: f32,
    /// Fraction of the double-tap slop used for near-miss edit taps
    pub near_miss_factor: f32,
    /// Whether moving a selected box requires a long-press-and-release first
    pub require_move_arming: bool,
    /// How long an armed move stays armed
    pub move_arm_window_ms: u64,
    /// Pointer drift that disqualifies a press from arming move
    pub move_arm_slop_px: f32,
    /// Drift tolerated between the arming press and the drag that follows
    pub move_start_slop_px: f32,
    /// Width of the tap-to-navigate margin; zero derives it from the view width
    pub tap_page_margin_px: f32,
    /// Distance a drawing pointer travels before a stroke starts
    pub drawing_slop_px: f32,
    /// Touch radius of a text selection marker
    pub marker_radius_dp: f32,
    /// Release velocity (px/s) below which no fling is generated
    pub min_fling_velocity: f32,
    /// Default width of a FreeText annotation created by a tap
    pub text_annot_default_width_dp: f32,
    /// Default height of a FreeText annotation created by a tap
    pub text_annot_default_height_dp: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            touch_slop_dp: 8.0,
            double_tap_slop_dp: 100.0,
            long_press_timeout_ms: 500,
            double_tap_timeout_ms: 300,
            stylus_long_press_multiplier: 2,
            selection_retry_interval_ms: 120,
            selection_retry_attempts: 8,
            selection_probe_size_px: 12.0,
            corner_handle_half_dp: 6.0,
            move_handle_half_dp: 8.0,
            min_edge_dp: 24.0,
            grab_slop_dp: 12.0,
            text_hit_slop_dp: 8.0,
            near_miss_factor: 0.5,
            require_move_arming: false,
            move_arm_window_ms: 3000,
            move_arm_slop_px: 12.0,
            move_start_slop_px: 96.0,
            tap_page_margin_px: 0.0,
            drawing_slop_px: 2.0,
            marker_radius_dp: 24.0,
            min_fling_velocity: 50.0,
            text_annot_default_width_dp: 200.0,
            text_annot_default_height_dp: 60.0,
        }
    }
}

impl GestureConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the screen density
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set the touch slop in dp
    pub fn with_touch_slop_dp(mut self, slop: f32) -> Self {
        self.touch_slop_dp = slop;
        self
    }

    /// Set the long-press timeout
    pub fn with_long_press_timeout_ms(mut self, timeout: u64) -> Self {
        self.long_press_timeout_ms = timeout;
        self
    }

    /// Set the selection retry cadence
    pub fn with_selection_retry(mut self, interval_ms: u64, attempts: u32) -> Self {
        self.selection_retry_interval_ms = interval_ms;
        self.selection_retry_attempts = attempts;
        self
    }

    /// Set the minimum edge of manipulated boxes in dp
    pub fn with_min_edge_dp(mut self, min_edge: f32) -> Self {
        self.min_edge_dp = min_edge;
        self
    }

    /// Require a long-press-and-release before a selected box can be dragged
    pub fn with_move_arming(mut self, required: bool) -> Self {
        self.require_move_arming = required;
        self
    }

    /// Set a fixed tap-to-navigate margin
    pub fn with_tap_page_margin_px(mut self, margin: f32) -> Self {
        self.tap_page_margin_px = margin;
        self
    }

    /// Set the drawing start slop
    pub fn with_drawing_slop_px(mut self, slop: f32) -> Self {
        self.drawing_slop_px = slop;
        self
    }

    pub fn touch_slop_px(&self) -> f32 {
        self.touch_slop_dp * self.density
    }

    pub fn double_tap_slop_px(&self) -> f32 {
        self.double_tap_slop_dp * self.density
    }

    pub fn corner_handle_half_px(&self) -> f32 {
        self.corner_handle_half_dp * self.density
    }

    pub fn move_handle_half_px(&self) -> f32 {
        self.move_handle_half_dp * self.density
    }

    pub fn min_edge_px(&self) -> f32 {
        self.min_edge_dp * self.density
    }

    pub fn grab_slop_px(&self) -> f32 {
        self.grab_slop_dp * self.density
    }

    pub fn marker_radius_px(&self) -> f32 {
        self.marker_radius_dp * self.density
    }

    pub fn text_hit_slop_px(&self) -> f32 {
        self.text_hit_slop_dp * self.density
    }

    /// Radius around the selected text annotation that counts as a near miss
    pub fn near_miss_slop_px(&self) -> f32 {
        self.double_tap_slop_px() * self.near_miss_factor
    }

    /// Long-press delay for the given pointer kind
    pub fn long_press_delay_ms(&self, stylus: bool) -> u64 {
        if stylus {
            self.long_press_timeout_ms * self.stylus_long_press_multiplier
        } else {
            self.long_press_timeout_ms
        }
    }

    /// Tap margin for a view of the given width
    pub fn tap_page_margin_for(&self, view_width: f32) -> f32 {
        if self.tap_page_margin_px > 0.0 {
            self.tap_page_margin_px
        } else {
            (view_width / 5.0).min(100.0 * self.density)
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Recognised variables use the `PDF_READER_` prefix followed by the
    /// upper-cased key, e.g. `PDF_READER_DENSITY`, `PDF_READER_TOUCH_SLOP_DP`,
    /// `PDF_READER_LONG_PRESS_TIMEOUT_MS`, `PDF_READER_REQUIRE_MOVE_ARMING`.
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in KEYS {
            let var = format!("PDF_READER_{}", key.to_ascii_uppercase());
            if let Ok(value) = std::env::var(&var) {
                config.set(key, value.trim()).map_err(|_| ConfigError::InvalidValue {
                    key: var.clone(),
                    value,
                })?;
            }
        }
        Ok(config)
    }

    /// Loads configuration from a `key = value` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_str_kv(&contents)
    }

    /// Parses `key = value` lines; `#` comments and unknown keys are ignored.
    pub fn from_str_kv(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');
                if KEYS.contains(&key) {
                    config.set(key, value).map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
                }
            }
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ()> {
        fn float(value: &str) -> Result<f32, ()> {
            value.parse::<f32>().map_err(|_| ())
        }
        fn int(value: &str) -> Result<u64, ()> {
            value.parse::<u64>().map_err(|_| ())
        }

        match key {
            "density" => self.density = float(value)?,
            "touch_slop_dp" => self.touch_slop_dp = float(value)?,
            "double_tap_slop_dp" => self.double_tap_slop_dp = float(value)?,
            "long_press_timeout_ms" => self.long_press_timeout_ms = int(value)?,
            "double_tap_timeout_ms" => self.double_tap_timeout_ms = int(value)?,
            "stylus_long_press_multiplier" => self.stylus_long_press_multiplier = int(value)?,
            "selection_retry_interval_ms" => self.selection_retry_interval_ms = int(value)?,
            "selection_retry_attempts" => {
                self.selection_retry_attempts = value.parse::<u32>().map_err(|_| ())?
            }
            "selection_probe_size_px" => self.selection_probe_size_px = float(value)?,
            "corner_handle_half_dp" => self.corner_handle_half_dp = float(value)?,
            "move_handle_half_dp" => self.move_handle_half_dp = float(value)?,
            "min_edge_dp" => self.min_edge_dp = float(value)?,
            "grab_slop_dp" => self.grab_slop_dp = float(value)?,
            "text_hit_slop_dp" => self.text_hit_slop_dp = float(value)?,
            "near_miss_factor" => self.near_miss_factor = float(value)?,
            "require_move_arming" => {
                self.require_move_arming = match value {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => return Err(()),
                }
            }
            "move_arm_window_ms" => self.move_arm_window_ms = int(value)?,
            "move_arm_slop_px" => self.move_arm_slop_px = float(value)?,
            "move_start_slop_px" => self.move_start_slop_px = float(value)?,
            "tap_page_margin_px" => self.tap_page_margin_px = float(value)?,
            "drawing_slop_px" => self.drawing_slop_px = float(value)?,
            "marker_radius_dp" => self.marker_radius_dp = float(value)?,
            "min_fling_velocity" => self.min_fling_velocity = float(value)?,
            "text_annot_default_width_dp" => self.text_annot_default_width_dp = float(value)?,
            "text_annot_default_height_dp" => self.text_annot_default_height_dp = float(value)?,
            _ => return Err(()),
        }

        if self.density <= 0.0 || !self.density.is_finite() {
            return Err(());
        }
        Ok(())
    }
}

const KEYS: &[&str] = &[
    "density",
    "touch_slop_dp",
    "double_tap_slop_dp",
    "long_press_timeout_ms",
    "double_tap_timeout_ms",
    "stylus_long_press_multiplier",
    "selection_retry_interval_ms",
    "selection_retry_attempts",
    "selection_probe_size_px",
    "corner_handle_half_dp",
    "move_handle_half_dp",
    "min_edge_dp",
    "grab_slop_dp",
    "text_hit_slop_dp",
    "near_miss_factor",
    "require_move_arming",
    "move_arm_window_ms",
    "move_arm_slop_px",
    "move_start_slop_px",
    "tap_page_margin_px",
    "drawing_slop_px",
    "marker_radius_dp",
    "min_fling_velocity",
    "text_annot_default_width_dp",
    "text_annot_default_height_dp",
];
