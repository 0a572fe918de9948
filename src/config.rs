// Runtime configuration for the driver
//
// Everything here is read once from the environment when the
// driver is created.
//
// Austin Shafer - 2020
use std::env;

/// Window classes that belong to helper windows which never render.
/// These must not steal focus or become the presentation window.
pub const DEFAULT_DENY_CLASSES: &[&str] = &[
    "Message",
    "OleMainThreadWndClass",
    "IME",
    "#32769",
    "tooltips_class32",
    "PdxDetectWindow",
];

pub const DEFAULT_SURFACE_EXTENT: (u32, u32) = (1600, 900);
pub const DEFAULT_CURSOR_SIZE: u32 = 32;
pub const DEFAULT_VULKAN_LIBRARIES: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Only GPU presentation is used. The GPU pointer sink is always
    /// bound and window position tracking is skipped.
    pub gpu_only: bool,
    /// The cursor is never restored once a lock session ends
    pub hide_cursor: bool,
    /// The cursor is never hidden when a lock session starts
    pub keep_cursor_visible: bool,
    /// Class names (case insensitive) of windows to ignore
    pub deny_classes: Vec<String>,
    pub surface_extent: (u32, u32),
    pub cursor_theme: Option<String>,
    pub cursor_size: u32,
    pub vulkan_libraries: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            gpu_only: false,
            hide_cursor: false,
            keep_cursor_visible: false,
            deny_classes: DEFAULT_DENY_CLASSES.iter().map(|s| s.to_string()).collect(),
            surface_extent: DEFAULT_SURFACE_EXTENT,
            cursor_theme: None,
            cursor_size: DEFAULT_CURSOR_SIZE,
            vulkan_libraries: DEFAULT_VULKAN_LIBRARIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Parse "WxH" into an extent. Zero sized extents are rejected.
fn parse_extent(val: &str) -> Option<(u32, u32)> {
    let mut parts = val.trim().splitn(2, |c| c == 'x' || c == 'X');
    let w = parts.next()?.trim().parse().ok()?;
    let h = parts.next()?.trim().parse().ok()?;

    match (w, h) {
        (0, _) | (_, 0) => None,
        ext => Some(ext),
    }
}

impl DriverConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Boolean switches are enabled by the variable being present at
    /// all, whatever its value.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut ret = Self::default();

        ret.gpu_only = lookup("WINE_VK_VULKAN_ONLY").is_some();
        ret.hide_cursor = lookup("WINE_VK_HIDE_CURSOR").is_some();
        ret.keep_cursor_visible = lookup("WINE_VK_KEEP_CURSOR").is_some();

        if let Some(extra) = lookup("WINE_VK_DENY_CLASSES") {
            ret.deny_classes.extend(
                extra
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string()),
            );
        }

        if let Some(ext) = lookup("WINE_VK_SURFACE_SIZE").as_deref().and_then(parse_extent) {
            ret.surface_extent = ext;
        }

        ret.cursor_theme = lookup("XCURSOR_THEME").filter(|s| !s.is_empty());
        if let Some(size) = lookup("XCURSOR_SIZE").and_then(|s| s.trim().parse().ok()) {
            ret.cursor_size = size;
        }

        return ret;
    }

    /// Is this window class one of the helper classes we ignore
    pub fn is_denied_class(&self, class: &str) -> bool {
        self.deny_classes
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> DriverConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DriverConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_with(&[]);
        assert!(!cfg.gpu_only);
        assert!(!cfg.hide_cursor);
        assert_eq!(cfg.surface_extent, (1600, 900));
        assert_eq!(cfg.cursor_size, 32);
        assert_eq!(cfg.vulkan_libraries, vec!["libvulkan.so.1", "libvulkan.so"]);
    }

    #[test]
    fn switches_are_presence_based() {
        let cfg = config_with(&[("WINE_VK_VULKAN_ONLY", ""), ("WINE_VK_HIDE_CURSOR", "0")]);
        assert!(cfg.gpu_only);
        assert!(cfg.hide_cursor);
        assert!(!cfg.keep_cursor_visible);
    }

    #[test]
    fn deny_list_is_case_insensitive_and_extendable() {
        let cfg = config_with(&[("WINE_VK_DENY_CLASSES", "SDLHelperWindow, ,Foo")]);
        assert!(cfg.is_denied_class("ime"));
        assert!(cfg.is_denied_class("TOOLTIPS_CLASS32"));
        assert!(cfg.is_denied_class("sdlhelperwindow"));
        assert!(cfg.is_denied_class("Foo"));
        assert!(!cfg.is_denied_class(""));
        assert!(!cfg.is_denied_class("GameWindow"));
    }

    #[test]
    fn surface_size_override() {
        assert_eq!(parse_extent("1280x720"), Some((1280, 720)));
        assert_eq!(parse_extent("0x720"), None);
        assert_eq!(parse_extent("big"), None);

        let cfg = config_with(&[("WINE_VK_SURFACE_SIZE", "800X600")]);
        assert_eq!(cfg.surface_extent, (800, 600));
    }
}
