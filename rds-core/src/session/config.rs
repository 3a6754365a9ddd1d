//! Session-wide settings.

use serde::{Deserialize, Serialize};

use crate::damage::DEFAULT_MAX_TRACKED;
use crate::input::InputOptions;

/// How client size requests interact with the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    /// Honour the request and raise the maximum to it, permanently.
    #[default]
    Ratchet,
    /// Shrink the request to fit the maximum.
    Clamp,
}

/// Maximum desktop size. Zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeLimits {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn allows(&self, width: u32, height: u32) -> bool {
        (self.max_width == 0 || width <= self.max_width)
            && (self.max_height == 0 || height <= self.max_height)
    }

    /// Apply a client request under `policy` and return the size to use.
    pub fn resolve(&mut self, policy: SizePolicy, width: u32, height: u32) -> (u32, u32) {
        match policy {
            SizePolicy::Ratchet => {
                if self.max_width != 0 && width > self.max_width {
                    self.max_width = width;
                }
                if self.max_height != 0 && height > self.max_height {
                    self.max_height = height;
                }
                (width, height)
            }
            SizePolicy::Clamp => {
                let clamp = |value: u32, max: u32| if max == 0 { value } else { value.min(max) };
                (clamp(width, self.max_width), clamp(height, self.max_height))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub limits: SizeLimits,
    pub size_policy: SizePolicy,
    pub input: InputOptions,
    /// Rectangles the dirty tracker keeps before collapsing to extents.
    pub max_tracked_rects: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            depth: 24,
            limits: SizeLimits::default(),
            size_policy: SizePolicy::default(),
            input: InputOptions::default(),
            max_tracked_rects: DEFAULT_MAX_TRACKED,
        }
    }
}
