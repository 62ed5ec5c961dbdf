use log::debug;
use sysinfo::System;

pub const DEFAULT_MAX_WINDOW_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_WINDOW_HEIGHT: u32 = 1080;

/// Upper bounds the host places on numeric settings.
pub trait HostCapabilities {
    fn max_ram_mb(&self) -> u32;
    fn max_window_width(&self) -> u32;
    fn max_window_height(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAX_WINDOW_WIDTH,
            height: DEFAULT_MAX_WINDOW_HEIGHT,
        }
    }
}

/// Memory comes from the running system. Window bounds are configured since
/// no display is queried.
#[derive(Debug, Clone)]
pub struct SystemHost {
    total_memory_mb: u32,
    window: WindowBounds,
}

impl SystemHost {
    pub fn detect(window: WindowBounds) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let total_memory_mb = u32::try_from(sys.total_memory() / 1024 / 1024).unwrap_or(u32::MAX);
        debug!(
            "host reports {total_memory_mb} MB of memory, window bounds {}x{}",
            window.width, window.height
        );
        Self {
            total_memory_mb,
            window,
        }
    }
}

impl HostCapabilities for SystemHost {
    fn max_ram_mb(&self) -> u32 {
        self.total_memory_mb
    }

    fn max_window_width(&self) -> u32 {
        self.window.width
    }

    fn max_window_height(&self) -> u32 {
        self.window.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedHost {
    pub ram_mb: u32,
    pub window: WindowBounds,
}

impl HostCapabilities for FixedHost {
    fn max_ram_mb(&self) -> u32 {
        self.ram_mb
    }

    fn max_window_width(&self) -> u32 {
        self.window.width
    }

    fn max_window_height(&self) -> u32 {
        self.window.height
    }
}
