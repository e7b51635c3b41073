//! Reference component and display registrars.

use std::collections::HashSet;

use tracing::debug;

use super::{
    ComponentRegistrar, DisplayRegistrar, DisplaySettings, PeripheralHandle, PollingSettings,
    RegisterError,
};

/// Polling scheduler model: one entry per registered component.
#[derive(Debug, Default)]
pub struct ComponentTable {
    registered: HashSet<String>,
    entries: Vec<(String, PollingSettings)>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered components in registration order.
    pub fn entries(&self) -> &[(String, PollingSettings)] {
        &self.entries
    }
}

impl ComponentRegistrar for ComponentTable {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        polling: &PollingSettings,
    ) -> Result<(), RegisterError> {
        if !self.registered.insert(handle.id().to_string()) {
            debug!("{handle} already registered, ignoring");
            return Ok(());
        }
        debug!(
            "Registered {handle} polling every {} ms",
            polling.interval.as_millis()
        );
        self.entries
            .push((handle.id().to_string(), polling.clone()));
        Ok(())
    }
}

/// Display subsystem model.
#[derive(Debug, Default)]
pub struct DisplayTable {
    displays: Vec<(String, DisplaySettings)>,
}

impl DisplayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displays(&self) -> &[(String, DisplaySettings)] {
        &self.displays
    }
}

fn check_geometry(settings: &DisplaySettings) -> Result<(), RegisterError> {
    let fail = |key: &'static str, reason: String| -> Result<(), RegisterError> {
        Err(RegisterError::InvalidGeometry { key, reason })
    };

    if settings.width <= 0 {
        return fail("device_width", format!("width must be positive, got {}", settings.width));
    }
    if settings.height <= 0 {
        return fail(
            "device_height",
            format!("height must be positive, got {}", settings.height),
        );
    }
    if settings.col_start < 0 {
        return fail(
            "col_start",
            format!("offset cannot be negative, got {}", settings.col_start),
        );
    }
    if settings.row_start < 0 {
        return fail(
            "row_start",
            format!("offset cannot be negative, got {}", settings.row_start),
        );
    }
    match settings.col_start.checked_add(settings.width) {
        Some(end) if end <= settings.limits.width => {}
        end => {
            return fail(
                "device_width",
                format!(
                    "columns from {} spanning {} exceed controller width {}{}",
                    settings.col_start,
                    settings.width,
                    settings.limits.width,
                    if end.is_none() { " (overflow)" } else { "" }
                ),
            );
        }
    }
    match settings.row_start.checked_add(settings.height) {
        Some(end) if end <= settings.limits.height => {}
        end => {
            return fail(
                "device_height",
                format!(
                    "rows from {} spanning {} exceed controller height {}{}",
                    settings.row_start,
                    settings.height,
                    settings.limits.height,
                    if end.is_none() { " (overflow)" } else { "" }
                ),
            );
        }
    }
    Ok(())
}

impl DisplayRegistrar for DisplayTable {
    fn register(
        &mut self,
        handle: &PeripheralHandle,
        settings: &DisplaySettings,
    ) -> Result<(), RegisterError> {
        check_geometry(settings)?;
        debug!(
            "Registered display {handle} {}x{} rotated {}",
            settings.width, settings.height, settings.rotation
        );
        self.displays
            .push((handle.id().to_string(), settings.clone()));
        Ok(())
    }
}
