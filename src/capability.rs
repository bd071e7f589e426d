// capability.rs — probes the VR device tiers once per session
//
// Tiers, best first: immersive XR sessions, legacy VR displays, device
// orientation sensors. A probe that errors counts as "not available".

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::error::ProbeError;

pub type ProbeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProbeError>> + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// A display enumerated by the legacy VR API.
pub trait VrDisplay: fmt::Debug {
    fn name(&self) -> String;
    /// Software displays (cardboard polyfill) do not track the head.
    fn is_polyfilled(&self) -> bool;
    /// Current head orientation, if the display tracks it.
    fn orientation(&self) -> Option<Quat>;
    fn request_present(&self) -> Result<(), ProbeError>;
    fn exit_present(&self);
    fn is_presenting(&self) -> bool;
}

pub type DisplayHandle = Rc<dyn VrDisplay>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub pose: Pose,
    pub select_pressed: bool,
    pub squeeze_pressed: bool,
}

/// An active immersive session.
pub trait XrSession: fmt::Debug {
    fn head_pose(&self) -> Option<Pose>;
    fn controllers(&self) -> Vec<ControllerState>;
    fn is_active(&self) -> bool;
    fn end(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The platform does not gate the sensor behind a prompt.
    NotRequired,
}

/// The runtime's device APIs. Probes that have no backing API return
/// `ProbeError::Unavailable`.
pub trait DeviceApis {
    fn immersive_vr_supported(&self) -> ProbeFuture<'_, bool>;
    fn legacy_displays(&self) -> ProbeFuture<'_, Vec<DisplayHandle>>;
    /// An older VR API revision is present that this player cannot drive.
    fn legacy_api_outdated(&self) -> bool {
        false
    }
    fn orientation_sensor(&self) -> bool;
    fn request_orientation_permission(&self) -> ProbeFuture<'_, Permission>;
    fn request_immersive_session(&self) -> ProbeFuture<'_, Box<dyn XrSession>>;
}

/// Settings for the software fallbacks, fixed for the detector's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorConfig {
    /// Synthesize a cardboard display when no real one is enumerated.
    pub cardboard_polyfill: bool,
    pub motion_controls: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityResult {
    pub xr_immersive_supported: bool,
    pub legacy_display: Option<DisplayHandle>,
    pub orientation_available: bool,
    pub legacy_api_outdated: bool,
}

impl CapabilityResult {
    /// A real head-mounted display, as opposed to the cardboard polyfill.
    pub fn has_hardware_display(&self) -> bool {
        self.legacy_display
            .as_ref()
            .is_some_and(|display| !display.is_polyfilled())
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityDetector {
    config: DetectorConfig,
}

impl CapabilityDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    pub async fn detect(&self, apis: &dyn DeviceApis) -> CapabilityResult {
        let xr_immersive_supported = match apis.immersive_vr_supported().await {
            Ok(supported) => {
                log::debug!("immersive-vr supported: {supported}");
                supported
            }
            Err(err) => {
                log::debug!("immersive session probe failed: {err}");
                false
            }
        };

        let mut legacy_display = match apis.legacy_displays().await {
            Ok(displays) => {
                log::debug!("{} legacy display(s) found", displays.len());
                displays.into_iter().next()
            }
            Err(err) => {
                log::debug!("legacy display probe failed: {err}");
                None
            }
        };

        if legacy_display.is_none() && self.config.cardboard_polyfill {
            log::debug!("no display enumerated, using the cardboard polyfill");
            legacy_display = Some(Rc::new(CardboardDisplay::default()));
        }

        let orientation_available = self.config.motion_controls
            && apis.orientation_sensor()
            && match apis.request_orientation_permission().await {
                Ok(Permission::Granted | Permission::NotRequired) => true,
                Ok(Permission::Denied) => {
                    log::debug!("device orientation permission denied");
                    false
                }
                Err(err) => {
                    log::debug!("device orientation permission failed: {err}");
                    false
                }
            };

        CapabilityResult {
            xr_immersive_supported,
            legacy_display,
            orientation_available,
            legacy_api_outdated: apis.legacy_api_outdated(),
        }
    }
}

/// Software stereo display: splits the screen in two, tracks nothing.
#[derive(Debug, Default)]
pub struct CardboardDisplay {
    presenting: Cell<bool>,
}

impl VrDisplay for CardboardDisplay {
    fn name(&self) -> String {
        "Cardboard (polyfill)".to_string()
    }

    fn is_polyfilled(&self) -> bool {
        true
    }

    fn orientation(&self) -> Option<Quat> {
        None
    }

    fn request_present(&self) -> Result<(), ProbeError> {
        self.presenting.set(true);
        Ok(())
    }

    fn exit_present(&self) {
        self.presenting.set(false);
    }

    fn is_presenting(&self) -> bool {
        self.presenting.get()
    }
}
