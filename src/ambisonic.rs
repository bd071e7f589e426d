// ambisonic.rs — keeps an external ambisonic decoder facing the camera

use glam::Mat3;

use crate::camera::Camera;
use crate::config::OmnitoneOptions;
use crate::error::AmbisonicError;

/// A first-order ambisonic renderer supplied by the host's audio stack.
pub trait AmbisonicDecoder {
    fn initialize(&mut self, options: &OmnitoneOptions) -> Result<(), AmbisonicError>;
    fn set_rotation(&mut self, rotation: Mat3);
    /// Pass audio through untouched.
    fn bypass(&mut self);
    /// The audio output is held until a user gesture starts it.
    fn is_suspended(&self) -> bool {
        false
    }
    fn resume(&mut self) {}
}

pub struct OmnitoneController {
    decoder: Box<dyn AmbisonicDecoder>,
    initialized: bool,
}

impl OmnitoneController {
    pub fn new(mut decoder: Box<dyn AmbisonicDecoder>, options: &OmnitoneOptions) -> Self {
        let initialized = match decoder.initialize(options) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{err}");
                false
            }
        };
        Self {
            decoder,
            initialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The decoder's output is held; playback waits for `resume_audio`.
    pub fn audio_suspended(&self) -> bool {
        self.initialized && self.decoder.is_suspended()
    }

    pub fn resume_audio(&mut self) {
        if self.initialized {
            self.decoder.resume();
        }
    }

    pub fn update(&mut self, camera: &Camera) {
        if !self.initialized {
            return;
        }
        self.decoder.set_rotation(camera.rotation_matrix());
    }

    pub fn dispose(&mut self) {
        self.initialized = false;
        self.decoder.bypass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        rotations: usize,
        bypassed: bool,
        resumed: bool,
    }

    struct FakeDecoder {
        fail: bool,
        suspended: bool,
        log: Rc<RefCell<Log>>,
    }

    impl AmbisonicDecoder for FakeDecoder {
        fn initialize(&mut self, _options: &OmnitoneOptions) -> Result<(), AmbisonicError> {
            if self.fail {
                Err(AmbisonicError::Initialize("no audio context".into()))
            } else {
                Ok(())
            }
        }

        fn is_suspended(&self) -> bool {
            self.suspended
        }

        fn resume(&mut self) {
            self.log.borrow_mut().resumed = true;
        }

        fn set_rotation(&mut self, _rotation: Mat3) {
            self.log.borrow_mut().rotations += 1;
        }

        fn bypass(&mut self) {
            self.log.borrow_mut().bypassed = true;
        }
    }

    #[test]
    fn failed_decoder_is_never_rotated() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut omni = OmnitoneController::new(
            Box::new(FakeDecoder { fail: true, suspended: true, log: log.clone() }),
            &OmnitoneOptions::default(),
        );
        omni.update(&Camera::new(1.0));
        assert!(!omni.is_initialized());
        assert_eq!(log.borrow().rotations, 0);
        // nothing to wait for when the decoder never came up
        assert!(!omni.audio_suspended());
        omni.resume_audio();
        assert!(!log.borrow().resumed);
    }

    #[test]
    fn dispose_stops_updates_and_bypasses() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut omni = OmnitoneController::new(
            Box::new(FakeDecoder { fail: false, suspended: false, log: log.clone() }),
            &OmnitoneOptions::default(),
        );
        omni.update(&Camera::new(1.0));
        omni.dispose();
        omni.update(&Camera::new(1.0));
        assert_eq!(log.borrow().rotations, 1);
        assert!(log.borrow().bypassed);
    }
}
