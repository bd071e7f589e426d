// buttons.rs — control bar buttons as independent capability objects

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    BigPlay,
    BigVrPlay,
    Cardboard,
    VrEntry,
}

/// What the player should do when a button is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    TogglePlay,
    /// Ask for motion-sensor permission, then start playback.
    TogglePlayWithOrientation,
    /// Start presenting on the legacy VR display.
    ActivateDisplay,
    EnterImmersive,
}

pub trait ControlButton: fmt::Debug {
    fn kind(&self) -> ButtonKind;
    fn build_label(&self) -> String;
    fn handle_activation(&mut self) -> ButtonAction;
    fn dispose(&mut self) {}
}

#[derive(Debug, Default)]
pub struct BigPlayButton;

impl ControlButton for BigPlayButton {
    fn kind(&self) -> ButtonKind {
        ButtonKind::BigPlay
    }

    fn build_label(&self) -> String {
        "▶ Play".to_string()
    }

    fn handle_activation(&mut self) -> ButtonAction {
        ButtonAction::TogglePlay
    }
}

/// Replaces the big play button while 3D is active. The first press is the
/// user gesture some platforms require before granting motion sensors.
#[derive(Debug, Default)]
pub struct BigVrPlayButton;

impl ControlButton for BigVrPlayButton {
    fn kind(&self) -> ButtonKind {
        ButtonKind::BigVrPlay
    }

    fn build_label(&self) -> String {
        "▶ Play 360".to_string()
    }

    fn handle_activation(&mut self) -> ButtonAction {
        ButtonAction::TogglePlayWithOrientation
    }
}

#[derive(Debug, Default)]
pub struct CardboardButton {
    activations: u32,
}

impl ControlButton for CardboardButton {
    fn kind(&self) -> ButtonKind {
        ButtonKind::Cardboard
    }

    fn build_label(&self) -> String {
        "Cardboard".to_string()
    }

    fn handle_activation(&mut self) -> ButtonAction {
        self.activations += 1;
        log::debug!("cardboard button pressed ({} times)", self.activations);
        ButtonAction::ActivateDisplay
    }
}

#[derive(Debug, Default)]
pub struct VrEntryButton {
    disposed: bool,
}

impl ControlButton for VrEntryButton {
    fn kind(&self) -> ButtonKind {
        ButtonKind::VrEntry
    }

    fn build_label(&self) -> String {
        if self.disposed {
            "VR unavailable".to_string()
        } else {
            "Enter VR".to_string()
        }
    }

    fn handle_activation(&mut self) -> ButtonAction {
        ButtonAction::EnterImmersive
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_button_reports_its_kind_and_action() {
        let mut buttons: Vec<Box<dyn ControlButton>> = vec![
            Box::new(BigPlayButton),
            Box::new(BigVrPlayButton),
            Box::new(CardboardButton::default()),
            Box::new(VrEntryButton::default()),
        ];
        let actions: Vec<_> = buttons.iter_mut().map(|b| (b.kind(), b.handle_activation())).collect();
        assert_eq!(
            actions,
            vec![
                (ButtonKind::BigPlay, ButtonAction::TogglePlay),
                (ButtonKind::BigVrPlay, ButtonAction::TogglePlayWithOrientation),
                (ButtonKind::Cardboard, ButtonAction::ActivateDisplay),
                (ButtonKind::VrEntry, ButtonAction::EnterImmersive),
            ]
        );
    }

    #[test]
    fn disposed_entry_button_relabels() {
        let mut b = VrEntryButton::default();
        b.dispose();
        assert_eq!(b.build_label(), "VR unavailable");
    }
}
