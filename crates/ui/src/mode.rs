//! Interaction mode
//!
//! Exactly one mode is active per viewport. It decides which handler the
//! gesture router hands pointer events to. Mode changes go through
//! [`ModeController::request`], which lets an owner intercept the change,
//! e.g. to save pending ink first or to refuse leaving a mode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    #[default]
    Viewing,
    Selecting,
    Drawing,
    Erasing,
    AddingTextAnnotation,
    Searching,
}

impl InteractionMode {
    /// Modes in which a held press may fire a long-press action
    pub fn accepts_long_press(self) -> bool {
        matches!(self, Self::Viewing | Self::Selecting | Self::Drawing)
    }

    /// Modes in which a selected text annotation can be dragged
    pub fn accepts_manipulation(self) -> bool {
        matches!(self, Self::Viewing | Self::Searching | Self::AddingTextAnnotation)
    }

    /// Pointer events feed the ink session
    pub fn consumes_ink(self) -> bool {
        matches!(self, Self::Drawing | Self::Erasing)
    }

    /// Taps may navigate between pages
    pub fn may_switch_page(self) -> bool {
        matches!(self, Self::Viewing | Self::Searching)
    }

    /// An annotation selection may stay alive in this mode
    pub fn is_selection_compatible(self) -> bool {
        matches!(self, Self::Viewing | Self::Searching | Self::AddingTextAnnotation)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Viewing => "viewing",
            Self::Selecting => "selecting",
            Self::Drawing => "drawing",
            Self::Erasing => "erasing",
            Self::AddingTextAnnotation => "adding_text_annotation",
            Self::Searching => "searching",
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What an interceptor wants done with a requested change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDecision {
    Proceed,
    /// Save the drawing session before switching
    CommitInk,
    Veto,
}

/// Hook run before every requested mode change
pub trait ModeInterceptor {
    fn before_change(&mut self, from: InteractionMode, to: InteractionMode) -> ModeDecision;
}

impl<F> ModeInterceptor for F
where
    F: FnMut(InteractionMode, InteractionMode) -> ModeDecision,
{
    fn before_change(&mut self, from: InteractionMode, to: InteractionMode) -> ModeDecision {
        self(from, to)
    }
}

/// Result of a mode request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Unchanged,
    Vetoed,
    Changed {
        from: InteractionMode,
        to: InteractionMode,
        commit_ink: bool,
    },
}

impl ModeChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Holds the active mode and the optional interceptor
#[derive(Default)]
pub struct ModeController {
    mode: InteractionMode,
    interceptor: Option<Box<dyn ModeInterceptor>>,
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .field("intercepted", &self.interceptor.is_some())
            .finish()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_interceptor(&mut self, interceptor: Box<dyn ModeInterceptor>) {
        self.interceptor = Some(interceptor);
    }

    pub fn clear_interceptor(&mut self) {
        self.interceptor = None;
    }

    /// Ask for a mode change; the interceptor may veto it
    pub fn request(&mut self, to: InteractionMode) -> ModeChange {
        let from = self.mode;
        if from == to {
            return ModeChange::Unchanged;
        }
        let decision = match self.interceptor.as_mut() {
            Some(interceptor) => interceptor.before_change(from, to),
            None => ModeDecision::Proceed,
        };
        match decision {
            ModeDecision::Veto => {
                log::debug!("mode change {} -> {} vetoed", from, to);
                ModeChange::Vetoed
            }
            ModeDecision::Proceed | ModeDecision::CommitInk => {
                self.mode = to;
                let commit_ink = decision == ModeDecision::CommitInk;
                log::debug!("mode {} -> {} (commit ink: {})", from, to, commit_ink);
                ModeChange::Changed { from, to, commit_ink }
            }
        }
    }

    /// Change mode without consulting the interceptor (state restore)
    pub fn force(&mut self, to: InteractionMode) -> ModeChange {
        let from = self.mode;
        if from == to {
            return ModeChange::Unchanged;
        }
        self.mode = to;
        log::debug!("mode {} -> {} (forced)", from, to);
        ModeChange::Changed {
            from,
            to,
            commit_ink: false,
        }
    }
}
