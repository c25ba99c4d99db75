//! The terminal mode bitmap: which optional input/output modes are
//! currently enabled, tracked in enable order so teardown can reverse
//! it exactly.

/// One independently toggleable terminal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    /// `CSI ?1049h/l`.
    AltScreen,
    /// `CSI ?2004h/l`.
    BracketedPaste,
    /// `CSI ?1002h/l` (button-motion mouse tracking).
    MouseCellMotion,
    /// `CSI ?1003h/l` (any-motion mouse tracking).
    MouseAllMotion,
    /// `CSI ?1006h/l` (SGR extended mouse coordinates).
    MouseSgr,
    /// `CSI ?1004h/l`.
    FocusReports,
    /// `CSI ?25h/l`. Enabled by default; explicitly tracked so a
    /// program that hides the cursor still gets it restored.
    CursorVisibility,
    /// XTerm modifyOtherKeys level (`CSI >4;Nm`).
    ModifyOtherKeys,
    /// Kitty keyboard protocol enhancement flags (`CSI >Nu` / `CSI <u`).
    KittyKeyboard,
    /// Terminal-side grapheme-cluster-aware cursor movement, where
    /// supported (no standard escape; negotiated via terminfo/DA
    /// responses). Tracked here purely so its teardown participates
    /// in the same reverse-order bookkeeping as every other mode.
    GraphemeClustering,
}

impl ModeId {
    /// A static name for error messages and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AltScreen => "alt-screen",
            Self::BracketedPaste => "bracketed-paste",
            Self::MouseCellMotion => "mouse-cell-motion",
            Self::MouseAllMotion => "mouse-all-motion",
            Self::MouseSgr => "mouse-sgr",
            Self::FocusReports => "focus-reports",
            Self::CursorVisibility => "cursor-visibility",
            Self::ModifyOtherKeys => "modify-other-keys",
            Self::KittyKeyboard => "kitty-keyboard",
            Self::GraphemeClustering => "grapheme-clustering",
        }
    }
}

/// The set of currently-enabled modes, in the order they were
/// enabled.
#[derive(Debug, Clone, Default)]
pub struct Modes {
    enabled: Vec<ModeId>,
}

impl Modes {
    /// An empty mode set (nothing enabled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `mode` was just enabled. A no-op if it is already
    /// tracked as enabled.
    pub fn mark_enabled(&mut self, mode: ModeId) {
        if !self.enabled.contains(&mode) {
            self.enabled.push(mode);
        }
    }

    /// Record that `mode` was just disabled.
    pub fn mark_disabled(&mut self, mode: ModeId) {
        self.enabled.retain(|m| *m != mode);
    }

    /// True if `mode` is currently tracked as enabled.
    #[must_use]
    pub fn is_enabled(&self, mode: ModeId) -> bool {
        self.enabled.contains(&mode)
    }

    /// The modes to disable on teardown, in reverse enable order.
    pub fn teardown_order(&self) -> impl Iterator<Item = ModeId> + '_ {
        self.enabled.iter().rev().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_reverses_enable_order() {
        let mut modes = Modes::new();
        modes.mark_enabled(ModeId::AltScreen);
        modes.mark_enabled(ModeId::MouseSgr);
        modes.mark_enabled(ModeId::BracketedPaste);
        let order: Vec<_> = modes.teardown_order().collect();
        assert_eq!(
            order,
            vec![ModeId::BracketedPaste, ModeId::MouseSgr, ModeId::AltScreen]
        );
    }

    #[test]
    fn marking_enabled_twice_is_idempotent() {
        let mut modes = Modes::new();
        modes.mark_enabled(ModeId::FocusReports);
        modes.mark_enabled(ModeId::FocusReports);
        assert_eq!(modes.teardown_order().count(), 1);
    }

    #[test]
    fn disabling_removes_from_teardown_order() {
        let mut modes = Modes::new();
        modes.mark_enabled(ModeId::AltScreen);
        modes.mark_enabled(ModeId::CursorVisibility);
        modes.mark_disabled(ModeId::AltScreen);
        assert!(!modes.is_enabled(ModeId::AltScreen));
        assert_eq!(modes.teardown_order().collect::<Vec<_>>(), vec![ModeId::CursorVisibility]);
    }
}
