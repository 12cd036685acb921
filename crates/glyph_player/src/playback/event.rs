/// Input the controller reacts to, independent of any windowing toolkit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    /// New output surface size in pixels.
    Resize(u32, u32),
    PauseToggle,
    SkipForward,
    SkipBackward,
}
