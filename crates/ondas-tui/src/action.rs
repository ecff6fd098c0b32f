//! Actions — what components ask the app to do.
//!
//! Components never touch the player core or shared state directly: key
//! handling returns actions, the app event-loop dispatches them.

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum ComponentId {
    StationList,
    NowPlaying,
    Visualizer,
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Tune the station at this catalog index.
    Tune(usize),
    TogglePause,
    StopPlayback,
    NextStation,
    PrevStation,
    RandomStation,
    VolumeDelta(f32),
    /// Copy the current share message to the clipboard.
    CopyShare,
    Focus(ComponentId),
    FocusNext,
    Quit,
}
