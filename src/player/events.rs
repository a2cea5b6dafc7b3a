/// Raw lifecycle event emitted by a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration is known and seeking is possible
    MetadataReady { duration: f64 },
    CanPlay,
    /// Playback stalled waiting for data
    Buffering,
    Playing,
    Paused,
    Ended,
    Error { message: String },
    /// Playhead moved
    TimeUpdate { position: f64 },
    /// Buffered range changed
    Progress { buffered_fraction: f64 },
}

/// Event from the hosting environment rather than the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Hidden,
    Visible,
    LeftViewport,
    EnteredViewport,
    Unloading,
}
