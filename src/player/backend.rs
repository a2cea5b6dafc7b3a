use async_trait::async_trait;

/// Read-only view of the playhead
///
/// This is all the sync engine is given, so it can never issue commands that
/// would feed back into playback.
pub trait PositionSource: Send + Sync {
    fn position(&self) -> f64;
    fn duration(&self) -> f64;
}

/// Decode/render surface driven by the playback state machine
///
/// Lifecycle events are delivered separately as a stream of
/// [`MediaEvent`](super::events::MediaEvent)s. Every successful `play` or
/// `pause` must be followed by exactly one `Playing` or `Paused` event.
#[async_trait]
pub trait MediaElement: PositionSource {
    fn name(&self) -> &'static str;

    /// Request playback. Fails when the element refuses to start, e.g. an
    /// autoplay policy blocked it.
    async fn play(&self) -> anyhow::Result<()>;
    async fn pause(&self) -> anyhow::Result<()>;
    async fn seek(&self, seconds: f64) -> anyhow::Result<()>;

    fn set_muted(&self, muted: bool);
    fn set_volume(&self, volume: f64);
    fn set_playback_rate(&self, rate: f64);

    fn set_fullscreen(&self, _fullscreen: bool) {}
}
