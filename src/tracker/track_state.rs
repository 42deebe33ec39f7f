/// Track state enumeration for object tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum TrackState {
    /// Newly spawned track, not yet matched often enough to be trusted
    #[default]
    Tentative,
    /// Track matched at least `min_hits` times and matched this cycle
    Confirmed,
    /// Track missed one or more cycles but is still within `max_age`
    Lost,
    /// Track exceeded `max_age`; removed in the cycle it enters this state
    Deleted,
}
