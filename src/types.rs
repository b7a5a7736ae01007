use std::collections::BTreeMap;

/// Spectral template for an individual note or a whole musical event:
/// one non-negative weight per frequency bin.
pub type Template = Vec<f32>;

/// Per-pitch note templates keyed by MIDI note number.
pub type NoteTemplates = BTreeMap<u8, Template>;

/// Lowest MIDI pitch on a standard piano keyboard (A0).
pub const LOW_MIDI: u8 = 21;
/// Highest MIDI pitch on a standard piano keyboard (C8).
pub const HIGH_MIDI: u8 = 108;

/// One entry of the score: a set of simultaneously sounding pitches with
/// a notated duration and a local tempo.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicalEvent {
    /// Notated duration in quarter-note units.
    pub duration: f64,
    /// Local tempo in quarter notes per minute.
    pub tempo: f64,
    /// MIDI pitches sounding during the event; empty for a rest.
    pub pitches: Vec<u8>,
    /// Composite spectral template, filled in when note templates are
    /// attached to the score. Empty until then.
    pub template: Template,
}

/// One frame index per score event, in score order.
pub type AlignmentResult = Vec<usize>;
