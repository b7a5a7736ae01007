//! `.solo` score parsing using winnow combinators.
//!
//! The format is line-oriented: `<duration> <tempo> [pitch ...]`, one
//! musical event per line. `#` starts a comment; blank lines are skipped.
//! Durations accept integer, decimal, and `n/d` fraction notation, all in
//! quarter-note units.

use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::error::AlignmentError;
use crate::types::{MusicalEvent, Template, HIGH_MIDI, LOW_MIDI};

type PResult<T> = winnow::ModalResult<T>;

fn ws0(input: &mut &str) -> PResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .parse_next(input)
        .map(|_: &str| ())
}

fn ws1(input: &mut &str) -> PResult<()> {
    take_while(1.., |c: char| c == ' ' || c == '\t')
        .parse_next(input)
        .map(|_: &str| ())
}

fn digits<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

/// Parse a non-negative decimal number (`2`, `0.5`, `132.5`).
fn parse_decimal(input: &mut &str) -> PResult<f64> {
    let whole = digits(input)?;
    let frac = opt(parse_frac_digits).parse_next(input)?;
    let mut value: f64 = whole.parse().unwrap_or(f64::INFINITY);
    if let Some(d) = frac {
        let scale = 10f64.powi(d.len() as i32);
        value += d.parse::<f64>().unwrap_or(f64::INFINITY) / scale;
    }
    Ok(value)
}

fn parse_frac_digits<'s>(input: &mut &'s str) -> PResult<&'s str> {
    '.'.parse_next(input)?;
    digits(input)
}

/// Parse a fraction (`3/2`, `1/4`).
fn parse_fraction(input: &mut &str) -> PResult<f64> {
    let num = digits(input)?;
    '/'.parse_next(input)?;
    let den = digits(input)?;
    let num: f64 = num.parse().unwrap_or(f64::INFINITY);
    let den: f64 = den.parse().unwrap_or(f64::INFINITY);
    Ok(num / den)
}

fn parse_duration(input: &mut &str) -> PResult<f64> {
    alt((parse_fraction, parse_decimal)).parse_next(input)
}

fn parse_pitch(input: &mut &str) -> PResult<u32> {
    ws1(input)?;
    let d = digits(input)?;
    Ok(d.parse().unwrap_or(u32::MAX))
}

fn parse_event_line(input: &mut &str) -> PResult<(f64, f64, Vec<u32>)> {
    ws0(input)?;
    let duration = parse_duration(input)?;
    ws1(input)?;
    let tempo = parse_decimal(input)?;
    let pitches: Vec<u32> = repeat(0.., parse_pitch).parse_next(input)?;
    ws0(input)?;
    Ok((duration, tempo, pitches))
}

/// Parse the full text of a `.solo` file into the event list.
///
/// Zero tempo is accepted here so the state-chain builder can report it as
/// its own precondition failure; everything else is validated in place.
pub(crate) fn parse_solo_text(text: &str) -> Result<Vec<MusicalEvent>, AlignmentError> {
    let mut events = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (duration, tempo, pitches) = parse_event_line
            .parse(line)
            .map_err(|e| AlignmentError::score_load(format!("line {line_no}: {e}")))?;
        if !(duration.is_finite() && duration > 0.0) {
            return Err(AlignmentError::score_load(format!(
                "line {line_no}: duration must be a positive number of quarter notes"
            )));
        }
        if !tempo.is_finite() {
            return Err(AlignmentError::score_load(format!(
                "line {line_no}: tempo is out of range"
            )));
        }
        let mut resolved = Vec::with_capacity(pitches.len());
        for pitch in pitches {
            if !(u32::from(LOW_MIDI)..=u32::from(HIGH_MIDI)).contains(&pitch) {
                return Err(AlignmentError::score_load(format!(
                    "line {line_no}: pitch {pitch} outside piano range {LOW_MIDI}..={HIGH_MIDI}"
                )));
            }
            resolved.push(pitch as u8);
        }
        events.push(MusicalEvent {
            duration,
            tempo,
            pitches: resolved,
            template: Template::new(),
        });
    }
    if events.is_empty() {
        return Err(AlignmentError::score_load("score contains no events"));
    }
    Ok(events)
}
