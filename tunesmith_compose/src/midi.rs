// MIDI output for compositions.
//
// Converts a melody and harmony into a Standard MIDI File (SMF Format 1).
// Track 0 carries the tempo. Each instrument then gets a melody track and,
// after all melody tracks, a harmony track, both on the instrument's channel.
// "Drums" always plays on the percussion channel (index 9); other
// instruments take channels in order, skipping 9.
//
// Time: melody durations are fractions of a whole note, so one event lasts
// `duration * 4` quarter notes. Every chord lasts one 4/4 bar. The chord's
// tones are dealt round-robin across instruments: instrument `i` plays
// tones `i, i + n, i + 2n, ...` for `n` instruments.
//
// Each instrument plays a figure over the melody rather than the bare line
// (guitar doubles an octave up on every third note, bass an octave down on
// every fourth, and so on; see `melody_figure`). Keys outside 0..=127 after
// transposition are dropped with a warning.
//
// Uses the `midly` crate for MIDI writing.

use crate::compose::Composition;
use crate::error::Result;
use crate::params::Vocals;
use crate::score::MelodyEvent;
use crate::theory::{Chord, Pitch};
use log::{debug, info, warn};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u32 = 480;

/// Quarter notes per 4/4 bar; also the length of one harmony chord.
const QUARTERS_PER_BAR: u32 = 4;

const PERCUSSION_CHANNEL: u8 = 9;
const HARMONY_VELOCITY: u8 = 80;
const DEFAULT_VELOCITY: u8 = 90;

/// General MIDI drum keys used by the drum figure.
const SNARE: Pitch = 38;
const KICK: Pitch = 36;

/// General MIDI program numbers by instrument name. Unknown names play as
/// Acoustic Grand Piano (program 0).
const INSTRUMENT_PROGRAMS: &[(&str, u8)] = &[
    ("Piano", 0),
    ("Acoustic Grand Piano", 0),
    ("Bright Acoustic Piano", 1),
    ("Electric Piano", 4),
    ("Harpsichord", 6),
    ("Celesta", 8),
    ("Glockenspiel", 9),
    ("Music Box", 10),
    ("Vibraphone", 11),
    ("Marimba", 12),
    ("Xylophone", 13),
    ("Tubular Bells", 14),
    ("Drawbar Organ", 16),
    ("Rock Organ", 18),
    ("Church Organ", 19),
    ("Accordion", 21),
    ("Harmonica", 22),
    ("Guitar", 24),
    ("Acoustic Guitar", 24),
    ("Acoustic Guitar (steel)", 25),
    ("Electric Guitar", 26),
    ("Electric Guitar (clean)", 27),
    ("Overdriven Guitar", 29),
    ("Distortion Guitar", 30),
    ("Acoustic Bass", 32),
    ("Bass", 33),
    ("Electric Bass", 33),
    ("Fretless Bass", 35),
    ("Slap Bass 1", 36),
    ("Synth Bass 1", 38),
    ("Violin", 40),
    ("Viola", 41),
    ("Cello", 42),
    ("Contrabass", 43),
    ("Pizzicato Strings", 45),
    ("Orchestral Harp", 46),
    ("Timpani", 47),
    ("Strings", 48),
    ("String Ensemble 1", 48),
    ("Synth Strings 1", 50),
    ("Choir Aahs", 52),
    ("Voice Oohs", 53),
    ("Trumpet", 56),
    ("Trombone", 57),
    ("Tuba", 58),
    ("French Horn", 60),
    ("Brass Section", 61),
    ("Soprano Sax", 64),
    ("Alto Sax", 65),
    ("Tenor Sax", 66),
    ("Baritone Sax", 67),
    ("Oboe", 68),
    ("Bassoon", 70),
    ("Clarinet", 71),
    ("Piccolo", 72),
    ("Flute", 73),
    ("Recorder", 74),
    ("Pan Flute", 75),
    ("Ocarina", 79),
    ("Synth", 80),
    ("Pad 2 (warm)", 89),
    ("Sitar", 104),
    ("Banjo", 105),
    ("Kalimba", 108),
    ("Bagpipe", 109),
    ("Steel Drums", 114),
    ("Drums", 0),
];

/// GM program for an instrument name (exact match, then case-insensitive).
pub fn program_for(instrument: &str) -> u8 {
    INSTRUMENT_PROGRAMS
        .iter()
        .find(|(name, _)| *name == instrument)
        .or_else(|| {
            INSTRUMENT_PROGRAMS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(instrument))
        })
        .map(|(_, program)| *program)
        .unwrap_or(0)
}

fn is_drums(instrument: &str) -> bool {
    instrument.eq_ignore_ascii_case("Drums")
}

/// MIDI channel for the `index`-th instrument.
pub fn channel_for(instrument: &str, index: usize) -> u8 {
    if is_drums(instrument) {
        return PERCUSSION_CHANNEL;
    }
    // 15 melodic channels: 0-8 and 10-15.
    let slot = (index % 15) as u8;
    if slot >= PERCUSSION_CHANNEL { slot + 1 } else { slot }
}

/// Notes (key, velocity) an instrument plays for the `index`-th melody event.
fn melody_figure(instrument: &str, index: usize, pitch: Pitch) -> Vec<(Pitch, u8)> {
    match instrument {
        "Piano" => vec![(pitch, 100)],
        "Guitar" if index % 3 == 0 => vec![(pitch + 12, 90)],
        "Bass" if index % 4 == 0 => vec![(pitch - 12, 95)],
        "Drums" if index % 4 == 0 => vec![(SNARE, 100), (KICK, 110)],
        "Drums" if index % 2 == 0 => vec![(SNARE, 100)],
        "Violin" if index % 2 == 1 => vec![(pitch + 12, 85)],
        "Synth" if index % 3 == 1 => vec![(pitch + 7, 80)],
        "Flute" if index % 3 == 2 => vec![(pitch + 24, 75)],
        "Trumpet" if index % 4 == 2 => vec![(pitch + 12, 90)],
        _ => vec![(pitch, DEFAULT_VELOCITY)],
    }
}

/// A sounding note in absolute ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoteSpan {
    start: u32,
    length: u32,
    key: u8,
    velocity: u8,
}

fn span(start: u32, length: u32, pitch: Pitch, velocity: u8) -> Option<NoteSpan> {
    match u8::try_from(pitch) {
        Ok(key) if key <= 127 => Some(NoteSpan {
            start,
            length,
            key,
            velocity,
        }),
        _ => {
            warn!("dropping note with out-of-range MIDI key {pitch}");
            None
        }
    }
}

/// Ticks for a duration given in whole notes.
fn duration_ticks(duration: f64) -> u32 {
    (duration * f64::from(QUARTERS_PER_BAR * TICKS_PER_QUARTER))
        .round()
        .max(0.0) as u32
}

fn melody_spans(melody: &[MelodyEvent], instrument: &str) -> Vec<NoteSpan> {
    let mut spans = Vec::new();
    let mut tick = 0u32;
    for (index, event) in melody.iter().enumerate() {
        let length = duration_ticks(event.duration);
        for (pitch, velocity) in melody_figure(instrument, index, event.note.pitch()) {
            spans.extend(span(tick, length, pitch, velocity));
        }
        tick += length;
    }
    spans
}

fn harmony_spans(harmony: &[Chord], part: usize, parts: usize) -> Vec<NoteSpan> {
    let bar = QUARTERS_PER_BAR * TICKS_PER_QUARTER;
    let mut spans = Vec::new();
    for (bar_index, chord) in harmony.iter().enumerate() {
        let start = bar_index as u32 * bar;
        for note in chord.notes().into_iter().skip(part).step_by(parts.max(1)) {
            spans.extend(span(start, bar, note.pitch(), HARMONY_VELOCITY));
        }
    }
    spans
}

/// Build a track from note spans: name, program change, then note events
/// in time order with note-offs ahead of note-ons at the same tick.
fn build_track<'a>(name: &'a str, channel: u8, program: u8, spans: &[NoteSpan]) -> Track<'a> {
    let channel = u4::new(channel);
    let mut track: Track<'a> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        },
    });

    // (tick, is_on, key, velocity); false sorts before true.
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(spans.len() * 2);
    for s in spans {
        events.push((s.start, true, s.key, s.velocity));
        events.push((s.start + s.length, false, s.key, 0));
    }
    events.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut last_tick = 0u32;
    for (tick, is_on, key, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

/// Convert a melody and harmony to an in-memory SMF.
pub fn composition_to_smf<'a>(
    melody: &[MelodyEvent],
    harmony: &[Chord],
    instruments: &'a [String],
    bpm: u16,
) -> Smf<'a> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));

    // Below 4 BPM the microseconds-per-quarter value no longer fits in 24 bits.
    let tempo_microseconds = 60_000_000 / u32::from(bpm.max(4));
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    for (i, instrument) in instruments.iter().enumerate() {
        let spans = melody_spans(melody, instrument);
        smf.tracks.push(build_track(
            instrument,
            channel_for(instrument, i),
            program_for(instrument),
            &spans,
        ));
    }
    for (i, instrument) in instruments.iter().enumerate() {
        let spans = harmony_spans(harmony, i, instruments.len());
        smf.tracks.push(build_track(
            instrument,
            channel_for(instrument, i),
            program_for(instrument),
            &spans,
        ));
    }
    smf
}

/// Render to SMF bytes. `vocals` is accepted but produces no track.
pub fn render(
    melody: &[MelodyEvent],
    harmony: &[Chord],
    instruments: &[String],
    bpm: u16,
    vocals: &Vocals,
) -> Result<Vec<u8>> {
    if vocals.enabled {
        debug!("vocals ({:?}) requested; no vocal track is rendered", vocals.kind);
    }
    let smf = composition_to_smf(melody, harmony, instruments, bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    debug!(
        "rendered {} tracks, {} bytes at {bpm} BPM",
        smf.tracks.len(),
        buf.len()
    );
    Ok(buf)
}

/// Render a composition and write it to `path`.
pub fn write_midi(composition: &Composition, path: &Path) -> Result<()> {
    let params = &composition.parameters;
    let bytes = render(
        &composition.melody,
        &composition.harmony,
        &params.instruments,
        composition.bpm(),
        &params.vocals,
    )?;
    std::fs::write(path, &bytes)?;
    info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody(notes: &[(&str, f64)]) -> Vec<MelodyEvent> {
        notes
            .iter()
            .map(|&(n, d)| MelodyEvent::new(n.parse().unwrap(), d))
            .collect()
    }

    fn chords(names: &[&str]) -> Vec<Chord> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    fn instruments(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    /// (absolute tick, key, velocity) of every note-on in a track.
    fn note_ons(track: &Track<'_>) -> Vec<(u32, u8, u8)> {
        let mut tick = 0u32;
        let mut out = Vec::new();
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } = event.kind
            {
                out.push((tick, key.as_int(), vel.as_int()));
            }
        }
        out
    }

    #[test]
    fn test_track_layout() {
        let inst = instruments(&["Piano", "Bass"]);
        let smf = composition_to_smf(
            &melody(&[("C4", 0.25)]),
            &chords(&["C Major"]),
            &inst,
            100,
        );
        // Tempo + 2 melody + 2 harmony.
        assert_eq!(smf.tracks.len(), 5);
        assert_eq!(smf.header.format, Format::Parallel);
        assert!(matches!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 600_000
        ));
    }

    #[test]
    fn test_piano_melody_timing() {
        let inst = instruments(&["Piano"]);
        let smf = composition_to_smf(
            &melody(&[("C4", 0.25), ("E4", 0.5), ("G4", 0.125)]),
            &[],
            &inst,
            120,
        );
        assert_eq!(
            note_ons(&smf.tracks[1]),
            vec![(0, 60, 100), (480, 64, 100), (1440, 67, 100)]
        );
    }

    #[test]
    fn test_harmony_round_robin() {
        let inst = instruments(&["Piano", "Violin"]);
        let harmony = chords(&["C Major", "G Major"]);
        let smf = composition_to_smf(&[], &harmony, &inst, 100);
        // Piano takes tones 0 and 2, violin takes tone 1.
        assert_eq!(
            note_ons(&smf.tracks[3]),
            vec![(0, 60, 80), (0, 67, 80), (1920, 67, 80), (1920, 74, 80)]
        );
        assert_eq!(note_ons(&smf.tracks[4]), vec![(0, 64, 80), (1920, 71, 80)]);
    }

    #[test]
    fn test_drum_figure_and_channel() {
        assert_eq!(channel_for("Drums", 0), 9);
        let inst = instruments(&["Drums"]);
        let smf = composition_to_smf(
            &melody(&[("C4", 0.25), ("D4", 0.25), ("E4", 0.25)]),
            &[],
            &inst,
            100,
        );
        let ons = note_ons(&smf.tracks[1]);
        assert_eq!(
            ons,
            vec![
                (0, KICK as u8, 110),
                (0, SNARE as u8, 100),
                (480, 62, 90),
                (960, SNARE as u8, 100),
            ]
        );
        assert!(smf.tracks[1].iter().all(|e| match e.kind {
            TrackEventKind::Midi { channel, .. } => channel.as_int() == 9,
            _ => true,
        }));
    }

    #[test]
    fn test_melodic_channels_skip_percussion() {
        let channels: Vec<u8> = (0..16).map(|i| channel_for("Piano", i)).collect();
        assert!(!channels[..15].contains(&9));
        assert_eq!(channels[8], 8);
        assert_eq!(channels[9], 10);
        assert_eq!(channels[14], 15);
        assert_eq!(channels[15], 0);
    }

    #[test]
    fn test_out_of_range_keys_dropped() {
        let inst = instruments(&["Flute"]);
        // Third event gets +24 semitones: 120 + 24 is past 127.
        let smf = composition_to_smf(
            &melody(&[("C9", 0.25), ("C9", 0.25), ("C9", 0.25)]),
            &[],
            &inst,
            100,
        );
        assert_eq!(note_ons(&smf.tracks[1]).len(), 2);
    }

    #[test]
    fn test_program_lookup() {
        assert_eq!(program_for("Violin"), 40);
        assert_eq!(program_for("flute"), 73);
        assert_eq!(program_for("Theremin"), 0);
    }

    #[test]
    fn test_note_offs_sorted_before_ons() {
        let inst = instruments(&["Piano"]);
        let smf = composition_to_smf(&melody(&[("C4", 0.25), ("C4", 0.25)]), &[], &inst, 100);
        let kinds: Vec<&str> = smf.tracks[1]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { .. },
                    ..
                } => Some("on"),
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                } => Some("off"),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, ["on", "off", "on", "off"]);
    }

    #[test]
    fn test_render_parses_back() {
        let inst = instruments(&["Piano", "Drums"]);
        let bytes = render(
            &melody(&[("A4", 0.25), ("B4", 0.25)]),
            &chords(&["A Minor"]),
            &inst,
            70,
            &Vocals::default(),
        )
        .unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 5);
    }

    #[test]
    fn test_vocals_add_no_track() {
        let inst = instruments(&["Piano"]);
        let notes = melody(&[("C4", 0.25), ("D4", 0.5)]);
        let harmony = chords(&["C Major"]);
        let plain = render(&notes, &harmony, &inst, 100, &Vocals::default()).unwrap();
        let choir = Vocals {
            enabled: true,
            kind: Some("Choir".into()),
        };
        let with_vocals = render(&notes, &harmony, &inst, 100, &choir).unwrap();
        assert_eq!(plain, with_vocals);
    }
}
