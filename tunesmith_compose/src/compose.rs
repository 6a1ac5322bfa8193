// Composition orchestrator: parameters in, (melody, harmony) out.
//
// `Composer` owns the read-only transition matrix table and is shared by
// reference across generation calls; each call gets its own RNG and builds
// all of its working data fresh. The three generation modes are strategies
// behind `CompositionStrategy`:
// - markov: harmony = genre progression cycled to the bar count; melody =
//   Markov walk biased toward that harmony
// - rule: melody and harmony both from the rule-based composer
// - hybrid: rule-based harmony first (its melody is dropped), then a Markov
//   melody biased toward that harmony
//
// A missing genre fails before anything is generated.

use crate::error::Result;
use crate::markov::{MarkovMelodyGenerator, MelodyRequest};
use crate::matrix::TransitionMatrixTable;
use crate::params::{CompositionParameters, GenerationMode, ResolvedParameters};
use crate::rules::{RuleBasedComposer, RuleRequest};
use crate::score::{Harmony, Melody, cycle_to_length};
use crate::theory::{Chord, DEFAULT_OCTAVE, Note, chord_progression_variant, scale_notes};
use log::{debug, info};
use serde::Serialize;
use tunesmith_prng::ComposeRng;

/// A finished piece, ready to hand to the MIDI renderer.
#[derive(Debug, Clone, Serialize)]
pub struct Composition {
    pub parameters: ResolvedParameters,
    pub melody: Melody,
    pub harmony: Harmony,
}

impl Composition {
    pub fn bar_count(&self) -> usize {
        self.harmony.len()
    }

    pub fn bpm(&self) -> u16 {
        self.parameters.bpm()
    }
}

/// Per-call inputs shared by every strategy.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    pub params: &'a ResolvedParameters,
    pub scale_notes: Vec<Note>,
    /// The genre progression before cycling.
    pub progression: Vec<Chord>,
}

impl GenerationContext<'_> {
    fn rule_request(&self) -> RuleRequest<'_> {
        RuleRequest {
            scale: &self.params.scale,
            progression: &self.progression,
            bar_count: self.params.bar_count(),
            complexity: self.params.complexity,
            mood: &self.params.mood,
            tempo: self.params.tempo,
        }
    }

    fn melody_request<'h>(&'h self, harmony: &'h [Chord]) -> MelodyRequest<'h> {
        MelodyRequest {
            scale_notes: &self.scale_notes,
            bar_count: self.params.bar_count(),
            complexity: self.params.complexity,
            mood: &self.params.mood,
            genre: &self.params.genre,
            harmony: Some(harmony),
            tempo: self.params.tempo,
        }
    }
}

/// One way of producing a (melody, harmony) pair.
pub trait CompositionStrategy: Sync {
    fn compose(
        &self,
        composer: &Composer,
        ctx: &GenerationContext<'_>,
        rng: &mut ComposeRng,
    ) -> Result<(Melody, Harmony)>;
}

pub struct MarkovStrategy;
pub struct RuleStrategy;
pub struct HybridStrategy;

impl CompositionStrategy for MarkovStrategy {
    fn compose(
        &self,
        composer: &Composer,
        ctx: &GenerationContext<'_>,
        rng: &mut ComposeRng,
    ) -> Result<(Melody, Harmony)> {
        let harmony = cycle_to_length(&ctx.progression, ctx.params.bar_count());
        let melody = composer.markov().generate(&ctx.melody_request(&harmony), rng);
        Ok((melody, harmony))
    }
}

impl CompositionStrategy for RuleStrategy {
    fn compose(
        &self,
        composer: &Composer,
        ctx: &GenerationContext<'_>,
        rng: &mut ComposeRng,
    ) -> Result<(Melody, Harmony)> {
        composer.rules.compose(&ctx.rule_request(), rng)
    }
}

impl CompositionStrategy for HybridStrategy {
    fn compose(
        &self,
        composer: &Composer,
        ctx: &GenerationContext<'_>,
        rng: &mut ComposeRng,
    ) -> Result<(Melody, Harmony)> {
        let (_, harmony) = composer.rules.compose(&ctx.rule_request(), rng)?;
        let melody = composer.markov().generate(&ctx.melody_request(&harmony), rng);
        Ok((melody, harmony))
    }
}

impl GenerationMode {
    pub fn strategy(self) -> &'static dyn CompositionStrategy {
        match self {
            GenerationMode::Markov => &MarkovStrategy,
            GenerationMode::Rule => &RuleStrategy,
            GenerationMode::Hybrid => &HybridStrategy,
        }
    }
}

/// Entry point of the engine. Holds only read-only tables, so one instance
/// can serve any number of callers.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    matrices: TransitionMatrixTable,
    rules: RuleBasedComposer,
}

impl Composer {
    pub fn new(matrices: TransitionMatrixTable) -> Self {
        Composer {
            matrices,
            rules: RuleBasedComposer::new(),
        }
    }

    pub fn matrices(&self) -> &TransitionMatrixTable {
        &self.matrices
    }

    fn markov(&self) -> MarkovMelodyGenerator<'_> {
        MarkovMelodyGenerator::new(&self.matrices)
    }

    /// Resolve defaults and generate. Fails with `MissingParameter` before
    /// any generation when the genre is absent.
    pub fn generate(&self, params: &CompositionParameters, rng: &mut ComposeRng) -> Result<Composition> {
        let resolved = params.resolve()?;
        self.generate_resolved(resolved, rng)
    }

    pub fn generate_resolved(&self, params: ResolvedParameters, rng: &mut ComposeRng) -> Result<Composition> {
        debug!("resolved parameters: {params:?}");
        let ctx = GenerationContext {
            scale_notes: scale_notes(&params.scale, DEFAULT_OCTAVE)?,
            progression: chord_progression_variant(&params.genre, &params.scale, params.progression)?,
            params: &params,
        };

        debug!("dispatching to {:?} strategy", params.mode);
        let (melody, harmony) = params.mode.strategy().compose(self, &ctx, rng)?;
        info!(
            "composed {} bars ({:?} mode): {} melody events, {} chords",
            params.bar_count(),
            params.mode,
            melody.len(),
            harmony.len()
        );
        if params.vocals.enabled {
            debug!("vocals requested ({:?}); not rendered", params.vocals.kind);
        }
        Ok(Composition {
            parameters: params,
            melody,
            harmony,
        })
    }
}
