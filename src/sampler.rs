//! External sampler hook (C10).
//!
//! Spec.md §4.10: "a callable with contract `sample(lat, lon, timeHours) ->
//! EnvironmentSample`... deterministic... free of observable side
//! effects. If it throws/fails, the solver falls back to the internal
//! pack sampler for that call and sets `SAMPLER_FAILURE`." A host sampler
//! "failing" is modeled as returning `None`, since Rust closures don't
//! throw; the façade (C9) is the only thing that owns a `&dyn
//! EnvironmentSampler` plus the internal fallback, capturing the value
//! for the lifetime of one solve and releasing it at return, per spec.md
//! §9's "host-supplied sampler as a value" design note.
//!
//! The isochrone solver (C7) fans a `SamplerSource` out across `rayon`
//! worker threads, so both the external trait object and the fallback
//! flag must be thread-safe: the sampler reference is bounded `+ Sync`
//! and fallback tracking uses `AtomicBool` rather than `Cell<bool>`.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::data::{EnvironmentSample, GeoPoint};
use crate::environment::EnvironmentPack;

/// The external sampler contract. Implemented for any matching closure.
pub trait EnvironmentSampler {
    fn sample(&self, p: GeoPoint, time_hours: f64) -> Option<EnvironmentSample>;
}

impl<F> EnvironmentSampler for F
where
    F: Fn(GeoPoint, f64) -> Option<EnvironmentSample>,
{
    fn sample(&self, p: GeoPoint, time_hours: f64) -> Option<EnvironmentSample> {
        self(p, time_hours)
    }
}

/// Combines an optional host-supplied sampler with the internal pack
/// fallback, tracking whether any call this solve had to fall back.
pub struct SamplerSource<'a> {
    external: Option<&'a (dyn EnvironmentSampler + Sync)>,
    pack: Option<&'a EnvironmentPack>,
    fell_back: AtomicBool,
}

impl<'a> SamplerSource<'a> {
    pub fn new(external: Option<&'a (dyn EnvironmentSampler + Sync)>, pack: Option<&'a EnvironmentPack>) -> Self {
        Self { external, pack, fell_back: AtomicBool::new(false) }
    }

    /// Samples, preferring the host-supplied callback; falls back to the
    /// internal pack (or a calm-sea default if no pack is loaded either)
    /// on failure.
    pub fn sample(&self, p: GeoPoint, time_hours: f64) -> EnvironmentSample {
        if let Some(sampler) = self.external {
            if let Some(sample) = sampler.sample(p, time_hours) {
                return sample;
            }
            self.fell_back.store(true, Ordering::Relaxed);
        }
        match self.pack {
            Some(pack) => pack.sample(p, time_hours),
            None => EnvironmentSample::calm(),
        }
    }

    /// True iff any call this solve fell back from the external sampler.
    pub fn sampler_failed(&self) -> bool {
        self.fell_back.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GridDescriptor;

    #[test]
    fn prefers_external_sampler() {
        let sampler = |_p: GeoPoint, _t: f64| Some(EnvironmentSample { current_east_kn: 5.0, current_north_kn: 0.0, wave_height_m: 0.0, depth_m: 100.0 });
        let source = SamplerSource::new(Some(&sampler), None);
        let sample = source.sample(GeoPoint::new(0.0, 0.0), 0.0);
        assert_eq!(sample.current_east_kn, 5.0);
        assert!(!source.sampler_failed());
    }

    #[test]
    fn falls_back_on_external_failure() {
        let failing = |_p: GeoPoint, _t: f64| None;
        let grid = GridDescriptor::new(0.0, 1.0, 0.0, 1.0, 1.0, 1.0);
        let pack = EnvironmentPack::empty(grid);
        let source = SamplerSource::new(Some(&failing), Some(&pack));
        let sample = source.sample(GeoPoint::new(0.5, 0.5), 0.0);
        assert_eq!(sample.wave_height_m, crate::environment::DEFAULT_WAVE_HEIGHT_M);
        assert!(source.sampler_failed());
    }

    #[test]
    fn no_sampler_no_pack_is_calm_sea() {
        let source = SamplerSource::new(None, None);
        let sample = source.sample(GeoPoint::new(0.0, 0.0), 0.0);
        assert_eq!(sample, EnvironmentSample::calm());
    }
}
