//! Pulse areas and the ratios built from them.
//!
//! A pulse area is the time integral of one channel over a sample window. The
//! ratios compose areas by subtraction then division:
//!
//! ```text
//! normalised = area(trans) / area(ref)
//! corrected  = (area(signal.trans) − area(control.trans)) / area(signal.ref)
//! ```

use crate::domain::{AreaChannels, Channel, SampleWindow, Trace, TrimOffsets};
use crate::error::AnalysisResult;
use crate::math::{Quadrature, integrate};

pub use crate::math::normalise;

/// Integration windows for the transmitted and reference channels.
///
/// `None` integrates the whole trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaWindows {
    pub transmitted: Option<SampleWindow>,
    pub reference: Option<SampleWindow>,
}

impl AreaWindows {
    pub fn full() -> Self {
        Self::default()
    }

    /// Windows after the trigger, skipping each channel's dead time.
    pub fn from_trim(trim: &TrimOffsets) -> AnalysisResult<Self> {
        Ok(Self {
            transmitted: Some(trim.signal_window()?),
            reference: Some(trim.reference_window()?),
        })
    }
}

/// Integral of `channel` against time, over `window` or the whole trace.
pub fn pulse_area(
    trace: &Trace,
    channel: Channel,
    window: Option<SampleWindow>,
    rule: Quadrature,
) -> AnalysisResult<f64> {
    let window = match window {
        Some(w) => {
            w.check_within(trace.len())?;
            w
        }
        None => SampleWindow {
            start: 0,
            end: trace.len(),
        },
    };
    let range = window.start..window.end;
    integrate(rule, &trace.channel(channel)[range.clone()], &trace.time()[range])
}

/// `area(trans) / area(ref)`, with no control subtraction.
pub fn normalise_pulse_area(
    trace: &Trace,
    channels: AreaChannels,
    windows: AreaWindows,
    rule: Quadrature,
) -> AnalysisResult<f64> {
    let trans = pulse_area(trace, channels.transmitted(), windows.transmitted, rule)?;
    let reference = pulse_area(trace, channels.reference(), windows.reference, rule)?;
    normalise(trans, reference, 0.0)
}

/// Signal pulse area with the leakage measured in `control` removed,
/// normalised by the signal trace's reference area.
pub fn corrected_pulse_area(
    signal: &Trace,
    control: &Trace,
    channels: AreaChannels,
    windows: AreaWindows,
    rule: Quadrature,
) -> AnalysisResult<f64> {
    let trans = pulse_area(signal, channels.transmitted(), windows.transmitted, rule)?;
    let reference = pulse_area(signal, channels.reference(), windows.reference, rule)?;
    let leakage = pulse_area(control, channels.transmitted(), windows.transmitted, rule)?;
    tracing::debug!(trans, reference, leakage, "corrected pulse area inputs");
    normalise(trans, reference, leakage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use assert_approx_eq::assert_approx_eq;

    fn triangle(trans_peak: f64, ref_peak: f64) -> Trace {
        Trace::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, trans_peak, 0.0],
            vec![0.0, ref_peak, 0.0],
            vec![0.0, trans_peak, 0.0],
            vec![0.0, ref_peak, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn triangle_areas_and_ratio() {
        let trace = triangle(1.0, 2.0);
        let simpson = pulse_area(&trace, Channel::SignalTransmitted, None, Quadrature::Simpson).unwrap();
        assert_approx_eq!(simpson, 4.0 / 3.0, 1e-12);
        let trapezoid =
            pulse_area(&trace, Channel::SignalReference, None, Quadrature::Trapezoid).unwrap();
        assert_approx_eq!(trapezoid, 2.0, 1e-12);

        for rule in [Quadrature::Simpson, Quadrature::Trapezoid] {
            let ratio =
                normalise_pulse_area(&trace, AreaChannels::Signal, AreaWindows::full(), rule).unwrap();
            assert_approx_eq!(ratio, 0.5, 1e-12);
        }
    }

    #[test]
    fn corrected_area_subtracts_leakage() {
        let signal = triangle(3.0, 4.0);
        let leakage = triangle(1.0, 4.0);
        let corrected = corrected_pulse_area(
            &signal,
            &leakage,
            AreaChannels::Control,
            AreaWindows::full(),
            Quadrature::Trapezoid,
        )
        .unwrap();
        assert_approx_eq!(corrected, (3.0 - 1.0) / 4.0, 1e-12);

        let none_left = corrected_pulse_area(
            &signal,
            &signal,
            AreaChannels::Signal,
            AreaWindows::full(),
            Quadrature::Simpson,
        )
        .unwrap();
        assert_eq!(none_left, 0.0);
    }

    #[test]
    fn window_outside_trace_is_a_domain_error() {
        let trace = triangle(1.0, 2.0);
        let err = pulse_area(
            &trace,
            Channel::SignalTransmitted,
            Some(SampleWindow { start: 1, end: 4 }),
            Quadrature::Simpson,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::IntegrationDomain(_)));
    }

    #[test]
    fn flat_reference_cannot_normalise() {
        let trace = triangle(1.0, 0.0);
        assert!(matches!(
            normalise_pulse_area(&trace, AreaChannels::Signal, AreaWindows::full(), Quadrature::Simpson),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
