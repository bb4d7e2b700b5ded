//! Band-limited filtering of the unwrapped phase.
//!
//! Two FIR bandpass filters separate the unwrapped phase into breathing and
//! heart components. The heart band additionally detrends the phase with a
//! Hodrick-Prescott filter first, since the heart signal rides on top of the
//! much larger breathing motion. Filtered samples are accumulated in rings
//! so spectra always see a full processing window.

use crate::buffer::RingBuffer;
use crate::config::BandEdges;
use crate::processing::{fir_filter, firwin_bandpass, hp_filter, ProcessingError};
use crate::types::VitalBand;

struct BandState {
    edges: BandEdges,
    taps: Vec<f64>,
    filtered: RingBuffer<f64>,
    /// Vitals-spectrum bin bounds for this band's peak search.
    bin_start: usize,
    bin_end: usize,
}

/// Filters the unwrapped phase window into physiological bands.
pub struct BandpassEstimator {
    breathing: BandState,
    heart: BandState,
    sample_rate: f64,
    vitals_fft_size: usize,
    window_len: usize,
    filter_order: usize,
    /// Hodrick-Prescott smoothing for the heart-band detrend.
    hp_lambda: f64,
}

/// Trailing filtered windows produced each tick.
pub struct FilteredBands {
    pub breathing: Vec<f64>,
    pub heart: Vec<f64>,
    /// Newest breathing sample, fed to the amplitude normalizer.
    pub breathing_latest: f64,
}

impl BandpassEstimator {
    pub fn new(
        breathing: BandEdges,
        heart: BandEdges,
        filter_order: usize,
        sample_rate: f64,
        buffer_len: usize,
        window_len: usize,
        vitals_fft_size: usize,
    ) -> Result<Self, ProcessingError> {
        let make_band = |edges: BandEdges| -> Result<BandState, ProcessingError> {
            Ok(BandState {
                edges,
                taps: firwin_bandpass(filter_order, edges.low_hz, edges.high_hz, sample_rate)?,
                filtered: RingBuffer::zeroed(buffer_len),
                bin_start: Self::freq_to_bin(edges.low_hz, sample_rate, vitals_fft_size),
                bin_end: Self::freq_to_bin(edges.high_hz, sample_rate, vitals_fft_size),
            })
        };
        Ok(Self {
            breathing: make_band(breathing)?,
            heart: make_band(heart)?,
            sample_rate,
            vitals_fft_size,
            window_len,
            filter_order,
            hp_lambda: 3.0 * sample_rate,
        })
    }

    fn freq_to_bin(freq_hz: f64, sample_rate: f64, fft_size: usize) -> usize {
        (freq_hz / sample_rate * fft_size as f64) as usize
    }

    /// Filter one tick's unwrapped phase window into both bands.
    pub fn process(&mut self, unwrapped_window: &[f64]) -> FilteredBands {
        // Breathing: straight FIR over the raw unwrapped window.
        let filtered_breathing = fir_filter(&self.breathing.taps, unwrapped_window);
        let breathing_latest = filtered_breathing.last().copied().unwrap_or(0.0);
        self.breathing.filtered.push(breathing_latest);

        // Heart: detrend with the HP filter, then FIR on the cyclical part.
        let (cycle, _trend) = hp_filter(unwrapped_window, self.hp_lambda);
        let filtered_heart = fir_filter(&self.heart.taps, &cycle);
        self.heart
            .filtered
            .push(filtered_heart.last().copied().unwrap_or(0.0));

        FilteredBands {
            breathing: self.breathing.filtered.tail(self.window_len),
            heart: self.heart.filtered.tail(self.window_len),
            breathing_latest,
        }
    }

    /// Vitals-spectrum bin bounds for a band's peak search.
    pub fn band_bins(&self, band: VitalBand) -> (usize, usize) {
        let state = self.band(band);
        (state.bin_start, state.bin_end)
    }

    /// Current band edges.
    pub fn band_edges(&self, band: VitalBand) -> BandEdges {
        self.band(band).edges
    }

    /// Retune a band at runtime. Validates the edges, then recomputes the
    /// filter taps and the spectral bin bounds immediately.
    pub fn set_band(&mut self, band: VitalBand, edges: BandEdges) -> Result<(), ProcessingError> {
        if edges.low_hz >= self.sample_rate / 4.0 {
            return Err(ProcessingError::InvalidBand {
                low: edges.low_hz,
                high: edges.high_hz,
                sample_rate: self.sample_rate,
            });
        }
        let taps = firwin_bandpass(
            self.filter_order,
            edges.low_hz,
            edges.high_hz,
            self.sample_rate,
        )?;
        let bin_start = Self::freq_to_bin(edges.low_hz, self.sample_rate, self.vitals_fft_size);
        let bin_end = Self::freq_to_bin(edges.high_hz, self.sample_rate, self.vitals_fft_size);
        let state = self.band_mut(band);
        state.edges = edges;
        state.taps = taps;
        state.bin_start = bin_start;
        state.bin_end = bin_end;
        Ok(())
    }

    /// Zero both filtered rings in place, keeping them full.
    pub fn reset(&mut self) {
        self.breathing.filtered.fill_default();
        self.heart.filtered.fill_default();
    }

    fn band(&self, band: VitalBand) -> &BandState {
        match band {
            VitalBand::Breathing => &self.breathing,
            VitalBand::Heart => &self.heart,
        }
    }

    fn band_mut(&mut self, band: VitalBand) -> &mut BandState {
        match band {
            VitalBand::Breathing => &mut self.breathing,
            VitalBand::Heart => &mut self.heart,
        }
    }
}
