//! Age-structured population bands and the per-turn cohort step.

use serde::{Deserialize, Serialize};

use crate::config::DemographyConfig;

pub const BAND_COUNT: usize = 5;

/// Fixed band boundaries in years: `[0,5) [5,15) [15,40) [40,65) [65,∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Children,
    Youth,
    Prime,
    Mature,
    Elderly,
}

impl AgeBand {
    pub const ALL: [AgeBand; BAND_COUNT] = [
        AgeBand::Children,
        AgeBand::Youth,
        AgeBand::Prime,
        AgeBand::Mature,
        AgeBand::Elderly,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Years spent in the band; `None` for the open-ended elderly band.
    pub fn width_years(self) -> Option<f64> {
        match self {
            AgeBand::Children => Some(5.0),
            AgeBand::Youth => Some(10.0),
            AgeBand::Prime => Some(25.0),
            AgeBand::Mature => Some(25.0),
            AgeBand::Elderly => None,
        }
    }
}

/// Stable-population age profile used when seeding a fresh population.
pub const STABLE_PROFILE: [f64; BAND_COUNT] = [0.10, 0.16, 0.32, 0.28, 0.14];

/// Population per age band. Counts are fractional so small per-turn flows
/// accumulate instead of rounding away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortState {
    bands: [f64; BAND_COUNT],
}

impl CohortState {
    pub fn new(bands: [f64; BAND_COUNT]) -> Self {
        let mut state = Self { bands };
        state.clamp_non_negative();
        state
    }

    /// Splits `total` across the bands following `profile` (renormalised).
    /// Falls back to [`STABLE_PROFILE`] when the profile sums to zero.
    pub fn from_total(total: f64, profile: &[f64; BAND_COUNT]) -> Self {
        let sum: f64 = profile.iter().map(|p| p.max(0.0)).sum();
        let (profile, sum) = if sum > 0.0 && sum.is_finite() {
            (*profile, sum)
        } else {
            (STABLE_PROFILE, STABLE_PROFILE.iter().sum())
        };
        let total = sanitize(total);
        let mut bands = [0.0; BAND_COUNT];
        for (band, share) in bands.iter_mut().zip(profile.iter()) {
            *band = total * share.max(0.0) / sum;
        }
        Self::new(bands)
    }

    pub fn get(&self, band: AgeBand) -> f64 {
        self.bands[band.index()]
    }

    pub fn bands(&self) -> &[f64; BAND_COUNT] {
        &self.bands
    }

    pub fn total(&self) -> f64 {
        self.bands.iter().sum()
    }

    /// Prime plus mature bands.
    pub fn workforce(&self) -> f64 {
        self.get(AgeBand::Prime) + self.get(AgeBand::Mature)
    }

    pub fn fertile_population(&self, fertile_fraction: f64) -> f64 {
        self.get(AgeBand::Prime) * fertile_fraction.clamp(0.0, 1.0)
    }

    /// Adds `total` people spread across the bands like [`from_total`].
    ///
    /// [`from_total`]: CohortState::from_total
    pub fn add_population(&mut self, total: f64, profile: &[f64; BAND_COUNT]) {
        let incoming = Self::from_total(total, profile);
        for (band, extra) in self.bands.iter_mut().zip(incoming.bands) {
            *band = sanitize(*band + extra);
        }
    }

    pub fn add(&mut self, band: AgeBand, amount: f64) {
        let slot = &mut self.bands[band.index()];
        *slot = sanitize(*slot + amount);
    }

    /// Removes up to `amount` from `band` and returns what was actually taken.
    pub fn remove(&mut self, band: AgeBand, amount: f64) -> f64 {
        let slot = &mut self.bands[band.index()];
        let taken = sanitize(amount).min(*slot);
        *slot -= taken;
        taken
    }

    pub fn clamp_non_negative(&mut self) {
        for band in &mut self.bands {
            *band = sanitize(*band);
        }
    }

    pub fn breakdown(&self) -> CohortBreakdown {
        CohortBreakdown {
            children: self.get(AgeBand::Children),
            youth: self.get(AgeBand::Youth),
            prime: self.get(AgeBand::Prime),
            mature: self.get(AgeBand::Mature),
            elderly: self.get(AgeBand::Elderly),
        }
    }
}

/// Named view of a [`CohortState`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortBreakdown {
    pub children: f64,
    pub youth: f64,
    pub prime: f64,
    pub mature: f64,
    pub elderly: f64,
}

/// Flows computed for one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CohortStep {
    pub births: f64,
    pub deaths: [f64; BAND_COUNT],
    /// Outflow of each band into the next one.
    pub aged: [f64; BAND_COUNT],
    pub birth_attenuation: f64,
    pub starvation_multiplier: f64,
}

impl CohortStep {
    pub fn total_deaths(&self) -> f64 {
        self.deaths.iter().sum()
    }
}

/// Rates driving the cohort step. Built from [`DemographyConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortParams {
    pub annual_mortality: [f64; BAND_COUNT],
    pub annual_birth_rate: f64,
    pub fertile_fraction: f64,
    pub attenuation_midpoint: f64,
    pub attenuation_steepness: f64,
    pub starvation_severity: f64,
    pub max_starvation_multiplier: f64,
}

impl Default for CohortParams {
    fn default() -> Self {
        Self::from(&DemographyConfig::default())
    }
}

impl From<&DemographyConfig> for CohortParams {
    fn from(config: &DemographyConfig) -> Self {
        let m = &config.annual_mortality;
        Self {
            annual_mortality: [m.children, m.youth, m.prime, m.mature, m.elderly],
            annual_birth_rate: config.annual_birth_rate,
            fertile_fraction: config.fertile_fraction,
            attenuation_midpoint: config.birth_attenuation_midpoint,
            attenuation_steepness: config.birth_attenuation_steepness,
            starvation_severity: config.starvation_severity,
            max_starvation_multiplier: config.max_starvation_multiplier,
        }
    }
}

impl CohortParams {
    /// Logistic birth attenuation in `population / capacity`, exactly 1 at
    /// zero load and approaching 0 past the midpoint.
    pub fn birth_attenuation(&self, load: f64) -> f64 {
        if load.is_nan() {
            return 0.0;
        }
        let logistic = |x: f64| {
            let exponent = self.attenuation_steepness * (x - self.attenuation_midpoint);
            1.0 / (1.0 + exponent.exp())
        };
        let at_zero = logistic(0.0);
        if at_zero <= 0.0 {
            return 0.0;
        }
        (logistic(load.max(0.0)) / at_zero).clamp(0.0, 1.0)
    }

    /// Mortality multiplier applied once population exceeds capacity.
    pub fn starvation_multiplier(&self, load: f64) -> f64 {
        let cap = self.max_starvation_multiplier.max(1.0);
        if load.is_nan() {
            return cap;
        }
        (1.0 + self.starvation_severity.max(0.0) * (load - 1.0).max(0.0)).min(cap)
    }
}

/// `population / capacity`, infinite when a populated territory has no capacity.
pub fn capacity_load(population: f64, carrying_capacity: f64) -> f64 {
    if carrying_capacity > f64::EPSILON {
        population / carrying_capacity
    } else if population > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Advances `state` by one turn of `time_step_fraction` years.
///
/// Births come from the pre-step prime band, deaths are taken per band,
/// then a `dt / width` share of each surviving band moves to the next one.
/// Aging only moves people between adjacent bands, so the new total is
/// `old − deaths + births`.
pub fn advance_cohorts(
    state: &mut CohortState,
    carrying_capacity: f64,
    time_step_fraction: f64,
    params: &CohortParams,
) -> CohortStep {
    state.clamp_non_negative();
    let dt = sanitize(time_step_fraction);
    let load = capacity_load(state.total(), carrying_capacity);
    let attenuation = params.birth_attenuation(load);
    let starvation = params.starvation_multiplier(load);

    let births = sanitize(
        state.fertile_population(params.fertile_fraction)
            * params.annual_birth_rate.max(0.0)
            * dt
            * attenuation,
    );

    let mut step = CohortStep {
        births,
        birth_attenuation: attenuation,
        starvation_multiplier: starvation,
        ..CohortStep::default()
    };

    let mut survivors = state.bands;
    for (i, count) in survivors.iter_mut().enumerate() {
        let annual = (params.annual_mortality[i] * starvation).clamp(0.0, 1.0);
        let turn_rate = 1.0 - (1.0 - annual).powf(dt);
        let deaths = (*count * turn_rate).clamp(0.0, *count);
        step.deaths[i] = deaths;
        *count -= deaths;
    }

    for band in AgeBand::ALL {
        if let Some(width) = band.width_years() {
            let i = band.index();
            let fraction = (dt / width).clamp(0.0, 1.0);
            step.aged[i] = survivors[i] * fraction;
        }
    }

    let mut next = [0.0; BAND_COUNT];
    for i in 0..BAND_COUNT {
        let inflow = if i == 0 { births } else { step.aged[i - 1] };
        next[i] = survivors[i] - step.aged[i] + inflow;
    }
    state.bands = next;
    state.clamp_non_negative();
    step
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
