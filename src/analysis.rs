//! Time bucketing and least-squares trendlines.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::error::FitError;

/// `y = slope * x + intercept`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearEquation {
    slope: f64,
    intercept: f64,
}

impl LinearEquation {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Least-squares fit of `points`.
    pub fn fit(points: &[(f64, f64)]) -> Result<Self, FitError> {
        let origin = points.first().map_or(0.0, |&(x, _)| x);
        let mut moments = Moments::new(origin);
        for &(x, y) in points {
            moments.add(x, y);
        }
        moments.fit()
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Coefficient of determination over `points`; 1 when the y values have
    /// no variance.
    pub fn r_squared(&self, points: &[(f64, f64)]) -> f64 {
        let n = points.len() as f64;
        let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;
        let (sse, sst) = points.iter().fold((0.0, 0.0), |(sse, sst), &(x, y)| {
            let err = y - self.predict(x);
            let variation = y - mean_y;
            (sse + err * err, sst + variation * variation)
        });
        if sst == 0.0 {
            1.0
        } else {
            1.0 - sse / sst
        }
    }
}

impl fmt::Display for LinearEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, c) = (self.slope, self.intercept);
        if m == 0.0 {
            write!(f, "{}", c)
        } else if m < 0.0 && c < 0.0 {
            write!(f, "-({}x + {})", m.abs(), c.abs())
        } else if m < 0.0 {
            write!(f, "{} - {}x", c, m.abs())
        } else if c < 0.0 {
            write!(f, "{}x - {}", m, c.abs())
        } else {
            write!(f, "{}x + {}", m, c)
        }
    }
}

/// Running sums for a least-squares fit.
///
/// x values are stored relative to `origin`, so epoch-sized inputs do not
/// swamp `nΣx² - (Σx)²` with cancellation.
#[derive(Clone, Copy, Debug)]
struct Moments {
    origin: f64,
    n: f64,
    sx: f64,
    sy: f64,
    sxx: f64,
    sxy: f64,
    syy: f64,
}

impl Moments {
    fn new(origin: f64) -> Self {
        Self {
            origin,
            n: 0.0,
            sx: 0.0,
            sy: 0.0,
            sxx: 0.0,
            sxy: 0.0,
            syy: 0.0,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        let x = x - self.origin;
        self.n += 1.0;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
        self.syy += y * y;
    }

    /// Adds `len` points `x = start + i * step` that all share `y`, in
    /// constant time.
    fn add_run(&mut self, start: f64, step: f64, len: f64, y: f64) {
        let a = start - self.origin;
        // Σi and Σi² for i in 0..len
        let si = len * (len - 1.0) / 2.0;
        let sii = (len - 1.0) * len * (2.0 * len - 1.0) / 6.0;
        let sx = len * a + step * si;
        self.n += len;
        self.sx += sx;
        self.sy += len * y;
        self.sxx += len * a * a + 2.0 * a * step * si + step * step * sii;
        self.sxy += y * sx;
        self.syy += len * y * y;
    }

    /// `(Sxx, Sxy, Syy)`, the sums of centred products.
    fn centred(&self) -> (f64, f64, f64) {
        (
            self.sxx - self.sx * self.sx / self.n,
            self.sxy - self.sx * self.sy / self.n,
            self.syy - self.sy * self.sy / self.n,
        )
    }

    fn fit(&self) -> Result<LinearEquation, FitError> {
        if self.n < 2.0 {
            return Err(FitError::DegenerateFit);
        }
        let (sxx, sxy, _) = self.centred();
        if sxx <= 0.0 {
            return Err(FitError::DegenerateFit);
        }

        let slope = sxy / sxx;
        let intercept = self.sy / self.n - slope * (self.sx / self.n + self.origin);
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(FitError::DegenerateFit);
        }
        Ok(LinearEquation::new(slope, intercept))
    }

    /// R² of the least-squares line, `Sxy² / (Sxx·Syy)`; 1 without y variance.
    fn r_squared(&self) -> f64 {
        let (sxx, sxy, syy) = self.centred();
        if syy <= 8.0 * f64::EPSILON * self.syy {
            return 1.0;
        }
        (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0)
    }
}

/// A stretch of evenly spaced buckets holding the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub start: i64,
    pub len: u64,
    pub y: i64,
}

/// A bucketed time series, dense from its first to its last bucket.
///
/// Only occupied buckets are stored. The empty buckets between them are
/// implied: they hold 0, or the previous total when the series is
/// cumulative. The memory used depends on the number of samples, not on
/// the time span divided by the bucket width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    step: i64,
    cumulative: bool,
    occupied: BTreeMap<i64, i64>,
}

impl Series {
    /// Number of buckets, counting implied empty ones.
    pub fn len(&self) -> u64 {
        self.runs().map(|run| run.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Stored buckets and the implied gaps between them, in key order.
    pub fn runs(&self) -> impl Iterator<Item = Run> + '_ {
        let mut keys = self.occupied.iter().peekable();
        std::iter::from_fn(move || {
            let (&key, &y) = keys.next()?;
            let occupied = Run { start: key, len: 1, y };
            let gap = match keys.peek() {
                Some(&(&next, _)) if self.step > 0 && next - key > self.step => Some(Run {
                    start: key + self.step,
                    len: ((next - key) / self.step - 1) as u64,
                    y: if self.cumulative { y } else { 0 },
                }),
                _ => None,
            };
            Some(std::iter::once(occupied).chain(gap))
        })
        .flatten()
    }

    /// Every `(bucket, value)` pair, implied buckets included.
    pub fn points(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let step = self.step;
        self.runs()
            .flat_map(move |run| (0..run.len as i64).map(move |i| (run.start + i * step, run.y)))
    }

    fn moments(&self) -> Moments {
        let origin = self.occupied.keys().next().map_or(0.0, |&key| key as f64);
        let mut moments = Moments::new(origin);
        for run in self.runs() {
            moments.add_run(run.start as f64, self.step as f64, run.len as f64, run.y as f64);
        }
        moments
    }
}

/// A fitted line together with its goodness of fit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Trendline {
    #[serde(rename = "m")]
    pub slope: f64,
    #[serde(rename = "c")]
    pub intercept: f64,
    #[serde(rename = "r2")]
    pub r_squared: f64,
}

impl Trendline {
    /// Fits every bucket of `series`, implied ones included, without
    /// expanding it.
    pub fn fit(series: &Series) -> Result<Self, FitError> {
        let moments = series.moments();
        let equation = moments.fit()?;
        Ok(Self {
            slope: equation.slope(),
            intercept: equation.intercept(),
            r_squared: moments.r_squared(),
        })
    }
}

/// Sums `(epoch, y)` samples into buckets `granularity` seconds wide.
///
/// With a positive granularity the series spans the first to the last
/// bucket: empty buckets hold 0, or with `cumulative` every bucket holds the
/// running total so far. With granularity 0 each distinct epoch is its own
/// bucket and `cumulative` turns the values into a prefix sum.
pub fn bucket_series(
    samples: impl IntoIterator<Item = (i64, i64)>,
    granularity: i64,
    cumulative: bool,
) -> Series {
    let mut occupied = BTreeMap::new();
    for (epoch, y) in samples {
        let key = if granularity > 0 {
            epoch - epoch.rem_euclid(granularity)
        } else {
            epoch
        };
        let total = occupied.entry(key).or_insert(0i64);
        *total = total.saturating_add(y);
    }

    if cumulative {
        let mut running = 0i64;
        for value in occupied.values_mut() {
            running = running.saturating_add(*value);
            *value = running;
        }
    }

    Series {
        step: granularity.max(0),
        cumulative,
        occupied,
    }
}
