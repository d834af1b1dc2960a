use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::debug;

use crate::data::{DataRow, Metric, NumberFormat};

/// Square-root scale from [0, domain_max] to [0, range_max].
/// Circle area, not radius, grows linearly with the value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SqrtScale {
    pub domain_max: f64,
    pub range_max: f64,
}

impl SqrtScale {
    pub fn new(domain_max: f64, range_max: f64) -> Self {
        Self {
            domain_max,
            range_max,
        }
    }

    /// Radius for a value; a degenerate domain maps everything to 0
    pub fn map(&self, value: f64) -> f64 {
        if !(self.domain_max > 0.0) || !value.is_finite() || value <= 0.0 {
            return 0.0;
        }
        self.range_max * (value / self.domain_max).sqrt()
    }

    /// Evenly spaced round values covering the domain
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(0.0, self.domain_max, count as f64)
    }
}

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// (first index, last index, increment); a negative increment is a divisor
fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let div = 10f64.powf(-power) / factor;
        i1 = (start * div).round();
        i2 = (stop * div).round();
        if i1 / div < start {
            i1 += 1.0;
        }
        if i2 / div > stop {
            i2 -= 1.0;
        }
        inc = -div;
    } else {
        let mul = 10f64.powf(power) * factor;
        i1 = (start / mul).round();
        i2 = (stop / mul).round();
        if i1 * mul < start {
            i1 += 1.0;
        }
        if i2 * mul > stop {
            i2 -= 1.0;
        }
        inc = mul;
    }
    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

pub fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (i1, i2, inc) = tick_spec(start, stop, count);
    if !(i2 >= i1) {
        return Vec::new();
    }
    let n = (i2 - i1 + 1.0) as usize;
    (0..n)
        .map(|i| {
            let i = i1 + i as f64;
            if inc < 0.0 {
                i / -inc
            } else {
                i * inc
            }
        })
        .collect()
}

/// Snapshot sent to scale subscribers whenever the domain or range changes
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleChange {
    pub title: String,
    pub scale: SqrtScale,
    pub format: NumberFormat,
}

/// Size scale driven by the current dataset and viewport width.
/// Subscribers hold only a receiver, never a reference to the owner.
#[derive(Debug, Default)]
pub struct ScaleModel {
    scale: SqrtScale,
    title: Option<String>,
    format: NumberFormat,
    subscribers: Vec<Sender<ScaleChange>>,
}

impl ScaleModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ScaleChange> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn scale(&self) -> SqrtScale {
        self.scale
    }

    pub fn map(&self, value: f64) -> f64 {
        self.scale.map(value)
    }

    /// Domain max is the largest metric value; non-numeric values count as 0
    pub fn set_domain_from_data<'a>(
        &mut self,
        rows: impl IntoIterator<Item = &'a DataRow>,
        metric: &Metric,
    ) {
        let max = rows
            .into_iter()
            .map(|row| metric.value(row))
            .fold(0.0_f64, f64::max);
        self.scale.domain_max = max;
        self.title = Some(metric.name.clone());
        self.format = metric.format;
        self.notify();
    }

    pub fn set_range_from_width(&mut self, max_radius: f64) {
        self.scale.range_max = max_radius.max(0.0);
        self.notify();
    }

    pub fn snapshot(&self) -> Option<ScaleChange> {
        self.title.as_ref().map(|title| ScaleChange {
            title: title.clone(),
            scale: self.scale,
            format: self.format,
        })
    }

    /// Send the current snapshot to live subscribers; nothing is sent
    /// before a metric has been set
    pub fn notify(&mut self) {
        let Some(change) = self.snapshot() else {
            return;
        };
        debug!(title = %change.title, domain_max = change.scale.domain_max,
            range_max = change.scale.range_max, "scale changed");
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}
