// Summary time-series store

use crate::core::error::{EclError, Result};
use crate::core::resolve::{ParamInfo, ParamTable};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSample {
    pub report_step: i32,
    pub sim_seconds: f64,
    pub values: Vec<f64>,
    pub segment: usize,
}

/// One case contributing samples to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSegment {
    pub name: String,
    /// Store parameter index -> position in this case's value vector.
    param_map: Vec<Option<usize>>,
    width: usize,
}

impl CaseSegment {
    fn identity(name: String, width: usize) -> Self {
        Self {
            name,
            param_map: (0..width).map(Some).collect(),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_param(&self, param: usize) -> bool {
        self.local_index(param).is_some()
    }

    fn local_index(&self, param: usize) -> Option<usize> {
        self.param_map.get(param).copied().flatten()
    }
}

/// Samples ordered by simulated time. Each sample keeps its case segment;
/// a parameter missing from a segment reads as its default value.
#[derive(Debug, Clone)]
pub struct SummaryTimeSeries {
    params: ParamTable,
    segments: Vec<CaseSegment>,
    samples: Vec<TimeSample>,
}

impl SummaryTimeSeries {
    pub fn new(name: impl Into<String>, params: ParamTable) -> Self {
        let segment = CaseSegment::identity(name.into(), params.len());
        Self {
            params,
            segments: vec![segment],
            samples: Vec::new(),
        }
    }

    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    pub fn segments(&self) -> &[CaseSegment] {
        &self.segments
    }

    pub fn samples(&self) -> &[TimeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn current_segment(&self) -> usize {
        self.segments.len() - 1
    }

    /// Appends one ministep of the most recent case. `values` follow that
    /// case's own parameter layout. A sample at or before the last sample of
    /// an earlier case is dropped.
    pub fn append_step(&mut self, report_step: i32, sim_seconds: f64, values: Vec<f64>) -> Result<()> {
        let segment = self.current_segment();
        let width = self.segments[segment].width;
        if values.len() != width {
            return Err(EclError::ParameterCount {
                expected: width,
                actual: values.len(),
            });
        }

        if sim_seconds.is_nan() {
            return Err(EclError::NonMonotonicTime {
                previous: self.samples.last().map_or(f64::NEG_INFINITY, |s| s.sim_seconds),
                next: sim_seconds,
            });
        }
        if let Some(last) = self.samples.last() {
            if last.segment == segment {
                if sim_seconds < last.sim_seconds {
                    return Err(EclError::NonMonotonicTime {
                        previous: last.sim_seconds,
                        next: sim_seconds,
                    });
                }
            } else if sim_seconds <= last.sim_seconds {
                // earlier cases own everything up to their last sample
                debug!(
                    "dropped sample at {} s, covered by an earlier case up to {} s",
                    sim_seconds, last.sim_seconds
                );
                return Ok(());
            }
        }

        self.samples.push(TimeSample {
            report_step,
            sim_seconds,
            values,
            segment,
        });
        Ok(())
    }

    /// Drops every sample after report step `step`. Used to cut a base case
    /// at the point a restart continues from.
    pub fn retain_through_report_step(&mut self, step: i32) {
        let before = self.samples.len();
        self.samples.retain(|s| s.report_step <= step);
        debug!("kept {} of {} samples up to report step {}", self.samples.len(), before, step);
    }

    /// Appends `other` after this series. Samples of `other` at or before
    /// the last held sample are dropped; report steps are kept as is.
    pub fn merge_case(&mut self, other: SummaryTimeSeries) {
        let cutoff = self.samples.last().map(|s| s.sim_seconds);

        // other's parameter index -> ours, adding parameters we lack
        let mut remap: Vec<Option<usize>> = Vec::with_capacity(other.params.len());
        for info in other.params.iter() {
            let index = match &info.key {
                Some(_) => match self.params.resolve_name(&info.canonical) {
                    Ok(i) => Some(i),
                    Err(_) => Some(self.params.push(info.clone())),
                },
                None => None,
            };
            remap.push(index);
        }

        let total = self.params.len();
        for segment in &mut self.segments {
            segment.param_map.resize(total, None);
        }

        let offset = self.segments.len();
        for segment in other.segments {
            let mut param_map = vec![None; total];
            for (theirs, ours) in remap.iter().enumerate() {
                if let Some(ours) = ours {
                    if param_map[*ours].is_none() {
                        param_map[*ours] = segment.local_index(theirs);
                    }
                }
            }
            self.segments.push(CaseSegment {
                name: segment.name,
                param_map,
                width: segment.width,
            });
        }

        let incoming = other.samples.len();
        let mut kept = 0;
        for mut sample in other.samples {
            if cutoff.is_some_and(|t| sample.sim_seconds <= t) {
                continue;
            }
            sample.segment += offset;
            self.samples.push(sample);
            kept += 1;
        }

        if kept < incoming {
            warn!(
                "restart overlap: dropped {} of {} continuation samples at or before {:?} s",
                incoming - kept,
                incoming,
                cutoff
            );
        }
    }

    fn check_param(&self, param: usize) -> Result<()> {
        self.params.info(param).map(|_| ())
    }

    fn sample_value(&self, sample: &TimeSample, param: usize) -> f64 {
        match self.segments[sample.segment].local_index(param) {
            Some(local) => sample.values[local],
            None => self.params.default_value(param).unwrap_or(f64::NAN),
        }
    }

    /// Index range of the samples of report step `step`, `last` inclusive.
    /// With duplicated step numbers the first case holding the step wins.
    pub fn report_step_range(&self, step: i32) -> Option<(usize, usize)> {
        let first = self.samples.iter().position(|s| s.report_step == step)?;
        let segment = self.samples[first].segment;
        let last = self.samples[first..]
            .iter()
            .take_while(|s| s.report_step == step && s.segment == segment)
            .count()
            + first
            - 1;
        Some((first, last))
    }

    pub fn has_report_step(&self, step: i32) -> bool {
        self.samples.iter().any(|s| s.report_step == step)
    }

    /// Distinct report steps in sample order.
    pub fn report_steps(&self) -> Vec<i32> {
        let mut steps: Vec<i32> = self.samples.iter().map(|s| s.report_step).collect();
        steps.dedup();
        steps
    }

    pub fn seconds(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.sim_seconds).collect()
    }

    pub fn values(&self, param: usize) -> Result<Vec<f64>> {
        self.check_param(param)?;
        Ok(self.samples.iter().map(|s| self.sample_value(s, param)).collect())
    }

    /// Value at the last ministep of each report step.
    pub fn values_at_report_steps(&self, param: usize) -> Result<Vec<f64>> {
        self.report_steps()
            .into_iter()
            .map(|step| self.value_at(param, step))
            .collect()
    }

    /// Value at the end of report step `step`.
    pub fn value_at(&self, param: usize, step: i32) -> Result<f64> {
        self.check_param(param)?;
        let (_, last) = self
            .report_step_range(step)
            .ok_or(EclError::UnknownReportStep(step))?;
        Ok(self.sample_value(&self.samples[last], param))
    }

    pub fn value_at_index(&self, param: usize, index: usize) -> Result<f64> {
        self.check_param(param)?;
        let sample = self.samples.get(index).ok_or(EclError::EmptySeries)?;
        Ok(self.sample_value(sample, param))
    }

    pub fn first_value(&self, param: usize) -> Result<f64> {
        self.check_param(param)?;
        let sample = self.samples.first().ok_or(EclError::EmptySeries)?;
        Ok(self.sample_value(sample, param))
    }

    pub fn last_value(&self, param: usize) -> Result<f64> {
        self.check_param(param)?;
        let sample = self.samples.last().ok_or(EclError::EmptySeries)?;
        Ok(self.sample_value(sample, param))
    }

    /// Linear interpolation in time, clamped to the first and last samples.
    pub fn interpolated_value_at(&self, param: usize, sim_seconds: f64) -> Result<f64> {
        self.check_param(param)?;
        if sim_seconds.is_nan() {
            return Err(EclError::InvalidTime(sim_seconds));
        }
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(EclError::EmptySeries),
        };

        if sim_seconds <= first.sim_seconds {
            return Ok(self.sample_value(first, param));
        }
        if sim_seconds >= last.sim_seconds {
            return Ok(self.sample_value(last, param));
        }

        let hi = self.samples.partition_point(|s| s.sim_seconds < sim_seconds);
        let upper = &self.samples[hi];
        let v1 = self.sample_value(upper, param);
        if upper.sim_seconds == sim_seconds {
            return Ok(v1);
        }

        let lower = &self.samples[hi - 1];
        let v0 = self.sample_value(lower, param);
        let (t0, t1) = (lower.sim_seconds, upper.sim_seconds);
        Ok(v0 + (v1 - v0) * (sim_seconds - t0) / (t1 - t0))
    }

    /// Rates are constant over the interval ending at each sample, so they
    /// take the value of the first sample at or after `sim_seconds`. Other
    /// vectors interpolate.
    pub fn value_at_time(&self, param: usize, sim_seconds: f64) -> Result<f64> {
        if !self.params.is_rate(param) {
            return self.interpolated_value_at(param, sim_seconds);
        }
        self.check_param(param)?;
        if sim_seconds.is_nan() {
            return Err(EclError::InvalidTime(sim_seconds));
        }
        let last = self.samples.last().ok_or(EclError::EmptySeries)?;
        let hi = self.samples.partition_point(|s| s.sim_seconds < sim_seconds);
        let sample = self.samples.get(hi).unwrap_or(last);
        Ok(self.sample_value(sample, param))
    }

    /// Every time at which the vector reaches `target`, in chronological
    /// order. An interval counts when `target` lies strictly between its end
    /// values or equals the value at its end. For rate vectors the hit is
    /// reported at the interval start plus one second when `clamp_lower`,
    /// else at its end. A single sample has no solutions.
    pub fn seconds_solutions(&self, param: usize, target: f64, clamp_lower: bool) -> Result<Vec<f64>> {
        self.check_param(param)?;
        if self.samples.len() <= 1 {
            return Ok(Vec::new());
        }
        let is_rate = self.params.is_rate(param);
        let mut solutions = Vec::new();

        for (index, sample) in self.samples.iter().enumerate() {
            let prev = &self.samples[index.saturating_sub(1)];
            let value = self.sample_value(sample, param);
            let prev_value = self.sample_value(prev, param);
            let (time, prev_time) = (sample.sim_seconds, prev.sim_seconds);

            let exact = value == target;
            let inside = prev_value.min(value) < target && target < prev_value.max(value);
            if !(exact || inside) {
                continue;
            }

            if is_rate {
                solutions.push(if clamp_lower { prev_time + 1.0 } else { time });
            } else if exact {
                solutions.push(time);
            } else {
                let slope = (value - prev_value) / (time - prev_time);
                solutions.push((target - prev_value) / slope + prev_time);
            }
        }
        Ok(solutions)
    }

    /// First time the vector reaches `target`.
    pub fn rate_clamped_seconds(&self, param: usize, target: f64, clamp_lower: bool) -> Result<f64> {
        let values = self.values(param)?;
        if values.is_empty() {
            return Err(EclError::EmptySeries);
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let not_bracketed = EclError::ValueNotBracketed { target, min, max };
        if !(target >= min && target <= max) {
            return Err(not_bracketed);
        }

        self.seconds_solutions(param, target, clamp_lower)?
            .first()
            .copied()
            .ok_or(not_bracketed)
    }

    pub fn param_info(&self, param: usize) -> Result<&ParamInfo> {
        self.params.info(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::{GridDims, SummaryVectorKey};

    fn table(keys: &[&str]) -> ParamTable {
        let mut t = ParamTable::new(GridDims::new(10, 10, 10));
        for kw in keys {
            let (keyword, well) = match kw.split_once(':') {
                Some((k, w)) => (k, Some(w)),
                None => (*kw, None),
            };
            let key = SummaryVectorKey::from_keyword(keyword, well, None).unwrap();
            t.push(ParamInfo {
                canonical: key.canonical(t.dims()),
                key: Some(key),
                unit: String::new(),
                default_value: -99.0,
            });
        }
        t
    }

    fn series(name: &str, keys: &[&str], rows: &[(i32, f64, Vec<f64>)]) -> SummaryTimeSeries {
        let mut s = SummaryTimeSeries::new(name, table(keys));
        for (step, t, values) in rows {
            s.append_step(*step, *t, values.clone()).unwrap();
        }
        s
    }

    #[test]
    fn test_append_checks() {
        let mut s = series("A", &["TIME", "FOPT"], &[(1, 10.0, vec![10.0, 1.0])]);
        assert!(matches!(
            s.append_step(2, 5.0, vec![5.0, 2.0]),
            Err(EclError::NonMonotonicTime { .. })
        ));
        assert!(matches!(
            s.append_step(2, 20.0, vec![20.0]),
            Err(EclError::ParameterCount { expected: 2, actual: 1 })
        ));
        assert!(s.append_step(2, 10.0, vec![10.0, 1.5]).is_ok());
    }

    #[test]
    fn test_value_at_report_step() {
        let s = series(
            "A",
            &["TIME", "FOPT"],
            &[
                (1, 10.0, vec![10.0, 1.0]),
                (1, 20.0, vec![20.0, 2.0]),
                (2, 30.0, vec![30.0, 3.0]),
            ],
        );
        assert_eq!(s.value_at(1, 1).unwrap(), 2.0);
        assert_eq!(s.value_at(1, 2).unwrap(), 3.0);
        assert!(matches!(s.value_at(1, 3), Err(EclError::UnknownReportStep(3))));
        assert!(matches!(s.value_at(7, 1), Err(EclError::UnknownVector(_))));
        assert_eq!(s.report_steps(), vec![1, 2]);
        assert_eq!(s.report_step_range(1), Some((0, 1)));
        assert_eq!(s.first_value(1).unwrap(), 1.0);
        assert_eq!(s.last_value(1).unwrap(), 3.0);
    }

    #[test]
    fn test_merge_base_wins() {
        let mut base = series(
            "BASE",
            &["TIME", "FOPT"],
            &[
                (1, 100.0, vec![100.0, 1.0]),
                (2, 200.0, vec![200.0, 2.0]),
                (3, 300.0, vec![300.0, 3.0]),
            ],
        );
        let cont = series(
            "CONT",
            &["FOPT", "TIME", "FGPT"],
            &[
                (3, 250.0, vec![25.0, 250.0, 0.25]),
                (3, 300.0, vec![30.0, 300.0, 0.30]),
                (4, 350.0, vec![35.0, 350.0, 0.35]),
                (5, 400.0, vec![40.0, 400.0, 0.40]),
            ],
        );
        base.merge_case(cont);

        assert_eq!(base.seconds(), vec![100.0, 200.0, 300.0, 350.0, 400.0]);
        assert_eq!(base.values(1).unwrap(), vec![1.0, 2.0, 3.0, 35.0, 40.0]);

        let fgpt = base.params().resolve_name("FGPT").unwrap();
        assert_eq!(fgpt, 2);
        assert_eq!(base.values(fgpt).unwrap(), vec![-99.0, -99.0, -99.0, 0.35, 0.40]);
        assert_eq!(base.segments().len(), 2);
        assert_eq!(base.segments()[1].name, "CONT");
    }

    #[test]
    fn test_interpolation() {
        let s = series(
            "A",
            &["TIME", "FOPT"],
            &[(1, 0.0, vec![0.0, 10.0]), (2, 100.0, vec![100.0, 30.0])],
        );
        assert_eq!(s.interpolated_value_at(1, -5.0).unwrap(), 10.0);
        assert_eq!(s.interpolated_value_at(1, 25.0).unwrap(), 15.0);
        assert_eq!(s.interpolated_value_at(1, 100.0).unwrap(), 30.0);
        assert_eq!(s.interpolated_value_at(1, 500.0).unwrap(), 30.0);

        let empty = SummaryTimeSeries::new("E", table(&["TIME"]));
        assert!(matches!(empty.interpolated_value_at(0, 1.0), Err(EclError::EmptySeries)));
    }

    #[test]
    fn test_rate_step_function() {
        let s = series(
            "A",
            &["TIME", "WOPR:OP_1"],
            &[
                (1, 0.0, vec![0.0, 0.0]),
                (2, 10.0, vec![10.0, 50.0]),
                (3, 20.0, vec![20.0, 80.0]),
            ],
        );
        assert_eq!(s.value_at_time(1, 5.0).unwrap(), 50.0);
        assert_eq!(s.value_at_time(1, 10.0).unwrap(), 50.0);
        assert_eq!(s.value_at_time(1, 15.0).unwrap(), 80.0);
        assert_eq!(s.value_at_time(1, 99.0).unwrap(), 80.0);
        assert_eq!(s.value_at_time(0, 15.0).unwrap(), 15.0);
    }

    #[test]
    fn test_inverse_lookup() {
        let s = series(
            "A",
            &["TIME", "FOPT", "WOPR:OP_1"],
            &[
                (1, 0.0, vec![0.0, 0.0, 0.0]),
                (2, 10.0, vec![10.0, 100.0, 50.0]),
                (3, 20.0, vec![20.0, 0.0, 80.0]),
                (4, 30.0, vec![30.0, 100.0, 20.0]),
            ],
        );
        assert_eq!(s.rate_clamped_seconds(1, 50.0, false).unwrap(), 5.0);
        assert_eq!(s.seconds_solutions(1, 50.0, false).unwrap(), vec![5.0, 15.0, 25.0]);
        assert_eq!(s.rate_clamped_seconds(1, 100.0, false).unwrap(), 10.0);

        assert_eq!(s.rate_clamped_seconds(2, 60.0, false).unwrap(), 20.0);
        assert_eq!(s.rate_clamped_seconds(2, 60.0, true).unwrap(), 11.0);

        assert!(matches!(
            s.rate_clamped_seconds(1, 150.0, false),
            Err(EclError::ValueNotBracketed { .. })
        ));
    }

    #[test]
    fn test_rate_exact_hit_clamped() {
        let s = series(
            "A",
            &["TIME", "WOPR:OP_1"],
            &[
                (1, 0.0, vec![0.0, 0.0]),
                (2, 10.0, vec![10.0, 50.0]),
                (3, 20.0, vec![20.0, 80.0]),
            ],
        );
        assert_eq!(s.rate_clamped_seconds(1, 50.0, true).unwrap(), 1.0);
        assert_eq!(s.rate_clamped_seconds(1, 50.0, false).unwrap(), 10.0);
        assert_eq!(s.seconds_solutions(1, 80.0, true).unwrap(), vec![11.0]);

        let single = series("B", &["TIME", "WOPR:OP_1"], &[(1, 5.0, vec![5.0, 50.0])]);
        assert!(single.seconds_solutions(1, 50.0, false).unwrap().is_empty());
        assert!(matches!(
            single.rate_clamped_seconds(1, 50.0, false),
            Err(EclError::ValueNotBracketed { .. })
        ));
    }

    #[test]
    fn test_append_after_merge_keeps_order() {
        let mut base = series(
            "BASE",
            &["TIME", "FOPT"],
            &[
                (1, 100.0, vec![100.0, 1.0]),
                (2, 200.0, vec![200.0, 2.0]),
                (3, 300.0, vec![300.0, 3.0]),
            ],
        );
        let cont = series(
            "CONT",
            &["TIME", "FOPT"],
            &[(3, 250.0, vec![250.0, 25.0]), (3, 300.0, vec![300.0, 30.0])],
        );
        base.merge_case(cont);
        assert_eq!(base.len(), 3);

        base.append_step(4, 150.0, vec![150.0, 15.0]).unwrap();
        assert_eq!(base.seconds(), vec![100.0, 200.0, 300.0]);
        assert_eq!(base.interpolated_value_at(1, 250.0).unwrap(), 2.5);

        base.append_step(4, 400.0, vec![400.0, 40.0]).unwrap();
        assert_eq!(base.seconds(), vec![100.0, 200.0, 300.0, 400.0]);
        assert!(matches!(
            base.append_step(5, 350.0, vec![350.0, 35.0]),
            Err(EclError::NonMonotonicTime { .. })
        ));
    }

    #[test]
    fn test_nan_time_rejected() {
        let mut s = series(
            "A",
            &["TIME", "WOPR:OP_1"],
            &[(1, 0.0, vec![0.0, 0.0]), (2, 10.0, vec![10.0, 50.0])],
        );
        assert!(matches!(s.interpolated_value_at(0, f64::NAN), Err(EclError::InvalidTime(_))));
        assert!(matches!(s.value_at_time(1, f64::NAN), Err(EclError::InvalidTime(_))));
        assert!(matches!(
            s.append_step(3, f64::NAN, vec![0.0, 0.0]),
            Err(EclError::NonMonotonicTime { .. })
        ));
    }
}
