// Observation sink
// Observations are streamed out of the collector one at a time; the
// family buffer groups them into Prometheus metric families for encoding

use crate::descriptors::{MetricDescriptor, MetricKind};
use prometheus::proto::{Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType};
use std::collections::HashMap;

/// A single sample for one label combination of a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    descriptor: &'a MetricDescriptor,
    kind: MetricKind,
    value: f64,
    label_values: Vec<String>,
}

impl<'a> Observation<'a> {
    pub(crate) fn new(
        descriptor: &'a MetricDescriptor,
        value: f64,
        label_values: Vec<String>,
    ) -> Self {
        debug_assert_eq!(
            label_values.len(),
            descriptor.label_names().len(),
            "label arity mismatch for {}",
            descriptor.name()
        );
        Self {
            descriptor,
            kind: descriptor.kind(),
            value,
            label_values,
        }
    }

    pub fn descriptor(&self) -> &'a MetricDescriptor {
        self.descriptor
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Label name/value pairs in descriptor order.
    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.descriptor
            .label_names()
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }
}

pub trait ObservationSink {
    fn emit(&mut self, observation: Observation<'_>);
}

impl<F> ObservationSink for F
where
    F: FnMut(Observation<'_>),
{
    fn emit(&mut self, observation: Observation<'_>) {
        self(observation)
    }
}

/// Collects observations into `MetricFamily` values, one per descriptor,
/// in first-seen order.
#[derive(Debug, Default)]
pub struct FamilyBuffer {
    families: Vec<MetricFamily>,
    index: HashMap<String, usize>,
    observations: usize,
}

impl FamilyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations == 0
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }

    fn family_for(&mut self, descriptor: &MetricDescriptor) -> &mut MetricFamily {
        let idx = match self.index.get(descriptor.name()) {
            Some(idx) => *idx,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(descriptor.name().to_string());
                family.set_help(descriptor.help().to_string());
                family.set_field_type(match descriptor.kind() {
                    MetricKind::Counter => MetricType::COUNTER,
                    MetricKind::Gauge => MetricType::GAUGE,
                });
                self.families.push(family);
                self.index.insert(descriptor.name().to_string(), self.families.len() - 1);
                self.families.len() - 1
            }
        };
        &mut self.families[idx]
    }
}

impl ObservationSink for FamilyBuffer {
    fn emit(&mut self, observation: Observation<'_>) {
        let labels: Vec<LabelPair> = observation
            .labels()
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.to_string());
                pair.set_value(value.to_string());
                pair
            })
            .collect();

        let mut metric = Metric::default();
        metric.set_label(labels.into());
        match observation.kind() {
            MetricKind::Counter => {
                let mut counter = Counter::default();
                counter.set_value(observation.value());
                metric.set_counter(counter);
            }
            MetricKind::Gauge => {
                let mut gauge = Gauge::default();
                gauge.set_value(observation.value());
                metric.set_gauge(gauge);
            }
        }

        self.family_for(observation.descriptor())
            .mut_metric()
            .push(metric);
        self.observations += 1;
    }
}
