use monwatch_common::types::SeriesKey;
use serde::Serialize;
use std::collections::VecDeque;

/// A note attached to one (series, instance) at a point in time, shown next
/// to the series data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub key: SeriesKey,
    pub time: i64,
    pub value: i64,
    /// Attributes in insertion order; keys are unique.
    pub attrs: Vec<(String, String)>,
    /// Permanent annotations are never evicted.
    pub permanent: bool,
}

impl Annotation {
    pub fn new(key: SeriesKey, time: i64, value: i64) -> Self {
        Self {
            key,
            time,
            value,
            attrs: Vec::new(),
            permanent: false,
        }
    }

    /// Sets an attribute, keeping the position of an existing key.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(attr) => attr.1 = value,
            None => self.attrs.push((name, value)),
        }
        self
    }

    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Annotations of one (series, instance).
///
/// Transient annotations live in a fixed-capacity ring like raw points.
#[derive(Debug, Clone)]
pub struct AnnotationLog {
    capacity: usize,
    transient: VecDeque<Annotation>,
    permanent: Vec<Annotation>,
}

impl AnnotationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            transient: VecDeque::new(),
            permanent: Vec::new(),
        }
    }

    pub fn add(&mut self, annotation: Annotation) {
        if annotation.permanent {
            self.permanent.push(annotation);
            return;
        }
        if self.transient.len() == self.capacity {
            self.transient.pop_front();
        }
        self.transient.push_back(annotation);
    }

    pub fn len(&self) -> usize {
        self.transient.len() + self.permanent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transient.is_empty() && self.permanent.is_empty()
    }

    /// All retained annotations ordered by time; equal times keep insertion order.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut all: Vec<Annotation> = self
            .permanent
            .iter()
            .chain(self.transient.iter())
            .cloned()
            .collect();
        all.sort_by_key(|a| a.time);
        all
    }
}
