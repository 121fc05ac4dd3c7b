use chrono::{DateTime, Utc};

use crate::metrics::producer::FieldType;

/// One named value of a measurement and what it accumulates into.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: f64,
    pub field_type: FieldType,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            value,
            field_type,
        }
    }
}

/// A batch of field values observed together. A measurement without a time
/// is stamped when the collector ingests it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub time: Option<DateTime<Utc>>,
    pub fields: Vec<Field>,
}

impl Measurement {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: f64, field_type: FieldType) -> Self {
        self.add(name, value, field_type);
        self
    }

    pub fn add(&mut self, name: impl Into<String>, value: f64, field_type: FieldType) {
        self.fields.push(Field::new(name, value, field_type));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Messages consumed by the collector's owner task.
#[derive(Debug)]
pub(crate) enum Inbound {
    Measurement(Measurement),
    /// Queued after every tick's measurements; persists all series.
    Sync(DateTime<Utc>),
}
