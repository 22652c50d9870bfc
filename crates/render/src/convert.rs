use connectors::{
    cursor::{ScanTarget, Scanned},
    error::ScanError,
};
use model::core::{
    column::{ColumnDescriptor, SemanticType},
    value::{Row, Value},
};
use std::collections::HashMap;

/// Decides how one column is scanned and how the scanned cell becomes a [`Value`].
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    name: &'static str,
    target: fn(&ColumnDescriptor) -> ScanTarget,
    normalize: fn(Scanned) -> Option<Value>,
}

impl Converter {
    /// Nullable string cell. Keeps NULL apart from the empty string.
    pub const TEXT: Converter = Converter {
        name: "text",
        target: |_| ScanTarget::Text,
        normalize: |scanned| match scanned {
            Scanned::Text(Some(text)) => Some(Value::String(text)),
            Scanned::Text(None) => Some(Value::Null),
            _ => None,
        },
    };

    /// Validity flag plus structured date-time. Invalid cells become NULL.
    pub const TIMESTAMP: Converter = Converter {
        name: "timestamp",
        target: |_| ScanTarget::Timestamp,
        normalize: |scanned| match scanned {
            Scanned::Timestamp(ts) => Some(ts.into_option().map_or(Value::Null, Value::Timestamp)),
            _ => None,
        },
    };

    /// Whatever the driver naturally yields for the column's scan type.
    pub const NATIVE: Converter = Converter {
        name: "native",
        target: |column| ScanTarget::Native(column.scan_type),
        normalize: |scanned| match scanned {
            Scanned::Native(value) => Some(value.into_text_if_binary()),
            _ => None,
        },
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scan_target(&self, column: &ColumnDescriptor) -> ScanTarget {
        (self.target)(column)
    }

    /// Turns a scanned cell of `column` into a value, rejecting cells whose
    /// shape does not match this converter's target.
    pub fn normalize(&self, column: usize, scanned: Scanned) -> Result<Value, ScanError> {
        let found = scanned.kind();
        (self.normalize)(scanned).ok_or_else(|| ScanError::Mismatch {
            column,
            expected: self.name.to_string(),
            found: found.to_string(),
        })
    }
}

/// Semantic type tag to converter, with a fallback for unregistered tags.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    converters: HashMap<SemanticType, Converter>,
    fallback: Converter,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        let mut registry = ConverterRegistry::new(Converter::NATIVE);
        registry
            .register(SemanticType::ShortText, Converter::TEXT)
            .register(SemanticType::Date, Converter::TEXT)
            .register(SemanticType::Time, Converter::TEXT)
            .register(SemanticType::DateTime, Converter::TEXT)
            .register(SemanticType::Timestamp, Converter::TIMESTAMP);
        registry
    }
}

impl ConverterRegistry {
    pub fn new(fallback: Converter) -> Self {
        Self {
            converters: HashMap::new(),
            fallback,
        }
    }

    pub fn register(&mut self, tag: SemanticType, converter: Converter) -> &mut Self {
        self.converters.insert(tag, converter);
        self
    }

    pub fn get(&self, tag: SemanticType) -> &Converter {
        self.converters.get(&tag).unwrap_or(&self.fallback)
    }

    /// Resolves the converter and scan target of every column once per result set.
    pub fn plan(&self, columns: &[ColumnDescriptor]) -> RowPlan {
        let converters: Vec<Converter> = columns
            .iter()
            .map(|column| *self.get(column.semantic_type))
            .collect();
        let targets = converters
            .iter()
            .zip(columns)
            .map(|(converter, column)| converter.scan_target(column))
            .collect();
        RowPlan {
            converters,
            targets,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowPlan {
    converters: Vec<Converter>,
    targets: Vec<ScanTarget>,
}

impl RowPlan {
    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    pub fn normalize_row(&self, scanned: Vec<Scanned>) -> Result<Row, ScanError> {
        if scanned.len() != self.converters.len() {
            return Err(ScanError::Arity {
                expected: self.converters.len(),
                found: scanned.len(),
            });
        }

        scanned
            .into_iter()
            .zip(&self.converters)
            .enumerate()
            .map(|(column, (cell, converter))| converter.normalize(column, cell))
            .collect()
    }
}
