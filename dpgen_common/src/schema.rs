//! Configuration schemas and schema composition.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s plus cross-field
//! [`Constraint`]s. Schemas are assembled from smaller building blocks
//! with [`Schema::extend`]:
//!
//! - keys keep the position of their first declaration,
//! - for a key declared on both sides the later type and the later
//!   non-empty default win,
//! - a key required on either side stays required,
//! - a key declared `Required` on both sides is a [`SchemaError`],
//! - constraints are concatenated.
//!
//! When both groupings succeed, `a.extend(b).extend(c)` and
//! `a.extend(b.extend(c))` accept the same keys with the same defaults.
//! Every merge re-checks the surviving default against the winning type,
//! so a default that only fits after a later override fails on the left
//! grouping and passes on the right one.

use thiserror::Error;

use crate::value::{FieldType, Value};

// ─── Error Types ────────────────────────────────────────────────────

/// Schema authoring error, raised while a schema is being built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The same key was declared twice inside one builder.
    #[error("field '{key}' is declared twice in the same schema")]
    DuplicateKey { key: &'static str },

    /// Two extensions both declare the key as required.
    #[error("field '{key}' is declared required by more than one extension")]
    DuplicateRequired { key: &'static str },

    /// A default value does not have the declared field type.
    #[error("default for '{key}' is not a valid {expected}")]
    DefaultTypeMismatch {
        key: &'static str,
        expected: FieldType,
    },

    /// A constraint names a key the schema does not declare.
    #[error("constraint references undeclared field '{key}'")]
    UnknownConstraintKey { key: &'static str },
}

// ─── FieldSpec ──────────────────────────────────────────────────────

/// Whether a field must be given, and what to use when it is not.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    /// `default: None` means the key is simply absent from the validated
    /// record when the user omits it.
    Optional { default: Option<Value> },
}

/// Descriptor of one accepted configuration key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub ty: FieldType,
    pub presence: Presence,
}

impl FieldSpec {
    pub fn required(key: &'static str, ty: FieldType) -> Self {
        Self {
            key,
            ty,
            presence: Presence::Required,
        }
    }

    pub fn optional(key: &'static str, ty: FieldType) -> Self {
        Self {
            key,
            ty,
            presence: Presence::Optional { default: None },
        }
    }

    pub fn with_default(key: &'static str, ty: FieldType, default: impl Into<Value>) -> Self {
        Self {
            key,
            ty,
            presence: Presence::Optional {
                default: Some(default.into()),
            },
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.presence {
            Presence::Optional { default } => default.as_ref(),
            Presence::Required => None,
        }
    }

    fn check_default(&self) -> Result<(), SchemaError> {
        match self.default_value() {
            Some(value) if !value.matches(self.ty) => Err(SchemaError::DefaultTypeMismatch {
                key: self.key,
                expected: self.ty,
            }),
            _ => Ok(()),
        }
    }

    /// Merge a later declaration of the same key into this one.
    fn merge(&self, later: &FieldSpec) -> Result<FieldSpec, SchemaError> {
        let presence = match (&self.presence, &later.presence) {
            (Presence::Required, Presence::Required) => {
                return Err(SchemaError::DuplicateRequired { key: later.key });
            }
            (Presence::Required, _) | (_, Presence::Required) => Presence::Required,
            (Presence::Optional { default: earlier }, Presence::Optional { default: newer }) => {
                Presence::Optional {
                    default: newer.clone().or_else(|| earlier.clone()),
                }
            }
        };
        let merged = FieldSpec {
            key: later.key,
            ty: later.ty,
            presence,
        };
        merged.check_default()?;
        Ok(merged)
    }
}

// ─── Constraint ─────────────────────────────────────────────────────

/// Cross-field rule evaluated on the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// At most one of the listed keys may be present.
    AtMostOne(&'static [&'static str]),
}

impl Constraint {
    fn keys(&self) -> &'static [&'static str] {
        match self {
            Self::AtMostOne(keys) => *keys,
        }
    }
}

// ─── Schema ─────────────────────────────────────────────────────────

/// Ordered set of field descriptors plus cross-field constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    constraints: Vec<Constraint>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn accepts(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Accepted keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    /// Ordered merge of `other` on top of `self`.
    ///
    /// # Errors
    /// `DuplicateRequired` if both sides require the same key,
    /// `DefaultTypeMismatch` if an inherited default no longer fits the
    /// overriding type. This is checked per merge, not on the final schema.
    pub fn extend(&self, other: &Schema) -> Result<Schema, SchemaError> {
        let mut fields = self.fields.clone();
        for spec in &other.fields {
            match fields.iter_mut().find(|f| f.key == spec.key) {
                Some(existing) => *existing = existing.merge(spec)?,
                None => fields.push(spec.clone()),
            }
        }
        let mut constraints = self.constraints.clone();
        constraints.extend(other.constraints.iter().cloned());
        Ok(Schema {
            fields,
            constraints,
        })
    }
}

/// Builder for a single schema block.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
    constraints: Vec<Constraint>,
}

impl SchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn required(self, key: &'static str, ty: FieldType) -> Self {
        self.field(FieldSpec::required(key, ty))
    }

    pub fn optional(self, key: &'static str, ty: FieldType) -> Self {
        self.field(FieldSpec::optional(key, ty))
    }

    pub fn with_default(self, key: &'static str, ty: FieldType, value: impl Into<Value>) -> Self {
        self.field(FieldSpec::with_default(key, ty, value))
    }

    /// Forbid more than one of `keys` from being set together.
    pub fn at_most_one(mut self, keys: &'static [&'static str]) -> Self {
        self.constraints.push(Constraint::AtMostOne(keys));
        self
    }

    /// Check key uniqueness, default types and constraint keys.
    pub fn build(self) -> Result<Schema, SchemaError> {
        for (idx, spec) in self.fields.iter().enumerate() {
            if self.fields[..idx].iter().any(|f| f.key == spec.key) {
                return Err(SchemaError::DuplicateKey { key: spec.key });
            }
            spec.check_default()?;
        }
        for constraint in &self.constraints {
            if let Some(key) = constraint
                .keys()
                .iter()
                .find(|k| !self.fields.iter().any(|f| f.key == **k))
            {
                return Err(SchemaError::UnknownConstraintKey { key: *key });
            }
        }
        Ok(Schema {
            fields: self.fields,
            constraints: self.constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn block_a() -> Schema {
        Schema::builder()
            .required("dc_pin", FieldType::Pin)
            .with_default("update_interval", FieldType::Duration, Duration::from_secs(60))
            .build()
            .unwrap()
    }

    fn block_b() -> Schema {
        Schema::builder()
            .with_default("update_interval", FieldType::Duration, Duration::from_secs(1))
            .optional("reset_pin", FieldType::Pin)
            .build()
            .unwrap()
    }

    fn block_c() -> Schema {
        Schema::builder()
            .with_default("device_width", FieldType::Int, 80_i64)
            .optional("update_interval", FieldType::Duration)
            .build()
            .unwrap()
    }

    #[test]
    fn later_default_wins() {
        let merged = block_a().extend(&block_b()).unwrap();
        assert_eq!(
            merged.get("update_interval").unwrap().default_value(),
            Some(&Value::Duration(Duration::from_secs(1)))
        );
    }

    #[test]
    fn empty_later_default_keeps_earlier() {
        let merged = block_b().extend(&block_c()).unwrap();
        assert_eq!(
            merged.get("update_interval").unwrap().default_value(),
            Some(&Value::Duration(Duration::from_secs(1)))
        );
    }

    #[test]
    fn first_declaration_position_is_kept() {
        let merged = block_a().extend(&block_b()).unwrap();
        let keys: Vec<_> = merged.keys().collect();
        assert_eq!(keys, vec!["dc_pin", "update_interval", "reset_pin"]);
    }

    #[test]
    fn extension_is_associative() {
        let left = block_a().extend(&block_b()).unwrap().extend(&block_c()).unwrap();
        let right = block_a()
            .extend(&block_b().extend(&block_c()).unwrap())
            .unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn inherited_default_is_checked_at_every_merge() {
        let width = |ty: FieldType| Schema::builder().optional("device_width", ty).build().unwrap();
        let base = Schema::builder()
            .with_default("device_width", FieldType::Int, 80_i64)
            .build()
            .unwrap();

        assert_eq!(
            base.extend(&width(FieldType::Bool)),
            Err(SchemaError::DefaultTypeMismatch {
                key: "device_width",
                expected: FieldType::Bool,
            })
        );
        let right = base
            .extend(&width(FieldType::Bool).extend(&width(FieldType::Int)).unwrap())
            .unwrap();
        assert_eq!(
            right.get("device_width").unwrap().default_value(),
            Some(&Value::Int(80))
        );
    }

    #[test]
    fn duplicate_required_is_a_schema_error() {
        let other = Schema::builder()
            .required("dc_pin", FieldType::Pin)
            .build()
            .unwrap();
        assert_eq!(
            block_a().extend(&other),
            Err(SchemaError::DuplicateRequired { key: "dc_pin" })
        );
    }

    #[test]
    fn optional_redeclaration_does_not_relax_required() {
        let other = Schema::builder()
            .optional("dc_pin", FieldType::Pin)
            .build()
            .unwrap();
        let merged = block_a().extend(&other).unwrap();
        assert!(merged.get("dc_pin").unwrap().is_required());
    }

    #[test]
    fn builder_rejects_duplicate_keys() {
        let result = Schema::builder()
            .optional("lambda", FieldType::Lambda)
            .optional("lambda", FieldType::Lambda)
            .build();
        assert_eq!(result, Err(SchemaError::DuplicateKey { key: "lambda" }));
    }

    #[test]
    fn builder_rejects_mistyped_default() {
        let result = Schema::builder()
            .with_default("use_bgr", FieldType::Bool, 1_i64)
            .build();
        assert!(matches!(
            result,
            Err(SchemaError::DefaultTypeMismatch { key: "use_bgr", .. })
        ));
    }

    #[test]
    fn builder_rejects_constraint_on_unknown_key() {
        let result = Schema::builder()
            .optional("lambda", FieldType::Lambda)
            .at_most_one(&["pages", "lambda"])
            .build();
        assert_eq!(result, Err(SchemaError::UnknownConstraintKey { key: "pages" }));
    }
}
