//! Concrete axiom values: named entities, literals and restrictions.
//!
//! The synchronization engine is generic over any `Eq + Hash` value; these
//! types are the ones the bundled [`KnowledgeStore`](crate::store::KnowledgeStore)
//! speaks. Named entities compare by namespace and name, restrictions compare
//! by their structural definition.

use serde::{Deserialize, Serialize};

/// Namespace used by [`Entity::named`].
pub const DEFAULT_NAMESPACE: &str = "http://axiom-sync.dev/onto#";

/// A named entity (class, individual or property), identified by namespace + name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    namespace: String,
    name: String,
}

impl Entity {
    /// Create an entity in an explicit namespace.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an entity in [`DEFAULT_NAMESPACE`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full IRI: namespace followed by name.
    pub fn iri(&self) -> String {
        format!("{}{}", self.namespace, self.name)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A typed literal. Equality is lexical: `"1"^^integer` and `"01"^^integer` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: String,
    pub language: Option<String>,
}

impl Literal {
    pub const XSD_STRING: &'static str = "xsd:string";
    pub const XSD_INTEGER: &'static str = "xsd:integer";
    pub const XSD_DECIMAL: &'static str = "xsd:decimal";
    pub const XSD_BOOLEAN: &'static str = "xsd:boolean";

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            lexical: value.into(),
            datatype: Self::XSD_STRING.into(),
            language: None,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            lexical: value.to_string(),
            datatype: Self::XSD_INTEGER.into(),
            language: None,
        }
    }

    /// Decimal literal. The lexical form is Rust's shortest round-trip rendering.
    pub fn decimal(value: f64) -> Self {
        Self {
            lexical: value.to_string(),
            datatype: Self::XSD_DECIMAL.into(),
            language: None,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            lexical: value.to_string(),
            datatype: Self::XSD_BOOLEAN.into(),
            language: None,
        }
    }

    /// Attach a language tag (only meaningful for strings).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.language {
            Some(lang) => write!(f, "\"{}\"@{}", self.lexical, lang),
            None => write!(f, "\"{}\"^^{}", self.lexical, self.datatype),
        }
    }
}

/// Quantifier or cardinality of a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    Some,
    Only,
    Min(u32),
    Max(u32),
    Exact(u32),
}

impl std::fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestrictionKind::Some => write!(f, "some"),
            RestrictionKind::Only => write!(f, "only"),
            RestrictionKind::Min(n) => write!(f, "min {n}"),
            RestrictionKind::Max(n) => write!(f, "max {n}"),
            RestrictionKind::Exact(n) => write!(f, "exactly {n}"),
        }
    }
}

/// What a restriction ranges over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filler {
    /// A class (object property restrictions).
    Class(Entity),
    /// A datatype such as `xsd:integer` (data property restrictions).
    Datatype(String),
}

impl std::fmt::Display for Filler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filler::Class(c) => write!(f, "{c}"),
            Filler::Datatype(d) => f.write_str(d),
        }
    }
}

/// A property restriction, e.g. `hasDoor min 2 Door`.
///
/// Two restrictions are equal when their kind, property and filler are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub property: Entity,
    pub filler: Filler,
}

impl Restriction {
    pub fn new(kind: RestrictionKind, property: Entity, filler: Filler) -> Self {
        Self {
            kind,
            property,
            filler,
        }
    }

    pub fn some(property: Entity, class: Entity) -> Self {
        Self::new(RestrictionKind::Some, property, Filler::Class(class))
    }

    pub fn only(property: Entity, class: Entity) -> Self {
        Self::new(RestrictionKind::Only, property, Filler::Class(class))
    }

    pub fn min(property: Entity, cardinality: u32, filler: Filler) -> Self {
        Self::new(RestrictionKind::Min(cardinality), property, filler)
    }

    pub fn max(property: Entity, cardinality: u32, filler: Filler) -> Self {
        Self::new(RestrictionKind::Max(cardinality), property, filler)
    }

    pub fn exact(property: Entity, cardinality: u32, filler: Filler) -> Self {
        Self::new(RestrictionKind::Exact(cardinality), property, filler)
    }
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.property, self.kind, self.filler)
    }
}

/// The object of an axiom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Entity(Entity),
    Literal(Literal),
    Restriction(Restriction),
}

impl Value {
    /// Shorthand for a named entity in the default namespace.
    pub fn named(name: impl Into<String>) -> Self {
        Value::Entity(Entity::named(name))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_restriction(&self) -> Option<&Restriction> {
        match self {
            Value::Restriction(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Value::Entity(e)
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        Value::Literal(l)
    }
}

impl From<Restriction> for Value {
    fn from(r: Restriction) -> Self {
        Value::Restriction(r)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Entity(e) => write!(f, "{e}"),
            Value::Literal(l) => write!(f, "{l}"),
            Value::Restriction(r) => write!(f, "({r})"),
        }
    }
}
