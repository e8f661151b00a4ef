//! Runtime value representation and its structural equality.
//!
//! Values are immutable and persistent: containers are shared through `Rc`
//! and every update clones the spine instead of mutating in place. This is
//! what makes register snapshots O(|vars|) copies of cheap handles.
//!
//! Equality is deep and normalization-respecting: two sets with the same
//! elements are equal regardless of construction (explicit literal, integer
//! interval, powerset, cross product), and record/map equality ignores entry
//! order. Map keys are stored in normal form so lookups agree with equality.

use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    fmt::{self, Display, Write},
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::errors::{EvalResult, RuntimeError, RuntimeErrorKind};

/// Primary runtime value type.
///
/// Scalars are stored inline; containers are reference-counted so cloning a
/// value never deep-copies a container.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(BigInt),
    Str(Rc<str>),
    /// Ordered sequence with positional (1-based) access.
    Tuple(Rc<Vec<Value>>),
    /// Ordered mapping from field name to value; equality ignores order.
    Record(Rc<IndexMap<Rc<str>, Value>>),
    /// Ordered sequence with 0-based access.
    List(Rc<Vec<Value>>),
    /// Unordered collection; see [`SetValue`] for the supported shapes.
    Set(SetValue),
    /// Mapping from value to value. Keys are kept in normal form.
    Map(Rc<IndexMap<Value, Value>>),
}

/// The set shapes the evaluator can construct.
///
/// Lazy shapes (interval, powerset, cross product, set-of-maps) support
/// membership, cardinality, and index-based picking without enumeration;
/// they only materialize when an operation genuinely needs every element.
#[derive(Debug, Clone)]
pub enum SetValue {
    /// Finite set of distinct elements in insertion order.
    Explicit(Rc<Vec<Value>>),
    /// Integer interval `[low, high]`; empty when `high < low`.
    Interval(BigInt, BigInt),
    /// All subsets of the base set.
    Powerset(Rc<SetValue>),
    /// Cross product of component sets, yielding tuples.
    CrossProduct(Rc<Vec<SetValue>>),
    /// All total maps from the domain set to the range set.
    MapSet(Rc<SetValue>, Rc<SetValue>),
    /// The named infinite sets. Enumeration fails at runtime.
    Infinite(InfiniteKind),
}

/// Marker for the sets the evaluator can name but never construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
pub enum InfiniteKind {
    Int,
    Nat,
}

impl Value {
    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::Int(value.into())
    }

    pub fn str(value: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(value.as_ref()))
    }

    pub fn tuple(elements: Vec<Self>) -> Self {
        Self::Tuple(Rc::new(elements))
    }

    pub fn list(elements: Vec<Self>) -> Self {
        Self::List(Rc::new(elements))
    }

    pub fn record(fields: impl IntoIterator<Item = (Rc<str>, Self)>) -> Self {
        Self::Record(Rc::new(fields.into_iter().collect()))
    }

    /// Builds an explicit set, deduplicating while preserving first-seen order.
    pub fn set_of(elements: Vec<Self>) -> Self {
        let mut distinct: Vec<Self> = Vec::with_capacity(elements.len());
        for element in elements {
            if !distinct.contains(&element) {
                distinct.push(element);
            }
        }
        Self::Set(SetValue::Explicit(Rc::new(distinct)))
    }

    pub fn map(entries: IndexMap<Self, Self>) -> Self {
        Self::Map(Rc::new(entries))
    }

    /// Short constructor-name used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::Record(_) => "record",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }

    fn type_mismatch(&self, expected: &str) -> RuntimeError {
        RuntimeError::internal(format!("expected a {expected}, found a {}", self.kind_name()))
    }

    // Coercions assume the upstream type checker already passed; a mismatch
    // is an evaluator bug, not a user error.

    pub fn as_bool(&self) -> EvalResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.type_mismatch("bool")),
        }
    }

    pub fn as_int(&self) -> EvalResult<&BigInt> {
        match self {
            Self::Int(i) => Ok(i),
            other => Err(other.type_mismatch("int")),
        }
    }

    pub fn as_str(&self) -> EvalResult<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(other.type_mismatch("str")),
        }
    }

    pub fn as_tuple(&self) -> EvalResult<&[Self]> {
        match self {
            Self::Tuple(elements) => Ok(elements),
            other => Err(other.type_mismatch("tuple")),
        }
    }

    pub fn as_record(&self) -> EvalResult<&IndexMap<Rc<str>, Self>> {
        match self {
            Self::Record(fields) => Ok(fields),
            other => Err(other.type_mismatch("record")),
        }
    }

    pub fn as_list(&self) -> EvalResult<&[Self]> {
        match self {
            Self::List(elements) => Ok(elements),
            other => Err(other.type_mismatch("list")),
        }
    }

    pub fn as_set(&self) -> EvalResult<&SetValue> {
        match self {
            Self::Set(set) => Ok(set),
            other => Err(other.type_mismatch("set")),
        }
    }

    pub fn as_map(&self) -> EvalResult<&IndexMap<Self, Self>> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(other.type_mismatch("map")),
        }
    }

    /// Canonical representation usable as a map key.
    ///
    /// Sets become explicit, sorted, deduplicated element vectors; record
    /// fields and map entries are sorted by key; all components are
    /// normalized recursively. Idempotent.
    #[must_use]
    pub fn normal_form(&self) -> Self {
        match self {
            Self::Bool(_) | Self::Int(_) | Self::Str(_) => self.clone(),
            Self::Tuple(elements) => Self::tuple(elements.iter().map(Self::normal_form).collect()),
            Self::List(elements) => Self::list(elements.iter().map(Self::normal_form).collect()),
            Self::Record(fields) => {
                let mut entries: Vec<(Rc<str>, Self)> =
                    fields.iter().map(|(name, v)| (Rc::clone(name), v.normal_form())).collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Self::record(entries)
            }
            Self::Set(set) => {
                let mut elements: Vec<Self> = match set.elements() {
                    Ok(elements) => elements.iter().map(Self::normal_form).collect(),
                    // The infinite markers are already canonical.
                    Err(_) => return self.clone(),
                };
                elements.sort_by(canonical_cmp);
                elements.dedup_by(|a, b| canonical_cmp(a, b) == Ordering::Equal);
                Self::Set(SetValue::Explicit(Rc::new(elements)))
            }
            Self::Map(entries) => {
                let mut pairs: Vec<(Self, Self)> = entries
                    .iter()
                    .map(|(k, v)| (k.normal_form(), v.normal_form()))
                    .collect();
                pairs.sort_by(|(a, _), (b, _)| canonical_cmp(a, b));
                Self::Map(Rc::new(pairs.into_iter().collect()))
            }
        }
    }

    /// Exports the value in the interchange shape used for traces: plain
    /// JSON for scalars and sequences, tagged objects for the rest.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Value as Json, json};
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => match i.to_i64() {
                Some(small) => json!(small),
                None => json!({ "#bigint": i.to_string() }),
            },
            Self::Str(s) => Json::String(s.to_string()),
            Self::Tuple(elements) => json!({ "#tup": elements.iter().map(Self::to_json).collect::<Vec<_>>() }),
            Self::List(elements) => Json::Array(elements.iter().map(Self::to_json).collect()),
            Self::Record(fields) => {
                let mut object = serde_json::Map::new();
                for (name, value) in fields.iter() {
                    object.insert(name.to_string(), value.to_json());
                }
                Json::Object(object)
            }
            Self::Set(set) => match set.elements() {
                Ok(elements) => json!({ "#set": elements.iter().map(Self::to_json).collect::<Vec<_>>() }),
                Err(_) => json!({ "#infinite": self.to_string() }),
            },
            Self::Map(entries) => {
                let pairs: Vec<Json> = entries.iter().map(|(k, v)| json!([k.to_json(), v.to_json()])).collect();
                json!({ "#map": pairs })
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Self::Int(value)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) | (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || a == b,
            // IndexMap equality is already entry-order-insensitive.
            (Self::Record(a), Self::Record(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Set(a), Self::Set(b)) => set_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Structural set equality across representations.
///
/// Compares cardinalities first, then checks membership of every element of
/// one side in the other; distinctness makes that sufficient.
fn set_eq(a: &SetValue, b: &SetValue) -> bool {
    match (a, b) {
        (SetValue::Infinite(x), SetValue::Infinite(y)) => x == y,
        (SetValue::Infinite(_), _) | (_, SetValue::Infinite(_)) => false,
        _ => {
            let (Ok(card_a), Ok(card_b)) = (a.cardinality(), b.cardinality()) else {
                return false;
            };
            if card_a != card_b {
                return false;
            }
            match a.elements() {
                Ok(elements) => elements.iter().all(|e| b.contains(e).unwrap_or(false)),
                Err(_) => false,
            }
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Bool(b) => {
                state.write_u8(0);
                b.hash(state);
            }
            Self::Int(i) => {
                state.write_u8(1);
                i.hash(state);
            }
            Self::Str(s) => {
                state.write_u8(2);
                s.hash(state);
            }
            Self::Tuple(elements) => {
                state.write_u8(3);
                for element in elements.iter() {
                    element.hash(state);
                }
            }
            Self::List(elements) => {
                state.write_u8(4);
                for element in elements.iter() {
                    element.hash(state);
                }
            }
            // Unordered containers combine element hashes commutatively so
            // the hash agrees with order-insensitive equality.
            Self::Record(fields) => {
                state.write_u8(5);
                let mut combined = 0u64;
                for entry in fields.iter() {
                    combined = combined.wrapping_add(sub_hash(&entry));
                }
                state.write_u64(combined);
            }
            Self::Set(set) => {
                state.write_u8(6);
                match set.elements() {
                    Ok(elements) => {
                        let mut combined = 0u64;
                        for element in &elements {
                            combined = combined.wrapping_add(sub_hash(element));
                        }
                        state.write_u64(combined);
                    }
                    Err(_) => {
                        if let SetValue::Infinite(kind) = set {
                            let marker: &'static str = (*kind).into();
                            marker.hash(state);
                        }
                    }
                }
            }
            Self::Map(entries) => {
                state.write_u8(7);
                let mut combined = 0u64;
                for entry in entries.iter() {
                    combined = combined.wrapping_add(sub_hash(&entry));
                }
                state.write_u64(combined);
            }
        }
    }
}

fn sub_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Total order over values in normal form, used to canonicalize set element
/// order. Values of different constructors order by constructor rank.
pub(crate) fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Str(_) => 2,
            Value::Tuple(_) => 3,
            Value::Record(_) => 4,
            Value::List(_) => 5,
            Value::Set(_) => 6,
            Value::Map(_) => 7,
        }
    }
    fn cmp_seq<'v>(
        a: impl ExactSizeIterator<Item = &'v Value>,
        b: impl ExactSizeIterator<Item = &'v Value>,
    ) -> Ordering {
        let mut a = a;
        let mut b = b;
        loop {
            match (a.next(), b.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => match canonical_cmp(x, y) {
                    Ordering::Equal => {}
                    other => return other,
                },
            }
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Tuple(x), Value::Tuple(y)) | (Value::List(x), Value::List(y)) => cmp_seq(x.iter(), y.iter()),
        (Value::Record(x), Value::Record(y)) => {
            for ((name_a, value_a), (name_b, value_b)) in x.iter().zip(y.iter()) {
                match name_a.cmp(name_b).then_with(|| canonical_cmp(value_a, value_b)) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Set(x), Value::Set(y)) => match (x, y) {
            (SetValue::Explicit(ex), SetValue::Explicit(ey)) => cmp_seq(ex.iter(), ey.iter()),
            (SetValue::Infinite(kx), SetValue::Infinite(ky)) => {
                let kx: &'static str = (*kx).into();
                let ky: &'static str = (*ky).into();
                kx.cmp(ky)
            }
            (SetValue::Infinite(_), _) => Ordering::Greater,
            (_, SetValue::Infinite(_)) => Ordering::Less,
            // Non-canonical shapes should not reach here; fall back through
            // the normal form to stay total.
            _ => canonical_cmp(&Value::Set(x.clone()).normal_form(), &Value::Set(y.clone()).normal_form()),
        },
        (Value::Map(x), Value::Map(y)) => {
            for ((key_a, value_a), (key_b, value_b)) in x.iter().zip(y.iter()) {
                match canonical_cmp(key_a, key_b).then_with(|| canonical_cmp(value_a, value_b)) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

impl SetValue {
    /// Number of elements. Fails on the infinite markers and on powersets too
    /// large to even count.
    pub fn cardinality(&self) -> EvalResult<BigInt> {
        match self {
            Self::Explicit(elements) => Ok(BigInt::from(elements.len())),
            Self::Interval(low, high) => {
                if high < low {
                    Ok(BigInt::zero())
                } else {
                    Ok(high - low + 1)
                }
            }
            Self::Powerset(base) => {
                let base_card = base.cardinality()?;
                let bits = base_card
                    .to_usize()
                    .ok_or_else(|| RuntimeError::internal("powerset base is too large"))?;
                Ok(BigInt::from(1u8) << bits)
            }
            Self::CrossProduct(components) => {
                let mut product = BigInt::from(1u8);
                for component in components.iter() {
                    product *= component.cardinality()?;
                }
                Ok(product)
            }
            Self::MapSet(domain, range) => {
                let domain_card = domain
                    .cardinality()?
                    .to_u32()
                    .ok_or_else(|| RuntimeError::internal("set-of-maps domain is too large"))?;
                Ok(num_traits::pow::Pow::pow(range.cardinality()?, domain_card))
            }
            Self::Infinite(kind) => Err(infinite_error(*kind)),
        }
    }

    pub fn is_empty(&self) -> EvalResult<bool> {
        match self {
            Self::Explicit(elements) => Ok(elements.is_empty()),
            Self::Interval(low, high) => Ok(high < low),
            // The empty set has a one-element powerset, so a powerset is
            // never empty; same for the map set over an empty domain.
            Self::Powerset(_) => Ok(false),
            Self::CrossProduct(components) => {
                for component in components.iter() {
                    if component.is_empty()? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::MapSet(domain, range) => Ok(!domain.is_empty()? && range.is_empty()?),
            Self::Infinite(_) => Ok(false),
        }
    }

    /// Membership test; lazy shapes answer without enumeration.
    pub fn contains(&self, value: &Value) -> EvalResult<bool> {
        match self {
            Self::Explicit(elements) => Ok(elements.contains(value)),
            Self::Interval(low, high) => match value {
                Value::Int(i) => Ok(i >= low && i <= high),
                _ => Ok(false),
            },
            Self::Powerset(base) => match value {
                Value::Set(candidate) => candidate.is_subset(base),
                _ => Ok(false),
            },
            Self::CrossProduct(components) => match value {
                Value::Tuple(elements) if elements.len() == components.len() => {
                    for (element, component) in elements.iter().zip(components.iter()) {
                        if !component.contains(element)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            Self::MapSet(domain, range) => match value {
                Value::Map(entries) => {
                    let keys = Value::set_of(entries.keys().cloned().collect());
                    if keys != Value::Set((**domain).clone()) {
                        return Ok(false);
                    }
                    for map_value in entries.values() {
                        if !range.contains(map_value)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            Self::Infinite(kind) => match value {
                Value::Int(i) => Ok(match kind {
                    InfiniteKind::Int => true,
                    InfiniteKind::Nat => !i.is_negative(),
                }),
                _ => Ok(false),
            },
        }
    }

    /// True iff every element of `self` is in `other`.
    ///
    /// `other` may be infinite (the membership test stays lazy); `self` must
    /// be enumerable.
    pub fn is_subset(&self, other: &Self) -> EvalResult<bool> {
        for element in self.elements()? {
            if !other.contains(&element)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Materializes the set in its stable enumeration order.
    pub fn elements(&self) -> EvalResult<Vec<Value>> {
        match self {
            Self::Explicit(elements) => Ok(elements.to_vec()),
            Self::Interval(low, high) => {
                let mut out = Vec::new();
                let mut current = low.clone();
                while current <= *high {
                    out.push(Value::Int(current.clone()));
                    current += 1;
                }
                Ok(out)
            }
            Self::Infinite(kind) => Err(infinite_error(*kind)),
            _ => {
                let count = self
                    .cardinality()?
                    .to_usize()
                    .ok_or_else(|| RuntimeError::internal("set is too large to enumerate"))?;
                let mut out = Vec::with_capacity(count);
                for index in 0..count {
                    out.push(self.pick_by_index(&BigInt::from(index))?);
                }
                Ok(out)
            }
        }
    }

    /// Returns the element at `index` in the stable enumeration order
    /// without materializing the set.
    pub fn pick_by_index(&self, index: &BigInt) -> EvalResult<Value> {
        match self {
            Self::Explicit(elements) => {
                let i = index
                    .to_usize()
                    .filter(|i| *i < elements.len())
                    .ok_or_else(|| RuntimeError::internal("set index out of range"))?;
                Ok(elements[i].clone())
            }
            Self::Interval(low, _) => Ok(Value::Int(low + index)),
            Self::Powerset(base) => {
                let base_elements = base.elements()?;
                let bits = index.to_biguint().ok_or_else(|| RuntimeError::internal("negative set index"))?;
                let mut subset = Vec::new();
                for (position, element) in base_elements.into_iter().enumerate() {
                    if bits.bit(position as u64) {
                        subset.push(element);
                    }
                }
                Ok(Value::set_of(subset))
            }
            Self::CrossProduct(components) => {
                let mut remaining = index.clone();
                let mut picked = vec![Value::Bool(false); components.len()];
                for (position, component) in components.iter().enumerate().rev() {
                    let card = component.cardinality()?;
                    let (quotient, offset) = remaining.div_rem(&card);
                    picked[position] = component.pick_by_index(&offset)?;
                    remaining = quotient;
                }
                Ok(Value::tuple(picked))
            }
            Self::MapSet(domain, range) => {
                let range_card = range.cardinality()?;
                let mut remaining = index.clone();
                let mut entries = IndexMap::new();
                for key in domain.elements()? {
                    let (quotient, offset) = remaining.div_rem(&range_card);
                    entries.insert(key.normal_form(), range.pick_by_index(&offset)?);
                    remaining = quotient;
                }
                Ok(Value::Map(Rc::new(entries)))
            }
            Self::Infinite(kind) => Err(infinite_error(*kind)),
        }
    }

    /// Deterministic selection: the element at `⌊r * cardinality⌋` in the
    /// stable enumeration order, for `r` in `[0, 1)`. Fails on an empty set.
    pub fn pick(&self, r: f64) -> EvalResult<Value> {
        let card = self.cardinality()?;
        if card.is_zero() {
            return Err(RuntimeError::new(
                RuntimeErrorKind::EmptySet,
                "cannot pick from an empty set",
            ));
        }
        // Scale through 2^53 so the index stays exact in big-integer space.
        let scaled = BigInt::from((r * (1u64 << 53) as f64) as u64);
        let index = (scaled * &card) >> 53;
        self.pick_by_index(&index)
    }

    pub fn union(&self, other: &Self) -> EvalResult<Self> {
        let mut elements = self.elements()?;
        for element in other.elements()? {
            if !elements.contains(&element) {
                elements.push(element);
            }
        }
        Ok(Self::Explicit(Rc::new(elements)))
    }

    pub fn intersect(&self, other: &Self) -> EvalResult<Self> {
        let mut elements = Vec::new();
        for element in self.elements()? {
            if other.contains(&element)? {
                elements.push(element);
            }
        }
        Ok(Self::Explicit(Rc::new(elements)))
    }

    pub fn subtract(&self, other: &Self) -> EvalResult<Self> {
        let mut elements = Vec::new();
        for element in self.elements()? {
            if !other.contains(&element)? {
                elements.push(element);
            }
        }
        Ok(Self::Explicit(Rc::new(elements)))
    }
}

fn infinite_error(kind: InfiniteKind) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::InfiniteSet,
        format!("cannot enumerate the infinite set {kind}"),
    )
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_joined(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
            for (position, value) in values.iter().enumerate() {
                if position > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            Ok(())
        }

        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Tuple(elements) => {
                f.write_char('(')?;
                write_joined(f, elements)?;
                f.write_char(')')
            }
            Self::Record(fields) => {
                f.write_str("{ ")?;
                for (position, (name, value)) in fields.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            Self::List(elements) => {
                f.write_char('[')?;
                write_joined(f, elements)?;
                f.write_char(']')
            }
            Self::Set(set) => match set {
                SetValue::Explicit(elements) => {
                    f.write_str("Set(")?;
                    write_joined(f, elements)?;
                    f.write_char(')')
                }
                SetValue::Interval(low, high) => write!(f, "{low}.to({high})"),
                SetValue::Powerset(base) => write!(f, "powerset({})", Self::Set((**base).clone())),
                SetValue::CrossProduct(components) => {
                    f.write_str("tuples(")?;
                    for (position, component) in components.iter().enumerate() {
                        if position > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", Self::Set(component.clone()))?;
                    }
                    f.write_char(')')
                }
                SetValue::MapSet(domain, range) => {
                    write!(
                        f,
                        "setOfMaps({}, {})",
                        Self::Set((**domain).clone()),
                        Self::Set((**range).clone())
                    )
                }
                SetValue::Infinite(kind) => write!(f, "{kind}"),
            },
            Self::Map(entries) => {
                f.write_str("Map(")?;
                for (position, (key, value)) in entries.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} -> {value}")?;
                }
                f.write_char(')')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn int(i: i64) -> Value {
        Value::int(i)
    }

    #[test]
    fn equality_is_reflexive_and_symmetric() {
        let values = vec![
            Value::Bool(true),
            int(42),
            Value::str("hello"),
            Value::tuple(vec![int(1), Value::str("x")]),
            Value::list(vec![int(1), int(2)]),
            Value::set_of(vec![int(3), int(1), int(2)]),
        ];
        for a in &values {
            assert_eq!(a, a);
            for b in &values {
                assert_eq!(a == b, b == a);
            }
        }
    }

    #[test]
    fn set_equality_ignores_insertion_order() {
        let a = Value::set_of(vec![int(1), int(2), int(3)]);
        let b = Value::set_of(vec![int(3), int(1), int(2)]);
        assert_eq!(a, b);
    }

    #[test]
    fn interval_equals_explicit_set() {
        let interval = Value::Set(SetValue::Interval(BigInt::from(1), BigInt::from(3)));
        let explicit = Value::set_of(vec![int(1), int(2), int(3)]);
        assert_eq!(interval, explicit);
        assert_eq!(sub_hash(&interval), sub_hash(&explicit));
    }

    #[test]
    fn record_equality_ignores_field_order() {
        let a = Value::record(vec![(Rc::from("x"), int(1)), (Rc::from("y"), int(2))]);
        let b = Value::record(vec![(Rc::from("y"), int(2)), (Rc::from("x"), int(1))]);
        assert_eq!(a, b);
        assert_eq!(sub_hash(&a), sub_hash(&b));
    }

    #[test]
    fn explicit_set_deduplicates() {
        let set = Value::set_of(vec![int(1), int(1), int(2)]);
        let SetValue::Explicit(elements) = set.as_set().unwrap() else {
            panic!("expected explicit set");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn cardinality_matches_enumeration() {
        let shapes = vec![
            SetValue::Explicit(Rc::new(vec![int(1), int(5), int(9)])),
            SetValue::Interval(BigInt::from(-2), BigInt::from(4)),
            SetValue::Powerset(Rc::new(SetValue::Interval(BigInt::from(1), BigInt::from(4)))),
            SetValue::CrossProduct(Rc::new(vec![
                SetValue::Interval(BigInt::from(1), BigInt::from(3)),
                SetValue::Interval(BigInt::from(1), BigInt::from(2)),
            ])),
            SetValue::MapSet(
                Rc::new(SetValue::Interval(BigInt::from(1), BigInt::from(2))),
                Rc::new(SetValue::Interval(BigInt::from(1), BigInt::from(3))),
            ),
        ];
        for shape in shapes {
            let elements = shape.elements().unwrap();
            assert_eq!(BigInt::from(elements.len()), shape.cardinality().unwrap());
            for element in &elements {
                assert!(shape.contains(element).unwrap());
            }
        }
    }

    #[test]
    fn empty_interval() {
        let set = SetValue::Interval(BigInt::from(3), BigInt::from(2));
        assert!(set.is_empty().unwrap());
        assert_eq!(set.cardinality().unwrap(), BigInt::zero());
        assert_eq!(set.elements().unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn powerset_membership_without_enumeration() {
        let base = SetValue::Interval(BigInt::from(1), BigInt::from(30));
        let powerset = SetValue::Powerset(Rc::new(base));
        let subset = Value::set_of(vec![int(3), int(17), int(30)]);
        assert!(powerset.contains(&subset).unwrap());
        let not_subset = Value::set_of(vec![int(3), int(31)]);
        assert!(!powerset.contains(&not_subset).unwrap());
    }

    #[test]
    fn infinite_sets_fail_to_enumerate() {
        let int_set = SetValue::Infinite(InfiniteKind::Int);
        assert_eq!(int_set.elements().unwrap_err().kind, RuntimeErrorKind::InfiniteSet);
        assert_eq!(int_set.cardinality().unwrap_err().kind, RuntimeErrorKind::InfiniteSet);
        assert!(int_set.contains(&int(-5)).unwrap());
        let nat_set = SetValue::Infinite(InfiniteKind::Nat);
        assert!(!nat_set.contains(&int(-5)).unwrap());
        assert!(nat_set.contains(&int(0)).unwrap());
    }

    #[test]
    fn subset_of_infinite_set() {
        let small = SetValue::Explicit(Rc::new(vec![int(1), int(2)]));
        assert!(small.is_subset(&SetValue::Infinite(InfiniteKind::Nat)).unwrap());
        let negatives = SetValue::Explicit(Rc::new(vec![int(-1)]));
        assert!(!negatives.is_subset(&SetValue::Infinite(InfiniteKind::Nat)).unwrap());
    }

    #[test]
    fn pick_is_deterministic_and_in_range() {
        let set = SetValue::Interval(BigInt::from(10), BigInt::from(19));
        assert_eq!(set.pick(0.0).unwrap(), int(10));
        assert_eq!(set.pick(0.55).unwrap(), int(15));
        assert_eq!(set.pick(0.999_999).unwrap(), int(19));
        let empty = SetValue::Explicit(Rc::new(vec![]));
        assert_eq!(empty.pick(0.5).unwrap_err().kind, RuntimeErrorKind::EmptySet);
    }

    #[test]
    fn map_keys_normalize() {
        let mut entries = IndexMap::new();
        entries.insert(Value::set_of(vec![int(1), int(2)]).normal_form(), int(7));
        let map = Value::map(entries);
        let lookup_key = Value::set_of(vec![int(2), int(1)]).normal_form();
        assert_eq!(map.as_map().unwrap().get(&lookup_key), Some(&int(7)));
    }

    #[test]
    fn normal_form_is_idempotent() {
        let value = Value::set_of(vec![
            Value::set_of(vec![int(2), int(1)]),
            Value::Set(SetValue::Interval(BigInt::from(1), BigInt::from(2))),
            Value::record(vec![(Rc::from("b"), int(1)), (Rc::from("a"), int(2))]),
        ]);
        let once = value.normal_form();
        let twice = once.normal_form();
        assert_eq!(once, twice);
    }

    #[test]
    fn set_ops_materialize() {
        let a = SetValue::Interval(BigInt::from(1), BigInt::from(5));
        let b = SetValue::Explicit(Rc::new(vec![int(4), int(5), int(6)]));
        assert_eq!(
            Value::Set(a.union(&b).unwrap()),
            Value::set_of((1..=6i64).map(int).collect())
        );
        assert_eq!(
            Value::Set(a.intersect(&b).unwrap()),
            Value::set_of(vec![int(4), int(5)])
        );
        assert_eq!(
            Value::Set(a.subtract(&b).unwrap()),
            Value::set_of(vec![int(1), int(2), int(3)])
        );
    }

    #[test]
    fn display_round_trips_shapes() {
        assert_eq!(Value::set_of(vec![int(1), int(2)]).to_string(), "Set(1, 2)");
        assert_eq!(Value::tuple(vec![int(1), Value::str("a")]).to_string(), "(1, \"a\")");
        assert_eq!(
            Value::record(vec![(Rc::from("n"), int(3))]).to_string(),
            "{ n: 3 }"
        );
    }
}
