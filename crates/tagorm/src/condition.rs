//! Condition descriptors for WHERE clauses.
//!
//! A [`Cond`] describes one contribution to a WHERE clause (or to ORDER BY)
//! and how it is compiled. Descriptors reference fields by their logical
//! identifier; the compiler resolves them to columns and reads current values
//! from the parameter bag.
//!
//! # Example
//! ```ignore
//! use tagorm::{Cond, values};
//!
//! Cond::and(["uid", "status"]);          // uid=:uid AND status=:status
//! Cond::and_auto(["name"]);              // dropped when name is empty or zero
//! Cond::or_values("age", values![1, 2]); // (age=:age1 OR age=:age2)
//! Cond::gte_val("created", "2024-01-01");
//! Cond::in_list("uid", ["a", "b"]);      // uid IN ('a','b')
//! Cond::exp("created>=:a AND id=:b", values!["2024-01-01", 5]);
//! Cond::desc("created");
//! ```

use crate::value::{Value, quote_text};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

/// Join operator between the sub-terms of one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn separator(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }
}

/// Comparison symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    /// Suffix of the synthesized parameter name (`age_gte`).
    pub fn suffix(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }
}

/// A condition descriptor. Immutable once built by its factory.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `column = current value` for each field.
    Group {
        logic: Logic,
        fields: Vec<String>,
        /// Drop fields whose value renders as `''`, `0` or nothing.
        skip_zero: bool,
    },
    /// One field equal to one of several explicit values.
    Multi {
        logic: Logic,
        field: String,
        args: Vec<Value>,
    },
    /// `column <op> value`; without `arg` the record's current value is used.
    Compare {
        op: CompareOp,
        field: String,
        arg: Option<Value>,
    },
    /// `column IN (list)` over pre-rendered literals.
    In { field: String, list: Vec<String> },
    /// `IS NULL` / `IS NOT NULL` for each field.
    Null {
        logic: Logic,
        fields: Vec<String>,
        negated: bool,
    },
    /// `LIKE '%value%'` / `NOT LIKE` for each field holding a non-empty string.
    Like {
        logic: Logic,
        fields: Vec<String>,
        negated: bool,
    },
    /// Template with `:name` placeholders bound to positional arguments.
    Expr { express: String, args: Vec<Value> },
    /// Template with `$1..$N` placeholders replaced by rendered literals.
    Raw { express: String, args: Vec<Value> },
    /// ORDER BY contribution.
    Order { field: String, desc: bool },
    /// `column = value` for every resolved column except the primary key.
    AutoFill { include_zero: bool },
}

fn strings<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

fn values<I, V>(args: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    args.into_iter().map(Into::into).collect()
}

impl Cond {
    // ==================== Groups ====================

    /// AND-joined equality over the fields' current values.
    pub fn and<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Group {
            logic: Logic::And,
            fields: strings(fields),
            skip_zero: false,
        }
    }

    /// OR-joined equality over the fields' current values.
    pub fn or<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Group {
            logic: Logic::Or,
            fields: strings(fields),
            skip_zero: false,
        }
    }

    /// Like [`Cond::and`], but fields with a zero or empty value are dropped.
    pub fn and_auto<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Group {
            logic: Logic::And,
            fields: strings(fields),
            skip_zero: true,
        }
    }

    /// Like [`Cond::or`], but fields with a zero or empty value are dropped.
    pub fn or_auto<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Group {
            logic: Logic::Or,
            fields: strings(fields),
            skip_zero: true,
        }
    }

    // ==================== Single field, many values ====================

    /// `(column=v1 AND column=v2 ...)`.
    pub fn and_values<I, V>(field: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Cond::Multi {
            logic: Logic::And,
            field: field.into(),
            args: values(args),
        }
    }

    /// `(column=v1 OR column=v2 ...)`.
    pub fn or_values<I, V>(field: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Cond::Multi {
            logic: Logic::Or,
            field: field.into(),
            args: values(args),
        }
    }

    // ==================== Comparisons ====================

    fn compare(op: CompareOp, field: impl Into<String>, arg: Option<Value>) -> Self {
        Cond::Compare {
            op,
            field: field.into(),
            arg,
        }
    }

    pub fn eq(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Eq, field, None)
    }

    pub fn eq_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, field, Some(arg.into()))
    }

    pub fn ne(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Ne, field, None)
    }

    pub fn ne_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ne, field, Some(arg.into()))
    }

    pub fn gt(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Gt, field, None)
    }

    pub fn gt_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gt, field, Some(arg.into()))
    }

    pub fn gte(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Gte, field, None)
    }

    pub fn gte_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gte, field, Some(arg.into()))
    }

    pub fn lt(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Lt, field, None)
    }

    pub fn lt_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lt, field, Some(arg.into()))
    }

    pub fn lte(field: impl Into<String>) -> Self {
        Self::compare(CompareOp::Lte, field, None)
    }

    pub fn lte_val(field: impl Into<String>, arg: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lte, field, Some(arg.into()))
    }

    // ==================== Set membership ====================

    /// `column IN (...)`. String items are quoted, integers are not.
    pub fn in_list<I, T>(field: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: InLiteral,
    {
        Cond::In {
            field: field.into(),
            list: items.into_iter().map(|i| i.render()).collect(),
        }
    }

    /// `column IN (...)` over literals rendered by the caller (see [`literal_list`]).
    pub fn in_rendered<I, S>(field: impl Into<String>, list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::In {
            field: field.into(),
            list: strings(list),
        }
    }

    // ==================== NULL / LIKE ====================

    fn null<I, S>(logic: Logic, fields: I, negated: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Null {
            logic,
            fields: strings(fields),
            negated,
        }
    }

    pub fn is_null<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::null(Logic::And, fields, false)
    }

    pub fn is_null_or<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::null(Logic::Or, fields, false)
    }

    pub fn not_null<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::null(Logic::And, fields, true)
    }

    pub fn not_null_or<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::null(Logic::Or, fields, true)
    }

    fn pattern<I, S>(logic: Logic, fields: I, negated: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Like {
            logic,
            fields: strings(fields),
            negated,
        }
    }

    pub fn like<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::pattern(Logic::And, fields, false)
    }

    pub fn like_or<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::pattern(Logic::Or, fields, false)
    }

    pub fn not_like<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::pattern(Logic::And, fields, true)
    }

    pub fn not_like_or<I: IntoIterator<Item = S>, S: Into<String>>(fields: I) -> Self {
        Self::pattern(Logic::Or, fields, true)
    }

    // ==================== Expressions ====================

    /// Named expression: `created>=:a AND id=:b` with positional arguments.
    pub fn exp<I, V>(express: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Cond::Expr {
            express: express.into(),
            args: values(args),
        }
    }

    /// Raw expression: `a = $1 AND b = $2`, always substituted inline.
    pub fn raw<I, V>(express: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Cond::Raw {
            express: express.into(),
            args: values(args),
        }
    }

    // ==================== Ordering / auto-fill ====================

    pub fn asc(field: impl Into<String>) -> Self {
        Cond::Order {
            field: field.into(),
            desc: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Cond::Order {
            field: field.into(),
            desc: true,
        }
    }

    /// Every non-zero column of the record.
    pub fn auto_fill() -> Self {
        Cond::AutoFill {
            include_zero: false,
        }
    }

    /// Every column of the record, zero values included.
    pub fn auto_fill_zero() -> Self {
        Cond::AutoFill { include_zero: true }
    }

    fn kind(&self) -> &'static str {
        match self {
            Cond::Group {
                skip_zero: false, ..
            } => "group",
            Cond::Group {
                skip_zero: true, ..
            } => "group_auto",
            Cond::Multi { .. } => "multi",
            Cond::Compare { op, .. } => op.suffix(),
            Cond::In { .. } => "in",
            Cond::Null { negated: false, .. } => "null",
            Cond::Null { negated: true, .. } => "not_null",
            Cond::Like { negated: false, .. } => "like",
            Cond::Like { negated: true, .. } => "not_like",
            Cond::Expr { .. } => "expr",
            Cond::Raw { .. } => "raw",
            Cond::Order { desc: false, .. } => "asc",
            Cond::Order { desc: true, .. } => "desc",
            Cond::AutoFill {
                include_zero: false,
            } => "auto_fill",
            Cond::AutoFill { include_zero: true } => "auto_fill_zero",
        }
    }

    fn logic(&self) -> Option<Logic> {
        match self {
            Cond::Group { logic, .. }
            | Cond::Multi { logic, .. }
            | Cond::Null { logic, .. }
            | Cond::Like { logic, .. } => Some(*logic),
            _ => None,
        }
    }

    fn field_refs(&self) -> &[String] {
        match self {
            Cond::Group { fields, .. } | Cond::Null { fields, .. } | Cond::Like { fields, .. } => {
                fields
            }
            Cond::Multi { field, .. }
            | Cond::Compare { field, .. }
            | Cond::In { field, .. }
            | Cond::Order { field, .. } => std::slice::from_ref(field),
            Cond::Expr { .. } | Cond::Raw { .. } | Cond::AutoFill { .. } => &[],
        }
    }

    fn express(&self) -> &str {
        match self {
            Cond::Expr { express, .. } | Cond::Raw { express, .. } => express,
            _ => "",
        }
    }

    /// Content hash over kind, logic, field references and expression text.
    ///
    /// Arguments are not part of the key: re-attaching a descriptor for the
    /// same fields replaces the earlier one.
    pub fn key(&self) -> CondKey {
        let mut hasher = Sha256::new();
        hasher.update(self.kind().as_bytes());
        hasher.update([0x1e]);
        hasher.update(self.logic().map(Logic::name).unwrap_or("").as_bytes());
        hasher.update([0x1e]);
        for field in self.field_refs() {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
        hasher.update(self.express().as_bytes());
        hasher.finalize().into()
    }
}

/// Dedup key of a descriptor.
pub type CondKey = [u8; 32];

/// Deduplicated, insertion-ordered set of descriptors.
///
/// A descriptor whose key is already present replaces the stored one but
/// keeps the original position.
#[derive(Debug, Clone, Default)]
pub struct CondSet {
    conds: IndexMap<CondKey, Cond>,
}

impl CondSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cond: Cond) {
        self.conds.insert(cond.key(), cond);
    }

    pub fn len(&self) -> usize {
        self.conds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cond> {
        self.conds.values()
    }
}

impl Extend<Cond> for CondSet {
    fn extend<T: IntoIterator<Item = Cond>>(&mut self, iter: T) {
        for cond in iter {
            self.insert(cond);
        }
    }
}

impl FromIterator<Cond> for CondSet {
    fn from_iter<T: IntoIterator<Item = Cond>>(iter: T) -> Self {
        let mut set = CondSet::new();
        set.extend(iter);
        set
    }
}

// ==================== IN literals ====================

/// An item usable in an IN list.
///
/// Quoting is decided by the item type: string types are single-quoted,
/// integer types are rendered bare.
pub trait InLiteral {
    fn render(&self) -> String;
}

impl InLiteral for &str {
    fn render(&self) -> String {
        quote_text(self)
    }
}

impl InLiteral for String {
    fn render(&self) -> String {
        quote_text(self)
    }
}

impl InLiteral for &String {
    fn render(&self) -> String {
        quote_text(self)
    }
}

macro_rules! impl_in_literal_int {
    ($($t:ty),+) => {
        $(
            impl InLiteral for $t {
                fn render(&self) -> String {
                    self.to_string()
                }
            }

            impl InLiteral for &$t {
                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

impl_in_literal_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Render a slice for an IN list (`['a','b']` or `[1,2]`).
pub fn literal_list<T: InLiteral>(items: &[T]) -> Vec<String> {
    items.iter().map(InLiteral::render).collect()
}
