//! Condition compilation: descriptor set to WHERE clause and ORDER BY list.

use crate::condition::{Cond, CondSet, Logic};
use crate::error::{OrmError, OrmResult};
use crate::named::{bind_marker, fresh_name, placeholders, replace_placeholders};
use crate::param::ParamBag;
use crate::resolve::ColumnMap;
use crate::value::{Value, is_zero_literal, quote_text};

/// How values reach the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindMode {
    /// `column=:name` markers bound from the parameter bag at execution.
    #[default]
    Named,
    /// Values rendered inline as SQL literals.
    Literal,
}

/// Output of [`compile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compiled {
    /// `WHERE ...`, or empty when no term was produced.
    pub where_clause: String,
    /// Resolved ORDER BY entries (`col`, `col DESC`).
    pub order_by: Vec<String>,
}

impl Compiled {
    pub fn has_where(&self) -> bool {
        !self.where_clause.is_empty()
    }
}

/// Compile a descriptor set against a column map.
///
/// Field references without a column are skipped. Named mode may add
/// synthesized entries to `params` (`age1`, `age_gte`, expression names);
/// a synthesized name never replaces an existing entry, it gets a `_2`,
/// `_3`, ... suffix instead.
pub fn compile(
    conds: &CondSet,
    columns: &ColumnMap,
    params: &mut ParamBag,
    mode: BindMode,
) -> OrmResult<Compiled> {
    let mut compiler = Compiler {
        columns,
        params,
        mode,
        terms: Vec::new(),
        order_by: Vec::new(),
    };
    for cond in conds.iter() {
        compiler.push(cond)?;
    }

    let where_clause = if compiler.terms.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", compiler.terms.join(" AND "))
    };
    Ok(Compiled {
        where_clause,
        order_by: compiler.order_by,
    })
}

struct Compiler<'a> {
    columns: &'a ColumnMap,
    params: &'a mut ParamBag,
    mode: BindMode,
    terms: Vec<String>,
    order_by: Vec<String>,
}

impl Compiler<'_> {
    fn literal(&self, field: &str) -> String {
        self.params
            .get(field)
            .map(Value::to_literal)
            .unwrap_or_default()
    }

    /// Store `value` under a fresh name derived from `base`; returns the marker.
    fn bind(&mut self, base: &str, value: &Value) -> String {
        let key = fresh_name(self.params, base);
        self.params.insert(key.clone(), value.clone());
        format!(":{key}")
    }

    fn push_group(&mut self, parts: Vec<String>, logic: Logic) {
        if !parts.is_empty() {
            self.terms
                .push(format!("({})", parts.join(logic.separator())));
        }
    }

    fn push(&mut self, cond: &Cond) -> OrmResult<()> {
        let columns = self.columns;
        match cond {
            Cond::Group {
                logic,
                fields,
                skip_zero,
            } => {
                let mut parts = Vec::new();
                for field in fields {
                    let Some(column) = columns.column(field) else {
                        continue;
                    };
                    let lit = self.literal(field);
                    if *skip_zero && is_zero_literal(&lit) {
                        continue;
                    }
                    match self.mode {
                        BindMode::Named => {
                            let marker = bind_marker(self.params, field);
                            parts.push(format!("{column}={marker}"));
                        }
                        BindMode::Literal if !lit.is_empty() => {
                            parts.push(format!("{column}={lit}"))
                        }
                        BindMode::Literal => {}
                    }
                }
                self.push_group(parts, *logic);
            }
            Cond::Multi { logic, field, args } => {
                let Some(column) = columns.column(field) else {
                    return Ok(());
                };
                let mut parts = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    match self.mode {
                        BindMode::Named => {
                            let marker = self.bind(&format!("{field}{}", i + 1), arg);
                            parts.push(format!("{column}={marker}"));
                        }
                        BindMode::Literal => {
                            let lit = arg.to_literal();
                            if !lit.is_empty() {
                                parts.push(format!("{column}={lit}"));
                            }
                        }
                    }
                }
                self.push_group(parts, *logic);
            }
            Cond::Compare { op, field, arg } => {
                let Some(column) = columns.column(field) else {
                    return Ok(());
                };
                let lit = match arg {
                    Some(v) => v.to_literal(),
                    None => self.literal(field),
                };
                if lit.is_empty() || lit == "''" {
                    return Ok(());
                }
                let symbol = op.symbol();
                let term = match (self.mode, arg) {
                    (BindMode::Literal, _) => format!("{column}{symbol}{lit}"),
                    (BindMode::Named, None) => {
                        format!("{column}{symbol}{}", bind_marker(self.params, field))
                    }
                    (BindMode::Named, Some(v)) => {
                        let marker = self.bind(&format!("{field}_{}", op.suffix()), v);
                        format!("{column}{symbol}{marker}")
                    }
                };
                self.terms.push(term);
            }
            Cond::In { field, list } => {
                let Some(column) = columns.column(field) else {
                    return Ok(());
                };
                if list.is_empty() {
                    self.terms.push("1=0".to_string());
                } else {
                    self.terms
                        .push(format!("{column} IN ({})", list.join(",")));
                }
            }
            Cond::Null {
                logic,
                fields,
                negated,
            } => {
                let test = if *negated { "IS NOT NULL" } else { "IS NULL" };
                let parts = fields
                    .iter()
                    .filter_map(|f| columns.column(f))
                    .map(|column| format!("{column} {test}"))
                    .collect();
                self.push_group(parts, *logic);
            }
            Cond::Like {
                logic,
                fields,
                negated,
            } => {
                let op = if *negated { "NOT LIKE" } else { "LIKE" };
                let mut parts = Vec::new();
                for field in fields {
                    let Some(column) = columns.column(field) else {
                        continue;
                    };
                    if let Some(text) = self.params.get(field).and_then(Value::as_str)
                        && !text.is_empty()
                    {
                        parts.push(format!("{column} {op} {}", quote_text(&format!("%{text}%"))));
                    }
                }
                self.push_group(parts, *logic);
            }
            Cond::Expr { express, args } => {
                let term = self.expression(express, args)?;
                self.terms.push(format!("({term})"));
            }
            Cond::Raw { express, args } => {
                if !express.is_empty() {
                    self.terms
                        .push(format!("({})", substitute_positional(express, args)));
                }
            }
            Cond::Order { field, desc } => {
                if let Some(column) = columns.column(field) {
                    self.order_by.push(if *desc {
                        format!("{column} DESC")
                    } else {
                        column.to_string()
                    });
                }
            }
            Cond::AutoFill { include_zero } => {
                let pk = columns.primary_key();
                let mut parts = Vec::new();
                for (logical, column) in columns.iter() {
                    if column.is_empty() || Some(logical) == pk {
                        continue;
                    }
                    let lit = self.literal(logical);
                    if lit.is_empty() || (!include_zero && is_zero_literal(&lit)) {
                        continue;
                    }
                    parts.push(match self.mode {
                        BindMode::Named => format!("{column}={}", bind_marker(self.params, logical)),
                        BindMode::Literal => format!("{column}={lit}"),
                    });
                }
                self.push_group(parts, Logic::And);
            }
        }
        Ok(())
    }

    fn expression(&mut self, express: &str, args: &[Value]) -> OrmResult<String> {
        let names = placeholders(express);
        if names.is_empty() {
            return Ok(express.to_string());
        }
        let mismatch = || OrmError::ArgsMismatch {
            express: express.to_string(),
            fields: names.len(),
            args: args.len(),
        };

        match self.mode {
            BindMode::Named => {
                if names.len() != args.len() {
                    return Err(mismatch());
                }
                // Each marker occurrence binds its own argument; a name
                // already in the bag is renamed in the emitted term.
                let params = &mut *self.params;
                replace_placeholders(express, |i, name| {
                    let key = fresh_name(params, name);
                    if let Some(arg) = args.get(i) {
                        params.insert(key.clone(), arg.clone());
                    }
                    Ok(format!(":{key}"))
                })
            }
            BindMode::Literal => {
                if names.len() > args.len() {
                    return Err(mismatch());
                }
                replace_placeholders(express, |i, _| {
                    Ok(args.get(i).map(Value::to_literal).unwrap_or_default())
                })
            }
        }
    }
}

/// Replace `$1..$N` with the rendered literal of the matching argument.
///
/// Indexes without an argument are left untouched.
pub(crate) fn substitute_positional(express: &str, args: &[Value]) -> String {
    let bytes = express.as_bytes();
    let mut out = String::with_capacity(express.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let arg = express[start..end]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| args.get(n));
        if let Some(arg) = arg {
            out.push_str(&express[last..i]);
            out.push_str(&arg.to_literal());
            last = end;
        }
        i = end.max(start);
    }
    out.push_str(&express[last..]);
    out
}
