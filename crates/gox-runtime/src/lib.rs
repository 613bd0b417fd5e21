//! gox-runtime - query construction driven by gox-generated code
//!
//! Generated files use exactly four entry points: [`QueryBuilder::new`],
//! [`QueryBuilder::add_text`], [`QueryBuilder::add_param`], and
//! [`QueryBuilder::build`]. Everything else in this crate exists to make
//! those four calls accept the value shapes that template expressions
//! produce: plain text, nested [`Query`] values (spliced), scalars
//! (stringified), optional values (a `None` text is a no-op), and
//! sequences (expanded to `?,?,...` placeholders).

use std::fmt;

pub mod value;

pub use value::Value;

/// A finished SQL query: the SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    sql: String,
    args: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// The SQL text with `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The positional arguments, in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// What [`QueryBuilder::add_text`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Text appended verbatim.
    Text(String),
    /// A nested query: its SQL is appended and its args are spliced in.
    Query(Query),
    /// Nothing; appending is a no-op.
    Empty,
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Fragment::Text(s.to_string())
    }
}

impl From<String> for Fragment {
    fn from(s: String) -> Self {
        Fragment::Text(s)
    }
}

impl From<&String> for Fragment {
    fn from(s: &String) -> Self {
        Fragment::Text(s.clone())
    }
}

impl From<Query> for Fragment {
    fn from(q: Query) -> Self {
        Fragment::Query(q)
    }
}

impl<T: Into<Fragment>> From<Option<T>> for Fragment {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Fragment::Empty,
        }
    }
}

macro_rules! fragment_from_display {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Fragment {
            fn from(v: $ty) -> Self {
                Fragment::Text(v.to_string())
            }
        })*
    };
}

fragment_from_display!(bool, i32, i64, u32, u64, usize, f64);

/// What [`QueryBuilder::add_param`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A single `?` placeholder.
    One(Value),
    /// A sequence expanded to `?,?,...`, one placeholder per element.
    Many(Vec<Value>),
}

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Param::One(v)
    }
}

macro_rules! param_from_scalar {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Param {
            fn from(v: $ty) -> Self {
                Param::One(v.into())
            }
        })*
    };
}

param_from_scalar!(bool, i32, i64, u32, usize, f64, &str, String);

impl<T: Into<Value>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        Param::One(v.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Param {
    fn from(vs: Vec<T>) -> Self {
        Param::Many(vs.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Param {
    fn from(vs: &[T]) -> Self {
        Param::Many(vs.iter().cloned().map(Into::into).collect())
    }
}

/// Accumulates SQL text and arguments; [`QueryBuilder::build`] yields the
/// finished [`Query`] and resets the builder.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    sql: String,
    args: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment. Strings are appended verbatim, queries are
    /// spliced (SQL and args), other values use their display form, and an
    /// empty fragment is a no-op.
    pub fn add_text(&mut self, fragment: impl Into<Fragment>) -> &mut Self {
        match fragment.into() {
            Fragment::Text(s) => self.sql.push_str(&s),
            Fragment::Query(q) => {
                self.sql.push_str(&q.sql);
                self.args.extend(q.args);
            }
            Fragment::Empty => {}
        }
        self
    }

    /// Append a parameter placeholder. Sequences expand to one placeholder
    /// per element.
    pub fn add_param(&mut self, param: impl Into<Param>) -> &mut Self {
        match param.into() {
            Param::One(v) => {
                self.sql.push('?');
                self.args.push(v);
            }
            Param::Many(vs) => {
                for (i, v) in vs.into_iter().enumerate() {
                    if i > 0 {
                        self.sql.push(',');
                    }
                    self.sql.push('?');
                    self.args.push(v);
                }
            }
        }
        self
    }

    /// Finish the query, draining the builder.
    pub fn build(&mut self) -> Query {
        Query {
            sql: std::mem::take(&mut self.sql),
            args: std::mem::take(&mut self.args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_param() {
        let mut qb = QueryBuilder::new();
        qb.add_text("SELECT * FROM t WHERE id = ");
        qb.add_param(42i64);
        let q = qb.build();

        assert_eq!(q.sql(), "SELECT * FROM t WHERE id = ?");
        assert_eq!(q.args(), &[Value::Int(42)]);
    }

    #[test]
    fn test_param_order_preserved() {
        let mut qb = QueryBuilder::new();
        qb.add_param(1i64);
        qb.add_text(" AND ");
        qb.add_param("two");
        qb.add_text(" AND ");
        qb.add_param(3.0f64);
        let q = qb.build();

        assert_eq!(q.sql(), "? AND ? AND ?");
        assert_eq!(
            q.args(),
            &[
                Value::Int(1),
                Value::Text("two".to_string()),
                Value::Float(3.0)
            ]
        );
    }

    #[test]
    fn test_sequence_param_expands_placeholders() {
        let mut qb = QueryBuilder::new();
        qb.add_text("WHERE id IN (");
        qb.add_param(vec![1i64, 2, 3]);
        qb.add_text(")");
        let q = qb.build();

        assert_eq!(q.sql(), "WHERE id IN (?,?,?)");
        assert_eq!(q.args().len(), 3);
    }

    #[test]
    fn test_empty_sequence_emits_nothing() {
        let mut qb = QueryBuilder::new();
        qb.add_param(Vec::<i64>::new());
        let q = qb.build();

        assert_eq!(q.sql(), "");
        assert!(q.args().is_empty());
    }

    #[test]
    fn test_query_splice() {
        let mut inner = QueryBuilder::new();
        inner.add_text("SELECT id FROM t WHERE x = ");
        inner.add_param(7i64);
        let inner = inner.build();

        let mut qb = QueryBuilder::new();
        qb.add_text("SELECT * FROM u WHERE id IN (");
        qb.add_text(inner);
        qb.add_text(") AND y = ");
        qb.add_param("z");
        let q = qb.build();

        assert_eq!(
            q.sql(),
            "SELECT * FROM u WHERE id IN (SELECT id FROM t WHERE x = ?) AND y = ?"
        );
        assert_eq!(
            q.args(),
            &[Value::Int(7), Value::Text("z".to_string())]
        );
    }

    #[test]
    fn test_none_text_is_noop() {
        let mut qb = QueryBuilder::new();
        qb.add_text("a");
        qb.add_text(None::<&str>);
        qb.add_text("b");
        let q = qb.build();

        assert_eq!(q.sql(), "ab");
    }

    #[test]
    fn test_scalar_text_stringified() {
        let mut qb = QueryBuilder::new();
        qb.add_text("LIMIT ");
        qb.add_text(10i64);
        let q = qb.build();

        assert_eq!(q.sql(), "LIMIT 10");
    }

    #[test]
    fn test_none_param_binds_null() {
        let mut qb = QueryBuilder::new();
        qb.add_param(None::<i64>);
        let q = qb.build();

        assert_eq!(q.sql(), "?");
        assert_eq!(q.args(), &[Value::Null]);
    }

    #[test]
    fn test_build_drains_builder() {
        let mut qb = QueryBuilder::new();
        qb.add_text("x");
        let first = qb.build();
        let second = qb.build();

        assert_eq!(first.sql(), "x");
        assert_eq!(second.sql(), "");
    }
}
