//! Literal rendering and the positional INSERT builder.

use crate::model::Price;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

pub const NULL: &str = "NULL";

/// How date literals are delimited. Everything else renders the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `'M/D/YYYY'`, accepted by the bundled store.
    #[default]
    Sqlite,
    /// `#M/D/YYYY#`, the desktop-database form.
    Jet,
}

impl Dialect {
    fn date_delimiters(self) -> (char, char) {
        match self {
            Dialect::Sqlite => ('\'', '\''),
            Dialect::Jet => ('#', '#'),
        }
    }

    pub fn date(self, date: NaiveDate) -> String {
        let (open, close) = self.date_delimiters();
        format!(
            "{open}{}/{}/{}{close}",
            date.month(),
            date.day(),
            date.year()
        )
    }

    pub fn date_time(self, at: NaiveDateTime) -> String {
        let (open, close) = self.date_delimiters();
        format!(
            "{open}{}/{}/{} {:02}:{:02}:{:02}{close}",
            at.month(),
            at.day(),
            at.year(),
            at.hour(),
            at.minute(),
            at.second()
        )
    }
}

pub fn text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn optional_text(value: &str) -> String {
    if value.is_empty() {
        NULL.to_string()
    } else {
        text(value)
    }
}

pub fn boolean(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Invariant decimal form: `.` separator, no grouping, no trailing zeros.
pub fn decimal(value: f64) -> String {
    format!("{value}")
}

/// Row values for one `INSERT INTO <table> VALUES (...)`.
#[derive(Debug)]
pub struct Insert {
    table: &'static str,
    dialect: Dialect,
    values: Vec<String>,
}

impl Insert {
    pub fn new(table: &'static str, dialect: Dialect) -> Self {
        Self {
            table,
            dialect,
            values: Vec::new(),
        }
    }

    fn push(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn id(self, id: i64) -> Self {
        self.push(id.to_string())
    }

    pub fn opt_id(self, id: Option<i64>) -> Self {
        match id {
            Some(id) => self.id(id),
            None => self.null(),
        }
    }

    pub fn int(self, value: i32) -> Self {
        self.push(value.to_string())
    }

    /// Zero means "not recorded".
    pub fn nonzero(self, value: i32) -> Self {
        if value == 0 {
            self.null()
        } else {
            self.int(value)
        }
    }

    pub fn positive(self, value: i32) -> Self {
        if value > 0 {
            self.int(value)
        } else {
            self.null()
        }
    }

    pub fn text(self, value: &str) -> Self {
        self.push(text(value))
    }

    pub fn opt_text(self, value: &str) -> Self {
        self.push(optional_text(value))
    }

    pub fn maybe_text(self, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.opt_text(value),
            None => self.null(),
        }
    }

    pub fn boolean(self, value: bool) -> Self {
        self.push(boolean(value))
    }

    pub fn opt_boolean(self, value: Option<bool>) -> Self {
        match value {
            Some(value) => self.boolean(value),
            None => self.null(),
        }
    }

    pub fn null(self) -> Self {
        self.push(NULL)
    }

    pub fn date(self, value: Option<NaiveDate>) -> Self {
        match value {
            Some(date) => {
                let literal = self.dialect.date(date);
                self.push(literal)
            }
            None => self.null(),
        }
    }

    pub fn date_time(self, value: NaiveDateTime) -> Self {
        let literal = self.dialect.date_time(value);
        self.push(literal)
    }

    /// Two columns: denomination and value, both NULL for a zero price.
    pub fn price(self, price: &Price) -> Self {
        if price.value == 0.0 {
            self.null().null()
        } else {
            self.text(&price.denomination).push(decimal(price.value))
        }
    }

    /// Two columns for a price that may be absent. A present price is written
    /// even when its value is zero.
    pub fn opt_price(self, price: Option<&Price>) -> Self {
        match price {
            Some(price) => self
                .opt_text(&price.denomination)
                .push(decimal(price.value)),
            None => self.null().null(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn finish(self) -> String {
        format!(
            "INSERT INTO {} VALUES ({})",
            self.table,
            self.values.join(", ")
        )
    }
}
