use crate::form::format_number;
use chrono::NaiveDate;
use std::fmt;

/// Runtime value types used during formula evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// The named functions a formula may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Whole calendar years between a date and today: `yearsSince(date)`.
    YearsSince,
    /// The calendar year of a date: `year(date)`.
    Year,
    /// Today's calendar year: `currentYear()`.
    CurrentYear,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "yearsSince" => Some(Function::YearsSince),
            "year" => Some(Function::Year),
            "currentYear" => Some(Function::CurrentYear),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::YearsSince => "yearsSince",
            Function::Year => "year",
            Function::CurrentYear => "currentYear",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::YearsSince | Function::Year => 1,
            Function::CurrentYear => 0,
        }
    }
}

/// The Abstract Syntax Tree of a parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    Call {
        function: Function,
        args: Vec<Expression>,
    },

    Literal(Value),
}

impl Expression {
    fn precedence(&self) -> u8 {
        match self {
            Expression::Sum(..) | Expression::Subtract(..) => 1,
            Expression::Multiply(..) | Expression::Divide(..) => 2,
            Expression::Negate(_) => 3,
            Expression::Call { .. } | Expression::Literal(_) => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: u8, right: bool) -> fmt::Result {
        // Right operands of equal precedence need parentheses: a - (b - c).
        let needs_parens =
            self.precedence() < parent || (right && self.precedence() == parent && parent < 3);
        if needs_parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }

    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        op: &str,
        l: &Expression,
        r: &Expression,
    ) -> fmt::Result {
        let p = self.precedence();
        l.fmt_child(f, p, false)?;
        write!(f, " {} ", op)?;
        r.fmt_child(f, p, true)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Sum(l, r) => self.fmt_binary(f, "+", l, r),
            Expression::Subtract(l, r) => self.fmt_binary(f, "-", l, r),
            Expression::Multiply(l, r) => self.fmt_binary(f, "*", l, r),
            Expression::Divide(l, r) => self.fmt_binary(f, "/", l, r),
            Expression::Negate(v) => {
                write!(f, "-")?;
                v.fmt_child(f, self.precedence(), false)
            }
            Expression::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Literal(v) => write!(f, "{}", v),
        }
    }
}
