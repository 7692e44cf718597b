use super::expression::{Expression, Function, Value};
use super::parser::parse_date;
use crate::error::FormulaError;
use chrono::{Datelike, NaiveDate};

// This macro generates a match arm for a binary arithmetic operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr) => {
        $self.eval_binary($l, $r, $op_str, $op_fn)
    };
}

/// The core recursive engine for evaluating a single parsed formula.
pub(super) struct FormulaEngine<'a> {
    expression: &'a Expression,
    today: NaiveDate,
}

impl<'a> FormulaEngine<'a> {
    pub(super) fn new(expression: &'a Expression, today: NaiveDate) -> Self {
        Self { expression, today }
    }

    pub(super) fn evaluate(&self) -> Result<Value, FormulaError> {
        self.evaluate_recursive(self.expression)
    }

    fn evaluate_recursive(&self, expr: &Expression) -> Result<Value, FormulaError> {
        match expr {
            Expression::Sum(l, r) => eval_op!(self, l, r, "+", |a, b| Ok(a + b)),
            Expression::Subtract(l, r) => eval_op!(self, l, r, "-", |a, b| Ok(a - b)),
            Expression::Multiply(l, r) => eval_op!(self, l, r, "*", |a, b| Ok(a * b)),
            Expression::Divide(l, r) => eval_op!(self, l, r, "/", |a, b| {
                if b == 0.0 {
                    Err(FormulaError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }),
            Expression::Negate(v) => match self.evaluate_recursive(v)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(self.type_mismatch("-", "Number", other)),
            },
            Expression::Call { function, args } => self.eval_call(*function, args),
            Expression::Literal(v) => Ok(v.clone()),
        }
    }

    fn eval_binary<F>(
        &self,
        l: &Expression,
        r: &Expression,
        op: &'static str,
        f: F,
    ) -> Result<Value, FormulaError>
    where
        F: Fn(f64, f64) -> Result<f64, FormulaError>,
    {
        let left = self.evaluate_recursive(l)?;
        let right = self.evaluate_recursive(r)?;
        match (left, right) {
            (Value::Number(lv), Value::Number(rv)) => {
                let outcome = f(lv, rv)?;
                if outcome.is_finite() {
                    Ok(Value::Number(outcome))
                } else {
                    Err(FormulaError::NonFinite(format!("{} {} {}", lv, op, rv)))
                }
            }
            (Value::Number(_), other) | (other, _) => Err(self.type_mismatch(op, "Number", other)),
        }
    }

    fn eval_call(&self, function: Function, args: &[Expression]) -> Result<Value, FormulaError> {
        match function {
            Function::CurrentYear => Ok(Value::Number(self.today.year() as f64)),
            Function::Year => {
                let date = self.date_argument(function, args)?;
                Ok(Value::Number(date.year() as f64))
            }
            Function::YearsSince => {
                let date = self.date_argument(function, args)?;
                Ok(Value::Number((self.today.year() - date.year()) as f64))
            }
        }
    }

    /// Evaluates the single argument of a date function, accepting a date or a date string.
    fn date_argument(&self, function: Function, args: &[Expression]) -> Result<NaiveDate, FormulaError> {
        let arg = args.first().ok_or(FormulaError::Arity {
            function: function.name(),
            expected: function.arity(),
            found: 0,
        })?;
        match self.evaluate_recursive(arg)? {
            Value::Date(d) => Ok(d),
            Value::Text(s) => parse_date(&s),
            other => Err(self.type_mismatch(function.name(), "Date", other)),
        }
    }

    fn type_mismatch(&self, op: &str, expected: &str, found: Value) -> FormulaError {
        FormulaError::TypeMismatch {
            operation: op.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}
