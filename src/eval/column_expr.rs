//! Lazily evaluated expressions over the columns of an Arrow `RecordBatch`.
//!
//! Literals stay length-one `Scalar` datums while the tree is evaluated, so a
//! constant operand never materialises a full column.

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Datum, Float64Array, Int64Array, Scalar, StringArray,
    UInt32Array,
};
use arrow::compute::kernels::{boolean, cmp, numeric};
use arrow::compute::{cast, take};
use arrow::datatypes::{DataType, Float64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

use crate::value_type::InternalValue;

#[derive(Error, Debug)]
pub enum ColumnExprError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Column `{0}` does not exist")]
    MissingColumn(String),
    #[error("Value {0} has no columnar literal representation")]
    UnsupportedLiteral(String),
    #[error("Operator `{operator}` cannot be applied to {found}")]
    TypeMismatch { operator: String, found: DataType },
}

pub type ColumnExprResult<T> = Result<T, ColumnExprError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ColumnUnaryOp {
    Not,
    Negate,
    Sqrt,
    Floor,
    Ceil,
    Round,
    Lowercase,
    Uppercase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ColumnBinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "pow")]
    Pow,
    #[strum(serialize = "root")]
    Root,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "xor")]
    Xor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnExpr {
    Column(String),
    Literal(InternalValue),
    Unary {
        op: ColumnUnaryOp,
        expr: Box<ColumnExpr>,
    },
    Binary {
        op: ColumnBinaryOp,
        left: Box<ColumnExpr>,
        right: Box<ColumnExpr>,
    },
    Cast {
        expr: Box<ColumnExpr>,
        to: DataType,
    },
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "col(\"{}\")", name),
            Self::Literal(value) => write!(f, "lit({})", value),
            Self::Unary { op, expr } => write!(f, "{}({})", op, expr),
            Self::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Self::Cast { expr, to } => write!(f, "cast({} as {})", expr, to),
        }
    }
}

/// Result of evaluating a [`ColumnExpr`]: a full column or a broadcastable
/// length-one scalar.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Array(ArrayRef),
    Scalar(ArrayRef),
}

impl ColumnValue {
    fn values(&self) -> &ArrayRef {
        match self {
            Self::Array(array) | Self::Scalar(array) => array,
        }
    }

    pub fn data_type(&self) -> &DataType {
        self.values().data_type()
    }

    fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    fn as_datum(&self) -> Box<dyn Datum> {
        match self {
            Self::Array(array) => Box::new(array.clone()),
            Self::Scalar(array) => Box::new(Scalar::new(array.clone())),
        }
    }

    fn map(self, f: impl FnOnce(&ArrayRef) -> ColumnExprResult<ArrayRef>) -> ColumnExprResult<Self> {
        Ok(match self {
            Self::Array(array) => Self::Array(f(&array)?),
            Self::Scalar(array) => Self::Scalar(f(&array)?),
        })
    }

    fn cast_to(self, data_type: &DataType) -> ColumnExprResult<Self> {
        if self.data_type() == data_type {
            return Ok(self);
        }
        self.map(|array| Ok(cast(array, data_type)?))
    }

    /// Repeats a scalar `len` times; arrays are returned unchanged.
    pub fn into_array(self, len: usize) -> ColumnExprResult<ArrayRef> {
        match self {
            Self::Array(array) => Ok(array),
            Self::Scalar(array) => {
                let indices = UInt32Array::from(vec![0u32; len]);
                Ok(take(array.as_ref(), &indices, None)?)
            }
        }
    }
}

impl ColumnExpr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn literal(value: InternalValue) -> Self {
        Self::Literal(value)
    }

    pub fn unary(op: ColumnUnaryOp, expr: ColumnExpr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: ColumnBinaryOp, left: ColumnExpr, right: ColumnExpr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn cast(self, to: DataType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            to,
        }
    }

    pub fn evaluate(&self, batch: &RecordBatch) -> ColumnExprResult<ColumnValue> {
        match self {
            Self::Column(name) => batch
                .column_by_name(name)
                .cloned()
                .map(ColumnValue::Array)
                .ok_or_else(|| ColumnExprError::MissingColumn(name.clone())),
            Self::Literal(value) => literal_array(value).map(ColumnValue::Scalar),
            Self::Unary { op, expr } => evaluate_unary(*op, expr.evaluate(batch)?),
            Self::Binary { op, left, right } => {
                let left = left.evaluate(batch)?;
                let right = right.evaluate(batch)?;
                evaluate_binary(*op, left, right, batch.num_rows())
            }
            Self::Cast { expr, to } => expr.evaluate(batch)?.cast_to(to),
        }
    }

    /// Evaluates and broadcasts to the batch's row count.
    pub fn evaluate_to_array(&self, batch: &RecordBatch) -> ColumnExprResult<ArrayRef> {
        self.evaluate(batch)?.into_array(batch.num_rows())
    }
}

fn literal_array(value: &InternalValue) -> ColumnExprResult<ArrayRef> {
    match value {
        InternalValue::Boolean(b) => Ok(Arc::new(BooleanArray::from(vec![*b]))),
        InternalValue::Integer(i) => Ok(Arc::new(Int64Array::from(vec![*i]))),
        InternalValue::Decimal(d) => Ok(Arc::new(Float64Array::from(vec![*d]))),
        InternalValue::Text(s) => Ok(Arc::new(StringArray::from(vec![s.as_str()]))),
        other => Err(ColumnExprError::UnsupportedLiteral(other.to_string())),
    }
}

fn is_numeric(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Int64 | DataType::Float64)
}

fn expect_type(operator: impl fmt::Display, value: &ColumnValue, ok: bool) -> ColumnExprResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ColumnExprError::TypeMismatch {
            operator: operator.to_string(),
            found: value.data_type().clone(),
        })
    }
}

fn map_float(value: ColumnValue, op: impl Fn(f64) -> f64) -> ColumnExprResult<ColumnValue> {
    value.cast_to(&DataType::Float64)?.map(|array| {
        let floats = array
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| ColumnExprError::TypeMismatch {
                operator: "float map".to_string(),
                found: array.data_type().clone(),
            })?;
        Ok(Arc::new(floats.unary::<_, Float64Type>(&op)) as ArrayRef)
    })
}

fn map_text(value: ColumnValue, op: impl Fn(&str) -> String) -> ColumnExprResult<ColumnValue> {
    value.map(|array| {
        let strings = array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| ColumnExprError::TypeMismatch {
                operator: "text map".to_string(),
                found: array.data_type().clone(),
            })?;
        let mapped: StringArray = strings.iter().map(|v| v.map(&op)).collect();
        Ok(Arc::new(mapped) as ArrayRef)
    })
}

fn as_int64(array: &ArrayRef) -> ColumnExprResult<&Int64Array> {
    array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| ColumnExprError::TypeMismatch {
            operator: "integer".to_string(),
            found: array.data_type().clone(),
        })
}

fn as_float64(array: &ArrayRef) -> ColumnExprResult<&Float64Array> {
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ColumnExprError::TypeMismatch {
            operator: "decimal".to_string(),
            found: array.data_type().clone(),
        })
}

/// The integer a rounded decimal converts to, `None` when out of range.
pub(crate) fn float_to_integer(value: f64) -> Option<i64> {
    (value.is_finite() && value.abs() < i64::MAX as f64).then_some(value as i64)
}

fn as_boolean(array: &ArrayRef) -> ColumnExprResult<&BooleanArray> {
    array
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| ColumnExprError::TypeMismatch {
            operator: "boolean".to_string(),
            found: array.data_type().clone(),
        })
}

fn evaluate_unary(op: ColumnUnaryOp, value: ColumnValue) -> ColumnExprResult<ColumnValue> {
    match op {
        ColumnUnaryOp::Not => {
            expect_type(op, &value, value.data_type() == &DataType::Boolean)?;
            value.map(|array| Ok(Arc::new(boolean::not(as_boolean(array)?)?) as ArrayRef))
        }
        ColumnUnaryOp::Negate => {
            expect_type(op, &value, is_numeric(value.data_type()))?;
            if value.data_type() == &DataType::Int64 {
                return value.map(|array| {
                    let negated: Int64Array =
                        as_int64(array)?.iter().map(|v| v.and_then(i64::checked_neg)).collect();
                    Ok(Arc::new(negated) as ArrayRef)
                });
            }
            value.map(|array| Ok(numeric::neg(array.as_ref())?))
        }
        ColumnUnaryOp::Sqrt => {
            expect_type(op, &value, is_numeric(value.data_type()))?;
            map_float(value, f64::sqrt)
        }
        ColumnUnaryOp::Floor | ColumnUnaryOp::Ceil | ColumnUnaryOp::Round => {
            expect_type(op, &value, is_numeric(value.data_type()))?;
            if value.data_type() == &DataType::Int64 {
                return Ok(value);
            }
            let rounding: fn(f64) -> f64 = match op {
                ColumnUnaryOp::Floor => f64::floor,
                ColumnUnaryOp::Ceil => f64::ceil,
                _ => round_half_up,
            };
            map_float(value, rounding)?.map(|array| {
                let integers: Int64Array = as_float64(array)?
                    .iter()
                    .map(|v| v.and_then(float_to_integer))
                    .collect();
                Ok(Arc::new(integers) as ArrayRef)
            })
        }
        ColumnUnaryOp::Lowercase => {
            expect_type(op, &value, value.data_type() == &DataType::Utf8)?;
            map_text(value, str::to_lowercase)
        }
        ColumnUnaryOp::Uppercase => {
            expect_type(op, &value, value.data_type() == &DataType::Utf8)?;
            map_text(value, str::to_uppercase)
        }
    }
}

/// Rounds halves towards positive infinity, matching scalar `round`.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Brings numeric operands onto a common Arrow type.
fn coerce_numeric(
    left: ColumnValue,
    right: ColumnValue,
) -> ColumnExprResult<(ColumnValue, ColumnValue)> {
    if left.data_type() == right.data_type() {
        return Ok((left, right));
    }
    Ok((
        left.cast_to(&DataType::Float64)?,
        right.cast_to(&DataType::Float64)?,
    ))
}

fn wrap(left: &ColumnValue, right: &ColumnValue, array: ArrayRef) -> ColumnValue {
    if left.is_scalar() && right.is_scalar() {
        ColumnValue::Scalar(array)
    } else {
        ColumnValue::Array(array)
    }
}

/// Element-wise float op that keeps non-finite results instead of failing the
/// whole column, so callers can drop the offending rows.
fn float_binary(
    left: ColumnValue,
    right: ColumnValue,
    len: usize,
    op: impl Fn(f64, f64) -> f64,
) -> ColumnExprResult<ColumnValue> {
    let both_scalar = left.is_scalar() && right.is_scalar();
    let len = if both_scalar { 1 } else { len };
    let left = left.cast_to(&DataType::Float64)?.into_array(len)?;
    let right = right.cast_to(&DataType::Float64)?.into_array(len)?;
    let (l, r) = match (
        left.as_any().downcast_ref::<Float64Array>(),
        right.as_any().downcast_ref::<Float64Array>(),
    ) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(ColumnExprError::TypeMismatch {
                operator: "float binary".to_string(),
                found: left.data_type().clone(),
            })
        }
    };
    let result: ArrayRef = Arc::new(arrow::compute::kernels::arity::binary::<
        _,
        _,
        _,
        Float64Type,
    >(l, r, &op)?);
    Ok(if both_scalar {
        ColumnValue::Scalar(result)
    } else {
        ColumnValue::Array(result)
    })
}

/// Element-wise checked integer op. Overflow and zero divisors yield null so
/// callers can drop the offending rows.
fn checked_integer_binary(
    left: ColumnValue,
    right: ColumnValue,
    len: usize,
    op: fn(i64, i64) -> Option<i64>,
) -> ColumnExprResult<ColumnValue> {
    let both_scalar = left.is_scalar() && right.is_scalar();
    let len = if both_scalar { 1 } else { len };
    let left = left.into_array(len)?;
    let right = right.into_array(len)?;
    let result: Int64Array = as_int64(&left)?
        .iter()
        .zip(as_int64(&right)?.iter())
        .map(|(l, r)| l.zip(r).and_then(|(l, r)| op(l, r)))
        .collect();
    let result: ArrayRef = Arc::new(result);
    Ok(if both_scalar {
        ColumnValue::Scalar(result)
    } else {
        ColumnValue::Array(result)
    })
}

fn evaluate_binary(
    op: ColumnBinaryOp,
    left: ColumnValue,
    right: ColumnValue,
    len: usize,
) -> ColumnExprResult<ColumnValue> {
    match op {
        ColumnBinaryOp::Add | ColumnBinaryOp::Subtract | ColumnBinaryOp::Multiply => {
            expect_type(op, &left, is_numeric(left.data_type()))?;
            expect_type(op, &right, is_numeric(right.data_type()))?;
            let (left, right) = coerce_numeric(left, right)?;
            if left.data_type() == &DataType::Int64 {
                let checked: fn(i64, i64) -> Option<i64> = match op {
                    ColumnBinaryOp::Add => i64::checked_add,
                    ColumnBinaryOp::Subtract => i64::checked_sub,
                    _ => i64::checked_mul,
                };
                return checked_integer_binary(left, right, len, checked);
            }
            let (l, r) = (left.as_datum(), right.as_datum());
            let array = match op {
                ColumnBinaryOp::Add => numeric::add(l.as_ref(), r.as_ref())?,
                ColumnBinaryOp::Subtract => numeric::sub(l.as_ref(), r.as_ref())?,
                _ => numeric::mul(l.as_ref(), r.as_ref())?,
            };
            Ok(wrap(&left, &right, array))
        }
        ColumnBinaryOp::Divide => {
            expect_type(op, &left, is_numeric(left.data_type()))?;
            expect_type(op, &right, is_numeric(right.data_type()))?;
            float_binary(left, right, len, |a, b| a / b)
        }
        ColumnBinaryOp::Modulo => {
            expect_type(op, &left, is_numeric(left.data_type()))?;
            expect_type(op, &right, is_numeric(right.data_type()))?;
            if left.data_type() == &DataType::Int64 && right.data_type() == &DataType::Int64 {
                return checked_integer_binary(left, right, len, i64::checked_rem);
            }
            float_binary(left, right, len, |a, b| a % b)
        }
        ColumnBinaryOp::Pow | ColumnBinaryOp::Root => {
            expect_type(op, &left, is_numeric(left.data_type()))?;
            expect_type(op, &right, is_numeric(right.data_type()))?;
            if op == ColumnBinaryOp::Pow {
                float_binary(left, right, len, f64::powf)
            } else {
                float_binary(left, right, len, |a, b| a.powf(1.0 / b))
            }
        }
        ColumnBinaryOp::Equal
        | ColumnBinaryOp::NotEqual
        | ColumnBinaryOp::LessThan
        | ColumnBinaryOp::LessThanEqual
        | ColumnBinaryOp::GreaterThan
        | ColumnBinaryOp::GreaterThanEqual => {
            let (left, right) = if is_numeric(left.data_type()) && is_numeric(right.data_type())
            {
                coerce_numeric(left, right)?
            } else {
                (left, right)
            };
            let (l, r) = (left.as_datum(), right.as_datum());
            let array = match op {
                ColumnBinaryOp::Equal => cmp::eq(l.as_ref(), r.as_ref())?,
                ColumnBinaryOp::NotEqual => cmp::neq(l.as_ref(), r.as_ref())?,
                ColumnBinaryOp::LessThan => cmp::lt(l.as_ref(), r.as_ref())?,
                ColumnBinaryOp::LessThanEqual => cmp::lt_eq(l.as_ref(), r.as_ref())?,
                ColumnBinaryOp::GreaterThan => cmp::gt(l.as_ref(), r.as_ref())?,
                _ => cmp::gt_eq(l.as_ref(), r.as_ref())?,
            };
            Ok(wrap(&left, &right, Arc::new(array)))
        }
        ColumnBinaryOp::And | ColumnBinaryOp::Or | ColumnBinaryOp::Xor => {
            expect_type(op, &left, left.data_type() == &DataType::Boolean)?;
            expect_type(op, &right, right.data_type() == &DataType::Boolean)?;
            if op == ColumnBinaryOp::Xor {
                let (l, r) = (left.as_datum(), right.as_datum());
                let array = cmp::neq(l.as_ref(), r.as_ref())?;
                return Ok(wrap(&left, &right, Arc::new(array)));
            }
            let both_scalar = left.is_scalar() && right.is_scalar();
            let len = if both_scalar { 1 } else { len };
            let l = left.into_array(len)?;
            let r = right.into_array(len)?;
            let array = if op == ColumnBinaryOp::And {
                boolean::and(as_boolean(&l)?, as_boolean(&r)?)?
            } else {
                boolean::or(as_boolean(&l)?, as_boolean(&r)?)?
            };
            let array: ArrayRef = Arc::new(array);
            Ok(if both_scalar {
                ColumnValue::Scalar(array)
            } else {
                ColumnValue::Array(array)
            })
        }
    }
}
