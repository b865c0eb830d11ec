//! Syntax tree consumed by the runtime.
//!
//! The grammar and parser live outside this crate; they hand over fully
//! resolved nodes (value types already wrapped, transform and constraint
//! references already linked) using the types below.

use core::fmt;
use std::sync::Arc;

use crate::diagnostic::Location;
use crate::value_type::{CellRange, ValueType};

// Program root
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub pipelines: Vec<Arc<PipelineDefinition>>,
}

impl Model {
    pub fn new(pipelines: Vec<PipelineDefinition>) -> Self {
        Self {
            pipelines: pipelines.into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineDefinition {
    pub name: String,
    pub blocks: Vec<Arc<BlockDefinition>>,
    pub pipes: Vec<Pipe>,
    pub location: Location,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: BlockDefinition) -> Self {
        self.blocks.push(Arc::new(block));
        self
    }

    /// Adds a chain of pipes `a -> b -> c`.
    pub fn with_pipe(mut self, chain: &[&str]) -> Self {
        for pair in chain.windows(2) {
            self.pipes.push(Pipe::new(pair[0], pair[1]));
        }
        self
    }

    pub fn block(&self, name: &str) -> Option<&Arc<BlockDefinition>> {
        self.blocks.iter().find(|block| block.name == name)
    }
}

// Directed edge between two blocks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pipe {
    pub from: String,
    pub to: String,
}

impl Pipe {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockDefinition {
    pub name: String,
    pub block_type: String,
    pub properties: Vec<PropertyAssignment>,
    pub location: Location,
}

impl BlockDefinition {
    pub fn new(name: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_type: block_type.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Expression) -> Self {
        self.properties
            .push(PropertyAssignment::new(name, PropertyValue::Expression(value)));
        self
    }

    pub fn with_runtime_parameter(
        mut self,
        name: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        self.properties.push(PropertyAssignment::new(
            name,
            PropertyValue::RuntimeParameter(parameter.into()),
        ));
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyAssignment> {
        find_property(&self.properties, name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAssignment {
    pub name: String,
    pub value: PropertyValue,
    pub location: Location,
}

impl PropertyAssignment {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
            location: Location::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Expression(Expression),
    RuntimeParameter(String),
}

fn find_property<'a>(
    properties: &'a [PropertyAssignment],
    name: &str,
) -> Option<&'a PropertyAssignment> {
    properties.iter().find(|property| property.name == name)
}

// Reusable value transformation (`transform X { from a oftype T; to b oftype U; b: <expr>; }`)
#[derive(Debug, Clone, PartialEq)]
pub struct TransformDefinition {
    pub name: String,
    pub ports: Vec<TransformPortDefinition>,
    pub output_assignment: TransformOutputAssignment,
    pub location: Location,
}

impl TransformDefinition {
    pub fn new(
        name: impl Into<String>,
        ports: Vec<TransformPortDefinition>,
        output_port: impl Into<String>,
        expression: Expression,
    ) -> Self {
        Self {
            name: name.into(),
            ports,
            output_assignment: TransformOutputAssignment {
                port_name: output_port.into(),
                expression,
            },
            location: Location::default(),
        }
    }

    pub fn inputs(&self) -> impl Iterator<Item = &TransformPortDefinition> {
        self.ports.iter().filter(|port| port.kind == PortKind::From)
    }

    pub fn output(&self) -> Option<&TransformPortDefinition> {
        self.ports.iter().find(|port| port.kind == PortKind::To)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PortKind {
    From,
    To,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformPortDefinition {
    pub name: String,
    pub kind: PortKind,
    pub value_type: ValueType,
}

impl TransformPortDefinition {
    pub fn from(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::From,
            value_type,
        }
    }

    pub fn to(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::To,
            value_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutputAssignment {
    pub port_name: String,
    pub expression: Expression,
}

// Column declaration (`"name" oftype text`)
#[derive(Debug, Clone, PartialEq)]
pub struct ValuetypeAssignment {
    pub name: String,
    pub value_type: ValueType,
}

impl ValuetypeAssignment {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDefinition {
    pub name: String,
    pub body: ConstraintBody,
    pub location: Location,
}

impl ConstraintDefinition {
    pub fn expression(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            body: ConstraintBody::Expression(expression),
            location: Location::default(),
        }
    }

    pub fn typed(
        name: impl Into<String>,
        constraint_type: impl Into<String>,
        properties: Vec<(&str, Expression)>,
    ) -> Self {
        Self {
            name: name.into(),
            body: ConstraintBody::Typed {
                constraint_type: constraint_type.into(),
                properties: properties
                    .into_iter()
                    .map(|(name, value)| {
                        PropertyAssignment::new(name, PropertyValue::Expression(value))
                    })
                    .collect(),
            },
            location: Location::default(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyAssignment> {
        match &self.body {
            ConstraintBody::Typed { properties, .. } => find_property(properties, name),
            ConstraintBody::Expression(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintBody {
    /// Boolean expression over the free variable `value`.
    Expression(Expression),
    Typed {
        constraint_type: String,
        properties: Vec<PropertyAssignment>,
    },
}

// Expressions

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(ValueLiteral),
    FreeVariable(String),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Ternary {
        operator: TernaryOperator,
        first: Box<Expression>,
        second: Box<Expression>,
        third: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueLiteral {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Regex(String),
    CellRange(CellRange),
    Collection(Vec<Expression>),
    ValuetypeAssignment(Arc<ValuetypeAssignment>),
    Constraint(Arc<ConstraintDefinition>),
    Transform(Arc<TransformDefinition>),
}

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            location: Location::default(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn literal(literal: ValueLiteral) -> Self {
        Self::new(ExpressionKind::Literal(literal))
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(ValueLiteral::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::literal(ValueLiteral::Integer(value))
    }

    pub fn decimal(value: f64) -> Self {
        Self::literal(ValueLiteral::Decimal(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::literal(ValueLiteral::Text(value.into()))
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::literal(ValueLiteral::Regex(pattern.into()))
    }

    pub fn collection(values: Vec<Expression>) -> Self {
        Self::literal(ValueLiteral::Collection(values))
    }

    pub fn transform(transform: TransformDefinition) -> Self {
        Self::literal(ValueLiteral::Transform(Arc::new(transform)))
    }

    pub fn column(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::literal(ValueLiteral::ValuetypeAssignment(Arc::new(
            ValuetypeAssignment::new(name, value_type),
        )))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::FreeVariable(name.into()))
    }

    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Self::new(ExpressionKind::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::new(ExpressionKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn ternary(
        operator: TernaryOperator,
        first: Expression,
        second: Expression,
        third: Expression,
    ) -> Self {
        Self::new(ExpressionKind::Ternary {
            operator,
            first: Box::new(first),
            second: Box::new(second),
            third: Box::new(third),
        })
    }

    /// Short label used to anchor diagnostics.
    pub fn describe(&self) -> String {
        match &self.kind {
            ExpressionKind::Literal(_) => "literal".to_string(),
            ExpressionKind::FreeVariable(name) => format!("variable `{}`", name),
            ExpressionKind::Unary { operator, .. } => format!("unary expression `{}`", operator),
            ExpressionKind::Binary { operator, .. } => {
                format!("binary expression `{}`", operator)
            }
            ExpressionKind::Ternary { operator, .. } => {
                format!("ternary expression `{}`", operator)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Literal(literal) => write!(f, "{}", literal),
            ExpressionKind::FreeVariable(name) => write!(f, "{}", name),
            ExpressionKind::Unary { operator, operand } => write!(f, "{} {}", operator, operand),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ExpressionKind::Ternary {
                operator,
                first,
                second,
                third,
            } => write!(f, "{}({}, {}, {})", operator, first, second, third),
        }
    }
}

impl fmt::Display for ValueLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueLiteral::Boolean(b) => write!(f, "{}", b),
            ValueLiteral::Integer(i) => write!(f, "{}", i),
            ValueLiteral::Decimal(d) => write!(f, "{}", d),
            ValueLiteral::Text(s) => write!(f, "\"{}\"", s),
            ValueLiteral::Regex(r) => write!(f, "/{}/", r),
            ValueLiteral::CellRange(range) => write!(f, "range {}", range),
            ValueLiteral::Collection(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ValueLiteral::ValuetypeAssignment(assignment) => write!(
                f,
                "\"{}\" oftype {}",
                assignment.name,
                assignment.value_type.name()
            ),
            ValueLiteral::Constraint(constraint) => write!(f, "{}", constraint.name),
            ValueLiteral::Transform(transform) => write!(f, "{}", transform.name),
        }
    }
}

// Operators

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum UnaryOperator {
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "sqrt")]
    Sqrt,
    #[strum(serialize = "floor")]
    Floor,
    #[strum(serialize = "ceil")]
    Ceil,
    #[strum(serialize = "round")]
    Round,
    #[strum(serialize = "lowercase")]
    Lowercase,
    #[strum(serialize = "uppercase")]
    Uppercase,
    #[strum(serialize = "asText")]
    AsText,
    #[strum(serialize = "asDecimal")]
    AsDecimal,
    #[strum(serialize = "asInteger")]
    AsInteger,
    #[strum(serialize = "asBoolean")]
    AsBoolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum BinaryOperator {
    #[strum(serialize = "pow")]
    Pow,
    #[strum(serialize = "root")]
    Root,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "matches")]
    Matches,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "xor")]
    Xor,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum TernaryOperator {
    #[strum(serialize = "replace")]
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_operator_symbols_round_trip_through_strum() {
        assert_eq!(BinaryOperator::from_str("<=").unwrap(), BinaryOperator::LessThanEqual);
        assert_eq!(UnaryOperator::AsDecimal.to_string(), "asDecimal");
        assert_eq!(TernaryOperator::from_str("replace").unwrap(), TernaryOperator::Replace);
        assert!(BinaryOperator::from_str("**").is_err());
    }

    #[test]
    fn test_pipe_chain() {
        let pipeline = PipelineDefinition::new("Cars")
            .with_block(BlockDefinition::new("A", "X"))
            .with_block(BlockDefinition::new("B", "Y"))
            .with_block(BlockDefinition::new("C", "Z"))
            .with_pipe(&["A", "B", "C"]);
        assert_eq!(
            pipeline.pipes,
            vec![Pipe::new("A", "B"), Pipe::new("B", "C")]
        );
        assert!(pipeline.block("B").is_some());
        assert!(pipeline.block("D").is_none());
    }

    #[test]
    fn test_expression_display() {
        let expr = Expression::binary(
            BinaryOperator::Add,
            Expression::variable("x"),
            Expression::integer(1),
        );
        assert_eq!(expr.to_string(), "(x + 1)");
        assert_eq!(expr.describe(), "binary expression `+`");
    }
}
