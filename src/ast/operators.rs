/// Binary operators, ordered by binding strength in [`BinaryOperator::precedence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// Member or index access (`.`)
    Dot,

    // Multiplicative
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    // Additive
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
}

/// Floor used when parsing a whole expression: every operator binds tighter.
pub const LOWEST_PRECEDENCE: i32 = -1;

/// Floor used for the operand of a unary operator. Dot chains bind tighter,
/// multiplicative operators do not.
pub const UNARY_OPERAND_PRECEDENCE: i32 = 200;

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "." => Some(BinaryOperator::Dot),
            "*" => Some(BinaryOperator::Multiply),
            "/" => Some(BinaryOperator::Divide),
            "%" => Some(BinaryOperator::Modulo),
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Subtract),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Dot => ".",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
        }
    }

    /// Higher binds tighter.
    pub fn precedence(self) -> i32 {
        match self {
            BinaryOperator::Dot => 300,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 200,
            BinaryOperator::Add | BinaryOperator::Subtract => 100,
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
}

impl UnaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(UnaryOperator::Plus),
            "-" => Some(UnaryOperator::Minus),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
        }
    }
}
