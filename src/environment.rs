//! Types, bindings and runtime values shared by the analyzer and the
//! interpreter.
use crate::scope::{ScopeId, Scopes};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
pub enum Type {
    Any,
    Nil,
    Comparable,
    Boolean,
    Integer,
    Decimal,
    Character,
    String,
}

pub const TYPES: [Type; 8] = [
    Type::Any,
    Type::Nil,
    Type::Comparable,
    Type::Boolean,
    Type::Integer,
    Type::Decimal,
    Type::Character,
    Type::String,
];

pub fn get_type(name: &str) -> Option<Type> {
    Type::from_str(name).ok()
}

impl Type {
    /// Name of the matching type in generated code.
    pub fn target_name(self) -> &'static str {
        match self {
            Type::Any => "Object",
            Type::Nil => "Void",
            Type::Comparable => "Comparable",
            Type::Boolean => "boolean",
            Type::Integer => "int",
            Type::Decimal => "double",
            Type::Character => "char",
            Type::String => "String",
        }
    }

    pub fn supertype(self) -> Option<Type> {
        match self {
            Type::Any => None,
            Type::Nil | Type::Comparable | Type::Boolean => Some(Type::Any),
            Type::Integer | Type::Decimal | Type::Character | Type::String => {
                Some(Type::Comparable)
            }
        }
    }

    /// A built-in field of this type or one of its supertypes.
    pub fn field(self, name: &str) -> Option<Rc<Variable>> {
        MEMBERS.with(|members| members.field(self, name))
    }

    /// A built-in method of this type or one of its supertypes. `arity`
    /// counts the arguments, not the receiver.
    pub fn method(self, name: &str, arity: usize) -> Option<Rc<Function>> {
        MEMBERS.with(|members| members.method_of(self, name, arity))
    }

    /// Whether a value of type `other` may be stored where `self` is required.
    pub fn accepts(self, other: Type) -> bool {
        match self {
            Type::Any => true,
            Type::Comparable => {
                other == Type::Comparable || other.supertype() == Some(Type::Comparable)
            }
            _ => self == other,
        }
    }
}

/// A name bound by the analyzer: a global, parameter or local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub target_name: String,
    pub ty: Type,
    pub mutable: bool,
}

impl Variable {
    pub fn new(name: &str, ty: Type, mutable: bool) -> Variable {
        Variable::with_target(name, name, ty, mutable)
    }

    pub fn with_target(name: &str, target_name: &str, ty: Type, mutable: bool) -> Variable {
        Variable {
            name: name.to_string(),
            target_name: target_name.to_string(),
            ty,
            mutable,
        }
    }
}

/// A function signature as seen by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub target_name: String,
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

impl Function {
    pub fn new(name: &str, parameter_types: Vec<Type>, return_type: Type) -> Function {
        Function::with_target(name, name, parameter_types, return_type)
    }

    pub fn with_target(
        name: &str,
        target_name: &str,
        parameter_types: Vec<Type>,
        return_type: Type,
    ) -> Function {
        Function {
            name: name.to_string(),
            target_name: target_name.to_string(),
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// Built-in fields and methods of each type, one frame per type chained
/// through the supertype. Methods take their receiver as the first
/// parameter.
struct TypeRegistry {
    scopes: Scopes<Rc<Variable>, Rc<Function>>,
    frames: BTreeMap<Type, ScopeId>,
}

thread_local! {
    static MEMBERS: TypeRegistry = TypeRegistry::new();
}

impl TypeRegistry {
    fn new() -> TypeRegistry {
        let mut registry = TypeRegistry {
            scopes: Scopes::new(),
            frames: BTreeMap::new(),
        };
        // Supertypes come first in TYPES, so their frames already exist.
        for ty in TYPES.iter() {
            let parent = ty.supertype().and_then(|s| registry.frames.get(&s).copied());
            let frame = registry.scopes.allocate(parent);
            registry.frames.insert(*ty, frame);
        }
        registry.method(Type::Any, "stringify", "toString", &[], Type::String);
        for ty in [
            Type::Comparable,
            Type::Integer,
            Type::Decimal,
            Type::Character,
            Type::String,
        ]
        .iter()
        {
            registry.method(*ty, "compare", "compareTo", &[*ty], Type::Integer);
        }
        registry.method(
            Type::String,
            "slice",
            "substring",
            &[Type::Integer, Type::Integer],
            Type::String,
        );
        if let Some(frame) = registry.frames.get(&Type::String).copied() {
            registry.scopes.define_variable_in(
                frame,
                "length",
                Rc::new(Variable::with_target("length", "length()", Type::Integer, false)),
            );
        }
        registry
    }

    fn method(
        &mut self,
        receiver: Type,
        name: &str,
        target_name: &str,
        parameters: &[Type],
        return_type: Type,
    ) {
        let mut parameter_types = vec![Type::Any];
        parameter_types.extend_from_slice(parameters);
        let function = Function::with_target(name, target_name, parameter_types, return_type);
        if let Some(frame) = self.frames.get(&receiver).copied() {
            self.scopes
                .define_function_in(frame, name, function.arity(), Rc::new(function));
        }
    }

    fn field(&self, ty: Type, name: &str) -> Option<Rc<Variable>> {
        let frame = *self.frames.get(&ty)?;
        self.scopes.lookup_variable_from(frame, name).cloned()
    }

    fn method_of(&self, ty: Type, name: &str, arity: usize) -> Option<Rc<Function>> {
        let frame = *self.frames.get(&ty)?;
        self.scopes
            .lookup_function_from(frame, name, arity + 1)
            .cloned()
    }
}

/// A value produced at runtime. Lists are shared, so every binding holding
/// the same list observes element assignments.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    Character(char),
    String(String),
    List(Rc<RefCell<Vec<Value>>>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::Decimal(l), Value::Decimal(r)) => l == r,
            (Value::Character(l), Value::Character(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            // The same list is equal to itself even when it contains itself.
            (Value::List(l), Value::List(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            _ => false,
        }
    }
}

impl Value {
    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::Character(_) => "Character",
            Value::String(_) => "String",
            Value::List(_) => "List",
        }
    }
}

/// Renders a decimal without switching to exponent notation, keeping its
/// scale (`0.25`, `1.50`, `1200`).
pub fn plain_decimal(x: &BigDecimal) -> String {
    let (mantissa, scale) = x.as_bigint_and_exponent();
    let digits = mantissa.magnitude().to_string();
    let sign = if mantissa < BigInt::from(0) { "-" } else { "" };
    if scale <= 0 {
        let zeros = "0".repeat((-scale) as usize);
        return format!("{}{}{}", sign, digits, if digits == "0" { "" } else { zeros.as_str() });
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
    } else {
        digits
    };
    let point = padded.len() - scale;
    format!("{}{}.{}", sign, &padded[..point], &padded[point..])
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Integer(x) => write!(f, "{}", x),
            Value::Decimal(x) => write!(f, "{}", plain_decimal(x)),
            Value::Character(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::List(values) => write_list(f, values, &mut Vec::new()),
        }
    }
}

/// Writes `list`, printing `[...]` for any list already being written
/// further up, so a list stored inside itself terminates.
fn write_list(
    f: &mut Formatter<'_>,
    list: &Rc<RefCell<Vec<Value>>>,
    open: &mut Vec<Rc<RefCell<Vec<Value>>>>,
) -> fmt::Result {
    if open.iter().any(|outer| Rc::ptr_eq(outer, list)) {
        return write!(f, "[...]");
    }
    open.push(Rc::clone(list));
    write!(f, "[")?;
    for (i, value) in list.borrow().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match value {
            Value::List(inner) => write_list(f, inner, open)?,
            other => write!(f, "{}", other)?,
        }
    }
    open.pop();
    write!(f, "]")
}

/// A name bound at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub mutable: bool,
    pub value: Value,
}

impl Binding {
    pub fn new(mutable: bool, value: Value) -> Binding {
        Binding { mutable, value }
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::environment::{get_type, plain_decimal, Type, Value, TYPES};
    use bigdecimal::BigDecimal;
    use num_bigint::BigInt;
    use std::str::FromStr;

    #[test]
    fn type_names() {
        for ty in TYPES.iter() {
            assert_eq!(get_type(&ty.to_string()), Some(*ty));
        }
        assert_eq!(get_type("integer"), None);
        assert_eq!(Type::Decimal.target_name(), "double");
        assert_eq!(Type::Nil.target_name(), "Void");
    }

    #[test]
    fn assignability() {
        assert!(Type::Any.accepts(Type::Nil));
        assert!(Type::Any.accepts(Type::Comparable));
        assert!(Type::Comparable.accepts(Type::Character));
        assert!(Type::Comparable.accepts(Type::Comparable));
        assert!(!Type::Comparable.accepts(Type::Boolean));
        assert!(!Type::Comparable.accepts(Type::Any));
        assert!(Type::Integer.accepts(Type::Integer));
        assert!(!Type::Integer.accepts(Type::Decimal));
        assert!(!Type::String.accepts(Type::Any));
    }

    #[test]
    fn members_walk_the_supertype_chain() {
        let length = Type::String.field("length").unwrap();
        assert_eq!(length.ty, Type::Integer);
        assert!(!length.mutable);
        assert!(Type::Integer.field("length").is_none());

        let stringify = Type::Boolean.method("stringify", 0).unwrap();
        assert_eq!(stringify.target_name, "toString");
        assert_eq!(stringify.return_type, Type::String);

        let slice = Type::String.method("slice", 2).unwrap();
        assert_eq!(slice.parameter_types, vec![Type::Any, Type::Integer, Type::Integer]);
        assert!(Type::String.method("slice", 1).is_none());

        let compare = Type::Character.method("compare", 1).unwrap();
        assert_eq!(compare.parameter_types[1], Type::Character);
        assert!(Type::Nil.method("compare", 1).is_none());
    }

    #[test]
    fn display() {
        let decimal = |s: &str| Value::Decimal(BigDecimal::from_str(s).unwrap());
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Integer(BigInt::from(-12)).to_string(), "-12");
        assert_eq!(decimal("0.25").to_string(), "0.25");
        assert_eq!(decimal("-1.50").to_string(), "-1.50");
        assert_eq!(decimal("-0.05").to_string(), "-0.05");
        assert_eq!(Value::Character('c').to_string(), "c");
        assert_eq!(
            Value::list(vec![
                Value::Integer(BigInt::from(1)),
                Value::String("a".to_string())
            ])
            .to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn plain_decimals_with_negative_scale() {
        assert_eq!(plain_decimal(&BigDecimal::new(BigInt::from(12), -2)), "1200");
        assert_eq!(plain_decimal(&BigDecimal::new(BigInt::from(0), -2)), "0");
        assert_eq!(plain_decimal(&BigDecimal::new(BigInt::from(5), 3)), "0.005");
    }

    #[test]
    fn lists_compare_by_contents() {
        let a = Value::list(vec![Value::Integer(BigInt::from(1))]);
        let b = Value::list(vec![Value::Integer(BigInt::from(1))]);
        assert_eq!(a, b);
        assert_ne!(a, Value::Nil);
        assert_ne!(Value::Character('a'), Value::String("a".to_string()));
    }

    #[test]
    fn self_containing_list() {
        let list = Value::list(vec![Value::Integer(BigInt::from(1))]);
        let nested = Value::list(vec![list.clone(), list.clone()]);
        if let Value::List(values) = &list {
            values.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_string(), "[1, [...]]");
        assert_eq!(nested.to_string(), "[[1, [...]], [1, [...]]]");
        assert!(list == list.clone());
    }
}
